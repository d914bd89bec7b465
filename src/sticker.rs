use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::anim::AnimationDescriptor;
use crate::buffer::PixelBuffer;
use crate::error::{StickerError, StickerResult};
use crate::mask::{RegionMask, flood_fill_transparency};
use crate::text::TextOverlay;
use crate::transform::Transform2D;

/// Default channel tolerance for flood-fill operations.
pub const DEFAULT_FLOOD_TOLERANCE: u8 = 30;

/// A masked area of the sticker with its own animation settings.
#[derive(Clone, Debug)]
pub struct Region {
    pub id: Uuid,
    pub mask: RegionMask,
    pub animation: AnimationDescriptor,
}

/// Serializable animation settings, keyed by region id. The masks themselves
/// are raster data and are rebuilt from user gestures, not persisted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StickerSettings {
    pub animation: AnimationDescriptor,
    pub global_transform: Transform2D,
    pub text: Option<TextOverlay>,
    pub region_animations: Vec<(Uuid, AnimationDescriptor)>,
}

/// One sticker being edited: the immutable base art, an optional edited
/// derivative, animation regions, and an optional caption.
///
/// All mutation is synchronous and single-threaded; exports snapshot the
/// sticker by value.
#[derive(Clone, Debug)]
pub struct Sticker {
    pub id: Uuid,
    base: PixelBuffer,
    edited: Option<PixelBuffer>,
    regions: Vec<Region>,
    pub animation: AnimationDescriptor,
    pub global_transform: Transform2D,
    pub text: Option<TextOverlay>,
}

impl Sticker {
    pub fn new(base: PixelBuffer) -> Self {
        Self {
            id: Uuid::new_v4(),
            base,
            edited: None,
            regions: Vec::new(),
            animation: AnimationDescriptor::default(),
            global_transform: Transform2D::IDENTITY,
            text: None,
        }
    }

    /// Canvas size (stickers are square).
    pub fn canvas_size(&self) -> u32 {
        self.base.width()
    }

    pub fn base(&self) -> &PixelBuffer {
        &self.base
    }

    /// The pixels every composite starts from: the edited buffer when edits
    /// exist, otherwise the base.
    pub fn current_pixels(&self) -> &PixelBuffer {
        self.edited.as_ref().unwrap_or(&self.base)
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Replace the base art. Edits and regions refer to the old pixels, so
    /// both are discarded.
    pub fn set_base(&mut self, base: PixelBuffer) {
        self.base = base;
        self.edited = None;
        self.regions.clear();
    }

    /// Add a rectangle-masked region. Returns the new region id, or `None`
    /// when the drag rectangle is degenerate.
    pub fn add_rect_region(
        &mut self,
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        animation: AnimationDescriptor,
    ) -> StickerResult<Option<Uuid>> {
        animation.validate()?;
        let Some(mask) = RegionMask::from_rect(x, y, w, h, self.canvas_size()) else {
            tracing::debug!(x, y, w, h, "ignoring degenerate region rectangle");
            return Ok(None);
        };
        let id = Uuid::new_v4();
        self.regions.push(Region {
            id,
            mask,
            animation,
        });
        Ok(Some(id))
    }

    pub fn remove_region(&mut self, id: Uuid) -> bool {
        let before = self.regions.len();
        self.regions.retain(|r| r.id != id);
        before != self.regions.len()
    }

    pub fn set_region_animation(
        &mut self,
        id: Uuid,
        animation: AnimationDescriptor,
    ) -> StickerResult<()> {
        animation.validate()?;
        let region = self
            .regions
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| StickerError::input(format!("no region with id {id}")))?;
        region.animation = animation;
        Ok(())
    }

    /// Flood-fill erase at a seed pixel. Edits accumulate in a derived buffer;
    /// the base is never modified.
    pub fn erase_at(&mut self, seed_x: u32, seed_y: u32, tolerance: u8) -> StickerResult<()> {
        if self.edited.is_none() {
            self.edited = Some(self.base.clone());
        }
        let buffer = self
            .edited
            .as_mut()
            .ok_or_else(|| StickerError::validation("edited buffer missing"))?;
        flood_fill_transparency(buffer, seed_x, seed_y, tolerance)
    }

    /// Drop all erase edits, reverting to the base pixels.
    pub fn reset_edits(&mut self) {
        self.edited = None;
    }

    pub fn has_edits(&self) -> bool {
        self.edited.is_some()
    }

    /// Snapshot the serializable settings (for save files).
    pub fn settings(&self) -> StickerSettings {
        StickerSettings {
            animation: self.animation,
            global_transform: self.global_transform,
            text: self.text.clone(),
            region_animations: self
                .regions
                .iter()
                .map(|r| (r.id, r.animation))
                .collect(),
        }
    }
}
