use ab_glyph::FontArc;

use crate::buffer::PixelBuffer;
use crate::error::{StickerError, StickerResult};
use crate::sticker::Sticker;
use crate::transform::{Transform2D, draw_identity, draw_transformed};

/// Per-frame transforms produced by the animation sampler, aligned with the
/// sticker's region order. `global` is only consulted when the sticker has no
/// regions.
#[derive(Clone, Debug, Default)]
pub struct FrameTransforms {
    pub global: Transform2D,
    pub regions: Vec<Transform2D>,
}

impl FrameTransforms {
    pub fn identity(region_count: usize) -> Self {
        Self {
            global: Transform2D::IDENTITY,
            regions: vec![Transform2D::IDENTITY; region_count],
        }
    }
}

/// Compose one output frame.
///
/// With no regions the whole sticker is drawn through the global transform.
/// With regions, the background is the sticker with every region knocked out
/// of its alpha, and each region is drawn on top through its own transform in
/// creation order. The caption is stamped last and never animated.
///
/// Pure given its inputs; all randomness lives in the sampler upstream.
pub fn compose(
    sticker: &Sticker,
    frame: &FrameTransforms,
    out_size: u32,
    font: Option<&FontArc>,
) -> StickerResult<PixelBuffer> {
    if frame.regions.len() != sticker.regions().len() {
        return Err(StickerError::validation(format!(
            "frame carries {} region transforms for {} regions",
            frame.regions.len(),
            sticker.regions().len()
        )));
    }

    let source = if sticker.canvas_size() == out_size {
        sticker.current_pixels().clone()
    } else {
        sticker.current_pixels().resample(out_size, out_size)?
    };

    let mut out = PixelBuffer::new(out_size, out_size)?;

    if sticker.regions().is_empty() {
        if frame.global.is_identity() {
            draw_identity(&mut out, &source)?;
        } else {
            draw_transformed(&mut out, &source, frame.global.to_affine(out_size))?;
        }
    } else {
        // Background: the sticker with every region's alpha knocked out, so
        // a region transformed away leaves transparency, not a ghost copy.
        let mut background = source.clone();
        for y in 0..out_size {
            for x in 0..out_size {
                let a = background.alpha(x, y);
                if a == 0 {
                    continue;
                }
                let mut keep = a as u32;
                for region in sticker.regions() {
                    let mask_a = region.mask.alpha_scaled(x, y, out_size) as u32;
                    keep = mul_div255(keep, 255 - mask_a);
                }
                background.set_alpha(x, y, keep as u8);
            }
        }
        draw_identity(&mut out, &background)?;

        for (region, transform) in sticker.regions().iter().zip(&frame.regions) {
            let mut layer = source.clone();
            for y in 0..out_size {
                for x in 0..out_size {
                    let a = layer.alpha(x, y);
                    if a == 0 {
                        continue;
                    }
                    let mask_a = region.mask.alpha_scaled(x, y, out_size) as u32;
                    layer.set_alpha(x, y, mul_div255(a as u32, mask_a) as u8);
                }
            }
            if transform.is_identity() {
                draw_identity(&mut out, &layer)?;
            } else {
                draw_transformed(&mut out, &layer, transform.to_affine(out_size))?;
            }
        }
    }

    if let Some(overlay) = &sticker.text {
        match font {
            Some(font) => {
                let scale = out_size as f64 / sticker.canvas_size() as f64;
                overlay.render(&mut out, font, scale)?;
            }
            None => tracing::warn!("caption present but no font available, skipping text"),
        }
    }

    Ok(out)
}

fn mul_div255(x: u32, y: u32) -> u32 {
    ((x * y) + 127) / 255
}
