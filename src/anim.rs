use kurbo::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::{StickerError, StickerResult};
use crate::transform::Transform2D;

/// Procedural animation styles. `None` leaves the target static even when
/// the descriptor is enabled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnimationKind {
    #[default]
    None,
    Swing,
    Bounce,
    Rotate,
    Scale,
    Shake,
    Pulse,
}

/// Animation settings for a sticker or a single region.
///
/// `speed` and `intensity` are user-facing 1..=10 sliders; the sampler maps
/// them to continuous factors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnimationDescriptor {
    pub kind: AnimationKind,
    pub enabled: bool,
    pub speed: u8,
    pub intensity: u8,
}

impl Default for AnimationDescriptor {
    fn default() -> Self {
        Self {
            kind: AnimationKind::None,
            enabled: false,
            speed: 5,
            intensity: 5,
        }
    }
}

impl AnimationDescriptor {
    pub fn new(kind: AnimationKind, speed: u8, intensity: u8) -> Self {
        Self {
            kind,
            enabled: kind != AnimationKind::None,
            speed,
            intensity,
        }
    }

    pub fn validate(&self) -> StickerResult<()> {
        if !(1..=10).contains(&self.speed) {
            return Err(StickerError::validation(format!(
                "animation speed {} out of range 1..=10",
                self.speed
            )));
        }
        if !(1..=10).contains(&self.intensity) {
            return Err(StickerError::validation(format!(
                "animation intensity {} out of range 1..=10",
                self.intensity
            )));
        }
        Ok(())
    }

    /// Whether this descriptor produces motion at all.
    pub fn is_active(&self) -> bool {
        self.enabled && self.kind != AnimationKind::None
    }

    fn speed_factor(&self) -> f64 {
        1.0 / (self.speed as f64 * 0.1 + 0.5)
    }

    fn intensity_factor(&self) -> f64 {
        self.intensity as f64 / 10.0
    }

    /// Sample the transform at a phase `progress` (radians over the loop).
    ///
    /// All styles are pure functions of `progress` except `Shake`, which
    /// draws per-frame offsets from `jitter`.
    pub fn sample(&self, progress: f64, jitter: &mut impl Jitter) -> Transform2D {
        if !self.is_active() {
            return Transform2D::IDENTITY;
        }
        let inf = self.intensity_factor();
        let phase = progress * self.speed_factor();

        match self.kind {
            AnimationKind::None => Transform2D::IDENTITY,
            AnimationKind::Swing => Transform2D {
                translate: Vec2::new(10.0 * inf * phase.sin(), 0.0),
                ..Transform2D::IDENTITY
            },
            AnimationKind::Bounce => Transform2D {
                translate: Vec2::new(0.0, -15.0 * inf * phase.sin().abs()),
                ..Transform2D::IDENTITY
            },
            AnimationKind::Rotate => Transform2D {
                rotate_rad: phase * inf,
                ..Transform2D::IDENTITY
            },
            AnimationKind::Scale => Transform2D {
                scale: 1.0 + 0.2 * inf * phase.sin(),
                ..Transform2D::IDENTITY
            },
            AnimationKind::Shake => Transform2D {
                translate: Vec2::new(
                    jitter.next_signed() * 4.0 * inf,
                    jitter.next_signed() * 4.0 * inf,
                ),
                ..Transform2D::IDENTITY
            },
            AnimationKind::Pulse => Transform2D {
                scale: 1.0 + 0.15 * inf * (2.0 * phase).sin(),
                ..Transform2D::IDENTITY
            },
        }
    }
}

/// Source of the random offsets used by `Shake`. Injected so frame
/// generation can be made deterministic in tests.
pub trait Jitter {
    /// Uniform-ish value in `[-1.0, 1.0]`.
    fn next_signed(&mut self) -> f64;
}

/// SplitMix64 generator. Small, seedable, good enough for visual jitter.
#[derive(Clone, Debug)]
pub struct SplitMix64 {
    state: u64,
}

impl SplitMix64 {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    /// Seed from the system clock, for interactive use.
    pub fn from_entropy() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_nanos() as u64)
            .unwrap_or(0x9e37_79b9_7f4a_7c15);
        Self::new(nanos)
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9e37_79b9_7f4a_7c15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xbf58_476d_1ce4_e5b9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94d0_49bb_1331_11eb);
        z ^ (z >> 31)
    }
}

impl Jitter for SplitMix64 {
    fn next_signed(&mut self) -> f64 {
        let unit = (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64;
        unit * 2.0 - 1.0
    }
}

/// Jitter that always returns zero. Used wherever shake must be inert.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoJitter;

impl Jitter for NoJitter {
    fn next_signed(&mut self) -> f64 {
        0.0
    }
}
