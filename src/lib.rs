#![forbid(unsafe_code)]

pub mod anim;
pub mod buffer;
pub mod compose;
pub mod encode;
pub mod error;
pub mod export;
pub mod grid;
pub mod mask;
pub mod sticker;
pub mod text;
pub mod transform;

pub use anim::{AnimationDescriptor, AnimationKind, Jitter, NoJitter, SplitMix64};
pub use buffer::PixelBuffer;
pub use compose::{FrameTransforms, compose};
pub use encode::{AnimationEncoder, GifAnimationEncoder, encode_still_png};
pub use error::{StickerError, StickerResult};
pub use export::{
    CANONICAL_SIZE, EXPORT_FRAMES, EXPORT_SIZE, ExportArtifact, ExportOptions, ExportPhase,
    animation_active, compose_still, export, export_with_fallback, frame_delay_ms, sample_frames,
};
pub use mask::{RegionMask, flood_fill_transparency};
pub use sticker::{DEFAULT_FLOOD_TOLERANCE, Region, Sticker, StickerSettings};
pub use text::TextOverlay;
pub use transform::Transform2D;
