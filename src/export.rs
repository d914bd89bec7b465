use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::mpsc;
use std::time::Duration;

use ab_glyph::FontArc;

use crate::anim::Jitter;
use crate::buffer::PixelBuffer;
use crate::compose::{FrameTransforms, compose};
use crate::encode::{AnimationEncoder, encode_still_png};
use crate::error::{StickerError, StickerResult};
use crate::sticker::Sticker;
use crate::transform::Transform2D;

/// Editing resolution of the sticker canvas.
pub const CANONICAL_SIZE: u32 = 240;
/// Resolution of exported stickers.
pub const EXPORT_SIZE: u32 = 200;
/// Frames per exported animation loop.
pub const EXPORT_FRAMES: u32 = 3;
/// Default deadline for the encoder before the export times out.
pub const DEFAULT_ENCODE_TIMEOUT: Duration = Duration::from_secs(60);
/// Pack preview asset sizes.
pub const THUMBNAIL_SIZE: u32 = 120;
pub const SMALL_THUMBNAIL_SIZE: u32 = 50;

#[derive(Clone, Debug)]
pub struct ExportOptions {
    pub size: u32,
    pub frames: u32,
    pub encode_timeout: Duration,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            size: EXPORT_SIZE,
            frames: EXPORT_FRAMES,
            encode_timeout: DEFAULT_ENCODE_TIMEOUT,
        }
    }
}

/// Lifecycle of one export, reported through tracing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ExportPhase {
    Idle,
    ComposingFrames,
    Encoding,
    Finished,
    TimedOut,
    Aborted,
}

#[derive(Clone, Debug)]
pub enum ExportArtifact {
    Gif {
        bytes: Vec<u8>,
        delay_ms: u32,
        frame_count: u32,
    },
    StillPng(Vec<u8>),
}

impl ExportArtifact {
    pub fn bytes(&self) -> &[u8] {
        match self {
            Self::Gif { bytes, .. } => bytes,
            Self::StillPng(bytes) => bytes,
        }
    }
}

/// Whether exporting this sticker yields motion at all: the sticker-wide
/// descriptor or any region descriptor. Which transform scope actually
/// applies per frame is the compositor's concern, not this gate's.
pub fn animation_active(sticker: &Sticker) -> bool {
    sticker.animation.is_active() || sticker.regions().iter().any(|r| r.animation.is_active())
}

/// Per-frame delay: faster animation settings shorten it, floored at 50 ms.
/// The maximum runs over every active descriptor, sticker-wide included.
pub fn frame_delay_ms(sticker: &Sticker) -> u32 {
    let max_speed = sticker
        .regions()
        .iter()
        .map(|r| &r.animation)
        .chain(std::iter::once(&sticker.animation))
        .filter(|a| a.is_active())
        .map(|a| a.speed)
        .max()
        .unwrap_or(0);
    (200u32).saturating_sub(max_speed as u32 * 15).max(50)
}

/// Sample and compose every frame of the loop. Frame `i` of `n` gets phase
/// `i/n * 2pi`, shared across all regions so they stay in lockstep.
pub fn sample_frames(
    sticker: &Sticker,
    opts: &ExportOptions,
    font: Option<&FontArc>,
    jitter: &mut impl Jitter,
) -> StickerResult<Vec<PixelBuffer>> {
    if opts.frames == 0 {
        return Err(StickerError::validation("frame count must be non-zero"));
    }
    let mut frames = Vec::with_capacity(opts.frames as usize);
    for i in 0..opts.frames {
        let progress = i as f64 / opts.frames as f64 * std::f64::consts::TAU;
        let transforms = if sticker.regions().is_empty() {
            FrameTransforms {
                global: stacked(
                    sticker.global_transform,
                    sticker.animation.sample(progress, jitter),
                ),
                regions: Vec::new(),
            }
        } else {
            FrameTransforms {
                global: Transform2D::IDENTITY,
                regions: sticker
                    .regions()
                    .iter()
                    .map(|r| r.animation.sample(progress, jitter))
                    .collect(),
            }
        };
        frames.push(compose(sticker, &transforms, opts.size, font)?);
    }
    Ok(frames)
}

/// Compose the sticker at rest, for still exports and previews.
pub fn compose_still(
    sticker: &Sticker,
    size: u32,
    font: Option<&FontArc>,
) -> StickerResult<PixelBuffer> {
    let mut transforms = FrameTransforms::identity(sticker.regions().len());
    if sticker.regions().is_empty() {
        transforms.global = sticker.global_transform;
    }
    compose(sticker, &transforms, size, font)
}

/// Run a full animated export.
///
/// Frames are composed on the calling thread, then handed to the encoder on
/// a worker thread while this thread waits on the result channel with a
/// deadline. On timeout or external abort the cancel token is set so the
/// worker can stop at its next frame boundary; the worker is not joined.
pub fn export<E>(
    sticker: &Sticker,
    encoder: E,
    font: Option<&FontArc>,
    jitter: &mut impl Jitter,
    opts: &ExportOptions,
    cancel: Arc<AtomicBool>,
) -> StickerResult<ExportArtifact>
where
    E: AnimationEncoder + 'static,
{
    let mut phase = ExportPhase::Idle;
    transition(&mut phase, ExportPhase::ComposingFrames);
    let frames = sample_frames(sticker, opts, font, jitter)?;
    let delay_ms = frame_delay_ms(sticker);

    transition(&mut phase, ExportPhase::Encoding);
    let (tx, rx) = mpsc::channel();
    let worker_cancel = Arc::clone(&cancel);
    let worker_frames = frames;
    std::thread::spawn(move || {
        let result = encoder.encode(&worker_frames, delay_ms, &worker_cancel);
        let _ = tx.send(result);
    });

    match rx.recv_timeout(opts.encode_timeout) {
        Ok(Ok(bytes)) => {
            transition(&mut phase, ExportPhase::Finished);
            Ok(ExportArtifact::Gif {
                bytes,
                delay_ms,
                frame_count: opts.frames,
            })
        }
        Ok(Err(StickerError::EncodingAborted)) => {
            transition(&mut phase, ExportPhase::Aborted);
            Err(StickerError::EncodingAborted)
        }
        Ok(Err(err)) => {
            transition(&mut phase, ExportPhase::Aborted);
            Err(err)
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            cancel.store(true, std::sync::atomic::Ordering::Relaxed);
            transition(&mut phase, ExportPhase::TimedOut);
            Err(StickerError::EncodingTimeout(opts.encode_timeout))
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => {
            transition(&mut phase, ExportPhase::Aborted);
            Err(StickerError::encoding("encoder worker vanished"))
        }
    }
}

/// Export with the still-image fallback: an inactive animation
/// short-circuits to a still PNG, and recoverable encoder failures retry
/// once as a still PNG.
pub fn export_with_fallback<E>(
    sticker: &Sticker,
    encoder: E,
    font: Option<&FontArc>,
    jitter: &mut impl Jitter,
    opts: &ExportOptions,
    cancel: Arc<AtomicBool>,
) -> StickerResult<ExportArtifact>
where
    E: AnimationEncoder + 'static,
{
    if !animation_active(sticker) {
        tracing::info!("no active animation, exporting a still");
        let still = compose_still(sticker, opts.size, font)?;
        return Ok(ExportArtifact::StillPng(encode_still_png(&still)?));
    }

    match export(sticker, encoder, font, jitter, opts, cancel) {
        Ok(artifact) => Ok(artifact),
        Err(err) if err.is_recoverable_encode_failure() => {
            tracing::warn!(error = %err, "animated export failed, falling back to still");
            let still = compose_still(sticker, opts.size, font)?;
            Ok(ExportArtifact::StillPng(encode_still_png(&still)?))
        }
        Err(err) => Err(err),
    }
}

fn transition(phase: &mut ExportPhase, next: ExportPhase) {
    tracing::debug!(from = ?phase, to = ?next, "export phase");
    *phase = next;
}

// The static user transform and the sampled animation transform apply
// together on the no-regions path.
fn stacked(base: Transform2D, anim: Transform2D) -> Transform2D {
    Transform2D {
        translate: base.translate + anim.translate,
        rotate_rad: base.rotate_rad + anim.rotate_rad,
        scale: base.scale * anim.scale,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anim::{AnimationDescriptor, AnimationKind, NoJitter};
    use crate::encode::GifAnimationEncoder;

    fn animated_sticker() -> Sticker {
        let mut s = Sticker::new(PixelBuffer::solid(24, 24, [200, 30, 30, 255]).unwrap());
        s.animation = AnimationDescriptor::new(AnimationKind::Swing, 10, 10);
        s
    }

    #[test]
    fn delay_formula_endpoints() {
        let mut s = animated_sticker();
        assert_eq!(frame_delay_ms(&s), 50); // speed 10

        s.animation.speed = 1;
        assert_eq!(frame_delay_ms(&s), 185);

        s.animation.enabled = false;
        assert_eq!(frame_delay_ms(&s), 200);
    }

    #[test]
    fn delay_uses_fastest_region() {
        let mut s = Sticker::new(PixelBuffer::solid(24, 24, [1, 1, 1, 255]).unwrap());
        s.add_rect_region(0.0, 0.0, 8.0, 8.0, AnimationDescriptor::new(AnimationKind::Swing, 2, 5))
            .unwrap();
        s.add_rect_region(8.0, 0.0, 8.0, 8.0, AnimationDescriptor::new(AnimationKind::Pulse, 8, 5))
            .unwrap();
        assert_eq!(frame_delay_ms(&s), 200 - 8 * 15);
    }

    #[test]
    fn delay_includes_sticker_wide_speed() {
        // Sticker-wide speed 10 outranks a slow region.
        let mut s = animated_sticker();
        s.add_rect_region(0.0, 0.0, 8.0, 8.0, AnimationDescriptor::new(AnimationKind::Swing, 2, 5))
            .unwrap();
        assert_eq!(frame_delay_ms(&s), 50);
    }

    #[test]
    fn animation_active_is_an_or_over_all_scopes() {
        let mut s = animated_sticker();
        assert!(animation_active(&s));

        // An inactive region does not mute the enabled sticker-wide descriptor.
        s.add_rect_region(0.0, 0.0, 8.0, 8.0, AnimationDescriptor::default())
            .unwrap();
        assert!(animation_active(&s));

        // Only an active region keeps the export animated once the
        // sticker-wide descriptor is off.
        s.animation.enabled = false;
        assert!(!animation_active(&s));
        s.set_region_animation(
            s.regions()[0].id,
            AnimationDescriptor::new(AnimationKind::Pulse, 4, 4),
        )
        .unwrap();
        assert!(animation_active(&s));
    }

    #[test]
    fn sample_frames_count_and_motion() {
        let s = animated_sticker();
        let opts = ExportOptions {
            size: 24,
            frames: 3,
            ..ExportOptions::default()
        };
        let frames = sample_frames(&s, &opts, None, &mut NoJitter).unwrap();
        assert_eq!(frames.len(), 3);
        // Swing at phase 2pi/3 differs from phase 0.
        assert_ne!(frames[0], frames[1]);
    }

    #[test]
    fn export_produces_gif_artifact() {
        let s = animated_sticker();
        let opts = ExportOptions {
            size: 24,
            frames: 3,
            ..ExportOptions::default()
        };
        let artifact = export(
            &s,
            GifAnimationEncoder,
            None,
            &mut NoJitter,
            &opts,
            Arc::new(AtomicBool::new(false)),
        )
        .unwrap();
        match artifact {
            ExportArtifact::Gif {
                bytes,
                delay_ms,
                frame_count,
            } => {
                assert_eq!(&bytes[..6], b"GIF89a");
                assert_eq!(delay_ms, 50);
                assert_eq!(frame_count, 3);
            }
            ExportArtifact::StillPng(_) => panic!("expected gif"),
        }
    }

    #[test]
    fn inactive_animation_falls_back_to_still() {
        let mut s = animated_sticker();
        s.animation.enabled = false;
        let opts = ExportOptions {
            size: 24,
            frames: 3,
            ..ExportOptions::default()
        };
        let artifact = export_with_fallback(
            &s,
            GifAnimationEncoder,
            None,
            &mut NoJitter,
            &opts,
            Arc::new(AtomicBool::new(false)),
        )
        .unwrap();
        assert!(matches!(artifact, ExportArtifact::StillPng(_)));
    }

    struct FailingEncoder;

    impl AnimationEncoder for FailingEncoder {
        fn encode(
            &self,
            _frames: &[PixelBuffer],
            _delay_ms: u32,
            _cancel: &AtomicBool,
        ) -> StickerResult<Vec<u8>> {
            Err(StickerError::encoding("synthetic failure"))
        }
    }

    #[test]
    fn encoder_failure_recovers_as_still() {
        let s = animated_sticker();
        let opts = ExportOptions {
            size: 24,
            frames: 3,
            ..ExportOptions::default()
        };
        let artifact = export_with_fallback(
            &s,
            FailingEncoder,
            None,
            &mut NoJitter,
            &opts,
            Arc::new(AtomicBool::new(false)),
        )
        .unwrap();
        assert!(matches!(artifact, ExportArtifact::StillPng(_)));
    }

    #[test]
    fn zero_frames_rejected() {
        let s = animated_sticker();
        let opts = ExportOptions {
            size: 24,
            frames: 0,
            ..ExportOptions::default()
        };
        assert!(sample_frames(&s, &opts, None, &mut NoJitter).is_err());
    }
}
