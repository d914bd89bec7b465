use std::sync::atomic::{AtomicBool, Ordering};

use crate::buffer::PixelBuffer;
use crate::error::{StickerError, StickerResult};

/// Animation encoder contract: ordered raw RGBA frames plus a uniform
/// per-frame delay in, an encoded blob out.
///
/// `cancel` is a cooperative token the exporter sets on timeout or abort;
/// implementations check it at frame boundaries and bail with
/// `EncodingAborted`.
pub trait AnimationEncoder: Send {
    fn encode(
        &self,
        frames: &[PixelBuffer],
        delay_ms: u32,
        cancel: &AtomicBool,
    ) -> StickerResult<Vec<u8>>;
}

/// GIF encoder over the `gif` crate, looping forever.
#[derive(Clone, Copy, Debug, Default)]
pub struct GifAnimationEncoder;

impl AnimationEncoder for GifAnimationEncoder {
    fn encode(
        &self,
        frames: &[PixelBuffer],
        delay_ms: u32,
        cancel: &AtomicBool,
    ) -> StickerResult<Vec<u8>> {
        let first = frames
            .first()
            .ok_or_else(|| StickerError::validation("cannot encode zero frames"))?;
        let width = u16::try_from(first.width())
            .map_err(|_| StickerError::validation("frame too wide for gif"))?;
        let height = u16::try_from(first.height())
            .map_err(|_| StickerError::validation("frame too tall for gif"))?;

        let mut out = Vec::new();
        {
            let mut encoder = gif::Encoder::new(&mut out, width, height, &[])
                .map_err(|e| StickerError::encoding(format!("gif init failed: {e}")))?;
            encoder
                .set_repeat(gif::Repeat::Infinite)
                .map_err(|e| StickerError::encoding(format!("gif repeat failed: {e}")))?;

            // gif delays are centiseconds.
            let delay = (delay_ms / 10).max(1) as u16;

            for frame in frames {
                if cancel.load(Ordering::Relaxed) {
                    return Err(StickerError::EncodingAborted);
                }
                if frame.width() != first.width() || frame.height() != first.height() {
                    return Err(StickerError::validation("frames differ in size"));
                }
                let mut pixels = frame.data().to_vec();
                let mut gif_frame =
                    gif::Frame::from_rgba_speed(width, height, &mut pixels, 10);
                gif_frame.delay = delay;
                encoder
                    .write_frame(&gif_frame)
                    .map_err(|e| StickerError::encoding(format!("gif frame failed: {e}")))?;
            }
        }
        Ok(out)
    }
}

/// Single-frame PNG used by the still-image fallback path.
pub fn encode_still_png(frame: &PixelBuffer) -> StickerResult<Vec<u8>> {
    frame.encode_png()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cancel_token(set: bool) -> AtomicBool {
        AtomicBool::new(set)
    }

    #[test]
    fn gif_roundtrip_produces_looping_animation() {
        let frames = vec![
            PixelBuffer::solid(8, 8, [255, 0, 0, 255]).unwrap(),
            PixelBuffer::solid(8, 8, [0, 255, 0, 255]).unwrap(),
            PixelBuffer::solid(8, 8, [0, 0, 255, 255]).unwrap(),
        ];
        let bytes = GifAnimationEncoder
            .encode(&frames, 150, &cancel_token(false))
            .unwrap();
        assert_eq!(&bytes[..6], b"GIF89a");

        let mut options = gif::DecodeOptions::new();
        options.set_color_output(gif::ColorOutput::RGBA);
        let mut decoder = options.read_info(std::io::Cursor::new(&bytes)).unwrap();
        let mut count = 0;
        while let Some(frame) = decoder.read_next_frame().unwrap() {
            assert_eq!(frame.delay, 15);
            count += 1;
        }
        assert_eq!(count, 3);
    }

    #[test]
    fn zero_frames_is_a_validation_error() {
        let err = GifAnimationEncoder
            .encode(&[], 100, &cancel_token(false))
            .unwrap_err();
        assert!(matches!(err, StickerError::Validation(_)));
    }

    #[test]
    fn pre_set_cancel_aborts_before_first_frame() {
        let frames = vec![PixelBuffer::solid(4, 4, [1, 2, 3, 255]).unwrap()];
        let err = GifAnimationEncoder
            .encode(&frames, 100, &cancel_token(true))
            .unwrap_err();
        assert!(matches!(err, StickerError::EncodingAborted));
    }

    #[test]
    fn mismatched_frame_sizes_rejected() {
        let frames = vec![
            PixelBuffer::solid(8, 8, [1, 1, 1, 255]).unwrap(),
            PixelBuffer::solid(4, 4, [1, 1, 1, 255]).unwrap(),
        ];
        assert!(
            GifAnimationEncoder
                .encode(&frames, 100, &cancel_token(false))
                .is_err()
        );
    }

    #[test]
    fn still_png_has_png_signature() {
        let frame = PixelBuffer::solid(4, 4, [9, 9, 9, 255]).unwrap();
        let bytes = encode_still_png(&frame).unwrap();
        assert_eq!(&bytes[..8], &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]);
    }
}
