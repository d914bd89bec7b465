use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use stickermill::{
    AnimationDescriptor, AnimationKind, AnimationEncoder, ExportArtifact, ExportOptions,
    NoJitter, PixelBuffer, Sticker, StickerError, StickerResult, export, export_with_fallback,
};

/// Encoder that never finishes on its own; it only returns once the cancel
/// token is set, like a wedged external encoder being torn down.
struct StallingEncoder;

impl AnimationEncoder for StallingEncoder {
    fn encode(
        &self,
        _frames: &[PixelBuffer],
        _delay_ms: u32,
        cancel: &AtomicBool,
    ) -> StickerResult<Vec<u8>> {
        while !cancel.load(Ordering::Relaxed) {
            std::thread::sleep(Duration::from_millis(5));
        }
        Err(StickerError::EncodingAborted)
    }
}

fn swinging_sticker() -> Sticker {
    let mut sticker = Sticker::new(PixelBuffer::solid(32, 32, [40, 180, 90, 255]).unwrap());
    sticker.animation = AnimationDescriptor::new(AnimationKind::Swing, 5, 5);
    sticker
}

fn short_timeout_opts() -> ExportOptions {
    ExportOptions {
        size: 32,
        frames: 3,
        encode_timeout: Duration::from_millis(50),
    }
}

#[test]
fn stalled_encoder_times_out_and_sets_cancel() {
    let cancel = Arc::new(AtomicBool::new(false));
    let err = export(
        &swinging_sticker(),
        StallingEncoder,
        None,
        &mut NoJitter,
        &short_timeout_opts(),
        Arc::clone(&cancel),
    )
    .unwrap_err();

    assert!(matches!(err, StickerError::EncodingTimeout(_)));
    assert!(cancel.load(Ordering::Relaxed), "cancel token not released");
}

#[test]
fn timeout_falls_back_to_still_png() {
    let artifact = export_with_fallback(
        &swinging_sticker(),
        StallingEncoder,
        None,
        &mut NoJitter,
        &short_timeout_opts(),
        Arc::new(AtomicBool::new(false)),
    )
    .unwrap();

    let ExportArtifact::StillPng(bytes) = artifact else {
        panic!("expected still fallback");
    };
    assert_eq!(&bytes[..8], &[0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a]);
}

#[test]
fn external_abort_surfaces_as_aborted() {
    let cancel = Arc::new(AtomicBool::new(false));
    let aborter = Arc::clone(&cancel);
    std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(10));
        aborter.store(true, Ordering::Relaxed);
    });

    let opts = ExportOptions {
        encode_timeout: Duration::from_secs(5),
        ..short_timeout_opts()
    };
    let err = export(
        &swinging_sticker(),
        StallingEncoder,
        None,
        &mut NoJitter,
        &opts,
        cancel,
    )
    .unwrap_err();
    assert!(matches!(err, StickerError::EncodingAborted));
}
