use kurbo::{Affine, Point, Vec2};

use crate::buffer::PixelBuffer;
use crate::error::{StickerError, StickerResult};

/// Translation, rotation and uniform scale, always composed about the canvas
/// center: `translate(center) -> rotate -> scale -> translate(offset)`.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Transform2D {
    pub translate: Vec2,
    pub rotate_rad: f64,
    pub scale: f64,
}

impl Transform2D {
    pub const IDENTITY: Self = Self {
        translate: Vec2::new(0.0, 0.0),
        rotate_rad: 0.0,
        scale: 1.0,
    };

    pub fn is_identity(&self) -> bool {
        self.translate.x == 0.0
            && self.translate.y == 0.0
            && self.rotate_rad == 0.0
            && self.scale == 1.0
    }

    /// Forward affine mapping source coordinates to destination coordinates
    /// on a square canvas of `canvas_size` pixels.
    pub fn to_affine(&self, canvas_size: u32) -> Affine {
        let c = canvas_size as f64 / 2.0;
        Affine::translate(Vec2::new(c, c))
            * Affine::rotate(self.rotate_rad)
            * Affine::scale(self.scale)
            * Affine::translate(self.translate)
            * Affine::translate(Vec2::new(-c, -c))
    }
}

impl Default for Transform2D {
    fn default() -> Self {
        Self::IDENTITY
    }
}

/// Draw `src` onto `dst` through `affine`, compositing source-over.
///
/// Each destination pixel is inverse-mapped and bilinearly sampled from the
/// source; samples outside the source are transparent. A degenerate
/// (non-invertible) affine is a validation error.
pub fn draw_transformed(
    dst: &mut PixelBuffer,
    src: &PixelBuffer,
    affine: Affine,
) -> StickerResult<()> {
    if affine.determinant().abs() < 1e-12 {
        return Err(StickerError::validation(
            "transform is not invertible (scale ~ 0)",
        ));
    }
    let inverse = affine.inverse();

    for y in 0..dst.height() {
        for x in 0..dst.width() {
            let p = inverse * Point::new(x as f64 + 0.5, y as f64 + 0.5);
            let sample = src.sample_bilinear(p.x - 0.5, p.y - 0.5);
            if sample[3] == 0 {
                continue;
            }
            let under = dst.pixel(x, y);
            dst.set_pixel(x, y, over_straight(under, sample));
        }
    }
    Ok(())
}

/// Fast path: blit `src` over `dst` with no transform. Sizes must match.
pub fn draw_identity(dst: &mut PixelBuffer, src: &PixelBuffer) -> StickerResult<()> {
    if dst.width() != src.width() || dst.height() != src.height() {
        return Err(StickerError::validation(
            "identity draw expects equal-size buffers",
        ));
    }
    for (d, s) in dst
        .data_mut()
        .chunks_exact_mut(4)
        .zip(src.data().chunks_exact(4))
    {
        if s[3] == 0 {
            continue;
        }
        let out = over_straight([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]]);
        d.copy_from_slice(&out);
    }
    Ok(())
}

/// Source-over for straight-alpha RGBA8.
pub fn over_straight(dst: [u8; 4], src: [u8; 4]) -> [u8; 4] {
    let sa = src[3] as u32;
    if sa == 255 {
        return src;
    }
    if sa == 0 {
        return dst;
    }
    let da = dst[3] as u32;
    let inv = 255 - sa;
    let out_a = sa + mul_div255(da, inv);
    if out_a == 0 {
        return [0, 0, 0, 0];
    }

    let mut out = [0u8; 4];
    for i in 0..3 {
        let sc = src[i] as u32 * sa;
        let dc = dst[i] as u32 * mul_div255(da, inv);
        out[i] = ((sc + dc) / out_a).min(255) as u8;
    }
    out[3] = out_a.min(255) as u8;
    out
}

fn mul_div255(x: u32, y: u32) -> u32 {
    ((x * y) + 127) / 255
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_affine_maps_points_unchanged() {
        let a = Transform2D::IDENTITY.to_affine(240);
        let p = a * Point::new(17.0, 42.0);
        assert!((p.x - 17.0).abs() < 1e-9);
        assert!((p.y - 42.0).abs() < 1e-9);
    }

    #[test]
    fn translate_only_shifts() {
        let t = Transform2D {
            translate: Vec2::new(10.0, -5.0),
            ..Transform2D::IDENTITY
        };
        let p = t.to_affine(240) * Point::new(0.0, 0.0);
        assert!((p.x - 10.0).abs() < 1e-9);
        assert!((p.y + 5.0).abs() < 1e-9);
    }

    #[test]
    fn scale_is_about_canvas_center() {
        let t = Transform2D {
            scale: 2.0,
            ..Transform2D::IDENTITY
        };
        let a = t.to_affine(240);
        let center = a * Point::new(120.0, 120.0);
        assert!((center.x - 120.0).abs() < 1e-9);
        assert!((center.y - 120.0).abs() < 1e-9);
        let edge = a * Point::new(0.0, 120.0);
        assert!((edge.x + 120.0).abs() < 1e-9);
    }

    #[test]
    fn draw_identity_is_lossless_over_empty() {
        let src = PixelBuffer::solid(8, 8, [5, 6, 7, 255]).unwrap();
        let mut dst = PixelBuffer::new(8, 8).unwrap();
        draw_identity(&mut dst, &src).unwrap();
        assert_eq!(dst, src);
    }

    #[test]
    fn draw_transformed_translates_pixels() {
        let mut src = PixelBuffer::new(16, 16).unwrap();
        src.set_pixel(4, 4, [255, 0, 0, 255]);
        let t = Transform2D {
            translate: Vec2::new(3.0, 0.0),
            ..Transform2D::IDENTITY
        };
        let mut dst = PixelBuffer::new(16, 16).unwrap();
        draw_transformed(&mut dst, &src, t.to_affine(16)).unwrap();
        assert_eq!(dst.pixel(7, 4)[3], 255);
        assert_eq!(dst.pixel(4, 4)[3], 0);
    }

    #[test]
    fn degenerate_scale_is_rejected() {
        let t = Transform2D {
            scale: 0.0,
            ..Transform2D::IDENTITY
        };
        let src = PixelBuffer::new(8, 8).unwrap();
        let mut dst = PixelBuffer::new(8, 8).unwrap();
        assert!(draw_transformed(&mut dst, &src, t.to_affine(8)).is_err());
    }

    #[test]
    fn over_straight_opaque_src_wins() {
        assert_eq!(
            over_straight([0, 0, 0, 255], [200, 10, 10, 255]),
            [200, 10, 10, 255]
        );
        assert_eq!(over_straight([9, 9, 9, 9], [0, 0, 0, 0]), [9, 9, 9, 9]);
    }
}
