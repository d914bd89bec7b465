use crate::buffer::PixelBuffer;
use crate::error::StickerResult;

/// Alpha mask over the canonical sticker canvas: 255 = inside the region,
/// 0 = outside. RGB channels mirror the alpha so masks render white when
/// previewed, but only alpha is meaningful.
///
/// Masks are always authored at the canonical canvas size; applying one at a
/// different resolution requires explicit coordinate scaling by the caller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegionMask {
    pixels: PixelBuffer,
}

impl RegionMask {
    /// Build a mask from an axis-aligned rectangle, clamped to canvas bounds.
    ///
    /// Returns `None` for a degenerate rectangle (`w <= 0` or `h <= 0`) or one
    /// entirely outside the canvas — an empty drag must not create a region.
    pub fn from_rect(x: f64, y: f64, w: f64, h: f64, canvas: u32) -> Option<Self> {
        if w <= 0.0 || h <= 0.0 {
            return None;
        }

        let x0 = x.round().max(0.0) as u32;
        let y0 = y.round().max(0.0) as u32;
        let x1 = ((x + w).round().max(0.0) as u32).min(canvas);
        let y1 = ((y + h).round().max(0.0) as u32).min(canvas);
        if x0 >= x1 || y0 >= y1 {
            return None;
        }

        let mut pixels = PixelBuffer::new(canvas, canvas).ok()?;
        for py in y0..y1 {
            for px in x0..x1 {
                pixels.set_pixel(px, py, [255, 255, 255, 255]);
            }
        }
        Some(Self { pixels })
    }

    /// Build a mask from a color-similarity flood fill starting at the seed
    /// pixel. Returns `None` when the seed is already fully transparent.
    pub fn from_flood_fill(
        source: &PixelBuffer,
        seed_x: u32,
        seed_y: u32,
        tolerance: u8,
    ) -> Option<Self> {
        let mut pixels = PixelBuffer::new(source.width(), source.height()).ok()?;
        let mut any = false;
        flood_fill(source.clone(), seed_x, seed_y, tolerance, |buf, x, y| {
            // Leave the scratch copy untouched; mark the mask instead.
            let _ = buf;
            pixels.set_pixel(x, y, [255, 255, 255, 255]);
            any = true;
        })?;
        any.then_some(Self { pixels })
    }

    pub fn size(&self) -> u32 {
        self.pixels.width()
    }

    /// Mask alpha at a canonical-space coordinate.
    #[inline]
    pub fn alpha(&self, x: u32, y: u32) -> u8 {
        self.pixels.alpha(x, y)
    }

    /// Mask alpha looked up for a pixel of an `out_size`-wide buffer; the
    /// coordinate is floor-mapped back into canonical mask space.
    #[inline]
    pub fn alpha_scaled(&self, x: u32, y: u32, out_size: u32) -> u8 {
        if out_size == self.size() {
            return self.alpha(x, y);
        }
        let ratio = self.size() as f64 / out_size as f64;
        let mx = ((x as f64 * ratio) as u32).min(self.size() - 1);
        let my = ((y as f64 * ratio) as u32).min(self.size() - 1);
        self.alpha(mx, my)
    }

    pub fn opaque_pixel_count(&self) -> usize {
        self.pixels.opaque_pixel_count()
    }
}

/// Erase a contiguous color area in place: every pixel reached by the flood
/// fill has its alpha set to 0. No-op when the seed pixel is already fully
/// transparent (which also makes the operation idempotent).
pub fn flood_fill_transparency(
    buffer: &mut PixelBuffer,
    seed_x: u32,
    seed_y: u32,
    tolerance: u8,
) -> StickerResult<()> {
    let scratch = buffer.clone();
    if flood_fill(scratch, seed_x, seed_y, tolerance, |_, x, y| {
        buffer.set_alpha(x, y, 0);
    })
    .is_none()
    {
        tracing::debug!(seed_x, seed_y, "flood fill no-op (seed transparent or out of bounds)");
    }
    Ok(())
}

/// 4-connected flood fill over a color-tolerance predicate anchored at the
/// seed pixel's RGB. Calls `visit` for every matching pixel exactly once.
///
/// Explicit stack, not recursion: a large contiguous region must not be able
/// to overflow the call stack.
fn flood_fill(
    source: PixelBuffer,
    seed_x: u32,
    seed_y: u32,
    tolerance: u8,
    mut visit: impl FnMut(&PixelBuffer, u32, u32),
) -> Option<()> {
    if !source.in_bounds(seed_x as i64, seed_y as i64) {
        return None;
    }
    let [seed_r, seed_g, seed_b, seed_a] = source.pixel(seed_x, seed_y);
    if seed_a == 0 {
        return None;
    }

    let width = source.width();
    let height = source.height();
    let tol = tolerance as i16;
    let matches = |x: u32, y: u32| -> bool {
        let [r, g, b, a] = source.pixel(x, y);
        a != 0
            && (r as i16 - seed_r as i16).abs() <= tol
            && (g as i16 - seed_g as i16).abs() <= tol
            && (b as i16 - seed_b as i16).abs() <= tol
    };

    let mut seen = vec![false; (width as usize) * (height as usize)];
    let mut stack = vec![(seed_x, seed_y)];

    while let Some((x, y)) = stack.pop() {
        let idx = (y as usize) * (width as usize) + (x as usize);
        if seen[idx] {
            continue;
        }
        seen[idx] = true;

        if !matches(x, y) {
            continue;
        }
        visit(&source, x, y);

        if x > 0 {
            stack.push((x - 1, y));
        }
        if x + 1 < width {
            stack.push((x + 1, y));
        }
        if y > 0 {
            stack.push((x, y - 1));
        }
        if y + 1 < height {
            stack.push((x, y + 1));
        }
    }

    Some(())
}
