use crate::error::{StickerError, StickerResult};

/// Straight-alpha RGBA8 pixel buffer, row-major, 4 bytes per pixel.
///
/// Owned exclusively by whoever holds it; components hand buffers off by
/// value or clone, never share them mutably.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    width: u32,
    height: u32,
    data: Vec<u8>,
}

impl PixelBuffer {
    /// Fully transparent buffer of the given dimensions.
    pub fn new(width: u32, height: u32) -> StickerResult<Self> {
        if width == 0 || height == 0 {
            return Err(StickerError::validation(
                "pixel buffer dimensions must be non-zero",
            ));
        }
        Ok(Self {
            width,
            height,
            data: vec![0u8; byte_len(width, height)],
        })
    }

    /// Buffer filled with a single straight-alpha color.
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> StickerResult<Self> {
        let mut buf = Self::new(width, height)?;
        for px in buf.data.chunks_exact_mut(4) {
            px.copy_from_slice(&rgba);
        }
        Ok(buf)
    }

    /// Wrap an existing RGBA byte vector. Length must be `width*height*4`.
    pub fn from_rgba(width: u32, height: u32, data: Vec<u8>) -> StickerResult<Self> {
        if width == 0 || height == 0 {
            return Err(StickerError::validation(
                "pixel buffer dimensions must be non-zero",
            ));
        }
        if data.len() != byte_len(width, height) {
            return Err(StickerError::validation(format!(
                "pixel data length {} does not match {}x{}x4",
                data.len(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Decode an encoded image (PNG, JPEG, ...) and resample it to a square
    /// of `size` pixels. Decode failures surface as `ResourceUnavailable`.
    pub fn decode(bytes: &[u8], size: u32) -> StickerResult<Self> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| StickerError::resource(format!("failed to decode base image: {e}")))?
            .to_rgba8();
        let (w, h) = img.dimensions();
        let decoded = Self::from_rgba(w, h, img.into_raw())?;
        if w == size && h == size {
            return Ok(decoded);
        }
        decoded.resample(size, size)
    }

    /// Encode as PNG bytes.
    pub fn encode_png(&self) -> StickerResult<Vec<u8>> {
        let mut out = std::io::Cursor::new(Vec::new());
        image::write_buffer_with_format(
            &mut out,
            &self.data,
            self.width,
            self.height,
            image::ExtendedColorType::Rgba8,
            image::ImageFormat::Png,
        )
        .map_err(|e| StickerError::encoding(format!("png encode failed: {e}")))?;
        Ok(out.into_inner())
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_rgba(self) -> Vec<u8> {
        self.data
    }

    #[inline]
    pub fn in_bounds(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as u32) < self.width && (y as u32) < self.height
    }

    #[inline]
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        let i = self.index(x, y);
        [self.data[i], self.data[i + 1], self.data[i + 2], self.data[i + 3]]
    }

    #[inline]
    pub fn set_pixel(&mut self, x: u32, y: u32, rgba: [u8; 4]) {
        let i = self.index(x, y);
        self.data[i..i + 4].copy_from_slice(&rgba);
    }

    #[inline]
    pub fn alpha(&self, x: u32, y: u32) -> u8 {
        self.data[self.index(x, y) + 3]
    }

    #[inline]
    pub fn set_alpha(&mut self, x: u32, y: u32, a: u8) {
        let i = self.index(x, y) + 3;
        self.data[i] = a;
    }

    #[inline]
    fn index(&self, x: u32, y: u32) -> usize {
        debug_assert!(x < self.width && y < self.height);
        ((y as usize) * (self.width as usize) + (x as usize)) * 4
    }

    /// Copy a rectangular sub-buffer. The rectangle is clamped to bounds.
    pub fn sub_buffer(&self, x: u32, y: u32, w: u32, h: u32) -> StickerResult<Self> {
        let x1 = (x + w).min(self.width);
        let y1 = (y + h).min(self.height);
        if x >= x1 || y >= y1 {
            return Err(StickerError::validation("sub-buffer rectangle is empty"));
        }
        let mut out = Self::new(x1 - x, y1 - y)?;
        for (dy, sy) in (y..y1).enumerate() {
            let src0 = self.index(x, sy);
            let src1 = self.index(x1 - 1, sy) + 4;
            let dst0 = (dy * out.width as usize) * 4;
            out.data[dst0..dst0 + (src1 - src0)].copy_from_slice(&self.data[src0..src1]);
        }
        Ok(out)
    }

    /// Bilinear resample into a new buffer.
    pub fn resample(&self, width: u32, height: u32) -> StickerResult<Self> {
        let mut out = Self::new(width, height)?;
        let sx = self.width as f64 / width as f64;
        let sy = self.height as f64 / height as f64;
        for y in 0..height {
            for x in 0..width {
                // Sample at the destination pixel center mapped into source space.
                let fx = (x as f64 + 0.5) * sx - 0.5;
                let fy = (y as f64 + 0.5) * sy - 0.5;
                out.set_pixel(x, y, self.sample_bilinear(fx, fy));
            }
        }
        Ok(out)
    }

    /// Bilinear sample at a fractional source coordinate. Reads outside the
    /// buffer are treated as fully transparent.
    ///
    /// Interpolation happens in premultiplied space so partially transparent
    /// neighbors do not drag the color toward black at mask edges; the result
    /// is converted back to straight alpha.
    pub fn sample_bilinear(&self, fx: f64, fy: f64) -> [u8; 4] {
        let x0 = fx.floor() as i64;
        let y0 = fy.floor() as i64;
        let tx = fx - x0 as f64;
        let ty = fy - y0 as f64;

        let fetch = |x: i64, y: i64| -> [f64; 4] {
            if self.in_bounds(x, y) {
                let p = self.pixel(x as u32, y as u32);
                let a = p[3] as f64;
                let w = a / 255.0;
                [p[0] as f64 * w, p[1] as f64 * w, p[2] as f64 * w, a]
            } else {
                [0.0; 4]
            }
        };

        let p00 = fetch(x0, y0);
        let p10 = fetch(x0 + 1, y0);
        let p01 = fetch(x0, y0 + 1);
        let p11 = fetch(x0 + 1, y0 + 1);

        let mut premul = [0f64; 4];
        for c in 0..4 {
            let top = p00[c] + (p10[c] - p00[c]) * tx;
            let bot = p01[c] + (p11[c] - p01[c]) * tx;
            premul[c] = top + (bot - top) * ty;
        }

        let a = premul[3];
        if a < 0.5 {
            return [0, 0, 0, 0];
        }
        let unweight = 255.0 / a;
        [
            (premul[0] * unweight).round().clamp(0.0, 255.0) as u8,
            (premul[1] * unweight).round().clamp(0.0, 255.0) as u8,
            (premul[2] * unweight).round().clamp(0.0, 255.0) as u8,
            a.round().clamp(0.0, 255.0) as u8,
        ]
    }

    /// Make near-white pixels fully transparent (background removal for
    /// generated sticker art on a white backdrop).
    pub fn knock_out_light_background(&mut self, threshold: u8) {
        for px in self.data.chunks_exact_mut(4) {
            if px[0] > threshold && px[1] > threshold && px[2] > threshold {
                px[3] = 0;
            }
        }
    }

    /// Count of pixels with non-zero alpha.
    pub fn opaque_pixel_count(&self) -> usize {
        self.data.chunks_exact(4).filter(|px| px[3] != 0).count()
    }
}

fn byte_len(width: u32, height: u32) -> usize {
    (width as usize) * (height as usize) * 4
}
