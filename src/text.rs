use ab_glyph::{Font, FontArc, PxScale, ScaleFont};
use serde::{Deserialize, Serialize};

use crate::buffer::PixelBuffer;
use crate::error::StickerResult;
use crate::transform::over_straight;

/// Caption stamped over the composed sticker. Coordinates and font size are
/// authored in canonical canvas space; `render` scales them for the output
/// resolution. The overlay is never animated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TextOverlay {
    pub text: String,
    pub x: f64,
    pub y: f64,
    pub font_size: f64,
    pub fill: [u8; 4],
    pub stroke: [u8; 4],
    pub vertical: bool,
}

impl Default for TextOverlay {
    fn default() -> Self {
        Self {
            text: String::new(),
            x: 120.0,
            y: 200.0,
            font_size: 32.0,
            fill: [255, 255, 255, 255],
            stroke: [0, 0, 0, 255],
            vertical: false,
        }
    }
}

impl TextOverlay {
    /// Stroke width in canonical units, matching the faux outline the caption
    /// is drawn with: wide enough to read at sticker sizes.
    pub fn stroke_width(&self) -> f64 {
        (self.font_size / 6.0).max(4.0)
    }

    /// Rasterize onto `dst`, anchor-centered at `(x, y)`. `scale` maps
    /// canonical coordinates to `dst` coordinates. Empty or whitespace-only
    /// text draws nothing.
    pub fn render(&self, dst: &mut PixelBuffer, font: &FontArc, scale: f64) -> StickerResult<()> {
        if self.text.trim().is_empty() {
            return Ok(());
        }

        let px = PxScale::from((self.font_size * scale) as f32);
        let scaled = font.as_scaled(px);
        let anchor_x = self.x * scale;
        let anchor_y = self.y * scale;
        let w = (self.stroke_width() * scale).round().max(1.0);

        // Faux outline: stamp the run in the stroke color at eight offsets,
        // then the fill on top.
        let offsets = [
            (-w, -w),
            (0.0, -w),
            (w, -w),
            (-w, 0.0),
            (w, 0.0),
            (-w, w),
            (0.0, w),
            (w, w),
        ];
        if self.stroke[3] != 0 {
            for (dx, dy) in offsets {
                self.draw_run(dst, &scaled, anchor_x + dx, anchor_y + dy, self.stroke);
            }
        }
        self.draw_run(dst, &scaled, anchor_x, anchor_y, self.fill);
        Ok(())
    }

    fn draw_run(
        &self,
        dst: &mut PixelBuffer,
        font: &ab_glyph::PxScaleFont<&FontArc>,
        anchor_x: f64,
        anchor_y: f64,
        color: [u8; 4],
    ) {
        if self.vertical {
            let line_h = font.scale().y as f64 * 1.1;
            let chars: Vec<char> = self.text.chars().collect();
            let total_h = line_h * chars.len() as f64;
            let mut cy = anchor_y - total_h / 2.0 + line_h / 2.0;
            for ch in chars {
                let advance = font.h_advance(font.glyph_id(ch)) as f64;
                let baseline = cy + (font.ascent() - font.descent()) as f64 / 2.0;
                draw_glyph(dst, font, ch, anchor_x - advance / 2.0, baseline, color);
                cy += line_h;
            }
        } else {
            let total_w: f64 = self
                .text
                .chars()
                .map(|ch| font.h_advance(font.glyph_id(ch)) as f64)
                .sum();
            let mut cursor_x = anchor_x - total_w / 2.0;
            let baseline = anchor_y + (font.ascent() - font.descent()) as f64 / 2.0;
            for ch in self.text.chars() {
                let id = font.glyph_id(ch);
                draw_glyph(dst, font, ch, cursor_x, baseline, color);
                cursor_x += font.h_advance(id) as f64;
            }
        }
    }
}

fn draw_glyph(
    dst: &mut PixelBuffer,
    font: &ab_glyph::PxScaleFont<&FontArc>,
    ch: char,
    x: f64,
    baseline_y: f64,
    color: [u8; 4],
) {
    let glyph = font
        .glyph_id(ch)
        .with_scale_and_position(font.scale(), ab_glyph::point(x as f32, baseline_y as f32));
    let Some(outlined) = font.font().outline_glyph(glyph) else {
        return;
    };
    let bounds = outlined.px_bounds();
    outlined.draw(|gx, gy, coverage| {
        let abs_x = bounds.min.x as i64 + gx as i64;
        let abs_y = bounds.min.y as i64 + gy as i64;
        if coverage <= 0.0 || !dst.in_bounds(abs_x, abs_y) {
            return;
        }
        let a = (coverage.min(1.0) * color[3] as f32).round() as u8;
        if a == 0 {
            return;
        }
        let (ux, uy) = (abs_x as u32, abs_y as u32);
        let under = dst.pixel(ux, uy);
        dst.set_pixel(ux, uy, over_straight(under, [color[0], color[1], color[2], a]));
    });
}

/// Load a usable sans-serif from well-known system locations. `None` when no
/// font file can be found, in which case captions are skipped.
pub fn load_system_font() -> Option<FontArc> {
    let font_paths = [
        "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
        "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
        "/System/Library/Fonts/Helvetica.ttc",
        "C:\\Windows\\Fonts\\arial.ttf",
    ];
    for path in &font_paths {
        if let Ok(data) = std::fs::read(path)
            && let Ok(font) = FontArc::try_from_vec(data)
        {
            return Some(font);
        }
    }
    None
}
