use crate::buffer::PixelBuffer;
use crate::error::{StickerError, StickerResult};
use crate::export::CANONICAL_SIZE;

/// Slice a generated sheet of sticker art into individual canonical-size
/// bases, row-major. Trailing remainder pixels from uneven division are
/// dropped, matching how the cells were laid out when the sheet was made.
pub fn slice_grid(source: &PixelBuffer, rows: u32, cols: u32) -> StickerResult<Vec<PixelBuffer>> {
    if rows == 0 || cols == 0 {
        return Err(StickerError::validation("grid must have at least one cell"));
    }
    let cell_w = source.width() / cols;
    let cell_h = source.height() / rows;
    if cell_w == 0 || cell_h == 0 {
        return Err(StickerError::validation(format!(
            "{}x{} sheet too small for a {rows}x{cols} grid",
            source.width(),
            source.height()
        )));
    }

    let mut cells = Vec::with_capacity((rows * cols) as usize);
    for row in 0..rows {
        for col in 0..cols {
            let cell = source.sub_buffer(col * cell_w, row * cell_h, cell_w, cell_h)?;
            cells.push(cell.resample(CANONICAL_SIZE, CANONICAL_SIZE)?);
        }
    }
    Ok(cells)
}

/// Downscale a sticker for pack previews.
pub fn thumbnail(source: &PixelBuffer, size: u32) -> StickerResult<PixelBuffer> {
    source.resample(size, size)
}
