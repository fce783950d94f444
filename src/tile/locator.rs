//! Tile and strip location.
//!
//! Maps a grid position to the byte range of that unit's compressed payload.
//! Tiled images form a row-major `rows x cols` grid; stripped images are
//! addressed through the same index type as an `n x 1` grid of strips.

use crate::error::TileError;
use crate::format::tiff::{ChunkLayout, ImageFileDirectory};
use crate::io::ByteRange;

// =============================================================================
// TileIndex
// =============================================================================

/// Zero-based (row, col) position in an image's tile grid.
///
/// For stripped images, `row` is the strip index and `col` must be 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TileIndex {
    /// Grid row, counted from the top
    pub row: u32,
    /// Grid column, counted from the left
    pub col: u32,
}

impl TileIndex {
    /// Create a new tile index.
    #[inline]
    pub const fn new(row: u32, col: u32) -> Self {
        Self { row, col }
    }

    /// Index addressing a strip of a stripped image.
    #[inline]
    pub const fn strip(index: u32) -> Self {
        Self { row: index, col: 0 }
    }
}

// =============================================================================
// Location
// =============================================================================

/// Compute the byte range of a tile's (or strip's) compressed payload.
///
/// Returns the full stored unit: the last row/column of tiles may extend past
/// the image bounds, and cropping that padding is the caller's concern. Fails
/// with [`TileError::IndexOutOfBounds`] when the index falls outside the
/// IFD's declared grid.
pub fn locate(ifd: &ImageFileDirectory, index: TileIndex) -> Result<ByteRange, TileError> {
    let (rows, cols) = ifd.grid_dimensions();
    if index.row >= rows || index.col >= cols {
        return Err(TileError::IndexOutOfBounds {
            row: index.row,
            col: index.col,
            rows,
            cols,
        });
    }

    let linear = index.row as usize * cols as usize + index.col as usize;
    let (offsets, byte_counts) = match ifd.chunk_layout() {
        ChunkLayout::Tiled {
            offsets,
            byte_counts,
            ..
        } => (offsets, byte_counts),
        ChunkLayout::Stripped {
            offsets,
            byte_counts,
            ..
        } => (offsets, byte_counts),
    };

    Ok(ByteRange::new(offsets[linear], byte_counts[linear]))
}

// =============================================================================
// Tests
// =============================================================================
