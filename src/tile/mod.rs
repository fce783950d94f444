//! Tile location, fetching, and decoding.
//!
//! A tile moves through three stages: [`locate`] turns a grid index into the
//! byte range of its compressed payload, a fetch (usually through the request
//! coalescer) turns that range into a [`CompressedTile`], and
//! [`decode_chunk`] turns the compressed bytes into a raw raster buffer by
//! running the registered decoder and reversing the predictor.

mod cache;
mod decode;
mod locator;
mod predictor;

pub use cache::{TileCache, TileCacheKey};
pub use decode::{
    decode_chunk, DecodeExecutor, DecodeTask, Decoder, DecoderRegistry, DeflateDecoder,
    LzwDecoder, SpawnBlockingExecutor, UncompressedDecoder,
};
pub use locator::{locate, TileIndex};
pub use predictor::reverse_predictor;

use bytes::Bytes;

use crate::format::tiff::{ByteOrder, ImageFileDirectory};
use crate::io::ByteRange;

// =============================================================================
// TileLayout
// =============================================================================

/// Geometry and sample description of one stored chunk: everything the
/// decode pipeline needs, detached from the IFD so it can move onto a decode
/// worker.
#[derive(Debug, Clone, Copy)]
pub struct TileLayout {
    /// File byte order, for normalizing multi-byte samples
    pub byte_order: ByteOrder,

    /// Stored chunk width in pixels
    pub width: u32,

    /// Stored chunk height in pixels
    pub height: u32,

    /// Bits per sample (first entry when samples differ)
    pub bits_per_sample: u16,

    /// Samples per pixel
    pub samples_per_pixel: u16,
}

impl TileLayout {
    /// Build the layout for the chunk at `index` of an IFD.
    pub fn for_chunk(ifd: &ImageFileDirectory, byte_order: ByteOrder, index: TileIndex) -> Self {
        let (width, height) = ifd.chunk_pixel_dimensions(index.row);
        Self {
            byte_order,
            width,
            height,
            bits_per_sample: ifd.bits_per_sample().first().copied().unwrap_or(1),
            samples_per_pixel: ifd.samples_per_pixel(),
        }
    }

    /// Total bits per pixel.
    pub fn bits_per_pixel(&self) -> usize {
        self.samples_per_pixel as usize * self.bits_per_sample as usize
    }

    /// Bytes per stored row (rows are byte-aligned).
    pub fn row_stride(&self) -> usize {
        (self.width as usize * self.bits_per_pixel()).div_ceil(8)
    }

    /// Expected decompressed size of the chunk in bytes.
    pub fn decoded_len(&self) -> usize {
        self.row_stride() * self.height as usize
    }
}

// =============================================================================
// CompressedTile
// =============================================================================

/// A fetched, still-compressed tile payload.
///
/// Ephemeral: produced by a fetch and consumed by the decode pipeline.
/// [`Bytes`] is reference-counted, so cloning the payload is cheap.
#[derive(Debug, Clone)]
pub struct CompressedTile {
    /// Grid position this payload belongs to
    pub index: TileIndex,

    /// Byte range the payload was read from
    pub range: ByteRange,

    /// The compressed bytes
    pub bytes: Bytes,
}
