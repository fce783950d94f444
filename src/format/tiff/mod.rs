//! TIFF/BigTIFF binary structure parsing.
//!
//! # Key Concepts
//!
//! - **Byte order**: TIFF files declare their endianness (II = little-endian,
//!   MM = big-endian) in the header. All multi-byte values must be read
//!   respecting this order.
//!
//! - **Classic TIFF vs BigTIFF**: Classic TIFF uses 32-bit offsets (max 4GB
//!   files), while BigTIFF uses 64-bit offsets. The parser handles both
//!   transparently.
//!
//! - **IFD (Image File Directory)**: A counted entry table describing one
//!   image plane, chained to the next IFD by a trailing offset (0 = end).
//!
//! - **Inline vs offset values**: Small tag values are stored inline in the
//!   IFD entry; larger values live elsewhere in the file behind an offset and
//!   cost a targeted range read when not covered by the initial prefetch.

mod geo;
mod ifd;
mod parser;
mod tags;
mod values;

pub use geo::{keys as geo_keys, GeoKeyDirectory, GeoKeyValue};
pub use ifd::{parse_ifds, ChunkLayout, ImageFileDirectory};
pub use parser::{
    ByteOrder, TiffHeader, TiffVariant, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE,
};
pub use tags::{compression, FieldType, Predictor, SampleFormat, TiffTag};
pub use values::{decode_tag_value, TagValue};
