//! # cog-streamer
//!
//! An asynchronous, low-level reader for tiled TIFF and BigTIFF resources.
//!
//! This library fetches and decodes only the image regions a caller needs
//! from a remote or local byte store, without ever reading the whole file.
//! It was built for cloud-optimized GeoTIFFs streamed over HTTP range
//! requests, but any tiled or stripped TIFF from a conforming writer works.
//!
//! ## Features
//!
//! - **Range-based streaming**: one prefetch read resolves the header and
//!   metadata; tile payloads are fetched individually on demand
//! - **Classic TIFF and BigTIFF**: both byte orders, both offset widths
//! - **Request coalescing**: nearby tile fetches merge into fewer reads, and
//!   concurrent requests for the same tile share one fetch
//! - **Pluggable decoding**: compression codecs are registered at runtime
//!   against an integer id; uncompressed, Deflate, and LZW ship built in
//! - **Geospatial tags**: GeoTIFF key directory, pixel scale, and tiepoints
//!   decoded into typed accessors
//!
//! ## Architecture
//!
//! - [`io`] - byte-range source capability, store adapters, request coalescer
//! - [`mod@format`] - TIFF/BigTIFF structure: header, IFDs, tag values, geo keys
//! - [`tile`] - tile location, predictor reversal, decoder registry
//! - [`reader`] - the `open -> use -> drop` session tying it together
//!
//! ## Example
//!
//! ```rust,no_run
//! use cog_streamer::{
//!     DecoderRegistry, FileRangeReader, SpawnBlockingExecutor, TiffReader, TileIndex,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let source = FileRangeReader::new("ortho.tif")?;
//!     let reader = TiffReader::open(source).await?;
//!
//!     let ifd = &reader.ifds()[0];
//!     println!("{}x{} pixels", ifd.image_width(), ifd.image_height());
//!
//!     let registry = DecoderRegistry::default();
//!     let raster = reader
//!         .decode_tile(0, TileIndex::new(0, 0), &registry, &SpawnBlockingExecutor)
//!         .await?;
//!     println!("decoded {} bytes", raster.len());
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod format;
pub mod io;
pub mod reader;
pub mod tile;

// Re-export commonly used types
pub use error::{FormatError, IoError, TileError};
pub use format::tiff::{
    compression, geo_keys, parse_ifds, ByteOrder, ChunkLayout, FieldType, GeoKeyDirectory,
    GeoKeyValue, ImageFileDirectory, Predictor, SampleFormat, TagValue, TiffHeader, TiffTag,
    TiffVariant, BIGTIFF_HEADER_SIZE, TIFF_HEADER_SIZE,
};
pub use io::{
    create_s3_client, ByteRange, CoalesceConfig, FileRangeReader, RangeReader, RequestCoalescer,
    S3RangeReader, DEFAULT_MAX_FETCH_SIZE, DEFAULT_MERGE_GAP,
};
pub use reader::{ReaderOptions, TiffReader, DEFAULT_PREFETCH_SIZE};
pub use tile::{
    decode_chunk, locate, reverse_predictor, CompressedTile, DecodeExecutor, DecodeTask, Decoder,
    DecoderRegistry, DeflateDecoder, LzwDecoder, SpawnBlockingExecutor, TileCache, TileCacheKey,
    TileIndex, TileLayout, UncompressedDecoder,
};
