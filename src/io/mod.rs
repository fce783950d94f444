//! I/O layer: byte-range sources and request coalescing.
//!
//! Everything above this module consumes bytes through the [`RangeReader`]
//! capability; the adapters in this module bind that capability to concrete
//! stores (S3, local files), and [`RequestCoalescer`] sits between the tile
//! fetch path and a source to merge and deduplicate range requests.

mod coalescer;
mod file_reader;
mod range_reader;
mod s3_reader;

pub use coalescer::{
    CoalesceConfig, RequestCoalescer, DEFAULT_MAX_FETCH_SIZE, DEFAULT_MERGE_GAP,
};
pub use file_reader::FileRangeReader;
pub use range_reader::{ByteRange, RangeReader};
pub use s3_reader::{create_s3_client, S3RangeReader};
