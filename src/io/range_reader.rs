use async_trait::async_trait;
use bytes::Bytes;

use crate::error::IoError;

/// Trait for reading byte ranges from a local or remote resource.
///
/// This abstraction lets the TIFF parser and the tile fetch path work with
/// files without downloading them entirely. Implementations must be
/// thread-safe and tolerate concurrent calls with overlapping ranges.
#[async_trait]
pub trait RangeReader: Send + Sync {
    /// Read exactly `len` bytes starting at `offset`.
    ///
    /// Returns an error if the range is out of bounds or if the read fails.
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError>;

    /// Get the total size of the resource in bytes.
    fn size(&self) -> u64;

    /// Get a unique identifier for this resource (for logging and cache keys).
    ///
    /// For S3, this would typically be `s3://bucket/key`.
    fn identifier(&self) -> &str;
}

// =============================================================================
// ByteRange
// =============================================================================

/// A half-open byte interval `[offset, offset + length)` within a resource.
///
/// Used both for individual tile payloads and for the merged fetches the
/// coalescer issues on their behalf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ByteRange {
    /// Byte offset of the first byte in the range
    pub offset: u64,

    /// Number of bytes in the range
    pub length: u64,
}

impl ByteRange {
    /// Create a new byte range.
    #[inline]
    pub const fn new(offset: u64, length: u64) -> Self {
        Self { offset, length }
    }

    /// One past the last byte of the range.
    #[inline]
    pub const fn end(&self) -> u64 {
        self.offset + self.length
    }

    /// Whether the range contains no bytes.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }
}
