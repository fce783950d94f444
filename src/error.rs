use thiserror::Error;

/// I/O errors that can occur when fetching byte ranges from a store.
///
/// These are transient from the reader's point of view: the caller may retry
/// the whole operation. The reader itself never retries.
#[derive(Debug, Clone, Error)]
pub enum IoError {
    /// The underlying store rejected or failed the fetch
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// Requested range exceeds resource bounds
    #[error("range out of bounds: requested {requested} bytes at offset {offset}, size is {size}")]
    RangeOutOfBounds {
        offset: u64,
        requested: u64,
        size: u64,
    },

    /// Network or connection error
    #[error("connection error: {0}")]
    Connection(String),

    /// Resource not found
    #[error("resource not found: {0}")]
    NotFound(String),
}

/// Errors that can occur while parsing TIFF structure.
///
/// These indicate the file violates the binary format's invariants. They are
/// fatal for the affected open operation and not retryable.
#[derive(Debug, Clone, Error)]
pub enum FormatError {
    /// I/O error while reading the file
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Invalid TIFF magic bytes (not II or MM)
    #[error("invalid TIFF magic bytes: expected 0x4949 (II) or 0x4D4D (MM), got 0x{0:04X}")]
    InvalidMagic(u16),

    /// Invalid TIFF version number
    #[error("invalid TIFF version: expected 42 (TIFF) or 43 (BigTIFF), got {0}")]
    InvalidVersion(u16),

    /// Invalid BigTIFF offset byte size (must be 8)
    #[error("invalid BigTIFF offset byte size: expected 8, got {0}")]
    InvalidBigTiffOffsetSize(u16),

    /// File is too small to contain a valid TIFF header
    #[error("file too small: need at least {required} bytes, got {actual}")]
    FileTooSmall { required: u64, actual: u64 },

    /// IFD offset points outside the file
    #[error("invalid IFD offset: {0}")]
    InvalidIfdOffset(u64),

    /// The next-IFD chain revisits an offset it has already parsed
    #[error("cyclic IFD chain: offset {0} already visited")]
    CyclicIfdChain(u64),

    /// The next-IFD chain exceeds the safety bound
    #[error("IFD chain too long: more than {0} directories")]
    IfdChainTooLong(usize),

    /// An out-of-line tag value points outside the file
    #[error("tag {tag} value out of bounds: {length} bytes at offset {offset}")]
    ValueOutOfBounds { tag: u16, offset: u64, length: u64 },

    /// Required tag is missing from an IFD
    #[error("missing required tag: {0}")]
    MissingTag(&'static str),

    /// Tag has unexpected type, count, or content
    #[error("invalid value for tag {tag}: {message}")]
    InvalidTagValue { tag: &'static str, message: String },

    /// The geo key directory is internally inconsistent
    #[error("invalid geo key directory: {0}")]
    InvalidGeoKeyDirectory(String),
}

/// Errors that can occur when locating, fetching, or decoding a tile.
///
/// A tile-level failure affects only that tile; other tiles of the same image
/// are unaffected.
#[derive(Debug, Clone, Error)]
pub enum TileError {
    /// I/O error while fetching tile bytes
    #[error("I/O error: {0}")]
    Io(#[from] IoError),

    /// Format error surfaced while resolving tile layout
    #[error("format error: {0}")]
    Format(#[from] FormatError),

    /// Tile index outside the IFD's declared grid
    #[error("tile index ({row}, {col}) out of bounds for {rows}x{cols} grid")]
    IndexOutOfBounds {
        row: u32,
        col: u32,
        rows: u32,
        cols: u32,
    },

    /// IFD index outside the parsed IFD list
    #[error("IFD index {index} out of bounds: file has {count} IFDs")]
    IfdOutOfBounds { index: usize, count: usize },

    /// No decoder registered for the compression method
    #[error("no decoder registered for compression method {0}")]
    UnsupportedCompression(u16),

    /// The IFD declares a predictor this crate cannot reverse
    #[error("unsupported predictor: {0}")]
    UnsupportedPredictor(u16),

    /// A registered decoder rejected the compressed payload
    #[error("decode failed: {0}")]
    Decode(String),
}
