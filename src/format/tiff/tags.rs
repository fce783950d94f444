//! TIFF tag, field-type, and enum vocabulary.
//!
//! Field types determine how tag values are encoded and sized; tag IDs
//! identify the metadata fields the layout view cares about. Tags not listed
//! here are still retained in an IFD's raw tag map, they just carry no
//! special meaning for tile layout.

// =============================================================================
// Field Types
// =============================================================================

/// TIFF field types, covering both classic TIFF and the BigTIFF additions.
///
/// Each type has a fixed per-element size, which decides whether a value fits
/// inline in an IFD entry and how arrays are stepped through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum FieldType {
    /// Unsigned 8-bit integer
    Byte = 1,
    /// 8-bit NUL-terminated string data
    Ascii = 2,
    /// Unsigned 16-bit integer
    Short = 3,
    /// Unsigned 32-bit integer
    Long = 4,
    /// Two LONGs: numerator, denominator
    Rational = 5,
    /// Signed 8-bit integer
    SByte = 6,
    /// Opaque byte data
    Undefined = 7,
    /// Signed 16-bit integer
    SShort = 8,
    /// Signed 32-bit integer
    SLong = 9,
    /// Two SLONGs: numerator, denominator
    SRational = 10,
    /// IEEE 32-bit float
    Float = 11,
    /// IEEE 64-bit float
    Double = 12,
    /// Unsigned 64-bit integer (BigTIFF)
    Long8 = 16,
    /// Signed 64-bit integer (BigTIFF)
    SLong8 = 17,
    /// 64-bit IFD offset (BigTIFF)
    Ifd8 = 18,
}

impl FieldType {
    /// Size of a single element of this type in bytes.
    #[inline]
    pub const fn size_in_bytes(self) -> u64 {
        match self {
            FieldType::Byte | FieldType::Ascii | FieldType::SByte | FieldType::Undefined => 1,
            FieldType::Short | FieldType::SShort => 2,
            FieldType::Long | FieldType::SLong | FieldType::Float => 4,
            FieldType::Rational
            | FieldType::SRational
            | FieldType::Double
            | FieldType::Long8
            | FieldType::SLong8
            | FieldType::Ifd8 => 8,
        }
    }

    /// Create a FieldType from its numeric value.
    ///
    /// Returns `None` for unknown type codes; the parser skips such entries
    /// rather than failing the IFD.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(FieldType::Byte),
            2 => Some(FieldType::Ascii),
            3 => Some(FieldType::Short),
            4 => Some(FieldType::Long),
            5 => Some(FieldType::Rational),
            6 => Some(FieldType::SByte),
            7 => Some(FieldType::Undefined),
            8 => Some(FieldType::SShort),
            9 => Some(FieldType::SLong),
            10 => Some(FieldType::SRational),
            11 => Some(FieldType::Float),
            12 => Some(FieldType::Double),
            16 => Some(FieldType::Long8),
            17 => Some(FieldType::SLong8),
            18 => Some(FieldType::Ifd8),
            _ => None,
        }
    }
}

// =============================================================================
// Tags
// =============================================================================

/// TIFF tag IDs the layout and geo views project out of the raw tag map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum TiffTag {
    /// Image width in pixels
    ImageWidth = 256,
    /// Image height (length) in pixels
    ImageLength = 257,
    /// Bits per sample, one value per sample
    BitsPerSample = 258,
    /// Compression method identifier
    Compression = 259,
    /// Byte offsets of strips
    StripOffsets = 273,
    /// Number of components per pixel
    SamplesPerPixel = 277,
    /// Row count per strip
    RowsPerStrip = 278,
    /// Byte counts of strips
    StripByteCounts = 279,
    /// Predictor applied before compression
    Predictor = 317,
    /// Width of each tile in pixels
    TileWidth = 322,
    /// Height of each tile in pixels
    TileLength = 323,
    /// Byte offsets of each tile
    TileOffsets = 324,
    /// Byte counts of each tile
    TileByteCounts = 325,
    /// How to interpret each data sample
    SampleFormat = 339,
    /// GeoTIFF pixel scale (x, y, z)
    ModelPixelScale = 33550,
    /// GeoTIFF raster/model tiepoints
    ModelTiepoint = 33922,
    /// GeoTIFF key directory
    GeoKeyDirectory = 34735,
    /// GeoTIFF double-valued key parameters
    GeoDoubleParams = 34736,
    /// GeoTIFF ASCII-valued key parameters
    GeoAsciiParams = 34737,
}

impl TiffTag {
    /// Get the numeric tag ID.
    #[inline]
    pub const fn as_u16(self) -> u16 {
        self as u16
    }
}

// =============================================================================
// Compression identifiers
// =============================================================================

/// Well-known TIFF compression method identifiers.
///
/// Compression is an open `u16` id space: the decoder registry accepts any
/// id, including the private range (32768+), so these are constants rather
/// than a closed enum.
pub mod compression {
    /// No compression
    pub const NONE: u16 = 1;
    /// LZW
    pub const LZW: u16 = 5;
    /// JPEG (DCT)
    pub const JPEG: u16 = 7;
    /// Deflate (zlib)
    pub const DEFLATE: u16 = 8;
    /// Deflate, legacy Adobe id
    pub const ADOBE_DEFLATE: u16 = 32946;
    /// Zstandard
    pub const ZSTD: u16 = 50000;
    /// WebP
    pub const WEBP: u16 = 50001;
    /// LERC
    pub const LERC: u16 = 34887;
}

// =============================================================================
// Predictor
// =============================================================================

/// Predictor transform applied to the raster before compression.
///
/// The decode pipeline must undo the predictor after decompression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum Predictor {
    /// No prediction
    None = 1,
    /// Horizontal differencing
    Horizontal = 2,
    /// Floating-point byte reshuffling
    FloatingPoint = 3,
}

impl Predictor {
    /// Create a Predictor from its numeric value.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(Predictor::None),
            2 => Some(Predictor::Horizontal),
            3 => Some(Predictor::FloatingPoint),
            _ => None,
        }
    }
}

// =============================================================================
// SampleFormat
// =============================================================================

/// How each data sample in a pixel is to be interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum SampleFormat {
    /// Unsigned integer data (the default when the tag is absent)
    Uint = 1,
    /// Signed integer data
    Int = 2,
    /// IEEE floating point data
    Float = 3,
    /// Undefined data format
    Void = 4,
}

impl SampleFormat {
    /// Create a SampleFormat from its numeric value.
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(SampleFormat::Uint),
            2 => Some(SampleFormat::Int),
            3 => Some(SampleFormat::Float),
            4 => Some(SampleFormat::Void),
            _ => None,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
