//! TIFF header parsing.
//!
//! The first bytes of a TIFF file determine everything about how the rest of
//! it is read:
//!
//! ## Classic TIFF (8 bytes)
//! ```text
//! Bytes 0-1: Byte order (0x4949 = little-endian "II", 0x4D4D = big-endian "MM")
//! Bytes 2-3: Version (42 = 0x002A)
//! Bytes 4-7: Offset to first IFD (4 bytes)
//! ```
//!
//! ## BigTIFF (16 bytes)
//! ```text
//! Bytes 0-1: Byte order
//! Bytes 2-3: Version (43 = 0x002B)
//! Bytes 4-5: Offset byte size (must be 8)
//! Bytes 6-7: Reserved (must be 0)
//! Bytes 8-15: Offset to first IFD (8 bytes)
//! ```

use crate::error::FormatError;

// =============================================================================
// Constants
// =============================================================================

/// Magic bytes indicating little-endian byte order ("II" for Intel)
const BYTE_ORDER_LITTLE_ENDIAN: u16 = 0x4949;

/// Magic bytes indicating big-endian byte order ("MM" for Motorola)
const BYTE_ORDER_BIG_ENDIAN: u16 = 0x4D4D;

/// Version number for classic TIFF
const VERSION_TIFF: u16 = 42;

/// Version number for BigTIFF
const VERSION_BIGTIFF: u16 = 43;

/// Size of a classic TIFF header in bytes
pub const TIFF_HEADER_SIZE: usize = 8;

/// Size of a BigTIFF header in bytes
pub const BIGTIFF_HEADER_SIZE: usize = 16;

// =============================================================================
// ByteOrder
// =============================================================================

/// Byte order (endianness) of a TIFF file.
///
/// Declared in the first two bytes of the header; every multi-byte value in
/// the file must be read respecting it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-endian ("II" = Intel)
    LittleEndian,
    /// Big-endian ("MM" = Motorola)
    BigEndian,
}

impl ByteOrder {
    /// Read a u16 from the start of a byte slice using this byte order.
    #[inline]
    pub fn read_u16(self, bytes: &[u8]) -> u16 {
        let raw = [bytes[0], bytes[1]];
        match self {
            ByteOrder::LittleEndian => u16::from_le_bytes(raw),
            ByteOrder::BigEndian => u16::from_be_bytes(raw),
        }
    }

    /// Read an i16 from the start of a byte slice using this byte order.
    #[inline]
    pub fn read_i16(self, bytes: &[u8]) -> i16 {
        self.read_u16(bytes) as i16
    }

    /// Read a u32 from the start of a byte slice using this byte order.
    #[inline]
    pub fn read_u32(self, bytes: &[u8]) -> u32 {
        let raw = [bytes[0], bytes[1], bytes[2], bytes[3]];
        match self {
            ByteOrder::LittleEndian => u32::from_le_bytes(raw),
            ByteOrder::BigEndian => u32::from_be_bytes(raw),
        }
    }

    /// Read an i32 from the start of a byte slice using this byte order.
    #[inline]
    pub fn read_i32(self, bytes: &[u8]) -> i32 {
        self.read_u32(bytes) as i32
    }

    /// Read a u64 from the start of a byte slice using this byte order.
    #[inline]
    pub fn read_u64(self, bytes: &[u8]) -> u64 {
        let raw = [
            bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5], bytes[6], bytes[7],
        ];
        match self {
            ByteOrder::LittleEndian => u64::from_le_bytes(raw),
            ByteOrder::BigEndian => u64::from_be_bytes(raw),
        }
    }

    /// Read an i64 from the start of a byte slice using this byte order.
    #[inline]
    pub fn read_i64(self, bytes: &[u8]) -> i64 {
        self.read_u64(bytes) as i64
    }

    /// Read an f32 from the start of a byte slice using this byte order.
    #[inline]
    pub fn read_f32(self, bytes: &[u8]) -> f32 {
        f32::from_bits(self.read_u32(bytes))
    }

    /// Read an f64 from the start of a byte slice using this byte order.
    #[inline]
    pub fn read_f64(self, bytes: &[u8]) -> f64 {
        f64::from_bits(self.read_u64(bytes))
    }
}

// =============================================================================
// TiffVariant
// =============================================================================

/// Classic TIFF (32-bit offsets) vs. BigTIFF (64-bit offsets).
///
/// The variant determines the geometry of everything after the header: entry
/// sizes, count-field widths, and how many bytes a tag value may occupy
/// before it is pushed out of line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TiffVariant {
    /// Classic TIFF, version 42
    Classic,
    /// BigTIFF, version 43
    Big,
}

impl TiffVariant {
    /// Size of one IFD entry in bytes.
    ///
    /// Classic: 2 tag + 2 type + 4 count + 4 value/offset = 12.
    /// BigTIFF: 2 tag + 2 type + 8 count + 8 value/offset = 20.
    #[inline]
    pub const fn ifd_entry_size(self) -> usize {
        match self {
            TiffVariant::Classic => 12,
            TiffVariant::Big => 20,
        }
    }

    /// Size of the entry-count field at the start of an IFD.
    #[inline]
    pub const fn ifd_count_size(self) -> usize {
        match self {
            TiffVariant::Classic => 2,
            TiffVariant::Big => 8,
        }
    }

    /// Size of the next-IFD offset field at the end of an IFD.
    #[inline]
    pub const fn next_offset_size(self) -> usize {
        match self {
            TiffVariant::Classic => 4,
            TiffVariant::Big => 8,
        }
    }

    /// Maximum bytes a tag value may occupy and still be stored inline in
    /// the entry's value/offset field.
    #[inline]
    pub const fn inline_threshold(self) -> u64 {
        match self {
            TiffVariant::Classic => 4,
            TiffVariant::Big => 8,
        }
    }

    /// Size of the file header for this variant.
    #[inline]
    pub const fn header_size(self) -> usize {
        match self {
            TiffVariant::Classic => TIFF_HEADER_SIZE,
            TiffVariant::Big => BIGTIFF_HEADER_SIZE,
        }
    }

    /// Read an offset-width integer (u32 for classic, u64 for BigTIFF).
    #[inline]
    pub fn read_offset(self, byte_order: ByteOrder, bytes: &[u8]) -> u64 {
        match self {
            TiffVariant::Classic => byte_order.read_u32(bytes) as u64,
            TiffVariant::Big => byte_order.read_u64(bytes),
        }
    }
}

// =============================================================================
// TiffHeader
// =============================================================================

/// Parsed TIFF file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiffHeader {
    /// Byte order for all multi-byte values in the file
    pub byte_order: ByteOrder,

    /// Classic vs. BigTIFF layout
    pub variant: TiffVariant,

    /// Offset to the first IFD in the file
    pub first_ifd_offset: u64,
}

impl TiffHeader {
    /// Parse a TIFF header from raw bytes.
    ///
    /// The input must contain at least 8 bytes for classic TIFF or 16 bytes
    /// for BigTIFF; `file_size` is used to validate the first IFD offset.
    pub fn parse(bytes: &[u8], file_size: u64) -> Result<Self, FormatError> {
        if bytes.len() < TIFF_HEADER_SIZE {
            return Err(FormatError::FileTooSmall {
                required: TIFF_HEADER_SIZE as u64,
                actual: bytes.len() as u64,
            });
        }

        // The byte-order marker is a palindrome pair ("II"/"MM"), so reading
        // it little-endian is safe before we know the order.
        let magic = u16::from_le_bytes([bytes[0], bytes[1]]);
        let byte_order = match magic {
            BYTE_ORDER_LITTLE_ENDIAN => ByteOrder::LittleEndian,
            BYTE_ORDER_BIG_ENDIAN => ByteOrder::BigEndian,
            _ => return Err(FormatError::InvalidMagic(magic)),
        };

        let version = byte_order.read_u16(&bytes[2..4]);

        match version {
            VERSION_TIFF => {
                let first_ifd_offset = byte_order.read_u32(&bytes[4..8]) as u64;
                if first_ifd_offset >= file_size {
                    return Err(FormatError::InvalidIfdOffset(first_ifd_offset));
                }
                Ok(TiffHeader {
                    byte_order,
                    variant: TiffVariant::Classic,
                    first_ifd_offset,
                })
            }
            VERSION_BIGTIFF => {
                if bytes.len() < BIGTIFF_HEADER_SIZE {
                    return Err(FormatError::FileTooSmall {
                        required: BIGTIFF_HEADER_SIZE as u64,
                        actual: bytes.len() as u64,
                    });
                }

                let offset_size = byte_order.read_u16(&bytes[4..6]);
                if offset_size != 8 {
                    return Err(FormatError::InvalidBigTiffOffsetSize(offset_size));
                }

                // Bytes 6-7 are reserved and should be 0; tolerated if not.

                let first_ifd_offset = byte_order.read_u64(&bytes[8..16]);
                if first_ifd_offset >= file_size {
                    return Err(FormatError::InvalidIfdOffset(first_ifd_offset));
                }
                Ok(TiffHeader {
                    byte_order,
                    variant: TiffVariant::Big,
                    first_ifd_offset,
                })
            }
            _ => Err(FormatError::InvalidVersion(version)),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
