//! Typed TIFF tag values.
//!
//! A [`TagValue`] is the decoded form of one IFD entry: a sequence of 1..N
//! primitives of a single kind, independent of whether the bytes were stored
//! inline in the entry or out of line behind an offset. The kind and count
//! are fixed at decode time and never change afterwards.
//!
//! Decoding is a pure function over raw bytes; the IFD parser decides where
//! the bytes come from (prefetch buffer, inline field, or a targeted fetch)
//! before calling into this module.

use bytes::Bytes;

use crate::error::FormatError;

use super::parser::ByteOrder;
use super::tags::FieldType;

// =============================================================================
// TagValue
// =============================================================================

/// A decoded TIFF tag value: one kind, one ordered sequence of values.
#[derive(Debug, Clone, PartialEq)]
pub enum TagValue {
    /// Unsigned 8-bit integers
    Byte(Vec<u8>),
    /// NUL-trimmed string
    Ascii(String),
    /// Unsigned 16-bit integers
    Short(Vec<u16>),
    /// Unsigned 32-bit integers
    Long(Vec<u32>),
    /// Unsigned (numerator, denominator) pairs
    Rational(Vec<(u32, u32)>),
    /// Signed 8-bit integers
    SByte(Vec<i8>),
    /// Opaque byte data
    Undefined(Bytes),
    /// Signed 16-bit integers
    SShort(Vec<i16>),
    /// Signed 32-bit integers
    SLong(Vec<i32>),
    /// Signed (numerator, denominator) pairs
    SRational(Vec<(i32, i32)>),
    /// IEEE 32-bit floats
    Float(Vec<f32>),
    /// IEEE 64-bit floats
    Double(Vec<f64>),
    /// Unsigned 64-bit integers (BigTIFF)
    Long8(Vec<u64>),
    /// Signed 64-bit integers (BigTIFF)
    SLong8(Vec<i64>),
    /// 64-bit IFD offsets (BigTIFF)
    Ifd8(Vec<u64>),
}

impl TagValue {
    /// The field type this value was decoded from.
    pub fn kind(&self) -> FieldType {
        match self {
            TagValue::Byte(_) => FieldType::Byte,
            TagValue::Ascii(_) => FieldType::Ascii,
            TagValue::Short(_) => FieldType::Short,
            TagValue::Long(_) => FieldType::Long,
            TagValue::Rational(_) => FieldType::Rational,
            TagValue::SByte(_) => FieldType::SByte,
            TagValue::Undefined(_) => FieldType::Undefined,
            TagValue::SShort(_) => FieldType::SShort,
            TagValue::SLong(_) => FieldType::SLong,
            TagValue::SRational(_) => FieldType::SRational,
            TagValue::Float(_) => FieldType::Float,
            TagValue::Double(_) => FieldType::Double,
            TagValue::Long8(_) => FieldType::Long8,
            TagValue::SLong8(_) => FieldType::SLong8,
            TagValue::Ifd8(_) => FieldType::Ifd8,
        }
    }

    /// Number of elements in the value.
    ///
    /// For ASCII values this is the decoded string length, which may be
    /// shorter than the stored count (the NUL terminator is trimmed).
    pub fn count(&self) -> usize {
        match self {
            TagValue::Byte(v) => v.len(),
            TagValue::Ascii(s) => s.len(),
            TagValue::Short(v) => v.len(),
            TagValue::Long(v) => v.len(),
            TagValue::Rational(v) => v.len(),
            TagValue::SByte(v) => v.len(),
            TagValue::Undefined(b) => b.len(),
            TagValue::SShort(v) => v.len(),
            TagValue::SLong(v) => v.len(),
            TagValue::SRational(v) => v.len(),
            TagValue::Float(v) => v.len(),
            TagValue::Double(v) => v.len(),
            TagValue::Long8(v) => v.len(),
            TagValue::SLong8(v) => v.len(),
            TagValue::Ifd8(v) => v.len(),
        }
    }

    /// Single unsigned 16-bit value, widening from Byte.
    pub fn as_u16(&self) -> Option<u16> {
        match self {
            TagValue::Byte(v) if v.len() == 1 => Some(v[0] as u16),
            TagValue::Short(v) if v.len() == 1 => Some(v[0]),
            _ => None,
        }
    }

    /// Single unsigned 32-bit value, widening from Byte/Short.
    pub fn as_u32(&self) -> Option<u32> {
        match self {
            TagValue::Byte(v) if v.len() == 1 => Some(v[0] as u32),
            TagValue::Short(v) if v.len() == 1 => Some(v[0] as u32),
            TagValue::Long(v) if v.len() == 1 => Some(v[0]),
            _ => None,
        }
    }

    /// Single unsigned 64-bit value, widening from any unsigned kind.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            TagValue::Byte(v) if v.len() == 1 => Some(v[0] as u64),
            TagValue::Short(v) if v.len() == 1 => Some(v[0] as u64),
            TagValue::Long(v) if v.len() == 1 => Some(v[0] as u64),
            TagValue::Long8(v) if v.len() == 1 => Some(v[0]),
            TagValue::Ifd8(v) if v.len() == 1 => Some(v[0]),
            _ => None,
        }
    }

    /// All values as u16, widening from Byte.
    pub fn as_u16_vec(&self) -> Option<Vec<u16>> {
        match self {
            TagValue::Byte(v) => Some(v.iter().map(|&x| x as u16).collect()),
            TagValue::Short(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// All values as u64, widening from any unsigned kind.
    ///
    /// This is the accessor tile offset and byte-count arrays go through,
    /// since writers store them as SHORT, LONG, or LONG8 depending on file
    /// size.
    pub fn as_u64_vec(&self) -> Option<Vec<u64>> {
        match self {
            TagValue::Byte(v) => Some(v.iter().map(|&x| x as u64).collect()),
            TagValue::Short(v) => Some(v.iter().map(|&x| x as u64).collect()),
            TagValue::Long(v) => Some(v.iter().map(|&x| x as u64).collect()),
            TagValue::Long8(v) => Some(v.clone()),
            TagValue::Ifd8(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// All values as f64, widening from Float.
    pub fn as_f64_vec(&self) -> Option<Vec<f64>> {
        match self {
            TagValue::Float(v) => Some(v.iter().map(|&x| x as f64).collect()),
            TagValue::Double(v) => Some(v.clone()),
            _ => None,
        }
    }

    /// The decoded string for ASCII values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TagValue::Ascii(s) => Some(s),
            _ => None,
        }
    }
}

// =============================================================================
// Decoding
// =============================================================================

/// Decode a tag value from raw bytes.
///
/// `bytes` must hold at least `count * size_of(field_type)` bytes; the parser
/// guarantees this for inline values and sizes its fetches accordingly for
/// out-of-line values.
pub fn decode_tag_value(
    bytes: &[u8],
    field_type: FieldType,
    count: u64,
    byte_order: ByteOrder,
) -> Result<TagValue, FormatError> {
    let count = count as usize;
    let needed = count as u64 * field_type.size_in_bytes();
    if (bytes.len() as u64) < needed {
        return Err(FormatError::InvalidTagValue {
            tag: "entry",
            message: format!(
                "value buffer too short: need {} bytes for {:?} x{}, got {}",
                needed,
                field_type,
                count,
                bytes.len()
            ),
        });
    }

    let value = match field_type {
        FieldType::Byte => TagValue::Byte(bytes[..count].to_vec()),
        FieldType::SByte => TagValue::SByte(bytes[..count].iter().map(|&b| b as i8).collect()),
        FieldType::Undefined => TagValue::Undefined(Bytes::copy_from_slice(&bytes[..count])),
        FieldType::Ascii => {
            let raw = &bytes[..count];
            let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
            TagValue::Ascii(String::from_utf8_lossy(&raw[..end]).into_owned())
        }
        FieldType::Short => TagValue::Short(
            (0..count)
                .map(|i| byte_order.read_u16(&bytes[i * 2..]))
                .collect(),
        ),
        FieldType::SShort => TagValue::SShort(
            (0..count)
                .map(|i| byte_order.read_i16(&bytes[i * 2..]))
                .collect(),
        ),
        FieldType::Long => TagValue::Long(
            (0..count)
                .map(|i| byte_order.read_u32(&bytes[i * 4..]))
                .collect(),
        ),
        FieldType::SLong => TagValue::SLong(
            (0..count)
                .map(|i| byte_order.read_i32(&bytes[i * 4..]))
                .collect(),
        ),
        FieldType::Float => TagValue::Float(
            (0..count)
                .map(|i| byte_order.read_f32(&bytes[i * 4..]))
                .collect(),
        ),
        FieldType::Double => TagValue::Double(
            (0..count)
                .map(|i| byte_order.read_f64(&bytes[i * 8..]))
                .collect(),
        ),
        FieldType::Rational => TagValue::Rational(
            (0..count)
                .map(|i| {
                    (
                        byte_order.read_u32(&bytes[i * 8..]),
                        byte_order.read_u32(&bytes[i * 8 + 4..]),
                    )
                })
                .collect(),
        ),
        FieldType::SRational => TagValue::SRational(
            (0..count)
                .map(|i| {
                    (
                        byte_order.read_i32(&bytes[i * 8..]),
                        byte_order.read_i32(&bytes[i * 8 + 4..]),
                    )
                })
                .collect(),
        ),
        FieldType::Long8 => TagValue::Long8(
            (0..count)
                .map(|i| byte_order.read_u64(&bytes[i * 8..]))
                .collect(),
        ),
        FieldType::SLong8 => TagValue::SLong8(
            (0..count)
                .map(|i| byte_order.read_i64(&bytes[i * 8..]))
                .collect(),
        ),
        FieldType::Ifd8 => TagValue::Ifd8(
            (0..count)
                .map(|i| byte_order.read_u64(&bytes[i * 8..]))
                .collect(),
        ),
    };

    Ok(value)
}

// =============================================================================
// Tests
// =============================================================================
