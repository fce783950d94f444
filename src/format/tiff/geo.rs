//! GeoTIFF key directory decoding.
//!
//! Georeferencing metadata rides on three ordinary TIFF tags: GeoKeyDirectory
//! (34735) is a packed SHORT array of (key-id, location, count, value) tuples,
//! and keys whose values don't fit in a SHORT point into GeoDoubleParams
//! (34736) or GeoAsciiParams (34737). Decoding is a pure second pass over the
//! already-resolved tag values; it performs no I/O.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::FormatError;

use super::tags::TiffTag;
use super::values::TagValue;

/// Well-known geo key identifiers.
///
/// The key space is defined by the OGC GeoTIFF standard; unknown keys are
/// preserved in the directory under their numeric id.
pub mod keys {
    /// Coordinate model: 1 = projected, 2 = geographic, 3 = geocentric
    pub const MODEL_TYPE: u16 = 1024;
    /// Raster space: 1 = pixel-is-area, 2 = pixel-is-point
    pub const RASTER_TYPE: u16 = 1025;
    /// Free-text description of the CRS
    pub const CITATION: u16 = 1026;
    /// Geographic CRS code (e.g. 4326)
    pub const GEOGRAPHIC_TYPE: u16 = 2048;
    /// Citation for the geographic CRS
    pub const GEOG_CITATION: u16 = 2049;
    /// Geodetic datum code
    pub const GEOG_GEODETIC_DATUM: u16 = 2050;
    /// Angular unit code
    pub const GEOG_ANGULAR_UNITS: u16 = 2054;
    /// Ellipsoid code
    pub const GEOG_ELLIPSOID: u16 = 2056;
    /// Ellipsoid semi-major axis in meters
    pub const GEOG_SEMI_MAJOR_AXIS: u16 = 2057;
    /// Ellipsoid inverse flattening
    pub const GEOG_INV_FLATTENING: u16 = 2059;
    /// Projected CRS code (e.g. 32633)
    pub const PROJECTED_TYPE: u16 = 3072;
    /// Citation for the projected CRS
    pub const PROJ_CITATION: u16 = 3073;
    /// Linear unit code
    pub const PROJ_LINEAR_UNITS: u16 = 3076;
    /// Vertical CRS code
    pub const VERTICAL: u16 = 4096;
    /// Vertical unit code
    pub const VERTICAL_UNITS: u16 = 4099;

    /// Marker value for "user-defined" codes
    pub const USER_DEFINED: u16 = 32767;
}

// =============================================================================
// GeoKeyValue
// =============================================================================

/// The typed value of a single geo key.
#[derive(Debug, Clone, PartialEq)]
pub enum GeoKeyValue {
    /// Value stored directly in the key entry
    Short(u16),
    /// Single value from GeoDoubleParams
    Double(f64),
    /// Multi-value run from GeoDoubleParams
    Doubles(Vec<f64>),
    /// Substring of GeoAsciiParams, separator stripped
    Ascii(String),
}

impl GeoKeyValue {
    /// The value as a u16, if it is a Short.
    pub fn as_short(&self) -> Option<u16> {
        match self {
            GeoKeyValue::Short(v) => Some(*v),
            _ => None,
        }
    }

    /// The value as an f64, if it is a single Double.
    pub fn as_double(&self) -> Option<f64> {
        match self {
            GeoKeyValue::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// The value as a string, if it is Ascii.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            GeoKeyValue::Ascii(s) => Some(s),
            _ => None,
        }
    }
}

// =============================================================================
// GeoKeyDirectory
// =============================================================================

/// Decoded GeoTIFF key directory: a mapping from key id to typed value.
#[derive(Debug, Clone)]
pub struct GeoKeyDirectory {
    entries: BTreeMap<u16, GeoKeyValue>,
}

impl GeoKeyDirectory {
    /// Decode the geo key directory from an IFD's resolved tag values.
    ///
    /// Returns `Ok(None)` when the image carries no GeoKeyDirectory tag.
    /// Fails with [`FormatError::InvalidGeoKeyDirectory`] when the declared
    /// key count is inconsistent with the directory buffer, or an entry
    /// references parameter data that is absent or out of bounds.
    pub(crate) fn parse(tags: &BTreeMap<u16, TagValue>) -> Result<Option<Self>, FormatError> {
        let Some(directory) = tags.get(&TiffTag::GeoKeyDirectory.as_u16()) else {
            return Ok(None);
        };

        let data = directory.as_u16_vec().ok_or_else(|| {
            FormatError::InvalidGeoKeyDirectory(format!(
                "directory tag has kind {:?}, expected SHORT array",
                directory.kind()
            ))
        })?;

        if data.len() < 4 {
            return Err(FormatError::InvalidGeoKeyDirectory(format!(
                "directory holds {} values, need at least a 4-value header",
                data.len()
            )));
        }

        let version = data[0];
        if version != 1 {
            return Err(FormatError::InvalidGeoKeyDirectory(format!(
                "unsupported key directory version {version}"
            )));
        }
        let number_of_keys = data[3] as usize;
        if data.len() < 4 * (number_of_keys + 1) {
            return Err(FormatError::InvalidGeoKeyDirectory(format!(
                "{number_of_keys} keys declared but buffer holds only {}",
                data.len() / 4 - 1
            )));
        }

        let double_params = tags
            .get(&TiffTag::GeoDoubleParams.as_u16())
            .and_then(|v| v.as_f64_vec());
        let ascii_params = tags
            .get(&TiffTag::GeoAsciiParams.as_u16())
            .and_then(|v| v.as_str().map(str::to_owned));

        let mut entries = BTreeMap::new();

        for chunk in data[4..4 * (number_of_keys + 1)].chunks_exact(4) {
            let (key_id, location, count, value_offset) =
                (chunk[0], chunk[1], chunk[2], chunk[3]);

            if location == 0 {
                if count != 1 {
                    return Err(FormatError::InvalidGeoKeyDirectory(format!(
                        "key {key_id}: inline value with count {count}"
                    )));
                }
                entries.insert(key_id, GeoKeyValue::Short(value_offset));
            } else if location == TiffTag::GeoDoubleParams.as_u16() {
                let params = double_params.as_ref().ok_or_else(|| {
                    FormatError::InvalidGeoKeyDirectory(format!(
                        "key {key_id} references GeoDoubleParams, which is absent"
                    ))
                })?;
                let start = value_offset as usize;
                let end = start + count as usize;
                if end > params.len() {
                    return Err(FormatError::InvalidGeoKeyDirectory(format!(
                        "key {key_id}: doubles [{start}..{end}) out of bounds ({} available)",
                        params.len()
                    )));
                }
                let value = if count == 1 {
                    GeoKeyValue::Double(params[start])
                } else {
                    GeoKeyValue::Doubles(params[start..end].to_vec())
                };
                entries.insert(key_id, value);
            } else if location == TiffTag::GeoAsciiParams.as_u16() {
                let params = ascii_params.as_ref().ok_or_else(|| {
                    FormatError::InvalidGeoKeyDirectory(format!(
                        "key {key_id} references GeoAsciiParams, which is absent"
                    ))
                })?;
                let start = value_offset as usize;
                let end = start + count as usize;
                if end > params.len() {
                    return Err(FormatError::InvalidGeoKeyDirectory(format!(
                        "key {key_id}: ascii [{start}..{end}) out of bounds ({} available)",
                        params.len()
                    )));
                }
                let mut s = String::from_utf8_lossy(&params.as_bytes()[start..end]).into_owned();
                // Each substring carries the '|' separator; it is not part of
                // the value.
                if s.ends_with('|') {
                    s.pop();
                }
                entries.insert(key_id, GeoKeyValue::Ascii(s));
            } else {
                // The standard allows values to live in any tag, but no
                // mainstream writer does this.
                debug!(key_id, location, "skipping geo key with unrecognized location tag");
            }
        }

        Ok(Some(Self { entries }))
    }

    /// Look up a key by id (see [`keys`]).
    pub fn get(&self, key_id: u16) -> Option<&GeoKeyValue> {
        self.entries.get(&key_id)
    }

    /// Iterate over all keys in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (u16, &GeoKeyValue)> {
        self.entries.iter().map(|(&id, value)| (id, value))
    }

    /// Number of decoded keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the directory holds no keys.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn short(&self, key_id: u16) -> Option<u16> {
        self.get(key_id).and_then(GeoKeyValue::as_short)
    }

    /// Coordinate model type (1 = projected, 2 = geographic, 3 = geocentric).
    pub fn model_type(&self) -> Option<u16> {
        self.short(keys::MODEL_TYPE)
    }

    /// Raster space type (1 = pixel-is-area, 2 = pixel-is-point).
    pub fn raster_type(&self) -> Option<u16> {
        self.short(keys::RASTER_TYPE)
    }

    /// CRS citation text, if present.
    pub fn citation(&self) -> Option<&str> {
        self.get(keys::CITATION).and_then(GeoKeyValue::as_str)
    }

    /// The EPSG code of the image's CRS, if it declares a standard one.
    ///
    /// Resolves the projected or geographic CRS key according to the model
    /// type; user-defined codes (32767) yield `None`.
    pub fn epsg_code(&self) -> Option<u16> {
        let code = match self.model_type() {
            Some(1) => self.short(keys::PROJECTED_TYPE),
            Some(2) => self.short(keys::GEOGRAPHIC_TYPE),
            _ => self
                .short(keys::PROJECTED_TYPE)
                .or_else(|| self.short(keys::GEOGRAPHIC_TYPE)),
        }?;
        (code != keys::USER_DEFINED).then_some(code)
    }
}

// =============================================================================
// Tests
// =============================================================================
