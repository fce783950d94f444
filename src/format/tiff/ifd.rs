//! Image File Directory parsing.
//!
//! An IFD is a counted table of 12-byte (classic) or 20-byte (BigTIFF)
//! entries followed by the offset of the next IFD; directories form a singly
//! linked chain starting at the header's first-IFD offset and ending at
//! offset 0. Each parsed directory keeps two views of the same data:
//!
//! - the **raw view**: an ordered map from tag id to [`TagValue`], preserving
//!   every tag with a known field type, recognized or not;
//! - the **layout view**: strongly-typed fields (dimensions, compression,
//!   chunk offsets, predictor, ...) projected out of the raw map, validated
//!   at parse time so tile access never re-checks them.
//!
//! Parsing is prefetch-driven: one initial range read from offset 0 covers
//! the header and, for well-formed files, the whole first directory. Only
//! out-of-line values that fall outside the prefetched window cost another
//! round trip. The chain walker tracks visited offsets and rejects cycles,
//! which untrusted files can otherwise use to wedge a reader forever.

use std::collections::{BTreeMap, HashSet};

use bytes::Bytes;
use tracing::debug;

use crate::error::FormatError;
use crate::io::RangeReader;

use super::geo::GeoKeyDirectory;
use super::parser::{TiffHeader, TiffVariant, TIFF_HEADER_SIZE};
use super::tags::{FieldType, Predictor, SampleFormat, TiffTag};
use super::values::{decode_tag_value, TagValue};

// =============================================================================
// Constants
// =============================================================================

/// Safety bound on the number of directories in one chain. A conforming file
/// never comes close; a crafted one should fail instead of allocating
/// unboundedly.
const MAX_IFD_CHAIN: usize = 4096;

// =============================================================================
// ChunkLayout
// =============================================================================

/// How an image's raster is chunked in the file.
#[derive(Debug, Clone)]
pub enum ChunkLayout {
    /// Fixed-size rectangular tiles, row-major order.
    Tiled {
        tile_width: u32,
        tile_height: u32,
        offsets: Vec<u64>,
        byte_counts: Vec<u64>,
    },
    /// Horizontal bands of rows.
    Stripped {
        rows_per_strip: u32,
        offsets: Vec<u64>,
        byte_counts: Vec<u64>,
    },
}

// =============================================================================
// ImageFileDirectory
// =============================================================================

/// One parsed Image File Directory: raw tag map plus the typed layout and
/// geospatial views needed to locate and decode tiles.
///
/// Immutable once parsed; share it by reference.
#[derive(Debug, Clone)]
pub struct ImageFileDirectory {
    tags: BTreeMap<u16, TagValue>,

    image_width: u32,
    image_height: u32,
    bits_per_sample: Vec<u16>,
    samples_per_pixel: u16,
    compression: u16,
    predictor: Predictor,
    sample_format: Vec<SampleFormat>,
    chunks: ChunkLayout,

    geo_keys: Option<GeoKeyDirectory>,
    model_pixel_scale: Option<Vec<f64>>,
    model_tiepoint: Option<Vec<f64>>,
}

impl ImageFileDirectory {
    /// Project the typed layout view out of a raw tag map.
    pub(crate) fn from_tags(tags: BTreeMap<u16, TagValue>) -> Result<Self, FormatError> {
        let image_width = require_u32(&tags, TiffTag::ImageWidth, "ImageWidth")?;
        let image_height = require_u32(&tags, TiffTag::ImageLength, "ImageLength")?;

        // BitsPerSample and SamplesPerPixel default per the TIFF baseline
        // (bilevel, one sample) when absent.
        let bits_per_sample = match tags.get(&TiffTag::BitsPerSample.as_u16()) {
            Some(value) => value.as_u16_vec().ok_or_else(|| invalid(value, "BitsPerSample"))?,
            None => vec![1],
        };
        let samples_per_pixel = match tags.get(&TiffTag::SamplesPerPixel.as_u16()) {
            Some(value) => value.as_u16().ok_or_else(|| invalid(value, "SamplesPerPixel"))?,
            None => 1,
        };

        let compression = match tags.get(&TiffTag::Compression.as_u16()) {
            Some(value) => value.as_u16().ok_or_else(|| invalid(value, "Compression"))?,
            None => super::tags::compression::NONE,
        };

        let predictor = match tags.get(&TiffTag::Predictor.as_u16()) {
            Some(value) => {
                let raw = value.as_u16().ok_or_else(|| invalid(value, "Predictor"))?;
                Predictor::from_u16(raw).ok_or_else(|| FormatError::InvalidTagValue {
                    tag: "Predictor",
                    message: format!("unknown predictor {raw}"),
                })?
            }
            None => Predictor::None,
        };

        let sample_format = match tags.get(&TiffTag::SampleFormat.as_u16()) {
            Some(value) => value
                .as_u16_vec()
                .ok_or_else(|| invalid(value, "SampleFormat"))?
                .into_iter()
                .map(|raw| SampleFormat::from_u16(raw).unwrap_or(SampleFormat::Void))
                .collect(),
            None => vec![SampleFormat::Uint; samples_per_pixel as usize],
        };

        let chunks = Self::compute_chunk_layout(&tags, image_width, image_height)?;

        let geo_keys = GeoKeyDirectory::parse(&tags)?;
        let model_pixel_scale = tags
            .get(&TiffTag::ModelPixelScale.as_u16())
            .and_then(|v| v.as_f64_vec());
        let model_tiepoint = tags
            .get(&TiffTag::ModelTiepoint.as_u16())
            .and_then(|v| v.as_f64_vec());

        Ok(Self {
            tags,
            image_width,
            image_height,
            bits_per_sample,
            samples_per_pixel,
            compression,
            predictor,
            sample_format,
            chunks,
            geo_keys,
            model_pixel_scale,
            model_tiepoint,
        })
    }

    fn compute_chunk_layout(
        tags: &BTreeMap<u16, TagValue>,
        image_width: u32,
        image_height: u32,
    ) -> Result<ChunkLayout, FormatError> {
        let tile_width = optional_u32(tags, TiffTag::TileWidth, "TileWidth")?;
        let tile_height = optional_u32(tags, TiffTag::TileLength, "TileLength")?;

        match (tile_width, tile_height) {
            (Some(tile_width), Some(tile_height)) => {
                if tile_width == 0 || tile_height == 0 {
                    return Err(FormatError::InvalidTagValue {
                        tag: "TileWidth",
                        message: "tile dimensions must be nonzero".to_string(),
                    });
                }
                let offsets = require_u64_vec(tags, TiffTag::TileOffsets, "TileOffsets")?;
                let byte_counts =
                    require_u64_vec(tags, TiffTag::TileByteCounts, "TileByteCounts")?;
                if offsets.len() != byte_counts.len() {
                    return Err(FormatError::InvalidTagValue {
                        tag: "TileByteCounts",
                        message: format!(
                            "count {} does not match TileOffsets count {}",
                            byte_counts.len(),
                            offsets.len()
                        ),
                    });
                }
                let expected =
                    image_width.div_ceil(tile_width) as usize * image_height.div_ceil(tile_height) as usize;
                if offsets.len() < expected {
                    return Err(FormatError::InvalidTagValue {
                        tag: "TileOffsets",
                        message: format!("grid needs {expected} tiles, file declares {}", offsets.len()),
                    });
                }
                Ok(ChunkLayout::Tiled {
                    tile_width,
                    tile_height,
                    offsets,
                    byte_counts,
                })
            }
            (None, None) => {
                let offsets = match tags.get(&TiffTag::StripOffsets.as_u16()) {
                    Some(value) => value
                        .as_u64_vec()
                        .ok_or_else(|| invalid(value, "StripOffsets"))?,
                    None => return Err(FormatError::MissingTag("TileOffsets or StripOffsets")),
                };
                let byte_counts =
                    require_u64_vec(tags, TiffTag::StripByteCounts, "StripByteCounts")?;
                if offsets.len() != byte_counts.len() {
                    return Err(FormatError::InvalidTagValue {
                        tag: "StripByteCounts",
                        message: format!(
                            "count {} does not match StripOffsets count {}",
                            byte_counts.len(),
                            offsets.len()
                        ),
                    });
                }
                // A missing RowsPerStrip means the whole image is one strip.
                let rows_per_strip = optional_u32(tags, TiffTag::RowsPerStrip, "RowsPerStrip")?
                    .unwrap_or(image_height)
                    .min(image_height);
                if rows_per_strip == 0 {
                    return Err(FormatError::InvalidTagValue {
                        tag: "RowsPerStrip",
                        message: "rows per strip must be nonzero".to_string(),
                    });
                }
                let expected = image_height.div_ceil(rows_per_strip) as usize;
                if offsets.len() < expected {
                    return Err(FormatError::InvalidTagValue {
                        tag: "StripOffsets",
                        message: format!("image needs {expected} strips, file declares {}", offsets.len()),
                    });
                }
                Ok(ChunkLayout::Stripped {
                    rows_per_strip,
                    offsets,
                    byte_counts,
                })
            }
            _ => Err(FormatError::MissingTag("TileWidth/TileLength pair")),
        }
    }

    // -------------------------------------------------------------------------
    // Layout accessors
    // -------------------------------------------------------------------------

    /// Image width in pixels.
    pub fn image_width(&self) -> u32 {
        self.image_width
    }

    /// Image height in pixels.
    pub fn image_height(&self) -> u32 {
        self.image_height
    }

    /// Bits per sample, one entry per sample (or a single entry applying to
    /// all samples).
    pub fn bits_per_sample(&self) -> &[u16] {
        &self.bits_per_sample
    }

    /// Number of components per pixel.
    pub fn samples_per_pixel(&self) -> u16 {
        self.samples_per_pixel
    }

    /// Compression method identifier (see [`super::tags::compression`]).
    pub fn compression(&self) -> u16 {
        self.compression
    }

    /// Predictor applied before compression.
    pub fn predictor(&self) -> Predictor {
        self.predictor
    }

    /// Sample format, one entry per sample.
    pub fn sample_format(&self) -> &[SampleFormat] {
        &self.sample_format
    }

    /// The chunk layout (tiled or stripped).
    pub fn chunk_layout(&self) -> &ChunkLayout {
        &self.chunks
    }

    /// Whether the image is stored as tiles (vs. strips).
    pub fn is_tiled(&self) -> bool {
        matches!(self.chunks, ChunkLayout::Tiled { .. })
    }

    /// Grid dimensions as (rows, cols).
    ///
    /// Tiled images form a `ceil(height/tile_height) x ceil(width/tile_width)`
    /// grid; stripped images are addressed as an `n x 1` grid over the strip
    /// count.
    pub fn grid_dimensions(&self) -> (u32, u32) {
        match &self.chunks {
            ChunkLayout::Tiled {
                tile_width,
                tile_height,
                ..
            } => (
                self.image_height.div_ceil(*tile_height),
                self.image_width.div_ceil(*tile_width),
            ),
            ChunkLayout::Stripped { offsets, .. } => (offsets.len() as u32, 1),
        }
    }

    /// Pixel dimensions of the stored chunk at the given grid row.
    ///
    /// Tiles are always stored at full tile size, padding included; the last
    /// strip of a stripped image only holds the remaining rows.
    pub fn chunk_pixel_dimensions(&self, row: u32) -> (u32, u32) {
        match &self.chunks {
            ChunkLayout::Tiled {
                tile_width,
                tile_height,
                ..
            } => (*tile_width, *tile_height),
            ChunkLayout::Stripped { rows_per_strip, .. } => {
                let remaining = self.image_height - (row * rows_per_strip).min(self.image_height);
                (self.image_width, remaining.min(*rows_per_strip))
            }
        }
    }

    /// Total bits per pixel across all samples.
    pub fn bits_per_pixel(&self) -> u32 {
        if self.bits_per_sample.len() == 1 {
            self.samples_per_pixel as u32 * self.bits_per_sample[0] as u32
        } else {
            self.bits_per_sample.iter().map(|&b| b as u32).sum()
        }
    }

    // -------------------------------------------------------------------------
    // Raw and geo views
    // -------------------------------------------------------------------------

    /// Look up a raw tag value by id.
    pub fn tag(&self, tag_id: u16) -> Option<&TagValue> {
        self.tags.get(&tag_id)
    }

    /// Iterate over all raw tags in ascending tag-id order.
    pub fn tags(&self) -> impl Iterator<Item = (u16, &TagValue)> {
        self.tags.iter().map(|(&id, value)| (id, value))
    }

    /// The decoded geo key directory, if the image carries one.
    pub fn geo_key_directory(&self) -> Option<&GeoKeyDirectory> {
        self.geo_keys.as_ref()
    }

    /// GeoTIFF pixel scale (x, y, z), if present.
    pub fn model_pixel_scale(&self) -> Option<&[f64]> {
        self.model_pixel_scale.as_deref()
    }

    /// GeoTIFF raster/model tiepoints, if present.
    pub fn model_tiepoint(&self) -> Option<&[f64]> {
        self.model_tiepoint.as_deref()
    }
}

fn invalid(value: &TagValue, tag: &'static str) -> FormatError {
    FormatError::InvalidTagValue {
        tag,
        message: format!("unexpected kind {:?} (count {})", value.kind(), value.count()),
    }
}

fn require_u32(
    tags: &BTreeMap<u16, TagValue>,
    tag: TiffTag,
    name: &'static str,
) -> Result<u32, FormatError> {
    let value = tags
        .get(&tag.as_u16())
        .ok_or(FormatError::MissingTag(name))?;
    value.as_u32().ok_or_else(|| invalid(value, name))
}

fn optional_u32(
    tags: &BTreeMap<u16, TagValue>,
    tag: TiffTag,
    name: &'static str,
) -> Result<Option<u32>, FormatError> {
    match tags.get(&tag.as_u16()) {
        Some(value) => value.as_u32().map(Some).ok_or_else(|| invalid(value, name)),
        None => Ok(None),
    }
}

fn require_u64_vec(
    tags: &BTreeMap<u16, TagValue>,
    tag: TiffTag,
    name: &'static str,
) -> Result<Vec<u64>, FormatError> {
    let value = tags
        .get(&tag.as_u16())
        .ok_or(FormatError::MissingTag(name))?;
    value.as_u64_vec().ok_or_else(|| invalid(value, name))
}

// =============================================================================
// Chain parsing
// =============================================================================

/// Parse the TIFF header and every IFD in the file's chain.
///
/// Issues one prefetch read of `prefetch_hint` bytes from offset 0 (clamped
/// to the file size); all further reads are served from that buffer when
/// possible. Fails with [`FormatError`] on any structural violation,
/// including a next-IFD chain that revisits an offset.
pub async fn parse_ifds<R: RangeReader>(
    source: &R,
    prefetch_hint: u64,
) -> Result<(TiffHeader, Vec<ImageFileDirectory>), FormatError> {
    let file_size = source.size();
    if file_size < TIFF_HEADER_SIZE as u64 {
        return Err(FormatError::FileTooSmall {
            required: TIFF_HEADER_SIZE as u64,
            actual: file_size,
        });
    }

    let prefetch_len = prefetch_hint.max(TIFF_HEADER_SIZE as u64).min(file_size);
    let prefetch = source.read_exact_at(0, prefetch_len as usize).await?;
    let header = TiffHeader::parse(&prefetch, file_size)?;

    if header.first_ifd_offset == 0 {
        return Err(FormatError::InvalidIfdOffset(0));
    }

    let parser = ChainParser {
        source,
        prefetch,
        header,
        file_size,
    };

    let mut ifds = Vec::new();
    let mut visited: HashSet<u64> = HashSet::new();
    let mut offset = header.first_ifd_offset;

    while offset != 0 {
        if !visited.insert(offset) {
            return Err(FormatError::CyclicIfdChain(offset));
        }
        if ifds.len() >= MAX_IFD_CHAIN {
            return Err(FormatError::IfdChainTooLong(MAX_IFD_CHAIN));
        }
        let (ifd, next_offset) = parser.read_ifd(offset).await?;
        ifds.push(ifd);
        offset = next_offset;
    }

    debug!(
        resource = source.identifier(),
        ifds = ifds.len(),
        prefetch = prefetch_len,
        "parsed IFD chain"
    );

    Ok((header, ifds))
}

struct ChainParser<'a, R: RangeReader> {
    source: &'a R,
    prefetch: Bytes,
    header: TiffHeader,
    file_size: u64,
}

impl<R: RangeReader> ChainParser<'_, R> {
    /// Read bytes at an absolute offset, serving from the prefetch buffer
    /// when the range is fully covered by it.
    async fn read_at(&self, offset: u64, len: usize) -> Result<Bytes, FormatError> {
        let end = offset + len as u64;
        if end <= self.prefetch.len() as u64 {
            Ok(self.prefetch.slice(offset as usize..end as usize))
        } else {
            Ok(self.source.read_exact_at(offset, len).await?)
        }
    }

    /// Read one directory: entry count, entry table, raw tag map, and the
    /// next-IFD offset.
    async fn read_ifd(&self, offset: u64) -> Result<(ImageFileDirectory, u64), FormatError> {
        if offset >= self.file_size {
            return Err(FormatError::InvalidIfdOffset(offset));
        }

        let variant = self.header.variant;
        let byte_order = self.header.byte_order;

        let count_size = variant.ifd_count_size();
        let count_bytes = self.read_at(offset, count_size).await?;
        let entry_count = match variant {
            TiffVariant::Classic => byte_order.read_u16(&count_bytes) as u64,
            TiffVariant::Big => byte_order.read_u64(&count_bytes),
        };

        let entry_size = variant.ifd_entry_size() as u64;
        let table_len = entry_count
            .checked_mul(entry_size)
            .and_then(|len| len.checked_add(variant.next_offset_size() as u64))
            .ok_or(FormatError::InvalidIfdOffset(offset))?;
        let table_start = offset + count_size as u64;
        if table_start
            .checked_add(table_len)
            .map(|end| end > self.file_size)
            .unwrap_or(true)
        {
            return Err(FormatError::InvalidIfdOffset(offset));
        }

        // One read covers the whole entry table plus the next-IFD offset.
        let table = self.read_at(table_start, table_len as usize).await?;

        let mut tags: BTreeMap<u16, TagValue> = BTreeMap::new();
        for i in 0..entry_count as usize {
            let entry = &table[i * entry_size as usize..(i + 1) * entry_size as usize];
            if let Some((tag_id, value)) = self.read_entry(entry).await? {
                tags.insert(tag_id, value);
            }
        }

        let next_offset =
            variant.read_offset(byte_order, &table[(entry_count * entry_size) as usize..]);

        let ifd = ImageFileDirectory::from_tags(tags)?;
        Ok((ifd, next_offset))
    }

    /// Decode one entry, fetching its value if stored out of line.
    ///
    /// Returns `None` for entries with unknown field types; those are
    /// skipped, not errors.
    async fn read_entry(&self, entry: &[u8]) -> Result<Option<(u16, TagValue)>, FormatError> {
        let variant = self.header.variant;
        let byte_order = self.header.byte_order;

        let tag_id = byte_order.read_u16(&entry[0..]);
        let type_raw = byte_order.read_u16(&entry[2..]);
        let Some(field_type) = FieldType::from_u16(type_raw) else {
            debug!(tag_id, field_type = type_raw, "skipping entry with unknown field type");
            return Ok(None);
        };

        let count = match variant {
            TiffVariant::Classic => byte_order.read_u32(&entry[4..]) as u64,
            TiffVariant::Big => byte_order.read_u64(&entry[4..]),
        };
        let value_field = match variant {
            TiffVariant::Classic => &entry[8..12],
            TiffVariant::Big => &entry[12..20],
        };

        let byte_len = count
            .checked_mul(field_type.size_in_bytes())
            .ok_or_else(|| FormatError::InvalidTagValue {
                tag: "entry",
                message: format!("tag {tag_id}: value size overflows"),
            })?;

        let value = if byte_len <= variant.inline_threshold() {
            decode_tag_value(&value_field[..byte_len as usize], field_type, count, byte_order)?
        } else {
            let value_offset = variant.read_offset(byte_order, value_field);
            if value_offset
                .checked_add(byte_len)
                .map(|end| end > self.file_size)
                .unwrap_or(true)
            {
                return Err(FormatError::ValueOutOfBounds {
                    tag: tag_id,
                    offset: value_offset,
                    length: byte_len,
                });
            }
            let bytes = self.read_at(value_offset, byte_len as usize).await?;
            decode_tag_value(&bytes, field_type, count, byte_order)?
        };

        Ok(Some((tag_id, value)))
    }
}

// =============================================================================
// Tests
// =============================================================================
