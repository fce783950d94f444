//! Shared fixtures for integration tests.
//!
//! Builds small but complete TIFF/BigTIFF files in memory, in either byte
//! order, plus a fetch-counting [`RangeReader`] so tests can assert how many
//! underlying reads an operation cost.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use cog_streamer::{ByteRange, IoError, RangeReader};

/// Install the test tracing subscriber. Safe to call from every test;
/// only the first call wins.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

// =============================================================================
// Counting reader
// =============================================================================

/// In-memory reader that counts underlying reads and can fail a byte span.
#[derive(Clone)]
pub struct CountingReader {
    data: Bytes,
    reads: Arc<AtomicUsize>,
    fail_within: Option<ByteRange>,
}

impl CountingReader {
    pub fn new(data: Vec<u8>) -> Self {
        Self {
            data: Bytes::from(data),
            reads: Arc::new(AtomicUsize::new(0)),
            fail_within: None,
        }
    }

    /// Fail any read overlapping `range` with an injected fetch error.
    pub fn failing(data: Vec<u8>, range: ByteRange) -> Self {
        Self {
            fail_within: Some(range),
            ..Self::new(data)
        }
    }

    /// Handle onto the read counter; survives moving the reader into a
    /// `TiffReader`.
    pub fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.reads)
    }
}

#[async_trait]
impl RangeReader for CountingReader {
    async fn read_exact_at(&self, offset: u64, len: usize) -> Result<Bytes, IoError> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if let Some(bad) = self.fail_within {
            let end = offset + len as u64;
            if offset < bad.end() && bad.offset < end {
                return Err(IoError::Fetch("injected failure".to_string()));
            }
        }
        if offset + len as u64 > self.data.len() as u64 {
            return Err(IoError::RangeOutOfBounds {
                offset,
                requested: len as u64,
                size: self.data.len() as u64,
            });
        }
        Ok(self.data.slice(offset as usize..offset as usize + len))
    }

    fn size(&self) -> u64 {
        self.data.len() as u64
    }

    fn identifier(&self) -> &str {
        "mock://fixture"
    }
}

// =============================================================================
// Fixture builder
// =============================================================================

/// Value payload of one fixture IFD entry.
pub enum EntryData {
    /// Stored in the entry's value field (must fit the variant's threshold)
    Inline(Vec<u8>),
    /// Stored after the IFD, referenced by offset
    OutOfLine(Vec<u8>),
}

/// One fixture IFD entry. Callers list entries in ascending tag order, as
/// the TIFF spec requires of writers.
pub struct EntrySpec {
    pub tag: u16,
    pub field_type: u16,
    pub count: u64,
    pub data: EntryData,
}

impl EntrySpec {
    pub fn new(tag: u16, field_type: u16, count: u64, data: EntryData) -> Self {
        Self {
            tag,
            field_type,
            count,
            data,
        }
    }
}

/// Offsets of one written IFD, for chain patching.
pub struct IfdHandle {
    pub offset: u64,
    pub next_offset_pos: usize,
}

/// Incrementally assembles a TIFF or BigTIFF file.
pub struct FixtureBuilder {
    big_endian: bool,
    bigtiff: bool,
    buf: Vec<u8>,
}

impl FixtureBuilder {
    /// Start a file: header written immediately, first-IFD offset patched in
    /// later via [`set_first_ifd`](Self::set_first_ifd).
    pub fn new(big_endian: bool, bigtiff: bool) -> Self {
        let mut builder = Self {
            big_endian,
            bigtiff,
            buf: Vec::new(),
        };
        builder.buf.extend_from_slice(if big_endian { b"MM" } else { b"II" });
        if bigtiff {
            builder.push_u16(43);
            builder.push_u16(8);
            builder.push_u16(0);
            builder.push_u64(0); // first IFD offset, patched later
        } else {
            builder.push_u16(42);
            builder.push_u32(0); // first IFD offset, patched later
        }
        builder
    }

    fn push_u16(&mut self, v: u16) {
        let bytes = if self.big_endian {
            v.to_be_bytes()
        } else {
            v.to_le_bytes()
        };
        self.buf.extend_from_slice(&bytes);
    }

    fn push_u32(&mut self, v: u32) {
        let bytes = if self.big_endian {
            v.to_be_bytes()
        } else {
            v.to_le_bytes()
        };
        self.buf.extend_from_slice(&bytes);
    }

    fn push_u64(&mut self, v: u64) {
        let bytes = if self.big_endian {
            v.to_be_bytes()
        } else {
            v.to_le_bytes()
        };
        self.buf.extend_from_slice(&bytes);
    }

    fn push_offset(&mut self, v: u64) {
        if self.bigtiff {
            self.push_u64(v);
        } else {
            self.push_u32(v as u32);
        }
    }

    fn patch_offset(&mut self, pos: usize, v: u64) {
        if self.bigtiff {
            let bytes = if self.big_endian {
                v.to_be_bytes()
            } else {
                v.to_le_bytes()
            };
            self.buf[pos..pos + 8].copy_from_slice(&bytes);
        } else {
            let bytes = if self.big_endian {
                (v as u32).to_be_bytes()
            } else {
                (v as u32).to_le_bytes()
            };
            self.buf[pos..pos + 4].copy_from_slice(&bytes);
        }
    }

    /// Append raw payload bytes (tile/strip data), returning their offset.
    pub fn append_data(&mut self, bytes: &[u8]) -> u64 {
        let offset = self.buf.len() as u64;
        self.buf.extend_from_slice(bytes);
        offset
    }

    /// Write an IFD with the given entries, laying out-of-line values out
    /// directly after it. The next-IFD offset is written as 0.
    pub fn write_ifd(&mut self, entries: &[EntrySpec]) -> IfdHandle {
        let offset = self.buf.len() as u64;
        let (count_size, entry_size, offset_size, inline) = if self.bigtiff {
            (8u64, 20u64, 8u64, 8usize)
        } else {
            (2, 12, 4, 4)
        };

        if self.bigtiff {
            self.push_u64(entries.len() as u64);
        } else {
            self.push_u16(entries.len() as u16);
        }

        // Out-of-line blobs start right after the next-IFD offset field.
        let mut blob_cursor = offset + count_size + entries.len() as u64 * entry_size + offset_size;
        let mut blobs: Vec<&[u8]> = Vec::new();

        for entry in entries {
            self.push_u16(entry.tag);
            self.push_u16(entry.field_type);
            if self.bigtiff {
                self.push_u64(entry.count);
            } else {
                self.push_u32(entry.count as u32);
            }
            match &entry.data {
                EntryData::Inline(bytes) => {
                    assert!(bytes.len() <= inline, "inline value too large");
                    self.buf.extend_from_slice(bytes);
                    for _ in bytes.len()..inline {
                        self.buf.push(0);
                    }
                }
                EntryData::OutOfLine(bytes) => {
                    self.push_offset(blob_cursor);
                    blob_cursor += bytes.len() as u64;
                    blobs.push(bytes);
                }
            }
        }

        let next_offset_pos = self.buf.len();
        self.push_offset(0);

        for blob in blobs {
            self.buf.extend_from_slice(blob);
        }

        IfdHandle {
            offset,
            next_offset_pos,
        }
    }

    /// Point the header at the first IFD.
    pub fn set_first_ifd(&mut self, offset: u64) {
        let pos = if self.bigtiff { 8 } else { 4 };
        self.patch_offset(pos, offset);
    }

    /// Chain one IFD to the next.
    pub fn link_ifds(&mut self, from: &IfdHandle, to: u64) {
        self.patch_offset(from.next_offset_pos, to);
    }

    pub fn finish(self) -> Vec<u8> {
        self.buf
    }

    // ---- endian-aware value encoding ----------------------------------------

    pub fn shorts(&self, values: &[u16]) -> Vec<u8> {
        values
            .iter()
            .flat_map(|&v| {
                if self.big_endian {
                    v.to_be_bytes()
                } else {
                    v.to_le_bytes()
                }
            })
            .collect()
    }

    pub fn longs(&self, values: &[u32]) -> Vec<u8> {
        values
            .iter()
            .flat_map(|&v| {
                if self.big_endian {
                    v.to_be_bytes()
                } else {
                    v.to_le_bytes()
                }
            })
            .collect()
    }

    pub fn long8s(&self, values: &[u64]) -> Vec<u8> {
        values
            .iter()
            .flat_map(|&v| {
                if self.big_endian {
                    v.to_be_bytes()
                } else {
                    v.to_le_bytes()
                }
            })
            .collect()
    }

    pub fn doubles(&self, values: &[f64]) -> Vec<u8> {
        values
            .iter()
            .flat_map(|&v| {
                if self.big_endian {
                    v.to_be_bytes()
                } else {
                    v.to_le_bytes()
                }
            })
            .collect()
    }
}

// =============================================================================
// Field type / tag id shorthand
// =============================================================================

pub const T_ASCII: u16 = 2;
pub const T_SHORT: u16 = 3;
pub const T_LONG: u16 = 4;
pub const T_DOUBLE: u16 = 12;
pub const T_LONG8: u16 = 16;

pub const TAG_IMAGE_WIDTH: u16 = 256;
pub const TAG_IMAGE_LENGTH: u16 = 257;
pub const TAG_BITS_PER_SAMPLE: u16 = 258;
pub const TAG_COMPRESSION: u16 = 259;
pub const TAG_STRIP_OFFSETS: u16 = 273;
pub const TAG_SAMPLES_PER_PIXEL: u16 = 277;
pub const TAG_ROWS_PER_STRIP: u16 = 278;
pub const TAG_STRIP_BYTE_COUNTS: u16 = 279;
pub const TAG_PREDICTOR: u16 = 317;
pub const TAG_TILE_WIDTH: u16 = 322;
pub const TAG_TILE_LENGTH: u16 = 323;
pub const TAG_TILE_OFFSETS: u16 = 324;
pub const TAG_TILE_BYTE_COUNTS: u16 = 325;
pub const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
pub const TAG_MODEL_TIEPOINT: u16 = 33922;
pub const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
pub const TAG_GEO_DOUBLE_PARAMS: u16 = 34736;
pub const TAG_GEO_ASCII_PARAMS: u16 = 34737;

// =============================================================================
// Fixtures
// =============================================================================

/// Image/tile geometry of the standard tiled fixture.
pub const TILE_SIZE: u32 = 16;
pub const IMAGE_SIZE: u32 = 32;

/// A 32x32, 8-bit grayscale, uncompressed image stored as four 16x16 tiles.
pub struct TiledFixture {
    pub data: Vec<u8>,
    /// Pixel bytes of each tile, row-major tile order
    pub tiles: Vec<Vec<u8>>,
    /// File offset of each tile payload
    pub tile_offsets: Vec<u64>,
    pub ifd: IfdHandle,
}

/// Build the standard 2x2-tile fixture in any endianness/variant
/// combination. Tile payloads sit contiguously, so all four tiles merge into
/// one coalesced fetch under default policy.
pub fn tiled_fixture(big_endian: bool, bigtiff: bool) -> TiledFixture {
    let mut b = FixtureBuilder::new(big_endian, bigtiff);

    let tile_len = (TILE_SIZE * TILE_SIZE) as usize;
    let tiles: Vec<Vec<u8>> = (0..4)
        .map(|k| (0..tile_len).map(|i| ((k * 64 + i) % 256) as u8).collect())
        .collect();
    let tile_offsets: Vec<u64> = tiles.iter().map(|t| b.append_data(t)).collect();

    let (offsets_type, offsets_bytes) = if bigtiff {
        (T_LONG8, b.long8s(&tile_offsets))
    } else {
        let as_u32: Vec<u32> = tile_offsets.iter().map(|&o| o as u32).collect();
        (T_LONG, b.longs(&as_u32))
    };
    let byte_counts_bytes = if bigtiff {
        b.long8s(&[tile_len as u64; 4])
    } else {
        b.longs(&[tile_len as u32; 4])
    };

    let entries = vec![
        EntrySpec::new(
            TAG_IMAGE_WIDTH,
            T_SHORT,
            1,
            EntryData::Inline(b.shorts(&[IMAGE_SIZE as u16])),
        ),
        EntrySpec::new(
            TAG_IMAGE_LENGTH,
            T_SHORT,
            1,
            EntryData::Inline(b.shorts(&[IMAGE_SIZE as u16])),
        ),
        EntrySpec::new(
            TAG_BITS_PER_SAMPLE,
            T_SHORT,
            1,
            EntryData::Inline(b.shorts(&[8])),
        ),
        EntrySpec::new(TAG_COMPRESSION, T_SHORT, 1, EntryData::Inline(b.shorts(&[1]))),
        EntrySpec::new(
            TAG_SAMPLES_PER_PIXEL,
            T_SHORT,
            1,
            EntryData::Inline(b.shorts(&[1])),
        ),
        EntrySpec::new(
            TAG_TILE_WIDTH,
            T_SHORT,
            1,
            EntryData::Inline(b.shorts(&[TILE_SIZE as u16])),
        ),
        EntrySpec::new(
            TAG_TILE_LENGTH,
            T_SHORT,
            1,
            EntryData::Inline(b.shorts(&[TILE_SIZE as u16])),
        ),
        EntrySpec::new(
            TAG_TILE_OFFSETS,
            offsets_type,
            4,
            EntryData::OutOfLine(offsets_bytes),
        ),
        EntrySpec::new(
            TAG_TILE_BYTE_COUNTS,
            offsets_type,
            4,
            EntryData::OutOfLine(byte_counts_bytes),
        ),
    ];

    let ifd = b.write_ifd(&entries);
    b.set_first_ifd(ifd.offset);

    TiledFixture {
        data: b.finish(),
        tiles,
        tile_offsets,
        ifd,
    }
}

/// Variant of the tiled fixture whose next-IFD offset points back at the
/// same IFD.
pub fn cyclic_fixture() -> Vec<u8> {
    let fixture = tiled_fixture(false, false);
    let mut data = fixture.data;
    let pos = fixture.ifd.next_offset_pos;
    data[pos..pos + 4].copy_from_slice(&(fixture.ifd.offset as u32).to_le_bytes());
    data
}

/// A single-tile 16x16 image with explicit compression, predictor, and
/// stored payload. Used for codec and predictor end-to-end tests.
pub struct SingleTileFixture {
    pub data: Vec<u8>,
    pub payload_offset: u64,
}

pub fn single_tile_fixture(compression: u16, predictor: u16, payload: &[u8]) -> SingleTileFixture {
    let mut b = FixtureBuilder::new(false, false);
    let payload_offset = b.append_data(payload);

    let entries = vec![
        EntrySpec::new(TAG_IMAGE_WIDTH, T_SHORT, 1, EntryData::Inline(b.shorts(&[16]))),
        EntrySpec::new(TAG_IMAGE_LENGTH, T_SHORT, 1, EntryData::Inline(b.shorts(&[16]))),
        EntrySpec::new(
            TAG_BITS_PER_SAMPLE,
            T_SHORT,
            1,
            EntryData::Inline(b.shorts(&[8])),
        ),
        EntrySpec::new(
            TAG_COMPRESSION,
            T_SHORT,
            1,
            EntryData::Inline(b.shorts(&[compression])),
        ),
        EntrySpec::new(
            TAG_SAMPLES_PER_PIXEL,
            T_SHORT,
            1,
            EntryData::Inline(b.shorts(&[1])),
        ),
        EntrySpec::new(
            TAG_PREDICTOR,
            T_SHORT,
            1,
            EntryData::Inline(b.shorts(&[predictor])),
        ),
        EntrySpec::new(TAG_TILE_WIDTH, T_SHORT, 1, EntryData::Inline(b.shorts(&[16]))),
        EntrySpec::new(TAG_TILE_LENGTH, T_SHORT, 1, EntryData::Inline(b.shorts(&[16]))),
        EntrySpec::new(
            TAG_TILE_OFFSETS,
            T_LONG,
            1,
            EntryData::Inline(b.longs(&[payload_offset as u32])),
        ),
        EntrySpec::new(
            TAG_TILE_BYTE_COUNTS,
            T_LONG,
            1,
            EntryData::Inline(b.longs(&[payload.len() as u32])),
        ),
    ];

    let ifd = b.write_ifd(&entries);
    b.set_first_ifd(ifd.offset);

    SingleTileFixture {
        data: b.finish(),
        payload_offset,
    }
}

/// An 8x5 stripped image, two rows per strip: three strips of 16, 16, and 8
/// bytes.
pub struct StrippedFixture {
    pub data: Vec<u8>,
    pub strips: Vec<Vec<u8>>,
}

pub fn stripped_fixture() -> StrippedFixture {
    let mut b = FixtureBuilder::new(false, false);

    let strips: Vec<Vec<u8>> = vec![
        (0..16).map(|i| i as u8).collect(),
        (16..32).map(|i| i as u8).collect(),
        (32..40).map(|i| i as u8).collect(),
    ];
    let strip_offsets: Vec<u32> = strips.iter().map(|s| b.append_data(s) as u32).collect();
    let strip_byte_counts: Vec<u32> = strips.iter().map(|s| s.len() as u32).collect();

    let offsets_bytes = b.longs(&strip_offsets);
    let counts_bytes = b.longs(&strip_byte_counts);

    let entries = vec![
        EntrySpec::new(TAG_IMAGE_WIDTH, T_SHORT, 1, EntryData::Inline(b.shorts(&[8]))),
        EntrySpec::new(TAG_IMAGE_LENGTH, T_SHORT, 1, EntryData::Inline(b.shorts(&[5]))),
        EntrySpec::new(
            TAG_BITS_PER_SAMPLE,
            T_SHORT,
            1,
            EntryData::Inline(b.shorts(&[8])),
        ),
        EntrySpec::new(TAG_COMPRESSION, T_SHORT, 1, EntryData::Inline(b.shorts(&[1]))),
        EntrySpec::new(
            TAG_STRIP_OFFSETS,
            T_LONG,
            3,
            EntryData::OutOfLine(offsets_bytes),
        ),
        EntrySpec::new(
            TAG_SAMPLES_PER_PIXEL,
            T_SHORT,
            1,
            EntryData::Inline(b.shorts(&[1])),
        ),
        EntrySpec::new(
            TAG_ROWS_PER_STRIP,
            T_SHORT,
            1,
            EntryData::Inline(b.shorts(&[2])),
        ),
        EntrySpec::new(
            TAG_STRIP_BYTE_COUNTS,
            T_LONG,
            3,
            EntryData::OutOfLine(counts_bytes),
        ),
    ];

    let ifd = b.write_ifd(&entries);
    b.set_first_ifd(ifd.offset);

    StrippedFixture {
        data: b.finish(),
        strips,
    }
}

/// A single-tile GeoTIFF: WGS 84 geographic CRS, pixel scale, one tiepoint.
pub fn geotiff_fixture() -> Vec<u8> {
    let mut b = FixtureBuilder::new(false, false);
    let payload: Vec<u8> = vec![0xAB; 256];
    let payload_offset = b.append_data(&payload);

    // Header (version 1, revision 1.0, 4 keys) + keys in ascending order.
    let geo_directory = b.shorts(&[
        1, 1, 0, 4, //
        1024, 0, 1, 2, // ModelType = geographic
        1026, TAG_GEO_ASCII_PARAMS, 7, 0, // Citation = "WGS 84|"
        2048, 0, 1, 4326, // GeographicType = EPSG:4326
        2057, TAG_GEO_DOUBLE_PARAMS, 1, 0, // SemiMajorAxis
    ]);
    let geo_doubles = b.doubles(&[6_378_137.0]);
    let geo_ascii = b"WGS 84|\0".to_vec();
    let pixel_scale = b.doubles(&[0.1, 0.1, 0.0]);
    let tiepoint = b.doubles(&[0.0, 0.0, 0.0, 11.5, 47.9, 0.0]);

    let entries = vec![
        EntrySpec::new(TAG_IMAGE_WIDTH, T_SHORT, 1, EntryData::Inline(b.shorts(&[16]))),
        EntrySpec::new(TAG_IMAGE_LENGTH, T_SHORT, 1, EntryData::Inline(b.shorts(&[16]))),
        EntrySpec::new(
            TAG_BITS_PER_SAMPLE,
            T_SHORT,
            1,
            EntryData::Inline(b.shorts(&[8])),
        ),
        EntrySpec::new(TAG_COMPRESSION, T_SHORT, 1, EntryData::Inline(b.shorts(&[1]))),
        EntrySpec::new(
            TAG_SAMPLES_PER_PIXEL,
            T_SHORT,
            1,
            EntryData::Inline(b.shorts(&[1])),
        ),
        EntrySpec::new(TAG_TILE_WIDTH, T_SHORT, 1, EntryData::Inline(b.shorts(&[16]))),
        EntrySpec::new(TAG_TILE_LENGTH, T_SHORT, 1, EntryData::Inline(b.shorts(&[16]))),
        EntrySpec::new(
            TAG_TILE_OFFSETS,
            T_LONG,
            1,
            EntryData::Inline(b.longs(&[payload_offset as u32])),
        ),
        EntrySpec::new(
            TAG_TILE_BYTE_COUNTS,
            T_LONG,
            1,
            EntryData::Inline(b.longs(&[256])),
        ),
        EntrySpec::new(
            TAG_MODEL_PIXEL_SCALE,
            T_DOUBLE,
            3,
            EntryData::OutOfLine(pixel_scale),
        ),
        EntrySpec::new(
            TAG_MODEL_TIEPOINT,
            T_DOUBLE,
            6,
            EntryData::OutOfLine(tiepoint),
        ),
        EntrySpec::new(
            TAG_GEO_KEY_DIRECTORY,
            T_SHORT,
            20,
            EntryData::OutOfLine(geo_directory),
        ),
        EntrySpec::new(
            TAG_GEO_DOUBLE_PARAMS,
            T_DOUBLE,
            1,
            EntryData::OutOfLine(geo_doubles),
        ),
        EntrySpec::new(
            TAG_GEO_ASCII_PARAMS,
            T_ASCII,
            8,
            EntryData::OutOfLine(geo_ascii),
        ),
    ];

    let ifd = b.write_ifd(&entries);
    b.set_first_ifd(ifd.offset);
    b.finish()
}

/// Two chained IFDs: the standard 2x2-tile image plus a single-tile
/// overview.
pub fn multi_ifd_fixture() -> Vec<u8> {
    let mut b = FixtureBuilder::new(false, false);

    let tile_len = (TILE_SIZE * TILE_SIZE) as usize;
    let full_tiles: Vec<Vec<u8>> = (0..4)
        .map(|k| (0..tile_len).map(|i| ((k * 64 + i) % 256) as u8).collect())
        .collect();
    let full_offsets: Vec<u32> = full_tiles.iter().map(|t| b.append_data(t) as u32).collect();
    let overview_payload: Vec<u8> = vec![0x42; tile_len];
    let overview_offset = b.append_data(&overview_payload);

    let full_offsets_bytes = b.longs(&full_offsets);
    let full_counts_bytes = b.longs(&[tile_len as u32; 4]);

    let full_entries = vec![
        EntrySpec::new(
            TAG_IMAGE_WIDTH,
            T_SHORT,
            1,
            EntryData::Inline(b.shorts(&[IMAGE_SIZE as u16])),
        ),
        EntrySpec::new(
            TAG_IMAGE_LENGTH,
            T_SHORT,
            1,
            EntryData::Inline(b.shorts(&[IMAGE_SIZE as u16])),
        ),
        EntrySpec::new(
            TAG_BITS_PER_SAMPLE,
            T_SHORT,
            1,
            EntryData::Inline(b.shorts(&[8])),
        ),
        EntrySpec::new(TAG_COMPRESSION, T_SHORT, 1, EntryData::Inline(b.shorts(&[1]))),
        EntrySpec::new(
            TAG_SAMPLES_PER_PIXEL,
            T_SHORT,
            1,
            EntryData::Inline(b.shorts(&[1])),
        ),
        EntrySpec::new(
            TAG_TILE_WIDTH,
            T_SHORT,
            1,
            EntryData::Inline(b.shorts(&[TILE_SIZE as u16])),
        ),
        EntrySpec::new(
            TAG_TILE_LENGTH,
            T_SHORT,
            1,
            EntryData::Inline(b.shorts(&[TILE_SIZE as u16])),
        ),
        EntrySpec::new(
            TAG_TILE_OFFSETS,
            T_LONG,
            4,
            EntryData::OutOfLine(full_offsets_bytes),
        ),
        EntrySpec::new(
            TAG_TILE_BYTE_COUNTS,
            T_LONG,
            4,
            EntryData::OutOfLine(full_counts_bytes),
        ),
    ];
    let full_ifd = b.write_ifd(&full_entries);

    let overview_entries = vec![
        EntrySpec::new(TAG_IMAGE_WIDTH, T_SHORT, 1, EntryData::Inline(b.shorts(&[16]))),
        EntrySpec::new(TAG_IMAGE_LENGTH, T_SHORT, 1, EntryData::Inline(b.shorts(&[16]))),
        EntrySpec::new(
            TAG_BITS_PER_SAMPLE,
            T_SHORT,
            1,
            EntryData::Inline(b.shorts(&[8])),
        ),
        EntrySpec::new(TAG_COMPRESSION, T_SHORT, 1, EntryData::Inline(b.shorts(&[1]))),
        EntrySpec::new(
            TAG_SAMPLES_PER_PIXEL,
            T_SHORT,
            1,
            EntryData::Inline(b.shorts(&[1])),
        ),
        EntrySpec::new(TAG_TILE_WIDTH, T_SHORT, 1, EntryData::Inline(b.shorts(&[16]))),
        EntrySpec::new(TAG_TILE_LENGTH, T_SHORT, 1, EntryData::Inline(b.shorts(&[16]))),
        EntrySpec::new(
            TAG_TILE_OFFSETS,
            T_LONG,
            1,
            EntryData::Inline(b.longs(&[overview_offset as u32])),
        ),
        EntrySpec::new(
            TAG_TILE_BYTE_COUNTS,
            T_LONG,
            1,
            EntryData::Inline(b.longs(&[tile_len as u32])),
        ),
    ];
    let overview_ifd = b.write_ifd(&overview_entries);

    b.set_first_ifd(full_ifd.offset);
    b.link_ifds(&full_ifd, overview_ifd.offset);
    b.finish()
}
