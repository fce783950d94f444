//! Predictor reversal.
//!
//! TIFF writers may run a reversible transform over the raster before
//! compression to make it compress better; readers must undo it after
//! decompression. Horizontal differencing (predictor 2) stores each sample
//! as the delta to the same sample of the previous pixel in the row.
//!
//! Reversal happens on native-endian samples, so multi-byte samples are
//! byte-swapped from the file's declared order first. That normalization is
//! applied for every predictor, including "none": the decode pipeline's
//! output is always native-endian.

use bytes::{Bytes, BytesMut};

use crate::error::TileError;
use crate::format::tiff::{ByteOrder, Predictor};

use super::TileLayout;

/// Undo the declared predictor on a decompressed chunk and normalize sample
/// byte order.
///
/// `buffer` holds `layout.decoded_len()` bytes of row-major samples. Fails
/// with [`TileError::UnsupportedPredictor`] for the floating-point predictor.
pub fn reverse_predictor(
    buffer: Bytes,
    predictor: Predictor,
    layout: &TileLayout,
) -> Result<Bytes, TileError> {
    match predictor {
        Predictor::None => {
            let mut buf = BytesMut::from(&buffer[..]);
            fix_endianness(&mut buf, layout.byte_order, layout.bits_per_sample);
            Ok(buf.freeze())
        }
        Predictor::Horizontal => {
            let mut buf = BytesMut::from(&buffer[..]);
            fix_endianness(&mut buf, layout.byte_order, layout.bits_per_sample);
            let stride = layout.row_stride();
            let samples = layout.samples_per_pixel as usize;
            for row in buf.chunks_mut(stride) {
                rev_hpredict_nsamp(row, layout.bits_per_sample, samples);
            }
            Ok(buf.freeze())
        }
        Predictor::FloatingPoint => {
            Err(TileError::UnsupportedPredictor(Predictor::FloatingPoint as u16))
        }
    }
}

/// Convert samples from the file's byte order to native byte order in place.
fn fix_endianness(buf: &mut [u8], byte_order: ByteOrder, bit_depth: u16) {
    match bit_depth {
        0..=8 => {}
        9..=16 => {
            for chunk in buf.chunks_exact_mut(2) {
                let value = match byte_order {
                    ByteOrder::LittleEndian => u16::from_le_bytes([chunk[0], chunk[1]]),
                    ByteOrder::BigEndian => u16::from_be_bytes([chunk[0], chunk[1]]),
                };
                chunk.copy_from_slice(&value.to_ne_bytes());
            }
        }
        17..=32 => {
            for chunk in buf.chunks_exact_mut(4) {
                let raw = [chunk[0], chunk[1], chunk[2], chunk[3]];
                let value = match byte_order {
                    ByteOrder::LittleEndian => u32::from_le_bytes(raw),
                    ByteOrder::BigEndian => u32::from_be_bytes(raw),
                };
                chunk.copy_from_slice(&value.to_ne_bytes());
            }
        }
        _ => {
            for chunk in buf.chunks_exact_mut(8) {
                let raw = [
                    chunk[0], chunk[1], chunk[2], chunk[3], chunk[4], chunk[5], chunk[6], chunk[7],
                ];
                let value = match byte_order {
                    ByteOrder::LittleEndian => u64::from_le_bytes(raw),
                    ByteOrder::BigEndian => u64::from_be_bytes(raw),
                };
                chunk.copy_from_slice(&value.to_ne_bytes());
            }
        }
    }
}

/// Undo horizontal differencing over one row of native-endian samples.
fn rev_hpredict_nsamp(row: &mut [u8], bit_depth: u16, samples: usize) {
    match bit_depth {
        0..=8 => {
            for i in samples..row.len() {
                row[i] = row[i].wrapping_add(row[i - samples]);
            }
        }
        9..=16 => {
            let stride = samples * 2;
            for i in (stride..row.len().saturating_sub(1)).step_by(2) {
                let value = u16::from_ne_bytes([row[i], row[i + 1]]);
                let prev = u16::from_ne_bytes([row[i - stride], row[i - stride + 1]]);
                row[i..i + 2].copy_from_slice(&value.wrapping_add(prev).to_ne_bytes());
            }
        }
        17..=32 => {
            let stride = samples * 4;
            for i in (stride..row.len().saturating_sub(3)).step_by(4) {
                let value = u32::from_ne_bytes([row[i], row[i + 1], row[i + 2], row[i + 3]]);
                let prev = u32::from_ne_bytes([
                    row[i - stride],
                    row[i - stride + 1],
                    row[i - stride + 2],
                    row[i - stride + 3],
                ]);
                row[i..i + 4].copy_from_slice(&value.wrapping_add(prev).to_ne_bytes());
            }
        }
        _ => {
            let stride = samples * 8;
            for i in (stride..row.len().saturating_sub(7)).step_by(8) {
                let value = u64::from_ne_bytes([
                    row[i],
                    row[i + 1],
                    row[i + 2],
                    row[i + 3],
                    row[i + 4],
                    row[i + 5],
                    row[i + 6],
                    row[i + 7],
                ]);
                let prev = u64::from_ne_bytes([
                    row[i - stride],
                    row[i - stride + 1],
                    row[i - stride + 2],
                    row[i - stride + 3],
                    row[i - stride + 4],
                    row[i - stride + 5],
                    row[i - stride + 6],
                    row[i - stride + 7],
                ]);
                row[i..i + 8].copy_from_slice(&value.wrapping_add(prev).to_ne_bytes());
            }
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
