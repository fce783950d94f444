//! Decoder registry and the tile decode pipeline.
//!
//! Compression codecs are not hard-wired into the reader: a
//! [`DecoderRegistry`] maps a compression method id to a capability with a
//! fixed bytes-in/bytes-out contract, and callers can register decoders for
//! private ids at runtime. Decoding is CPU-bound and never performs I/O; the
//! pipeline dispatches it through a [`DecodeExecutor`] so it cannot starve
//! the I/O scheduler.

use std::collections::HashMap;
use std::fmt::Debug;
use std::io::Read;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use bytes::Bytes;
use flate2::bufread::ZlibDecoder;

use crate::error::TileError;
use crate::format::tiff::{compression, Predictor};

use super::predictor::reverse_predictor;
use super::TileLayout;

// =============================================================================
// Decoder trait
// =============================================================================

/// A decompression capability for one compression method.
///
/// Implementations must be thread-safe: decoding runs concurrently on worker
/// threads for independent tiles.
pub trait Decoder: Debug + Send + Sync {
    /// Decompress one chunk payload.
    ///
    /// `decoded_len` is the expected size of the decompressed chunk, derived
    /// from the IFD's tile geometry; decoders that need a preallocated output
    /// (LZW, Deflate) size it from this.
    fn decode(&self, compressed: Bytes, decoded_len: usize) -> Result<Bytes, TileError>;
}

// =============================================================================
// Built-in decoders
// =============================================================================

/// Identity decoder for uncompressed data.
#[derive(Debug, Clone, Copy)]
pub struct UncompressedDecoder;

impl Decoder for UncompressedDecoder {
    fn decode(&self, compressed: Bytes, _decoded_len: usize) -> Result<Bytes, TileError> {
        Ok(compressed)
    }
}

/// Decoder for the Deflate (zlib) compression methods (ids 8 and 32946).
#[derive(Debug, Clone, Copy)]
pub struct DeflateDecoder;

impl Decoder for DeflateDecoder {
    fn decode(&self, compressed: Bytes, decoded_len: usize) -> Result<Bytes, TileError> {
        let mut out = vec![0u8; decoded_len];
        let mut decoder = ZlibDecoder::new(&compressed[..]);
        decoder
            .read_exact(&mut out)
            .map_err(|e| TileError::Decode(format!("deflate: {e}")))?;
        Ok(Bytes::from(out))
    }
}

/// Decoder for the LZW compression method (id 5), in TIFF's MSB-first
/// variant with the early size switch.
#[derive(Debug, Clone, Copy)]
pub struct LzwDecoder;

impl Decoder for LzwDecoder {
    fn decode(&self, compressed: Bytes, decoded_len: usize) -> Result<Bytes, TileError> {
        let mut out = vec![0u8; decoded_len];
        let mut decoder = weezl::decode::Decoder::with_tiff_size_switch(weezl::BitOrder::Msb, 8);
        let result = decoder.decode_bytes(&compressed, &mut out);
        match result.status {
            Ok(weezl::LzwStatus::Ok) | Ok(weezl::LzwStatus::Done) => Ok(Bytes::from(out)),
            Ok(weezl::LzwStatus::NoProgress) => {
                Err(TileError::Decode("lzw: decoder made no progress".to_string()))
            }
            Err(e) => Err(TileError::Decode(format!("lzw: {e}"))),
        }
    }
}

// =============================================================================
// DecoderRegistry
// =============================================================================

/// A concurrent mapping from compression method id to decoder.
///
/// Registration is the only mutation path; lookups clone the `Arc`, so a
/// decoder fetched before a re-registration keeps working. Safe to share
/// across tasks and to call from decode workers.
#[derive(Debug)]
pub struct DecoderRegistry {
    decoders: RwLock<HashMap<u16, Arc<dyn Decoder>>>,
}

impl DecoderRegistry {
    /// Create a registry with no decoders registered.
    pub fn new() -> Self {
        Self {
            decoders: RwLock::new(HashMap::new()),
        }
    }

    /// Register a decoder for a compression method id, replacing any
    /// previous registration for that id.
    pub fn register(&self, compression_id: u16, decoder: Arc<dyn Decoder>) {
        self.decoders
            .write()
            .expect("decoder registry lock poisoned")
            .insert(compression_id, decoder);
    }

    /// Look up the decoder for a compression method id.
    pub fn get(&self, compression_id: u16) -> Option<Arc<dyn Decoder>> {
        self.decoders
            .read()
            .expect("decoder registry lock poisoned")
            .get(&compression_id)
            .cloned()
    }

    /// The compression ids currently registered, in ascending order.
    pub fn registered_ids(&self) -> Vec<u16> {
        let mut ids: Vec<u16> = self
            .decoders
            .read()
            .expect("decoder registry lock poisoned")
            .keys()
            .copied()
            .collect();
        ids.sort_unstable();
        ids
    }
}

impl Default for DecoderRegistry {
    /// Registry with the built-in decoders: uncompressed, Deflate (both
    /// ids), and LZW.
    fn default() -> Self {
        let registry = Self::new();
        registry.register(compression::NONE, Arc::new(UncompressedDecoder));
        registry.register(compression::DEFLATE, Arc::new(DeflateDecoder));
        registry.register(compression::ADOBE_DEFLATE, Arc::new(DeflateDecoder));
        registry.register(compression::LZW, Arc::new(LzwDecoder));
        registry
    }
}

// =============================================================================
// DecodeExecutor
// =============================================================================

/// A CPU-bound work unit produced by the decode pipeline.
pub type DecodeTask = Box<dyn FnOnce() -> Result<Bytes, TileError> + Send + 'static>;

/// Capability for running CPU-bound decode work off the I/O path.
#[async_trait]
pub trait DecodeExecutor: Send + Sync {
    /// Run the task to completion and return its result.
    async fn run(&self, task: DecodeTask) -> Result<Bytes, TileError>;
}

/// Default executor: dispatches onto tokio's blocking thread pool.
#[derive(Debug, Default, Clone, Copy)]
pub struct SpawnBlockingExecutor;

#[async_trait]
impl DecodeExecutor for SpawnBlockingExecutor {
    async fn run(&self, task: DecodeTask) -> Result<Bytes, TileError> {
        tokio::task::spawn_blocking(task)
            .await
            .map_err(|e| TileError::Decode(format!("decode task aborted: {e}")))?
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// Decompress one chunk and undo its predictor.
///
/// This is the synchronous core of the decode pipeline; the reader wraps it
/// in a [`DecodeTask`] and hands it to a [`DecodeExecutor`]. Fails with
/// [`TileError::UnsupportedCompression`] when no decoder is registered for
/// the IFD's compression method.
pub fn decode_chunk(
    compressed: Bytes,
    compression_id: u16,
    predictor: Predictor,
    layout: &TileLayout,
    registry: &DecoderRegistry,
) -> Result<Bytes, TileError> {
    let decoder = registry
        .get(compression_id)
        .ok_or(TileError::UnsupportedCompression(compression_id))?;
    let decoded = decoder.decode(compressed, layout.decoded_len())?;
    reverse_predictor(decoded, predictor, layout)
}

// =============================================================================
// Tests
// =============================================================================
