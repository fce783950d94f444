//! High-level reader session.
//!
//! A [`TiffReader`] owns everything an opened resource needs: the byte-range
//! source, the parsed IFD chain, the request coalescer, and (optionally) a
//! decoded-tile cache. Lifecycle is `open -> use -> drop`; dropping the
//! reader releases all of it. IFDs are immutable after `open` and handed out
//! by reference.

use std::num::NonZeroUsize;
use std::sync::Arc;

use bytes::Bytes;
use futures::future::join_all;
use tracing::debug;

use crate::error::{FormatError, TileError};
use crate::format::tiff::{parse_ifds, ImageFileDirectory, TiffHeader};
use crate::io::{CoalesceConfig, RangeReader, RequestCoalescer};
use crate::tile::{
    locate, reverse_predictor, CompressedTile, DecodeExecutor, Decoder, DecoderRegistry,
    TileCache, TileCacheKey, TileIndex, TileLayout,
};

// =============================================================================
// Options
// =============================================================================

/// Default initial fetch size for `open`: enough to cover the header and,
/// for well-formed files, the whole first IFD in one round trip.
pub const DEFAULT_PREFETCH_SIZE: u64 = 16 * 1024;

/// Tuning knobs for opening a reader.
#[derive(Debug, Clone, Copy)]
pub struct ReaderOptions {
    /// Bytes to prefetch from offset 0 when opening (clamped to file size)
    pub prefetch: u64,

    /// Byte-range merge policy for tile fetches
    pub coalesce: CoalesceConfig,

    /// Capacity of the decoded-tile cache; `None` disables caching
    pub tile_cache_capacity: Option<NonZeroUsize>,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            prefetch: DEFAULT_PREFETCH_SIZE,
            coalesce: CoalesceConfig::default(),
            tile_cache_capacity: None,
        }
    }
}

// =============================================================================
// TiffReader
// =============================================================================

/// An opened tiled TIFF/BigTIFF resource.
pub struct TiffReader<R: RangeReader + 'static> {
    source: Arc<R>,
    header: TiffHeader,
    ifds: Vec<ImageFileDirectory>,
    coalescer: RequestCoalescer<R>,
    cache: Option<TileCache>,
}

impl<R: RangeReader + 'static> TiffReader<R> {
    /// Open a resource with default options.
    ///
    /// Issues one prefetch read and parses the full IFD chain. Fails with
    /// [`FormatError`] on any structural violation; no partial IFD list is
    /// ever surfaced.
    pub async fn open(source: R) -> Result<Self, FormatError> {
        Self::open_with_options(source, ReaderOptions::default()).await
    }

    /// Open a resource with explicit options.
    pub async fn open_with_options(source: R, options: ReaderOptions) -> Result<Self, FormatError> {
        let source = Arc::new(source);
        let (header, ifds) = parse_ifds(source.as_ref(), options.prefetch).await?;

        debug!(
            resource = source.identifier(),
            ifds = ifds.len(),
            "opened TIFF resource"
        );

        let coalescer = RequestCoalescer::with_config(Arc::clone(&source), options.coalesce);
        let cache = options.tile_cache_capacity.map(TileCache::new);

        Ok(Self {
            source,
            header,
            ifds,
            coalescer,
            cache,
        })
    }

    /// The parsed file header.
    pub fn header(&self) -> &TiffHeader {
        &self.header
    }

    /// All IFDs in the file, in chain order.
    pub fn ifds(&self) -> &[ImageFileDirectory] {
        &self.ifds
    }

    /// A single IFD by chain index.
    pub fn ifd(&self, index: usize) -> Option<&ImageFileDirectory> {
        self.ifds.get(index)
    }

    /// Identifier of the underlying resource.
    pub fn identifier(&self) -> &str {
        self.source.identifier()
    }

    fn require_ifd(&self, index: usize) -> Result<&ImageFileDirectory, TileError> {
        self.ifds.get(index).ok_or(TileError::IfdOutOfBounds {
            index,
            count: self.ifds.len(),
        })
    }

    // -------------------------------------------------------------------------
    // Fetching
    // -------------------------------------------------------------------------

    /// Fetch the compressed payload of one tile.
    pub async fn fetch_tile(
        &self,
        ifd_index: usize,
        index: TileIndex,
    ) -> Result<CompressedTile, TileError> {
        let ifd = self.require_ifd(ifd_index)?;
        let range = locate(ifd, index)?;
        let bytes = self.coalescer.fetch(range).await?;
        Ok(CompressedTile {
            index,
            range,
            bytes,
        })
    }

    /// Fetch a batch of tiles through the request coalescer.
    ///
    /// Nearby payloads are merged into fewer underlying reads and concurrent
    /// requests for the same tile are deduplicated. The result vector is
    /// aligned with `indices`; each element fails independently (an
    /// out-of-grid index or a failed fetch poisons only its own entry).
    pub async fn fetch_tiles(
        &self,
        ifd_index: usize,
        indices: &[TileIndex],
    ) -> Result<Vec<Result<CompressedTile, TileError>>, TileError> {
        let ifd = self.require_ifd(ifd_index)?;

        let located: Vec<Result<crate::io::ByteRange, TileError>> =
            indices.iter().map(|&index| locate(ifd, index)).collect();
        let ranges: Vec<crate::io::ByteRange> = located
            .iter()
            .filter_map(|result| result.as_ref().ok().copied())
            .collect();

        let fetched = self.coalescer.submit(&ranges).await;
        let mut fetched = fetched.into_iter();

        let mut results = Vec::with_capacity(indices.len());
        for (&index, location) in indices.iter().zip(located) {
            match location {
                Ok(range) => {
                    let bytes = fetched
                        .next()
                        .expect("one coalescer result per located range");
                    results.push(
                        bytes
                            .map(|bytes| CompressedTile {
                                index,
                                range,
                                bytes,
                            })
                            .map_err(TileError::from),
                    );
                }
                Err(e) => results.push(Err(e)),
            }
        }
        Ok(results)
    }

    // -------------------------------------------------------------------------
    // Decoding
    // -------------------------------------------------------------------------

    /// Fetch and decode one tile to a raw raster buffer.
    ///
    /// The compressed payload is fetched through the coalescer, then the
    /// registered decoder and predictor reversal run on `executor`. Fails
    /// with [`TileError::UnsupportedCompression`] if `registry` has no
    /// decoder for the IFD's compression method; registering one and
    /// retrying recovers.
    pub async fn decode_tile<E>(
        &self,
        ifd_index: usize,
        index: TileIndex,
        registry: &DecoderRegistry,
        executor: &E,
    ) -> Result<Bytes, TileError>
    where
        E: DecodeExecutor + ?Sized,
    {
        let ifd = self.require_ifd(ifd_index)?;

        let cache_key = TileCacheKey::new(ifd_index, index);
        if let Some(cache) = &self.cache {
            if let Some(hit) = cache.get(&cache_key).await {
                return Ok(hit);
            }
        }

        let decoder = registry
            .get(ifd.compression())
            .ok_or(TileError::UnsupportedCompression(ifd.compression()))?;
        let predictor = ifd.predictor();
        let layout = TileLayout::for_chunk(ifd, self.header.byte_order, index);

        let tile = self.fetch_tile(ifd_index, index).await?;
        let decoded = run_decode(executor, decoder, tile.bytes, predictor, layout).await?;

        if let Some(cache) = &self.cache {
            cache.put(cache_key, decoded.clone()).await;
        }
        Ok(decoded)
    }

    /// Fetch and decode a batch of tiles.
    ///
    /// Fetches go through the coalescer as one submission; decodes run
    /// concurrently on `executor`. The result vector is aligned with
    /// `indices` and each tile fails independently.
    pub async fn decode_tiles<E>(
        &self,
        ifd_index: usize,
        indices: &[TileIndex],
        registry: &DecoderRegistry,
        executor: &E,
    ) -> Result<Vec<Result<Bytes, TileError>>, TileError>
    where
        E: DecodeExecutor + ?Sized,
    {
        let ifd = self.require_ifd(ifd_index)?;
        let compression = ifd.compression();
        let predictor = ifd.predictor();
        let byte_order = self.header.byte_order;

        // Serve cache hits first; only the misses go through the coalescer.
        let mut cached: Vec<Option<Bytes>> = Vec::with_capacity(indices.len());
        if let Some(cache) = &self.cache {
            for &index in indices {
                cached.push(cache.get(&TileCacheKey::new(ifd_index, index)).await);
            }
        } else {
            cached.resize(indices.len(), None);
        }

        let misses: Vec<TileIndex> = indices
            .iter()
            .zip(&cached)
            .filter(|(_, hit)| hit.is_none())
            .map(|(&index, _)| index)
            .collect();
        let fetched = self.fetch_tiles(ifd_index, &misses).await?;
        let mut fetched = fetched.into_iter();

        enum Source {
            Cached(Bytes),
            Fetched(Result<CompressedTile, TileError>),
        }

        let sources: Vec<Source> = cached
            .into_iter()
            .map(|hit| match hit {
                Some(bytes) => Source::Cached(bytes),
                None => Source::Fetched(
                    fetched.next().expect("one fetch result per cache miss"),
                ),
            })
            .collect();

        let decoder = registry.get(compression);

        let jobs = sources.into_iter().map(|source| {
            let decoder = decoder.clone();
            async move {
                match source {
                    Source::Cached(bytes) => Ok(bytes),
                    Source::Fetched(Err(e)) => Err(e),
                    Source::Fetched(Ok(tile)) => {
                        let decoder =
                            decoder.ok_or(TileError::UnsupportedCompression(compression))?;
                        let layout = TileLayout::for_chunk(ifd, byte_order, tile.index);
                        let decoded =
                            run_decode(executor, decoder, tile.bytes, predictor, layout).await?;
                        if let Some(cache) = &self.cache {
                            cache
                                .put(TileCacheKey::new(ifd_index, tile.index), decoded.clone())
                                .await;
                        }
                        Ok(decoded)
                    }
                }
            }
        });

        Ok(join_all(jobs).await)
    }
}

/// Dispatch one decode (decompression + predictor reversal) onto the
/// executor.
async fn run_decode<E>(
    executor: &E,
    decoder: Arc<dyn Decoder>,
    compressed: Bytes,
    predictor: crate::format::tiff::Predictor,
    layout: TileLayout,
) -> Result<Bytes, TileError>
where
    E: DecodeExecutor + ?Sized,
{
    executor
        .run(Box::new(move || {
            let decoded = decoder.decode(compressed, layout.decoded_len())?;
            reverse_predictor(decoded, predictor, &layout)
        }))
        .await
}
