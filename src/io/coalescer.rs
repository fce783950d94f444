//! Byte-range request coalescing.
//!
//! Fetching tiles one range at a time is round-trip bound: a viewport render
//! can need dozens of tiles whose payloads sit within a few kilobytes of each
//! other in the file. The coalescer accepts a batch of ranges, merges ranges
//! that are adjacent or nearly adjacent into fewer underlying fetches, and
//! slices the merged buffers back out per request.
//!
//! It also deduplicates: if two callers ask for the same range while a fetch
//! for it is in flight, only one underlying fetch is issued and both callers
//! observe the same result (or the same failure). Fetches run on spawned
//! tasks, so a caller dropping its await does not cancel a fetch other
//! callers are waiting on.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use bytes::Bytes;
use tokio::sync::watch;
use tracing::debug;

use super::{ByteRange, RangeReader};
use crate::error::IoError;

// =============================================================================
// Constants
// =============================================================================

/// Default maximum gap between two ranges that still get merged into one
/// fetch. Transferring a few wasted KiB is cheaper than a second round trip
/// on any remote store.
pub const DEFAULT_MERGE_GAP: u64 = 8 * 1024;

/// Default upper bound on the size of a merged fetch. Bounds memory held per
/// group and keeps the blast radius of a failed fetch small.
pub const DEFAULT_MAX_FETCH_SIZE: u64 = 8 * 1024 * 1024;

// =============================================================================
// CoalesceConfig
// =============================================================================

/// Policy parameters for request merging.
///
/// Both values are workload-dependent (latency vs. wasted transfer), so they
/// are configuration rather than constants.
#[derive(Debug, Clone, Copy)]
pub struct CoalesceConfig {
    /// Merge two ranges into one fetch if the gap between them is at most
    /// this many bytes.
    pub merge_gap: u64,

    /// Never grow a merged fetch beyond this many bytes. A single range
    /// larger than this still gets its own fetch.
    pub max_fetch_size: u64,
}

impl Default for CoalesceConfig {
    fn default() -> Self {
        Self {
            merge_gap: DEFAULT_MERGE_GAP,
            max_fetch_size: DEFAULT_MAX_FETCH_SIZE,
        }
    }
}

// =============================================================================
// RequestCoalescer
// =============================================================================

type FetchResult = Result<Bytes, IoError>;
type ResultCell = watch::Receiver<Option<FetchResult>>;
type ResultSlot = watch::Sender<Option<FetchResult>>;

/// Merges and deduplicates concurrent byte-range requests against a single
/// [`RangeReader`].
///
/// The in-flight table is the only mutated shared structure: it maps each
/// requested range to a watch cell that resolves to the fetched bytes. The
/// lock is never held across an await.
pub struct RequestCoalescer<R> {
    source: Arc<R>,
    config: CoalesceConfig,
    in_flight: Arc<Mutex<HashMap<ByteRange, ResultCell>>>,
}

impl<R: RangeReader + 'static> RequestCoalescer<R> {
    /// Create a coalescer over the given source with default policy.
    pub fn new(source: Arc<R>) -> Self {
        Self::with_config(source, CoalesceConfig::default())
    }

    /// Create a coalescer with custom merge policy.
    pub fn with_config(source: Arc<R>, config: CoalesceConfig) -> Self {
        Self {
            source,
            config,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// The merge policy in effect.
    pub fn config(&self) -> CoalesceConfig {
        self.config
    }

    /// Fetch a single range through the coalescer.
    ///
    /// Equivalent to `submit(&[range])`; concurrent callers asking for the
    /// same range share one underlying fetch.
    pub async fn fetch(&self, range: ByteRange) -> FetchResult {
        self.submit(std::slice::from_ref(&range))
            .await
            .pop()
            .expect("submit returns one result per requested range")
    }

    /// Fetch a batch of ranges, merging nearby ones into fewer underlying
    /// reads.
    ///
    /// The returned vector is aligned with `ranges`: result `i` corresponds
    /// to `ranges[i]`. If the underlying fetch for a merged group fails,
    /// every range in that group resolves to the same error; ranges in other
    /// groups are unaffected. Zero-length ranges resolve to empty buffers
    /// without touching the source.
    pub async fn submit(&self, ranges: &[ByteRange]) -> Vec<FetchResult> {
        enum Pending {
            Empty,
            Wait(ResultCell),
        }

        let mut pending: Vec<Pending> = Vec::with_capacity(ranges.len());
        let mut leaders: Vec<(ByteRange, ResultSlot)> = Vec::new();

        // Registration pass. Ranges already in flight (from other callers or
        // earlier in this very batch) become waiters; the rest become
        // leaders that this call must fetch.
        {
            let mut in_flight = self.in_flight.lock().expect("in-flight table poisoned");
            for &range in ranges {
                if range.is_empty() {
                    pending.push(Pending::Empty);
                    continue;
                }
                if let Some(cell) = in_flight.get(&range) {
                    pending.push(Pending::Wait(cell.clone()));
                } else {
                    let (slot, cell) = watch::channel(None);
                    in_flight.insert(range, cell.clone());
                    pending.push(Pending::Wait(cell));
                    leaders.push((range, slot));
                }
            }
        }

        if !leaders.is_empty() {
            leaders.sort_by_key(|(range, _)| (range.offset, range.length));
            let groups = plan_groups(leaders, &self.config);
            debug!(
                resource = self.source.identifier(),
                fetches = groups.len(),
                "dispatching coalesced fetches"
            );
            for group in groups {
                self.spawn_group_fetch(group);
            }
        }

        let mut results = Vec::with_capacity(pending.len());
        for entry in pending {
            let result = match entry {
                Pending::Empty => Ok(Bytes::new()),
                Pending::Wait(mut cell) => match cell.wait_for(Option::is_some).await {
                    Ok(value) => (*value).clone().expect("wait_for only returns Some"),
                    // The fetch task can only disappear without publishing a
                    // result if the runtime is shutting down.
                    Err(_) => Err(IoError::Connection(
                        "coalesced fetch task dropped before completion".to_string(),
                    )),
                },
            };
            results.push(result);
        }
        results
    }

    /// Issue one underlying fetch covering the whole group, then slice the
    /// buffer back to each member range and resolve its waiters.
    fn spawn_group_fetch(&self, group: Vec<(ByteRange, ResultSlot)>) {
        let start = group[0].0.offset;
        let end = group
            .iter()
            .map(|(range, _)| range.end())
            .max()
            .unwrap_or(start);
        let merged = ByteRange::new(start, end - start);

        let source = Arc::clone(&self.source);
        let in_flight = Arc::clone(&self.in_flight);

        tokio::spawn(async move {
            let result = source
                .read_exact_at(merged.offset, merged.length as usize)
                .await;

            let mut table = in_flight.lock().expect("in-flight table poisoned");
            for (range, slot) in group {
                let sliced = match &result {
                    Ok(bytes) => {
                        let from = (range.offset - merged.offset) as usize;
                        Ok(bytes.slice(from..from + range.length as usize))
                    }
                    Err(e) => Err(e.clone()),
                };
                // Waiters may have gone away; the send result is irrelevant.
                let _ = slot.send(Some(sliced));
                table.remove(&range);
            }
        });
    }
}

/// Partition offset-sorted ranges into fetch groups.
///
/// A range joins the current group when it starts within `merge_gap` bytes of
/// the group's end and the grown span stays within `max_fetch_size`.
fn plan_groups(
    sorted: Vec<(ByteRange, ResultSlot)>,
    config: &CoalesceConfig,
) -> Vec<Vec<(ByteRange, ResultSlot)>> {
    let mut groups: Vec<Vec<(ByteRange, ResultSlot)>> = Vec::new();
    let mut current: Vec<(ByteRange, ResultSlot)> = Vec::new();
    let mut span_start = 0u64;
    let mut span_end = 0u64;

    for (range, slot) in sorted {
        if current.is_empty() {
            span_start = range.offset;
            span_end = range.end();
            current.push((range, slot));
            continue;
        }

        let within_gap = range.offset <= span_end.saturating_add(config.merge_gap);
        let grown_end = span_end.max(range.end());
        let within_size = grown_end - span_start <= config.max_fetch_size;

        if within_gap && within_size {
            span_end = grown_end;
            current.push((range, slot));
        } else {
            groups.push(std::mem::take(&mut current));
            span_start = range.offset;
            span_end = range.end();
            current.push((range, slot));
        }
    }

    if !current.is_empty() {
        groups.push(current);
    }
    groups
}

// =============================================================================
// Tests
// =============================================================================
