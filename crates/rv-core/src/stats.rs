//! Monotonic cache-access counters and their text pretty-printers.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::FormatError;

/// Atomic hit/miss/eviction/access counters for one
/// [`crate::cache::SetAssociativeCache`]. Relaxed ordering throughout —
/// these are observational and are never consulted to make a control-flow
/// decision mid-step.
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Number of accesses that hit a resident line.
    pub n_hits: AtomicU64,
    /// Number of accesses that missed.
    pub n_misses: AtomicU64,
    /// Number of valid lines evicted to make room for a miss.
    pub n_evictions: AtomicU64,
    /// Total accesses from the CPU side (hits + misses).
    pub n_cpu_accesses: AtomicU64,
}

impl CacheStats {
    /// Creates a zeroed counter set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn load(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }

    /// `n_hits / n_cpu_accesses`, or `0.0` if there have been no accesses.
    #[must_use]
    pub fn hit_rate(&self) -> f64 {
        let accesses = Self::load(&self.n_cpu_accesses);
        if accesses == 0 {
            0.0
        } else {
            Self::load(&self.n_hits) as f64 / accesses as f64
        }
    }

    /// `1.0 - hit_rate()`.
    #[must_use]
    pub fn miss_rate(&self) -> f64 {
        1.0 - self.hit_rate()
    }
}

/// Selects one of the two pretty-printed statistics layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatsFormat {
    /// `Hits <h>, Misses <m>  HR <r>%  MR <r>%` on one line.
    Single,
    /// A 6-line block: CPU accesses, hits, misses, evictions, hit rate,
    /// miss rate.
    Full,
}

impl std::str::FromStr for StatsFormat {
    type Err = FormatError;

    fn from_str(spec: &str) -> Result<Self, Self::Err> {
        match spec {
            "" => Ok(StatsFormat::Single),
            "full" => Ok(StatsFormat::Full),
            other => Err(FormatError(other.to_string())),
        }
    }
}

/// Renders `stats` per `spec` (`""` for single-line, `"full"` for the
/// multi-line block). Any other specifier is a [`FormatError`].
pub fn format_stats(stats: &CacheStats, spec: &str) -> Result<String, FormatError> {
    let hits = CacheStats::load(&stats.n_hits);
    let misses = CacheStats::load(&stats.n_misses);
    let evictions = CacheStats::load(&stats.n_evictions);
    let accesses = CacheStats::load(&stats.n_cpu_accesses);
    let hr = stats.hit_rate() * 100.0;
    let mr = stats.miss_rate() * 100.0;

    match spec.parse::<StatsFormat>()? {
        StatsFormat::Single => Ok(format!(
            "Hits {hits}, Misses {misses}  HR {hr:.2}%  MR {mr:.2}%"
        )),
        StatsFormat::Full => Ok(format!(
            "Cache statistics\n    \
             CPU accesses : {accesses}\n    \
             Hits         : {hits}\n    \
             Misses       : {misses}\n    \
             Evictions    : {evictions}\n    \
             Hit rate     : {hr:.2} %\n    \
             Miss rate    : {mr:.2} %\n"
        )),
    }
}
