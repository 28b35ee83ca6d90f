/// Comparison-count estimates for progress display.
///
/// These are heuristic bounds only. The ledger size is the one authoritative
/// count once comparisons have been made.
use serde::{Deserialize, Serialize};

/// Predicted total comparisons for a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Estimate {
    pub min: usize,
    pub max: usize,
}

/// Merge-sort bounds for `n` items.
///
/// With `p = ceil(log2 n)`: `max = n*p - 2^p + 1`, `min = ceil(max / 2)`.
pub fn estimate_merge_sort(n: usize) -> Estimate {
    if n <= 1 {
        return Estimate::default();
    }
    let p = ceil_log2(n);
    let max = n * p as usize + 1 - (1usize << p);
    Estimate { min: max.div_ceil(2), max }
}

/// Bounds for selecting the top `k` of `n` items; `k >= n` is a full sort.
pub fn estimate(n: usize, k: usize) -> Estimate {
    if k == 0 || k >= n {
        return estimate_merge_sort(n);
    }

    // Every challenger costs one comparison against the worst entry; about
    // half of them are expected to get in and pay log2(k) more.
    let seed = estimate_merge_sort(k);
    let challengers = (n - k) as f64;
    let max = seed.max as f64 + challengers + (challengers / 2.0) * (k as f64).log2();
    let min = seed.min as f64 + challengers;
    Estimate {
        min: min.ceil() as usize,
        max: max.ceil() as usize,
    }
}

fn ceil_log2(n: usize) -> u32 {
    usize::BITS - (n - 1).leading_zeros()
}
