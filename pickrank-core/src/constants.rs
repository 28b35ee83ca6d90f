/// Namespace used when the caller does not pick one.
pub const DEFAULT_NAMESPACE: &str = "ranking";

/// Deduplicated item set, in entry order.
pub const KEY_ITEMS: &str = "items";
/// Ordered (top-K) output of the last finished run.
pub const KEY_SORTED_ITEMS: &str = "sorted-items";
/// Items left outside the top-K bound.
pub const KEY_REMAINING_ITEMS: &str = "remaining-items";
/// Configured K; absent or `null` means a full ranking.
pub const KEY_TOP_K: &str = "top-k";
/// The comparison ledger.
pub const KEY_COMPARISON_CACHE: &str = "comparison-cache";
pub const KEY_COMPARISONS_COUNT: &str = "comparisons-count";
/// Snapshot for display only; recomputed from n and k on load.
pub const KEY_ESTIMATED_COMPARISONS: &str = "estimated-comparisons";
/// Phase tag plus any in-flight machine and queued insertions.
pub const KEY_STATE: &str = "state";

/// Every key a session writes, for clear-all.
pub const ALL_KEYS: [&str; 8] = [
    KEY_ITEMS,
    KEY_SORTED_ITEMS,
    KEY_REMAINING_ITEMS,
    KEY_TOP_K,
    KEY_COMPARISON_CACHE,
    KEY_COMPARISONS_COUNT,
    KEY_ESTIMATED_COMPARISONS,
    KEY_STATE,
];
