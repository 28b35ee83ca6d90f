//! pickrank-core: rank a list by asking a human one pairwise question at a time.
//!
//! The sorting and selection algorithms run as explicit state machines over a
//! comparator that may suspend. Suspended state is plain serializable data,
//! so a run survives a restart and resumes at the exact question it was
//! waiting on. Every answer lands in a ledger, and a pair that has been
//! answered once is never asked again.
//!
//! No terminal, no filesystem: persistence goes through `KeyValueStore`.
//!
//! # Quick start
//!
//! ```rust
//! use pickrank_core::{MemoryStore, RankingSession, RankingState};
//!
//! let mut session: RankingSession<String, _> =
//!     RankingSession::open(MemoryStore::new(), "movies").unwrap();
//! for title in ["Heat", "Alien", "Up"] {
//!     session.add_item(title.to_string()).unwrap();
//! }
//! session.start_ranking(None).unwrap();
//!
//! while let Some(pair) = session.current_pending_comparison().cloned() {
//!     // Ask the user; here the alphabetically earlier title wins.
//!     let choice = pair.first.clone().min(pair.second.clone());
//!     session.choose(&choice).unwrap();
//! }
//!
//! assert_eq!(session.state(), RankingState::Sorted);
//! assert_eq!(session.current_result().sorted, ["Alien", "Heat", "Up"]);
//! ```

pub mod comparator;
pub mod constants;
pub mod error;
pub mod estimate;
pub mod insert;
pub mod ledger;
pub mod merge_sort;
pub mod session;
pub mod store;
pub mod top_k;
pub mod types;

// Re-export primary public API at crate root.
pub use comparator::{Comparator, Immediate, Step};
pub use error::{RankError, Result, StoreError};
pub use estimate::{Estimate, estimate, estimate_merge_sort};
pub use insert::{BinaryInsertion, binary_insert};
pub use ledger::Ledger;
pub use merge_sort::{MergeSort, merge_sort};
pub use session::{RankingResult, RankingSession, RankingState, Status, parse_top_k, top_k_bound};
pub use store::{KeyValueStore, MemoryStore, Namespaced};
pub use top_k::{Challenge, ChallengeResult, TopKSelection, select_top_k};
pub use types::{ComparisonPair, ComparisonRecord, Outcome, RankItem};
