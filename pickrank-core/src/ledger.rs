/// Comparison ledger: every answered pair, keyed order-independently.
///
/// The ledger sits in front of the user. Any comparison it already holds is
/// answered from the cache, so a pair is never asked twice in a run.
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::task::Poll;

use serde::{Deserialize, Serialize};

use crate::comparator::Comparator;
use crate::error::{RankError, Result};
use crate::types::{ComparisonPair, ComparisonRecord, Outcome, RankItem};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(
    from = "Vec<ComparisonRecord<T>>",
    into = "Vec<ComparisonRecord<T>>",
    bound(serialize = "T: RankItem", deserialize = "T: RankItem")
)]
pub struct Ledger<T: RankItem> {
    /// Records in the order they were answered.
    records: Vec<ComparisonRecord<T>>,
    /// Canonical pair -> index into `records`.
    index: BTreeMap<(T, T), usize>,
}

impl<T: RankItem> Default for Ledger<T> {
    fn default() -> Self {
        Ledger {
            records: Vec::new(),
            index: BTreeMap::new(),
        }
    }
}

impl<T: RankItem> Ledger<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an answer. Re-recording the same answer is a no-op; recording
    /// the opposite answer for a known pair is a `DuplicatePair` defect.
    pub fn record_outcome(&mut self, pair: ComparisonPair<T>, outcome: Outcome) -> Result<()> {
        let key = pair.key();
        if let Some(&idx) = self.index.get(&key) {
            let existing = &self.records[idx];
            return match existing.outcome_between(&pair.first, &pair.second) {
                Some(previous) if previous == outcome => Ok(()),
                _ => Err(RankError::DuplicatePair {
                    first: format!("{:?}", pair.first),
                    second: format!("{:?}", pair.second),
                }),
            };
        }

        tracing::debug!(first = ?pair.first, second = ?pair.second, ?outcome, "recorded comparison");
        self.index.insert(key, self.records.len());
        self.records.push(ComparisonRecord { pair, outcome });
        Ok(())
    }

    /// Outcome for `(a, b)` in that orientation, if it was answered.
    pub fn lookup(&self, a: &T, b: &T) -> Option<Outcome> {
        let key = if a <= b {
            (a.clone(), b.clone())
        } else {
            (b.clone(), a.clone())
        };
        let idx = *self.index.get(&key)?;
        self.records[idx].outcome_between(a, b)
    }

    pub fn has_been_asked(&self, pair: &ComparisonPair<T>) -> bool {
        self.index.contains_key(&pair.key())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[ComparisonRecord<T>] {
        &self.records
    }

    pub fn clear(&mut self) {
        self.records.clear();
        self.index.clear();
    }
}

impl<T: RankItem> Comparator<T> for Ledger<T> {
    fn compare(&mut self, a: &T, b: &T) -> Poll<Ordering> {
        match self.lookup(a, b) {
            Some(outcome) => Poll::Ready(outcome.as_ordering()),
            None => Poll::Pending,
        }
    }
}

impl<T: RankItem> From<Vec<ComparisonRecord<T>>> for Ledger<T> {
    /// Rebuilds the index. Later records for an already-seen pair are
    /// dropped so the no-duplicate invariant holds after any reload.
    fn from(records: Vec<ComparisonRecord<T>>) -> Self {
        let mut ledger = Ledger::default();
        for record in records {
            if record.pair.first == record.pair.second {
                tracing::warn!(item = ?record.pair.first, "dropping self-comparison from ledger");
                continue;
            }
            let key = record.pair.key();
            if ledger.index.contains_key(&key) {
                tracing::warn!(first = ?record.pair.first, second = ?record.pair.second, "dropping repeated ledger record");
                continue;
            }
            ledger.index.insert(key, ledger.records.len());
            ledger.records.push(record);
        }
        ledger
    }
}

impl<T: RankItem> From<Ledger<T>> for Vec<ComparisonRecord<T>> {
    fn from(ledger: Ledger<T>) -> Self {
        ledger.records
    }
}
