/// Top-K selection over a suspending comparator.
///
/// The first K items are merge-sorted to seed an ordered "heap". Each later
/// item challenges the current worst (last) entry: losing costs one
/// comparison, winning evicts the worst and binary-inserts the challenger
/// into the remaining K-1 entries.
use std::cmp::Ordering;
use std::num::NonZeroUsize;
use std::task::Poll;

use serde::{Deserialize, Serialize};

use crate::comparator::{Comparator, Immediate, Step, expect_done};
use crate::insert::BinaryInsertion;
use crate::merge_sort::MergeSort;
use crate::types::ComparisonPair;

/// Result of one challenge against a bounded ordered list.
#[derive(Debug, Clone, PartialEq)]
pub struct ChallengeResult<T> {
    /// Ordered list, still at most K long.
    pub heap: Vec<T>,
    /// The item that did not make the list: the challenger itself, or the
    /// previous worst entry it displaced. `None` while the list was short.
    pub rejected: Option<T>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum ChallengePhase<T> {
    AgainstWorst,
    Inserting(BinaryInsertion<T>),
}

/// One challenger trying to enter an ordered list bounded at `k`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Challenge<T> {
    challenger: T,
    heap: Vec<T>,
    evicted: Option<T>,
    phase: ChallengePhase<T>,
}

impl<T: Clone + PartialEq + std::fmt::Debug> Challenge<T> {
    /// With no bound, or while `heap` is shorter than the bound, the
    /// challenger goes straight to binary insertion.
    pub fn new(challenger: T, heap: Vec<T>, k: Option<NonZeroUsize>) -> Self {
        let full = k.is_some_and(|k| heap.len() >= k.get());
        if full {
            Challenge {
                challenger,
                heap,
                evicted: None,
                phase: ChallengePhase::AgainstWorst,
            }
        } else {
            let insertion = BinaryInsertion::new(challenger.clone(), heap);
            Challenge {
                challenger,
                heap: Vec::new(),
                evicted: None,
                phase: ChallengePhase::Inserting(insertion),
            }
        }
    }

    pub fn challenger(&self) -> &T {
        &self.challenger
    }

    pub fn resume<C>(&mut self, cmp: &mut C) -> Step<T, ChallengeResult<T>>
    where
        C: Comparator<T> + ?Sized,
    {
        if let ChallengePhase::AgainstWorst = self.phase {
            let Some(worst) = self.heap.last() else {
                // A bound of K >= 1 with an empty list cannot be full.
                let heap = vec![self.challenger.clone()];
                return Step::Done(ChallengeResult { heap, rejected: None });
            };

            match cmp.compare(&self.challenger, worst) {
                Poll::Pending => {
                    return Step::Pending(ComparisonPair::new(
                        self.challenger.clone(),
                        worst.clone(),
                    ));
                }
                Poll::Ready(Ordering::Less) => {
                    let mut heap = std::mem::take(&mut self.heap);
                    self.evicted = heap.pop();
                    self.phase =
                        ChallengePhase::Inserting(BinaryInsertion::new(self.challenger.clone(), heap));
                }
                Poll::Ready(_) => {
                    let heap = std::mem::take(&mut self.heap);
                    return Step::Done(ChallengeResult {
                        heap,
                        rejected: Some(self.challenger.clone()),
                    });
                }
            }
        }

        match &mut self.phase {
            ChallengePhase::Inserting(insertion) => match insertion.resume(cmp) {
                Step::Pending(pair) => Step::Pending(pair),
                Step::Done((heap, _)) => Step::Done(ChallengeResult {
                    heap,
                    rejected: self.evicted.take(),
                }),
            },
            ChallengePhase::AgainstWorst => unreachable!("phase advanced above"),
        }
    }

    /// Phase data agrees with itself and any search bounds are in range.
    pub fn is_consistent(&self) -> bool {
        match &self.phase {
            ChallengePhase::AgainstWorst => self.evicted.is_none(),
            ChallengePhase::Inserting(insertion) => {
                self.heap.is_empty()
                    && insertion.item() == &self.challenger
                    && insertion.is_consistent()
            }
        }
    }

    pub fn members(&self) -> Vec<&T> {
        let mut out = vec![&self.challenger];
        out.extend(&self.heap);
        out.extend(&self.evicted);
        if let ChallengePhase::Inserting(insertion) = &self.phase {
            out.extend(insertion.list());
        }
        out
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum SelectionPhase<T> {
    Seeding(MergeSort<T>),
    Challenging {
        heap: Vec<T>,
        /// Index into `items` of the next challenger.
        cursor: usize,
        challenge: Option<Challenge<T>>,
    },
}

/// Resumable top-K selection; with no bound (or K >= n) it is a full sort.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopKSelection<T> {
    items: Vec<T>,
    k: Option<NonZeroUsize>,
    phase: SelectionPhase<T>,
}

impl<T: Clone + PartialEq + std::fmt::Debug> TopKSelection<T> {
    pub fn new(items: Vec<T>, k: Option<NonZeroUsize>) -> Self {
        let seed = match k {
            Some(k) if k.get() < items.len() => items[..k.get()].to_vec(),
            _ => items.clone(),
        };
        TopKSelection {
            items,
            k,
            phase: SelectionPhase::Seeding(MergeSort::new(seed)),
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn k(&self) -> Option<NonZeroUsize> {
        self.k
    }

    fn seed_len(&self) -> usize {
        match self.k {
            Some(k) => k.get().min(self.items.len()),
            None => self.items.len(),
        }
    }

    /// Items currently held by the sorting state: the seed sort's contents,
    /// or the heap plus any active challenge. Items that are not held have
    /// either not been reached yet or were rejected.
    pub fn members(&self) -> Vec<&T> {
        match &self.phase {
            SelectionPhase::Seeding(sort) => sort.members(),
            SelectionPhase::Challenging { heap, challenge, .. } => {
                let mut out: Vec<&T> = heap.iter().collect();
                if let Some(active) = challenge {
                    out.extend(active.members());
                }
                out
            }
        }
    }

    /// Whether the suspended state could have come from running this
    /// selection: cursors in range, and every held item taken exactly once
    /// from the part of `items` already reached.
    pub fn is_consistent(&self) -> bool {
        let reached = match &self.phase {
            SelectionPhase::Seeding(sort) => {
                if !sort.is_consistent() {
                    return false;
                }
                self.seed_len()
            }
            SelectionPhase::Challenging { heap, cursor, challenge } => match challenge {
                Some(active) => {
                    if *cursor >= self.items.len()
                        || active.challenger() != &self.items[*cursor]
                        || !active.is_consistent()
                    {
                        return false;
                    }
                    *cursor + 1
                }
                None => {
                    if *cursor > self.items.len() || self.k.is_some_and(|k| heap.len() > k.get()) {
                        return false;
                    }
                    *cursor
                }
            },
        };

        let reached = &self.items[..reached];
        let members = self.members();
        let distinct = members.iter().enumerate().all(|(i, item)| !members[..i].contains(item));
        let known = members.iter().all(|item| reached.contains(*item));
        let complete = match self.phase {
            SelectionPhase::Seeding(_) => members.len() == reached.len(),
            SelectionPhase::Challenging { .. } => true,
        };
        distinct && known && complete
    }

    /// Yields the ordered top-K and the residual (encounter order).
    pub fn resume<C>(&mut self, cmp: &mut C) -> Step<T, (Vec<T>, Vec<T>)>
    where
        C: Comparator<T> + ?Sized,
    {
        loop {
            match &mut self.phase {
                SelectionPhase::Seeding(sort) => match sort.resume(cmp) {
                    Step::Pending(pair) => return Step::Pending(pair),
                    Step::Done(heap) => {
                        let cursor = heap.len();
                        self.phase = SelectionPhase::Challenging {
                            heap,
                            cursor,
                            challenge: None,
                        };
                    }
                },
                SelectionPhase::Challenging { heap, cursor, challenge } => {
                    if let Some(active) = challenge {
                        match active.resume(cmp) {
                            Step::Pending(pair) => return Step::Pending(pair),
                            Step::Done(result) => {
                                *heap = result.heap;
                                *cursor += 1;
                                *challenge = None;
                            }
                        }
                    } else if *cursor < self.items.len() {
                        let challenger = self.items[*cursor].clone();
                        *challenge = Some(Challenge::new(challenger, std::mem::take(heap), self.k));
                    } else {
                        let top = std::mem::take(heap);
                        let residual = self
                            .items
                            .iter()
                            .filter(|item| !top.contains(item))
                            .cloned()
                            .collect();
                        return Step::Done((top, residual));
                    }
                }
            }
        }
    }
}

/// Select the `k` first items under an instant comparator.
/// A `k` of zero means no limit.
pub fn select_top_k<T, F>(items: Vec<T>, k: usize, compare: F) -> (Vec<T>, Vec<T>)
where
    T: Clone + PartialEq + std::fmt::Debug,
    F: FnMut(&T, &T) -> Ordering,
{
    let mut selection = TopKSelection::new(items, NonZeroUsize::new(k));
    expect_done(selection.resume(&mut Immediate(compare)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Ledger;
    use crate::types::Outcome;
    use proptest::prelude::*;
    use rand::seq::SliceRandom;
    use std::collections::HashSet;

    fn nz(k: usize) -> Option<NonZeroUsize> {
        NonZeroUsize::new(k)
    }

    #[test]
    fn test_small_input_is_full_sort() {
        let (top, residual) = select_top_k(vec![3, 1, 2], 5, |a, b| a.cmp(b));
        assert_eq!(top, vec![1, 2, 3]);
        assert!(residual.is_empty());
    }

    #[test]
    fn test_ten_items_top_five() {
        let mut items: Vec<u32> = (1..=10).collect();
        items.shuffle(&mut rand::rng());

        let (top, residual) = select_top_k(items, 5, |a, b| a.cmp(b));
        assert_eq!(top, vec![1, 2, 3, 4, 5]);

        let residual: HashSet<u32> = residual.into_iter().collect();
        assert_eq!(residual, (6..=10).collect());
    }

    #[test]
    fn test_zero_k_means_no_limit() {
        let (top, residual) = select_top_k(vec![2, 3, 1], 0, |a, b| a.cmp(b));
        assert_eq!(top, vec![1, 2, 3]);
        assert!(residual.is_empty());
    }

    #[test]
    fn test_losing_challenger_costs_one_comparison() {
        // Seed [1, 2] then 9, 8, 7 all lose against the worst entry.
        let mut calls = 0;
        let (top, residual) = select_top_k(vec![2, 1, 9, 8, 7], 2, |a, b| {
            calls += 1;
            a.cmp(b)
        });
        assert_eq!(top, vec![1, 2]);
        assert_eq!(residual, vec![9, 8, 7]);
        assert_eq!(calls, 1 + 3);
    }

    #[test]
    fn test_challenge_evicts_worst() {
        let mut challenge = Challenge::new(0, vec![1, 2, 3], nz(3));
        let result = expect_done(challenge.resume(&mut Immediate(|a: &i32, b: &i32| a.cmp(b))));
        assert_eq!(result.heap, vec![0, 1, 2]);
        assert_eq!(result.rejected, Some(3));
    }

    #[test]
    fn test_challenge_short_list_inserts() {
        let mut challenge = Challenge::new(5, vec![1, 9], nz(3));
        let result = expect_done(challenge.resume(&mut Immediate(|a: &i32, b: &i32| a.cmp(b))));
        assert_eq!(result.heap, vec![1, 5, 9]);
        assert_eq!(result.rejected, None);
    }

    #[test]
    fn test_resumable_with_reload_between_answers() {
        let items: Vec<String> = ["h", "c", "f", "a", "g", "b", "e", "d"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut machine = TopKSelection::new(items, nz(3));
        let mut ledger = Ledger::new();
        let mut asked = HashSet::new();

        let (top, residual) = loop {
            match machine.resume(&mut ledger) {
                Step::Pending(pair) => {
                    assert!(asked.insert(pair.key()), "asked {pair:?} twice");
                    let json = serde_json::to_string(&machine).unwrap();
                    machine = serde_json::from_str(&json).unwrap();
                    let outcome = Outcome::from_ordering(pair.first.cmp(&pair.second));
                    ledger.record_outcome(pair, outcome).unwrap();
                }
                Step::Done(done) => break done,
            }
        };
        assert_eq!(top, vec!["a", "b", "c"]);
        assert_eq!(residual.len(), 5);
        assert_eq!(asked.len(), ledger.len());
    }

    #[test]
    fn test_consistent_at_every_suspension() {
        let items: Vec<String> = ["h", "c", "f", "a", "g", "b", "e", "d"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let mut machine = TopKSelection::new(items, nz(3));
        let mut ledger = Ledger::new();
        assert!(machine.is_consistent());

        while let Step::Pending(pair) = machine.resume(&mut ledger) {
            assert!(machine.is_consistent(), "inconsistent at {pair:?}");
            let outcome = Outcome::from_ordering(pair.first.cmp(&pair.second));
            ledger.record_outcome(pair, outcome).unwrap();
        }
    }

    #[test]
    fn test_foreign_item_in_seed_sort_is_inconsistent() {
        let items: Vec<String> = ["a", "b", "c"].iter().map(|s| s.to_string()).collect();
        let mut machine = TopKSelection::new(items, None);
        assert!(matches!(machine.resume(&mut Ledger::new()), Step::Pending(_)));

        let json = serde_json::to_string(&machine).unwrap();
        assert!(json.contains(r#""results":[["a"]]"#), "{json}");
        let tampered: TopKSelection<String> =
            serde_json::from_str(&json.replace(r#""results":[["a"]]"#, r#""results":[["zz"]]"#)).unwrap();
        assert!(!tampered.is_consistent());
    }

    #[test]
    fn test_challenge_state_is_checked() {
        // Seed [1, 2], then 0 beats the worst entry and is being inserted.
        let mut machine = TopKSelection::new(vec![2, 1, 0, 5], nz(2));
        let mut ledger = Ledger::new();
        ledger.record_outcome(ComparisonPair::new(1, 2), Outcome::FirstPrecedes).unwrap();
        ledger.record_outcome(ComparisonPair::new(0, 2), Outcome::FirstPrecedes).unwrap();
        assert_eq!(machine.resume(&mut ledger), Step::Pending(ComparisonPair::new(0, 1)));
        assert!(machine.is_consistent());

        let json = serde_json::to_value(&machine).unwrap();

        let mut bad_cursor = json.clone();
        bad_cursor["phase"]["challenging"]["cursor"] = 3.into();
        let tampered: TopKSelection<i32> = serde_json::from_value(bad_cursor).unwrap();
        assert!(!tampered.is_consistent());

        let mut bad_bound = json;
        bad_bound["phase"]["challenging"]["challenge"]["phase"]["inserting"]["hi"] = 9.into();
        let tampered: TopKSelection<i32> = serde_json::from_value(bad_bound).unwrap();
        assert!(!tampered.is_consistent());
    }

    proptest! {
        #[test]
        fn prop_top_k_matches_sorted_prefix(
            items in prop::collection::hash_set(any::<i32>(), 0..80),
            k in 1usize..10,
        ) {
            let items: Vec<i32> = items.into_iter().collect();
            let mut sorted = items.clone();
            sorted.sort();

            let (top, residual) = select_top_k(items.clone(), k, |a, b| a.cmp(b));
            let take = k.min(sorted.len());
            prop_assert_eq!(&top, &sorted[..take].to_vec());

            let mut residual_sorted = residual;
            residual_sorted.sort();
            prop_assert_eq!(residual_sorted, sorted[take..].to_vec());
        }

        #[test]
        fn prop_top_k_strings(items in prop::collection::btree_set("[a-z]{1,5}", 0..40)) {
            let items: Vec<String> = items.into_iter().rev().collect();
            let mut sorted = items.clone();
            sorted.sort();

            let (top, _) = select_top_k(items, 3, |a, b| a.cmp(b));
            prop_assert_eq!(top, sorted.into_iter().take(3).collect::<Vec<_>>());
        }
    }
}
