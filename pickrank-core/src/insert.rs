/// Binary insertion of one item into an already-ordered list.
///
/// Bounds are kept half-open as `[lo, hi)`; `mid` is the same midpoint a
/// closed `[left, right]` search would pick, so the questions come out in the
/// textbook order.
use std::cmp::Ordering;
use std::task::Poll;

use serde::{Deserialize, Serialize};

use crate::comparator::{Comparator, Immediate, Step, expect_done};
use crate::types::ComparisonPair;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryInsertion<T> {
    item: T,
    list: Vec<T>,
    lo: usize,
    hi: usize,
}

impl<T: Clone + PartialEq + std::fmt::Debug> BinaryInsertion<T> {
    /// `list` must already be ordered under the comparator that will drive
    /// this insertion.
    pub fn new(item: T, list: Vec<T>) -> Self {
        let hi = list.len();
        BinaryInsertion { item, list, lo: 0, hi }
    }

    pub fn item(&self) -> &T {
        &self.item
    }

    pub fn list(&self) -> &[T] {
        &self.list
    }

    /// Search bounds lie within the list. Only a tampered snapshot breaks this.
    pub fn is_consistent(&self) -> bool {
        self.lo <= self.hi && self.hi <= self.list.len()
    }

    /// Runs until the position is known or a comparison suspends.
    /// Yields the list with the item inserted, and the insertion index.
    pub fn resume<C>(&mut self, cmp: &mut C) -> Step<T, (Vec<T>, usize)>
    where
        C: Comparator<T> + ?Sized,
    {
        while self.lo < self.hi {
            let mid = (self.lo + self.hi - 1) / 2;
            match cmp.compare(&self.item, &self.list[mid]) {
                Poll::Pending => {
                    return Step::Pending(ComparisonPair::new(
                        self.item.clone(),
                        self.list[mid].clone(),
                    ));
                }
                Poll::Ready(Ordering::Less) => self.hi = mid,
                Poll::Ready(_) => self.lo = mid + 1,
            }
        }

        let position = self.lo;
        let mut list = std::mem::take(&mut self.list);
        list.insert(position, self.item.clone());
        Step::Done((list, position))
    }
}

/// Insert `item` into the ordered `list` using an instant comparator.
/// Returns the insertion index.
pub fn binary_insert<T, F>(item: T, list: &mut Vec<T>, compare: F) -> usize
where
    T: Clone + PartialEq + std::fmt::Debug,
    F: FnMut(&T, &T) -> Ordering,
{
    let mut machine = BinaryInsertion::new(item, std::mem::take(list));
    let (inserted, position) = expect_done(machine.resume(&mut Immediate(compare)));
    *list = inserted;
    position
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::Ledger;
    use crate::types::Outcome;
    use proptest::prelude::*;

    #[test]
    fn test_empty_list_needs_no_comparison() {
        let mut list: Vec<i32> = Vec::new();
        let mut calls = 0;
        let pos = binary_insert(5, &mut list, |a, b| {
            calls += 1;
            a.cmp(b)
        });
        assert_eq!(pos, 0);
        assert_eq!(list, vec![5]);
        assert_eq!(calls, 0);
    }

    #[test]
    fn test_insert_first_middle_last() {
        let base = vec!['b', 'c', 'd'];

        let mut list = base.clone();
        assert_eq!(binary_insert('a', &mut list, |a, b| a.cmp(b)), 0);
        assert_eq!(list, vec!['a', 'b', 'c', 'd']);

        let mut list = vec!['a', 'c', 'd'];
        assert_eq!(binary_insert('b', &mut list, |a, b| a.cmp(b)), 1);
        assert_eq!(list, vec!['a', 'b', 'c', 'd']);

        let mut list = base;
        assert_eq!(binary_insert('e', &mut list, |a, b| a.cmp(b)), 3);
        assert_eq!(list, vec!['b', 'c', 'd', 'e']);
    }

    #[test]
    fn test_logarithmic_comparisons() {
        let mut list: Vec<u32> = (0..1024).map(|i| i * 2).collect();
        let mut calls = 0;
        binary_insert(777, &mut list, |a, b| {
            calls += 1;
            a.cmp(b)
        });
        assert!(calls <= 11, "took {calls} comparisons");
    }

    #[test]
    fn test_suspends_and_resumes_at_same_pair() {
        let items: Vec<String> = ["b", "c", "d"].iter().map(|s| s.to_string()).collect();
        let mut machine = BinaryInsertion::new("a".to_string(), items);
        let mut ledger = Ledger::new();

        let first = match machine.resume(&mut ledger) {
            Step::Pending(pair) => pair,
            Step::Done(_) => panic!("expected a pending comparison"),
        };
        assert_eq!(first.first, "a");
        assert_eq!(first.second, "c");

        // Resuming without an answer asks the same thing again.
        assert_eq!(machine.resume(&mut ledger), Step::Pending(first.clone()));

        ledger.record_outcome(first, Outcome::FirstPrecedes).unwrap();
        let second = match machine.resume(&mut ledger) {
            Step::Pending(pair) => pair,
            Step::Done(_) => panic!("expected a second comparison"),
        };
        assert_eq!(second.second, "b");
        ledger.record_outcome(second, Outcome::FirstPrecedes).unwrap();

        match machine.resume(&mut ledger) {
            Step::Done((list, pos)) => {
                assert_eq!(pos, 0);
                assert_eq!(list, vec!["a", "b", "c", "d"]);
            }
            Step::Pending(pair) => panic!("unexpected pending {pair:?}"),
        }
    }

    #[test]
    fn test_out_of_range_bounds_are_inconsistent() {
        let machine = BinaryInsertion::new('e', vec!['a', 'b', 'c']);
        assert!(machine.is_consistent());

        let mut json: serde_json::Value = serde_json::to_value(&machine).unwrap();
        json["hi"] = 9.into();
        let tampered: BinaryInsertion<char> = serde_json::from_value(json.clone()).unwrap();
        assert!(!tampered.is_consistent());

        json["hi"] = 1.into();
        json["lo"] = 2.into();
        let tampered: BinaryInsertion<char> = serde_json::from_value(json).unwrap();
        assert!(!tampered.is_consistent());
    }

    proptest! {
        #[test]
        fn prop_insert_keeps_order(mut items in prop::collection::vec(any::<i32>(), 0..64), new in any::<i32>()) {
            items.sort();
            let mut expected = items.clone();
            expected.push(new);
            expected.sort();

            binary_insert(new, &mut items, |a, b| a.cmp(b));
            prop_assert_eq!(items, expected);
        }

        #[test]
        fn prop_insert_strings(mut items in prop::collection::vec(".{0,6}", 0..32), new in ".{0,6}") {
            items.sort();
            let mut expected = items.clone();
            expected.push(new.clone());
            expected.sort();

            binary_insert(new, &mut items, |a, b| a.cmp(b));
            prop_assert_eq!(items, expected);
        }
    }
}
