/// Top-down merge sort as a resumable machine.
///
/// The recursion is kept on an explicit task stack so a suspended sort can be
/// serialized and picked up after a restart. Tasks run left half first, then
/// right half, then the merge of the two, which is the order the recursive
/// formulation would ask its questions in.
use std::cmp::Ordering;
use std::task::Poll;

use serde::{Deserialize, Serialize};

use crate::comparator::{Comparator, Immediate, Step, expect_done};
use crate::types::ComparisonPair;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Task<T> {
    /// Sort this run; splits into two halves plus a merge.
    Sort(Vec<T>),
    /// Merge the two topmost results (left below right).
    Merge,
}

/// An in-progress merge of two sorted runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct MergeCursor<T> {
    left: Vec<T>,
    right: Vec<T>,
    merged: Vec<T>,
    li: usize,
    ri: usize,
}

impl<T: Clone + PartialEq + std::fmt::Debug> MergeCursor<T> {
    fn new(left: Vec<T>, right: Vec<T>) -> Self {
        let merged = Vec::with_capacity(left.len() + right.len());
        MergeCursor { left, right, merged, li: 0, ri: 0 }
    }

    fn resume<C>(&mut self, cmp: &mut C) -> Step<T, Vec<T>>
    where
        C: Comparator<T> + ?Sized,
    {
        while self.li < self.left.len() && self.ri < self.right.len() {
            let a = &self.left[self.li];
            let b = &self.right[self.ri];
            match cmp.compare(a, b) {
                Poll::Pending => return Step::Pending(ComparisonPair::new(a.clone(), b.clone())),
                Poll::Ready(Ordering::Less) => {
                    self.merged.push(a.clone());
                    self.li += 1;
                }
                Poll::Ready(_) => {
                    self.merged.push(b.clone());
                    self.ri += 1;
                }
            }
        }

        let mut merged = std::mem::take(&mut self.merged);
        merged.extend_from_slice(&self.left[self.li..]);
        merged.extend_from_slice(&self.right[self.ri..]);
        Step::Done(merged)
    }

    fn is_consistent(&self) -> bool {
        self.li <= self.left.len() && self.ri <= self.right.len()
    }

    fn members(&self) -> impl Iterator<Item = &T> {
        self.merged
            .iter()
            .chain(&self.left[self.li.min(self.left.len())..])
            .chain(&self.right[self.ri.min(self.right.len())..])
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeSort<T> {
    tasks: Vec<Task<T>>,
    results: Vec<Vec<T>>,
    merging: Option<MergeCursor<T>>,
}

impl<T: Clone + PartialEq + std::fmt::Debug> MergeSort<T> {
    pub fn new(items: Vec<T>) -> Self {
        MergeSort {
            tasks: vec![Task::Sort(items)],
            results: Vec::new(),
            merging: None,
        }
    }

    pub fn resume<C>(&mut self, cmp: &mut C) -> Step<T, Vec<T>>
    where
        C: Comparator<T> + ?Sized,
    {
        loop {
            if let Some(cursor) = self.merging.as_mut() {
                match cursor.resume(cmp) {
                    Step::Pending(pair) => return Step::Pending(pair),
                    Step::Done(merged) => {
                        self.results.push(merged);
                        self.merging = None;
                    }
                }
                continue;
            }

            match self.tasks.pop() {
                None => return Step::Done(self.results.pop().unwrap_or_default()),
                Some(Task::Sort(mut items)) => {
                    if items.len() <= 1 {
                        self.results.push(items);
                    } else {
                        // Odd lengths put the extra element in the right half.
                        let right = items.split_off(items.len() / 2);
                        self.tasks.push(Task::Merge);
                        self.tasks.push(Task::Sort(right));
                        self.tasks.push(Task::Sort(items));
                    }
                }
                Some(Task::Merge) => {
                    let right = self.results.pop().unwrap_or_default();
                    let left = self.results.pop().unwrap_or_default();
                    self.merging = Some(MergeCursor::new(left, right));
                }
            }
        }
    }

    /// Whether the task and result stacks fit together and the merge cursor
    /// is in range. Only a tampered snapshot breaks this.
    pub fn is_consistent(&self) -> bool {
        if !self.merging.as_ref().is_none_or(MergeCursor::is_consistent) {
            return false;
        }
        // Replay the stacks: each sort leaves one run, each merge folds two
        // runs into one, and exactly one run is left at the end.
        let mut runs = self.results.len() + usize::from(self.merging.is_some());
        for task in self.tasks.iter().rev() {
            match task {
                Task::Sort(_) => runs += 1,
                Task::Merge if runs >= 2 => runs -= 1,
                Task::Merge => return false,
            }
        }
        runs == 1
    }

    /// Every item the machine is currently holding, in no particular order.
    pub fn members(&self) -> Vec<&T> {
        let mut out: Vec<&T> = Vec::new();
        for task in &self.tasks {
            if let Task::Sort(items) = task {
                out.extend(items);
            }
        }
        for run in &self.results {
            out.extend(run);
        }
        if let Some(cursor) = &self.merging {
            out.extend(cursor.members());
        }
        out
    }
}

/// Sort `items` with an instant comparator.
pub fn merge_sort<T, F>(items: Vec<T>, compare: F) -> Vec<T>
where
    T: Clone + PartialEq + std::fmt::Debug,
    F: FnMut(&T, &T) -> Ordering,
{
    expect_done(MergeSort::new(items).resume(&mut Immediate(compare)))
}
