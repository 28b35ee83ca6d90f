/// The comparator port: where the algorithms ask "which comes first?".
///
/// A comparator either answers right away or returns `Poll::Pending`. The
/// algorithms in this crate are explicit state machines, so a pending answer
/// leaves them parked at the exact comparison that suspended. Calling
/// `resume` again later re-issues that same comparison.
use std::cmp::Ordering;
use std::task::Poll;

use crate::types::ComparisonPair;

pub trait Comparator<T> {
    /// `Less` means `a` precedes `b`. `Pending` suspends the caller.
    fn compare(&mut self, a: &T, b: &T) -> Poll<Ordering>;
}

/// Result of resuming a machine.
#[derive(Debug, Clone, PartialEq)]
pub enum Step<T, R> {
    /// Suspended on this pair; nothing advanced past it.
    Pending(ComparisonPair<T>),
    Done(R),
}

/// Adapter for comparators that answer instantly (closures, tests).
pub struct Immediate<F>(pub F);

impl<T, F> Comparator<T> for Immediate<F>
where
    F: FnMut(&T, &T) -> Ordering,
{
    fn compare(&mut self, a: &T, b: &T) -> Poll<Ordering> {
        Poll::Ready((self.0)(a, b))
    }
}

impl<T, C: Comparator<T> + ?Sized> Comparator<T> for &mut C {
    fn compare(&mut self, a: &T, b: &T) -> Poll<Ordering> {
        (**self).compare(a, b)
    }
}

/// Unwrap a step produced by a comparator that never suspends.
pub(crate) fn expect_done<T, R>(step: Step<T, R>) -> R {
    match step {
        Step::Done(result) => result,
        Step::Pending(_) => unreachable!("immediate comparator never suspends"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_immediate_answers_synchronously() {
        let mut cmp = Immediate(|a: &i32, b: &i32| a.cmp(b));
        assert_eq!(cmp.compare(&1, &2), Poll::Ready(Ordering::Less));
        assert_eq!(cmp.compare(&3, &2), Poll::Ready(Ordering::Greater));
    }

    fn ask<C: Comparator<i32>>(mut cmp: C) -> Poll<Ordering> {
        cmp.compare(&1, &2)
    }

    #[test]
    fn test_mut_ref_forwards() {
        let mut inner = Immediate(|a: &i32, b: &i32| b.cmp(a));
        assert_eq!(ask(&mut inner), Poll::Ready(Ordering::Greater));
        assert_eq!(ask(inner), Poll::Ready(Ordering::Greater));
    }
}
