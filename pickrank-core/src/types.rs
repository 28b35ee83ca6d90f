use std::cmp::Ordering;
use std::fmt::Debug;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Bound for values that can be ranked and persisted.
///
/// Identity is by value: two equal items are the same item. `Ord` is only
/// used to key the ledger order-independently, never to rank.
pub trait RankItem: Clone + Ord + Debug + Serialize + DeserializeOwned {}

impl<T> RankItem for T where T: Clone + Ord + Debug + Serialize + DeserializeOwned {}

/// Answer to "which of these two comes first?".
///
/// There is no tie: the user always has to pick one of the two.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    FirstPrecedes,
    SecondPrecedes,
}

impl Outcome {
    /// `Equal` counts as "not less", matching how the algorithms branch.
    pub fn from_ordering(ordering: Ordering) -> Self {
        match ordering {
            Ordering::Less => Outcome::FirstPrecedes,
            Ordering::Equal | Ordering::Greater => Outcome::SecondPrecedes,
        }
    }

    pub fn as_ordering(self) -> Ordering {
        match self {
            Outcome::FirstPrecedes => Ordering::Less,
            Outcome::SecondPrecedes => Ordering::Greater,
        }
    }

    /// Signed form: negative when the first item precedes.
    pub fn signum(self) -> i8 {
        match self {
            Outcome::FirstPrecedes => -1,
            Outcome::SecondPrecedes => 1,
        }
    }

    pub fn reversed(self) -> Self {
        match self {
            Outcome::FirstPrecedes => Outcome::SecondPrecedes,
            Outcome::SecondPrecedes => Outcome::FirstPrecedes,
        }
    }
}

/// Two distinct items to be compared.
///
/// `first`/`second` keep the order in which the algorithm asked, which is
/// also the order shown to the user. Equality ignores that order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonPair<T> {
    pub first: T,
    pub second: T,
}

impl<T: PartialEq + Debug> ComparisonPair<T> {
    pub fn new(first: T, second: T) -> Self {
        debug_assert!(first != second, "Self-comparison of {:?}", first);
        ComparisonPair { first, second }
    }

    pub fn contains(&self, item: &T) -> bool {
        self.first == *item || self.second == *item
    }

    /// Outcome of this pair when the user picks `choice`, or `None` if
    /// `choice` is not one of the two.
    pub fn outcome_for(&self, choice: &T) -> Option<Outcome> {
        if self.first == *choice {
            Some(Outcome::FirstPrecedes)
        } else if self.second == *choice {
            Some(Outcome::SecondPrecedes)
        } else {
            None
        }
    }
}

impl<T: Ord + Clone> ComparisonPair<T> {
    /// Order-independent key.
    pub(crate) fn key(&self) -> (T, T) {
        if self.first <= self.second {
            (self.first.clone(), self.second.clone())
        } else {
            (self.second.clone(), self.first.clone())
        }
    }
}

impl<T: PartialEq> PartialEq for ComparisonPair<T> {
    fn eq(&self, other: &Self) -> bool {
        (self.first == other.first && self.second == other.second)
            || (self.first == other.second && self.second == other.first)
    }
}

impl<T: Eq> Eq for ComparisonPair<T> {}

/// One answered comparison, owned by the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComparisonRecord<T> {
    pub pair: ComparisonPair<T>,
    pub outcome: Outcome,
}

impl<T: PartialEq> ComparisonRecord<T> {
    /// Outcome oriented to `(a, b)`, whichever way round the pair was stored.
    pub fn outcome_between(&self, a: &T, b: &T) -> Option<Outcome> {
        if self.pair.first == *a && self.pair.second == *b {
            Some(self.outcome)
        } else if self.pair.first == *b && self.pair.second == *a {
            Some(self.outcome.reversed())
        } else {
            None
        }
    }
}
