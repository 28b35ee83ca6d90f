/// Ranking session: the resumable state machine the UI drives.
///
/// The session owns the item set, the ledger and whichever algorithm is in
/// flight. The UI only ever sees one pending comparison at a time and answers
/// it with `choose`. Every mutating call writes a full snapshot to the store
/// before returning, so a restart resumes at the same question.
use std::collections::{BTreeSet, VecDeque};
use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use crate::comparator::Step;
use crate::constants::{
    ALL_KEYS, KEY_COMPARISON_CACHE, KEY_COMPARISONS_COUNT, KEY_ESTIMATED_COMPARISONS, KEY_ITEMS,
    KEY_REMAINING_ITEMS, KEY_SORTED_ITEMS, KEY_STATE, KEY_TOP_K,
};
use crate::error::{RankError, Result};
use crate::estimate::{Estimate, estimate};
use crate::ledger::Ledger;
use crate::store::{KeyValueStore, Namespaced};
use crate::top_k::{Challenge, TopKSelection};
use crate::types::{ComparisonPair, RankItem};

/// Coarse phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RankingState {
    Idle,
    Collecting,
    Comparing,
    Sorted,
}

/// What the UI shows once (or while) a run is going.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RankingResult<T> {
    pub sorted: Vec<T>,
    pub residual: Vec<T>,
    pub comparisons_taken: usize,
    pub estimate: Estimate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Status<T> {
    pub state: RankingState,
    pub items: usize,
    pub top_k: Option<NonZeroUsize>,
    pub pending: Option<ComparisonPair<T>>,
    /// Insertions waiting for the current job to finish.
    pub queued: usize,
    pub comparisons_taken: usize,
    pub estimate: Estimate,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
enum Job<T> {
    /// Sort or top-K selection over the whole item set.
    Rank(TopKSelection<T>),
    /// One item entering an already finished ranking.
    Insert { challenge: Challenge<T>, residual: Vec<T> },
}

impl<T: RankItem> Job<T> {
    fn is_consistent(&self) -> bool {
        match self {
            Job::Rank(selection) => selection.is_consistent(),
            Job::Insert { challenge, .. } => challenge.is_consistent(),
        }
    }

    fn members(&self) -> Vec<&T> {
        match self {
            Job::Rank(selection) => selection.items().iter().collect(),
            Job::Insert { challenge, residual } => {
                let mut out = challenge.members();
                out.extend(residual);
                out
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
enum Phase<T> {
    Idle,
    Collecting,
    Comparing { job: Job<T>, queued: VecDeque<T> },
    Sorted,
}

impl<T> Default for Phase<T> {
    fn default() -> Self {
        Phase::Idle
    }
}

pub struct RankingSession<T: RankItem, S: KeyValueStore> {
    store: Namespaced<S>,
    items: Vec<T>,
    top_k: Option<NonZeroUsize>,
    ledger: Ledger<T>,
    sorted: Vec<T>,
    residual: Vec<T>,
    phase: Phase<T>,
    /// Derived by stepping the job; never persisted.
    pending: Option<ComparisonPair<T>>,
}

impl<T: RankItem, S: KeyValueStore> RankingSession<T, S> {
    /// Load a session from `backend`, repairing anything malformed.
    pub fn open(backend: S, namespace: &str) -> Result<Self> {
        let store = Namespaced::new(namespace, backend);

        let stored_items: Vec<T> = store.load(KEY_ITEMS);
        let mut items: Vec<T> = Vec::with_capacity(stored_items.len());
        for item in stored_items {
            if !items.contains(&item) {
                items.push(item);
            }
        }

        let mut session = RankingSession {
            items,
            top_k: store.load(KEY_TOP_K),
            ledger: store.load(KEY_COMPARISON_CACHE),
            sorted: store.load(KEY_SORTED_ITEMS),
            residual: store.load(KEY_REMAINING_ITEMS),
            phase: store.load(KEY_STATE),
            pending: None,
            store,
        };

        let stored_count: usize = session.store.load(KEY_COMPARISONS_COUNT);
        if stored_count != session.ledger.len() {
            tracing::warn!(
                stored_count,
                ledger = session.ledger.len(),
                "comparison count differs from ledger; using ledger"
            );
        }

        let repaired = session.repair();
        if matches!(session.phase, Phase::Comparing { .. }) {
            session.advance()?;
            session.save()?;
        } else if repaired {
            session.save()?;
        }

        tracing::debug!(
            namespace,
            state = ?session.state(),
            items = session.items.len(),
            comparisons = session.ledger.len(),
            "opened ranking session"
        );
        Ok(session)
    }

    /// Bring a freshly loaded snapshot back within the invariants.
    /// Returns whether anything had to change.
    fn repair(&mut self) -> bool {
        let item_set: BTreeSet<&T> = self.items.iter().collect();

        let problem = match &self.phase {
            Phase::Idle | Phase::Collecting => None,
            Phase::Sorted => {
                let members: Vec<&T> = self.sorted.iter().chain(&self.residual).collect();
                (!covers_exactly(&item_set, &members))
                    .then_some("sorted and residual lists do not match the item set")
            }
            Phase::Comparing { job, .. } if !job.is_consistent() => {
                Some("in-flight ranking state is internally inconsistent")
            }
            Phase::Comparing { job, queued } => {
                let mut members = job.members();
                members.extend(queued);
                (!covers_exactly(&item_set, &members))
                    .then_some("in-flight ranking does not match the item set")
            }
        };

        let mut repaired = false;
        if let Some(reason) = problem {
            let err = RankError::MalformedPersistedState {
                key: self.store.full_key(KEY_STATE),
                reason: reason.to_string(),
            };
            tracing::warn!("{err}; discarding ranking progress");
            self.phase = Phase::Collecting;
            self.ledger.clear();
            self.sorted.clear();
            self.residual.clear();
            repaired = true;
        }

        let expected = if self.items.is_empty() {
            matches!(self.phase, Phase::Idle | Phase::Sorted)
        } else {
            !matches!(self.phase, Phase::Idle)
        };
        if !expected {
            self.phase = if self.items.is_empty() { Phase::Idle } else { Phase::Collecting };
            repaired = true;
        }
        repaired
    }

    pub fn namespace(&self) -> &str {
        self.store.namespace()
    }

    pub fn into_backend(self) -> S {
        self.store.into_backend()
    }

    pub fn state(&self) -> RankingState {
        match self.phase {
            Phase::Idle => RankingState::Idle,
            Phase::Collecting => RankingState::Collecting,
            Phase::Comparing { .. } => RankingState::Comparing,
            Phase::Sorted => RankingState::Sorted,
        }
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn top_k(&self) -> Option<NonZeroUsize> {
        self.top_k
    }

    pub fn ledger(&self) -> &Ledger<T> {
        &self.ledger
    }

    /// Add one item while collecting. Returns `false` for a duplicate.
    ///
    /// After a run has started this is the same as `insert_new_item`.
    pub fn add_item(&mut self, value: T) -> Result<bool> {
        if matches!(self.phase, Phase::Comparing { .. } | Phase::Sorted) {
            return self.insert_new_item(value);
        }
        let added = self.push_item(value);
        if added {
            self.phase = Phase::Collecting;
            self.ledger.clear();
            self.save()?;
        }
        Ok(added)
    }

    /// Add several items, saving once. Returns how many were new.
    pub fn add_items(&mut self, values: impl IntoIterator<Item = T>) -> Result<usize> {
        if matches!(self.phase, Phase::Comparing { .. } | Phase::Sorted) {
            let mut added = 0;
            for value in values {
                if self.insert_new_item(value)? {
                    added += 1;
                }
            }
            return Ok(added);
        }

        let added = values.into_iter().filter(|v| self.push_item(v.clone())).count();
        if added > 0 {
            self.phase = Phase::Collecting;
            self.ledger.clear();
            self.save()?;
        }
        Ok(added)
    }

    fn push_item(&mut self, value: T) -> bool {
        if self.items.contains(&value) {
            tracing::debug!(item = ?value, "ignoring duplicate item");
            return false;
        }
        self.items.push(value);
        true
    }

    /// Discard everything: items, ledger, output and any pending question.
    pub fn remove_all_items(&mut self) -> Result<()> {
        self.items.clear();
        self.top_k = None;
        self.ledger.clear();
        self.sorted.clear();
        self.residual.clear();
        self.phase = Phase::Idle;
        self.pending = None;
        for key in ALL_KEYS {
            self.store.remove(key)?;
        }
        tracing::info!(namespace = self.store.namespace(), "cleared ranking session");
        Ok(())
    }

    /// Start a fresh run over the current items. A `k` of zero is treated
    /// as no limit.
    pub fn start_ranking(&mut self, k: Option<usize>) -> Result<()> {
        if matches!(self.phase, Phase::Comparing { .. }) {
            return Err(RankError::RankingInProgress);
        }

        self.top_k = top_k_bound(k);
        self.ledger.clear();
        self.sorted.clear();
        self.residual.clear();
        self.phase = Phase::Comparing {
            job: Job::Rank(TopKSelection::new(self.items.clone(), self.top_k)),
            queued: VecDeque::new(),
        };

        let est = self.estimate();
        tracing::info!(
            items = self.items.len(),
            top_k = self.top_k.map(NonZeroUsize::get),
            min = est.min,
            max = est.max,
            "starting ranking"
        );

        self.advance()?;
        self.save()
    }

    pub fn current_pending_comparison(&self) -> Option<&ComparisonPair<T>> {
        self.pending.as_ref()
    }

    /// Answer the pending comparison by naming the preferred item.
    pub fn choose(&mut self, choice: &T) -> Result<()> {
        let Some(pending) = self.pending.clone() else {
            tracing::debug!(choice = ?choice, "ignoring choice with nothing pending");
            return Err(RankError::StaleResolution(format!("{choice:?}")));
        };
        self.resolve(&pending, choice)
    }

    /// Answer `pair` with `choice`. Anything that does not match the pending
    /// comparison is rejected with `StaleResolution` and leaves the session
    /// untouched.
    pub fn resolve(&mut self, pair: &ComparisonPair<T>, choice: &T) -> Result<()> {
        let stale = || RankError::StaleResolution(format!("{pair:?} -> {choice:?}"));

        let Some(pending) = self.pending.as_ref() else {
            tracing::debug!(?pair, "ignoring resolution with nothing pending");
            return Err(stale());
        };
        if pending != pair {
            tracing::debug!(?pair, ?pending, "ignoring stale resolution");
            return Err(stale());
        }
        let Some(outcome) = pending.outcome_for(choice) else {
            tracing::debug!(?pair, ?choice, "choice is not part of the pending pair");
            return Err(stale());
        };

        let Some(pending) = self.pending.take() else {
            return Err(stale());
        };
        self.ledger.record_outcome(pending, outcome)?;
        self.advance()?;
        self.save()
    }

    /// Add an item after ranking has started. With a finished ranking it is
    /// binary-inserted right away; during a run it waits its turn. Before
    /// any run it is simply collected. Returns `false` for a duplicate.
    pub fn insert_new_item(&mut self, value: T) -> Result<bool> {
        if matches!(self.phase, Phase::Idle | Phase::Collecting) {
            return self.add_item(value);
        }
        if !self.push_item(value.clone()) {
            return Ok(false);
        }

        match &mut self.phase {
            Phase::Comparing { queued, .. } => {
                tracing::debug!(item = ?value, "queueing insertion behind current run");
                queued.push_back(value);
            }
            _ => {
                tracing::info!(item = ?value, "inserting into finished ranking");
                self.phase = Phase::Comparing {
                    job: Job::Insert {
                        challenge: Challenge::new(value, self.sorted.clone(), self.top_k),
                        residual: self.residual.clone(),
                    },
                    queued: VecDeque::new(),
                };
                self.advance()?;
            }
        }
        self.save()?;
        Ok(true)
    }

    pub fn comparisons_taken(&self) -> usize {
        self.ledger.len()
    }

    pub fn estimate(&self) -> Estimate {
        estimate(self.items.len(), self.top_k.map_or(0, NonZeroUsize::get))
    }

    /// Output of the last finished job. While an insertion is running this
    /// is the ranking it is being inserted into.
    pub fn current_result(&self) -> RankingResult<T> {
        RankingResult {
            sorted: self.sorted.clone(),
            residual: self.residual.clone(),
            comparisons_taken: self.comparisons_taken(),
            estimate: self.estimate(),
        }
    }

    pub fn status(&self) -> Status<T> {
        let queued = match &self.phase {
            Phase::Comparing { queued, .. } => queued.len(),
            _ => 0,
        };
        Status {
            state: self.state(),
            items: self.items.len(),
            top_k: self.top_k,
            pending: self.pending.clone(),
            queued,
            comparisons_taken: self.comparisons_taken(),
            estimate: self.estimate(),
        }
    }

    /// Step the in-flight job until it needs the user or runs out of work.
    fn advance(&mut self) -> Result<()> {
        self.pending = None;
        loop {
            let Phase::Comparing { job, queued } = &mut self.phase else {
                return Ok(());
            };

            let (sorted, residual) = match job {
                Job::Rank(selection) => match selection.resume(&mut self.ledger) {
                    Step::Pending(pair) => {
                        tracing::debug!(first = ?pair.first, second = ?pair.second, "awaiting comparison");
                        self.pending = Some(pair);
                        return Ok(());
                    }
                    Step::Done(done) => done,
                },
                Job::Insert { challenge, residual } => match challenge.resume(&mut self.ledger) {
                    Step::Pending(pair) => {
                        tracing::debug!(first = ?pair.first, second = ?pair.second, "awaiting comparison");
                        self.pending = Some(pair);
                        return Ok(());
                    }
                    Step::Done(result) => {
                        let mut residual = std::mem::take(residual);
                        residual.extend(result.rejected);
                        (result.heap, residual)
                    }
                },
            };
            self.sorted = sorted;
            self.residual = residual;

            match queued.pop_front() {
                Some(next) => {
                    tracing::info!(item = ?next, "inserting queued item");
                    *job = Job::Insert {
                        challenge: Challenge::new(next, self.sorted.clone(), self.top_k),
                        residual: self.residual.clone(),
                    };
                }
                None => {
                    tracing::info!(
                        ranked = self.sorted.len(),
                        residual = self.residual.len(),
                        comparisons = self.ledger.len(),
                        "ranking finished"
                    );
                    self.phase = Phase::Sorted;
                }
            }
        }
    }

    fn save(&mut self) -> Result<()> {
        let estimate = self.estimate();
        self.store.save(KEY_ITEMS, &self.items)?;
        self.store.save(KEY_SORTED_ITEMS, &self.sorted)?;
        self.store.save(KEY_REMAINING_ITEMS, &self.residual)?;
        self.store.save(KEY_TOP_K, &self.top_k)?;
        self.store.save(KEY_COMPARISON_CACHE, &self.ledger)?;
        self.store.save(KEY_COMPARISONS_COUNT, &self.ledger.len())?;
        self.store.save(KEY_ESTIMATED_COMPARISONS, &estimate)?;
        self.store.save(KEY_STATE, &self.phase)?;
        Ok(())
    }
}

/// Whether `members` names every item in `items` exactly once and nothing else.
fn covers_exactly<T: Ord>(items: &BTreeSet<&T>, members: &[&T]) -> bool {
    let unique: BTreeSet<&T> = members.iter().copied().collect();
    unique.len() == members.len() && unique == *items
}

/// Validate a configured K. Zero means "no limit".
pub fn top_k_bound(k: Option<usize>) -> Option<NonZeroUsize> {
    let k = k?;
    let bound = NonZeroUsize::new(k);
    if bound.is_none() {
        tracing::warn!("{}; ranking all items", RankError::InvalidTopK(k.to_string()));
    }
    bound
}

/// Parse user-entered K. Blank input is no limit; anything that is not a
/// positive integer is reported and also treated as no limit.
pub fn parse_top_k(raw: &str) -> Option<NonZeroUsize> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    match trimmed.parse::<usize>() {
        Ok(k) => top_k_bound(Some(k)),
        Err(_) => {
            tracing::warn!("{}; ranking all items", RankError::InvalidTopK(trimmed.to_string()));
            None
        }
    }
}
