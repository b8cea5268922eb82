//! Counter ledger.
//!
//! Denormalized counters on users and snippets are caches of the relationship
//! tables. Every change is expressed as a [`CounterDelta`] and applied by the
//! store as an atomic increment. Deltas normally travel with the row they
//! describe so both commit together; when that is not possible the affected
//! entities are flagged here and later recomputed from the authoritative rows.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::model::{Relation, RelationEdge, SnippetId, UserId};
use crate::storage::{CounterStore, ReconcileReport, Result};

/// Counters stored on a snippet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SnippetCounter {
    Likes,
    Comments,
    Views,
    Forks,
}

impl SnippetCounter {
    pub fn column(&self) -> &'static str {
        match self {
            SnippetCounter::Likes => "like_count",
            SnippetCounter::Comments => "comment_count",
            SnippetCounter::Views => "view_count",
            SnippetCounter::Forks => "fork_count",
        }
    }
}

/// Counters stored on a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserCounter {
    Followers,
    Following,
    Snippets,
    LikesReceived,
}

impl UserCounter {
    pub fn column(&self) -> &'static str {
        match self {
            UserCounter::Followers => "follower_count",
            UserCounter::Following => "following_count",
            UserCounter::Snippets => "snippet_count",
            UserCounter::LikesReceived => "total_likes_received",
        }
    }
}

/// Entity owning one or more counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CounterTarget {
    Snippet(SnippetId),
    User(UserId),
}

/// A signed change to one counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CounterDelta {
    Snippet {
        id: SnippetId,
        counter: SnippetCounter,
        delta: i64,
    },
    User {
        id: UserId,
        counter: UserCounter,
        delta: i64,
    },
}

impl CounterDelta {
    pub fn snippet(id: SnippetId, counter: SnippetCounter, delta: i64) -> Self {
        CounterDelta::Snippet { id, counter, delta }
    }

    pub fn user(id: UserId, counter: UserCounter, delta: i64) -> Self {
        CounterDelta::User { id, counter, delta }
    }

    pub fn target(&self) -> CounterTarget {
        match self {
            CounterDelta::Snippet { id, .. } => CounterTarget::Snippet(*id),
            CounterDelta::User { id, .. } => CounterTarget::User(*id),
        }
    }

    pub fn delta(&self) -> i64 {
        match self {
            CounterDelta::Snippet { delta, .. } | CounterDelta::User { delta, .. } => *delta,
        }
    }
}

// ============================================================================
// Delta derivation
// ============================================================================

/// Counters moved by creating (`sign = 1`) or removing (`sign = -1`) a relationship row.
///
/// Bookmarks carry no counters.
pub fn relation_deltas(edge: &RelationEdge, sign: i64) -> Vec<CounterDelta> {
    match edge.relation {
        Relation::Like(snippet) => vec![
            CounterDelta::snippet(snippet, SnippetCounter::Likes, sign),
            CounterDelta::user(edge.recipient, UserCounter::LikesReceived, sign),
        ],
        Relation::Bookmark(_) => Vec::new(),
        Relation::Follow(target) => vec![
            CounterDelta::user(edge.actor, UserCounter::Following, sign),
            CounterDelta::user(target, UserCounter::Followers, sign),
        ],
    }
}

pub fn fork_deltas(original: SnippetId, forker: UserId) -> Vec<CounterDelta> {
    vec![
        CounterDelta::snippet(original, SnippetCounter::Forks, 1),
        CounterDelta::user(forker, UserCounter::Snippets, 1),
    ]
}

pub fn comment_deltas(snippet: SnippetId) -> Vec<CounterDelta> {
    vec![CounterDelta::snippet(snippet, SnippetCounter::Comments, 1)]
}

pub fn view_deltas(snippet: SnippetId) -> Vec<CounterDelta> {
    vec![CounterDelta::snippet(snippet, SnippetCounter::Views, 1)]
}

pub fn publish_deltas(owner: UserId) -> Vec<CounterDelta> {
    vec![CounterDelta::user(owner, UserCounter::Snippets, 1)]
}

// ============================================================================
// Ledger
// ============================================================================

/// Applies deltas and tracks entities whose counters may have drifted.
pub struct CounterLedger {
    store: Arc<dyn CounterStore>,
    pending: Mutex<HashSet<CounterTarget>>,
}

impl CounterLedger {
    pub fn new(store: Arc<dyn CounterStore>) -> Self {
        Self {
            store,
            pending: Mutex::new(HashSet::new()),
        }
    }

    /// Apply deltas as atomic increments. Results are clamped at zero.
    pub async fn adjust(&self, deltas: &[CounterDelta]) -> Result<()> {
        if deltas.is_empty() {
            return Ok(());
        }
        self.store.adjust(deltas).await
    }

    /// Apply deltas left behind by a write that could not carry them.
    ///
    /// Never fails: on error the targets are flagged for reconciliation.
    /// Returns whether the deltas landed.
    pub async fn settle(&self, deltas: &[CounterDelta]) -> bool {
        match self.adjust(deltas).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, targets = deltas.len(), "Counter update failed, scheduling reconciliation");
                self.schedule(deltas.iter().map(CounterDelta::target)).await;
                false
            }
        }
    }

    /// Flag entities for the next [`reconcile_pending`](Self::reconcile_pending).
    pub async fn schedule(&self, targets: impl IntoIterator<Item = CounterTarget>) {
        let mut pending = self.pending.lock().await;
        pending.extend(targets);
    }

    pub async fn pending(&self) -> Vec<CounterTarget> {
        self.pending.lock().await.iter().copied().collect()
    }

    /// Recompute counters for flagged entities only.
    ///
    /// Entities that fail to reconcile stay flagged.
    pub async fn reconcile_pending(&self) -> Result<ReconcileReport> {
        let targets: Vec<CounterTarget> = {
            let mut pending = self.pending.lock().await;
            pending.drain().collect()
        };

        let mut report = ReconcileReport::default();
        let mut failed = Vec::new();
        let mut first_error = None;

        for target in targets {
            let outcome = match target {
                CounterTarget::Snippet(id) => self.store.reconcile_snippet(id).await,
                CounterTarget::User(id) => self.store.reconcile_user(id).await,
            };
            match outcome {
                Ok(true) => match target {
                    CounterTarget::Snippet(_) => report.snippets_corrected += 1,
                    CounterTarget::User(_) => report.users_corrected += 1,
                },
                Ok(false) => {}
                Err(e) => {
                    warn!(?target, error = %e, "Counter reconciliation failed");
                    failed.push(target);
                    first_error.get_or_insert(e);
                }
            }
        }

        if !failed.is_empty() {
            self.schedule(failed).await;
        }
        if let Some(e) = first_error {
            return Err(e);
        }

        debug!(
            snippets = report.snippets_corrected,
            users = report.users_corrected,
            "Pending counters reconciled"
        );
        Ok(report)
    }

    /// Recompute every counter from the relationship tables.
    pub async fn reconcile_all(&self) -> Result<ReconcileReport> {
        let flagged: Vec<CounterTarget> = {
            let mut pending = self.pending.lock().await;
            pending.drain().collect()
        };

        match self.store.reconcile_all().await {
            Ok(report) => {
                if report.total() > 0 {
                    info!(
                        snippets = report.snippets_corrected,
                        users = report.users_corrected,
                        "Counter drift corrected"
                    );
                }
                Ok(report)
            }
            Err(e) => {
                self.schedule(flagged).await;
                Err(e)
            }
        }
    }
}
