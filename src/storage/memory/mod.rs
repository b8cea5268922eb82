//! In-process storage.
//!
//! A single `RwLock` guards all tables, so every write that carries counter
//! deltas is applied as one unit. The exception is relationship writes: they
//! model a store without cross-table transactions, committing the row first
//! and the counters second. Failure flags let tests break either half.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::ledger::{CounterDelta, CounterTarget, SnippetCounter, UserCounter};
use crate::model::{
    Comment, ForkRecord, Notification, Snippet, SnippetId, SnippetView, TagId, User, UserId,
};
use crate::storage::{Result, StorageError};

mod content;
mod counters;
mod notifications;
mod relations;


/// Insertion sequence, used as a tie-breaker when timestamps collide.
type Seq = u64;

#[derive(Default)]
struct State {
    users: HashMap<UserId, User>,
    snippets: HashMap<SnippetId, Snippet>,
    tags: HashMap<SnippetId, Vec<TagId>>,
    likes: HashMap<(UserId, SnippetId), Seq>,
    bookmarks: HashMap<(UserId, SnippetId), Seq>,
    follows: HashMap<(UserId, UserId), Seq>,
    comments: Vec<Comment>,
    forks: Vec<ForkRecord>,
    views: Vec<SnippetView>,
    notifications: Vec<Notification>,
    seq: Seq,
}

impl State {
    fn next_seq(&mut self) -> Seq {
        self.seq += 1;
        self.seq
    }

    fn check_target(&self, target: CounterTarget) -> Result<()> {
        match target {
            CounterTarget::Snippet(id) if !self.snippets.contains_key(&id) => {
                Err(StorageError::not_found("Snippet", id))
            }
            CounterTarget::User(id) if !self.users.contains_key(&id) => {
                Err(StorageError::not_found("User", id))
            }
            _ => Ok(()),
        }
    }

    /// Apply all deltas or none of them.
    fn apply_deltas(&mut self, deltas: &[CounterDelta]) -> Result<()> {
        for delta in deltas {
            self.check_target(delta.target())?;
        }
        for delta in deltas {
            match *delta {
                CounterDelta::Snippet { id, counter, delta } => {
                    if let Some(snippet) = self.snippets.get_mut(&id) {
                        let field = match counter {
                            SnippetCounter::Likes => &mut snippet.like_count,
                            SnippetCounter::Comments => &mut snippet.comment_count,
                            SnippetCounter::Views => &mut snippet.view_count,
                            SnippetCounter::Forks => &mut snippet.fork_count,
                        };
                        *field = (*field + delta).max(0);
                    }
                }
                CounterDelta::User { id, counter, delta } => {
                    if let Some(user) = self.users.get_mut(&id) {
                        let field = match counter {
                            UserCounter::Followers => &mut user.follower_count,
                            UserCounter::Following => &mut user.following_count,
                            UserCounter::Snippets => &mut user.snippet_count,
                            UserCounter::LikesReceived => &mut user.total_likes_received,
                        };
                        *field = (*field + delta).max(0);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Memory store implementing every storage trait.
#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<State>,
    fail_counters: RwLock<bool>,
    fail_views: RwLock<bool>,
    fail_notifications: RwLock<bool>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every counter write fail. Relationship rows still change.
    pub async fn set_fail_counters(&self, fail: bool) {
        *self.fail_counters.write().await = fail;
    }

    pub async fn set_fail_views(&self, fail: bool) {
        *self.fail_views.write().await = fail;
    }

    pub async fn set_fail_notifications(&self, fail: bool) {
        *self.fail_notifications.write().await = fail;
    }

    /// Overwrite a snippet's counters, bypassing the ledger.
    pub async fn corrupt_snippet_counters(&self, id: SnippetId, value: i64) {
        if let Some(snippet) = self.state.write().await.snippets.get_mut(&id) {
            snippet.like_count = value;
            snippet.comment_count = value;
            snippet.view_count = value;
            snippet.fork_count = value;
        }
    }

    /// Overwrite a user's counters, bypassing the ledger.
    pub async fn corrupt_user_counters(&self, id: UserId, value: i64) {
        if let Some(user) = self.state.write().await.users.get_mut(&id) {
            user.follower_count = value;
            user.following_count = value;
            user.snippet_count = value;
            user.total_likes_received = value;
        }
    }

    async fn counters_failing(&self) -> Result<()> {
        if *self.fail_counters.read().await {
            return Err(StorageError::Injected("counter update".to_string()));
        }
        Ok(())
    }
}
