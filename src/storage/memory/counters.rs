//! CounterStore for the memory backend.

use async_trait::async_trait;

use super::{MemoryStore, State};
use crate::ledger::CounterDelta;
use crate::model::{SnippetId, UserId};
use crate::storage::{CounterStore, ReconcileReport, Result};

/// Recompute one snippet's counters. Returns true if anything changed.
fn reconcile_snippet(state: &mut State, id: SnippetId) -> bool {
    let likes = state.likes.keys().filter(|(_, s)| *s == id).count() as i64;
    let comments = state.comments.iter().filter(|c| c.snippet == id).count() as i64;
    let views = state.views.iter().filter(|v| v.snippet == id).count() as i64;
    let forks = state.forks.iter().filter(|f| f.original == id).count() as i64;

    let Some(snippet) = state.snippets.get_mut(&id) else {
        return false;
    };
    let actual = (likes, comments, views, forks);
    let cached = (
        snippet.like_count,
        snippet.comment_count,
        snippet.view_count,
        snippet.fork_count,
    );
    if actual == cached {
        return false;
    }
    snippet.like_count = likes;
    snippet.comment_count = comments;
    snippet.view_count = views;
    snippet.fork_count = forks;
    true
}

/// Recompute one user's counters. Returns true if anything changed.
fn reconcile_user(state: &mut State, id: UserId) -> bool {
    let followers = state.follows.keys().filter(|(_, f)| *f == id).count() as i64;
    let following = state.follows.keys().filter(|(f, _)| *f == id).count() as i64;
    let snippets = state.snippets.values().filter(|s| s.owner == id).count() as i64;
    let likes = state
        .likes
        .keys()
        .filter(|(_, s)| state.snippets.get(s).is_some_and(|s| s.owner == id))
        .count() as i64;

    let Some(user) = state.users.get_mut(&id) else {
        return false;
    };
    let actual = (followers, following, snippets, likes);
    let cached = (
        user.follower_count,
        user.following_count,
        user.snippet_count,
        user.total_likes_received,
    );
    if actual == cached {
        return false;
    }
    user.follower_count = followers;
    user.following_count = following;
    user.snippet_count = snippets;
    user.total_likes_received = likes;
    true
}

#[async_trait]
impl CounterStore for MemoryStore {
    async fn adjust(&self, deltas: &[CounterDelta]) -> Result<()> {
        self.counters_failing().await?;
        self.state.write().await.apply_deltas(deltas)
    }

    async fn reconcile_snippet(&self, id: SnippetId) -> Result<bool> {
        Ok(reconcile_snippet(&mut *self.state.write().await, id))
    }

    async fn reconcile_user(&self, id: UserId) -> Result<bool> {
        Ok(reconcile_user(&mut *self.state.write().await, id))
    }

    async fn reconcile_all(&self) -> Result<ReconcileReport> {
        let mut state = self.state.write().await;
        let mut report = ReconcileReport::default();

        let snippet_ids: Vec<SnippetId> = state.snippets.keys().copied().collect();
        for id in snippet_ids {
            if reconcile_snippet(&mut state, id) {
                report.snippets_corrected += 1;
            }
        }

        let user_ids: Vec<UserId> = state.users.keys().copied().collect();
        for id in user_ids {
            if reconcile_user(&mut state, id) {
                report.users_corrected += 1;
            }
        }

        Ok(report)
    }
}
