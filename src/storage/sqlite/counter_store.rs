//! SQLite CounterStore implementation.
//!
//! Reconciliation recomputes every counter from the relationship tables in a
//! single `UPDATE ... FROM` statement and only touches rows that drifted, so
//! `rows_affected` is the number of corrections.

use async_trait::async_trait;
use sqlx::{SqliteConnection, SqlitePool};

use super::rows::apply_deltas;
use super::{begin_immediate, finish};
use crate::ledger::CounterDelta;
use crate::model::{SnippetId, UserId};
use crate::storage::{CounterStore, ReconcileReport, Result};

const RECONCILE_SNIPPETS: &str = r#"
UPDATE snippets SET
    like_count = t.likes,
    comment_count = t.comments,
    view_count = t.views,
    fork_count = t.forks
FROM (
    SELECT s.id AS id,
        (SELECT COUNT(*) FROM likes WHERE likes.snippet_id = s.id) AS likes,
        (SELECT COUNT(*) FROM comments WHERE comments.snippet_id = s.id) AS comments,
        (SELECT COUNT(*) FROM snippet_views WHERE snippet_views.snippet_id = s.id) AS views,
        (SELECT COUNT(*) FROM forks WHERE forks.original_snippet_id = s.id) AS forks
    FROM snippets s
    WHERE ?1 IS NULL OR s.id = ?1
) AS t
WHERE snippets.id = t.id
    AND (snippets.like_count <> t.likes
        OR snippets.comment_count <> t.comments
        OR snippets.view_count <> t.views
        OR snippets.fork_count <> t.forks)
"#;

const RECONCILE_USERS: &str = r#"
UPDATE users SET
    follower_count = t.followers,
    following_count = t.following,
    snippet_count = t.snippets,
    total_likes_received = t.likes
FROM (
    SELECT u.id AS id,
        (SELECT COUNT(*) FROM follows WHERE follows.following_id = u.id) AS followers,
        (SELECT COUNT(*) FROM follows WHERE follows.follower_id = u.id) AS following,
        (SELECT COUNT(*) FROM snippets WHERE snippets.owner_id = u.id) AS snippets,
        (SELECT COUNT(*) FROM likes
            INNER JOIN snippets ON snippets.id = likes.snippet_id
            WHERE snippets.owner_id = u.id) AS likes
    FROM users u
    WHERE ?1 IS NULL OR u.id = ?1
) AS t
WHERE users.id = t.id
    AND (users.follower_count <> t.followers
        OR users.following_count <> t.following
        OR users.snippet_count <> t.snippets
        OR users.total_likes_received <> t.likes)
"#;

/// SQLite implementation of CounterStore.
pub struct SqliteCounterStore {
    pool: SqlitePool,
}

impl SqliteCounterStore {
    /// Create a new SQLite counter store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Run one reconcile statement; `id = None` sweeps the whole table.
    async fn reconcile(&self, statement: &str, id: Option<String>) -> Result<u64> {
        let result = sqlx::query(statement).bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn reconcile_both(conn: &mut SqliteConnection) -> Result<ReconcileReport> {
        let none: Option<String> = None;
        let snippets = sqlx::query(RECONCILE_SNIPPETS)
            .bind(none.clone())
            .execute(&mut *conn)
            .await?;
        let users = sqlx::query(RECONCILE_USERS)
            .bind(none)
            .execute(&mut *conn)
            .await?;

        Ok(ReconcileReport {
            snippets_corrected: snippets.rows_affected(),
            users_corrected: users.rows_affected(),
        })
    }
}

#[async_trait]
impl CounterStore for SqliteCounterStore {
    async fn adjust(&self, deltas: &[CounterDelta]) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        begin_immediate(&mut conn).await?;
        let result = apply_deltas(&mut conn, deltas).await;
        finish(&mut conn, result).await
    }

    async fn reconcile_snippet(&self, id: SnippetId) -> Result<bool> {
        Ok(self.reconcile(RECONCILE_SNIPPETS, Some(id.to_string())).await? > 0)
    }

    async fn reconcile_user(&self, id: UserId) -> Result<bool> {
        Ok(self.reconcile(RECONCILE_USERS, Some(id.to_string())).await? > 0)
    }

    async fn reconcile_all(&self) -> Result<ReconcileReport> {
        let mut conn = self.pool.acquire().await?;
        begin_immediate(&mut conn).await?;
        let result = Self::reconcile_both(&mut conn).await;
        finish(&mut conn, result).await
    }
}
