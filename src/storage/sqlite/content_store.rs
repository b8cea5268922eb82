//! SQLite ContentStore implementation.

use async_trait::async_trait;
use sea_query::{Expr, Order, Query, SqliteQueryBuilder};
use sqlx::{Row, SqliteConnection, SqlitePool};

use super::rows::{
    apply_deltas, comment_from_row, fork_from_row, insert_fork_record, insert_snippet,
    snippet_from_new, snippet_from_row, user_from_row, COMMENT_COLUMNS, SNIPPET_COLUMNS,
    USER_COLUMNS,
};
use super::{begin_immediate, finish};
use crate::ledger::CounterDelta;
use crate::model::{
    Comment, CommentId, CommentThread, ForkDraft, ForkRecord, NewSnippet, NewUser, Page,
    PageRequest, Snippet, SnippetId, SnippetView, TagId, User, UserId,
};
use crate::storage::helpers::{build_threads, format_timestamp};
use crate::storage::schema::{Comments, Forks, SnippetTags, SnippetViews, Snippets, Users};
use crate::storage::{ContentStore, Result};

/// SQLite implementation of ContentStore.
pub struct SqliteContentStore {
    pool: SqlitePool,
}

impl SqliteContentStore {
    /// Create a new SQLite content store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn insert_comment_row(conn: &mut SqliteConnection, comment: &Comment) -> Result<()> {
        let query = Query::insert()
            .into_table(Comments::Table)
            .columns(COMMENT_COLUMNS)
            .values_panic([
                comment.id.to_string().into(),
                comment.snippet.to_string().into(),
                comment.author.to_string().into(),
                comment.parent.map(|p| p.to_string()).into(),
                i64::from(comment.depth).into(),
                comment.content.clone().into(),
                format_timestamp(&comment.created_at).into(),
            ])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&mut *conn).await?;
        Ok(())
    }

    async fn insert_view_row(conn: &mut SqliteConnection, view: &SnippetView) -> Result<()> {
        let query = Query::insert()
            .into_table(SnippetViews::Table)
            .columns([
                SnippetViews::SnippetId,
                SnippetViews::ViewerId,
                SnippetViews::OriginHash,
                SnippetViews::ClientSignature,
                SnippetViews::CreatedAt,
            ])
            .values_panic([
                view.snippet.to_string().into(),
                view.viewer.map(|v| v.to_string()).into(),
                view.origin_hash.clone().into(),
                view.client_signature.clone().into(),
                format_timestamp(&view.viewed_at).into(),
            ])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&mut *conn).await?;
        Ok(())
    }

    async fn write_snippet(
        conn: &mut SqliteConnection,
        snippet: &NewSnippet,
        deltas: &[CounterDelta],
    ) -> Result<()> {
        insert_snippet(conn, snippet).await?;
        apply_deltas(conn, deltas).await
    }

    async fn write_fork(
        conn: &mut SqliteConnection,
        draft: &ForkDraft,
        deltas: &[CounterDelta],
    ) -> Result<()> {
        insert_snippet(conn, &draft.snippet).await?;
        insert_fork_record(conn, &draft.provenance).await?;
        apply_deltas(conn, deltas).await
    }

    async fn write_comment(
        conn: &mut SqliteConnection,
        comment: &Comment,
        deltas: &[CounterDelta],
    ) -> Result<()> {
        Self::insert_comment_row(conn, comment).await?;
        apply_deltas(conn, deltas).await
    }

    async fn write_view(
        conn: &mut SqliteConnection,
        view: &SnippetView,
        deltas: &[CounterDelta],
    ) -> Result<()> {
        Self::insert_view_row(conn, view).await?;
        apply_deltas(conn, deltas).await
    }
}

#[async_trait]
impl ContentStore for SqliteContentStore {
    async fn create_user(&self, user: &NewUser) -> Result<User> {
        let created_at = chrono::Utc::now();

        let query = Query::insert()
            .into_table(Users::Table)
            .columns([Users::Id, Users::Name, Users::CreatedAt])
            .values_panic([
                user.id.to_string().into(),
                user.name.clone().into(),
                format_timestamp(&created_at).into(),
            ])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;

        Ok(User {
            id: user.id,
            name: user.name.clone(),
            follower_count: 0,
            following_count: 0,
            snippet_count: 0,
            total_likes_received: 0,
            created_at,
        })
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let query = Query::select()
            .columns(USER_COLUMNS)
            .from(Users::Table)
            .and_where(Expr::col(Users::Id).eq(id.to_string()))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn publish_snippet(&self, snippet: &NewSnippet, deltas: &[CounterDelta]) -> Result<Snippet> {
        let mut conn = self.pool.acquire().await?;
        begin_immediate(&mut conn).await?;
        let result = Self::write_snippet(&mut conn, snippet, deltas).await;
        finish(&mut conn, result).await?;

        Ok(snippet_from_new(snippet))
    }

    async fn get_snippet(&self, id: SnippetId) -> Result<Option<Snippet>> {
        let query = Query::select()
            .columns(SNIPPET_COLUMNS)
            .from(Snippets::Table)
            .and_where(Expr::col(Snippets::Id).eq(id.to_string()))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        row.as_ref().map(snippet_from_row).transpose()
    }

    async fn snippet_tags(&self, id: SnippetId) -> Result<Vec<TagId>> {
        let query = Query::select()
            .column(SnippetTags::TagId)
            .from(SnippetTags::Table)
            .and_where(Expr::col(SnippetTags::SnippetId).eq(id.to_string()))
            .order_by(SnippetTags::TagId, Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;

        let mut tags = Vec::with_capacity(rows.len());
        for row in rows {
            tags.push(row.try_get("tag_id")?);
        }
        Ok(tags)
    }

    async fn create_fork(&self, draft: &ForkDraft, deltas: &[CounterDelta]) -> Result<Snippet> {
        let mut conn = self.pool.acquire().await?;
        begin_immediate(&mut conn).await?;
        let result = Self::write_fork(&mut conn, draft, deltas).await;
        finish(&mut conn, result).await?;

        Ok(snippet_from_new(&draft.snippet))
    }

    async fn forks_of(&self, original: SnippetId) -> Result<Vec<ForkRecord>> {
        let query = Query::select()
            .columns([
                Forks::Id,
                Forks::OriginalSnippetId,
                Forks::ForkedSnippetId,
                Forks::CreatedAt,
            ])
            .from(Forks::Table)
            .and_where(Expr::col(Forks::OriginalSnippetId).eq(original.to_string()))
            .order_by(Forks::CreatedAt, Order::Asc)
            .order_by_expr(Expr::cust("rowid"), Order::Asc)
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        rows.iter().map(fork_from_row).collect()
    }

    async fn get_comment(&self, id: CommentId) -> Result<Option<Comment>> {
        let query = Query::select()
            .columns(COMMENT_COLUMNS)
            .from(Comments::Table)
            .and_where(Expr::col(Comments::Id).eq(id.to_string()))
            .to_string(SqliteQueryBuilder);

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        row.as_ref().map(comment_from_row).transpose()
    }

    async fn insert_comment(&self, comment: &Comment, deltas: &[CounterDelta]) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        begin_immediate(&mut conn).await?;
        let result = Self::write_comment(&mut conn, comment, deltas).await;
        finish(&mut conn, result).await
    }

    async fn list_comment_threads(
        &self,
        snippet: SnippetId,
        page: PageRequest,
    ) -> Result<Page<CommentThread>> {
        let snippet_str = snippet.to_string();

        let query = Query::select()
            .expr(Expr::col(Comments::Id).count())
            .from(Comments::Table)
            .and_where(Expr::col(Comments::SnippetId).eq(&snippet_str))
            .and_where(Expr::col(Comments::ParentId).is_null())
            .to_string(SqliteQueryBuilder);

        let total: i64 = sqlx::query(&query).fetch_one(&self.pool).await?.try_get(0)?;

        let query = Query::select()
            .columns(COMMENT_COLUMNS)
            .from(Comments::Table)
            .and_where(Expr::col(Comments::SnippetId).eq(&snippet_str))
            .and_where(Expr::col(Comments::ParentId).is_null())
            .order_by(Comments::CreatedAt, Order::Desc)
            .order_by_expr(Expr::cust("rowid"), Order::Desc)
            .limit(u64::from(page.limit))
            .offset(page.offset())
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        let roots = rows.iter().map(comment_from_row).collect::<Result<Vec<_>>>()?;

        let replies = if roots.is_empty() {
            Vec::new()
        } else {
            let query = Query::select()
                .columns(COMMENT_COLUMNS)
                .from(Comments::Table)
                .and_where(Expr::col(Comments::SnippetId).eq(&snippet_str))
                .and_where(Expr::col(Comments::ParentId).is_not_null())
                .order_by(Comments::CreatedAt, Order::Asc)
                .order_by_expr(Expr::cust("rowid"), Order::Asc)
                .to_string(SqliteQueryBuilder);

            let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
            rows.iter().map(comment_from_row).collect::<Result<Vec<_>>>()?
        };

        Ok(Page::new(build_threads(roots, replies), page, total as u64))
    }

    async fn record_view(&self, view: &SnippetView, deltas: &[CounterDelta]) -> Result<()> {
        let mut conn = self.pool.acquire().await?;
        begin_immediate(&mut conn).await?;
        let result = Self::write_view(&mut conn, view, deltas).await;
        finish(&mut conn, result).await
    }

    async fn count_views(&self, snippet: SnippetId) -> Result<u64> {
        let query = Query::select()
            .expr(Expr::col(SnippetViews::SnippetId).count())
            .from(SnippetViews::Table)
            .and_where(Expr::col(SnippetViews::SnippetId).eq(snippet.to_string()))
            .to_string(SqliteQueryBuilder);

        let count: i64 = sqlx::query(&query).fetch_one(&self.pool).await?.try_get(0)?;
        Ok(count as u64)
    }
}
