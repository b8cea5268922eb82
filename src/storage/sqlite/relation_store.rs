//! SQLite RelationStore implementation.
//!
//! The composite primary key on each relationship table is the guard against
//! concurrent duplicate toggles: a losing insert or delete touches zero rows
//! and its counter deltas are never applied.

use async_trait::async_trait;
use sea_query::{DynIden, Expr, IntoIden, OnConflict, Order, Query, SqliteQueryBuilder};
use sqlx::{Row, SqliteConnection, SqlitePool};

use super::rows::{apply_deltas, snippet_from_row, user_from_row, SNIPPET_COLUMNS, USER_COLUMNS};
use super::{begin_immediate, finish};
use crate::ledger::CounterDelta;
use crate::model::{
    Page, PageRequest, Relation, RelationEdge, RelationOp, RelationWrite, Snippet, User, UserId,
};
use crate::storage::helpers::format_timestamp;
use crate::storage::schema::{Bookmarks, Follows, Likes, Snippets, Users};
use crate::storage::{RelationStore, Result};

/// Table and key columns backing one relationship kind.
struct RelationTable {
    table: DynIden,
    actor: DynIden,
    target: DynIden,
    created_at: DynIden,
}

impl RelationTable {
    fn of(relation: Relation) -> (Self, String) {
        match relation {
            Relation::Like(snippet) => (
                Self {
                    table: Likes::Table.into_iden(),
                    actor: Likes::UserId.into_iden(),
                    target: Likes::SnippetId.into_iden(),
                    created_at: Likes::CreatedAt.into_iden(),
                },
                snippet.to_string(),
            ),
            Relation::Bookmark(snippet) => (
                Self {
                    table: Bookmarks::Table.into_iden(),
                    actor: Bookmarks::UserId.into_iden(),
                    target: Bookmarks::SnippetId.into_iden(),
                    created_at: Bookmarks::CreatedAt.into_iden(),
                },
                snippet.to_string(),
            ),
            Relation::Follow(user) => (
                Self {
                    table: Follows::Table.into_iden(),
                    actor: Follows::FollowerId.into_iden(),
                    target: Follows::FollowingId.into_iden(),
                    created_at: Follows::CreatedAt.into_iden(),
                },
                user.to_string(),
            ),
        }
    }
}

/// SQLite implementation of RelationStore.
pub struct SqliteRelationStore {
    pool: SqlitePool,
}

impl SqliteRelationStore {
    /// Create a new SQLite relation store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Mutate the row and, only if it actually changed, its counters.
    async fn write_in_tx(
        conn: &mut SqliteConnection,
        edge: &RelationEdge,
        op: RelationOp,
        deltas: &[CounterDelta],
    ) -> Result<RelationWrite> {
        let query = {
            let (t, target) = RelationTable::of(edge.relation);
            let actor = edge.actor.to_string();
            match op {
                RelationOp::Insert => Query::insert()
                    .into_table(t.table)
                    .columns([t.actor.clone(), t.target.clone(), t.created_at])
                    .values_panic([
                        actor.into(),
                        target.into(),
                        format_timestamp(&chrono::Utc::now()).into(),
                    ])
                    .on_conflict(OnConflict::columns([t.actor, t.target]).do_nothing().to_owned())
                    .to_string(SqliteQueryBuilder),
                RelationOp::Delete => Query::delete()
                    .from_table(t.table)
                    .and_where(Expr::col(t.actor).eq(actor))
                    .and_where(Expr::col(t.target).eq(target))
                    .to_string(SqliteQueryBuilder),
            }
        };

        let result = sqlx::query(&query).execute(&mut *conn).await?;
        if result.rows_affected() == 0 {
            return Ok(RelationWrite::absorbed());
        }

        apply_deltas(conn, deltas).await?;
        Ok(RelationWrite::applied())
    }

    fn count_query(table: DynIden, column: DynIden, value: String) -> String {
        Query::select()
            .expr(Expr::col(column.clone()).count())
            .from(table)
            .and_where(Expr::col(column).eq(value))
            .to_string(SqliteQueryBuilder)
    }

    async fn count(&self, query: String) -> Result<u64> {
        let total: i64 = sqlx::query(&query).fetch_one(&self.pool).await?.try_get(0)?;
        Ok(total as u64)
    }

    /// Users on one side of the follows table, newest follow first.
    async fn follow_page(
        &self,
        user: UserId,
        page: PageRequest,
        filter: Follows,
        join: Follows,
    ) -> Result<Page<User>> {
        let user_str = user.to_string();
        let total = self
            .count(Self::count_query(
                Follows::Table.into_iden(),
                filter.into_iden(),
                user_str.clone(),
            ))
            .await?;

        let query = Query::select()
            .columns(USER_COLUMNS.map(|c| (Users::Table, c)))
            .from(Follows::Table)
            .inner_join(
                Users::Table,
                Expr::col((Users::Table, Users::Id)).equals((Follows::Table, join)),
            )
            .and_where(Expr::col((Follows::Table, filter)).eq(user_str))
            .order_by((Follows::Table, Follows::CreatedAt), Order::Desc)
            .order_by_expr(Expr::cust("follows.rowid"), Order::Desc)
            .limit(u64::from(page.limit))
            .offset(page.offset())
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        let users = rows.iter().map(user_from_row).collect::<Result<Vec<_>>>()?;
        Ok(Page::new(users, page, total))
    }
}

#[async_trait]
impl RelationStore for SqliteRelationStore {
    async fn relation_exists(&self, actor: UserId, relation: Relation) -> Result<bool> {
        let query = {
            let (t, target) = RelationTable::of(relation);
            Query::select()
                .expr(Expr::val(1))
                .from(t.table)
                .and_where(Expr::col(t.actor).eq(actor.to_string()))
                .and_where(Expr::col(t.target).eq(target))
                .to_string(SqliteQueryBuilder)
        };

        let row = sqlx::query(&query).fetch_optional(&self.pool).await?;
        Ok(row.is_some())
    }

    async fn write_relation(
        &self,
        edge: &RelationEdge,
        op: RelationOp,
        deltas: &[CounterDelta],
    ) -> Result<RelationWrite> {
        let mut conn = self.pool.acquire().await?;
        begin_immediate(&mut conn).await?;
        let result = Self::write_in_tx(&mut conn, edge, op, deltas).await;
        finish(&mut conn, result).await
    }

    async fn followers(&self, user: UserId, page: PageRequest) -> Result<Page<User>> {
        self.follow_page(user, page, Follows::FollowingId, Follows::FollowerId)
            .await
    }

    async fn following(&self, user: UserId, page: PageRequest) -> Result<Page<User>> {
        self.follow_page(user, page, Follows::FollowerId, Follows::FollowingId)
            .await
    }

    async fn bookmarked_snippets(&self, user: UserId, page: PageRequest) -> Result<Page<Snippet>> {
        let user_str = user.to_string();
        let total = self
            .count(Self::count_query(
                Bookmarks::Table.into_iden(),
                Bookmarks::UserId.into_iden(),
                user_str.clone(),
            ))
            .await?;

        let query = Query::select()
            .columns(SNIPPET_COLUMNS.map(|c| (Snippets::Table, c)))
            .from(Bookmarks::Table)
            .inner_join(
                Snippets::Table,
                Expr::col((Snippets::Table, Snippets::Id))
                    .equals((Bookmarks::Table, Bookmarks::SnippetId)),
            )
            .and_where(Expr::col((Bookmarks::Table, Bookmarks::UserId)).eq(user_str))
            .order_by((Bookmarks::Table, Bookmarks::CreatedAt), Order::Desc)
            .order_by_expr(Expr::cust("bookmarks.rowid"), Order::Desc)
            .limit(u64::from(page.limit))
            .offset(page.offset())
            .to_string(SqliteQueryBuilder);

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        let snippets = rows.iter().map(snippet_from_row).collect::<Result<Vec<_>>>()?;
        Ok(Page::new(snippets, page, total))
    }
}
