//! SQLite NotificationStore implementation.

use async_trait::async_trait;
use sea_query::{Expr, Order, Query, SelectStatement, SqliteQueryBuilder};
use sqlx::{Row, SqlitePool};

use super::rows::{notification_from_row, NOTIFICATION_COLUMNS};
use crate::model::{Notification, Page, PageRequest, ReadSelection, UserId};
use crate::storage::helpers::format_timestamp;
use crate::storage::schema::Notifications;
use crate::storage::{NotificationStore, Result};

/// SQLite implementation of NotificationStore.
pub struct SqliteNotificationStore {
    pool: SqlitePool,
}

impl SqliteNotificationStore {
    /// Create a new SQLite notification store.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn scoped(query: &mut SelectStatement, recipient: UserId, unread_only: bool) {
        query
            .from(Notifications::Table)
            .and_where(Expr::col(Notifications::RecipientId).eq(recipient.to_string()));
        if unread_only {
            query.and_where(Expr::col(Notifications::IsRead).eq(false));
        }
    }

    async fn count(&self, recipient: UserId, unread_only: bool) -> Result<u64> {
        let query = {
            let mut select = Query::select();
            select.expr(Expr::col(Notifications::Id).count());
            Self::scoped(&mut select, recipient, unread_only);
            select.to_string(SqliteQueryBuilder)
        };

        let total: i64 = sqlx::query(&query).fetch_one(&self.pool).await?.try_get(0)?;
        Ok(total as u64)
    }
}

#[async_trait]
impl NotificationStore for SqliteNotificationStore {
    async fn insert_notification(&self, notification: &Notification) -> Result<()> {
        let query = Query::insert()
            .into_table(Notifications::Table)
            .columns(NOTIFICATION_COLUMNS)
            .values_panic([
                notification.id.to_string().into(),
                notification.recipient.to_string().into(),
                notification.kind.as_str().into(),
                notification.actor.to_string().into(),
                notification.snippet.map(|s| s.to_string()).into(),
                notification.comment.map(|c| c.to_string()).into(),
                notification.message.clone().into(),
                notification.is_read.into(),
                format_timestamp(&notification.created_at).into(),
            ])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&self.pool).await?;
        Ok(())
    }

    async fn list_notifications(
        &self,
        recipient: UserId,
        page: PageRequest,
        unread_only: bool,
    ) -> Result<Page<Notification>> {
        let total = self.count(recipient, unread_only).await?;

        let query = {
            let mut select = Query::select();
            select.columns(NOTIFICATION_COLUMNS);
            Self::scoped(&mut select, recipient, unread_only);
            select
                .order_by(Notifications::CreatedAt, Order::Desc)
                .order_by_expr(Expr::cust("rowid"), Order::Desc)
                .limit(u64::from(page.limit))
                .offset(page.offset())
                .to_string(SqliteQueryBuilder)
        };

        let rows = sqlx::query(&query).fetch_all(&self.pool).await?;
        let items = rows
            .iter()
            .map(notification_from_row)
            .collect::<Result<Vec<_>>>()?;
        Ok(Page::new(items, page, total))
    }

    async fn unread_count(&self, recipient: UserId) -> Result<u64> {
        self.count(recipient, true).await
    }

    async fn mark_read(&self, recipient: UserId, selection: &ReadSelection) -> Result<u64> {
        if matches!(selection, ReadSelection::Ids(ids) if ids.is_empty()) {
            return Ok(0);
        }
        let query = {
            let mut update = Query::update();
            update
                .table(Notifications::Table)
                .value(Notifications::IsRead, true)
                .and_where(Expr::col(Notifications::RecipientId).eq(recipient.to_string()))
                .and_where(Expr::col(Notifications::IsRead).eq(false));
            if let ReadSelection::Ids(ids) = selection {
                update.and_where(
                    Expr::col(Notifications::Id).is_in(ids.iter().map(|id| id.to_string())),
                );
            }
            update.to_string(SqliteQueryBuilder)
        };
        let result = sqlx::query(&query).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
