//! Row decoding and shared write helpers for the SQLite stores.

use std::str::FromStr;

use sea_query::{Alias, Expr, Query, SqliteQueryBuilder};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::ledger::CounterDelta;
use crate::model::{
    Comment, CommentId, ForkId, ForkRecord, NewSnippet, Notification, NotificationId, Snippet,
    SnippetId, UserId, User,
};
use crate::storage::helpers::{format_timestamp, parse_timestamp};
use crate::storage::schema::{Comments, Forks, Notifications, SnippetTags, Snippets, Users};
use crate::storage::{Result, StorageError};

pub(super) const USER_COLUMNS: [Users; 7] = [
    Users::Id,
    Users::Name,
    Users::FollowerCount,
    Users::FollowingCount,
    Users::SnippetCount,
    Users::TotalLikesReceived,
    Users::CreatedAt,
];

pub(super) const SNIPPET_COLUMNS: [Snippets; 14] = [
    Snippets::Id,
    Snippets::OwnerId,
    Snippets::Title,
    Snippets::Description,
    Snippets::Code,
    Snippets::Language,
    Snippets::Topics,
    Snippets::Complexity,
    Snippets::IsPublic,
    Snippets::LikeCount,
    Snippets::CommentCount,
    Snippets::ViewCount,
    Snippets::ForkCount,
    Snippets::CreatedAt,
];

pub(super) const COMMENT_COLUMNS: [Comments; 7] = [
    Comments::Id,
    Comments::SnippetId,
    Comments::UserId,
    Comments::ParentId,
    Comments::Depth,
    Comments::Content,
    Comments::CreatedAt,
];

pub(super) const NOTIFICATION_COLUMNS: [Notifications; 9] = [
    Notifications::Id,
    Notifications::RecipientId,
    Notifications::Kind,
    Notifications::ActorId,
    Notifications::SnippetId,
    Notifications::CommentId,
    Notifications::Message,
    Notifications::IsRead,
    Notifications::CreatedAt,
];

fn id<T: FromStr<Err = uuid::Error>>(row: &SqliteRow, column: &str) -> Result<T> {
    let raw: String = row.try_get(column)?;
    Ok(T::from_str(&raw)?)
}

fn optional_id<T: FromStr<Err = uuid::Error>>(row: &SqliteRow, column: &str) -> Result<Option<T>> {
    let raw: Option<String> = row.try_get(column)?;
    raw.map(|s| T::from_str(&s)).transpose().map_err(StorageError::from)
}

fn timestamp(row: &SqliteRow, column: &str) -> Result<chrono::DateTime<chrono::Utc>> {
    let raw: String = row.try_get(column)?;
    parse_timestamp(&raw)
}

pub(super) fn user_from_row(row: &SqliteRow) -> Result<User> {
    Ok(User {
        id: id::<UserId>(row, "id")?,
        name: row.try_get("name")?,
        follower_count: row.try_get("follower_count")?,
        following_count: row.try_get("following_count")?,
        snippet_count: row.try_get("snippet_count")?,
        total_likes_received: row.try_get("total_likes_received")?,
        created_at: timestamp(row, "created_at")?,
    })
}

pub(super) fn snippet_from_row(row: &SqliteRow) -> Result<Snippet> {
    let topics: String = row.try_get("topics")?;
    Ok(Snippet {
        id: id::<SnippetId>(row, "id")?,
        owner: id::<UserId>(row, "owner_id")?,
        title: row.try_get("title")?,
        description: row.try_get("description")?,
        code: row.try_get("code")?,
        language: row.try_get("language")?,
        topics: serde_json::from_str(&topics)?,
        complexity: row.try_get("complexity")?,
        is_public: row.try_get("is_public")?,
        like_count: row.try_get("like_count")?,
        comment_count: row.try_get("comment_count")?,
        view_count: row.try_get("view_count")?,
        fork_count: row.try_get("fork_count")?,
        created_at: timestamp(row, "created_at")?,
    })
}

pub(super) fn comment_from_row(row: &SqliteRow) -> Result<Comment> {
    let depth: i64 = row.try_get("depth")?;
    let depth = u32::try_from(depth)
        .map_err(|_| StorageError::InvalidData(format!("comment depth {depth} out of range")))?;
    Ok(Comment {
        id: id::<CommentId>(row, "id")?,
        snippet: id::<SnippetId>(row, "snippet_id")?,
        author: id::<UserId>(row, "user_id")?,
        parent: optional_id::<CommentId>(row, "parent_id")?,
        depth,
        content: row.try_get("content")?,
        created_at: timestamp(row, "created_at")?,
    })
}

pub(super) fn fork_from_row(row: &SqliteRow) -> Result<ForkRecord> {
    Ok(ForkRecord {
        id: id::<ForkId>(row, "id")?,
        original: id::<SnippetId>(row, "original_snippet_id")?,
        forked: id::<SnippetId>(row, "forked_snippet_id")?,
        created_at: timestamp(row, "created_at")?,
    })
}

pub(super) fn notification_from_row(row: &SqliteRow) -> Result<Notification> {
    let kind: String = row.try_get("kind")?;
    Ok(Notification {
        id: id::<NotificationId>(row, "id")?,
        recipient: id::<UserId>(row, "recipient_id")?,
        kind: kind.parse().map_err(StorageError::InvalidData)?,
        actor: id::<UserId>(row, "actor_id")?,
        snippet: optional_id::<SnippetId>(row, "snippet_id")?,
        comment: optional_id::<CommentId>(row, "comment_id")?,
        message: row.try_get("message")?,
        is_read: row.try_get("is_read")?,
        created_at: timestamp(row, "created_at")?,
    })
}

/// The stored form of a freshly written snippet. Counters start at zero.
pub(super) fn snippet_from_new(snippet: &NewSnippet) -> Snippet {
    let draft = &snippet.draft;
    Snippet {
        id: snippet.id,
        owner: snippet.owner,
        title: draft.title.clone(),
        description: draft.description.clone(),
        code: draft.code.clone(),
        language: draft.language.clone(),
        topics: draft.topics.clone(),
        complexity: draft.complexity.clone(),
        is_public: draft.is_public,
        like_count: 0,
        comment_count: 0,
        view_count: 0,
        fork_count: 0,
        created_at: snippet.created_at,
    }
}

/// Insert a snippet row and its tag links within an already-started transaction.
pub(super) async fn insert_snippet(conn: &mut SqliteConnection, snippet: &NewSnippet) -> Result<()> {
    let draft = &snippet.draft;
    let topics = serde_json::to_string(&draft.topics)?;

    let query = Query::insert()
        .into_table(Snippets::Table)
        .columns([
            Snippets::Id,
            Snippets::OwnerId,
            Snippets::Title,
            Snippets::Description,
            Snippets::Code,
            Snippets::Language,
            Snippets::Topics,
            Snippets::Complexity,
            Snippets::IsPublic,
            Snippets::CreatedAt,
        ])
        .values_panic([
            snippet.id.to_string().into(),
            snippet.owner.to_string().into(),
            draft.title.clone().into(),
            draft.description.clone().into(),
            draft.code.clone().into(),
            draft.language.clone().into(),
            topics.into(),
            draft.complexity.clone().into(),
            draft.is_public.into(),
            format_timestamp(&snippet.created_at).into(),
        ])
        .to_string(SqliteQueryBuilder);

    sqlx::query(&query).execute(&mut *conn).await?;

    for tag in &draft.tags {
        let query = Query::insert()
            .into_table(SnippetTags::Table)
            .columns([SnippetTags::SnippetId, SnippetTags::TagId])
            .values_panic([snippet.id.to_string().into(), (*tag).into()])
            .to_string(SqliteQueryBuilder);

        sqlx::query(&query).execute(&mut *conn).await?;
    }

    Ok(())
}

pub(super) async fn insert_fork_record(conn: &mut SqliteConnection, record: &ForkRecord) -> Result<()> {
    let query = Query::insert()
        .into_table(Forks::Table)
        .columns([
            Forks::Id,
            Forks::OriginalSnippetId,
            Forks::ForkedSnippetId,
            Forks::CreatedAt,
        ])
        .values_panic([
            record.id.to_string().into(),
            record.original.to_string().into(),
            record.forked.to_string().into(),
            format_timestamp(&record.created_at).into(),
        ])
        .to_string(SqliteQueryBuilder);

    sqlx::query(&query).execute(&mut *conn).await?;
    Ok(())
}

/// Apply counter deltas as in-place increments, clamped at zero.
///
/// A delta aimed at a missing row fails with `NotFound` so the caller's
/// transaction rolls back instead of committing a write with no counter.
pub(super) async fn apply_deltas(conn: &mut SqliteConnection, deltas: &[CounterDelta]) -> Result<()> {
    for delta in deltas {
        if delta.delta() == 0 {
            continue;
        }

        let (query, entity, target) = match delta {
            CounterDelta::Snippet { id, counter, delta } => {
                let column = counter.column();
                let query = Query::update()
                    .table(Snippets::Table)
                    .value(
                        Alias::new(column),
                        Expr::cust_with_values(format!("MAX({column} + ?, 0)"), [*delta]),
                    )
                    .and_where(Expr::col(Snippets::Id).eq(id.to_string()))
                    .to_string(SqliteQueryBuilder);
                (query, "Snippet", id.to_string())
            }
            CounterDelta::User { id, counter, delta } => {
                let column = counter.column();
                let query = Query::update()
                    .table(Users::Table)
                    .value(
                        Alias::new(column),
                        Expr::cust_with_values(format!("MAX({column} + ?, 0)"), [*delta]),
                    )
                    .and_where(Expr::col(Users::Id).eq(id.to_string()))
                    .to_string(SqliteQueryBuilder);
                (query, "User", id.to_string())
            }
        };

        let result = sqlx::query(&query).execute(&mut *conn).await?;
        if result.rows_affected() == 0 {
            return Err(StorageError::not_found(entity, target));
        }
    }

    Ok(())
}
