//! Shared storage helper functions.
//!
//! Timestamp encoding and in-process pagination used across storage backends.

use std::collections::HashMap;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::model::{Comment, CommentId, CommentThread, Page, PageRequest};

use super::{Result, StorageError};

/// Encode a timestamp for a TEXT column.
///
/// Fixed-width microsecond precision keeps lexical order equal to time order.
pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Decode a timestamp written by [`format_timestamp`].
pub fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StorageError::InvalidTimestamp(format!("'{raw}': {e}")))
}

/// Slice one page out of an already-ordered collection.
pub fn paginate<T>(items: Vec<T>, request: PageRequest) -> Page<T> {
    let total = items.len() as u64;
    let offset = usize::try_from(request.offset()).unwrap_or(usize::MAX);
    let page_items = items
        .into_iter()
        .skip(offset)
        .take(request.limit as usize)
        .collect();
    Page::new(page_items, request, total)
}

/// Attach replies to their roots.
///
/// `replies` must already be ordered oldest first; that order is kept inside
/// every thread. Replies whose parent is not reachable from `roots` are dropped.
pub fn build_threads(roots: Vec<Comment>, replies: Vec<Comment>) -> Vec<CommentThread> {
    let mut children: HashMap<CommentId, Vec<Comment>> = HashMap::new();
    for reply in replies {
        if let Some(parent) = reply.parent {
            children.entry(parent).or_default().push(reply);
        }
    }
    roots
        .into_iter()
        .map(|root| attach(root, &mut children))
        .collect()
}

fn attach(comment: Comment, children: &mut HashMap<CommentId, Vec<Comment>>) -> CommentThread {
    let replies = children
        .remove(&comment.id)
        .unwrap_or_default()
        .into_iter()
        .map(|reply| attach(reply, children))
        .collect();
    CommentThread { comment, replies }
}
