//! Comment engine.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use crate::config::InteractionLimits;
use crate::error::{InteractionError, Result};
use crate::identity::Actor;
use crate::ledger::comment_deltas;
use crate::model::{
    Comment, CommentId, CommentThread, NotificationContext, NotificationKind, Page, PageRequest,
    Snippet, SnippetId,
};
use crate::services::notify::Notifier;
use crate::storage::ContentStore;

/// Message carried by the notification sent to the author of a replied-to comment.
pub const REPLY_MESSAGE: &str = "replied to your comment";

pub struct CommentEngine {
    content: Arc<dyn ContentStore>,
    notifier: Arc<Notifier>,
    max_depth: u32,
    max_length: usize,
}

impl CommentEngine {
    pub fn new(content: Arc<dyn ContentStore>, notifier: Arc<Notifier>, limits: &InteractionLimits) -> Self {
        Self {
            content,
            notifier,
            max_depth: limits.max_comment_depth,
            max_length: limits.max_comment_length,
        }
    }

    /// Add a top-level comment, or a reply when `parent` is given.
    pub async fn add(
        &self,
        actor: Actor,
        snippet: SnippetId,
        content: &str,
        parent: Option<CommentId>,
    ) -> Result<Comment> {
        actor.require()?;
        let content = content.trim();
        if content.is_empty() {
            return Err(InteractionError::Validation(
                "comment content is required".to_string(),
            ));
        }
        if content.chars().count() > self.max_length {
            return Err(InteractionError::Validation(format!(
                "comment exceeds {} characters",
                self.max_length
            )));
        }

        let author = actor.require_account(self.content.as_ref()).await?;
        let target = self.visible_snippet(actor, snippet).await?;
        let parent = match parent {
            Some(id) => match self.content.get_comment(id).await? {
                Some(p) if p.snippet == snippet => Some(p),
                _ => return Err(InteractionError::not_found("Comment", id)),
            },
            None => None,
        };
        let depth = parent.as_ref().map_or(0, |p| p.depth + 1);
        if depth > self.max_depth {
            return Err(InteractionError::Validation(format!(
                "replies are limited to depth {}",
                self.max_depth
            )));
        }

        let comment = Comment {
            id: CommentId::new(),
            snippet,
            author,
            parent: parent.as_ref().map(|p| p.id),
            depth,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        self.content
            .insert_comment(&comment, &comment_deltas(snippet))
            .await?;
        debug!(%author, %snippet, comment = %comment.id, depth, "Comment added");

        let context = NotificationContext::comment(snippet, comment.id);
        let parent_author = parent.as_ref().map(|p| p.author);
        if let Some(parent_author) = parent_author.filter(|a| *a != author) {
            self.notifier
                .notify(
                    parent_author,
                    NotificationKind::Comment,
                    author,
                    context.clone().with_message(REPLY_MESSAGE),
                )
                .await;
        }
        if target.owner != author {
            self.notifier
                .notify(target.owner, NotificationKind::Comment, author, context)
                .await;
        }

        Ok(comment)
    }

    /// Top-level comments newest first, replies nested under them oldest first.
    pub async fn list(
        &self,
        viewer: Actor,
        snippet: SnippetId,
        page: PageRequest,
    ) -> Result<Page<CommentThread>> {
        self.visible_snippet(viewer, snippet).await?;
        Ok(self.content.list_comment_threads(snippet, page).await?)
    }

    async fn visible_snippet(&self, viewer: Actor, id: SnippetId) -> Result<Snippet> {
        match self.content.get_snippet(id).await? {
            Some(snippet) if snippet.visible_to(viewer.id()) => Ok(snippet),
            _ => Err(InteractionError::not_found("Snippet", id)),
        }
    }
}
