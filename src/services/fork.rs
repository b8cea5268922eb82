//! Fork engine.
//!
//! Clones a snippet into a new public snippet owned by the forker. The new
//! row, its tag links, the provenance row and both counter deltas commit in
//! one storage call; only the notification happens afterwards.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::info;

use crate::error::{InteractionError, Result};
use crate::identity::Actor;
use crate::ledger::fork_deltas;
use crate::model::{
    ForkDraft, ForkId, ForkRecord, NewSnippet, NotificationContext, NotificationKind, Snippet,
    SnippetDraft, SnippetId,
};
use crate::services::notify::Notifier;
use crate::storage::ContentStore;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForkOutcome {
    pub snippet: Snippet,
    pub provenance: ForkRecord,
}

impl ForkOutcome {
    pub fn new_snippet_id(&self) -> SnippetId {
        self.snippet.id
    }
}

pub struct ForkEngine {
    content: Arc<dyn ContentStore>,
    notifier: Arc<Notifier>,
    title_suffix: String,
}

impl ForkEngine {
    pub fn new(content: Arc<dyn ContentStore>, notifier: Arc<Notifier>, title_suffix: impl Into<String>) -> Self {
        Self {
            content,
            notifier,
            title_suffix: title_suffix.into(),
        }
    }

    pub async fn fork(&self, actor: Actor, original: SnippetId) -> Result<ForkOutcome> {
        let actor = actor.require_account(self.content.as_ref()).await?;
        let source = self
            .content
            .get_snippet(original)
            .await?
            .ok_or_else(|| InteractionError::not_found("Snippet", original))?;
        if !source.is_public && source.owner != actor {
            return Err(InteractionError::Forbidden(
                "private snippets can only be forked by their owner".to_string(),
            ));
        }
        let tags = self.content.snippet_tags(original).await?;

        let now = Utc::now();
        let forked = SnippetId::new();
        let draft = ForkDraft {
            snippet: NewSnippet {
                id: forked,
                owner: actor,
                draft: SnippetDraft {
                    title: format!("{} {}", source.title, self.title_suffix),
                    description: source.description.clone(),
                    code: source.code.clone(),
                    language: source.language.clone(),
                    topics: source.topics.clone(),
                    complexity: source.complexity.clone(),
                    is_public: true,
                    tags,
                },
                created_at: now,
            },
            provenance: ForkRecord {
                id: ForkId::new(),
                original,
                forked,
                created_at: now,
            },
        };

        let snippet = self
            .content
            .create_fork(&draft, &fork_deltas(original, actor))
            .await?;
        info!(%actor, %original, %forked, "Snippet forked");

        if source.owner != actor {
            self.notifier
                .notify(
                    source.owner,
                    NotificationKind::Fork,
                    actor,
                    NotificationContext::snippet(original),
                )
                .await;
        }

        Ok(ForkOutcome {
            snippet,
            provenance: draft.provenance,
        })
    }
}
