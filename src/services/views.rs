//! View tracker.
//!
//! Every call appends a log row and bumps `view_count`; repeat views are not
//! suppressed. Tracking is telemetry: it never fails the request that
//! triggered it.

use std::sync::Arc;

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::warn;

use crate::config::{Delivery, ViewConfig};
use crate::ledger::view_deltas;
use crate::model::{SnippetId, SnippetView, UserId};
use crate::services::background::{Enqueue, Worker};
use crate::storage::ContentStore;

/// Lowercase hex SHA-256 of `salt` followed by `origin`.
pub fn origin_hash(salt: &str, origin: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(origin.as_bytes());
    hex::encode(hasher.finalize())
}

/// Cut `signature` to at most `max` characters.
fn truncate_chars(signature: &str, max: usize) -> String {
    match signature.char_indices().nth(max) {
        Some((end, _)) => signature[..end].to_string(),
        None => signature.to_string(),
    }
}

/// Outcome of one view request, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tracked {
    Recorded,
    Queued,
    Dropped,
    Failed,
}

pub struct ViewTracker {
    content: Arc<dyn ContentStore>,
    max_signature_len: usize,
    queue: Option<Worker<SnippetView>>,
}

impl ViewTracker {
    pub fn inline(content: Arc<dyn ContentStore>, max_signature_len: usize) -> Self {
        Self {
            content,
            max_signature_len,
            queue: None,
        }
    }

    /// Build from configuration. Background delivery spawns a worker task and
    /// must be called from within a tokio runtime.
    pub fn new(content: Arc<dyn ContentStore>, config: &ViewConfig, max_signature_len: usize) -> Self {
        match config.delivery {
            Delivery::Inline => Self::inline(content, max_signature_len),
            Delivery::Background => {
                Self::background(content, config.channel_capacity, max_signature_len)
            }
        }
    }

    pub fn background(content: Arc<dyn ContentStore>, capacity: usize, max_signature_len: usize) -> Self {
        let worker_content = content.clone();
        let queue = Worker::spawn("views", capacity, move |view: SnippetView| {
            let content = worker_content.clone();
            async move {
                Self::write(content.as_ref(), &view).await;
            }
        });
        Self {
            content,
            max_signature_len,
            queue: Some(queue),
        }
    }

    /// Record one view.
    ///
    /// Authenticated viewers are logged by id; `origin_hash` is kept only for
    /// anonymous viewers.
    pub async fn record(
        &self,
        viewer: Option<UserId>,
        snippet: SnippetId,
        origin_hash: Option<String>,
        client_signature: &str,
    ) -> Tracked {
        let view = SnippetView {
            snippet,
            viewer,
            origin_hash: if viewer.is_some() { None } else { origin_hash },
            client_signature: truncate_chars(client_signature, self.max_signature_len),
            viewed_at: Utc::now(),
        };

        match &self.queue {
            None => Self::write(self.content.as_ref(), &view).await,
            Some(queue) => match queue.enqueue(view).await {
                Enqueue::Queued => Tracked::Queued,
                dropped => {
                    warn!(%snippet, reason = ?dropped, "View dropped");
                    Tracked::Dropped
                }
            },
        }
    }

    async fn write(content: &dyn ContentStore, view: &SnippetView) -> Tracked {
        match content.record_view(view, &view_deltas(view.snippet)).await {
            Ok(()) => Tracked::Recorded,
            Err(e) => {
                warn!(snippet = %view.snippet, error = %e, "View tracking failed");
                Tracked::Failed
            }
        }
    }

    /// Stop accepting queued views and wait for the worker to drain.
    pub async fn shutdown(&self) {
        if let Some(queue) = &self.queue {
            queue.shutdown().await;
        }
    }
}
