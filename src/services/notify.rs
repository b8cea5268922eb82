//! Notification fan-out.
//!
//! Engines call [`Notifier::notify`] after their own write has committed.
//! Delivery is best effort: a failed or dropped notification is logged and
//! never reported to the caller of the triggering action.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::{Delivery, NotificationConfig};
use crate::model::{
    Notification, NotificationContext, NotificationId, NotificationKind, Page, PageRequest,
    Pagination, ReadSelection, UserId,
};
use crate::services::background::{Enqueue, Worker};
use crate::storage::{NotificationStore, Result};

/// What happened to one notification request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Recipient and actor were the same user.
    Suppressed,
    /// Written to storage.
    Stored,
    /// Handed to the background worker.
    Queued,
    /// Background queue full or closed.
    Dropped,
    /// Storage rejected the write.
    Failed,
}

/// A page of notifications plus the recipient's overall unread count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationFeed {
    pub items: Vec<Notification>,
    pub unread_count: u64,
    pub pagination: Pagination,
}

pub struct Notifier {
    store: Arc<dyn NotificationStore>,
    queue: Option<Worker<Notification>>,
}

impl Notifier {
    /// Writes inline, before `notify` returns.
    pub fn inline(store: Arc<dyn NotificationStore>) -> Self {
        Self { store, queue: None }
    }

    /// Build from configuration. Background delivery spawns a worker task and
    /// must be called from within a tokio runtime.
    pub fn new(store: Arc<dyn NotificationStore>, config: &NotificationConfig) -> Self {
        match config.delivery {
            Delivery::Inline => Self::inline(store),
            Delivery::Background => Self::background(store, config.channel_capacity),
        }
    }

    pub fn background(store: Arc<dyn NotificationStore>, capacity: usize) -> Self {
        let worker_store = store.clone();
        let queue = Worker::spawn("notifications", capacity, move |notification: Notification| {
            let store = worker_store.clone();
            async move {
                Self::write(store.as_ref(), &notification).await;
            }
        });
        Self {
            store,
            queue: Some(queue),
        }
    }

    /// Create an unread notification for `recipient` about something `actor` did.
    pub async fn notify(
        &self,
        recipient: UserId,
        kind: NotificationKind,
        actor: UserId,
        context: NotificationContext,
    ) -> Dispatch {
        if recipient == actor {
            debug!(%actor, %kind, "Self-notification suppressed");
            return Dispatch::Suppressed;
        }

        let notification = Notification {
            id: NotificationId::new(),
            recipient,
            kind,
            actor,
            snippet: context.snippet,
            comment: context.comment,
            message: context.message,
            is_read: false,
            created_at: Utc::now(),
        };

        match &self.queue {
            None => Self::write(self.store.as_ref(), &notification).await,
            Some(queue) => match queue.enqueue(notification).await {
                Enqueue::Queued => Dispatch::Queued,
                dropped => {
                    warn!(%recipient, %kind, reason = ?dropped, "Notification dropped");
                    Dispatch::Dropped
                }
            },
        }
    }

    async fn write(store: &dyn NotificationStore, notification: &Notification) -> Dispatch {
        match store.insert_notification(notification).await {
            Ok(()) => {
                debug!(
                    recipient = %notification.recipient,
                    kind = %notification.kind,
                    actor = %notification.actor,
                    "Notification stored"
                );
                Dispatch::Stored
            }
            Err(e) => {
                warn!(
                    recipient = %notification.recipient,
                    kind = %notification.kind,
                    actor = %notification.actor,
                    error = %e,
                    "Notification write failed"
                );
                Dispatch::Failed
            }
        }
    }

    /// Newest first, optionally unread only, with the unread total.
    pub async fn list(
        &self,
        recipient: UserId,
        page: PageRequest,
        unread_only: bool,
    ) -> Result<NotificationFeed> {
        let Page { items, pagination } = self
            .store
            .list_notifications(recipient, page, unread_only)
            .await?;
        let unread_count = self.store.unread_count(recipient).await?;
        Ok(NotificationFeed {
            items,
            unread_count,
            pagination,
        })
    }

    /// Flip `is_read` on the recipient's own notifications. Returns rows changed.
    pub async fn mark_read(&self, recipient: UserId, selection: &ReadSelection) -> Result<u64> {
        let changed = self.store.mark_read(recipient, selection).await?;
        debug!(%recipient, changed, "Notifications marked read");
        Ok(changed)
    }

    /// Stop accepting queued notifications and wait for the worker to drain.
    pub async fn shutdown(&self) {
        if let Some(queue) = &self.queue {
            queue.shutdown().await;
        }
    }
}
