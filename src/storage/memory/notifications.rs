//! NotificationStore for the memory backend.

use async_trait::async_trait;

use super::MemoryStore;
use crate::model::{Notification, Page, PageRequest, ReadSelection, UserId};
use crate::storage::helpers::paginate;
use crate::storage::{NotificationStore, Result, StorageError};

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert_notification(&self, notification: &Notification) -> Result<()> {
        if *self.fail_notifications.read().await {
            return Err(StorageError::Injected("notification insert".to_string()));
        }
        let mut state = self.state.write().await;
        if !state.users.contains_key(&notification.recipient) {
            return Err(StorageError::not_found("User", notification.recipient));
        }
        if state.notifications.iter().any(|n| n.id == notification.id) {
            return Err(StorageError::Conflict(format!(
                "notification {} exists",
                notification.id
            )));
        }
        state.notifications.push(notification.clone());
        Ok(())
    }

    async fn list_notifications(
        &self,
        recipient: UserId,
        page: PageRequest,
        unread_only: bool,
    ) -> Result<Page<Notification>> {
        let state = self.state.read().await;
        let mut items: Vec<Notification> = state
            .notifications
            .iter()
            .rev()
            .filter(|n| n.recipient == recipient && (!unread_only || !n.is_read))
            .cloned()
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(paginate(items, page))
    }

    async fn unread_count(&self, recipient: UserId) -> Result<u64> {
        let state = self.state.read().await;
        Ok(state
            .notifications
            .iter()
            .filter(|n| n.recipient == recipient && !n.is_read)
            .count() as u64)
    }

    async fn mark_read(&self, recipient: UserId, selection: &ReadSelection) -> Result<u64> {
        let mut state = self.state.write().await;
        let mut changed = 0;
        for n in state
            .notifications
            .iter_mut()
            .filter(|n| n.recipient == recipient && !n.is_read)
        {
            let selected = match selection {
                ReadSelection::All => true,
                ReadSelection::Ids(ids) => ids.contains(&n.id),
            };
            if selected {
                n.is_read = true;
                changed += 1;
            }
        }
        Ok(changed)
    }
}
