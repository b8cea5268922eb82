//! Toggle engine for likes, bookmarks and follows.
//!
//! A toggle reads the current row and requests the opposite state. The
//! relationship table's unique key is the real guard: a concurrent duplicate
//! that reaches storage second is absorbed and reported with `delta == 0`.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{InteractionError, Result};
use crate::identity::Actor;
use crate::ledger::{relation_deltas, CounterLedger};
use crate::model::{
    NotificationContext, NotificationKind, Relation, RelationEdge, RelationKind, RelationOp,
    UserId,
};
use crate::services::notify::Notifier;
use crate::storage::{ContentStore, RelationStore};

/// Result of a toggle or set.
///
/// `previous` lets the caller undo optimistic UI; `delta` is the counter
/// change actually applied (`-1`, `0` or `1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleOutcome {
    pub kind: RelationKind,
    pub previous: bool,
    pub active: bool,
    pub delta: i64,
    /// Like count of the snippet or follower count of the followed user.
    pub count: Option<i64>,
}

/// Current state of one relationship as seen by a (possibly anonymous) viewer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RelationStatus {
    pub kind: RelationKind,
    pub active: bool,
    pub count: Option<i64>,
}

pub struct ToggleEngine {
    content: Arc<dyn ContentStore>,
    relations: Arc<dyn RelationStore>,
    ledger: Arc<CounterLedger>,
    notifier: Arc<Notifier>,
}

impl ToggleEngine {
    pub fn new(
        content: Arc<dyn ContentStore>,
        relations: Arc<dyn RelationStore>,
        ledger: Arc<CounterLedger>,
        notifier: Arc<Notifier>,
    ) -> Self {
        Self {
            content,
            relations,
            ledger,
            notifier,
        }
    }

    /// Flip the relationship: create it if absent, delete it if present.
    pub async fn toggle(&self, actor: Actor, relation: Relation) -> Result<ToggleOutcome> {
        let edge = self.resolve(actor, relation).await?;
        let exists = self.relations.relation_exists(edge.actor, relation).await?;
        self.apply(edge, !exists).await
    }

    /// Converge on `desired`. Already being there is a no-op.
    pub async fn set(&self, actor: Actor, relation: Relation, desired: bool) -> Result<ToggleOutcome> {
        let edge = self.resolve(actor, relation).await?;
        let exists = self.relations.relation_exists(edge.actor, relation).await?;
        if exists == desired {
            debug!(actor = %edge.actor, kind = %relation.kind(), desired, "Relation already in requested state");
            return Ok(ToggleOutcome {
                kind: relation.kind(),
                previous: exists,
                active: exists,
                delta: 0,
                count: self.count(relation).await,
            });
        }
        self.apply(edge, desired).await
    }

    pub async fn status(&self, actor: Actor, relation: Relation) -> Result<RelationStatus> {
        self.target_owner(actor.id(), relation).await?;
        let active = match actor.id() {
            Some(id) => self.relations.relation_exists(id, relation).await?,
            None => false,
        };
        Ok(RelationStatus {
            kind: relation.kind(),
            active,
            count: self.count(relation).await,
        })
    }

    /// Check preconditions and find whose content the relation touches.
    ///
    /// Runs before any mutation; an error here means nothing was written.
    async fn resolve(&self, actor: Actor, relation: Relation) -> Result<RelationEdge> {
        let id = actor.require()?;
        if let Relation::Follow(target) = relation {
            if target == id {
                return Err(InteractionError::Validation(
                    "cannot follow yourself".to_string(),
                ));
            }
        }
        let actor = actor.require_account(self.content.as_ref()).await?;
        let recipient = self.target_owner(Some(actor), relation).await?;
        Ok(RelationEdge {
            actor,
            relation,
            recipient,
        })
    }

    async fn target_owner(&self, viewer: Option<UserId>, relation: Relation) -> Result<UserId> {
        match relation {
            Relation::Like(id) | Relation::Bookmark(id) => match self.content.get_snippet(id).await? {
                Some(snippet) if snippet.visible_to(viewer) => Ok(snippet.owner),
                _ => Err(InteractionError::not_found("Snippet", id)),
            },
            Relation::Follow(id) => match self.content.get_user(id).await? {
                Some(user) => Ok(user.id),
                None => Err(InteractionError::not_found("User", id)),
            },
        }
    }

    async fn apply(&self, edge: RelationEdge, desired: bool) -> Result<ToggleOutcome> {
        let kind = edge.relation.kind();
        let (op, sign) = if desired {
            (RelationOp::Insert, 1)
        } else {
            (RelationOp::Delete, -1)
        };
        let deltas = relation_deltas(&edge, sign);

        let write = self.relations.write_relation(&edge, op, &deltas).await?;
        if write.applied && !write.counters_synced {
            self.ledger.settle(&deltas).await;
        }

        let delta = if write.applied { sign } else { 0 };
        debug!(
            actor = %edge.actor,
            %kind,
            active = desired,
            applied = write.applied,
            "Relation written"
        );

        if write.applied && desired {
            self.notify(&edge).await;
        }

        Ok(ToggleOutcome {
            kind,
            previous: if write.applied { !desired } else { desired },
            active: desired,
            delta,
            count: self.count(edge.relation).await,
        })
    }

    async fn notify(&self, edge: &RelationEdge) {
        let (kind, context) = match edge.relation {
            Relation::Like(snippet) => (NotificationKind::Like, NotificationContext::snippet(snippet)),
            Relation::Follow(_) => (NotificationKind::Follow, NotificationContext::default()),
            Relation::Bookmark(_) => return,
        };
        if edge.recipient == edge.actor {
            return;
        }
        self.notifier
            .notify(edge.recipient, kind, edge.actor, context)
            .await;
    }

    /// Post-write count for the response. A failed read is not worth failing
    /// a committed toggle over.
    async fn count(&self, relation: Relation) -> Option<i64> {
        let count = match relation {
            Relation::Like(id) => self
                .content
                .get_snippet(id)
                .await
                .map(|s| s.map(|s| s.like_count)),
            Relation::Follow(id) => self
                .content
                .get_user(id)
                .await
                .map(|u| u.map(|u| u.follower_count)),
            Relation::Bookmark(_) => return None,
        };
        match count {
            Ok(count) => count,
            Err(e) => {
                warn!(kind = %relation.kind(), error = %e, "Count read after toggle failed");
                None
            }
        }
    }
}
