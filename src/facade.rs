//! In-process interaction service.
//!
//! Wires the stores, the counter ledger, the notifier and the engines into one
//! handle the presentation layer can call directly.
//!
//! # Example
//!
//! ```ignore
//! use snipsocial::config::Config;
//! use snipsocial::facade::InteractionService;
//! use snipsocial::identity::Actor;
//!
//! let service = InteractionService::builder(Config::for_test()).build().await?;
//!
//! let outcome = service.toggle_like(Actor::user(viewer), snippet_id).await?;
//! assert!(outcome.active);
//!
//! let feed = service.list_notifications(Actor::user(owner), None, false).await?;
//! ```

use std::sync::Arc;

use backon::Retryable;
use chrono::Utc;
use tracing::{info, warn};

use crate::config::{Config, InteractionLimits};
use crate::error::{InteractionError, Result};
use crate::identity::Actor;
use crate::ledger::{publish_deltas, CounterLedger, CounterTarget};
use crate::model::{
    Comment, CommentId, CommentThread, NewSnippet, NewUser, Page, PageRequest, ReadSelection,
    Relation, Snippet, SnippetDraft, SnippetId, User, UserId,
};
use crate::services::{
    origin_hash, CommentEngine, ForkEngine, ForkOutcome, NotificationFeed, Notifier,
    RelationStatus, ToggleEngine, ToggleOutcome, Tracked, ViewTracker,
};
use crate::storage::{init_storage, ReconcileReport, StorageError, Stores};
use crate::utils::retry::{conflict_backoff, is_retryable};

/// Builder for [`InteractionService`].
pub struct InteractionServiceBuilder {
    config: Config,
    stores: Option<Stores>,
}

impl InteractionServiceBuilder {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            stores: None,
        }
    }

    /// Use already-opened stores instead of the ones `config.storage` describes.
    pub fn with_stores(mut self, stores: Stores) -> Self {
        self.stores = Some(stores);
        self
    }

    /// Build the service. Background delivery spawns worker tasks, so this
    /// must run inside a tokio runtime.
    pub async fn build(self) -> std::result::Result<InteractionService, StorageError> {
        let stores = match self.stores {
            Some(stores) => stores,
            None => init_storage(&self.config.storage).await?,
        };
        let config = self.config;

        let ledger = Arc::new(CounterLedger::new(stores.counters.clone()));
        let notifier = Arc::new(Notifier::new(
            stores.notifications.clone(),
            &config.notifications,
        ));
        let views = ViewTracker::new(
            stores.content.clone(),
            &config.views,
            config.limits.max_client_signature_length,
        );
        let toggles = ToggleEngine::new(
            stores.content.clone(),
            stores.relations.clone(),
            ledger.clone(),
            notifier.clone(),
        );
        let forks = ForkEngine::new(
            stores.content.clone(),
            notifier.clone(),
            config.limits.fork_title_suffix.clone(),
        );
        let comments = CommentEngine::new(stores.content.clone(), notifier.clone(), &config.limits);

        info!(
            notifications = ?config.notifications.delivery,
            views = ?config.views.delivery,
            "Interaction service ready"
        );

        Ok(InteractionService {
            stores,
            limits: config.limits,
            origin_salt: config.views.origin_salt,
            ledger,
            notifier,
            views,
            toggles,
            forks,
            comments,
        })
    }
}

/// Entry point for every interaction.
///
/// Writes that lose a lock or unique-key race are retried with
/// [`conflict_backoff`]; everything else surfaces on the first failure.
pub struct InteractionService {
    stores: Stores,
    limits: InteractionLimits,
    origin_salt: String,
    ledger: Arc<CounterLedger>,
    notifier: Arc<Notifier>,
    views: ViewTracker,
    toggles: ToggleEngine,
    forks: ForkEngine,
    comments: CommentEngine,
}

impl InteractionService {
    pub fn builder(config: Config) -> InteractionServiceBuilder {
        InteractionServiceBuilder::new(config)
    }

    /// Build from configuration, opening the configured storage.
    pub async fn from_config(config: Config) -> std::result::Result<Self, StorageError> {
        Self::builder(config).build().await
    }

    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    pub fn limits(&self) -> &InteractionLimits {
        &self.limits
    }

    // ------------------------------------------------------------------------
    // Users and snippets
    // ------------------------------------------------------------------------

    pub async fn register_user(&self, user: NewUser) -> Result<User> {
        let name = user.name.trim();
        if name.is_empty() {
            return Err(InteractionError::Validation("user name is required".to_string()));
        }
        let user = NewUser {
            id: user.id,
            name: name.to_string(),
        };
        Ok(self.stores.content.create_user(&user).await?)
    }

    /// Publish a snippet owned by the actor; `snippetCount` moves in the same write.
    pub async fn publish_snippet(&self, actor: Actor, draft: SnippetDraft) -> Result<Snippet> {
        actor.require()?;
        if draft.title.trim().is_empty() {
            return Err(InteractionError::Validation("title is required".to_string()));
        }
        if draft.code.trim().is_empty() {
            return Err(InteractionError::Validation("code is required".to_string()));
        }
        let owner = actor.require_account(self.stores.content.as_ref()).await?;

        let snippet = NewSnippet {
            id: SnippetId::new(),
            owner,
            draft,
            created_at: Utc::now(),
        };
        let deltas = publish_deltas(owner);
        let created = (|| async {
            self.stores
                .content
                .publish_snippet(&snippet, &deltas)
                .await
                .map_err(InteractionError::from)
        })
        .retry(conflict_backoff())
        .when(is_retryable)
        .await?;
        info!(%owner, snippet = %created.id, "Snippet published");
        Ok(created)
    }

    pub async fn get_snippet(&self, viewer: Actor, id: SnippetId) -> Result<Snippet> {
        match self.stores.content.get_snippet(id).await? {
            Some(snippet) if snippet.visible_to(viewer.id()) => Ok(snippet),
            _ => Err(InteractionError::not_found("Snippet", id)),
        }
    }

    pub async fn get_user(&self, id: UserId) -> Result<User> {
        self.stores
            .content
            .get_user(id)
            .await?
            .ok_or_else(|| InteractionError::not_found("User", id))
    }

    // ------------------------------------------------------------------------
    // Toggles
    // ------------------------------------------------------------------------

    pub async fn toggle_like(&self, actor: Actor, snippet: SnippetId) -> Result<ToggleOutcome> {
        self.toggle(actor, Relation::Like(snippet)).await
    }

    pub async fn toggle_bookmark(&self, actor: Actor, snippet: SnippetId) -> Result<ToggleOutcome> {
        self.toggle(actor, Relation::Bookmark(snippet)).await
    }

    pub async fn toggle_follow(&self, actor: Actor, target: UserId) -> Result<ToggleOutcome> {
        self.toggle(actor, Relation::Follow(target)).await
    }

    pub async fn set_liked(&self, actor: Actor, snippet: SnippetId, liked: bool) -> Result<ToggleOutcome> {
        self.set(actor, Relation::Like(snippet), liked).await
    }

    pub async fn set_bookmarked(
        &self,
        actor: Actor,
        snippet: SnippetId,
        bookmarked: bool,
    ) -> Result<ToggleOutcome> {
        self.set(actor, Relation::Bookmark(snippet), bookmarked).await
    }

    pub async fn set_following(&self, actor: Actor, target: UserId, following: bool) -> Result<ToggleOutcome> {
        self.set(actor, Relation::Follow(target), following).await
    }

    pub async fn like_status(&self, actor: Actor, snippet: SnippetId) -> Result<RelationStatus> {
        self.toggles.status(actor, Relation::Like(snippet)).await
    }

    pub async fn bookmark_status(&self, actor: Actor, snippet: SnippetId) -> Result<RelationStatus> {
        self.toggles.status(actor, Relation::Bookmark(snippet)).await
    }

    pub async fn follow_status(&self, actor: Actor, target: UserId) -> Result<RelationStatus> {
        self.toggles.status(actor, Relation::Follow(target)).await
    }

    async fn toggle(&self, actor: Actor, relation: Relation) -> Result<ToggleOutcome> {
        (|| async { self.toggles.toggle(actor, relation).await })
            .retry(conflict_backoff())
            .when(is_retryable)
            .await
    }

    async fn set(&self, actor: Actor, relation: Relation, desired: bool) -> Result<ToggleOutcome> {
        (|| async { self.toggles.set(actor, relation, desired).await })
            .retry(conflict_backoff())
            .when(is_retryable)
            .await
    }

    // ------------------------------------------------------------------------
    // Forks and comments
    // ------------------------------------------------------------------------

    pub async fn fork(&self, actor: Actor, snippet: SnippetId) -> Result<ForkOutcome> {
        (|| async { self.forks.fork(actor, snippet).await })
            .retry(conflict_backoff())
            .when(is_retryable)
            .await
    }

    pub async fn add_comment(
        &self,
        actor: Actor,
        snippet: SnippetId,
        content: &str,
        parent: Option<CommentId>,
    ) -> Result<Comment> {
        (|| async { self.comments.add(actor, snippet, content, parent).await })
            .retry(conflict_backoff())
            .when(is_retryable)
            .await
    }

    pub async fn list_comments(
        &self,
        viewer: Actor,
        snippet: SnippetId,
        page: Option<PageRequest>,
    ) -> Result<Page<CommentThread>> {
        self.comments.list(viewer, snippet, self.limits.page(page)).await
    }

    // ------------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------------

    /// Hash a network origin with the configured salt.
    pub fn hash_origin(&self, origin: &str) -> String {
        origin_hash(&self.origin_salt, origin)
    }

    /// Record a view.
    ///
    /// Only a missing or hidden snippet is reported; every other tracking
    /// failure is logged and swallowed.
    pub async fn record_view(
        &self,
        viewer: Actor,
        snippet: SnippetId,
        origin_hash: Option<String>,
        client_signature: &str,
    ) -> Result<Tracked> {
        match self.stores.content.get_snippet(snippet).await {
            Ok(Some(s)) if s.visible_to(viewer.id()) => {}
            Ok(_) => return Err(InteractionError::not_found("Snippet", snippet)),
            Err(e) => {
                warn!(%snippet, error = %e, "View tracking skipped, snippet lookup failed");
                return Ok(Tracked::Failed);
            }
        }
        Ok(self
            .views
            .record(viewer.id(), snippet, origin_hash, client_signature)
            .await)
    }

    // ------------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------------

    pub async fn list_notifications(
        &self,
        actor: Actor,
        page: Option<PageRequest>,
        unread_only: bool,
    ) -> Result<NotificationFeed> {
        let recipient = actor.require()?;
        Ok(self
            .notifier
            .list(recipient, self.limits.page(page), unread_only)
            .await?)
    }

    pub async fn mark_notifications_read(&self, actor: Actor, selection: ReadSelection) -> Result<u64> {
        let recipient = actor.require()?;
        Ok(self.notifier.mark_read(recipient, &selection).await?)
    }

    // ------------------------------------------------------------------------
    // Listings
    // ------------------------------------------------------------------------

    pub async fn followers(&self, user: UserId, page: Option<PageRequest>) -> Result<Page<User>> {
        self.get_user(user).await?;
        Ok(self
            .stores
            .relations
            .followers(user, self.limits.page(page))
            .await?)
    }

    pub async fn following(&self, user: UserId, page: Option<PageRequest>) -> Result<Page<User>> {
        self.get_user(user).await?;
        Ok(self
            .stores
            .relations
            .following(user, self.limits.page(page))
            .await?)
    }

    /// The actor's own bookmarks, newest first.
    pub async fn bookmarks(&self, actor: Actor, page: Option<PageRequest>) -> Result<Page<Snippet>> {
        let user = actor.require()?;
        Ok(self
            .stores
            .relations
            .bookmarked_snippets(user, self.limits.page(page))
            .await?)
    }

    // ------------------------------------------------------------------------
    // Counters and lifecycle
    // ------------------------------------------------------------------------

    /// Recompute every denormalized counter from the relationship tables.
    pub async fn reconcile_counters(&self) -> Result<ReconcileReport> {
        Ok(self.ledger.reconcile_all().await?)
    }

    /// Recompute counters only for entities whose deltas failed to land.
    pub async fn reconcile_pending(&self) -> Result<ReconcileReport> {
        Ok(self.ledger.reconcile_pending().await?)
    }

    pub async fn pending_reconciliation(&self) -> Vec<CounterTarget> {
        self.ledger.pending().await
    }

    /// Drain background workers. Queued notifications and views are written
    /// before this returns; later ones are dropped.
    pub async fn shutdown(&self) {
        self.notifier.shutdown().await;
        self.views.shutdown().await;
        info!("Interaction service stopped");
    }
}
