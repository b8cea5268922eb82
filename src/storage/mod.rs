//! Persistence gateway.
//!
//! Every engine reads and writes through the traits defined here. Writes that
//! must stay consistent with a denormalized counter take the counter deltas as
//! an argument so the backend can commit both together.
//!
//! Backends:
//! - `sqlite`: sqlx + sea-query, one `BEGIN IMMEDIATE` transaction per write
//! - `memory`: in-process maps behind a lock, with failure injection for tests

use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::config::{StorageConfig, StorageType};
use crate::ledger::CounterDelta;
use crate::model::{
    Comment, CommentId, CommentThread, ForkDraft, ForkRecord, NewSnippet, NewUser, Notification,
    Page, PageRequest, ReadSelection, Relation, RelationEdge, RelationOp, RelationWrite, Snippet,
    SnippetId, SnippetView, TagId, User, UserId,
};

pub mod helpers;
pub mod memory;
#[cfg(feature = "sqlite")]
pub mod schema;
#[cfg(feature = "sqlite")]
pub mod sqlite;

pub use memory::MemoryStore;
#[cfg(feature = "sqlite")]
pub use sqlite::{
    SqliteContentStore, SqliteCounterStore, SqliteNotificationStore, SqliteRelationStore,
};

/// Result type for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Unique-key violation or a lock the database could not wait out.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid UUID: {0}")]
    InvalidUuid(#[from] uuid::Error),

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Invalid stored data: {0}")]
    InvalidData(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[cfg(feature = "sqlite")]
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    #[cfg(feature = "sqlite")]
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure raised on purpose by the memory backend.
    #[error("Injected failure: {0}")]
    Injected(String),

    #[error("Unknown or unavailable storage backend: {0}")]
    UnknownBackend(String),
}

impl StorageError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Number of rows whose counters were rewritten by a reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub snippets_corrected: u64,
    pub users_corrected: u64,
}

impl ReconcileReport {
    pub fn total(&self) -> u64 {
        self.snippets_corrected + self.users_corrected
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Users, snippets, comments, forks and the view log.
///
/// Methods taking `deltas` apply them in the same unit of work as the row
/// they write: either both land or neither does.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn create_user(&self, user: &NewUser) -> Result<User>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>>;

    /// Insert a snippet and its tag links.
    async fn publish_snippet(&self, snippet: &NewSnippet, deltas: &[CounterDelta]) -> Result<Snippet>;

    async fn get_snippet(&self, id: SnippetId) -> Result<Option<Snippet>>;

    async fn snippet_tags(&self, id: SnippetId) -> Result<Vec<TagId>>;

    /// Insert the forked snippet, its tag links and the provenance row.
    ///
    /// Returns the new snippet.
    async fn create_fork(&self, draft: &ForkDraft, deltas: &[CounterDelta]) -> Result<Snippet>;

    /// Provenance rows pointing at `original`, oldest first.
    async fn forks_of(&self, original: SnippetId) -> Result<Vec<ForkRecord>>;

    async fn get_comment(&self, id: CommentId) -> Result<Option<Comment>>;

    async fn insert_comment(&self, comment: &Comment, deltas: &[CounterDelta]) -> Result<()>;

    /// Top-level comments newest first, each with its direct replies oldest first.
    async fn list_comment_threads(
        &self,
        snippet: SnippetId,
        page: PageRequest,
    ) -> Result<Page<CommentThread>>;

    /// Append a view log entry.
    async fn record_view(&self, view: &SnippetView, deltas: &[CounterDelta]) -> Result<()>;

    async fn count_views(&self, snippet: SnippetId) -> Result<u64>;
}

/// Likes, bookmarks and follows.
#[async_trait]
pub trait RelationStore: Send + Sync {
    async fn relation_exists(&self, actor: UserId, relation: Relation) -> Result<bool>;

    /// Insert or delete a relationship row.
    ///
    /// Inserting an existing row or deleting a missing one is absorbed:
    /// `applied` comes back false and no counter moves. Backends that cannot
    /// commit the counters with the row report `counters_synced: false`.
    async fn write_relation(
        &self,
        edge: &RelationEdge,
        op: RelationOp,
        deltas: &[CounterDelta],
    ) -> Result<RelationWrite>;

    /// Users following `user`, most recent follow first.
    async fn followers(&self, user: UserId, page: PageRequest) -> Result<Page<User>>;

    /// Users `user` follows, most recent follow first.
    async fn following(&self, user: UserId, page: PageRequest) -> Result<Page<User>>;

    /// Snippets bookmarked by `user`, most recent bookmark first.
    async fn bookmarked_snippets(&self, user: UserId, page: PageRequest) -> Result<Page<Snippet>>;
}

/// Denormalized counters.
///
/// Deltas are applied as atomic increments at the storage layer, never as a
/// read followed by a write.
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn adjust(&self, deltas: &[CounterDelta]) -> Result<()>;

    /// Recompute one snippet's counters. Returns true if anything drifted.
    async fn reconcile_snippet(&self, id: SnippetId) -> Result<bool>;

    /// Recompute one user's counters. Returns true if anything drifted.
    async fn reconcile_user(&self, id: UserId) -> Result<bool>;

    async fn reconcile_all(&self) -> Result<ReconcileReport>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert_notification(&self, notification: &Notification) -> Result<()>;

    /// Newest first.
    async fn list_notifications(
        &self,
        recipient: UserId,
        page: PageRequest,
        unread_only: bool,
    ) -> Result<Page<Notification>>;

    async fn unread_count(&self, recipient: UserId) -> Result<u64>;

    /// Flip `is_read` on rows owned by `recipient`. Returns rows changed.
    async fn mark_read(&self, recipient: UserId, selection: &ReadSelection) -> Result<u64>;
}

// ============================================================================
// Wiring
// ============================================================================

/// One handle per store trait, all backed by the same database.
#[derive(Clone)]
pub struct Stores {
    pub content: Arc<dyn ContentStore>,
    pub relations: Arc<dyn RelationStore>,
    pub counters: Arc<dyn CounterStore>,
    pub notifications: Arc<dyn NotificationStore>,
}

impl Stores {
    /// Use a single memory store for every trait.
    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            content: store.clone(),
            relations: store.clone(),
            counters: store.clone(),
            notifications: store,
        }
    }

    /// SQLite stores sharing one pool.
    #[cfg(feature = "sqlite")]
    pub fn sqlite(pool: sqlx::SqlitePool) -> Self {
        Self {
            content: Arc::new(SqliteContentStore::new(pool.clone())),
            relations: Arc::new(SqliteRelationStore::new(pool.clone())),
            counters: Arc::new(SqliteCounterStore::new(pool.clone())),
            notifications: Arc::new(SqliteNotificationStore::new(pool)),
        }
    }
}

/// Initialize storage based on configuration.
pub async fn init_storage(config: &StorageConfig) -> Result<Stores> {
    match config.storage_type {
        StorageType::Memory => {
            info!("Storage: in-process memory");
            Ok(Stores::memory(Arc::new(MemoryStore::new())))
        }
        #[cfg(feature = "sqlite")]
        StorageType::Sqlite => {
            info!(path = %config.sqlite.path, "Storage: sqlite");
            let pool = sqlite::connect(&config.sqlite).await?;
            if config.sqlite.run_migrations {
                sqlite::migrate(&pool).await?;
            }
            Ok(Stores::sqlite(pool))
        }
        #[cfg(not(feature = "sqlite"))]
        StorageType::Sqlite => {
            tracing::error!("SQLite storage requested but 'sqlite' feature is not enabled");
            Err(StorageError::UnknownBackend("sqlite".to_string()))
        }
    }
}
