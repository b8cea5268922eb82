//! Domain types shared by the engines and the storage layer.
//!
//! Identifiers are UUID newtypes so a snippet id can never be handed to
//! something expecting a user id. Entities serialize in camelCase because the
//! presentation layer renders them as JSON.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! uuid_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Uuid);

        impl $name {
            /// Mint a fresh random identifier.
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }
    };
}

uuid_id!(
    /// Stable identity of an authenticated user.
    UserId
);
uuid_id!(SnippetId);
uuid_id!(CommentId);
uuid_id!(NotificationId);
uuid_id!(
    /// Identity of a fork provenance row.
    ForkId
);

/// Tags are owned by the (external) tag catalogue; only their ids travel here.
pub type TagId = i64;

// ============================================================================
// Users and snippets
// ============================================================================

/// A user profile together with its denormalized counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub follower_count: i64,
    pub following_count: i64,
    pub snippet_count: i64,
    pub total_likes_received: i64,
    pub created_at: DateTime<Utc>,
}

/// Registration payload.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub id: UserId,
    pub name: String,
}

impl NewUser {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: UserId::new(),
            name: name.into(),
        }
    }
}

/// A published snippet. The owner never changes after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Snippet {
    pub id: SnippetId,
    pub owner: UserId,
    pub title: String,
    pub description: Option<String>,
    pub code: String,
    pub language: String,
    pub topics: Vec<String>,
    pub complexity: Option<String>,
    pub is_public: bool,
    pub like_count: i64,
    pub comment_count: i64,
    pub view_count: i64,
    pub fork_count: i64,
    pub created_at: DateTime<Utc>,
}

impl Snippet {
    /// Private snippets are visible to their owner only.
    pub fn visible_to(&self, viewer: Option<UserId>) -> bool {
        self.is_public || viewer == Some(self.owner)
    }
}

/// Content of a snippet as submitted by its author.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnippetDraft {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub code: String,
    pub language: String,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub complexity: Option<String>,
    #[serde(default = "default_public")]
    pub is_public: bool,
    #[serde(default)]
    pub tags: Vec<TagId>,
}

fn default_public() -> bool {
    true
}

impl SnippetDraft {
    /// Minimal public draft, mostly useful for seeding.
    pub fn new(title: impl Into<String>, code: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            code: code.into(),
            language: language.into(),
            topics: Vec::new(),
            complexity: None,
            is_public: true,
            tags: Vec::new(),
        }
    }

    pub fn private(mut self) -> Self {
        self.is_public = false;
        self
    }

    pub fn with_tags(mut self, tags: impl IntoIterator<Item = TagId>) -> Self {
        self.tags = tags.into_iter().collect();
        self
    }
}

/// A snippet row about to be written, counters implicitly zero.
#[derive(Debug, Clone)]
pub struct NewSnippet {
    pub id: SnippetId,
    pub owner: UserId,
    pub draft: SnippetDraft,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Comments, forks, views
// ============================================================================

/// A comment; `depth` is 0 for top-level comments and `parent.depth + 1` for replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub snippet: SnippetId,
    pub author: UserId,
    pub parent: Option<CommentId>,
    pub depth: u32,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

/// A comment with its replies, oldest reply first, nested as deep as replies go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentThread {
    pub comment: Comment,
    pub replies: Vec<CommentThread>,
}

impl CommentThread {
    /// Number of comments in this thread, the root included.
    pub fn comment_count(&self) -> usize {
        1 + self.replies.iter().map(CommentThread::comment_count).sum::<usize>()
    }
}

/// Provenance row linking an original snippet to one of its forks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForkRecord {
    pub id: ForkId,
    pub original: SnippetId,
    pub forked: SnippetId,
    pub created_at: DateTime<Utc>,
}

/// Everything written by a single fork operation.
#[derive(Debug, Clone)]
pub struct ForkDraft {
    pub snippet: NewSnippet,
    pub provenance: ForkRecord,
}

/// One entry of the append-only view log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnippetView {
    pub snippet: SnippetId,
    pub viewer: Option<UserId>,
    pub origin_hash: Option<String>,
    pub client_signature: String,
    pub viewed_at: DateTime<Utc>,
}

// ============================================================================
// Relationships
// ============================================================================

/// The three toggled relationship kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RelationKind {
    Like,
    Bookmark,
    Follow,
}

impl RelationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RelationKind::Like => "like",
            RelationKind::Bookmark => "bookmark",
            RelationKind::Follow => "follow",
        }
    }
}

impl fmt::Display for RelationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A relationship target, typed by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    Like(SnippetId),
    Bookmark(SnippetId),
    Follow(UserId),
}

impl Relation {
    pub fn kind(&self) -> RelationKind {
        match self {
            Relation::Like(_) => RelationKind::Like,
            Relation::Bookmark(_) => RelationKind::Bookmark,
            Relation::Follow(_) => RelationKind::Follow,
        }
    }
}

/// A fully resolved relationship row: who, what, and whose content it touches.
///
/// `recipient` is the snippet owner for likes and bookmarks and the followed
/// user for follows. It receives counter deltas and notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RelationEdge {
    pub actor: UserId,
    pub relation: Relation,
    pub recipient: UserId,
}

/// Storage mutation requested for a relationship row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationOp {
    Insert,
    Delete,
}

/// Result of a relationship write.
///
/// `applied` is false when the row was already in the requested state (a
/// concurrent duplicate won the race); no counters moved in that case.
/// `counters_synced` is false when the row changed but the counter deltas
/// could not be written alongside it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelationWrite {
    pub applied: bool,
    pub counters_synced: bool,
}

impl RelationWrite {
    pub fn applied() -> Self {
        Self {
            applied: true,
            counters_synced: true,
        }
    }

    pub fn absorbed() -> Self {
        Self {
            applied: false,
            counters_synced: true,
        }
    }
}

// ============================================================================
// Notifications
// ============================================================================

/// Notification type as stored and rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Like,
    Comment,
    Follow,
    Fork,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Like => "like",
            NotificationKind::Comment => "comment",
            NotificationKind::Follow => "follow",
            NotificationKind::Fork => "fork",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(NotificationKind::Like),
            "comment" => Ok(NotificationKind::Comment),
            "follow" => Ok(NotificationKind::Follow),
            "fork" => Ok(NotificationKind::Fork),
            other => Err(format!("unknown notification kind '{other}'")),
        }
    }
}

/// Optional context attached to a notification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotificationContext {
    pub snippet: Option<SnippetId>,
    pub comment: Option<CommentId>,
    pub message: Option<String>,
}

impl NotificationContext {
    pub fn snippet(snippet: SnippetId) -> Self {
        Self {
            snippet: Some(snippet),
            ..Self::default()
        }
    }

    pub fn comment(snippet: SnippetId, comment: CommentId) -> Self {
        Self {
            snippet: Some(snippet),
            comment: Some(comment),
            message: None,
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: NotificationId,
    pub recipient: UserId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub actor: UserId,
    pub snippet: Option<SnippetId>,
    pub comment: Option<CommentId>,
    pub message: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

/// Which notifications a mark-read request covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadSelection {
    All,
    Ids(Vec<NotificationId>),
}

// ============================================================================
// Pagination
// ============================================================================

/// 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self { page: 1, limit: 20 }
    }
}

impl PageRequest {
    pub fn new(page: u32, limit: u32) -> Self {
        Self { page, limit }
    }

    /// Clamp page to >= 1 and limit to `[1, max_limit]`.
    pub fn normalized(self, max_limit: u32) -> Self {
        Self {
            page: self.page.max(1),
            limit: self.limit.clamp(1, max_limit.max(1)),
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.page.saturating_sub(1)) * u64::from(self.limit)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
    pub total: u64,
    pub total_pages: u64,
}

impl Pagination {
    pub fn new(request: PageRequest, total: u64) -> Self {
        let limit = u64::from(request.limit.max(1));
        Self {
            page: request.page,
            limit: request.limit,
            total,
            total_pages: total.div_ceil(limit),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, request: PageRequest, total: u64) -> Self {
        Self {
            items,
            pagination: Pagination::new(request, total),
        }
    }
}
