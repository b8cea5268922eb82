//! Database schema definitions using sea-query.
//!
//! These define the table and column identifiers for type-safe query building.
//! The tables themselves are created by the migrations under `migrations/sqlite`.

use sea_query::Iden;

/// Users table schema.
#[derive(Iden)]
pub enum Users {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "name"]
    Name,
    #[iden = "follower_count"]
    FollowerCount,
    #[iden = "following_count"]
    FollowingCount,
    #[iden = "snippet_count"]
    SnippetCount,
    #[iden = "total_likes_received"]
    TotalLikesReceived,
    #[iden = "created_at"]
    CreatedAt,
}

/// Snippets table schema.
#[derive(Iden)]
pub enum Snippets {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "owner_id"]
    OwnerId,
    #[iden = "title"]
    Title,
    #[iden = "description"]
    Description,
    #[iden = "code"]
    Code,
    #[iden = "language"]
    Language,
    #[iden = "topics"]
    Topics,
    #[iden = "complexity"]
    Complexity,
    #[iden = "is_public"]
    IsPublic,
    #[iden = "like_count"]
    LikeCount,
    #[iden = "comment_count"]
    CommentCount,
    #[iden = "view_count"]
    ViewCount,
    #[iden = "fork_count"]
    ForkCount,
    #[iden = "created_at"]
    CreatedAt,
}

#[derive(Iden)]
pub enum SnippetTags {
    Table,
    #[iden = "snippet_id"]
    SnippetId,
    #[iden = "tag_id"]
    TagId,
}

/// Likes table schema. Bookmarks share the same shape.
#[derive(Iden)]
pub enum Likes {
    Table,
    #[iden = "user_id"]
    UserId,
    #[iden = "snippet_id"]
    SnippetId,
    #[iden = "created_at"]
    CreatedAt,
}

#[derive(Iden)]
pub enum Bookmarks {
    Table,
    #[iden = "user_id"]
    UserId,
    #[iden = "snippet_id"]
    SnippetId,
    #[iden = "created_at"]
    CreatedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum Follows {
    Table,
    #[iden = "follower_id"]
    FollowerId,
    #[iden = "following_id"]
    FollowingId,
    #[iden = "created_at"]
    CreatedAt,
}

/// Comments table schema.
#[derive(Iden)]
pub enum Comments {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "snippet_id"]
    SnippetId,
    #[iden = "user_id"]
    UserId,
    #[iden = "parent_id"]
    ParentId,
    #[iden = "depth"]
    Depth,
    #[iden = "content"]
    Content,
    #[iden = "created_at"]
    CreatedAt,
}

/// Fork provenance table schema.
#[derive(Iden)]
pub enum Forks {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "original_snippet_id"]
    OriginalSnippetId,
    #[iden = "forked_snippet_id"]
    ForkedSnippetId,
    #[iden = "created_at"]
    CreatedAt,
}

/// Append-only view log.
#[derive(Iden)]
pub enum SnippetViews {
    Table,
    #[iden = "snippet_id"]
    SnippetId,
    #[iden = "viewer_id"]
    ViewerId,
    #[iden = "origin_hash"]
    OriginHash,
    #[iden = "client_signature"]
    ClientSignature,
    #[iden = "created_at"]
    CreatedAt,
}

/// Notifications table schema.
#[derive(Iden)]
pub enum Notifications {
    Table,
    #[iden = "id"]
    Id,
    #[iden = "recipient_id"]
    RecipientId,
    #[iden = "kind"]
    Kind,
    #[iden = "actor_id"]
    ActorId,
    #[iden = "snippet_id"]
    SnippetId,
    #[iden = "comment_id"]
    CommentId,
    #[iden = "message"]
    Message,
    #[iden = "is_read"]
    IsRead,
    #[iden = "created_at"]
    CreatedAt,
}
