//! Like, bookmark and follow toggles.

use snipsocial::model::{NotificationKind, RelationKind, SnippetId, UserId};
use snipsocial::{Actor, InteractionError, InteractionService};

use super::{private_snippet, snippet, unread, user};

pub async fn test_like_then_unlike(svc: &InteractionService) {
    let owner = user(svc, "like-owner").await;
    let fan = user(svc, "like-fan").await;
    let x = snippet(svc, owner).await;

    let liked = svc
        .toggle_like(Actor::user(fan), x.id)
        .await
        .expect("toggle should succeed");
    assert_eq!(liked.kind, RelationKind::Like);
    assert!(liked.active, "first toggle should like");
    assert!(!liked.previous);
    assert_eq!(liked.delta, 1);
    assert_eq!(liked.count, Some(1));

    let feed = svc
        .list_notifications(Actor::user(owner), None, false)
        .await
        .expect("list should succeed");
    assert_eq!(feed.items.len(), 1, "owner should get one notification");
    let n = &feed.items[0];
    assert_eq!(n.kind, NotificationKind::Like);
    assert_eq!(n.actor, fan);
    assert_eq!(n.recipient, owner);
    assert_eq!(n.snippet, Some(x.id));
    assert!(!n.is_read);

    let unliked = svc
        .toggle_like(Actor::user(fan), x.id)
        .await
        .expect("toggle should succeed");
    assert!(!unliked.active, "second toggle should unlike");
    assert!(unliked.previous);
    assert_eq!(unliked.delta, -1);
    assert_eq!(unliked.count, Some(0));

    // the earlier notification is neither removed nor read
    assert_eq!(unread(svc, owner).await, 1);
    let owner_row = svc.get_user(owner).await.expect("owner should exist");
    assert_eq!(owner_row.total_likes_received, 0);
}

pub async fn test_like_own_snippet_is_silent(svc: &InteractionService) {
    let owner = user(svc, "self-liker").await;
    let x = snippet(svc, owner).await;

    let outcome = svc
        .toggle_like(Actor::user(owner), x.id)
        .await
        .expect("toggle should succeed");

    assert!(outcome.active);
    assert_eq!(outcome.count, Some(1));
    assert_eq!(unread(svc, owner).await, 0, "self-like must not notify");
}

pub async fn test_toggle_requires_identity(svc: &InteractionService) {
    let owner = user(svc, "anon-target").await;
    let x = snippet(svc, owner).await;

    let err = svc.toggle_like(Actor::anonymous(), x.id).await.unwrap_err();
    assert!(matches!(err, InteractionError::Unauthorized));
    let err = svc.toggle_follow(Actor::anonymous(), owner).await.unwrap_err();
    assert!(matches!(err, InteractionError::Unauthorized));

    let x = svc.get_snippet(Actor::anonymous(), x.id).await.expect("snippet should exist");
    assert_eq!(x.like_count, 0);
}

pub async fn test_toggle_missing_target(svc: &InteractionService) {
    let fan = user(svc, "lost-fan").await;

    let err = svc
        .toggle_like(Actor::user(fan), SnippetId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, InteractionError::NotFound { entity: "Snippet", .. }));

    let err = svc
        .toggle_follow(Actor::user(fan), UserId::new())
        .await
        .unwrap_err();
    assert!(matches!(err, InteractionError::NotFound { entity: "User", .. }));
}

/// An identity with no account row writes nothing anywhere.
pub async fn test_unregistered_actor_is_unauthorized(svc: &InteractionService) {
    let owner = user(svc, "ghost-target").await;
    let x = snippet(svc, owner).await;
    let ghost = Actor::user(UserId::new());

    let err = svc.toggle_like(ghost, x.id).await.unwrap_err();
    assert!(matches!(err, InteractionError::Unauthorized));
    let err = svc.set_bookmarked(ghost, x.id, true).await.unwrap_err();
    assert!(matches!(err, InteractionError::Unauthorized));
    let err = svc.toggle_follow(ghost, owner).await.unwrap_err();
    assert!(matches!(err, InteractionError::Unauthorized));
    let err = svc.add_comment(ghost, x.id, "boo", None).await.unwrap_err();
    assert!(matches!(err, InteractionError::Unauthorized));
    let err = svc.fork(ghost, x.id).await.unwrap_err();
    assert!(matches!(err, InteractionError::Unauthorized));

    let x = svc.get_snippet(Actor::anonymous(), x.id).await.expect("snippet");
    assert_eq!((x.like_count, x.comment_count, x.fork_count), (0, 0, 0));
    let comments = svc
        .list_comments(Actor::anonymous(), x.id, None)
        .await
        .expect("list");
    assert!(comments.items.is_empty());
    let owner_row = svc.get_user(owner).await.expect("owner");
    assert_eq!(owner_row.follower_count, 0);
    assert_eq!(unread(svc, owner).await, 0);
}

pub async fn test_private_snippet_hidden(svc: &InteractionService) {
    let owner = user(svc, "private-owner").await;
    let other = user(svc, "private-other").await;
    let secret = private_snippet(svc, owner).await;

    let err = svc.toggle_like(Actor::user(other), secret.id).await.unwrap_err();
    assert!(matches!(err, InteractionError::NotFound { .. }));
    let err = svc
        .toggle_bookmark(Actor::user(other), secret.id)
        .await
        .unwrap_err();
    assert!(matches!(err, InteractionError::NotFound { .. }));

    let own = svc
        .toggle_bookmark(Actor::user(owner), secret.id)
        .await
        .expect("owner can bookmark their private snippet");
    assert!(own.active);
}

pub async fn test_self_follow_always_rejected(svc: &InteractionService) {
    let me = user(svc, "narcissus").await;
    let other = user(svc, "echo").await;

    for _ in 0..2 {
        let err = svc.toggle_follow(Actor::user(me), me).await.unwrap_err();
        assert!(matches!(err, InteractionError::Validation(_)));
        assert_eq!(err.status_code(), 400);
    }

    svc.toggle_follow(Actor::user(me), other)
        .await
        .expect("follow should succeed");
    let err = svc.set_following(Actor::user(me), me, true).await.unwrap_err();
    assert!(matches!(err, InteractionError::Validation(_)));

    let me_row = svc.get_user(me).await.expect("user should exist");
    assert_eq!(me_row.follower_count, 0);
    assert_eq!(me_row.following_count, 1);
}

pub async fn test_follow_counts_both_sides(svc: &InteractionService) {
    let star = user(svc, "star").await;
    let a = user(svc, "follower-a").await;
    let b = user(svc, "follower-b").await;

    let first = svc.toggle_follow(Actor::user(a), star).await.expect("follow");
    assert!(first.active);
    assert_eq!(first.count, Some(1));
    let second = svc.toggle_follow(Actor::user(b), star).await.expect("follow");
    assert_eq!(second.count, Some(2));

    let star_row = svc.get_user(star).await.expect("user should exist");
    assert_eq!(star_row.follower_count, 2);
    assert_eq!(star_row.following_count, 0);
    assert_eq!(svc.get_user(a).await.expect("user").following_count, 1);

    let feed = svc
        .list_notifications(Actor::user(star), None, false)
        .await
        .expect("list should succeed");
    assert_eq!(feed.items.len(), 2);
    assert!(feed.items.iter().all(|n| n.kind == NotificationKind::Follow));
    assert!(feed.items.iter().all(|n| n.snippet.is_none()));

    let unfollow = svc.toggle_follow(Actor::user(a), star).await.expect("unfollow");
    assert!(!unfollow.active);
    assert_eq!(unfollow.count, Some(1));
    assert_eq!(svc.get_user(a).await.expect("user").following_count, 0);
    assert_eq!(unread(svc, star).await, 2, "unfollow must not add or remove notifications");
}

pub async fn test_bookmark_is_independent_of_like(svc: &InteractionService) {
    let owner = user(svc, "bm-owner").await;
    let fan = user(svc, "bm-fan").await;
    let x = snippet(svc, owner).await;

    let bookmarked = svc
        .toggle_bookmark(Actor::user(fan), x.id)
        .await
        .expect("bookmark should succeed");
    assert!(bookmarked.active);
    assert_eq!(bookmarked.count, None);

    let like = svc.like_status(Actor::user(fan), x.id).await.expect("status");
    assert!(!like.active, "bookmarking must not like");
    assert_eq!(like.count, Some(0));
    assert_eq!(unread(svc, owner).await, 0, "bookmarks do not notify");

    svc.toggle_like(Actor::user(fan), x.id).await.expect("like");
    svc.toggle_bookmark(Actor::user(fan), x.id).await.expect("unbookmark");
    let like = svc.like_status(Actor::user(fan), x.id).await.expect("status");
    assert!(like.active, "unbookmarking must not unlike");
}

pub async fn test_set_converges(svc: &InteractionService) {
    let owner = user(svc, "set-owner").await;
    let fan = user(svc, "set-fan").await;
    let x = snippet(svc, owner).await;

    let on = svc.set_liked(Actor::user(fan), x.id, true).await.expect("set");
    assert_eq!((on.previous, on.active, on.delta), (false, true, 1));

    let again = svc.set_liked(Actor::user(fan), x.id, true).await.expect("set");
    assert_eq!((again.previous, again.active, again.delta), (true, true, 0));
    assert_eq!(again.count, Some(1));
    assert_eq!(unread(svc, owner).await, 1, "a no-op set must not notify");

    let off = svc.set_liked(Actor::user(fan), x.id, false).await.expect("set");
    assert_eq!((off.previous, off.active, off.delta), (true, false, -1));
    let off_again = svc.set_liked(Actor::user(fan), x.id, false).await.expect("set");
    assert_eq!(off_again.delta, 0);
    assert_eq!(off_again.count, Some(0));

    let bm = svc
        .set_bookmarked(Actor::user(fan), x.id, true)
        .await
        .expect("set");
    assert!(bm.active);
    let follow = svc.set_following(Actor::user(fan), owner, true).await.expect("set");
    assert_eq!(follow.count, Some(1));
}

pub async fn test_status_queries(svc: &InteractionService) {
    let owner = user(svc, "status-owner").await;
    let fan = user(svc, "status-fan").await;
    let x = snippet(svc, owner).await;

    svc.toggle_like(Actor::user(fan), x.id).await.expect("like");
    svc.toggle_bookmark(Actor::user(fan), x.id).await.expect("bookmark");
    svc.toggle_follow(Actor::user(fan), owner).await.expect("follow");

    let like = svc.like_status(Actor::user(fan), x.id).await.expect("status");
    assert!(like.active);
    assert_eq!(like.count, Some(1));
    assert!(svc.bookmark_status(Actor::user(fan), x.id).await.expect("status").active);
    let follow = svc.follow_status(Actor::user(fan), owner).await.expect("status");
    assert!(follow.active);
    assert_eq!(follow.count, Some(1));

    let anon = svc.like_status(Actor::anonymous(), x.id).await.expect("status");
    assert!(!anon.active);
    assert_eq!(anon.count, Some(1));
    assert!(!svc.follow_status(Actor::anonymous(), owner).await.expect("status").active);
    assert!(!svc.like_status(Actor::user(owner), x.id).await.expect("status").active);
}
