//! Comment engine scenarios.

use snipsocial::model::{CommentId, NotificationKind, PageRequest};
use snipsocial::services::REPLY_MESSAGE;
use snipsocial::{Actor, InteractionError, InteractionService};

use super::{private_snippet, snippet, unread, user};

pub async fn test_comment_notifies_owner(svc: &InteractionService) {
    let owner = user(svc, "c-owner").await;
    let reader = user(svc, "c-reader").await;
    let x = snippet(svc, owner).await;

    let comment = svc
        .add_comment(Actor::user(reader), x.id, "Neat trick", None)
        .await
        .expect("comment should succeed");
    assert_eq!(comment.parent, None);
    assert_eq!(comment.depth, 0);

    let x = svc.get_snippet(Actor::anonymous(), x.id).await.expect("snippet");
    assert_eq!(x.comment_count, 1);

    let feed = svc
        .list_notifications(Actor::user(owner), None, false)
        .await
        .expect("list should succeed");
    assert_eq!(feed.items.len(), 1);
    let n = &feed.items[0];
    assert_eq!(n.kind, NotificationKind::Comment);
    assert_eq!(n.snippet, Some(x.id));
    assert_eq!(n.comment, Some(comment.id));
    assert_eq!(n.message, None);
}

pub async fn test_reply_fans_out_to_owner_and_parent(svc: &InteractionService) {
    let owner = user(svc, "r-owner").await;
    let alice = user(svc, "r-alice").await;
    let bob = user(svc, "r-bob").await;
    let x = snippet(svc, owner).await;

    let top = svc
        .add_comment(Actor::user(alice), x.id, "question?", None)
        .await
        .expect("comment");
    let owner_before = unread(svc, owner).await;

    let reply = svc
        .add_comment(Actor::user(bob), x.id, "answer", Some(top.id))
        .await
        .expect("reply");
    assert_eq!(reply.parent, Some(top.id));
    assert_eq!(reply.depth, 1);

    assert_eq!(unread(svc, owner).await, owner_before + 1);
    let alice_feed = svc
        .list_notifications(Actor::user(alice), None, false)
        .await
        .expect("list");
    assert_eq!(alice_feed.items.len(), 1);
    assert_eq!(alice_feed.items[0].message.as_deref(), Some(REPLY_MESSAGE));
    assert_eq!(alice_feed.items[0].actor, bob);
    assert_eq!(alice_feed.items[0].comment, Some(reply.id));
    assert_eq!(unread(svc, bob).await, 0);

    let x = svc.get_snippet(Actor::anonymous(), x.id).await.expect("snippet");
    assert_eq!(x.comment_count, 2);
}

pub async fn test_self_reply_on_own_snippet_is_silent(svc: &InteractionService) {
    let owner = user(svc, "monologue").await;
    let x = snippet(svc, owner).await;

    let top = svc
        .add_comment(Actor::user(owner), x.id, "note to self", None)
        .await
        .expect("comment");
    svc.add_comment(Actor::user(owner), x.id, "another note", Some(top.id))
        .await
        .expect("reply");

    assert_eq!(unread(svc, owner).await, 0);
}

/// The owner wrote the parent comment: they hear about the new comment on
/// their snippet and, separately, about the reply to their comment.
pub async fn test_reply_to_owner_comment_notifies_owner_twice(svc: &InteractionService) {
    let owner = user(svc, "o-owner").await;
    let guest = user(svc, "o-guest").await;
    let x = snippet(svc, owner).await;

    let top = svc
        .add_comment(Actor::user(owner), x.id, "changelog", None)
        .await
        .expect("comment");
    let reply = svc
        .add_comment(Actor::user(guest), x.id, "thanks", Some(top.id))
        .await
        .expect("reply");

    let feed = svc
        .list_notifications(Actor::user(owner), None, false)
        .await
        .expect("list");
    assert_eq!(feed.items.len(), 2);
    assert!(feed
        .items
        .iter()
        .all(|n| n.kind == NotificationKind::Comment && n.actor == guest && n.comment == Some(reply.id)));
    let mut messages: Vec<_> = feed.items.iter().map(|n| n.message.as_deref()).collect();
    messages.sort();
    assert_eq!(messages, vec![None, Some(REPLY_MESSAGE)]);
    assert_eq!(unread(svc, guest).await, 0);
}

pub async fn test_comment_validation(svc: &InteractionService) {
    let owner = user(svc, "v-owner").await;
    let other = user(svc, "v-other").await;
    let x = snippet(svc, owner).await;

    let err = svc
        .add_comment(Actor::user(owner), x.id, " \t\n", None)
        .await
        .unwrap_err();
    assert!(matches!(err, InteractionError::Validation(_)));

    let too_long = "x".repeat(svc.limits().max_comment_length + 1);
    let err = svc
        .add_comment(Actor::user(owner), x.id, &too_long, None)
        .await
        .unwrap_err();
    assert!(matches!(err, InteractionError::Validation(_)));

    let err = svc
        .add_comment(Actor::anonymous(), x.id, "hi", None)
        .await
        .unwrap_err();
    assert!(matches!(err, InteractionError::Unauthorized));

    let secret = private_snippet(svc, owner).await;
    let err = svc
        .add_comment(Actor::user(other), secret.id, "hi", None)
        .await
        .unwrap_err();
    assert!(matches!(err, InteractionError::NotFound { .. }));

    let x = svc.get_snippet(Actor::anonymous(), x.id).await.expect("snippet");
    assert_eq!(x.comment_count, 0, "rejected comments write nothing");
}

pub async fn test_reply_parent_checks(svc: &InteractionService) {
    let owner = user(svc, "p-owner").await;
    let x = snippet(svc, owner).await;
    let y = snippet(svc, owner).await;
    let actor = Actor::user(owner);

    let err = svc
        .add_comment(actor, x.id, "orphan", Some(CommentId::new()))
        .await
        .unwrap_err();
    assert!(matches!(err, InteractionError::NotFound { entity: "Comment", .. }));

    let on_y = svc.add_comment(actor, y.id, "on y", None).await.expect("comment");
    let err = svc
        .add_comment(actor, x.id, "cross", Some(on_y.id))
        .await
        .unwrap_err();
    assert!(matches!(err, InteractionError::NotFound { entity: "Comment", .. }));

    let top = svc.add_comment(actor, x.id, "top", None).await.expect("comment");
    let reply = svc
        .add_comment(actor, x.id, "reply", Some(top.id))
        .await
        .expect("reply");
    if svc.limits().max_comment_depth == 1 {
        let err = svc
            .add_comment(actor, x.id, "too deep", Some(reply.id))
            .await
            .unwrap_err();
        assert!(matches!(err, InteractionError::Validation(_)));
    }
}

pub async fn test_comment_listing_order_and_pages(svc: &InteractionService) {
    let owner = user(svc, "l-owner").await;
    let x = snippet(svc, owner).await;
    let actor = Actor::user(owner);

    let first = svc.add_comment(actor, x.id, "first", None).await.expect("c");
    let r1 = svc.add_comment(actor, x.id, "r1", Some(first.id)).await.expect("c");
    let r2 = svc.add_comment(actor, x.id, "r2", Some(first.id)).await.expect("c");
    let second = svc.add_comment(actor, x.id, "second", None).await.expect("c");
    let third = svc.add_comment(actor, x.id, "third", None).await.expect("c");

    let page = svc
        .list_comments(Actor::anonymous(), x.id, Some(PageRequest::new(1, 2)))
        .await
        .expect("list");
    assert_eq!(page.pagination.total, 3, "only top-level comments are paged");
    assert_eq!(page.pagination.total_pages, 2);
    let ids: Vec<_> = page.items.iter().map(|t| t.comment.id).collect();
    assert_eq!(ids, vec![third.id, second.id], "newest top-level first");

    let page = svc
        .list_comments(Actor::anonymous(), x.id, Some(PageRequest::new(2, 2)))
        .await
        .expect("list");
    assert_eq!(page.items.len(), 1);
    let thread = &page.items[0];
    assert_eq!(thread.comment.id, first.id);
    let replies: Vec<_> = thread.replies.iter().map(|t| t.comment.id).collect();
    assert_eq!(replies, vec![r1.id, r2.id], "replies oldest first");
    assert_eq!(thread.comment_count(), 3);

    let secret = private_snippet(svc, owner).await;
    let err = svc
        .list_comments(Actor::anonymous(), secret.id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, InteractionError::NotFound { .. }));
}
