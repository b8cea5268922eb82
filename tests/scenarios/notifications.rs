//! Notification listing and read-state scenarios.

use snipsocial::model::{NotificationKind, PageRequest, ReadSelection};
use snipsocial::{Actor, InteractionError, InteractionService};

use super::{snippet, unread, user};

/// Unlike-then-like produces a second notification; there is no dedup.
pub async fn test_relike_creates_second_notification(svc: &InteractionService) {
    let owner = user(svc, "n-owner").await;
    let fan = user(svc, "n-fan").await;
    let x = snippet(svc, owner).await;

    for _ in 0..3 {
        svc.toggle_like(Actor::user(fan), x.id).await.expect("toggle");
    }

    let feed = svc
        .list_notifications(Actor::user(owner), None, false)
        .await
        .expect("list");
    assert_eq!(feed.items.len(), 2);
    assert!(feed.items.iter().all(|n| n.kind == NotificationKind::Like));
    assert_eq!(feed.unread_count, 2);
}

pub async fn test_mark_read_by_ids_is_scoped(svc: &InteractionService) {
    let a = user(svc, "scope-a").await;
    let b = user(svc, "scope-b").await;
    svc.toggle_follow(Actor::user(a), b).await.expect("follow");
    svc.toggle_follow(Actor::user(b), a).await.expect("follow");

    let a_feed = svc.list_notifications(Actor::user(a), None, false).await.expect("list");
    let b_feed = svc.list_notifications(Actor::user(b), None, false).await.expect("list");
    let ids = vec![a_feed.items[0].id, b_feed.items[0].id];

    // b cannot mark a's notification read
    let changed = svc
        .mark_notifications_read(Actor::user(b), ReadSelection::Ids(ids.clone()))
        .await
        .expect("mark read");
    assert_eq!(changed, 1);
    assert_eq!(unread(svc, a).await, 1);
    assert_eq!(unread(svc, b).await, 0);

    let changed = svc
        .mark_notifications_read(Actor::user(b), ReadSelection::Ids(ids))
        .await
        .expect("mark read");
    assert_eq!(changed, 0, "already-read rows are not counted twice");
}

pub async fn test_mark_all_read_and_unread_filter(svc: &InteractionService) {
    let owner = user(svc, "all-owner").await;
    let x = snippet(svc, owner).await;
    for i in 0..3 {
        let fan = user(svc, &format!("all-fan-{i}")).await;
        svc.toggle_like(Actor::user(fan), x.id).await.expect("like");
    }

    let changed = svc
        .mark_notifications_read(Actor::user(owner), ReadSelection::All)
        .await
        .expect("mark read");
    assert_eq!(changed, 3);

    let late = user(svc, "all-late").await;
    svc.toggle_like(Actor::user(late), x.id).await.expect("like");

    let all = svc
        .list_notifications(Actor::user(owner), None, false)
        .await
        .expect("list");
    assert_eq!(all.pagination.total, 4);
    assert_eq!(all.unread_count, 1);
    assert_eq!(all.items[0].actor, late, "newest first");
    assert!(!all.items[0].is_read);

    let unread_only = svc
        .list_notifications(Actor::user(owner), None, true)
        .await
        .expect("list");
    assert_eq!(unread_only.items.len(), 1);
    assert_eq!(unread_only.pagination.total, 1);
    assert_eq!(unread_only.items[0].actor, late);
}

pub async fn test_notification_pagination(svc: &InteractionService) {
    let star = user(svc, "paged-star").await;
    for i in 0..5 {
        let fan = user(svc, &format!("paged-fan-{i}")).await;
        svc.toggle_follow(Actor::user(fan), star).await.expect("follow");
    }

    let first = svc
        .list_notifications(Actor::user(star), Some(PageRequest::new(1, 2)), false)
        .await
        .expect("list");
    assert_eq!(first.items.len(), 2);
    assert_eq!(first.pagination.total, 5);
    assert_eq!(first.pagination.total_pages, 3);
    assert_eq!(first.unread_count, 5, "unread count is not limited to the page");

    let last = svc
        .list_notifications(Actor::user(star), Some(PageRequest::new(3, 2)), false)
        .await
        .expect("list");
    assert_eq!(last.items.len(), 1);

    let beyond = svc
        .list_notifications(Actor::user(star), Some(PageRequest::new(9, 2)), false)
        .await
        .expect("list");
    assert!(beyond.items.is_empty());
    assert_eq!(beyond.pagination.total, 5);
}

pub async fn test_notifications_require_identity(svc: &InteractionService) {
    let err = svc
        .list_notifications(Actor::anonymous(), None, false)
        .await
        .unwrap_err();
    assert!(matches!(err, InteractionError::Unauthorized));
    let err = svc
        .mark_notifications_read(Actor::anonymous(), ReadSelection::All)
        .await
        .unwrap_err();
    assert!(matches!(err, InteractionError::Unauthorized));
}
