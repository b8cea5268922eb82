//! Follower, following and bookmark listings.

use snipsocial::model::{PageRequest, UserId};
use snipsocial::{Actor, InteractionError, InteractionService};

use super::{snippet, user};

pub async fn test_followers_and_following_newest_first(svc: &InteractionService) {
    let star = user(svc, "listed-star").await;
    let a = user(svc, "listed-a").await;
    let b = user(svc, "listed-b").await;
    let c = user(svc, "listed-c").await;

    for fan in [a, b, c] {
        svc.toggle_follow(Actor::user(fan), star).await.expect("follow");
    }
    svc.toggle_follow(Actor::user(star), a).await.expect("follow back");

    let followers = svc.followers(star, None).await.expect("followers");
    let ids: Vec<_> = followers.items.iter().map(|u| u.id).collect();
    assert_eq!(ids, vec![c, b, a]);
    assert_eq!(followers.pagination.total, 3);

    let following = svc.following(star, None).await.expect("following");
    assert_eq!(following.items.len(), 1);
    assert_eq!(following.items[0].id, a);
    assert_eq!(following.items[0].follower_count, 1);

    let err = svc.followers(UserId::new(), None).await.unwrap_err();
    assert!(matches!(err, InteractionError::NotFound { .. }));
}

pub async fn test_bookmarks_listing(svc: &InteractionService) {
    let owner = user(svc, "shelf-owner").await;
    let reader = user(svc, "shelf-reader").await;
    let x = snippet(svc, owner).await;
    let y = snippet(svc, owner).await;
    let z = snippet(svc, owner).await;

    for s in [&x, &y, &z] {
        svc.toggle_bookmark(Actor::user(reader), s.id).await.expect("bookmark");
    }
    svc.toggle_bookmark(Actor::user(reader), y.id).await.expect("unbookmark");

    let page = svc.bookmarks(Actor::user(reader), None).await.expect("bookmarks");
    let ids: Vec<_> = page.items.iter().map(|s| s.id).collect();
    assert_eq!(ids, vec![z.id, x.id]);

    let err = svc.bookmarks(Actor::anonymous(), None).await.unwrap_err();
    assert!(matches!(err, InteractionError::Unauthorized));
}

pub async fn test_page_size_is_clamped(svc: &InteractionService) {
    let star = user(svc, "clamp-star").await;
    let fan = user(svc, "clamp-fan").await;
    svc.toggle_follow(Actor::user(fan), star).await.expect("follow");

    let max = svc.limits().max_page_size;
    let page = svc
        .followers(star, Some(PageRequest::new(0, max + 50)))
        .await
        .expect("followers");
    assert_eq!(page.pagination.page, 1);
    assert_eq!(page.pagination.limit, max);

    let page = svc.followers(star, None).await.expect("followers");
    assert_eq!(page.pagination.limit, svc.limits().default_page_size);
}
