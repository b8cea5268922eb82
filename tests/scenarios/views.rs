//! View tracking scenarios.

use snipsocial::model::SnippetId;
use snipsocial::services::Tracked;
use snipsocial::{Actor, InteractionError, InteractionService};

use super::{snippet, user};

/// Repeat views are not suppressed: every request appends a log row and
/// bumps the counter, whatever the origin hash says.
pub async fn test_repeat_views_all_count(svc: &InteractionService) {
    let owner = user(svc, "viewed-owner").await;
    let viewer = user(svc, "viewer").await;
    let x = snippet(svc, owner).await;
    let origin = svc.hash_origin("198.51.100.4");

    for _ in 0..3 {
        let tracked = svc
            .record_view(Actor::anonymous(), x.id, Some(origin.clone()), "Mozilla/5.0")
            .await
            .expect("view should be accepted");
        assert!(matches!(tracked, Tracked::Recorded | Tracked::Queued));
    }
    let long_signature = "a".repeat(svc.limits().max_client_signature_length * 2);
    svc.record_view(Actor::user(viewer), x.id, Some(origin), &long_signature)
        .await
        .expect("view should be accepted");

    let x = svc.get_snippet(Actor::anonymous(), x.id).await.expect("snippet");
    assert_eq!(x.view_count, 4);
    assert_eq!(svc.stores().content.count_views(x.id).await.expect("count"), 4);
    assert_eq!(
        super::unread(svc, owner).await,
        0,
        "views never notify"
    );
}

pub async fn test_view_on_missing_snippet(svc: &InteractionService) {
    let err = svc
        .record_view(Actor::anonymous(), SnippetId::new(), None, "curl/8")
        .await
        .unwrap_err();
    assert!(matches!(err, InteractionError::NotFound { .. }));
}
