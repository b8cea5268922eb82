//! Fork engine scenarios.

use snipsocial::model::{NotificationKind, SnippetDraft, SnippetId};
use snipsocial::{Actor, InteractionError, InteractionService};

use super::{private_snippet, unread, user};

pub async fn test_fork_copies_and_records_provenance(svc: &InteractionService) {
    let owner = user(svc, "fork-owner").await;
    let forker = user(svc, "forker").await;
    let mut draft = SnippetDraft::new("Trie", "struct Trie;", "rust").with_tags([1, 2]);
    draft.description = Some("prefix tree".to_string());
    draft.topics = vec!["data-structures".to_string()];
    draft.complexity = Some("intermediate".to_string());
    let x = svc
        .publish_snippet(Actor::user(owner), draft)
        .await
        .expect("publish should succeed");
    let before = svc.get_user(forker).await.expect("user").snippet_count;

    let outcome = svc
        .fork(Actor::user(forker), x.id)
        .await
        .expect("fork should succeed");

    let y = &outcome.snippet;
    assert_ne!(y.id, x.id);
    assert_eq!(y.owner, forker);
    assert_eq!(y.title, "Trie (Fork)");
    assert_eq!(y.code, x.code);
    assert_eq!(y.language, x.language);
    assert_eq!(y.description, x.description);
    assert_eq!(y.topics, x.topics);
    assert_eq!(y.complexity, x.complexity);
    assert!(y.is_public);
    assert_eq!((y.like_count, y.fork_count), (0, 0));

    assert_eq!(outcome.provenance.original, x.id);
    assert_eq!(outcome.provenance.forked, y.id);
    let forks = svc
        .stores()
        .content
        .forks_of(x.id)
        .await
        .expect("forks_of should succeed");
    assert_eq!(forks.len(), 1);
    assert_eq!(forks[0].forked, y.id);
    assert_eq!(
        svc.stores().content.snippet_tags(y.id).await.expect("tags"),
        vec![1, 2]
    );

    let x = svc.get_snippet(Actor::anonymous(), x.id).await.expect("snippet");
    assert_eq!(x.fork_count, 1);
    assert_eq!(svc.get_user(forker).await.expect("user").snippet_count, before + 1);

    let feed = svc
        .list_notifications(Actor::user(owner), None, false)
        .await
        .expect("list should succeed");
    assert_eq!(feed.items.len(), 1);
    assert_eq!(feed.items[0].kind, NotificationKind::Fork);
    assert_eq!(feed.items[0].actor, forker);
    assert_eq!(feed.items[0].snippet, Some(x.id));
}

pub async fn test_fork_private_snippet(svc: &InteractionService) {
    let owner = user(svc, "private-forker").await;
    let other = user(svc, "nosy").await;
    let secret = private_snippet(svc, owner).await;

    let err = svc.fork(Actor::user(other), secret.id).await.unwrap_err();
    assert!(matches!(err, InteractionError::Forbidden(_)));
    assert_eq!(err.status_code(), 403);
    let untouched = svc
        .get_snippet(Actor::user(owner), secret.id)
        .await
        .expect("owner sees their snippet");
    assert_eq!(untouched.fork_count, 0);

    let own = svc
        .fork(Actor::user(owner), secret.id)
        .await
        .expect("owner may fork their private snippet");
    assert!(own.snippet.is_public, "forks are always public");
    let secret = svc
        .get_snippet(Actor::user(owner), secret.id)
        .await
        .expect("owner sees their snippet");
    assert_eq!(secret.fork_count, 1, "fork count moves exactly once");
}

pub async fn test_fork_own_snippet_is_silent(svc: &InteractionService) {
    let owner = user(svc, "self-forker").await;
    let x = super::snippet(svc, owner).await;

    let first = svc.fork(Actor::user(owner), x.id).await.expect("fork");
    // a fork of a fork is just another snippet
    let second = svc.fork(Actor::user(owner), first.snippet.id).await.expect("fork");

    assert_eq!(second.snippet.title, "Binary search (Fork) (Fork)");
    assert_eq!(unread(svc, owner).await, 0);
    assert_eq!(svc.get_user(owner).await.expect("user").snippet_count, 3);
}

pub async fn test_fork_missing_snippet(svc: &InteractionService) {
    let forker = user(svc, "ghost-forker").await;

    let err = svc.fork(Actor::user(forker), SnippetId::new()).await.unwrap_err();
    assert!(matches!(err, InteractionError::NotFound { .. }));
    let err = svc.fork(Actor::anonymous(), SnippetId::new()).await.unwrap_err();
    assert!(matches!(err, InteractionError::Unauthorized));
}
