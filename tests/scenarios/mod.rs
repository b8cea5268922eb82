//! Shared interaction scenarios.
//!
//! Every scenario drives an [`InteractionService`] through its public API and
//! creates its own users and snippets, so one service instance can run the
//! whole suite. Each backend's test file builds a service and runs
//! [`run_interaction_scenarios!`].

#![allow(dead_code)]

pub mod comments;
pub mod counters;
pub mod forks;
pub mod listings;
pub mod notifications;
pub mod toggles;
pub mod views;

use snipsocial::model::{NewUser, Snippet, SnippetDraft, UserId};
use snipsocial::{Actor, InteractionService};

/// Register a user with a unique-looking name.
pub async fn user(svc: &InteractionService, name: &str) -> UserId {
    svc.register_user(NewUser::new(name))
        .await
        .expect("register_user should succeed")
        .id
}

/// Publish a public snippet owned by `owner`.
pub async fn snippet(svc: &InteractionService, owner: UserId) -> Snippet {
    svc.publish_snippet(
        Actor::user(owner),
        SnippetDraft::new("Binary search", "fn search() {}", "rust"),
    )
    .await
    .expect("publish_snippet should succeed")
}

pub async fn private_snippet(svc: &InteractionService, owner: UserId) -> Snippet {
    svc.publish_snippet(
        Actor::user(owner),
        SnippetDraft::new("Scratch", "let x = 1;", "rust").private(),
    )
    .await
    .expect("publish_snippet should succeed")
}

pub async fn unread(svc: &InteractionService, user: UserId) -> u64 {
    svc.list_notifications(Actor::user(user), None, true)
        .await
        .expect("list_notifications should succeed")
        .unread_count
}

/// Run every interaction scenario against a service.
#[macro_export]
macro_rules! run_interaction_scenarios {
    ($svc:expr) => {
        use $crate::scenarios::comments::*;
        use $crate::scenarios::counters::*;
        use $crate::scenarios::forks::*;
        use $crate::scenarios::listings::*;
        use $crate::scenarios::notifications::*;
        use $crate::scenarios::toggles::*;
        use $crate::scenarios::views::*;

        // toggles
        test_like_then_unlike($svc).await;
        println!("  test_like_then_unlike: PASSED");

        test_like_own_snippet_is_silent($svc).await;
        println!("  test_like_own_snippet_is_silent: PASSED");

        test_toggle_requires_identity($svc).await;
        println!("  test_toggle_requires_identity: PASSED");

        test_toggle_missing_target($svc).await;
        println!("  test_toggle_missing_target: PASSED");

        test_unregistered_actor_is_unauthorized($svc).await;
        println!("  test_unregistered_actor_is_unauthorized: PASSED");

        test_private_snippet_hidden($svc).await;
        println!("  test_private_snippet_hidden: PASSED");

        test_self_follow_always_rejected($svc).await;
        println!("  test_self_follow_always_rejected: PASSED");

        test_follow_counts_both_sides($svc).await;
        println!("  test_follow_counts_both_sides: PASSED");

        test_bookmark_is_independent_of_like($svc).await;
        println!("  test_bookmark_is_independent_of_like: PASSED");

        test_set_converges($svc).await;
        println!("  test_set_converges: PASSED");

        test_status_queries($svc).await;
        println!("  test_status_queries: PASSED");

        // forks
        test_fork_copies_and_records_provenance($svc).await;
        println!("  test_fork_copies_and_records_provenance: PASSED");

        test_fork_private_snippet($svc).await;
        println!("  test_fork_private_snippet: PASSED");

        test_fork_own_snippet_is_silent($svc).await;
        println!("  test_fork_own_snippet_is_silent: PASSED");

        test_fork_missing_snippet($svc).await;
        println!("  test_fork_missing_snippet: PASSED");

        // comments
        test_comment_notifies_owner($svc).await;
        println!("  test_comment_notifies_owner: PASSED");

        test_reply_fans_out_to_owner_and_parent($svc).await;
        println!("  test_reply_fans_out_to_owner_and_parent: PASSED");

        test_self_reply_on_own_snippet_is_silent($svc).await;
        println!("  test_self_reply_on_own_snippet_is_silent: PASSED");

        test_reply_to_owner_comment_notifies_owner_twice($svc).await;
        println!("  test_reply_to_owner_comment_notifies_owner_twice: PASSED");

        test_comment_validation($svc).await;
        println!("  test_comment_validation: PASSED");

        test_reply_parent_checks($svc).await;
        println!("  test_reply_parent_checks: PASSED");

        test_comment_listing_order_and_pages($svc).await;
        println!("  test_comment_listing_order_and_pages: PASSED");

        // views
        test_repeat_views_all_count($svc).await;
        println!("  test_repeat_views_all_count: PASSED");

        test_view_on_missing_snippet($svc).await;
        println!("  test_view_on_missing_snippet: PASSED");

        // notifications
        test_relike_creates_second_notification($svc).await;
        println!("  test_relike_creates_second_notification: PASSED");

        test_mark_read_by_ids_is_scoped($svc).await;
        println!("  test_mark_read_by_ids_is_scoped: PASSED");

        test_mark_all_read_and_unread_filter($svc).await;
        println!("  test_mark_all_read_and_unread_filter: PASSED");

        test_notification_pagination($svc).await;
        println!("  test_notification_pagination: PASSED");

        test_notifications_require_identity($svc).await;
        println!("  test_notifications_require_identity: PASSED");

        // listings
        test_followers_and_following_newest_first($svc).await;
        println!("  test_followers_and_following_newest_first: PASSED");

        test_bookmarks_listing($svc).await;
        println!("  test_bookmarks_listing: PASSED");

        test_page_size_is_clamped($svc).await;
        println!("  test_page_size_is_clamped: PASSED");

        // counters last: every scenario above must have left them consistent
        test_counters_match_relationship_tables($svc).await;
        println!("  test_counters_match_relationship_tables: PASSED");
    };
}
