//! Counter consistency.

use snipsocial::InteractionService;

/// A full reconciliation that finds nothing to correct proves every cached
/// counter equals the count of its authoritative rows.
pub async fn test_counters_match_relationship_tables(svc: &InteractionService) {
    let report = svc
        .reconcile_counters()
        .await
        .expect("reconcile should succeed");
    assert_eq!(
        report.total(),
        0,
        "counters drifted: {} snippets, {} users",
        report.snippets_corrected,
        report.users_corrected
    );
    assert!(svc.pending_reconciliation().await.is_empty());
}
