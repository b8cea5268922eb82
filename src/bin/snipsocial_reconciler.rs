//! snipsocial-reconciler: counter reconciliation sweeper
//!
//! Periodically recomputes every denormalized counter (likes, comments,
//! views, forks, followers, following, snippets, likes received) from the
//! authoritative relationship tables and corrects rows that drifted.
//!
//! ## Configuration
//! - SNIPSOCIAL_CONFIG: path to a YAML config file
//! - SNIPSOCIAL_STORAGE__SQLITE__PATH: database file
//! - SNIPSOCIAL_RECONCILE__INTERVAL_SECS: seconds between sweeps (default 300)
//! - SNIPSOCIAL_RECONCILE__ENABLED: set to false to run a single sweep and exit
//! - SNIPSOCIAL_LOG: tracing filter (default "info")

use std::time::Duration;

use backon::Retryable;
use tracing::{error, info, warn};

use snipsocial::config::Config;
use snipsocial::ledger::CounterLedger;
use snipsocial::storage::init_storage;
use snipsocial::utils::bootstrap::{init_tracing, shutdown_signal};
use snipsocial::utils::retry::connection_backoff;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let config = Config::load(None)?;

    let storage = config.storage.clone();
    let stores = (|| {
        let storage = storage.clone();
        async move { init_storage(&storage).await.map_err(|e| e.to_string()) }
    })
    .retry(connection_backoff())
    .notify(|err: &String, dur: Duration| {
        warn!(service = "storage", error = %err, delay = ?dur, "Connection failed, retrying");
    })
    .await?;

    let ledger = CounterLedger::new(stores.counters.clone());

    if !config.reconcile.enabled {
        info!("Periodic reconciliation disabled, running a single sweep");
        let report = ledger.reconcile_all().await?;
        info!(
            snippets = report.snippets_corrected,
            users = report.users_corrected,
            "Sweep complete"
        );
        return Ok(());
    }

    let period = Duration::from_secs(config.reconcile.interval_secs.max(1));
    info!(interval_secs = period.as_secs(), "Counter reconciler started");

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match ledger.reconcile_all().await {
                    Ok(report) => info!(
                        snippets = report.snippets_corrected,
                        users = report.users_corrected,
                        "Sweep complete"
                    ),
                    Err(e) => error!(error = %e, "Sweep failed"),
                }
            }
            _ = &mut shutdown => break,
        }
    }

    info!("Counter reconciler stopped");
    Ok(())
}
