use std::time::Duration;

use chrono::TimeDelta;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use lounge_db::MessageLedger;

/// Background task that prunes chat messages older than `max_age`.
///
/// Sweeps immediately, then once per `period`, for as long as the task lives.
/// A failed sweep is logged and the next one still runs.
pub async fn run_retention_loop(ledger: MessageLedger, max_age: TimeDelta, period: Duration) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        interval.tick().await;

        match sweep_once(&ledger, max_age).await {
            Ok(0) => debug!("Retention sweep: nothing to prune"),
            Ok(count) => info!("Retention sweep: pruned {} expired messages", count),
            Err(e) => warn!("Retention sweep error: {:#}", e),
        }
    }
}

pub async fn sweep_once(ledger: &MessageLedger, max_age: TimeDelta) -> anyhow::Result<usize> {
    let ledger = ledger.clone();
    tokio::task::spawn_blocking(move || ledger.sweep_expired(max_age)).await?
}
