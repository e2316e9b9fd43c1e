//! Periodic reconciliation of the query tools.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{MissedTickBehavior, interval};

use super::server::DocRagMcpServer;

/// Refresh the server's tools every `period` until `shutdown` flips to `true`.
///
/// Ticks never overlap: a slow refresh delays the next one instead of queueing extra ticks.
/// The first refresh happens one `period` after the call, the caller is expected to have
/// performed the initial one.
pub async fn run_refresh_loop(
    server: DocRagMcpServer,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Some(outcome) = server.refresh_tools().await
                    && outcome.changed()
                {
                    tracing::info!(
                        added = ?outcome.added,
                        updated = ?outcome.updated,
                        removed = ?outcome.removed,
                        "Query tools changed"
                    );
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    tracing::debug!("Stopping tool refresh loop");
                    break;
                }
            }
        }
    }
}
