//! Periodic maintenance: evicting inboxes that have failed continuously for
//! more than 7 days (§4.G).

use std::time::Duration;

use relay_db::repositories::InboxRepository;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// How often the sweep runs. The 7-day eviction threshold itself lives in
/// `relay_db::repositories::inbox::FAILURE_EVICTION`.
const SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

/// Runs [`InboxRepository::sweep_expired_failures`] on an interval until
/// `cancellation` fires. Intended to be spawned once by the supervisor.
pub async fn run_failure_sweep(inbox_repo: InboxRepository, cancellation: CancellationToken) {
    let mut interval = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        tokio::select! {
            () = cancellation.cancelled() => {
                info!("failure sweep stopping on shutdown");
                return;
            }
            _ = interval.tick() => {
                match inbox_repo.sweep_expired_failures().await {
                    Ok(removed) if !removed.is_empty() => {
                        info!(count = removed.len(), domains = ?removed, "evicted long-failing inboxes");
                    }
                    Ok(_) => {}
                    Err(e) => warn!(error = %e, "failure sweep errored"),
                }
            }
        }
    }
}
