//! Bounded in-memory delivery queue + worker pool (§4.G, §5).
//!
//! Implements [`relay_federation::Fanout`]. A single task drains the shared
//! channel and, for each task, acquires a semaphore permit before spawning
//! the actual delivery — bounding concurrency to `worker_count` without
//! letting one slow destination hold up the next recipient in line (§4.G:
//! "each worker takes ONE `(job, recipient)` pair at a time").

use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use relay_common::{AppError, AppResult};
use relay_db::repositories::InboxRepository;
use relay_federation::client::{ApClient, DeliveryOutcome};
use relay_federation::{DeliveryRecipient, Fanout, RelayKeypair};
use serde_json::Value;
use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::job::DeliveryTask;
use crate::retry::{backoff_for, NotFoundTracker, MAX_ATTEMPTS};

/// §4.G: "in-memory bounded (10k pending pairs)".
pub const QUEUE_CAPACITY: usize = 10_000;
/// §4.G: "hard 30 s wait then 503" when the queue stays full.
const ENQUEUE_TIMEOUT: Duration = Duration::from_secs(30);

/// Handle to the running fan-out engine. Cloning shares the same queue and
/// worker pool; cheap, since it's just a channel sender.
#[derive(Clone)]
pub struct FanoutQueue {
    sender: mpsc::Sender<DeliveryTask>,
}

impl FanoutQueue {
    /// Spawns the dispatch loop and returns a handle implementing [`Fanout`].
    ///
    /// `worker_count == 0` resolves to the host's CPU count (§5's default).
    #[must_use]
    pub fn spawn(
        worker_count: usize,
        client: ApClient,
        keypair: RelayKeypair,
        inbox_repo: InboxRepository,
        cancellation: CancellationToken,
    ) -> Self {
        let worker_count = if worker_count == 0 {
            std::thread::available_parallelism()
                .map(NonZeroUsize::get)
                .unwrap_or(1)
        } else {
            worker_count
        };

        let (sender, receiver) = mpsc::channel(QUEUE_CAPACITY);
        let semaphore = Arc::new(Semaphore::new(worker_count));
        let not_found = Arc::new(NotFoundTracker::new());

        tokio::spawn(run_dispatch_loop(
            receiver,
            semaphore,
            client,
            Arc::new(keypair),
            inbox_repo,
            not_found,
            sender.clone(),
            cancellation,
        ));

        Self { sender }
    }
}

#[async_trait]
impl Fanout for FanoutQueue {
    async fn enqueue(&self, activity: Value, recipients: Vec<DeliveryRecipient>) -> AppResult<()> {
        let activity = Arc::new(activity);
        for recipient in recipients {
            let task = DeliveryTask {
                activity: activity.clone(),
                recipient,
                attempt: 0,
            };
            send_with_backpressure(&self.sender, task).await?;
        }
        Ok(())
    }
}

async fn send_with_backpressure(sender: &mpsc::Sender<DeliveryTask>, task: DeliveryTask) -> AppResult<()> {
    match tokio::time::timeout(ENQUEUE_TIMEOUT, sender.send(task)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(_)) => Err(AppError::Queue("delivery queue is shut down".to_string())),
        Err(_) => Err(AppError::Backpressure),
    }
}

struct Workers {
    client: ApClient,
    keypair: Arc<RelayKeypair>,
    inbox_repo: InboxRepository,
    not_found: Arc<NotFoundTracker>,
    resubmit: mpsc::Sender<DeliveryTask>,
    cancellation: CancellationToken,
}

async fn run_dispatch_loop(
    mut receiver: mpsc::Receiver<DeliveryTask>,
    semaphore: Arc<Semaphore>,
    client: ApClient,
    keypair: Arc<RelayKeypair>,
    inbox_repo: InboxRepository,
    not_found: Arc<NotFoundTracker>,
    resubmit: mpsc::Sender<DeliveryTask>,
    cancellation: CancellationToken,
) {
    let workers = Arc::new(Workers {
        client,
        keypair,
        inbox_repo,
        not_found,
        resubmit,
        cancellation: cancellation.clone(),
    });

    loop {
        let task = tokio::select! {
            () = cancellation.cancelled() => break,
            received = receiver.recv() => match received {
                Some(task) => task,
                None => break,
            },
        };

        let Ok(permit) = semaphore.clone().acquire_owned().await else {
            break;
        };
        let workers = workers.clone();

        tokio::spawn(async move {
            let _permit = permit;
            deliver_one(task, &workers).await;
        });
    }
}

async fn deliver_one(task: DeliveryTask, workers: &Workers) {
    if workers.cancellation.is_cancelled() {
        return;
    }

    let outcome = workers
        .client
        .deliver(
            &task.recipient.inbox,
            &task.activity,
            &workers.keypair.private_key,
            &workers.keypair.key_id,
        )
        .await;

    match outcome {
        Ok(DeliveryOutcome::Success) => {
            workers.not_found.clear(&task.recipient.domain).await;
            if let Err(e) = workers.inbox_repo.clear_failure(&task.recipient.domain).await {
                warn!(domain = %task.recipient.domain, error = %e, "failed to clear inbox failure state");
            }
        }
        Ok(DeliveryOutcome::Gone) => {
            info!(domain = %task.recipient.domain, "destination gone, marking inbox failed");
            mark_failed(workers, &task.recipient.domain).await;
        }
        Ok(DeliveryOutcome::NotFound) => {
            let count = workers.not_found.record(&task.recipient.domain).await;
            if count >= 3 {
                info!(domain = %task.recipient.domain, "three consecutive 404s, marking inbox failed");
                mark_failed(workers, &task.recipient.domain).await;
            } else {
                retry_or_drop(task, workers).await;
            }
        }
        Ok(DeliveryOutcome::Failed { transient: true, status }) => {
            warn!(domain = %task.recipient.domain, status, "transient delivery failure");
            retry_or_drop(task, workers).await;
        }
        Ok(DeliveryOutcome::Failed { transient: false, status }) => {
            info!(domain = %task.recipient.domain, status, "permanent delivery failure, dropping");
        }
        Err(e) => {
            warn!(domain = %task.recipient.domain, error = %e, "delivery attempt errored, treating as transient");
            retry_or_drop(task, workers).await;
        }
    }
}

async fn mark_failed(workers: &Workers, domain: &str) {
    if let Err(e) = workers.inbox_repo.mark_failed(domain).await {
        warn!(domain, error = %e, "failed to record delivery failure");
    }
}

async fn retry_or_drop(task: DeliveryTask, workers: &Workers) {
    if task.attempt + 1 >= MAX_ATTEMPTS {
        info!(domain = %task.recipient.domain, attempts = task.attempt + 1, "giving up after max delivery attempts");
        return;
    }

    let delay = backoff_for(task.attempt);
    let next = DeliveryTask {
        attempt: task.attempt + 1,
        ..task
    };
    let resubmit = workers.resubmit.clone();
    let cancellation = workers.cancellation.clone();

    tokio::spawn(async move {
        tokio::select! {
            () = cancellation.cancelled() => {}
            () = tokio::time::sleep(delay) => {
                let _ = resubmit.send(next).await;
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_federation::DeliveryRecipient;
    use serde_json::json;

    fn task() -> DeliveryTask {
        DeliveryTask {
            activity: Arc::new(json!({"type": "Announce"})),
            recipient: DeliveryRecipient {
                domain: "a.example".to_string(),
                inbox: "https://a.example/inbox".to_string(),
            },
            attempt: 0,
        }
    }

    #[tokio::test]
    async fn send_succeeds_while_queue_has_room() {
        let (sender, mut receiver) = mpsc::channel(4);
        send_with_backpressure(&sender, task()).await.expect("send");
        assert!(receiver.recv().await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn send_times_out_into_backpressure_when_queue_stays_full() {
        let (sender, _receiver) = mpsc::channel(1);
        sender.send(task()).await.expect("fill queue");

        let result = send_with_backpressure(&sender, task()).await;
        assert!(matches!(result, Err(AppError::Backpressure)));
    }
}
