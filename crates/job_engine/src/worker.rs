//! Worker pool consuming submitted job ids.

use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use uuid::Uuid;

use crate::controller::JobLifecycleController;

/// Spawns `count` workers that pull job ids off the queue and execute them.
///
/// The receiver is shared, so every id is delivered to exactly one worker;
/// distinct jobs run in parallel across workers. Workers drain until the
/// queue closes or the token is cancelled.
pub fn spawn_job_workers(
    count: usize,
    controller: Arc<JobLifecycleController>,
    receiver: mpsc::Receiver<Uuid>,
    shutdown_token: CancellationToken,
) {
    let receiver = Arc::new(Mutex::new(receiver));

    for worker_id in 0..count {
        let controller = Arc::clone(&controller);
        let receiver = Arc::clone(&receiver);
        let shutdown = shutdown_token.clone();

        tokio::spawn(async move {
            info!(worker_id, "job worker started");
            loop {
                let next = tokio::select! {
                    id = async { receiver.lock().await.recv().await } => id,
                    _ = shutdown.cancelled() => None,
                };

                let Some(job_id) = next else {
                    info!(worker_id, "job worker shutting down");
                    break;
                };

                if let Err(e) = controller.execute(job_id).await {
                    error!(
                        worker_id,
                        job_id = %job_id,
                        error = %e,
                        "job execution could not persist a terminal state"
                    );
                }
            }
        });
    }
}
