use std::sync::Arc;

use authority_scout_common::{ProxyKey, ScrapeError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn, Instrument};
use uuid::Uuid;

use crate::AppState;

/// Spawns `count` supervised workers draining the job queue.
///
/// Each returned handle is a supervisor: if the worker body panics it is
/// logged and respawned, so a single bad page cannot thin out the pool.
pub fn spawn_workers(
    state: Arc<AppState>,
    shutdown: CancellationToken,
    count: usize,
) -> Vec<JoinHandle<()>> {
    (0..count)
        .map(|worker_id| {
            let state = state.clone();
            let shutdown = shutdown.clone();
            tokio::spawn(supervise(state, shutdown, worker_id))
        })
        .collect()
}

async fn supervise(state: Arc<AppState>, shutdown: CancellationToken, worker_id: usize) {
    loop {
        let handle = tokio::spawn(run_worker(state.clone(), shutdown.clone(), worker_id));
        match handle.await {
            Ok(()) => break,
            Err(join_err) if join_err.is_panic() => {
                if shutdown.is_cancelled() {
                    break;
                }
                error!(worker_id, "worker panicked, respawning");
            }
            Err(_) => break,
        }
    }
}

async fn run_worker(state: Arc<AppState>, shutdown: CancellationToken, worker_id: usize) {
    info!(worker_id, "worker started");
    loop {
        let task_id = tokio::select! {
            _ = shutdown.cancelled() => break,
            task_id = state.queue.pop() => task_id,
        };
        process_job(&state, task_id)
            .instrument(tracing::info_span!("job", %task_id, worker_id))
            .await;
    }
    info!(worker_id, "worker stopped");
}

async fn process_job(state: &Arc<AppState>, task_id: Uuid) {
    let Some(job) = state.store.mark_processing(&task_id) else {
        warn!("popped task id has no runnable job");
        return;
    };
    state.metrics.job_started();
    info!(domain = %job.domain, "processing job");

    // The scrape runs in its own task so a panic inside the browser engine
    // fails the job instead of killing the worker with the job half-done.
    let scrape = {
        let state = state.clone();
        let domain = job.domain.clone();
        let proxy = job.proxy.clone();
        tokio::spawn(async move {
            let context = state.pool.acquire(proxy.as_ref()).await?;
            state.executor.execute(&context, &domain).await
        })
    };

    match scrape.await {
        Ok(Ok(result)) => {
            info!(domain = %job.domain, dr = ?result.dr, "job completed");
            state.store.mark_completed(&task_id, result);
            state.metrics.job_completed();
        }
        Ok(Err(err)) => {
            warn!(domain = %job.domain, error = %err, kind = err.kind(), "job failed");
            if matches!(err, ScrapeError::ContextUnhealthy(_)) {
                let key = ProxyKey::from_optional(job.proxy.as_ref());
                state.pool.recycle(&key).await;
            }
            state.store.mark_failed(&task_id, err.to_string());
            state.metrics.job_failed(err.kind());
        }
        Err(join_err) => {
            error!(domain = %job.domain, "scrape task aborted: {}", join_err);
            state.store.mark_failed(&task_id, "internal error: scrape aborted".into());
            state.metrics.job_failed("engine");
        }
    }
}
