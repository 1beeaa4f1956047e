use std::str::FromStr;
use std::sync::Arc;

use authority_scout_common::{validate_domain, Job, JobStatus, ProxySpec};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/scrape", post(scrape))
        .route("/batch", post(batch))
        .route("/result/:task_id", get(result))
        .route("/jobs", get(jobs))
        .route("/health", get(health))
        .route("/queue", get(queue))
        .route("/contexts/recycle", post(recycle_contexts))
        .route("/clear", post(clear))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Submission payload. Proxy fields are flat and all-or-nothing on (ip, port);
/// credentials are optional on top of that.
#[derive(Debug, Deserialize)]
struct ScrapeRequest {
    domain: String,
    proxy_ip: Option<String>,
    proxy_port: Option<u16>,
    proxy_user: Option<String>,
    proxy_pass: Option<String>,
}

impl ScrapeRequest {
    fn into_job(self) -> Result<Job, ApiError> {
        validate_domain(&self.domain).map_err(ApiError::bad_request)?;
        let proxy = build_proxy(self.proxy_ip, self.proxy_port, self.proxy_user, self.proxy_pass)?;
        Ok(Job::new(self.domain, proxy))
    }
}

fn build_proxy(
    ip: Option<String>,
    port: Option<u16>,
    user: Option<String>,
    pass: Option<String>,
) -> Result<Option<ProxySpec>, ApiError> {
    match (ip, port) {
        (Some(ip), Some(port)) => {
            let mut spec = ProxySpec::new(ip, port);
            if let Some(user) = user {
                spec = spec.with_credentials(user, pass.unwrap_or_default());
            } else if pass.is_some() {
                return Err(ApiError::bad_request("proxy_pass given without proxy_user"));
            }
            Ok(Some(spec))
        }
        (None, None) => {
            if user.is_some() || pass.is_some() {
                return Err(ApiError::bad_request(
                    "proxy credentials given without proxy_ip and proxy_port",
                ));
            }
            Ok(None)
        }
        _ => Err(ApiError::bad_request(
            "proxy_ip and proxy_port must be given together",
        )),
    }
}

async fn scrape(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ScrapeRequest>,
) -> Result<Response, ApiError> {
    let job = request.into_job()?;
    let task_id = job.task_id;
    let domain = job.domain.clone();
    info!(%task_id, domain = %domain, "job submitted");

    state.store.insert(job);
    state.queue.push(task_id);

    let body = json!({
        "task_id": task_id,
        "domain": domain,
        "status": JobStatus::Queued,
    });
    Ok((StatusCode::ACCEPTED, Json(body)).into_response())
}

/// Batch entries come in two shapes: a bare domain string, or the same object
/// `/scrape` accepts. Both normalize to a Job before anything is enqueued, so
/// one bad entry rejects the whole batch.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BatchEntry {
    Domain(String),
    Full(ScrapeRequest),
}

#[derive(Debug, Deserialize)]
struct BatchRequest {
    domains: Vec<BatchEntry>,
}

async fn batch(
    State(state): State<Arc<AppState>>,
    Json(request): Json<BatchRequest>,
) -> Result<Response, ApiError> {
    if request.domains.is_empty() {
        return Err(ApiError::bad_request("domains must not be empty"));
    }

    let mut jobs = Vec::with_capacity(request.domains.len());
    for entry in request.domains {
        let job = match entry {
            BatchEntry::Domain(domain) => {
                validate_domain(&domain).map_err(ApiError::bad_request)?;
                Job::new(domain, None)
            }
            BatchEntry::Full(request) => request.into_job()?,
        };
        jobs.push(job);
    }

    let task_ids: Vec<Uuid> = jobs.iter().map(|job| job.task_id).collect();
    info!(count = task_ids.len(), "batch submitted");

    for job in jobs {
        state.store.insert(job);
    }
    state.queue.push_all(task_ids.clone());

    Ok((StatusCode::ACCEPTED, Json(json!({ "task_ids": task_ids }))).into_response())
}

async fn result(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<Uuid>,
) -> Result<Response, ApiError> {
    match state.store.get(&task_id) {
        Some(job) => Ok(Json(job).into_response()),
        None => Err(ApiError::not_found("unknown task_id")),
    }
}

#[derive(Debug, Deserialize)]
struct JobsQuery {
    status: Option<String>,
}

async fn jobs(
    State(state): State<Arc<AppState>>,
    Query(query): Query<JobsQuery>,
) -> Result<Response, ApiError> {
    let status = match query.status.as_deref() {
        Some(raw) => Some(
            JobStatus::from_str(raw)
                .map_err(|_| ApiError::bad_request(format!("unknown status filter: {raw}")))?,
        ),
        None => None,
    };
    let jobs = state.store.list(status);
    let total = jobs.len();
    Ok(Json(json!({ "total": total, "jobs": jobs })).into_response())
}

async fn health(State(state): State<Arc<AppState>>) -> Response {
    let counts = state.store.counts();
    Json(json!({
        "status": "ok",
        "total_jobs": counts.total(),
        "queued": counts.queued,
        "processing": counts.processing,
        "completed": counts.completed,
        "failed": counts.failed,
        "queue_depth": state.queue.depth(),
    }))
    .into_response()
}

async fn queue(State(state): State<Arc<AppState>>) -> Response {
    let counts = state.store.counts();
    Json(json!({
        "queue_depth": state.queue.depth(),
        "processing": counts.processing,
        "max_concurrent": state.config.workers,
        "counts": counts,
        "contexts": state.pool.pooled().await,
        "queue": state.queue.snapshot(),
    }))
    .into_response()
}

/// Optional key selector for `/contexts/recycle`. No body (or an empty one)
/// recycles every pooled context.
#[derive(Debug, Default, Deserialize)]
struct RecycleRequest {
    proxy_ip: Option<String>,
    proxy_port: Option<u16>,
    proxy_user: Option<String>,
}

async fn recycle_contexts(
    State(state): State<Arc<AppState>>,
    request: Option<Json<RecycleRequest>>,
) -> Result<Response, ApiError> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let recycled = match (request.proxy_ip, request.proxy_port) {
        (Some(ip), Some(port)) => {
            let mut spec = ProxySpec::new(ip, port);
            if let Some(user) = request.proxy_user {
                spec = spec.with_credentials(user, String::new());
            }
            let key = authority_scout_common::ProxyKey::from_spec(&spec);
            usize::from(state.pool.recycle(&key).await)
        }
        (None, None) => state.pool.recycle_all().await,
        _ => {
            return Err(ApiError::bad_request(
                "proxy_ip and proxy_port must be given together",
            ))
        }
    };
    info!(recycled, "contexts recycled on request");
    Ok(Json(json!({ "recycled": recycled })).into_response())
}

async fn clear(State(state): State<Arc<AppState>>) -> Response {
    let dropped_queue = state.queue.clear();
    let removed = state.store.clear();
    info!(removed, dropped_queue, "job state cleared");
    Json(json!({ "removed": removed, "dropped_from_queue": dropped_queue })).into_response()
}

async fn metrics(State(state): State<Arc<AppState>>) -> Response {
    state.metrics.set_queue_depth(state.queue.depth());
    let counts = state.store.counts();
    state.metrics.set_jobs_processing(counts.processing);
    state
        .metrics
        .set_contexts(state.pool.pooled().await, state.pool.created_total());
    state.metrics.render().into_response()
}

/// Error body shared by every endpoint: `{"error": "..."}` with the matching
/// status code.
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    status: StatusCode,
    error: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            error: message.into(),
        }
    }

    fn not_found(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            error: message.into(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}
