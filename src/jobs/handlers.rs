use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use crate::{
    auth::AuthUser,
    error::{ApiError, ApiResult},
    jobs::{
        dto::{CreateJobRequest, JobListQuery, JobResponse},
        repo::{JobFilter, DEFAULT_SORT, SORT_COLUMNS},
        repo_types::{Job, JobStatus},
        services,
    },
    pagination::{resolve_sort, PageRequest, PageResponse},
    state::AppState,
};

pub fn job_routes() -> Router<AppState> {
    Router::new()
        .route("/jobs", get(list_jobs).post(create_job))
        .route("/jobs/:id", get(get_job))
}

#[instrument(skip(state, payload), fields(title = %payload.title))]
pub async fn create_job(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(payload): Json<CreateJobRequest>,
) -> ApiResult<(StatusCode, Json<JobResponse>)> {
    let job = services::create_job(&state, &auth, payload).await?;
    Ok((StatusCode::CREATED, Json(JobResponse::from(job))))
}

#[instrument(skip(state, q))]
pub async fn list_jobs(
    State(state): State<AppState>,
    Query(q): Query<JobListQuery>,
) -> ApiResult<Json<PageResponse<JobResponse>>> {
    let status = q
        .status
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(str::parse::<JobStatus>)
        .transpose()?;
    let filter = JobFilter {
        status,
        search: q.search.clone().filter(|s| !s.trim().is_empty()),
    };
    let page = PageRequest::new(q.page, q.size);
    let sort = resolve_sort(q.sort.as_deref(), SORT_COLUMNS, DEFAULT_SORT);
    let (rows, total) = Job::list(&state.db, &filter, page, sort).await?;
    let content = rows.into_iter().map(JobResponse::from).collect();
    Ok(Json(PageResponse::new(content, page, total)))
}

#[instrument(skip(state))]
pub async fn get_job(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<JobResponse>> {
    let job = Job::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::not_found("Job not found"))?;
    Ok(Json(JobResponse::from(job)))
}
