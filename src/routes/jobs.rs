use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::db::queries;
use crate::error::{ApiError, ApiResult};
use crate::models::generation::{
    GenerateRequest, GenerateResponse, JobDetail, RecentJobsQuery, RecentJobsResponse,
};
use crate::services::submission;

/// Largest page `GET /api/jobs/recent` returns.
const MAX_PAGE_SIZE: u32 = 100;

/// POST /api/generate — queue a text-to-video job.
pub async fn submit_generation(
    State(state): State<AppState>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> ApiResult<Json<GenerateResponse>> {
    let Json(request) = body.map_err(|e| ApiError::bad_request(e.body_text()))?;

    let job = submission::submit(&state.db, request).await?;

    Ok(Json(GenerateResponse {
        job_id: job.id,
        status: job.status,
    }))
}

/// GET /api/job/{job_id} — current state of one job.
pub async fn get_job(
    State(state): State<AppState>,
    Path(job_id): Path<String>,
) -> ApiResult<Json<JobDetail>> {
    // Ids that are not UUIDs cannot exist, so they are reported the same way.
    let not_found = || ApiError::not_found(format!("job {job_id} not found"));

    let id = Uuid::parse_str(&job_id).map_err(|_| not_found())?;
    let job = queries::get_job(&state.db, id).await?.ok_or_else(not_found)?;

    Ok(Json(JobDetail::from_job(job, &state.public_base_url)))
}

/// GET /api/jobs/recent — newest jobs first.
pub async fn list_recent_jobs(
    State(state): State<AppState>,
    query: Result<Query<RecentJobsQuery>, QueryRejection>,
) -> ApiResult<Json<RecentJobsResponse>> {
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let limit = query.limit.min(MAX_PAGE_SIZE);
    let jobs = queries::list_recent_jobs(&state.db, limit, query.offset).await?;

    Ok(Json(RecentJobsResponse {
        jobs: jobs
            .into_iter()
            .map(|job| JobDetail::from_job(job, &state.public_base_url))
            .collect(),
    }))
}
