use garde::Validate;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::db::queries;
use crate::error::{ApiError, ApiResult};
use crate::models::generation::GenerateRequest;
use crate::models::job::{
    AspectRatio, Job, RenderParams, ALLOWED_DURATIONS, DEFAULT_DURATION_SECONDS,
};

/// A request that passed validation, with every optional field resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Submission {
    pub prompt: String,
    pub style: Option<String>,
    pub duration_seconds: u32,
    pub aspect_ratio: AspectRatio,
    pub seed: i64,
    pub params: RenderParams,
}

/// Durations outside the allowed set fall back to the default instead of failing.
pub fn coerce_duration(requested: Option<i64>) -> u32 {
    match requested {
        Some(value) => ALLOWED_DURATIONS
            .iter()
            .copied()
            .find(|allowed| i64::from(*allowed) == value)
            .unwrap_or_else(|| {
                debug!(requested = value, "Unsupported duration, using default");
                DEFAULT_DURATION_SECONDS
            }),
        None => DEFAULT_DURATION_SECONDS,
    }
}

/// Unknown aspect ratios fall back to 16:9.
pub fn coerce_aspect_ratio(requested: Option<&str>) -> AspectRatio {
    match requested {
        Some(value) => value.parse().unwrap_or_else(|_| {
            debug!(requested = value, "Unsupported aspect ratio, using default");
            AspectRatio::default()
        }),
        None => AspectRatio::default(),
    }
}

/// Validate a generate request and derive its render parameters.
///
/// Only a missing or empty prompt is an error. A missing seed is replaced by a
/// random 32-bit value so the stored job is always reproducible.
pub fn prepare(request: GenerateRequest) -> ApiResult<Submission> {
    request.validate()?;

    let prompt = request
        .prompt
        .ok_or_else(|| ApiError::Validation("prompt is required".to_string()))?;
    let duration_seconds = coerce_duration(request.duration_seconds);
    let aspect_ratio = coerce_aspect_ratio(request.aspect_ratio.as_deref());
    let seed = request.seed.unwrap_or_else(|| i64::from(rand::random::<u32>()));
    let style = request.style.filter(|s| !s.trim().is_empty());

    Ok(Submission {
        params: RenderParams::derive(duration_seconds, aspect_ratio, seed),
        prompt,
        style,
        duration_seconds,
        aspect_ratio,
        seed,
    })
}

/// Validate and enqueue a generation job.
pub async fn submit(pool: &SqlitePool, request: GenerateRequest) -> ApiResult<Job> {
    let submission = prepare(request)?;

    let job = queries::create_job(
        pool,
        &submission.prompt,
        submission.style.as_deref(),
        submission.duration_seconds,
        submission.aspect_ratio,
        Some(submission.seed),
        &submission.params,
    )
    .await?;

    metrics::counter!("video_jobs_submitted_total").increment(1);

    info!(
        job_id = %job.id,
        duration_seconds = job.duration_seconds,
        aspect_ratio = %job.aspect_ratio,
        seed = submission.seed,
        "Job queued"
    );

    Ok(job)
}
