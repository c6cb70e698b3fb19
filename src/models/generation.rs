use chrono::{DateTime, Utc};
use garde::Validate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::job::{AspectRatio, Job, JobStatus};

/// Body of `POST /api/generate`.
///
/// `duration_seconds` and `aspect_ratio` accept anything; values outside the
/// supported sets are coerced to defaults during submission.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct GenerateRequest {
    #[garde(required, length(min = 1))]
    pub prompt: Option<String>,

    #[garde(skip)]
    pub style: Option<String>,

    #[garde(skip)]
    pub duration_seconds: Option<i64>,

    #[garde(skip)]
    pub aspect_ratio: Option<String>,

    #[garde(skip)]
    pub seed: Option<i64>,
}

/// Response after submitting a prompt.
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
}

/// Client view of a job.
#[derive(Debug, Serialize, Deserialize)]
pub struct JobDetail {
    pub job_id: Uuid,
    pub prompt: String,
    pub style: Option<String>,
    pub duration_seconds: u32,
    pub aspect_ratio: AspectRatio,
    pub seed: Option<i64>,
    pub status: JobStatus,
    pub error_message: Option<String>,
    pub video_url: Option<String>,
    pub thumbnail_url: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl JobDetail {
    /// Builds the client view, turning stored artifact paths into absolute URLs.
    pub fn from_job(job: Job, public_base_url: &str) -> Self {
        Self {
            job_id: job.id,
            video_url: job
                .video_path
                .as_deref()
                .map(|path| artifact_url(public_base_url, path)),
            thumbnail_url: job
                .thumbnail_path
                .as_deref()
                .map(|path| artifact_url(public_base_url, path)),
            prompt: job.prompt,
            style: job.style,
            duration_seconds: job.duration_seconds,
            aspect_ratio: job.aspect_ratio,
            seed: job.seed,
            status: job.status,
            error_message: job.error_message,
            created_at: job.created_at,
        }
    }
}

/// Query string of `GET /api/jobs/recent`.
#[derive(Debug, Deserialize)]
pub struct RecentJobsQuery {
    #[serde(default = "default_limit")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_limit() -> u32 {
    20
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RecentJobsResponse {
    pub jobs: Vec<JobDetail>,
}

/// Artifacts are served under `/outputs`, keyed by their path inside the output directory.
pub fn artifact_url(public_base_url: &str, relative_path: &str) -> String {
    format!(
        "{}/outputs/{}",
        public_base_url.trim_end_matches('/'),
        relative_path.replace('\\', "/").trim_start_matches('/')
    )
}
