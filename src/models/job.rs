use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Clip lengths the renderer accepts.
pub const ALLOWED_DURATIONS: [u32; 3] = [2, 4, 6];

/// Duration used when the requested one is missing or not in [`ALLOWED_DURATIONS`].
pub const DEFAULT_DURATION_SECONDS: u32 = 4;

/// Output frame rate. Fixed for every job.
pub const FPS: u32 = 8;

/// Lifecycle state of a video generation job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, EnumString, Display, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Done,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Done | JobStatus::Failed)
    }

    /// `queued → running → {done | failed}`; nothing else.
    pub fn can_transition_to(self, next: JobStatus) -> bool {
        matches!(
            (self, next),
            (JobStatus::Queued, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Done)
                | (JobStatus::Running, JobStatus::Failed)
        )
    }
}

/// Output frame shape.
#[derive(
    Debug, Clone, Copy, Default, Serialize, Deserialize, EnumString, Display, PartialEq, Eq,
)]
pub enum AspectRatio {
    #[serde(rename = "1:1")]
    #[strum(serialize = "1:1")]
    Square,

    #[default]
    #[serde(rename = "16:9")]
    #[strum(serialize = "16:9")]
    Landscape,

    #[serde(rename = "9:16")]
    #[strum(serialize = "9:16")]
    Portrait,
}

impl AspectRatio {
    /// Pixel `(width, height)` rendered for this ratio.
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            AspectRatio::Square => (768, 768),
            AspectRatio::Landscape => (768, 432),
            AspectRatio::Portrait => (432, 768),
        }
    }
}

/// Rendering parameters derived once at submission and stored with the job.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct RenderParams {
    pub fps: u32,
    pub num_frames: u32,
    pub width: u32,
    pub height: u32,
    pub seed: i64,
}

impl RenderParams {
    pub fn derive(duration_seconds: u32, aspect_ratio: AspectRatio, seed: i64) -> Self {
        let (width, height) = aspect_ratio.dimensions();
        Self {
            fps: FPS,
            num_frames: duration_seconds * FPS,
            width,
            height,
            seed,
        }
    }
}

/// How a running job ended. The only way to move a job into a terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    Done {
        video_path: String,
        thumbnail_path: String,
    },
    Failed {
        error_message: String,
    },
}

impl JobOutcome {
    pub fn status(&self) -> JobStatus {
        match self {
            JobOutcome::Done { .. } => JobStatus::Done,
            JobOutcome::Failed { .. } => JobStatus::Failed,
        }
    }
}

/// A video generation job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    pub prompt: String,
    pub style: Option<String>,
    pub duration_seconds: u32,
    pub aspect_ratio: AspectRatio,
    pub seed: Option<i64>,
    pub status: JobStatus,
    pub error_message: Option<String>,
    pub video_path: Option<String>,
    pub thumbnail_path: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub params: RenderParams,
}
