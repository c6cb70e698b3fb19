//! The render step the worker delegates to.
//!
//! [`Renderer`] is the only seam the worker sees. [`DiffusionRenderer`] is the
//! production implementation: it asks the inference service for an encoded
//! clip and writes the result into the output directory.

use async_trait::async_trait;
use uuid::Uuid;

use crate::services::inference::{GenerationRequest, InferenceClient, InferenceError};
use crate::services::storage::{ArtifactStore, StorageError};

/// Everything needed to render one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderRequest {
    pub job_id: Uuid,
    pub prompt: String,
    pub width: u32,
    pub height: u32,
    pub num_frames: u32,
    pub fps: u32,
    pub seed: i64,
}

/// Paths of the rendered artifacts, relative to the output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderOutput {
    pub video_path: String,
    pub thumbnail_path: String,
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("Generation failed: {0}")]
    Inference(#[from] InferenceError),

    #[error("Saving output failed: {0}")]
    Storage(#[from] StorageError),

    #[error("Renderer panicked: {0}")]
    Panicked(String),

    #[error("{0}")]
    Other(String),
}

#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(&self, request: &RenderRequest) -> Result<RenderOutput, RenderError>;

    /// Free accelerator memory held by the models. Called after a failed render
    /// and on shutdown; failures are logged by the implementation.
    async fn release_memory(&self);
}

pub struct DiffusionRenderer {
    inference: InferenceClient,
    artifacts: ArtifactStore,
}

impl DiffusionRenderer {
    pub fn new(inference: InferenceClient, artifacts: ArtifactStore) -> Self {
        Self {
            inference,
            artifacts,
        }
    }
}

#[async_trait]
impl Renderer for DiffusionRenderer {
    async fn render(&self, request: &RenderRequest) -> Result<RenderOutput, RenderError> {
        let generation = GenerationRequest::new(
            &request.prompt,
            request.width,
            request.height,
            request.num_frames,
            request.fps,
            request.seed,
        );

        tracing::info!(
            job_id = %request.job_id,
            width = request.width,
            height = request.height,
            num_frames = request.num_frames,
            "Requesting generation"
        );
        let clip = self.inference.generate(&generation).await?;

        let video_path = self.artifacts.save_video(request.job_id, &clip.video_mp4).await?;
        let thumbnail_path = self
            .artifacts
            .save_thumbnail(request.job_id, &clip.thumbnail_png)
            .await?;

        Ok(RenderOutput {
            video_path,
            thumbnail_path,
        })
    }

    async fn release_memory(&self) {
        if let Err(e) = self.inference.release_memory().await {
            tracing::warn!(error = %e, "Failed to release accelerator memory");
        }
    }
}
