use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Diffusion steps for both the image and the video stage.
const NUM_INFERENCE_STEPS: u32 = 30;

/// Frames decoded per VAE chunk by the video stage.
const DECODE_CHUNK_SIZE: u32 = 8;

/// Accelerator available to the inference service.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeviceInfo {
    pub accelerator_available: bool,
    pub device_name: String,
}

/// Reports which execution device generation will run on.
#[async_trait]
pub trait DeviceProbe: Send + Sync {
    async fn device_info(&self) -> Result<DeviceInfo, InferenceError>;
}

/// Parameters for one text → image → video generation.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest<'a> {
    pub prompt: &'a str,
    pub width: u32,
    pub height: u32,
    pub num_frames: u32,
    pub fps: u32,
    pub seed: i64,
    pub num_inference_steps: u32,
    pub decode_chunk_size: u32,
}

impl<'a> GenerationRequest<'a> {
    pub fn new(prompt: &'a str, width: u32, height: u32, num_frames: u32, fps: u32, seed: i64) -> Self {
        Self {
            prompt,
            width,
            height,
            num_frames,
            fps,
            seed,
            num_inference_steps: NUM_INFERENCE_STEPS,
            decode_chunk_size: DECODE_CHUNK_SIZE,
        }
    }
}

#[derive(Deserialize)]
struct GenerateResponse {
    video_mp4: String,
    thumbnail_png: String,
}

#[derive(Deserialize)]
struct ServiceErrorBody {
    error: String,
}

/// Encoded media returned by the inference service.
#[derive(Debug, Clone)]
pub struct GeneratedClip {
    pub video_mp4: Vec<u8>,
    pub thumbnail_png: Vec<u8>,
}

/// Client for the local diffusion inference service (SDXL → SVD pipeline).
pub struct InferenceClient {
    http: Client,
    base_url: String,
}

impl InferenceClient {
    pub fn new(base_url: &str, render_timeout: Duration) -> Result<Self, InferenceError> {
        let http = Client::builder()
            .timeout(render_timeout)
            .build()
            .map_err(InferenceError::Http)?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Run the full pipeline and return the encoded video and its first frame.
    pub async fn generate(
        &self,
        request: &GenerationRequest<'_>,
    ) -> Result<GeneratedClip, InferenceError> {
        let url = format!("{}/generate", self.base_url);

        let response = self
            .http
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(InferenceError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(service_error(status, &body));
        }

        let payload: GenerateResponse = response.json().await.map_err(InferenceError::Http)?;
        decode_clip(&payload)
    }

    /// Ask the service to free cached accelerator memory.
    pub async fn release_memory(&self) -> Result<(), InferenceError> {
        let url = format!("{}/release", self.base_url);

        let response = self
            .http
            .post(&url)
            .timeout(Duration::from_secs(30))
            .send()
            .await
            .map_err(InferenceError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(service_error(status, &body));
        }
        Ok(())
    }
}

#[async_trait]
impl DeviceProbe for InferenceClient {
    async fn device_info(&self) -> Result<DeviceInfo, InferenceError> {
        let url = format!("{}/health", self.base_url);

        let response = self
            .http
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .map_err(InferenceError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(service_error(status, &body));
        }

        response.json().await.map_err(InferenceError::Http)
    }
}

fn service_error(status: reqwest::StatusCode, body: &str) -> InferenceError {
    let message = serde_json::from_str::<ServiceErrorBody>(body)
        .map(|b| b.error)
        .unwrap_or_else(|_| body.trim().to_string());
    InferenceError::Service {
        status: status.as_u16(),
        message,
    }
}

fn decode_clip(payload: &GenerateResponse) -> Result<GeneratedClip, InferenceError> {
    let engine = base64::engine::general_purpose::STANDARD;
    let video_mp4 = engine.decode(&payload.video_mp4)?;
    let thumbnail_png = engine.decode(&payload.thumbnail_png)?;

    if video_mp4.is_empty() {
        return Err(InferenceError::EmptyVideo);
    }

    Ok(GeneratedClip {
        video_mp4,
        thumbnail_png,
    })
}

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Inference service returned {status}: {message}")]
    Service { status: u16, message: String },

    #[error("Inference service returned invalid base64 media: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("Inference service returned an empty video")]
    EmptyVideo,
}
