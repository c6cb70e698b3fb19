//! Single-consumer job loop.
//!
//! The worker polls the job table, claims the oldest queued job, hands it to
//! the [`Renderer`] and records the outcome. Jobs run strictly one at a time.

use sqlx::SqlitePool;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::db::{queries, StoreError};
use crate::models::job::{Job, JobOutcome, JobStatus};
use crate::services::renderer::{RenderError, RenderOutput, RenderRequest, Renderer};

/// Immediate attempts at recording a terminal state. After that the outcome is
/// parked and written before the next claim.
const MAX_FINALIZE_ATTEMPTS: u32 = 5;

/// Prompt actually sent to the model. A style of `"None"` is what clients send
/// for "no style" and is treated as absent.
pub fn compose_prompt(prompt: &str, style: Option<&str>) -> String {
    match style {
        Some(style) if !style.is_empty() && style != "None" => {
            format!("{style}, 4k, high quality: {prompt}")
        }
        _ => prompt.to_string(),
    }
}

pub fn render_request(job: &Job) -> RenderRequest {
    RenderRequest {
        job_id: job.id,
        prompt: compose_prompt(&job.prompt, job.style.as_deref()),
        width: job.params.width,
        height: job.params.height,
        num_frames: job.params.num_frames,
        fps: job.params.fps,
        seed: job.params.seed,
    }
}

pub struct Worker {
    pool: SqlitePool,
    renderer: Arc<dyn Renderer>,
    poll_interval: Duration,
    /// Outcome of a finished job whose terminal write has not landed yet.
    unrecorded: Mutex<Option<(Uuid, JobOutcome)>>,
}

impl Worker {
    pub fn new(pool: SqlitePool, renderer: Arc<dyn Renderer>, poll_interval: Duration) -> Self {
        Self {
            pool,
            renderer,
            poll_interval,
            unrecorded: Mutex::new(None),
        }
    }

    /// Process jobs until `shutdown` resolves.
    ///
    /// Shutdown is only observed between jobs and while idle, so a claimed job
    /// always runs to a terminal state first.
    pub async fn run(&self, shutdown: impl Future<Output = ()>) {
        tokio::pin!(shutdown);
        info!(poll_interval_ms = self.poll_interval.as_millis() as u64, "Worker loop started");

        loop {
            let idle = match self.run_once().await {
                Ok(true) => {
                    debug!("Job processed, checking for next job");
                    false
                }
                Ok(false) => {
                    tracing::trace!("No jobs available, sleeping");
                    true
                }
                Err(e) => {
                    error!(error = %e, "Error polling for jobs, will retry");
                    true
                }
            };

            if idle {
                tokio::select! {
                    _ = &mut shutdown => break,
                    _ = sleep(self.poll_interval) => {}
                }
            } else {
                tokio::select! {
                    biased;
                    _ = &mut shutdown => break,
                    _ = std::future::ready(()) => {}
                }
            }
        }

        if let Err(e) = self.flush_unrecorded().await {
            error!(error = %e, "Stopping with a job outcome still unrecorded");
        }
        info!("Worker loop stopped");
    }

    /// Claim and process at most one job.
    /// Returns Ok(true) if a job was processed, Ok(false) if the queue was empty.
    ///
    /// A previously parked outcome is written first; no new job is claimed
    /// until it is.
    pub async fn run_once(&self) -> Result<bool, StoreError> {
        self.flush_unrecorded().await?;

        let job = match queries::claim_next_queued_job(&self.pool).await? {
            Some(job) => job,
            None => {
                self.record_queue_depth().await;
                return Ok(false);
            }
        };

        self.dispatch(job).await;
        self.record_queue_depth().await;
        Ok(true)
    }

    async fn dispatch(&self, job: Job) {
        let request = render_request(&job);
        info!(
            job_id = %job.id,
            duration_seconds = job.duration_seconds,
            aspect_ratio = %job.aspect_ratio,
            seed = request.seed,
            "Processing video job"
        );

        let start = Instant::now();
        let result = self.render_isolated(request).await;
        let elapsed = start.elapsed();
        metrics::histogram!("video_render_seconds").record(elapsed.as_secs_f64());

        let outcome = match result {
            Ok(output) => {
                metrics::counter!("video_jobs_completed_total").increment(1);
                info!(
                    job_id = %job.id,
                    render_ms = elapsed.as_millis() as u64,
                    video_path = %output.video_path,
                    "Job completed successfully"
                );
                JobOutcome::Done {
                    video_path: output.video_path,
                    thumbnail_path: output.thumbnail_path,
                }
            }
            Err(e) => {
                metrics::counter!("video_jobs_failed_total").increment(1);
                error!(job_id = %job.id, error = %e, "Job processing failed");
                JobOutcome::Failed {
                    error_message: e.to_string(),
                }
            }
        };

        let failed = matches!(outcome, JobOutcome::Failed { .. });
        self.finalize(job.id, outcome).await;
        if failed {
            self.renderer.release_memory().await;
        }
    }

    /// Run the renderer on its own task so a panic becomes a job failure
    /// instead of unwinding through the loop.
    async fn render_isolated(
        &self,
        request: RenderRequest,
    ) -> Result<RenderOutput, RenderError> {
        let renderer = Arc::clone(&self.renderer);
        let handle = tokio::spawn(async move { renderer.render(&request).await });

        match handle.await {
            Ok(result) => result,
            Err(join_error) => Err(RenderError::Panicked(panic_message(join_error))),
        }
    }

    async fn finalize(&self, job_id: Uuid, outcome: JobOutcome) {
        for attempt in 1..=MAX_FINALIZE_ATTEMPTS {
            match queries::update_job_terminal(&self.pool, job_id, &outcome).await {
                Ok(_) => return,
                Err(e) => {
                    warn!(
                        job_id = %job_id,
                        attempt,
                        error = %e,
                        "Failed to record job outcome"
                    );
                    if attempt < MAX_FINALIZE_ATTEMPTS {
                        sleep(self.poll_interval).await;
                    }
                }
            }
        }

        error!(
            job_id = %job_id,
            status = %outcome.status(),
            "Job outcome still unrecorded; will retry before claiming another job"
        );
        *self.unrecorded.lock().await = Some((job_id, outcome));
    }

    /// Write the parked outcome, if any. It stays parked on failure.
    async fn flush_unrecorded(&self) -> Result<(), StoreError> {
        let mut unrecorded = self.unrecorded.lock().await;
        if let Some((job_id, outcome)) = unrecorded.take() {
            if let Err(e) = queries::update_job_terminal(&self.pool, job_id, &outcome).await {
                *unrecorded = Some((job_id, outcome));
                return Err(e);
            }
            info!(job_id = %job_id, status = %outcome.status(), "Recorded delayed job outcome");
        }
        Ok(())
    }

    async fn record_queue_depth(&self) {
        match queries::count_jobs_by_status(&self.pool, JobStatus::Queued).await {
            Ok(depth) => metrics::gauge!("video_queue_depth").set(depth as f64),
            Err(e) => debug!(error = %e, "Could not read queue depth"),
        }
    }
}

fn panic_message(join_error: tokio::task::JoinError) -> String {
    if !join_error.is_panic() {
        return join_error.to_string();
    }
    let payload = join_error.into_panic();
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::job::{AspectRatio, RenderParams};
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn style_is_prefixed_onto_prompt() {
        assert_eq!(
            compose_prompt("a cat surfing", Some("anime")),
            "anime, 4k, high quality: a cat surfing"
        );
    }

    #[test]
    fn none_style_is_ignored() {
        assert_eq!(compose_prompt("a cat surfing", Some("None")), "a cat surfing");
        assert_eq!(compose_prompt("a cat surfing", Some("")), "a cat surfing");
        assert_eq!(compose_prompt("a cat surfing", None), "a cat surfing");
    }

    #[test]
    fn render_request_uses_stored_params() {
        let now = Utc::now();
        let job = Job {
            id: Uuid::new_v4(),
            prompt: "mountains".to_string(),
            style: None,
            duration_seconds: 2,
            aspect_ratio: AspectRatio::Square,
            seed: Some(99),
            status: JobStatus::Running,
            error_message: None,
            video_path: None,
            thumbnail_path: None,
            created_at: now,
            updated_at: now,
            params: RenderParams::derive(2, AspectRatio::Square, 99),
        };

        let request = render_request(&job);
        assert_eq!(request.job_id, job.id);
        assert_eq!((request.width, request.height), (768, 768));
        assert_eq!(request.num_frames, 16);
        assert_eq!(request.fps, 8);
        assert_eq!(request.seed, 99);
    }

    #[tokio::test]
    async fn panic_payload_is_recovered() {
        let handle = tokio::spawn(async { panic!("model exploded") });
        let err = handle.await.unwrap_err();
        assert_eq!(panic_message(err), "model exploded");
    }
}
