use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::types::Json;
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use super::StoreError;
use crate::models::job::{AspectRatio, Job, JobOutcome, JobStatus, RenderParams};

/// Fixed-width RFC 3339 so that text order in SQLite matches time order.
fn timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn job_from_row(row: &SqliteRow) -> Result<Job, StoreError> {
    let id: String = row.try_get("id")?;
    let status: String = row.try_get("status")?;
    let aspect_ratio: String = row.try_get("aspect_ratio")?;
    let Json(params): Json<RenderParams> = row.try_get("params")?;

    Ok(Job {
        id: Uuid::parse_str(&id)
            .map_err(|e| StoreError::Corrupt(format!("invalid job id {id:?}: {e}")))?,
        prompt: row.try_get("prompt")?,
        style: row.try_get("style")?,
        duration_seconds: row.try_get("duration_seconds")?,
        aspect_ratio: aspect_ratio.parse::<AspectRatio>().map_err(|_| {
            StoreError::Corrupt(format!("unknown aspect ratio {aspect_ratio:?} for job {id}"))
        })?,
        seed: row.try_get("seed")?,
        status: status
            .parse::<JobStatus>()
            .map_err(|_| StoreError::Corrupt(format!("unknown status {status:?} for job {id}")))?,
        error_message: row.try_get("error_message")?,
        video_path: row.try_get("video_path")?,
        thumbnail_path: row.try_get("thumbnail_path")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        params,
    })
}

/// Insert a new queued job. Callers validate the fields beforehand.
pub async fn create_job(
    pool: &SqlitePool,
    prompt: &str,
    style: Option<&str>,
    duration_seconds: u32,
    aspect_ratio: AspectRatio,
    seed: Option<i64>,
    params: &RenderParams,
) -> Result<Job, StoreError> {
    let now = timestamp(Utc::now());

    let row = sqlx::query(
        r#"
        INSERT INTO jobs (id, prompt, style, duration_seconds, aspect_ratio, seed,
                          status, params, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, 'queued', ?, ?, ?)
        RETURNING id, prompt, style, duration_seconds, aspect_ratio, seed, status,
                  error_message, video_path, thumbnail_path, params, created_at, updated_at
        "#,
    )
    .bind(Uuid::new_v4().to_string())
    .bind(prompt)
    .bind(style)
    .bind(duration_seconds)
    .bind(aspect_ratio.to_string())
    .bind(seed)
    .bind(Json(params))
    .bind(&now)
    .bind(&now)
    .fetch_one(pool)
    .await?;

    job_from_row(&row)
}

/// Get a job by ID
pub async fn get_job(pool: &SqlitePool, job_id: Uuid) -> Result<Option<Job>, StoreError> {
    let row = sqlx::query(
        r#"
        SELECT id, prompt, style, duration_seconds, aspect_ratio, seed, status,
               error_message, video_path, thumbnail_path, params, created_at, updated_at
        FROM jobs
        WHERE id = ?
        "#,
    )
    .bind(job_id.to_string())
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(job_from_row).transpose()
}

/// Newest jobs first.
pub async fn list_recent_jobs(
    pool: &SqlitePool,
    limit: u32,
    offset: u32,
) -> Result<Vec<Job>, StoreError> {
    let rows = sqlx::query(
        r#"
        SELECT id, prompt, style, duration_seconds, aspect_ratio, seed, status,
               error_message, video_path, thumbnail_path, params, created_at, updated_at
        FROM jobs
        ORDER BY created_at DESC, rowid DESC
        LIMIT ? OFFSET ?
        "#,
    )
    .bind(i64::from(limit))
    .bind(i64::from(offset))
    .fetch_all(pool)
    .await?;

    rows.iter().map(job_from_row).collect()
}

/// Atomically move the oldest queued job to `running` and return it.
///
/// The select and the status flip happen in one statement, and the update is
/// guarded on the row still being queued, so concurrent claimers can never
/// receive the same job.
pub async fn claim_next_queued_job(pool: &SqlitePool) -> Result<Option<Job>, StoreError> {
    let row = sqlx::query(
        r#"
        UPDATE jobs
        SET status = 'running',
            updated_at = ?
        WHERE id = (
            SELECT id FROM jobs
            WHERE status = 'queued'
            ORDER BY created_at ASC, rowid ASC
            LIMIT 1
        )
        AND status = 'queued'
        RETURNING id, prompt, style, duration_seconds, aspect_ratio, seed, status,
                  error_message, video_path, thumbnail_path, params, created_at, updated_at
        "#,
    )
    .bind(timestamp(Utc::now()))
    .fetch_optional(pool)
    .await?;

    row.as_ref().map(job_from_row).transpose()
}

/// Record how a running job ended.
///
/// Returns `false` without touching anything when the job does not exist or is
/// not currently running.
pub async fn update_job_terminal(
    pool: &SqlitePool,
    job_id: Uuid,
    outcome: &JobOutcome,
) -> Result<bool, StoreError> {
    let status = outcome.status();
    debug_assert!(JobStatus::Running.can_transition_to(status));

    let (video_path, thumbnail_path, error_message) = match outcome {
        JobOutcome::Done {
            video_path,
            thumbnail_path,
        } => (Some(video_path.as_str()), Some(thumbnail_path.as_str()), None),
        JobOutcome::Failed { error_message } => (None, None, Some(error_message.as_str())),
    };

    let result = sqlx::query(
        r#"
        UPDATE jobs
        SET status = ?,
            updated_at = ?,
            video_path = ?,
            thumbnail_path = ?,
            error_message = ?
        WHERE id = ? AND status = 'running'
        "#,
    )
    .bind(status.to_string())
    .bind(timestamp(Utc::now()))
    .bind(video_path)
    .bind(thumbnail_path)
    .bind(error_message)
    .bind(job_id.to_string())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        tracing::warn!(
            job_id = %job_id,
            status = %status,
            "Terminal update skipped: job not found or not running"
        );
        return Ok(false);
    }

    Ok(true)
}

/// Number of jobs currently in `status`.
pub async fn count_jobs_by_status(pool: &SqlitePool, status: JobStatus) -> Result<i64, StoreError> {
    let row = sqlx::query("SELECT COUNT(*) AS count FROM jobs WHERE status = ?")
        .bind(status.to_string())
        .fetch_one(pool)
        .await?;

    Ok(row.try_get("count")?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timestamps_have_fixed_width() {
        let whole = DateTime::parse_from_rfc3339("2026-01-01T00:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let fractional = DateTime::parse_from_rfc3339("2026-01-01T00:00:00.5Z")
            .unwrap()
            .with_timezone(&Utc);

        assert_eq!(timestamp(whole), "2026-01-01T00:00:00.000000Z");
        assert_eq!(timestamp(whole).len(), timestamp(fractional).len());
        assert!(timestamp(whole) < timestamp(fractional));
    }
}
