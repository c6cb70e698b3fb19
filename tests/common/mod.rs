//! Shared helpers for integration tests.

#![allow(dead_code)]

use local_video_generator::{
    db::{self, queries},
    models::job::{AspectRatio, Job, RenderParams},
};
use sqlx::SqlitePool;
use tempfile::TempDir;

/// A migrated database in a fresh temporary directory. Keep the `TempDir`
/// alive for as long as the pool is used.
pub async fn test_pool() -> (TempDir, SqlitePool) {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let pool = db::init_pool(&dir.path().join("jobs.db"))
        .await
        .expect("Failed to open test database");
    db::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");
    (dir, pool)
}

/// Insert a queued job with default parameters.
pub async fn queue_job(pool: &SqlitePool, prompt: &str) -> Job {
    let params = RenderParams::derive(4, AspectRatio::Landscape, 1);
    queries::create_job(pool, prompt, None, 4, AspectRatio::Landscape, Some(1), &params)
        .await
        .expect("Failed to create job")
}
