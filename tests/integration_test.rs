//! Job record store tests against a real SQLite database.

mod common;

use common::{queue_job, test_pool};
use local_video_generator::{
    db::queries,
    models::job::{AspectRatio, JobOutcome, JobStatus, RenderParams},
};
use std::collections::HashSet;
use uuid::Uuid;

#[tokio::test]
async fn test_create_and_get_job() {
    let (_dir, pool) = test_pool().await;
    let params = RenderParams::derive(6, AspectRatio::Portrait, 77);

    let job = queries::create_job(
        &pool,
        "a paper boat in rain",
        Some("watercolor"),
        6,
        AspectRatio::Portrait,
        Some(77),
        &params,
    )
    .await
    .expect("Failed to create job");

    assert_eq!(job.status, JobStatus::Queued);
    assert_eq!(job.created_at, job.updated_at);
    assert!(job.error_message.is_none());
    assert!(job.video_path.is_none());

    let fetched = queries::get_job(&pool, job.id)
        .await
        .expect("Failed to get job")
        .expect("Job not found");

    assert_eq!(fetched.id, job.id);
    assert_eq!(fetched.prompt, "a paper boat in rain");
    assert_eq!(fetched.style.as_deref(), Some("watercolor"));
    assert_eq!(fetched.duration_seconds, 6);
    assert_eq!(fetched.aspect_ratio, AspectRatio::Portrait);
    assert_eq!(fetched.seed, Some(77));
    assert_eq!(fetched.params, params);
    assert_eq!(fetched.params.num_frames, 48);
}

#[tokio::test]
async fn test_get_unknown_job_returns_none() {
    let (_dir, pool) = test_pool().await;
    let missing = queries::get_job(&pool, Uuid::new_v4()).await.unwrap();
    assert!(missing.is_none());
}

#[tokio::test]
async fn test_list_recent_orders_newest_first_with_pagination() {
    let (_dir, pool) = test_pool().await;

    let mut ids = Vec::new();
    for i in 0..5 {
        ids.push(queue_job(&pool, &format!("prompt {i}")).await.id);
    }

    let all = queries::list_recent_jobs(&pool, 20, 0).await.unwrap();
    let listed: Vec<Uuid> = all.iter().map(|j| j.id).collect();
    let expected: Vec<Uuid> = ids.iter().rev().copied().collect();
    assert_eq!(listed, expected);

    for pair in all.windows(2) {
        assert!(pair[0].created_at >= pair[1].created_at);
    }

    let page = queries::list_recent_jobs(&pool, 2, 1).await.unwrap();
    let page_ids: Vec<Uuid> = page.iter().map(|j| j.id).collect();
    assert_eq!(page_ids, vec![ids[3], ids[2]]);

    let past_end = queries::list_recent_jobs(&pool, 10, 5).await.unwrap();
    assert!(past_end.is_empty());
}

#[tokio::test]
async fn test_claim_is_fifo_and_marks_running() {
    let (_dir, pool) = test_pool().await;
    let first = queue_job(&pool, "first").await;
    let second = queue_job(&pool, "second").await;

    let claimed = queries::claim_next_queued_job(&pool)
        .await
        .unwrap()
        .expect("Expected a queued job");
    assert_eq!(claimed.id, first.id);
    assert_eq!(claimed.status, JobStatus::Running);
    assert!(claimed.updated_at >= first.updated_at);

    let stored = queries::get_job(&pool, first.id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Running);

    // The running job is not handed out again.
    let next = queries::claim_next_queued_job(&pool).await.unwrap().unwrap();
    assert_eq!(next.id, second.id);

    assert!(queries::claim_next_queued_job(&pool).await.unwrap().is_none());
}

#[tokio::test]
async fn test_claim_on_empty_queue_returns_none() {
    let (_dir, pool) = test_pool().await;
    assert!(queries::claim_next_queued_job(&pool).await.unwrap().is_none());
}

#[tokio::test]
async fn test_concurrent_claims_never_duplicate() {
    const JOBS: usize = 24;
    const CLAIMERS: usize = 6;

    let (_dir, pool) = test_pool().await;
    for i in 0..JOBS {
        queue_job(&pool, &format!("job {i}")).await;
    }

    let claimers = (0..CLAIMERS).map(|_| {
        let pool = pool.clone();
        tokio::spawn(async move {
            let mut claimed = Vec::new();
            while let Some(job) = queries::claim_next_queued_job(&pool)
                .await
                .expect("Claim failed")
            {
                claimed.push(job.id);
            }
            claimed
        })
    });

    let results = futures::future::join_all(claimers).await;
    let all: Vec<Uuid> = results
        .into_iter()
        .flat_map(|r| r.expect("Claimer task panicked"))
        .collect();
    let unique: HashSet<Uuid> = all.iter().copied().collect();

    assert_eq!(all.len(), JOBS, "every job claimed exactly once");
    assert_eq!(unique.len(), JOBS, "no job claimed twice");
    assert_eq!(
        queries::count_jobs_by_status(&pool, JobStatus::Queued).await.unwrap(),
        0
    );
    assert_eq!(
        queries::count_jobs_by_status(&pool, JobStatus::Running).await.unwrap(),
        JOBS as i64
    );
}

#[tokio::test]
async fn test_update_terminal_done_sets_paths() {
    let (_dir, pool) = test_pool().await;
    let job = queue_job(&pool, "done job").await;
    queries::claim_next_queued_job(&pool).await.unwrap().unwrap();

    let outcome = JobOutcome::Done {
        video_path: format!("videos/{}.mp4", job.id),
        thumbnail_path: format!("thumbs/{}.jpg", job.id),
    };
    let applied = queries::update_job_terminal(&pool, job.id, &outcome).await.unwrap();
    assert!(applied);

    let stored = queries::get_job(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Done);
    assert_eq!(stored.video_path, Some(format!("videos/{}.mp4", job.id)));
    assert_eq!(stored.thumbnail_path, Some(format!("thumbs/{}.jpg", job.id)));
    assert!(stored.error_message.is_none());
    assert!(stored.updated_at >= stored.created_at);
}

#[tokio::test]
async fn test_update_terminal_failed_sets_message() {
    let (_dir, pool) = test_pool().await;
    let job = queue_job(&pool, "failed job").await;
    queries::claim_next_queued_job(&pool).await.unwrap().unwrap();

    let outcome = JobOutcome::Failed {
        error_message: "CUDA out of memory".to_string(),
    };
    assert!(queries::update_job_terminal(&pool, job.id, &outcome).await.unwrap());

    let stored = queries::get_job(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Failed);
    assert_eq!(stored.error_message.as_deref(), Some("CUDA out of memory"));
    assert!(stored.video_path.is_none());
    assert!(stored.thumbnail_path.is_none());
}

#[tokio::test]
async fn test_update_terminal_unknown_id_is_noop() {
    let (_dir, pool) = test_pool().await;
    queue_job(&pool, "bystander").await;

    let outcome = JobOutcome::Failed {
        error_message: "boom".to_string(),
    };
    let applied = queries::update_job_terminal(&pool, Uuid::new_v4(), &outcome)
        .await
        .expect("Unknown id must not be an error");
    assert!(!applied);
    assert_eq!(
        queries::count_jobs_by_status(&pool, JobStatus::Failed).await.unwrap(),
        0
    );
}

#[tokio::test]
async fn test_terminal_jobs_cannot_move_again() {
    let (_dir, pool) = test_pool().await;
    let job = queue_job(&pool, "once").await;

    // Queued jobs must be claimed before they can finish.
    let done = JobOutcome::Done {
        video_path: "videos/x.mp4".to_string(),
        thumbnail_path: "thumbs/x.jpg".to_string(),
    };
    assert!(!queries::update_job_terminal(&pool, job.id, &done).await.unwrap());

    queries::claim_next_queued_job(&pool).await.unwrap().unwrap();
    assert!(queries::update_job_terminal(&pool, job.id, &done).await.unwrap());

    let failed = JobOutcome::Failed {
        error_message: "late failure".to_string(),
    };
    assert!(!queries::update_job_terminal(&pool, job.id, &failed).await.unwrap());

    let stored = queries::get_job(&pool, job.id).await.unwrap().unwrap();
    assert_eq!(stored.status, JobStatus::Done);
    assert!(stored.error_message.is_none());

    // Terminal jobs never re-enter the queue.
    assert!(queries::claim_next_queued_job(&pool).await.unwrap().is_none());
}
