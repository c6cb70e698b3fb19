use local_video_generator::{
    config::AppConfig,
    db,
    routes,
    services::{
        inference::InferenceClient,
        renderer::{DiffusionRenderer, Renderer},
        storage::ArtifactStore,
    },
    worker::Worker,
};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    tracing::info!("Starting video generation worker");

    let config = AppConfig::from_env().expect("Failed to load configuration");

    if let Some(addr) = &config.worker_metrics_addr {
        let addr: SocketAddr = addr.parse().expect("Invalid WORKER_METRICS_ADDR");
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .expect("Failed to install Prometheus exporter");
        routes::metrics::describe();
        tracing::info!(%addr, "Worker metrics exporter listening");
    }

    tracing::info!(path = %config.database_path.display(), "Opening SQLite job database");
    let db_pool = db::init_pool(&config.database_path)
        .await
        .expect("Failed to open database");

    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    // The renderer owns the model service connection for the life of the process.
    tracing::info!(url = %config.inference_url, "Connecting renderer to inference service");
    let inference = InferenceClient::new(&config.inference_url, config.render_timeout())
        .expect("Failed to initialize inference client");
    let renderer: Arc<dyn Renderer> = Arc::new(DiffusionRenderer::new(
        inference,
        ArtifactStore::new(&config.output_dir),
    ));

    let worker = Worker::new(db_pool.clone(), Arc::clone(&renderer), config.poll_interval());

    // Listen for Ctrl-C from the start, not only once the loop first idles.
    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        tracing::info!("Shutdown signal received, finishing current job");
        stop_tx.send(()).ok();
    });

    tracing::info!("Worker ready, waiting for jobs");
    worker
        .run(async {
            stop_rx.await.ok();
        })
        .await;

    renderer.release_memory().await;
    db_pool.close().await;
    tracing::info!("Worker stopped");
}
