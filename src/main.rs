use metrics_exporter_prometheus::PrometheusBuilder;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use local_video_generator::{
    app_state::AppState,
    config::AppConfig,
    db,
    routes,
    services::inference::InferenceClient,
};

#[tokio::main]
async fn main() {
    // Initialize structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .json()
        .init();

    // Load configuration from environment
    let config = AppConfig::from_env().expect("Failed to load configuration from environment");

    tracing::info!("Initializing local-video-generator server");

    // Initialize Prometheus metrics recorder
    let prometheus_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus metrics recorder");
    let prometheus_handle = Arc::new(prometheus_handle);
    routes::metrics::describe();

    tracing::info!(path = %config.database_path.display(), "Opening SQLite job database");
    let db_pool = db::init_pool(&config.database_path)
        .await
        .expect("Failed to open database");

    tracing::info!("Running database migrations");
    db::run_migrations(&db_pool)
        .await
        .expect("Failed to run database migrations");

    std::fs::create_dir_all(&config.output_dir).expect("Failed to create output directory");

    tracing::info!(url = %config.inference_url, "Using inference service for device checks");
    let inference = InferenceClient::new(&config.inference_url, config.render_timeout())
        .expect("Failed to initialize inference client");

    let state = AppState::new(
        db_pool,
        Arc::new(inference),
        &config.public_base_url,
        &config.output_dir,
    );

    let app = routes::api_router(state, Some(prometheus_handle), &config.cors_origins);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("Shutdown signal received");
        })
        .await
        .expect("Server error");
}
