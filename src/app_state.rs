use sqlx::SqlitePool;
use std::path::PathBuf;
use std::sync::Arc;

use crate::services::inference::DeviceProbe;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub device: Arc<dyn DeviceProbe>,
    pub public_base_url: Arc<str>,
    pub output_dir: PathBuf,
}

impl AppState {
    pub fn new(
        db: SqlitePool,
        device: Arc<dyn DeviceProbe>,
        public_base_url: &str,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            db,
            device,
            public_base_url: Arc::from(public_base_url),
            output_dir: output_dir.into(),
        }
    }
}
