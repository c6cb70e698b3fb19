use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Server bind address (e.g., "0.0.0.0:8000"). Unused by the worker.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// SQLite database file holding the job table
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,

    /// Directory generated videos and thumbnails are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Base URL clients use to reach this server; prefixed onto artifact paths
    #[serde(default = "default_public_base_url")]
    pub public_base_url: String,

    /// Base URL of the diffusion inference service
    #[serde(default = "default_inference_url")]
    pub inference_url: String,

    /// Upper bound on a single render request
    #[serde(default = "default_render_timeout_secs")]
    pub render_timeout_secs: u64,

    /// Worker sleep between polls when the queue is empty
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Comma-separated list of origins allowed by CORS
    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,

    /// Prometheus listener for the worker process. Disabled when unset.
    #[serde(default)]
    pub worker_metrics_addr: Option<String>,
}

fn default_bind_addr() -> String {
    "0.0.0.0:8000".to_string()
}

fn default_database_path() -> PathBuf {
    PathBuf::from("data/jobs.db")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("outputs")
}

fn default_public_base_url() -> String {
    "http://localhost:8000".to_string()
}

fn default_inference_url() -> String {
    "http://127.0.0.1:5000".to_string()
}

fn default_render_timeout_secs() -> u64 {
    1800
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_cors_origins() -> Vec<String> {
    vec![
        "http://localhost:3000".to_string(),
        "http://127.0.0.1:3000".to_string(),
    ]
}

impl AppConfig {
    pub fn from_env() -> Result<Self, envy::Error> {
        dotenvy::dotenv().ok();
        envy::from_env()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn render_timeout(&self) -> Duration {
        Duration::from_secs(self.render_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_when_environment_is_empty() {
        let config: AppConfig = envy::from_iter(Vec::<(String, String)>::new()).unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:8000");
        assert_eq!(config.database_path, PathBuf::from("data/jobs.db"));
        assert_eq!(config.output_dir, PathBuf::from("outputs"));
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.cors_origins.len(), 2);
        assert!(config.worker_metrics_addr.is_none());
    }

    #[test]
    fn cors_origins_parse_from_comma_separated_list() {
        let vars = vec![
            ("CORS_ORIGINS".to_string(), "http://a.test,http://b.test".to_string()),
            ("POLL_INTERVAL_MS".to_string(), "250".to_string()),
        ];
        let config: AppConfig = envy::from_iter(vars).unwrap();

        assert_eq!(config.cors_origins, vec!["http://a.test", "http://b.test"]);
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
    }
}
