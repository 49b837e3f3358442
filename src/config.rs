use std::path::PathBuf;

/// Application-level constants
pub const APP_NAME: &str = "HealthBot";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default tracing filter when RUST_LOG is unset.
pub fn default_log_filter() -> String {
    "info,healthbot=debug".to_string()
}

/// Get the application data directory (~/HealthBot/)
pub fn app_data_dir() -> PathBuf {
    let home = dirs::home_dir().expect("Cannot determine home directory");
    home.join("HealthBot")
}

/// Directory where generated report PDFs are written.
pub fn reports_dir() -> PathBuf {
    app_data_dir().join("reports")
}

/// Runtime settings loaded from environment variables.
///
/// Every field has a default suitable for local development; production
/// deployments override via `HEALTHBOT_*` / `OLLAMA_*` variables.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Socket address the HTTP server binds to.
    pub bind_addr: String,
    /// SQLite database file path.
    pub database_path: PathBuf,
    /// Directory where downloaded report PDFs are archived.
    pub reports_dir: PathBuf,
    /// Base URL of the Ollama inference server.
    pub ollama_base_url: String,
    /// Model identifier expected to be loaded on the inference server.
    pub ollama_model: String,
    /// Timeout for a single generation request, seconds.
    pub generation_timeout_secs: u64,
    /// Timeout for the one-time model pull, seconds.
    pub pull_timeout_secs: u64,
    /// How many recent messages are included as chat context.
    pub history_window: usize,
    /// Summary-report urgency window, days.
    pub summary_window_days: i64,
    /// Conversations within the window at or above this count => high urgency.
    pub summary_high_threshold: usize,
    /// Conversations within the window at or above this count => medium urgency.
    pub summary_medium_threshold: usize,
    /// Origins allowed by the CORS layer.
    pub allowed_origins: Vec<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8000".to_string(),
            database_path: app_data_dir().join("healthbot.db"),
            reports_dir: reports_dir(),
            ollama_base_url: "http://localhost:11434".to_string(),
            ollama_model: "llama3.1:8b".to_string(),
            generation_timeout_secs: 30,
            pull_timeout_secs: 300,
            history_window: 5,
            summary_window_days: 30,
            summary_high_threshold: 3,
            summary_medium_threshold: 2,
            allowed_origins: vec![
                "http://localhost:3000".to_string(),
                "http://127.0.0.1:3000".to_string(),
            ],
        }
    }
}

impl Settings {
    /// Load settings from the environment, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            bind_addr: env_or("HEALTHBOT_BIND_ADDR", defaults.bind_addr),
            database_path: std::env::var("HEALTHBOT_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            reports_dir: std::env::var("HEALTHBOT_REPORTS_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.reports_dir),
            ollama_base_url: env_or("OLLAMA_BASE_URL", defaults.ollama_base_url),
            ollama_model: env_or("OLLAMA_MODEL", defaults.ollama_model),
            generation_timeout_secs: env_parse(
                "HEALTHBOT_GENERATION_TIMEOUT_SECS",
                defaults.generation_timeout_secs,
            ),
            pull_timeout_secs: env_parse("HEALTHBOT_PULL_TIMEOUT_SECS", defaults.pull_timeout_secs),
            history_window: env_parse("HEALTHBOT_HISTORY_WINDOW", defaults.history_window),
            summary_window_days: env_parse(
                "HEALTHBOT_SUMMARY_WINDOW_DAYS",
                defaults.summary_window_days,
            ),
            summary_high_threshold: env_parse(
                "HEALTHBOT_SUMMARY_HIGH_THRESHOLD",
                defaults.summary_high_threshold,
            ),
            summary_medium_threshold: env_parse(
                "HEALTHBOT_SUMMARY_MEDIUM_THRESHOLD",
                defaults.summary_medium_threshold,
            ),
            allowed_origins: std::env::var("HEALTHBOT_ALLOWED_ORIGINS")
                .map(|v| {
                    v.split(',')
                        .map(|s| s.trim().to_string())
                        .filter(|s| !s.is_empty())
                        .collect()
                })
                .unwrap_or(defaults.allowed_origins),
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
