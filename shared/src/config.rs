use std::time::Duration;
use tracing::warn;

/// Settings for the fetch layer, read from `SPARK_*` variables.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_base_url: String,
    pub retry_attempts: u32,
    pub retry_delay: Duration,
    pub request_timeout: Duration,
    pub refetch_on_window_focus: bool,
    pub stale_after: Option<Duration>,
}

impl ClientConfig {
    const DEFAULT_API_BASE_URL: &str = "http://localhost:5000";
    const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
    const DEFAULT_RETRY_DELAY_MS: u64 = 1000;
    const DEFAULT_REQUEST_TIMEOUT_MS: u64 = 30_000;

    pub fn from_env() -> Self {
        let api_base_url = std::env::var("SPARK_API_BASE_URL")
            .unwrap_or_else(|_| Self::DEFAULT_API_BASE_URL.to_string());

        Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            retry_attempts: parse_env("SPARK_RETRY_ATTEMPTS", Self::DEFAULT_RETRY_ATTEMPTS),
            retry_delay: Duration::from_millis(parse_env(
                "SPARK_RETRY_DELAY_MS",
                Self::DEFAULT_RETRY_DELAY_MS,
            )),
            request_timeout: Duration::from_millis(parse_env(
                "SPARK_REQUEST_TIMEOUT_MS",
                Self::DEFAULT_REQUEST_TIMEOUT_MS,
            )),
            refetch_on_window_focus: parse_env("SPARK_REFETCH_ON_FOCUS", false),
            stale_after: std::env::var("SPARK_STALE_AFTER_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .map(Duration::from_millis),
        }
    }

    /// Defaults pointed at an explicit base URL, ignoring the environment.
    pub fn with_base_url(api_base_url: impl Into<String>) -> Self {
        let api_base_url: String = api_base_url.into();
        Self {
            api_base_url: api_base_url.trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_base_url: Self::DEFAULT_API_BASE_URL.to_string(),
            retry_attempts: Self::DEFAULT_RETRY_ATTEMPTS,
            retry_delay: Duration::from_millis(Self::DEFAULT_RETRY_DELAY_MS),
            request_timeout: Duration::from_millis(Self::DEFAULT_REQUEST_TIMEOUT_MS),
            refetch_on_window_focus: false,
            stale_after: None,
        }
    }
}

/// Settings for the reference API server.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub http_port: u16,
    pub session_ttl: Duration,
    pub allowed_origins: Vec<String>,
}

impl ServerConfig {
    const DEFAULT_HOST: &str = "0.0.0.0";
    const DEFAULT_HTTP_PORT: u16 = 5000;
    const DEFAULT_SESSION_TTL_SECS: u64 = 3600;

    pub fn from_env() -> Self {
        Self {
            host: std::env::var("SPARK_HOST").unwrap_or_else(|_| Self::DEFAULT_HOST.to_string()),
            http_port: parse_env("SPARK_HTTP_PORT", Self::DEFAULT_HTTP_PORT),
            session_ttl: Duration::from_secs(parse_env(
                "SPARK_SESSION_TTL_SECS",
                Self::DEFAULT_SESSION_TTL_SECS,
            )),
            allowed_origins: std::env::var("SPARK_ALLOWED_ORIGINS")
                .unwrap_or_else(|_| "*".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.http_port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: Self::DEFAULT_HOST.to_string(),
            http_port: Self::DEFAULT_HTTP_PORT,
            session_ttl: Duration::from_secs(Self::DEFAULT_SESSION_TTL_SECS),
            allowed_origins: vec!["*".to_string()],
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, default: T) -> T {
    match std::env::var(name) {
        Ok(raw) => raw.trim().parse::<T>().unwrap_or_else(|_| {
            warn!("{} has an invalid value '{}', using default", name, raw);
            default
        }),
        Err(_) => default,
    }
}
