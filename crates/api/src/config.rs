use std::str::FromStr;
use std::time::Duration;

use civic_core::config::DetectionConfig;
use civic_core::error::CoreError;

/// Server configuration loaded from environment variables.
///
/// All fields have sensible defaults suitable for local development.
/// In production, override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                | Default                    |
    /// |------------------------|----------------------------|
    /// | `HOST`                 | `0.0.0.0`                  |
    /// | `PORT`                 | `3000`                     |
    /// | `CORS_ORIGINS`         | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS` | `30`                       |
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port = env_or("PORT", 3000u16);

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs = env_or("REQUEST_TIMEOUT_SECS", 30u64);

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Reject a duplicate check deadline that the HTTP request timeout would
    /// cut off before the check can fall back to "no duplicate".
    pub fn check_detection_deadline(&self, detection: &DetectionConfig) -> Result<(), CoreError> {
        if detection.timeout() >= self.request_timeout() {
            return Err(CoreError::Validation(format!(
                "DUPLICATE_CHECK_TIMEOUT_MS ({} ms) must be shorter than \
                 REQUEST_TIMEOUT_SECS ({} s)",
                detection.timeout_ms, self.request_timeout_secs
            )));
        }
        Ok(())
    }
}

/// Build the duplicate detection configuration, overriding defaults from
/// the environment.
///
/// | Env Var                      | Default |
/// |------------------------------|---------|
/// | `DUPLICATE_CHECK_TIMEOUT_MS` | `5000`  |
/// | `DUPLICATE_THRESHOLD`        | `0.7`   |
/// | `DUPLICATE_RADIUS_METERS`    | `50`    |
/// | `DUPLICATE_WINDOW_DAYS`      | `7`     |
/// | `DUPLICATE_CANDIDATE_LIMIT`  | `20`    |
/// | `DUPLICATE_IMAGE_WEIGHT`     | `0.0`   |
///
/// The returned value is not validated; call [`DetectionConfig::validate`].
pub fn detection_config_from_env() -> DetectionConfig {
    let defaults = DetectionConfig::default();
    DetectionConfig {
        timeout_ms: env_or("DUPLICATE_CHECK_TIMEOUT_MS", defaults.timeout_ms),
        duplicate_threshold: env_or("DUPLICATE_THRESHOLD", defaults.duplicate_threshold),
        radius_km: env_or("DUPLICATE_RADIUS_METERS", defaults.radius_km * 1000.0) / 1000.0,
        window_days: env_or("DUPLICATE_WINDOW_DAYS", defaults.window_days),
        candidate_limit: env_or("DUPLICATE_CANDIDATE_LIMIT", defaults.candidate_limit),
        image_weight: env_or("DUPLICATE_IMAGE_WEIGHT", defaults.image_weight),
        ..defaults
    }
}

/// Read `key` from the environment, falling back to `default` when unset.
///
/// Panics at startup if the variable is set but unparseable.
fn env_or<T>(key: &str, default: T) -> T
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .unwrap_or_else(|e| panic!("{key} must be a valid value: {e}")),
        Err(_) => default,
    }
}
