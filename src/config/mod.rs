use std::env;

use crate::error::Error;

/// Client configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub service: ServiceConfig,
    pub request: RequestConfig,
}

/// Analysis service connection configuration
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Base URL of the analysis service, e.g. `http://127.0.0.1:8081`.
    pub base_url: String,
    /// Optional API key, sent as the `key` query parameter on every request.
    pub api_key: Option<String>,
}

/// HTTP request and polling configuration
#[derive(Debug, Clone)]
pub struct RequestConfig {
    /// Per-request timeout in milliseconds.
    pub timeout_ms: u64,
    /// Transport-level retries before giving up.
    pub max_retries: u32,
    /// Base delay between transport retries, doubled per attempt.
    pub retry_delay_ms: u64,
    /// Initial delay between status polls.
    pub poll_interval_ms: u64,
    /// Upper bound for the poll backoff.
    pub poll_max_interval_ms: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, Error> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let service = ServiceConfig {
            base_url: env::var("EIS_ANALYSIS_BASE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8081".to_string()),
            api_key: env::var("EIS_ANALYSIS_API_KEY").ok(),
        };

        let request = RequestConfig {
            timeout_ms: env::var("REQUEST_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30000),
            max_retries: env::var("MAX_RETRIES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(3),
            retry_delay_ms: env::var("RETRY_DELAY_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1000),
            poll_interval_ms: env::var("POLL_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(20),
            poll_max_interval_ms: env::var("POLL_MAX_INTERVAL_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(2000),
        };

        if request.poll_interval_ms == 0 {
            return Err(Error::Config {
                message: "POLL_INTERVAL_MS must be greater than zero".to_string(),
            });
        }

        Ok(Config { service, request })
    }
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            timeout_ms: 30000,
            max_retries: 3,
            retry_delay_ms: 1000,
            poll_interval_ms: 20,
            poll_max_interval_ms: 2000,
        }
    }
}
