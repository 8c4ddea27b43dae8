//! Telemetry configuration from environment variables.

use std::env;

/// Configuration for log output.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name attached to every log line
    pub service_name: String,

    /// Log level filter (trace, debug, info, warn, error) or full `EnvFilter` directives
    pub log_level: String,

    /// Whether to emit JSON formatted logs
    pub json_logs: bool,

    /// Whether to colourise compact output
    pub ansi: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "lanpam".to_string(),
            log_level: "info".to_string(),
            json_logs: false,
            ansi: true,
        }
    }
}

impl TelemetryConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `LANPAM_LOG_LEVEL` or `RUST_LOG`: Log level (default: info)
    /// - `LANPAM_JSON_LOGS`: Enable JSON logs (default: false)
    /// - `LANPAM_LOG_ANSI`: Colourise compact logs (default: true)
    pub fn from_env() -> Self {
        Self {
            service_name: "lanpam".to_string(),

            log_level: env::var("LANPAM_LOG_LEVEL")
                .or_else(|_| env::var("RUST_LOG"))
                .unwrap_or_else(|_| "info".to_string()),

            json_logs: env::var("LANPAM_JSON_LOGS")
                .map(|v| parse_flag(&v))
                .unwrap_or(false),

            ansi: env::var("LANPAM_LOG_ANSI")
                .map(|v| parse_flag(&v))
                .unwrap_or(true),
        }
    }

    /// Same as [`from_env`](Self::from_env) with a different service name.
    pub fn for_service(service_name: &str) -> Self {
        let mut config = Self::from_env();
        config.service_name = service_name.to_string();
        config
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes" | "on")
}
