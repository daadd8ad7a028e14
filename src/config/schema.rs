//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the server.
//! All types derive Serde traits for deserialization from config files.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Root configuration for the failure simulator.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Response shaping (default code, delay, echo).
    pub response: ResponseConfig,

    /// Transient failure simulation.
    pub failure: FailureCycleSettings,

    /// Inbound request dumping.
    pub request_log: RequestLogConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// How every response is shaped, independent of the failure cycle.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ResponseConfig {
    /// Status code returned when the failure cycle is disabled or idle.
    pub status_code: u16,

    /// Artificial latency added to every response, in milliseconds.
    pub delay_ms: u64,

    /// Send the request body back as the response body.
    pub echo: bool,

    /// Largest request body that will be buffered.
    pub max_body_bytes: usize,
}

impl Default for ResponseConfig {
    fn default() -> Self {
        Self {
            status_code: 200,
            delay_ms: 0,
            echo: false,
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Failure cycle settings as they appear on disk or on the command line.
///
/// Counts are signed so that a negative value survives deserialization and
/// is reported by validation instead of a generic parse error.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct FailureCycleSettings {
    /// Enable the failure cycle.
    pub enabled: bool,

    /// Consecutive failure responses per cycle.
    pub failure_count: i64,

    /// Consecutive success responses per cycle.
    pub success_count: i64,

    /// Status code emitted during the failure phase.
    pub failure_code: u16,

    /// Status code emitted during the success phase.
    pub success_code: u16,
}

impl Default for FailureCycleSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            failure_count: 0,
            success_count: 0,
            failure_code: 503,
            success_code: 200,
        }
    }
}

/// Output format for dumped requests.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RequestLogFormat {
    /// HTTP/1.x wire text.
    #[default]
    Raw,
    /// One compact JSON object per line.
    Json,
    /// Indented JSON.
    PrettyJson,
}

/// Inbound request dump configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Default)]
#[serde(default)]
pub struct RequestLogConfig {
    /// Dump every inbound request.
    pub enabled: bool,

    /// Dump format.
    pub format: RequestLogFormat,

    /// Append to this file instead of stdout.
    pub output: Option<PathBuf>,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}
