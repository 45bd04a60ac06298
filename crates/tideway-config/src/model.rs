// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Tideway pipeline.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Tideway configuration.
///
/// Loaded from TOML files following the XDG hierarchy, with environment
/// variable overrides. All sections are optional and default to values that
/// mirror the reference deployment (15 minute execution budget, 90 minute
/// visibility timeout, 3 receives before dead-lettering).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TidewayConfig {
    /// Worker identity and execution budget settings.
    #[serde(default)]
    pub worker: WorkerConfig,

    /// Ingestion queue lease and dead-letter policy.
    #[serde(default)]
    pub queue: QueueConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Notification channel settings.
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Attachment resolution settings.
    #[serde(default)]
    pub attachments: AttachmentConfig,

    /// Model endpoint registrations, one per `(model_id, provider_id)` pair.
    #[serde(default)]
    pub endpoints: Vec<EndpointConfig>,
}

/// Worker identity and execution budget configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WorkerConfig {
    /// Display name of this worker, used in logs.
    #[serde(default = "default_worker_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Hard wall-clock budget per message, in seconds. Exceeding it aborts
    /// the endpoint call and fails the run.
    #[serde(default = "default_execution_timeout_secs")]
    pub execution_timeout_secs: u64,

    /// How long to sleep between queue polls when the queue is empty, in
    /// milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            name: default_worker_name(),
            log_level: default_log_level(),
            execution_timeout_secs: default_execution_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

fn default_worker_name() -> String {
    "tideway".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_execution_timeout_secs() -> u64 {
    900 // 15 minutes
}

fn default_poll_interval_ms() -> u64 {
    500
}

/// Ingestion queue lease and dead-letter policy.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct QueueConfig {
    /// Lease duration in seconds. Must be at least 6x the worker execution
    /// timeout so a still-processing message is never redelivered as a
    /// false failure.
    #[serde(default = "default_visibility_timeout_secs")]
    pub visibility_timeout_secs: u64,

    /// Maximum deliveries before a message moves to the dead-letter queue.
    #[serde(default = "default_max_receives")]
    pub max_receives: i64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            visibility_timeout_secs: default_visibility_timeout_secs(),
            max_receives: default_max_receives(),
        }
    }
}

fn default_visibility_timeout_secs() -> u64 {
    5400 // 90 minutes, 6x the 15 minute execution budget
}

fn default_max_receives() -> i64 {
    3
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("tideway").join("tideway.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("tideway.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// Notification channel configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct NotifyConfig {
    /// Relay URL to POST channel events to. `None` selects the in-process
    /// broadcast channel (embedded relay / tests).
    #[serde(default)]
    pub webhook_url: Option<String>,
}

/// Attachment resolution configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AttachmentConfig {
    /// Base URL of the object-storage collaborator that serves signed URLs.
    /// `None` passes attachment references through unchanged.
    #[serde(default)]
    pub base_url: Option<String>,
}

/// Which backend family an endpoint speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EndpointKind {
    /// Containerized text-generation server with SSE streaming.
    Tgi,
    /// Hosted endpoint, whole-result invocations only.
    Sagemaker,
}

/// One model endpoint registration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EndpointConfig {
    /// Model identifier requests select this endpoint by.
    pub model_id: String,

    /// Provider identifier requests select this endpoint by.
    pub provider_id: String,

    /// Backend family.
    pub kind: EndpointKind,

    /// Base URL of the endpoint.
    pub url: String,

    /// Bearer token for the endpoint, if it requires one.
    #[serde(default)]
    pub api_token: Option<String>,

    /// Request timeout for a single HTTP call, in seconds.
    #[serde(default = "default_endpoint_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_endpoint_timeout_secs() -> u64 {
    600
}
