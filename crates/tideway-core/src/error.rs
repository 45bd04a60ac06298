// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Tideway inference pipeline.

use thiserror::Error;

/// Classifies an error for the queue's retry policy.
///
/// Transient faults are eligible for redelivery after the lease expires.
/// Permanent faults will fail identically on every redelivery; the handler
/// fails fast and releases the lease instead of waiting out the visibility
/// timeout. Both classes consume the same redelivery budget -- the queue is
/// the sole retry authority and has no dead-letter bypass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum FaultKind {
    /// Network timeout, throttling, 5xx -- retry may succeed.
    Transient,
    /// Malformed request, unsupported parameter, unregistered endpoint --
    /// retry cannot succeed.
    Permanent,
}

/// The primary error type used across all Tideway adapter traits and the
/// request handler.
#[derive(Debug, Error)]
pub enum TidewayError {
    /// Configuration errors (invalid TOML, missing required fields, policy violations).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Notification channel errors (publish failure, relay unreachable).
    #[error("channel error: {message}")]
    Channel {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Model endpoint errors, classified for the retry policy.
    #[error("endpoint error ({fault}): {message}")]
    Endpoint {
        message: String,
        fault: FaultKind,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// No endpoint adapter is registered for the requested pair.
    #[error("no endpoint registered for {model_id}/{provider_id}")]
    EndpointNotRegistered {
        model_id: String,
        provider_id: String,
    },

    /// The queue payload could not be parsed as an `InferenceRequest`.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The per-message execution budget was exceeded.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl TidewayError {
    /// Shorthand for a transient endpoint error without a source.
    pub fn transient(message: impl Into<String>) -> Self {
        TidewayError::Endpoint {
            message: message.into(),
            fault: FaultKind::Transient,
            source: None,
        }
    }

    /// Shorthand for a permanent endpoint error without a source.
    pub fn permanent(message: impl Into<String>) -> Self {
        TidewayError::Endpoint {
            message: message.into(),
            fault: FaultKind::Permanent,
            source: None,
        }
    }

    /// Classifies this error for the queue's redelivery policy.
    ///
    /// Configuration-shaped failures (unknown endpoint, unparseable payload)
    /// are permanent; everything I/O-shaped is transient.
    pub fn fault(&self) -> FaultKind {
        match self {
            TidewayError::Endpoint { fault, .. } => *fault,
            TidewayError::Config(_)
            | TidewayError::EndpointNotRegistered { .. }
            | TidewayError::InvalidRequest(_) => FaultKind::Permanent,
            TidewayError::Storage { .. }
            | TidewayError::Channel { .. }
            | TidewayError::Timeout { .. }
            | TidewayError::Internal(_) => FaultKind::Transient,
        }
    }
}
