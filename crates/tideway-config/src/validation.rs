// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde
//! attributes, most importantly the lease-safety policy: the queue's
//! visibility timeout must be at least 6x the worker's execution budget.

use std::collections::HashSet;

use crate::diagnostic::ConfigError;
use crate::model::TidewayConfig;

/// Minimum ratio between the visibility timeout and the execution budget.
///
/// A still-processing message must never be redelivered as a false failure,
/// so the lease outlives the hard execution timeout by a wide margin.
pub const VISIBILITY_MARGIN: u64 = 6;

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &TidewayConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    // Validate database_path is not empty
    if config.storage.database_path.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "storage.database_path must not be empty".to_string(),
        });
    }

    // Lease-safety policy: visibility timeout >= 6x execution budget.
    if config.worker.execution_timeout_secs == 0 {
        errors.push(ConfigError::Validation {
            message: "worker.execution_timeout_secs must be greater than zero".to_string(),
        });
    } else if config.queue.visibility_timeout_secs
        < config.worker.execution_timeout_secs * VISIBILITY_MARGIN
    {
        errors.push(ConfigError::Validation {
            message: format!(
                "queue.visibility_timeout_secs ({}) must be at least {}x \
                 worker.execution_timeout_secs ({}); a still-processing message \
                 would be redelivered as a false failure",
                config.queue.visibility_timeout_secs,
                VISIBILITY_MARGIN,
                config.worker.execution_timeout_secs
            ),
        });
    }

    if config.queue.max_receives < 1 {
        errors.push(ConfigError::Validation {
            message: format!(
                "queue.max_receives must be at least 1, got {}",
                config.queue.max_receives
            ),
        });
    }

    // Validate webhook URL shape if set.
    if let Some(url) = &config.notify.webhook_url
        && !url.starts_with("http://")
        && !url.starts_with("https://")
    {
        errors.push(ConfigError::Validation {
            message: format!("notify.webhook_url `{url}` must be an http(s) URL"),
        });
    }

    // Validate endpoint registrations.
    let mut seen_pairs = HashSet::new();
    for (i, endpoint) in config.endpoints.iter().enumerate() {
        if endpoint.model_id.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("endpoints[{i}].model_id must not be empty"),
            });
        }
        if endpoint.provider_id.trim().is_empty() {
            errors.push(ConfigError::Validation {
                message: format!("endpoints[{i}].provider_id must not be empty"),
            });
        }
        if !endpoint.url.starts_with("http://") && !endpoint.url.starts_with("https://") {
            errors.push(ConfigError::Validation {
                message: format!(
                    "endpoints[{i}].url `{}` must be an http(s) URL",
                    endpoint.url
                ),
            });
        }
        if !seen_pairs.insert((endpoint.model_id.clone(), endpoint.provider_id.clone())) {
            errors.push(ConfigError::Validation {
                message: format!(
                    "duplicate endpoint registration for `{}/{}` in [[endpoints]] array",
                    endpoint.model_id, endpoint.provider_id
                ),
            });
        }
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{EndpointConfig, EndpointKind};

    fn endpoint(model_id: &str, provider_id: &str) -> EndpointConfig {
        EndpointConfig {
            model_id: model_id.to_string(),
            provider_id: provider_id.to_string(),
            kind: EndpointKind::Tgi,
            url: "http://localhost:8080".to_string(),
            api_token: None,
            request_timeout_secs: 600,
        }
    }

    #[test]
    fn default_config_validates() {
        let config = TidewayConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn default_margin_matches_reference_deployment() {
        let config = TidewayConfig::default();
        assert_eq!(config.worker.execution_timeout_secs, 900);
        assert_eq!(config.queue.visibility_timeout_secs, 5400);
        assert_eq!(config.queue.max_receives, 3);
    }

    #[test]
    fn short_visibility_timeout_fails_validation() {
        let mut config = TidewayConfig::default();
        config.queue.visibility_timeout_secs = 900; // only 1x the budget
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("visibility_timeout_secs"))
        ));
    }

    #[test]
    fn exact_margin_passes_validation() {
        let mut config = TidewayConfig::default();
        config.worker.execution_timeout_secs = 10;
        config.queue.visibility_timeout_secs = 60;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = TidewayConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("database_path"))
        ));
    }

    #[test]
    fn zero_max_receives_fails_validation() {
        let mut config = TidewayConfig::default();
        config.queue.max_receives = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("max_receives"))
        ));
    }

    #[test]
    fn duplicate_endpoint_pair_fails_validation() {
        let mut config = TidewayConfig::default();
        config.endpoints = vec![endpoint("m1", "p1"), endpoint("m1", "p1")];
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("duplicate endpoint"))
        ));
    }

    #[test]
    fn same_model_different_provider_is_allowed() {
        let mut config = TidewayConfig::default();
        config.endpoints = vec![endpoint("m1", "sagemaker"), endpoint("m1", "tgi")];
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn non_http_endpoint_url_fails_validation() {
        let mut config = TidewayConfig::default();
        let mut ep = endpoint("m1", "p1");
        ep.url = "ftp://example.com".to_string();
        config.endpoints = vec![ep];
        let errors = validate_config(&config).unwrap_err();
        assert!(errors.iter().any(
            |e| matches!(e, ConfigError::Validation { message } if message.contains("http(s) URL"))
        ));
    }
}
