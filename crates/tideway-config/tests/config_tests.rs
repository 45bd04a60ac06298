// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Integration tests for the Tideway configuration system.

use tideway_config::diagnostic::{ConfigError, suggest_key};
use tideway_config::model::{EndpointKind, TidewayConfig};
use tideway_config::{load_and_validate_str, load_config_from_str};

/// Valid TOML with all known fields deserializes successfully.
#[test]
fn valid_toml_deserializes_into_tideway_config() {
    let toml = r#"
[worker]
name = "worker-a"
log_level = "debug"
execution_timeout_secs = 600
poll_interval_ms = 250

[queue]
visibility_timeout_secs = 3600
max_receives = 5

[storage]
database_path = "/tmp/test.db"
wal_mode = false

[notify]
webhook_url = "https://relay.internal/events"

[attachments]
base_url = "https://files.internal"

[[endpoints]]
model_id = "idefics-80b"
provider_id = "sagemaker"
kind = "sagemaker"
url = "https://runtime.internal/endpoints/idefics-80b"
api_token = "secret"

[[endpoints]]
model_id = "mistral-7b"
provider_id = "tgi"
kind = "tgi"
url = "http://tgi.internal:8080"
"#;

    let config = load_config_from_str(toml).expect("valid TOML should deserialize");
    assert_eq!(config.worker.name, "worker-a");
    assert_eq!(config.worker.log_level, "debug");
    assert_eq!(config.worker.execution_timeout_secs, 600);
    assert_eq!(config.worker.poll_interval_ms, 250);
    assert_eq!(config.queue.visibility_timeout_secs, 3600);
    assert_eq!(config.queue.max_receives, 5);
    assert_eq!(config.storage.database_path, "/tmp/test.db");
    assert!(!config.storage.wal_mode);
    assert_eq!(
        config.notify.webhook_url.as_deref(),
        Some("https://relay.internal/events")
    );
    assert_eq!(
        config.attachments.base_url.as_deref(),
        Some("https://files.internal")
    );
    assert_eq!(config.endpoints.len(), 2);
    assert_eq!(config.endpoints[0].kind, EndpointKind::Sagemaker);
    assert_eq!(config.endpoints[0].api_token.as_deref(), Some("secret"));
    assert_eq!(config.endpoints[1].kind, EndpointKind::Tgi);
    // request_timeout_secs falls back to its default
    assert_eq!(config.endpoints[1].request_timeout_secs, 600);
}

/// Missing optional sections use defaults without error.
#[test]
fn missing_optional_sections_use_defaults() {
    let config = load_config_from_str("").expect("empty TOML should use defaults");

    assert_eq!(config.worker.name, "tideway");
    assert_eq!(config.worker.log_level, "info");
    assert_eq!(config.worker.execution_timeout_secs, 900);
    assert_eq!(config.queue.visibility_timeout_secs, 5400);
    assert_eq!(config.queue.max_receives, 3);
    assert!(config.storage.wal_mode);
    assert!(config.notify.webhook_url.is_none());
    assert!(config.attachments.base_url.is_none());
    assert!(config.endpoints.is_empty());
}

/// Unknown field in [queue] section is rejected by deny_unknown_fields.
#[test]
fn unknown_field_in_queue_produces_error() {
    let toml = r#"
[queue]
max_recieves = 3
"#;

    let err = load_config_from_str(toml).expect_err("should reject unknown field");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("max_recieves"),
        "error should mention unknown field or the bad key, got: {err_str}"
    );
}

/// Unexpected top-level section is rejected.
#[test]
fn deny_unknown_fields_at_top_level() {
    let toml = r#"
[logging]
level = "debug"
"#;

    let err =
        load_config_from_str(toml).expect_err("unknown top-level section should be rejected");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("unknown field") || err_str.contains("logging"),
        "error should mention unknown field, got: {err_str}"
    );
}

/// Dot-notation override maps onto underscore-containing keys correctly
/// (queue.max_receives, not queue.max.receives).
#[test]
fn dotted_override_reaches_underscore_keys() {
    use figment::{Figment, providers::Serialized};

    let config: TidewayConfig = Figment::new()
        .merge(Serialized::defaults(TidewayConfig::default()))
        .merge(("queue.max_receives", 7))
        .merge(("worker.execution_timeout_secs", 60))
        .extract()
        .expect("should merge dotted overrides");

    assert_eq!(config.queue.max_receives, 7);
    assert_eq!(config.worker.execution_timeout_secs, 60);
}

/// Missing config files are silently skipped (Figment's Toml::file behavior).
#[test]
fn missing_config_files_silently_skipped() {
    use figment::{
        Figment,
        providers::{Format, Serialized, Toml},
    };

    let config: TidewayConfig = Figment::new()
        .merge(Serialized::defaults(TidewayConfig::default()))
        .merge(Toml::file("/nonexistent/path/tideway.toml"))
        .extract()
        .expect("missing file should be silently skipped");

    assert_eq!(config.worker.name, "tideway");
}

/// An endpoint missing a required field is rejected at deserialization.
#[test]
fn endpoint_missing_url_is_rejected() {
    let toml = r#"
[[endpoints]]
model_id = "m1"
provider_id = "p1"
kind = "tgi"
"#;

    let err = load_config_from_str(toml).expect_err("endpoint without url should fail");
    let err_str = format!("{err}");
    assert!(
        err_str.contains("url") || err_str.contains("missing"),
        "error should mention the missing field, got: {err_str}"
    );
}

// ============================================================================
// Diagnostic and validation tests
// ============================================================================

/// Unknown key "max_recieves" produces a "did you mean `max_receives`?" suggestion.
#[test]
fn diagnostic_error_includes_unknown_key_with_suggestion() {
    let toml = r#"
[queue]
max_recieves = 3
"#;

    let errors = load_and_validate_str(toml).expect_err("should produce errors");
    assert!(!errors.is_empty());

    let has_unknown_key = errors.iter().any(|e| {
        matches!(e, ConfigError::UnknownKey { key, suggestion, valid_keys, .. } if {
            key == "max_recieves"
                && suggestion.as_deref() == Some("max_receives")
                && valid_keys.contains("visibility_timeout_secs")
        })
    });
    assert!(
        has_unknown_key,
        "should have UnknownKey error for 'max_recieves' with suggestion, got: {errors:?}"
    );
}

/// No suggestion is offered for a distant typo.
#[test]
fn diagnostic_no_suggestion_for_distant_typo() {
    let valid_keys = &["visibility_timeout_secs", "max_receives"];
    assert!(suggest_key("zzzzzz", valid_keys).is_none());
}

/// The 6x lease-safety policy is enforced through the validating entry point.
#[test]
fn validation_catches_visibility_margin_violation() {
    let toml = r#"
[worker]
execution_timeout_secs = 900

[queue]
visibility_timeout_secs = 1800
"#;

    let errors = load_and_validate_str(toml).expect_err("2x margin should fail");
    let has_validation_error = errors.iter().any(|e| {
        matches!(e, ConfigError::Validation { message } if message.contains("visibility_timeout_secs"))
    });
    assert!(
        has_validation_error,
        "should have validation error for the lease-safety margin"
    );
}

/// Duplicate (model_id, provider_id) registrations are caught.
#[test]
fn validation_catches_duplicate_endpoints() {
    let toml = r#"
[[endpoints]]
model_id = "m1"
provider_id = "p1"
kind = "tgi"
url = "http://a:8080"

[[endpoints]]
model_id = "m1"
provider_id = "p1"
kind = "sagemaker"
url = "http://b:8080"
"#;

    let errors = load_and_validate_str(toml).expect_err("duplicate pair should fail");
    assert!(errors.iter().any(|e| {
        matches!(e, ConfigError::Validation { message } if message.contains("duplicate endpoint"))
    }));
}

/// ConfigError implements miette::Diagnostic and renders with the key name.
#[test]
fn config_error_renders_with_miette() {
    use miette::GraphicalReportHandler;

    let error = ConfigError::UnknownKey {
        key: "max_recieves".to_string(),
        suggestion: Some("max_receives".to_string()),
        valid_keys: "visibility_timeout_secs, max_receives".to_string(),
        span: None,
        src: None,
    };

    let handler = GraphicalReportHandler::new();
    let mut buf = String::new();
    handler
        .render_report(&mut buf, &error)
        .expect("should render without error");
    assert!(buf.contains("max_recieves"));
}

/// load_and_validate_str with valid TOML returns Ok config.
#[test]
fn load_and_validate_valid_toml() {
    let toml = r#"
[worker]
name = "validated"
"#;

    let config = load_and_validate_str(toml).expect("valid TOML should validate");
    assert_eq!(config.worker.name, "validated");
}
