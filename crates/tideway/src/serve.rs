// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tideway serve` command implementation.
//!
//! Starts the worker: SQLite pipeline store, endpoint registry built from
//! `[[endpoints]]` configuration, notification channel (webhook or embedded
//! broadcast), and the polling worker loop. Supports graceful shutdown via
//! signal handlers.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use tideway_config::model::{EndpointKind, TidewayConfig};
use tideway_core::{
    AttachmentResolver, ModelEndpoint, NotificationChannel, SessionStore, TidewayError,
};
use tideway_notify::{BroadcastChannel, WebhookChannel};
use tideway_sagemaker::{SagemakerClient, SagemakerEndpoint};
use tideway_storage::SqlitePipelineStore;
use tideway_tgi::{TgiClient, TgiEndpoint};
use tideway_worker::attachment::{PassthroughResolver, UrlPrefixResolver};
use tideway_worker::handler::RequestHandler;
use tideway_worker::registry::EndpointRegistry;
use tideway_worker::{WorkerLoop, shutdown};

/// Runs the `tideway serve` command.
pub async fn run_serve(config: TidewayConfig) -> Result<(), TidewayError> {
    init_tracing(&config.worker.log_level);

    info!(worker = config.worker.name.as_str(), "starting tideway serve");

    // Initialize storage (sessions, turns, queue, dead letters).
    let store = Arc::new(SqlitePipelineStore::new(
        config.storage.clone(),
        config.queue.clone(),
    ));
    store.initialize().await?;
    info!(
        path = config.storage.database_path.as_str(),
        visibility_timeout_secs = config.queue.visibility_timeout_secs,
        max_receives = config.queue.max_receives,
        "pipeline store initialized"
    );

    // Build the endpoint registry from configuration. The registry is
    // immutable from here on; it is injected into the handler rather than
    // shared as a global.
    let registry = build_registry(&config)?;
    if registry.is_empty() {
        warn!("no endpoints configured; every request will fail as a configuration error");
    }
    for (model_id, provider_id) in registry.pairs() {
        info!(
            model_id = model_id.as_str(),
            provider_id = provider_id.as_str(),
            "endpoint registered"
        );
    }

    // Notification channel: webhook toward an external relay, or the
    // in-process broadcast for embedded consumers.
    let channel: Arc<dyn NotificationChannel> = match &config.notify.webhook_url {
        Some(url) => {
            info!(url = url.as_str(), "webhook notification channel");
            Arc::new(WebhookChannel::new(url.clone())?)
        }
        None => {
            info!("in-process broadcast notification channel");
            Arc::new(BroadcastChannel::new())
        }
    };

    let attachments: Arc<dyn AttachmentResolver> = match &config.attachments.base_url {
        Some(base_url) => Arc::new(UrlPrefixResolver::new(base_url.clone())),
        None => Arc::new(PassthroughResolver),
    };

    let handler = RequestHandler::new(
        store.clone(),
        store.clone(),
        channel,
        Arc::new(registry),
        attachments,
        Duration::from_secs(config.worker.execution_timeout_secs),
    );

    let worker = WorkerLoop::new(
        store.clone(),
        store,
        handler,
        Duration::from_millis(config.worker.poll_interval_ms),
    );

    // Install signal handler and run until cancelled.
    let cancel = shutdown::install_signal_handler();
    worker.run(cancel).await?;

    info!("tideway serve shutdown complete");
    Ok(())
}

/// Builds the endpoint registry from `[[endpoints]]` configuration.
fn build_registry(config: &TidewayConfig) -> Result<EndpointRegistry, TidewayError> {
    let mut registry = EndpointRegistry::new();
    for endpoint_config in &config.endpoints {
        let timeout = Duration::from_secs(endpoint_config.request_timeout_secs);
        let endpoint: Arc<dyn ModelEndpoint> = match endpoint_config.kind {
            EndpointKind::Tgi => Arc::new(TgiEndpoint::new(TgiClient::new(
                endpoint_config.url.clone(),
                endpoint_config.api_token.as_deref(),
                timeout,
            )?)),
            EndpointKind::Sagemaker => Arc::new(SagemakerEndpoint::new(SagemakerClient::new(
                endpoint_config.url.clone(),
                endpoint_config.api_token.as_deref(),
                timeout,
            )?)),
        };
        registry.register(
            &endpoint_config.model_id,
            &endpoint_config.provider_id,
            endpoint,
        );
    }
    Ok(registry)
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("tideway={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

/// Opens the pipeline store for the operator subcommands (enqueue, dlq,
/// status), which run against the same database as the worker.
pub async fn open_store(config: &TidewayConfig) -> Result<Arc<SqlitePipelineStore>, TidewayError> {
    let store = Arc::new(SqlitePipelineStore::new(
        config.storage.clone(),
        config.queue.clone(),
    ));
    store.initialize().await?;
    Ok(store)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tideway_config::model::EndpointConfig;

    fn endpoint(model_id: &str, provider_id: &str, kind: EndpointKind) -> EndpointConfig {
        EndpointConfig {
            model_id: model_id.to_string(),
            provider_id: provider_id.to_string(),
            kind,
            url: "http://localhost:8080".to_string(),
            api_token: None,
            request_timeout_secs: 600,
        }
    }

    #[test]
    fn registry_is_built_from_endpoint_config() {
        let mut config = TidewayConfig::default();
        config.endpoints = vec![
            endpoint("idefics-80b", "sagemaker", EndpointKind::Sagemaker),
            endpoint("mistral-7b", "tgi", EndpointKind::Tgi),
        ];

        let registry = build_registry(&config).unwrap();
        assert_eq!(registry.len(), 2);

        let hosted = registry.resolve("idefics-80b", "sagemaker").unwrap();
        assert!(!hosted.supports_streaming());

        let streaming = registry.resolve("mistral-7b", "tgi").unwrap();
        assert!(streaming.supports_streaming());
    }

    #[test]
    fn empty_endpoint_config_builds_empty_registry() {
        let registry = build_registry(&TidewayConfig::default()).unwrap();
        assert!(registry.is_empty());
    }
}
