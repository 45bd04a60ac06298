// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook notification channel.
//!
//! POSTs each channel event as JSON to a configured relay URL. The relay is
//! a trusted internal component; delivery is per-event with no batching, and
//! per-run ordering follows from the single-producer token sink publishing
//! sequentially.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use tideway_core::types::{AdapterType, ChannelEvent, HealthStatus};
use tideway_core::{NotificationChannel, PipelineAdapter, TidewayError};

/// HTTP POST notification channel targeting a client-facing relay.
pub struct WebhookChannel {
    client: reqwest::Client,
    url: String,
}

impl WebhookChannel {
    pub fn new(url: impl Into<String>) -> Result<Self, TidewayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| TidewayError::Channel {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl PipelineAdapter for WebhookChannel {
    fn name(&self) -> &str {
        "webhook"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, TidewayError> {
        // The relay exposes no health endpoint contract; reachability is
        // only observable through publishes.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TidewayError> {
        Ok(())
    }
}

#[async_trait]
impl NotificationChannel for WebhookChannel {
    async fn publish(&self, event: ChannelEvent) -> Result<(), TidewayError> {
        let response = self
            .client
            .post(&self.url)
            .json(&event)
            .send()
            .await
            .map_err(|e| TidewayError::Channel {
                message: format!("webhook POST failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(TidewayError::Channel {
                message: format!("relay returned {status}"),
                source: None,
            });
        }
        debug!(session_id = event.session_id(), "event delivered to relay");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tideway_core::types::TokenEvent;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn token_event() -> ChannelEvent {
        ChannelEvent::LlmNewToken(TokenEvent {
            session_id: "sess-1".into(),
            run_id: "run-1".into(),
            sequence_number: 0,
            value: "Hel".into(),
        })
    }

    #[tokio::test]
    async fn publish_posts_tagged_json_to_relay() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/events"))
            .and(body_partial_json(serde_json::json!({
                "action": "llm_new_token",
                "data": { "sessionId": "sess-1", "sequenceNumber": 0 }
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let channel = WebhookChannel::new(format!("{}/events", server.uri())).unwrap();
        channel.publish(token_event()).await.unwrap();
    }

    #[tokio::test]
    async fn relay_error_status_fails_the_publish() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let channel = WebhookChannel::new(server.uri()).unwrap();
        let err = channel.publish(token_event()).await.unwrap_err();
        assert!(err.to_string().contains("502"), "got: {err}");
    }

    #[tokio::test]
    async fn final_response_keeps_action_tag() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_partial_json(serde_json::json!({
                "action": "final_response",
                "data": { "sessionId": "sess-1", "content": "Hello" }
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let channel = WebhookChannel::new(server.uri()).unwrap();
        channel
            .publish(ChannelEvent::FinalResponse {
                session_id: "sess-1".into(),
                content: "Hello".into(),
                metadata: serde_json::Map::new(),
            })
            .await
            .unwrap();
    }
}
