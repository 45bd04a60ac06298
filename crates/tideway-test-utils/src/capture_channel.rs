// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Capturing notification channel for assertions in tests.

use async_trait::async_trait;
use tokio::sync::Mutex;

use tideway_core::types::{AdapterType, ChannelEvent, HealthStatus, TokenEvent};
use tideway_core::{NotificationChannel, PipelineAdapter, TidewayError};

/// A notification channel that records every published event.
pub struct CaptureChannel {
    events: Mutex<Vec<ChannelEvent>>,
}

impl CaptureChannel {
    pub fn new() -> Self {
        Self {
            events: Mutex::new(Vec::new()),
        }
    }

    /// All events published so far, in publish order.
    pub async fn events(&self) -> Vec<ChannelEvent> {
        self.events.lock().await.clone()
    }

    /// Token events belonging to one run, in publish order.
    pub async fn tokens_for_run(&self, run_id: &str) -> Vec<TokenEvent> {
        self.events
            .lock()
            .await
            .iter()
            .filter_map(|e| match e {
                ChannelEvent::LlmNewToken(t) if t.run_id == run_id => Some(t.clone()),
                _ => None,
            })
            .collect()
    }

    /// Contents of every final_response published so far.
    pub async fn final_contents(&self) -> Vec<String> {
        self.events
            .lock()
            .await
            .iter()
            .filter_map(|e| match e {
                ChannelEvent::FinalResponse { content, .. } => Some(content.clone()),
                _ => None,
            })
            .collect()
    }

    pub async fn clear(&self) {
        self.events.lock().await.clear();
    }
}

impl Default for CaptureChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PipelineAdapter for CaptureChannel {
    fn name(&self) -> &str {
        "capture"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Channel
    }

    async fn health_check(&self) -> Result<HealthStatus, TidewayError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TidewayError> {
        Ok(())
    }
}

#[async_trait]
impl NotificationChannel for CaptureChannel {
    async fn publish(&self, event: ChannelEvent) -> Result<(), TidewayError> {
        self.events.lock().await.push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token(run_id: &str, seq: u64) -> ChannelEvent {
        ChannelEvent::LlmNewToken(TokenEvent {
            session_id: "s".into(),
            run_id: run_id.into(),
            sequence_number: seq,
            value: format!("f{seq}"),
        })
    }

    #[tokio::test]
    async fn records_events_in_publish_order() {
        let channel = CaptureChannel::new();
        channel.publish(token("r1", 0)).await.unwrap();
        channel.publish(token("r1", 1)).await.unwrap();

        let events = channel.events().await;
        assert_eq!(events.len(), 2);
    }

    #[tokio::test]
    async fn filters_tokens_by_run() {
        let channel = CaptureChannel::new();
        channel.publish(token("r1", 0)).await.unwrap();
        channel.publish(token("r2", 0)).await.unwrap();
        channel.publish(token("r1", 1)).await.unwrap();

        let r1 = channel.tokens_for_run("r1").await;
        assert_eq!(r1.len(), 2);
        assert_eq!(r1[1].sequence_number, 1);
    }

    #[tokio::test]
    async fn collects_final_contents() {
        let channel = CaptureChannel::new();
        channel
            .publish(ChannelEvent::FinalResponse {
                session_id: "s".into(),
                content: "Hello".into(),
                metadata: serde_json::Map::new(),
            })
            .await
            .unwrap();

        assert_eq!(channel.final_contents().await, vec!["Hello"]);
    }
}
