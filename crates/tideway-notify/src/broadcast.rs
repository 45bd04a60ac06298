// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process broadcast fan-out.
//!
//! Used when the client-facing relay runs embedded in the same process, and
//! by tests. Every subscriber receives every event published after it
//! subscribed; a subscriber that falls behind the ring buffer observes a lag
//! error rather than silently renumbered token sequences.

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::trace;

use tideway_core::types::{AdapterType, ChannelEvent, HealthStatus};
use tideway_core::{NotificationChannel, PipelineAdapter, TidewayError};

/// Default ring-buffer capacity per subscriber.
const DEFAULT_CAPACITY: usize = 1024;

/// Tokio-broadcast-backed notification channel.
pub struct BroadcastChannel {
    sender: broadcast::Sender<ChannelEvent>,
}

impl BroadcastChannel {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to all events published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ChannelEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastChannel {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PipelineAdapter for BroadcastChannel {
    fn name(&self) -> &str {
        "broadcast"
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
impl NotificationChannel for BroadcastChannel {
    async fn publish(&self, event: ChannelEvent) -> Result<(), TidewayError> {
        trace!(
            session_id = event.session_id(),
            terminal = event.is_terminal(),
            "broadcasting event"
        );
        // No subscribers is not an error for a fan-out: events for sessions
        // nobody is watching are simply dropped.
        let _ = self.sender.send(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tideway_core::types::TokenEvent;

    fn token(seq: u64) -> ChannelEvent {
        ChannelEvent::LlmNewToken(TokenEvent {
            session_id: "s".into(),
            run_id: "r".into(),
            sequence_number: seq,
            value: format!("frag-{seq}"),
        })
    }

    #[tokio::test]
    async fn subscribers_receive_published_events_in_order() {
        let channel = BroadcastChannel::new();
        let mut rx = channel.subscribe();

        channel.publish(token(0)).await.unwrap();
        channel.publish(token(1)).await.unwrap();

        match rx.recv().await.unwrap() {
            ChannelEvent::LlmNewToken(t) => assert_eq!(t.sequence_number, 0),
            other => panic!("expected token, got {other:?}"),
        }
        match rx.recv().await.unwrap() {
            ChannelEvent::LlmNewToken(t) => assert_eq!(t.sequence_number, 1),
            other => panic!("expected token, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn publish_without_subscribers_succeeds() {
        let channel = BroadcastChannel::new();
        assert_eq!(channel.subscriber_count(), 0);
        channel.publish(token(0)).await.unwrap();
    }

    #[tokio::test]
    async fn each_subscriber_gets_every_event() {
        let channel = BroadcastChannel::new();
        let mut rx1 = channel.subscribe();
        let mut rx2 = channel.subscribe();

        channel.publish(token(0)).await.unwrap();

        assert!(matches!(
            rx1.recv().await.unwrap(),
            ChannelEvent::LlmNewToken(_)
        ));
        assert!(matches!(
            rx2.recv().await.unwrap(),
            ChannelEvent::LlmNewToken(_)
        ));
    }
}
