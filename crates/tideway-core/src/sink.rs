// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Single-producer token sink owning a run's sequence numbers.
//!
//! The request handler creates one sink per run and hands it to the endpoint
//! adapter. The sink wraps every fragment as a [`TokenEvent`] with a strictly
//! increasing `sequence_number` starting at 0 and publishes it immediately.
//! Because exactly one sink exists per run and adapters push sequentially,
//! per-run ordering holds at the publisher with no further coordination.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tracing::trace;

use crate::error::TidewayError;
use crate::traits::channel::NotificationChannel;
use crate::types::{ChannelEvent, TokenEvent};

/// Callback handle through which an endpoint adapter streams fragments.
pub struct TokenSink {
    session_id: String,
    run_id: String,
    next_seq: AtomicU64,
    channel: Arc<dyn NotificationChannel>,
}

impl TokenSink {
    pub fn new(
        session_id: impl Into<String>,
        run_id: impl Into<String>,
        channel: Arc<dyn NotificationChannel>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            run_id: run_id.into(),
            next_seq: AtomicU64::new(0),
            channel,
        }
    }

    /// The run this sink belongs to.
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Publishes one fragment with the next sequence number.
    ///
    /// The sequence number is consumed even if the publish fails, so a
    /// consumer observing the numbers can detect the gap rather than
    /// receiving a silently renumbered stream.
    pub async fn push(&self, fragment: &str) -> Result<(), TidewayError> {
        let sequence_number = self.next_seq.fetch_add(1, Ordering::SeqCst);
        trace!(
            run_id = self.run_id.as_str(),
            sequence_number, "publishing token fragment"
        );
        self.channel
            .publish(ChannelEvent::LlmNewToken(TokenEvent {
                session_id: self.session_id.clone(),
                run_id: self.run_id.clone(),
                sequence_number,
                value: fragment.to_string(),
            }))
            .await
    }

    /// How many fragments have been pushed so far.
    pub fn emitted(&self) -> u64 {
        self.next_seq.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::adapter::PipelineAdapter;
    use crate::types::{AdapterType, HealthStatus};
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    struct RecordingChannel {
        events: Mutex<Vec<ChannelEvent>>,
        fail: bool,
    }

    impl RecordingChannel {
        fn new() -> Self {
            Self {
                events: Mutex::new(Vec::new()),
                fail: false,
            }
        }
    }

    #[async_trait]
    impl PipelineAdapter for RecordingChannel {
        fn name(&self) -> &str {
            "recording"
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
    impl NotificationChannel for RecordingChannel {
        async fn publish(&self, event: ChannelEvent) -> Result<(), TidewayError> {
            if self.fail {
                return Err(TidewayError::Channel {
                    message: "relay unreachable".into(),
                    source: None,
                });
            }
            self.events.lock().await.push(event);
            Ok(())
        }
    }

    #[tokio::test]
    async fn sequence_numbers_start_at_zero_and_increase() {
        let channel = Arc::new(RecordingChannel::new());
        let sink = TokenSink::new("sess-1", "run-1", channel.clone());

        sink.push("Hel").await.unwrap();
        sink.push("lo").await.unwrap();

        let events = channel.events.lock().await;
        assert_eq!(events.len(), 2);
        match (&events[0], &events[1]) {
            (ChannelEvent::LlmNewToken(a), ChannelEvent::LlmNewToken(b)) => {
                assert_eq!(a.sequence_number, 0);
                assert_eq!(b.sequence_number, 1);
                assert_eq!(a.value, "Hel");
                assert_eq!(b.value, "lo");
                assert_eq!(a.run_id, "run-1");
            }
            other => panic!("expected token events, got {other:?}"),
        }
        assert_eq!(sink.emitted(), 2);
    }

    #[tokio::test]
    async fn failed_publish_still_consumes_the_sequence_number() {
        let channel = Arc::new(RecordingChannel {
            events: Mutex::new(Vec::new()),
            fail: true,
        });
        let sink = TokenSink::new("sess-1", "run-1", channel);

        assert!(sink.push("lost").await.is_err());
        assert_eq!(sink.emitted(), 1, "gap must remain visible to consumers");
    }
}
