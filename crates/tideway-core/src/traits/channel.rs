// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Notification channel trait -- publish/subscribe fan-out of token and
//! terminal events toward whoever is listening for a session.

use async_trait::async_trait;

use crate::error::TidewayError;
use crate::traits::adapter::PipelineAdapter;
use crate::types::ChannelEvent;

/// Adapter for the event fan-out consumed by a client-facing relay.
///
/// Ordering per `runId` is the publisher's responsibility (a single
/// [`TokenSink`](crate::sink::TokenSink) produces each run's sequence); the
/// channel itself guarantees nothing across runs or sessions.
#[async_trait]
pub trait NotificationChannel: PipelineAdapter {
    /// Publishes one event. Implementations deliver to all current
    /// subscribers; there is no replay for late joiners.
    async fn publish(&self, event: ChannelEvent) -> Result<(), TidewayError>;
}
