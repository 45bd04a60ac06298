// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ingestion queue trait -- the durable mailbox for inference requests.

use async_trait::async_trait;

use crate::error::TidewayError;
use crate::traits::adapter::PipelineAdapter;
use crate::types::{DeadLetter, QueueDepth, QueueLease};

/// Adapter for the at-least-once work queue.
///
/// Delivery contract: one lease per message at a time, bounded by the
/// visibility timeout. A lease that is neither acknowledged nor released
/// expires and the message becomes redeliverable. Once a message has been
/// delivered `max_receives` times, the next lease attempt moves it verbatim
/// to the dead-letter queue instead of delivering it.
#[async_trait]
pub trait IngestionQueue: PipelineAdapter {
    /// Enqueues a verbatim payload. Returns the stable message id.
    ///
    /// Producers are trusted internal components; authorization is a
    /// deployment-time policy, not a runtime check here.
    async fn enqueue(&self, payload: &str) -> Result<String, TidewayError>;

    /// Leases the next deliverable message, if any.
    ///
    /// Reclaims expired leases and dead-letters over-budget messages as a
    /// side effect of scanning.
    async fn lease_next(&self) -> Result<Option<QueueLease>, TidewayError>;

    /// Acknowledges a leased message, removing it permanently.
    async fn ack(&self, id: i64) -> Result<(), TidewayError>;

    /// Releases a lease early, making the message immediately redeliverable.
    ///
    /// The receive count is NOT reset; this is the permanent-fault fast-fail
    /// path, and the redelivery budget still governs the final disposition.
    async fn release(&self, id: i64) -> Result<(), TidewayError>;

    /// Lists dead-lettered messages, oldest first.
    async fn dead_letters(&self, limit: Option<i64>) -> Result<Vec<DeadLetter>, TidewayError>;

    /// Moves a dead letter back onto the queue with a fresh receive budget.
    /// Returns the message id. Operator replay only.
    async fn replay_dead_letter(&self, id: i64) -> Result<String, TidewayError>;

    /// Returns current pending/leased/dead counts.
    async fn depth(&self) -> Result<QueueDepth, TidewayError>;
}
