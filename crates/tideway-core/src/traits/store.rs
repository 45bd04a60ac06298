// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Session store trait -- durable per-user conversation history.

use async_trait::async_trait;

use crate::error::TidewayError;
use crate::traits::adapter::PipelineAdapter;
use crate::types::{ConversationTurn, Session};

/// Adapter for conversation persistence.
///
/// Turns within a session are strictly ordered by creation time. The store
/// owns no pipeline logic beyond CRUD plus one transactional finalize
/// operation used to keep failed runs free of partial writes.
#[async_trait]
pub trait SessionStore: PipelineAdapter {
    /// Initializes the backend (migrations, connections).
    async fn initialize(&self) -> Result<(), TidewayError>;

    /// Flushes and closes the backend.
    async fn close(&self) -> Result<(), TidewayError>;

    /// Creates the session row if it does not exist yet.
    async fn ensure_session(&self, session_id: &str, user_id: &str) -> Result<(), TidewayError>;

    /// Appends a single turn.
    async fn append_turn(&self, turn: &ConversationTurn) -> Result<(), TidewayError>;

    /// Appends a finalized exchange (human + ai turns) in one transaction.
    ///
    /// `request_key` is the queue message id; the write is idempotent on it.
    /// Returns `false` if the exchange was already finalized by an earlier
    /// delivery attempt, in which case nothing is written.
    async fn append_exchange(
        &self,
        request_key: &str,
        turns: &[ConversationTurn],
    ) -> Result<bool, TidewayError>;

    /// Returns a session's turns in creation order.
    async fn list_turns(
        &self,
        session_id: &str,
        limit: Option<i64>,
    ) -> Result<Vec<ConversationTurn>, TidewayError>;

    /// Returns all sessions belonging to a user, most recent first.
    async fn list_sessions(&self, user_id: &str) -> Result<Vec<Session>, TidewayError>;
}
