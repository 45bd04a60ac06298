// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Run state machine for one delivery attempt.
//!
//! A run is one attempt at servicing an inference request. State is owned
//! exclusively by the request handler for the duration of one queue lease
//! and never persisted beyond the final session store write; a redelivered
//! message starts a brand new run with a fresh run id.

use tideway_core::FaultKind;

/// States a run moves through:
/// `Received -> Invoking -> Streaming -> Finalizing -> {Completed, Failed}`.
///
/// Whole-result endpoints skip `Streaming`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Message leased, run id assigned.
    Received,
    /// Resolving the endpoint and performing the inference call.
    Invoking,
    /// Incremental fragments are being published.
    Streaming,
    /// Writing the conversation turns and publishing the terminal event.
    Finalizing,
    /// Terminal: the message was acknowledged.
    Completed,
    /// Terminal: the message was not acknowledged; the queue's redelivery
    /// policy governs what happens next.
    Failed,
}

impl std::fmt::Display for RunState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunState::Received => write!(f, "received"),
            RunState::Invoking => write!(f, "invoking"),
            RunState::Streaming => write!(f, "streaming"),
            RunState::Finalizing => write!(f, "finalizing"),
            RunState::Completed => write!(f, "completed"),
            RunState::Failed => write!(f, "failed"),
        }
    }
}

/// Terminal summary of one run, returned by the handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    /// The run's fresh identifier (never reused across deliveries).
    pub run_id: String,
    /// `Completed` or `Failed`.
    pub state: RunState,
    /// Fault classification when the run failed.
    pub fault: Option<FaultKind>,
}

impl RunOutcome {
    pub fn completed(run_id: String) -> Self {
        Self {
            run_id,
            state: RunState::Completed,
            fault: None,
        }
    }

    pub fn failed(run_id: String, fault: FaultKind) -> Self {
        Self {
            run_id,
            state: RunState::Failed,
            fault: Some(fault),
        }
    }
}
