// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request handler and worker loop for the Tideway inference pipeline.
//!
//! The [`WorkerLoop`] is the per-process coordinator that:
//! - Polls the ingestion queue for the next deliverable message
//! - Hands each lease to the [`RequestHandler`] state machine
//! - Runs exactly one message at a time (one in-flight run per lease)
//! - Handles graceful shutdown via a cancellation token
//!
//! Horizontally-scaled workers run independent loops against the same queue;
//! the lease semantics are the only cross-worker coordination.
//!
//! [`RequestHandler`]: handler::RequestHandler

pub mod attachment;
pub mod handler;
pub mod registry;
pub mod run;
pub mod shutdown;

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use tideway_core::{IngestionQueue, SessionStore, TidewayError};

use crate::handler::RequestHandler;
use crate::run::RunState;

/// Polls the queue and drives the handler until cancelled.
pub struct WorkerLoop {
    queue: Arc<dyn IngestionQueue>,
    store: Arc<dyn SessionStore>,
    handler: RequestHandler,
    poll_interval: Duration,
}

impl WorkerLoop {
    pub fn new(
        queue: Arc<dyn IngestionQueue>,
        store: Arc<dyn SessionStore>,
        handler: RequestHandler,
        poll_interval: Duration,
    ) -> Self {
        Self {
            queue,
            store,
            handler,
            poll_interval,
        }
    }

    /// Runs the worker loop until the cancellation token is triggered.
    ///
    /// Cancellation is observed between messages: an in-flight run finishes
    /// (bounded by the handler's execution budget) before the loop exits.
    /// Unacknowledged messages stay on the durable queue for the next
    /// worker.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), TidewayError> {
        info!("worker loop running");

        loop {
            if cancel.is_cancelled() {
                info!("shutdown signal received, stopping worker loop");
                break;
            }

            match self.queue.lease_next().await {
                Ok(Some(lease)) => {
                    let outcome = self.handler.process(&lease).await;
                    if outcome.state == RunState::Failed {
                        info!(
                            message_id = lease.message_id.as_str(),
                            run_id = outcome.run_id.as_str(),
                            "run failed; queue redelivery policy governs the outcome"
                        );
                    }
                }
                Ok(None) => {
                    tokio::select! {
                        _ = tokio::time::sleep(self.poll_interval) => {}
                        _ = cancel.cancelled() => {
                            info!("shutdown signal received while idle, stopping worker loop");
                            break;
                        }
                    }
                }
                Err(e) => {
                    error!(error = %e, "queue lease failed");
                    tokio::select! {
                        _ = tokio::time::sleep(self.poll_interval) => {}
                        _ = cancel.cancelled() => break,
                    }
                }
            }
        }

        self.store.close().await?;
        info!("worker loop stopped");
        Ok(())
    }
}
