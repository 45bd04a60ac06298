// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The request handler: drives one leased message through the run state
//! machine to exactly one terminal outcome.
//!
//! Side effects are strictly ordered: no session store write happens before
//! the endpoint call returns a complete result, and no acknowledgment
//! happens before the session store write succeeds. There is no retry loop
//! in here -- the ingestion queue's lease/redelivery/dead-letter mechanics
//! are the sole retry authority.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::time::timeout;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use tideway_core::types::{
    ChannelEvent, ConversationTurn, EndpointInvocation, FinalResult, InferenceRequest, QueueLease,
    TurnKind,
};
use tideway_core::{
    AttachmentResolver, FaultKind, IngestionQueue, NotificationChannel, SessionStore,
    TidewayError, TokenSink,
};

use crate::registry::EndpointRegistry;
use crate::run::{RunOutcome, RunState};

/// How many prior turns are loaded for prompt assembly.
const HISTORY_LIMIT: i64 = 50;

/// Stateful worker that services one queue lease at a time.
pub struct RequestHandler {
    queue: Arc<dyn IngestionQueue>,
    store: Arc<dyn SessionStore>,
    channel: Arc<dyn NotificationChannel>,
    registry: Arc<EndpointRegistry>,
    attachments: Arc<dyn AttachmentResolver>,
    execution_budget: Duration,
}

impl RequestHandler {
    /// Creates a handler over the injected collaborators.
    ///
    /// `execution_budget` is the hard wall-clock limit per message; config
    /// validation guarantees the queue's visibility timeout exceeds it by
    /// the required margin.
    pub fn new(
        queue: Arc<dyn IngestionQueue>,
        store: Arc<dyn SessionStore>,
        channel: Arc<dyn NotificationChannel>,
        registry: Arc<EndpointRegistry>,
        attachments: Arc<dyn AttachmentResolver>,
        execution_budget: Duration,
    ) -> Self {
        Self {
            queue,
            store,
            channel,
            registry,
            attachments,
            execution_budget,
        }
    }

    /// Processes one leased message to a terminal outcome and settles the
    /// lease accordingly.
    ///
    /// Every delivery attempt is a distinct run: the run id is generated
    /// fresh here and never reused, so a redelivered message produces an
    /// independent token sequence rather than resuming the previous one.
    pub async fn process(&self, lease: &QueueLease) -> RunOutcome {
        let run_id = Uuid::new_v4().to_string();
        debug!(
            message_id = lease.message_id.as_str(),
            receive_count = lease.receive_count,
            run_id = run_id.as_str(),
            state = %RunState::Received,
            "message leased"
        );

        let request = match serde_json::from_str::<InferenceRequest>(&lease.payload) {
            Ok(request) => request,
            Err(e) => {
                // Unparseable payloads stay unparseable on every redelivery.
                let err = TidewayError::InvalidRequest(e.to_string());
                return self.fail(lease, None, run_id, err).await;
            }
        };

        let started = Instant::now();
        match timeout(
            self.execution_budget,
            self.drive(lease, &request, &run_id, started),
        )
        .await
        {
            Ok(Ok(())) => {
                // Completed: the turn is durable; remove the message.
                if let Err(e) = self.queue.ack(lease.id).await {
                    // The lease will expire and redeliver, but finalization
                    // is idempotent on the message id, so no double write.
                    warn!(
                        message_id = lease.message_id.as_str(),
                        error = %e,
                        "acknowledgment failed after successful finalize"
                    );
                }
                info!(
                    message_id = lease.message_id.as_str(),
                    run_id = run_id.as_str(),
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    state = %RunState::Completed,
                    "run completed"
                );
                RunOutcome::completed(run_id)
            }
            Ok(Err(e)) => self.fail(lease, Some(&request), run_id, e).await,
            Err(_) => {
                let err = TidewayError::Timeout {
                    duration: self.execution_budget,
                };
                self.fail(lease, Some(&request), run_id, err).await
            }
        }
    }

    /// Drives Invoking -> Streaming -> Finalizing for one run.
    async fn drive(
        &self,
        lease: &QueueLease,
        request: &InferenceRequest,
        run_id: &str,
        started: Instant,
    ) -> Result<(), TidewayError> {
        debug!(run_id, state = %RunState::Invoking, "resolving endpoint");
        let endpoint = self
            .registry
            .resolve(&request.model_id, &request.provider_id)
            .ok_or_else(|| TidewayError::EndpointNotRegistered {
                model_id: request.model_id.clone(),
                provider_id: request.provider_id.clone(),
            })?;

        let image_url = match &request.image_reference {
            Some(key) => Some(self.attachments.signed_url(key).await?),
            None => None,
        };

        let history = self
            .store
            .list_turns(&request.session_id, Some(HISTORY_LIMIT))
            .await?;

        let invocation = EndpointInvocation {
            model_id: request.model_id.clone(),
            prompt: request.text.clone(),
            history,
            image_url: image_url.clone(),
            parameters: request.model_parameters.clone(),
        };

        let sink = TokenSink::new(&request.session_id, run_id, self.channel.clone());
        if endpoint.supports_streaming() {
            debug!(run_id, state = %RunState::Streaming, "invoking streaming endpoint");
        } else {
            debug!(run_id, "invoking whole-result endpoint");
        }
        let result = endpoint.invoke(&invocation, &sink).await?;

        debug!(
            run_id,
            state = %RunState::Finalizing,
            fragments = sink.emitted(),
            "finalizing run"
        );
        self.finalize(lease, request, run_id, image_url, &result, started)
            .await
    }

    /// Writes the exchange and publishes the terminal event.
    ///
    /// The turn write is transactional and idempotent on the queue message
    /// id. The final event is published only after the write is durable; a
    /// failed publish is logged and swallowed (consumers cover lost
    /// terminal events with their activity timeout, while failing the run
    /// here would invite a redelivery after a durable write).
    async fn finalize(
        &self,
        lease: &QueueLease,
        request: &InferenceRequest,
        run_id: &str,
        image_url: Option<String>,
        result: &FinalResult,
        started: Instant,
    ) -> Result<(), TidewayError> {
        self.store
            .ensure_session(&request.session_id, &request.user_id)
            .await?;

        let now = chrono::Utc::now().to_rfc3339();

        let mut human_metadata = serde_json::Map::new();
        if let Some(reference) = &request.image_reference {
            human_metadata.insert("imageReference".into(), reference.clone().into());
        }
        if let Some(url) = image_url {
            human_metadata.insert("imageUrl".into(), url.into());
        }
        let human = ConversationTurn {
            id: Uuid::new_v4().to_string(),
            session_id: request.session_id.clone(),
            kind: TurnKind::Human,
            content: request.text.clone(),
            metadata: if human_metadata.is_empty() {
                None
            } else {
                Some(serde_json::Value::Object(human_metadata).to_string())
            },
            created_at: now.clone(),
        };

        let mut ai_metadata = result.metadata.clone();
        ai_metadata.insert("modelId".into(), request.model_id.clone().into());
        ai_metadata.insert("providerId".into(), request.provider_id.clone().into());
        ai_metadata.insert("runId".into(), run_id.into());
        ai_metadata.insert(
            "latencyMs".into(),
            (started.elapsed().as_millis() as u64).into(),
        );
        let ai = ConversationTurn {
            id: Uuid::new_v4().to_string(),
            session_id: request.session_id.clone(),
            kind: TurnKind::Ai,
            content: result.content.clone(),
            metadata: Some(serde_json::Value::Object(ai_metadata.clone()).to_string()),
            created_at: now,
        };

        let inserted = self
            .store
            .append_exchange(&lease.message_id, &[human, ai])
            .await?;
        if !inserted {
            info!(
                message_id = lease.message_id.as_str(),
                run_id, "exchange already finalized by an earlier delivery, skipping write"
            );
        }

        if let Err(e) = self
            .channel
            .publish(ChannelEvent::FinalResponse {
                session_id: request.session_id.clone(),
                content: result.content.clone(),
                metadata: ai_metadata,
            })
            .await
        {
            warn!(run_id, error = %e, "failed to publish final response event");
        }

        Ok(())
    }

    /// Settles a failed run.
    ///
    /// Never acknowledges. Transient faults leave the lease to expire so the
    /// queue redelivers on its own schedule; permanent faults release the
    /// lease immediately so the redelivery budget burns without holding the
    /// message for the full visibility timeout. Both share the same budget.
    async fn fail(
        &self,
        lease: &QueueLease,
        request: Option<&InferenceRequest>,
        run_id: String,
        err: TidewayError,
    ) -> RunOutcome {
        let fault = err.fault();
        error!(
            message_id = lease.message_id.as_str(),
            run_id = run_id.as_str(),
            receive_count = lease.receive_count,
            fault = %fault,
            error = %err,
            state = %RunState::Failed,
            "run failed"
        );

        // Best-effort failure notice toward the client; dead-lettering
        // itself stays silent and is covered by the consumer's activity
        // timeout.
        if let Some(request) = request
            && let Err(publish_err) = self
                .channel
                .publish(ChannelEvent::Error {
                    session_id: request.session_id.clone(),
                    content: err.to_string(),
                })
                .await
        {
            debug!(run_id = run_id.as_str(), error = %publish_err, "failed to publish error event");
        }

        if fault == FaultKind::Permanent
            && let Err(release_err) = self.queue.release(lease.id).await
        {
            warn!(
                message_id = lease.message_id.as_str(),
                error = %release_err,
                "failed to release lease after permanent fault"
            );
        }

        RunOutcome::failed(run_id, fault)
    }
}
