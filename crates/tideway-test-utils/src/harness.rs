// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end pipeline harness over temp SQLite storage and mock adapters.
//!
//! Each harness is fully isolated: its own temp database, its own capture
//! channel, its own scripted endpoint. Tests drive the pipeline one message
//! at a time with [`PipelineHarness::drain_one`].

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use tideway_config::model::{QueueConfig, StorageConfig};
use tideway_core::types::InferenceRequest;
use tideway_core::{AttachmentResolver, IngestionQueue, SessionStore, TidewayError};
use tideway_storage::SqlitePipelineStore;
use tideway_worker::attachment::PassthroughResolver;
use tideway_worker::handler::RequestHandler;
use tideway_worker::registry::EndpointRegistry;
use tideway_worker::run::RunOutcome;

use crate::capture_channel::CaptureChannel;
use crate::mock_endpoint::{MockEndpoint, ScriptedRun};

/// The model/provider pair the harness registers its mock endpoint under.
pub const MOCK_MODEL_ID: &str = "mock-model";
pub const MOCK_PROVIDER_ID: &str = "mock";

/// Builder for [`PipelineHarness`].
pub struct PipelineHarnessBuilder {
    runs: Vec<ScriptedRun>,
    visibility_timeout_secs: u64,
    max_receives: i64,
    execution_budget: Duration,
    failing_attachments: bool,
}

impl PipelineHarnessBuilder {
    /// Queue a scripted endpoint behavior (FIFO).
    pub fn with_run(mut self, run: ScriptedRun) -> Self {
        self.runs.push(run);
        self
    }

    /// Override the lease policy. A zero visibility timeout makes leases
    /// expire on arrival, which lets redelivery tests run without sleeping.
    pub fn with_queue_policy(mut self, visibility_timeout_secs: u64, max_receives: i64) -> Self {
        self.visibility_timeout_secs = visibility_timeout_secs;
        self.max_receives = max_receives;
        self
    }

    /// Override the handler's hard execution budget.
    pub fn with_execution_budget(mut self, budget: Duration) -> Self {
        self.execution_budget = budget;
        self
    }

    /// Swap the attachment resolver for one that fails every lookup.
    pub fn with_failing_attachments(mut self) -> Self {
        self.failing_attachments = true;
        self
    }

    pub async fn build(self) -> PipelineHarness {
        let dir = TempDir::new().expect("create temp dir");
        let db_path = dir
            .path()
            .join("harness.db")
            .to_string_lossy()
            .into_owned();

        let store = Arc::new(SqlitePipelineStore::new(
            StorageConfig {
                database_path: db_path,
                wal_mode: true,
            },
            QueueConfig {
                visibility_timeout_secs: self.visibility_timeout_secs,
                max_receives: self.max_receives,
            },
        ));
        store.initialize().await.expect("initialize storage");

        let channel = Arc::new(CaptureChannel::new());
        let endpoint = Arc::new(MockEndpoint::with_runs(self.runs));

        let mut registry = EndpointRegistry::new();
        registry.register(MOCK_MODEL_ID, MOCK_PROVIDER_ID, endpoint.clone());

        let attachments: Arc<dyn AttachmentResolver> = if self.failing_attachments {
            Arc::new(FailingResolver)
        } else {
            Arc::new(PassthroughResolver)
        };

        let handler = RequestHandler::new(
            store.clone(),
            store.clone(),
            channel.clone(),
            Arc::new(registry),
            attachments,
            self.execution_budget,
        );

        PipelineHarness {
            store,
            channel,
            endpoint,
            handler,
            _dir: dir,
        }
    }
}

/// An isolated pipeline wired over mock adapters.
pub struct PipelineHarness {
    /// Session store and ingestion queue, backed by one temp SQLite file.
    pub store: Arc<SqlitePipelineStore>,
    /// Records everything published to the notification channel.
    pub channel: Arc<CaptureChannel>,
    /// The scripted endpoint registered under [`MOCK_MODEL_ID`].
    pub endpoint: Arc<MockEndpoint>,
    /// The handler under test.
    pub handler: RequestHandler,
    _dir: TempDir,
}

impl PipelineHarness {
    pub fn builder() -> PipelineHarnessBuilder {
        PipelineHarnessBuilder {
            runs: Vec::new(),
            visibility_timeout_secs: 5400,
            max_receives: 3,
            execution_budget: Duration::from_secs(900),
            failing_attachments: false,
        }
    }

    /// The store viewed as the ingestion queue.
    pub fn queue(&self) -> Arc<dyn IngestionQueue> {
        self.store.clone()
    }

    /// A request targeting the harness's mock endpoint, in the harness's
    /// single conversation.
    pub fn request(&self, text: &str) -> InferenceRequest {
        InferenceRequest {
            session_id: "sess-1".to_string(),
            user_id: "user-1".to_string(),
            model_id: MOCK_MODEL_ID.to_string(),
            provider_id: MOCK_PROVIDER_ID.to_string(),
            text: text.to_string(),
            image_reference: None,
            mode: Default::default(),
            model_parameters: Default::default(),
        }
    }

    /// Serialize and enqueue a request; returns the queue message id.
    pub async fn enqueue(&self, request: &InferenceRequest) -> String {
        let payload = serde_json::to_string(request).expect("serialize request");
        self.queue().enqueue(&payload).await.expect("enqueue")
    }

    /// Lease and fully process the next deliverable message, if any.
    pub async fn drain_one(&self) -> Option<RunOutcome> {
        let lease = self.queue().lease_next().await.expect("lease_next")?;
        Some(self.handler.process(&lease).await)
    }
}

/// Attachment resolver that fails every lookup, for fault-path tests.
pub struct FailingResolver;

#[async_trait::async_trait]
impl AttachmentResolver for FailingResolver {
    async fn signed_url(&self, storage_key: &str) -> Result<String, TidewayError> {
        Err(TidewayError::Internal(format!(
            "object storage unreachable for {storage_key}"
        )))
    }
}
