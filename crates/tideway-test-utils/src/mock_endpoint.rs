// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock model endpoint for deterministic testing.
//!
//! `MockEndpoint` implements `ModelEndpoint` with scripted runs popped from
//! a FIFO queue, enabling fast, CI-runnable tests without model servers.

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use tideway_core::types::{AdapterType, EndpointInvocation, FinalResult, HealthStatus};
use tideway_core::{FaultKind, ModelEndpoint, PipelineAdapter, TidewayError, TokenSink};

/// One scripted endpoint behavior.
#[derive(Debug, Clone)]
pub enum ScriptedRun {
    /// Push each fragment into the sink, then return the final text.
    Stream {
        fragments: Vec<String>,
        final_text: String,
    },
    /// Return the final text without touching the sink.
    Whole { final_text: String },
    /// Fail with the given message and fault class.
    Fail { message: String, fault: FaultKind },
    /// Sleep past any reasonable execution budget, then return.
    Hang { duration: Duration },
}

impl ScriptedRun {
    pub fn stream(fragments: &[&str], final_text: &str) -> Self {
        ScriptedRun::Stream {
            fragments: fragments.iter().map(|s| s.to_string()).collect(),
            final_text: final_text.to_string(),
        }
    }

    pub fn whole(final_text: &str) -> Self {
        ScriptedRun::Whole {
            final_text: final_text.to_string(),
        }
    }

    pub fn fail_transient(message: &str) -> Self {
        ScriptedRun::Fail {
            message: message.to_string(),
            fault: FaultKind::Transient,
        }
    }

    pub fn fail_permanent(message: &str) -> Self {
        ScriptedRun::Fail {
            message: message.to_string(),
            fault: FaultKind::Permanent,
        }
    }

    pub fn hang(duration: Duration) -> Self {
        ScriptedRun::Hang { duration }
    }
}

/// A mock endpoint that replays scripted runs in order.
///
/// When the script queue is empty, a default whole-result "mock response"
/// is returned. Every invocation is recorded for assertions.
pub struct MockEndpoint {
    runs: Mutex<VecDeque<ScriptedRun>>,
    invocations: Mutex<Vec<EndpointInvocation>>,
}

impl MockEndpoint {
    pub fn new() -> Self {
        Self {
            runs: Mutex::new(VecDeque::new()),
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn with_runs(runs: Vec<ScriptedRun>) -> Self {
        Self {
            runs: Mutex::new(VecDeque::from(runs)),
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// Append a scripted run to the end of the queue.
    pub async fn add_run(&self, run: ScriptedRun) {
        self.runs.lock().await.push_back(run);
    }

    /// Every invocation seen so far, in order.
    pub async fn invocations(&self) -> Vec<EndpointInvocation> {
        self.invocations.lock().await.clone()
    }

    /// Number of invocations seen so far.
    pub async fn invocation_count(&self) -> usize {
        self.invocations.lock().await.len()
    }

    async fn next_run(&self) -> ScriptedRun {
        self.runs
            .lock()
            .await
            .pop_front()
            .unwrap_or_else(|| ScriptedRun::whole("mock response"))
    }
}

impl Default for MockEndpoint {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PipelineAdapter for MockEndpoint {
    fn name(&self) -> &str {
        "mock-endpoint"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Endpoint
    }

    async fn health_check(&self) -> Result<HealthStatus, TidewayError> {
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TidewayError> {
        Ok(())
    }
}

#[async_trait]
impl ModelEndpoint for MockEndpoint {
    fn supports_streaming(&self) -> bool {
        true
    }

    async fn invoke(
        &self,
        invocation: &EndpointInvocation,
        sink: &TokenSink,
    ) -> Result<FinalResult, TidewayError> {
        self.invocations.lock().await.push(invocation.clone());

        match self.next_run().await {
            ScriptedRun::Stream {
                fragments,
                final_text,
            } => {
                for fragment in &fragments {
                    sink.push(fragment).await?;
                }
                Ok(FinalResult::new(final_text))
            }
            ScriptedRun::Whole { final_text } => Ok(FinalResult::new(final_text)),
            ScriptedRun::Fail { message, fault } => Err(TidewayError::Endpoint {
                message,
                fault,
                source: None,
            }),
            ScriptedRun::Hang { duration } => {
                tokio::time::sleep(duration).await;
                Ok(FinalResult::new("late"))
            }
        }
    }
}
