// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! ModelEndpoint implementation over [`SagemakerClient`].

use async_trait::async_trait;

use tideway_core::types::{AdapterType, EndpointInvocation, FinalResult, HealthStatus, TurnKind};
use tideway_core::{ModelEndpoint, PipelineAdapter, TidewayError, TokenSink};

use crate::client::SagemakerClient;
use crate::types::{InvocationParameters, InvocationRequest};

const STOP_SEQUENCES: &[&str] = &["User:", "<end_of_utterance>"];

/// Whole-result endpoint adapter for a hosted model server.
///
/// `supports_streaming()` is `false`: the handler skips straight from
/// Invoking to Finalizing and the sink is never touched.
pub struct SagemakerEndpoint {
    client: SagemakerClient,
}

impl SagemakerEndpoint {
    pub fn new(client: SagemakerClient) -> Self {
        Self { client }
    }

    /// Renders the dialogue template: alternating `User:`/`Assistant:`
    /// lines, the current prompt with an optional inline image link, and a
    /// trailing `Assistant:` cue.
    fn render_prompt(invocation: &EndpointInvocation) -> String {
        let mut lines = Vec::new();
        for turn in &invocation.history {
            match turn.kind {
                TurnKind::Human => lines.push(format!("User:{}", turn.content)),
                TurnKind::Ai => lines.push(format!("Assistant:{}", turn.content)),
            }
        }
        match &invocation.image_url {
            Some(url) => lines.push(format!("User:{}![]({url})", invocation.prompt)),
            None => lines.push(format!("User:{}", invocation.prompt)),
        }
        lines.push("<end_of_utterance>\nAssistant:".to_string());
        lines.join("\n")
    }
}

#[async_trait]
impl PipelineAdapter for SagemakerEndpoint {
    fn name(&self) -> &str {
        "sagemaker"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Endpoint
    }

    async fn health_check(&self) -> Result<HealthStatus, TidewayError> {
        // Hosted endpoints expose no separate health route; reachability is
        // only observable through invocations.
        Ok(HealthStatus::Healthy)
    }

    async fn shutdown(&self) -> Result<(), TidewayError> {
        Ok(())
    }
}

#[async_trait]
impl ModelEndpoint for SagemakerEndpoint {
    fn supports_streaming(&self) -> bool {
        false
    }

    async fn invoke(
        &self,
        invocation: &EndpointInvocation,
        _sink: &TokenSink,
    ) -> Result<FinalResult, TidewayError> {
        let prompt = Self::render_prompt(invocation);
        let request = InvocationRequest {
            inputs: prompt.clone(),
            parameters: InvocationParameters::from_model_parameters(
                &invocation.parameters,
                STOP_SEQUENCES.iter().map(|s| s.to_string()).collect(),
            ),
        };

        let generation = self.client.invoke(&request).await?;

        // The endpoint echoes the prompt ahead of the completion.
        let content = generation
            .generated_text
            .strip_prefix(&prompt)
            .unwrap_or(&generation.generated_text)
            .trim()
            .to_string();

        let mut result = FinalResult::new(content);
        result
            .metadata
            .insert("modelId".into(), invocation.model_id.clone().into());
        Ok(result)
    }
}
