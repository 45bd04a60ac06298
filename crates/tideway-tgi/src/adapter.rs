// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! ModelEndpoint implementation over [`TgiClient`].

use async_trait::async_trait;
use futures::StreamExt;
use tracing::debug;

use tideway_core::types::{AdapterType, EndpointInvocation, FinalResult, HealthStatus, TurnKind};
use tideway_core::{ModelEndpoint, PipelineAdapter, TidewayError, TokenSink};

use crate::client::TgiClient;
use crate::types::{GenerateParameters, GenerateRequest};

/// Stop sequences appended to every request so the model does not continue
/// the dialogue past its own turn.
const STOP_SEQUENCES: &[&str] = &["User:", "<end_of_utterance>"];

/// Streaming endpoint adapter for a containerized text-generation server.
pub struct TgiEndpoint {
    client: TgiClient,
}

impl TgiEndpoint {
    pub fn new(client: TgiClient) -> Self {
        Self { client }
    }

    /// Renders the dialogue template the server expects: alternating
    /// `User:`/`Assistant:` lines, the current prompt (with an inline image
    /// link when an attachment was resolved), and a trailing `Assistant:`
    /// cue for the completion.
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
impl PipelineAdapter for TgiEndpoint {
    fn name(&self) -> &str {
        "tgi"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    fn adapter_type(&self) -> AdapterType {
        AdapterType::Endpoint
    }

    async fn health_check(&self) -> Result<HealthStatus, TidewayError> {
        match self.client.health().await {
            Ok(()) => Ok(HealthStatus::Healthy),
            Err(e) => Ok(HealthStatus::Unhealthy(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), TidewayError> {
        Ok(())
    }
}

#[async_trait]
impl ModelEndpoint for TgiEndpoint {
    fn supports_streaming(&self) -> bool {
        true
    }

    async fn invoke(
        &self,
        invocation: &EndpointInvocation,
        sink: &TokenSink,
    ) -> Result<FinalResult, TidewayError> {
        let request = GenerateRequest {
            inputs: Self::render_prompt(invocation),
            parameters: GenerateParameters::from_model_parameters(
                &invocation.parameters,
                STOP_SEQUENCES.iter().map(|s| s.to_string()).collect(),
            ),
        };

        let mut stream = self.client.generate_stream(&request).await?;

        let mut fragments = String::new();
        let mut final_text: Option<String> = None;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if !chunk.token.special {
                fragments.push_str(&chunk.token.text);
                sink.push(&chunk.token.text).await?;
            }
            if let Some(text) = chunk.generated_text {
                final_text = Some(text);
            }
        }

        let content = match final_text {
            Some(text) => text,
            None => {
                // The final frame carries the assembled text; a stream that
                // ended without one is unusual but the fragments are whole.
                debug!("stream ended without a final frame, using fragments");
                fragments
            }
        };

        let mut result = FinalResult::new(content.trim().to_string());
        result
            .metadata
            .insert("generatedTokens".into(), sink.emitted().into());
        result
            .metadata
            .insert("modelId".into(), invocation.model_id.clone().into());
        Ok(result)
    }
}
