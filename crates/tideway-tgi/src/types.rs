// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the text-generation-server HTTP protocol.

use serde::{Deserialize, Serialize};
use tideway_core::types::ModelParameters;

/// Request body for `/generate` and `/generate_stream`.
#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub inputs: String,
    pub parameters: GenerateParameters,
}

/// Generation parameters understood by the server.
#[derive(Debug, Clone, Default, Serialize)]
pub struct GenerateParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_new_tokens: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
}

impl GenerateParameters {
    /// Maps the request's opaque parameter knobs onto the server's names.
    /// Keys the server does not understand are dropped here rather than
    /// rejected upstream.
    pub fn from_model_parameters(params: &ModelParameters, stop: Vec<String>) -> Self {
        Self {
            max_new_tokens: params.max_tokens(),
            temperature: params.temperature(),
            top_p: params.top_p(),
            stop,
        }
    }
}

/// Response body for a non-streaming `/generate` call.
#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    pub generated_text: String,
}

/// One SSE data frame from `/generate_stream`.
///
/// Intermediate frames carry a token and `generated_text: null`; the final
/// frame repeats the full assembled text in `generated_text`.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamChunk {
    pub token: StreamToken,
    #[serde(default)]
    pub generated_text: Option<String>,
}

/// A single generated token within a stream frame.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamToken {
    pub text: String,
    /// Special tokens (EOS, padding) are part of the protocol but not of
    /// the user-visible text.
    #[serde(default)]
    pub special: bool,
}

/// In-stream error frame.
#[derive(Debug, Clone, Deserialize)]
pub struct StreamErrorFrame {
    pub error: String,
    #[serde(default)]
    pub error_type: Option<String>,
}
