// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wire types for the hosted endpoint's invocations protocol.

use serde::{Deserialize, Serialize};
use tideway_core::types::ModelParameters;

/// Request body for an invocations call.
#[derive(Debug, Clone, Serialize)]
pub struct InvocationRequest {
    pub inputs: String,
    pub parameters: InvocationParameters,
}

/// Generation parameters understood by the hosted endpoint.
#[derive(Debug, Clone, Default, Serialize)]
pub struct InvocationParameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_new_tokens: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f64>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub stop: Vec<String>,
}

impl InvocationParameters {
    /// Maps the request's opaque knobs onto the endpoint's parameter names.
    pub fn from_model_parameters(params: &ModelParameters, stop: Vec<String>) -> Self {
        Self {
            max_new_tokens: params.max_tokens(),
            temperature: params.temperature(),
            top_p: params.top_p(),
            stop,
        }
    }
}

/// One generation in the endpoint's response array.
///
/// The endpoint echoes the prompt: `generated_text` is prompt + completion.
#[derive(Debug, Clone, Deserialize)]
pub struct Generation {
    pub generated_text: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parameters_map_from_request_knobs() {
        let mut params = ModelParameters::default();
        params.insert("maxTokens", 512);
        params.insert("topP", 0.2);

        let mapped = InvocationParameters::from_model_parameters(&params, vec![]);
        assert_eq!(mapped.max_new_tokens, Some(512));
        assert_eq!(mapped.top_p, Some(0.2));
        assert!(mapped.temperature.is_none());
    }

    #[test]
    fn response_array_parses() {
        let generations: Vec<Generation> =
            serde_json::from_str(r#"[{"generated_text": "User:hi\nAssistant: hello"}]"#).unwrap();
        assert_eq!(generations.len(), 1);
        assert!(generations[0].generated_text.ends_with("hello"));
    }
}
