// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for a hosted inference endpoint's invocations route.
//!
//! One POST per inference, whole result in the response body. No retry --
//! the ingestion queue's redelivery policy is the sole retry authority.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue};
use tracing::debug;

use tideway_core::{FaultKind, TidewayError};

use crate::types::{Generation, InvocationRequest};

/// HTTP client for a hosted endpoint.
#[derive(Debug, Clone)]
pub struct SagemakerClient {
    client: reqwest::Client,
    url: String,
}

impl SagemakerClient {
    /// Creates a client targeting the endpoint's invocations URL.
    pub fn new(
        url: impl Into<String>,
        api_token: Option<&str>,
        request_timeout: Duration,
    ) -> Result<Self, TidewayError> {
        let mut headers = HeaderMap::new();
        if let Some(token) = api_token {
            let value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| TidewayError::Config(format!("invalid api token: {e}")))?;
            headers.insert("authorization", value);
        }
        headers.insert("content-type", HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(request_timeout)
            .build()
            .map_err(|e| TidewayError::Endpoint {
                message: format!("failed to build HTTP client: {e}"),
                fault: FaultKind::Permanent,
                source: Some(Box::new(e)),
            })?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Performs one invocation and returns the first generation.
    pub async fn invoke(&self, request: &InvocationRequest) -> Result<Generation, TidewayError> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| TidewayError::Endpoint {
                message: format!("HTTP request failed: {e}"),
                fault: FaultKind::Transient,
                source: Some(Box::new(e)),
            })?;

        let status = response.status();
        debug!(status = %status, "invocation response received");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let fault = if status.as_u16() == 429 || status.is_server_error() {
                FaultKind::Transient
            } else {
                FaultKind::Permanent
            };
            return Err(TidewayError::Endpoint {
                message: format!("endpoint returned {status}: {body}"),
                fault,
                source: None,
            });
        }

        let mut generations: Vec<Generation> =
            response.json().await.map_err(|e| TidewayError::Endpoint {
                message: format!("failed to parse invocation response: {e}"),
                fault: FaultKind::Transient,
                source: Some(Box::new(e)),
            })?;

        if generations.is_empty() {
            return Err(TidewayError::transient("endpoint returned no generations"));
        }
        Ok(generations.remove(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::InvocationParameters;
    use wiremock::matchers::{header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_request() -> InvocationRequest {
        InvocationRequest {
            inputs: "User:hi\nAssistant:".into(),
            parameters: InvocationParameters::default(),
        }
    }

    #[tokio::test]
    async fn invoke_returns_first_generation() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"generated_text": "User:hi\nAssistant: hello"}
            ])))
            .mount(&server)
            .await;

        let client =
            SagemakerClient::new(server.uri(), Some("secret"), Duration::from_secs(5)).unwrap();
        let generation = client.invoke(&test_request()).await.unwrap();
        assert_eq!(generation.generated_text, "User:hi\nAssistant: hello");
    }

    #[tokio::test]
    async fn throttling_is_transient() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&server)
            .await;

        let client = SagemakerClient::new(server.uri(), None, Duration::from_secs(5)).unwrap();
        let err = client.invoke(&test_request()).await.unwrap_err();
        assert_eq!(err.fault(), FaultKind::Transient);
    }

    #[tokio::test]
    async fn bad_request_is_permanent() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("unsupported parameter"))
            .mount(&server)
            .await;

        let client = SagemakerClient::new(server.uri(), None, Duration::from_secs(5)).unwrap();
        let err = client.invoke(&test_request()).await.unwrap_err();
        assert_eq!(err.fault(), FaultKind::Permanent);
        assert!(err.to_string().contains("unsupported parameter"));
    }

    #[tokio::test]
    async fn empty_generation_array_is_an_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([])))
            .mount(&server)
            .await;

        let client = SagemakerClient::new(server.uri(), None, Duration::from_secs(5)).unwrap();
        let err = client.invoke(&test_request()).await.unwrap_err();
        assert!(err.to_string().contains("no generations"));
    }
}
