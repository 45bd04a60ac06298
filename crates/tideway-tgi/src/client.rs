// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP client for a text-generation-server instance.
//!
//! Provides [`TgiClient`] which handles request construction, optional
//! bearer authentication, and SSE streaming via `eventsource-stream`.
//! There is deliberately no retry here: the ingestion queue's redelivery
//! policy is the pipeline's sole retry authority.

use std::pin::Pin;
use std::time::Duration;

use eventsource_stream::Eventsource;
use futures::stream::{Stream, StreamExt};
use reqwest::header::{HeaderMap, HeaderValue};
use tracing::debug;

use tideway_core::{FaultKind, TidewayError};

use crate::types::{GenerateRequest, GenerateResponse, StreamChunk, StreamErrorFrame};

/// HTTP client for the `/generate` and `/generate_stream` endpoints.
#[derive(Debug, Clone)]
pub struct TgiClient {
    client: reqwest::Client,
    base_url: String,
}

impl TgiClient {
    /// Creates a new client for the server at `base_url`.
    pub fn new(
        base_url: impl Into<String>,
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
            base_url: base_url.into(),
        })
    }

    /// Base URL this client targets.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Sends a streaming request and returns a stream of token chunks.
    pub async fn generate_stream(
        &self,
        request: &GenerateRequest,
    ) -> Result<Pin<Box<dyn Stream<Item = Result<StreamChunk, TidewayError>> + Send>>, TidewayError>
    {
        let url = format!("{}/generate_stream", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        debug!(status = %status, "streaming response received");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        Ok(parse_event_stream(response))
    }

    /// Sends a non-streaming request and returns the full generated text.
    pub async fn generate(
        &self,
        request: &GenerateRequest,
    ) -> Result<GenerateResponse, TidewayError> {
        let url = format!("{}/generate", self.base_url);
        let response = self
            .client
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(map_request_error)?;

        let status = response.status();
        debug!(status = %status, "generate response received");
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        response
            .json::<GenerateResponse>()
            .await
            .map_err(|e| TidewayError::Endpoint {
                message: format!("failed to parse generate response: {e}"),
                fault: FaultKind::Transient,
                source: Some(Box::new(e)),
            })
    }

    /// Probes the server's `/health` endpoint.
    pub async fn health(&self) -> Result<(), TidewayError> {
        let url = format!("{}/health", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(map_request_error)?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(TidewayError::transient(format!(
                "health probe returned {status}"
            )))
        }
    }
}

/// Parses the SSE body into typed stream chunks.
///
/// Data frames carry either a token chunk or an in-stream error object;
/// anything else is a protocol violation surfaced as a transient fault.
fn parse_event_stream(
    response: reqwest::Response,
) -> Pin<Box<dyn Stream<Item = Result<StreamChunk, TidewayError>> + Send>> {
    let event_stream = response.bytes_stream().eventsource();

    let mapped = event_stream.map(|result| match result {
        Ok(event) => {
            if let Ok(chunk) = serde_json::from_str::<StreamChunk>(&event.data) {
                return Ok(chunk);
            }
            if let Ok(frame) = serde_json::from_str::<StreamErrorFrame>(&event.data) {
                return Err(in_stream_error(frame));
            }
            Err(TidewayError::transient(format!(
                "unparseable stream frame: {}",
                event.data
            )))
        }
        Err(e) => Err(TidewayError::Endpoint {
            message: format!("SSE stream error: {e}"),
            fault: FaultKind::Transient,
            source: Some(Box::new(e)),
        }),
    });

    Box::pin(mapped)
}

/// Classifies an in-stream error frame by its reported type.
fn in_stream_error(frame: StreamErrorFrame) -> TidewayError {
    let fault = match frame.error_type.as_deref() {
        Some("validation") => FaultKind::Permanent,
        _ => FaultKind::Transient,
    };
    TidewayError::Endpoint {
        message: format!("server reported: {}", frame.error),
        fault,
        source: None,
    }
}

/// Classifies an HTTP error status.
///
/// 422 is the server's validation rejection (permanent); 429 and 5xx are
/// capacity or availability conditions the queue may retry.
fn status_error(status: reqwest::StatusCode, body: &str) -> TidewayError {
    let fault = if status.as_u16() == 429 || status.is_server_error() {
        FaultKind::Transient
    } else {
        FaultKind::Permanent
    };
    TidewayError::Endpoint {
        message: format!("server returned {status}: {body}"),
        fault,
        source: None,
    }
}

fn map_request_error(e: reqwest::Error) -> TidewayError {
    TidewayError::Endpoint {
        message: format!("HTTP request failed: {e}"),
        fault: FaultKind::Transient,
        source: Some(Box::new(e)),
    }
}
