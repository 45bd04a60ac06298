// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Model endpoint adapter trait -- the seam to heterogeneous inference
//! backends (hosted model servers, containerized model servers).

use async_trait::async_trait;

use crate::error::TidewayError;
use crate::sink::TokenSink;
use crate::traits::adapter::PipelineAdapter;
use crate::types::{EndpointInvocation, FinalResult};

/// Adapter for one inference backend family.
///
/// Capability-polymorphic: callers check [`supports_streaming`] rather than
/// downcasting. Streaming adapters push zero or more fragments into the sink
/// before returning the assembled result; whole-result adapters return the
/// result without touching the sink.
///
/// Adapters must not retry internally. The ingestion queue's redelivery
/// policy is the sole retry authority; errors are classified via
/// [`FaultKind`](crate::error::FaultKind) so the handler can fail fast on
/// permanent faults.
///
/// [`supports_streaming`]: ModelEndpoint::supports_streaming
#[async_trait]
pub trait ModelEndpoint: PipelineAdapter {
    /// Whether this backend can emit incremental output.
    fn supports_streaming(&self) -> bool;

    /// Performs one inference call and returns the complete result.
    async fn invoke(
        &self,
        invocation: &EndpointInvocation,
        sink: &TokenSink,
    ) -> Result<FinalResult, TidewayError>;
}
