// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Tideway integration tests.
//!
//! Provides a scripted [`MockEndpoint`], a recording [`CaptureChannel`],
//! and the [`PipelineHarness`] wiring both over temp SQLite storage.

pub mod capture_channel;
pub mod harness;
pub mod mock_endpoint;

pub use capture_channel::CaptureChannel;
pub use harness::{FailingResolver, MOCK_MODEL_ID, MOCK_PROVIDER_ID, PipelineHarness};
pub use mock_endpoint::{MockEndpoint, ScriptedRun};
