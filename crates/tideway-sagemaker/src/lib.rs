// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hosted-endpoint adapter for Tideway.
//!
//! One `POST` to an invocations URL per inference, whole result in the
//! response. The generated text echoes the prompt; the adapter strips it
//! before handing the completion back to the pipeline.

pub mod adapter;
pub mod client;
pub mod types;

pub use adapter::SagemakerEndpoint;
pub use client::SagemakerClient;
