// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Streaming endpoint adapter for containerized text-generation servers.
//!
//! Speaks the `/generate` + `/generate_stream` HTTP protocol with SSE token
//! streaming. Fragments are pushed into the run's [`TokenSink`] as they
//! arrive; the final frame's assembled text becomes the run result.
//!
//! [`TokenSink`]: tideway_core::TokenSink

pub mod adapter;
pub mod client;
pub mod types;

pub use adapter::TgiEndpoint;
pub use client::TgiClient;
