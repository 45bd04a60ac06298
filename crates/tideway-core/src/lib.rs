// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Tideway inference pipeline.
//!
//! This crate provides the foundational trait definitions, error types, wire
//! types, and the token sink used throughout the Tideway workspace. Adapter
//! implementations (SQLite storage, notification channels, model endpoints)
//! live in sibling crates and implement the traits defined here.

pub mod error;
pub mod sink;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{FaultKind, TidewayError};
pub use sink::TokenSink;
pub use types::{AdapterType, HealthStatus};

// Re-export all adapter traits at crate root.
pub use traits::{
    AttachmentResolver, IngestionQueue, ModelEndpoint, NotificationChannel, PipelineAdapter,
    SessionStore,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn adapter_type_round_trips_display_and_from_str() {
        use std::str::FromStr;

        for variant in [
            AdapterType::Endpoint,
            AdapterType::Channel,
            AdapterType::Storage,
        ] {
            let s = variant.to_string();
            assert_eq!(AdapterType::from_str(&s).unwrap(), variant);
        }
    }

    #[test]
    fn all_trait_modules_are_exported() {
        // Compile-time check that every adapter seam is reachable through
        // the public API.
        fn _assert_pipeline_adapter<T: PipelineAdapter>() {}
        fn _assert_endpoint<T: ModelEndpoint>() {}
        fn _assert_channel<T: NotificationChannel>() {}
        fn _assert_store<T: SessionStore>() {}
        fn _assert_queue<T: IngestionQueue>() {}
        fn _assert_resolver<T: AttachmentResolver>() {}
    }
}
