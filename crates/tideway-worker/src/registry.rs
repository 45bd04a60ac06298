// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Endpoint registry: the configuration-time mapping from
//! `(model_id, provider_id)` to an endpoint adapter instance.
//!
//! The registry is populated once at worker start and then injected into the
//! request handler as an immutable value. There is no global registry and no
//! runtime mutation; concurrently-scaled workers each carry their own copy
//! built from the same configuration.

use std::collections::HashMap;
use std::sync::Arc;

use tideway_core::ModelEndpoint;

/// Immutable lookup table for endpoint adapters.
#[derive(Default)]
pub struct EndpointRegistry {
    endpoints: HashMap<(String, String), Arc<dyn ModelEndpoint>>,
}

impl EndpointRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an adapter for one `(model_id, provider_id)` pair.
    ///
    /// Later registrations for the same pair replace earlier ones; config
    /// validation rejects duplicates before this is ever reached.
    pub fn register(
        &mut self,
        model_id: impl Into<String>,
        provider_id: impl Into<String>,
        endpoint: Arc<dyn ModelEndpoint>,
    ) {
        self.endpoints
            .insert((model_id.into(), provider_id.into()), endpoint);
    }

    /// Looks up the adapter for a pair. Lookup failure at invocation time is
    /// a permanent configuration error, not a transient fault.
    pub fn resolve(&self, model_id: &str, provider_id: &str) -> Option<Arc<dyn ModelEndpoint>> {
        self.endpoints
            .get(&(model_id.to_string(), provider_id.to_string()))
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    /// Registered pairs, for startup logging.
    pub fn pairs(&self) -> impl Iterator<Item = &(String, String)> {
        self.endpoints.keys()
    }
}
