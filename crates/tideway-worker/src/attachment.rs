// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Attachment resolver implementations.
//!
//! The real signed-URL issuer is an external object-storage collaborator;
//! these resolvers cover the two deployment shapes the pipeline supports:
//! pass the opaque key through to an endpoint that resolves it itself, or
//! prefix it with the collaborator's public base URL.

use async_trait::async_trait;

use tideway_core::{AttachmentResolver, TidewayError};

/// Hands the opaque storage key through unchanged.
pub struct PassthroughResolver;

#[async_trait]
impl AttachmentResolver for PassthroughResolver {
    async fn signed_url(&self, storage_key: &str) -> Result<String, TidewayError> {
        Ok(storage_key.to_string())
    }
}

/// Joins the storage key onto the collaborator's base URL.
pub struct UrlPrefixResolver {
    base_url: String,
}

impl UrlPrefixResolver {
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        while base_url.ends_with('/') {
            base_url.pop();
        }
        Self { base_url }
    }
}

#[async_trait]
impl AttachmentResolver for UrlPrefixResolver {
    async fn signed_url(&self, storage_key: &str) -> Result<String, TidewayError> {
        let key = storage_key.trim_start_matches('/');
        Ok(format!("{}/{key}", self.base_url))
    }
}
