// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Attachment resolution seam.
//!
//! Attachments are referenced by opaque storage keys; an external
//! object-storage collaborator turns a key into a time-limited signed URL.
//! The pipeline never reads attachment bytes.

use async_trait::async_trait;

use crate::error::TidewayError;

/// Resolves an opaque attachment storage key into a fetchable URL.
#[async_trait]
pub trait AttachmentResolver: Send + Sync {
    async fn signed_url(&self, storage_key: &str) -> Result<String, TidewayError>;
}
