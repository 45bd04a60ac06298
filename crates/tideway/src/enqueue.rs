// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tideway enqueue` command implementation.
//!
//! A trusted internal producer for development and operations: builds an
//! `InferenceRequest`, serializes it, and puts it on the ingestion queue of
//! the configured database.

use colored::Colorize;
use uuid::Uuid;

use tideway_config::TidewayConfig;
use tideway_core::types::{InferenceRequest, ModelParameters};
use tideway_core::{IngestionQueue, SessionStore, TidewayError};

use crate::EnqueueArgs;
use crate::serve::open_store;

pub async fn run_enqueue(config: TidewayConfig, args: EnqueueArgs) -> Result<(), TidewayError> {
    let store = open_store(&config).await?;

    // A session id is minted on the first user turn and stays stable for
    // the conversation's lifetime.
    let session_id = args
        .session_id
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let mut parameters = ModelParameters::default();
    if let Some(max_tokens) = args.max_tokens {
        parameters.insert("maxTokens", max_tokens);
    }
    if let Some(temperature) = args.temperature {
        parameters.insert("temperature", temperature);
    }
    if let Some(top_p) = args.top_p {
        parameters.insert("topP", top_p);
    }

    let request = InferenceRequest {
        session_id: session_id.clone(),
        user_id: args.user_id,
        model_id: args.model_id,
        provider_id: args.provider_id,
        text: args.text,
        image_reference: args.image_reference,
        mode: Default::default(),
        model_parameters: parameters,
    };

    let payload = serde_json::to_string(&request)
        .map_err(|e| TidewayError::Internal(format!("failed to serialize request: {e}")))?;
    let message_id = store.enqueue(&payload).await?;
    store.close().await?;

    println!(
        "{} message {} (session {})",
        "enqueued".green(),
        message_id,
        session_id
    );
    Ok(())
}
