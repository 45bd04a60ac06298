// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tideway dlq` command implementations.
//!
//! Dead-lettered requests are a terminal, user-invisible failure; these
//! subcommands are the operator's inspection and replay surface.

use colored::Colorize;

use tideway_config::TidewayConfig;
use tideway_core::{IngestionQueue, SessionStore, TidewayError};

use crate::serve::open_store;

pub async fn run_list(config: TidewayConfig, limit: Option<i64>) -> Result<(), TidewayError> {
    let store = open_store(&config).await?;
    let letters = store.dead_letters(limit).await?;
    store.close().await?;

    if letters.is_empty() {
        println!("{}", "dead-letter queue is empty".green());
        return Ok(());
    }

    for letter in &letters {
        println!(
            "{} id={} message={} receives={} dead_lettered_at={}",
            "dead".red(),
            letter.id,
            letter.message_id,
            letter.receive_count,
            letter.dead_lettered_at
        );
        println!("  {}", truncate(&letter.payload, 120));
    }
    println!("{} dead letter(s)", letters.len());
    Ok(())
}

pub async fn run_replay(config: TidewayConfig, id: i64) -> Result<(), TidewayError> {
    let store = open_store(&config).await?;
    let message_id = store.replay_dead_letter(id).await?;
    store.close().await?;

    println!(
        "{} dead letter {} as message {} with a fresh receive budget",
        "replayed".green(),
        id,
        message_id
    );
    Ok(())
}

fn truncate(payload: &str, max: usize) -> String {
    if payload.len() <= max {
        payload.to_string()
    } else {
        let cut = payload
            .char_indices()
            .take_while(|(i, _)| *i < max)
            .map(|(i, c)| i + c.len_utf8())
            .last()
            .unwrap_or(0);
        format!("{}...", &payload[..cut])
    }
}
