// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `tideway status` command implementation.

use colored::Colorize;

use tideway_config::TidewayConfig;
use tideway_core::{IngestionQueue, SessionStore, TidewayError};

use crate::serve::open_store;

pub async fn run_status(config: TidewayConfig) -> Result<(), TidewayError> {
    let store = open_store(&config).await?;
    let depth = store.depth().await?;
    store.close().await?;

    println!("{}", "ingestion queue".bold());
    println!("  pending: {}", depth.pending);
    println!("  leased:  {}", depth.leased);
    if depth.dead > 0 {
        println!(
            "  dead:    {}  {}",
            depth.dead,
            "(inspect with `tideway dlq list`)".red()
        );
    } else {
        println!("  dead:    0");
    }
    Ok(())
}
