// SPDX-FileCopyrightText: 2026 Tideway Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tideway - a durable queue-backed model-invocation pipeline.
//!
//! This is the binary entry point for the Tideway worker and its operator
//! tooling.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod dlq;
mod enqueue;
mod serve;
mod status;

use clap::{Args, Parser, Subcommand};

/// Tideway - a durable queue-backed model-invocation pipeline.
#[derive(Parser, Debug)]
#[command(name = "tideway", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the Tideway worker.
    Serve,
    /// Enqueue an inference request (trusted internal producer / dev tool).
    Enqueue(EnqueueArgs),
    /// Inspect and replay dead-lettered requests.
    Dlq {
        #[command(subcommand)]
        command: DlqCommands,
    },
    /// Show queue depth.
    Status,
}

#[derive(Args, Debug)]
struct EnqueueArgs {
    /// Conversation to append to; a fresh session id is minted if omitted.
    #[arg(long)]
    session_id: Option<String>,

    #[arg(long)]
    user_id: String,

    #[arg(long)]
    model_id: String,

    #[arg(long)]
    provider_id: String,

    /// The user-turn prompt text.
    #[arg(long)]
    text: String,

    /// Opaque storage key of an uploaded attachment.
    #[arg(long)]
    image_reference: Option<String>,

    #[arg(long)]
    max_tokens: Option<u64>,

    #[arg(long)]
    temperature: Option<f64>,

    #[arg(long)]
    top_p: Option<f64>,
}

#[derive(Subcommand, Debug)]
enum DlqCommands {
    /// List dead-lettered requests, oldest first.
    List {
        #[arg(long)]
        limit: Option<i64>,
    },
    /// Move a dead letter back onto the queue with a fresh receive budget.
    Replay { id: i64 },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Load and validate configuration at startup.
    let config = match tideway_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            tideway_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::Enqueue(args)) => enqueue::run_enqueue(config, args).await,
        Some(Commands::Dlq { command }) => match command {
            DlqCommands::List { limit } => dlq::run_list(config, limit).await,
            DlqCommands::Replay { id } => dlq::run_replay(config, id).await,
        },
        Some(Commands::Status) => status::run_status(config).await,
        None => {
            println!("tideway: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
