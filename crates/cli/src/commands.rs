//! Top-level subcommands, grounded on the teacher's `gglib-cli/src/commands.rs`
//! `clap::Subcommand` style.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "bilingo", about = "Bilingual audio-learning platform backend")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the catalogue/entitlement HTTP API.
    Serve,
    /// Run one ingestion batch against the configured feed.
    Ingest {
        /// Restrict the batch to a single channel.
        #[arg(long)]
        channel: Option<String>,
        /// Maximum number of episodes to process this run.
        #[arg(long)]
        limit: Option<usize>,
        /// Reprocess episodes already published instead of skipping them.
        #[arg(long)]
        force: bool,
    },
}
