//! CLI entry point, the only place infrastructure is wired together.

mod bootstrap;
mod commands;
mod settings;

use clap::Parser;
use ingest::ProcessBatchOptions;
use tracing::info;

use bootstrap::bootstrap;
use commands::{Cli, Commands};
use settings::Settings;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let settings = Settings::load()?;
    let ctx = bootstrap(&settings).await?;

    match cli.command {
        Commands::Serve => {
            let router = http_api::build_router(ctx.app_state);
            let listener = tokio::net::TcpListener::bind(&ctx.http_bind_addr).await?;
            info!(addr = %ctx.http_bind_addr, "listening");
            axum::serve(listener, router).await?;
        }
        Commands::Ingest { channel, limit, force } => {
            let options = ProcessBatchOptions {
                concurrency: settings.ingest_concurrency,
                channel_filter: channel,
                skip_already_done: !force,
                limit,
            };
            let summary = ctx.ingestion.process_batch(&options).await?;
            info!(success = summary.success, failed = summary.failed, skipped = summary.skipped, "ingestion batch complete");
        }
    }

    Ok(())
}
