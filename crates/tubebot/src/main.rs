use anyhow::Result;
use dotenvy::dotenv;
use std::sync::Arc;
use teloxide::prelude::*;

use tubecore::core::validation::validate_youtube_url;
use tubecore::core::{config::Config, init_logger};
use tubecore::download::catalog::best_option;
use tubecore::download::{fetch_catalog_with_retry, CatalogBuilder, MetadataProvider, YtDlpProvider};
use tubecore::{DownloadFlow, UsageStore};

mod cli;
mod telegram;

use cli::{Cli, Commands};
use telegram::{create_bot, schema, setup_bot_commands, HandlerDeps};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse_args();

    // Load environment variables from .env if present
    let _ = dotenv();

    let config = Config::load(cli.config.as_deref())?;
    init_logger(&config.log)?;

    match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run_bot(config).await,
        Commands::Info { url } => print_catalog(&config, &url).await,
        Commands::Stats => print_stats(&config),
    }
}

async fn run_bot(config: Config) -> Result<()> {
    log::info!("Starting tubedrop bot...");

    let bot = create_bot(&config)?;
    let flow = Arc::new(DownloadFlow::from_config(&config)?);
    log::info!("Usage store ready at {}", config.database_path);

    if let Err(e) = setup_bot_commands(&bot).await {
        log::warn!("Failed to set bot commands: {}", e);
    }

    let deps = HandlerDeps::new(flow, config.admin_ids.clone());
    Dispatcher::builder(bot, schema(deps))
        .error_handler(LoggingErrorHandler::with_custom_text("An error has occurred in the dispatcher"))
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    log::info!("Dispatcher shutdown gracefully");
    Ok(())
}

/// `info <url>`: catalog as JSON, no usage rows written
async fn print_catalog(config: &Config, url: &str) -> Result<()> {
    validate_youtube_url(url)?;
    let provider: Arc<dyn MetadataProvider> = Arc::new(YtDlpProvider::from_settings(&config.tools));
    let builder = CatalogBuilder::new(provider, config.catalog.clone());

    let catalog = fetch_catalog_with_retry(&builder, url.trim(), &config.retry.to_retry_config())
        .await
        .into_result()?;
    log::info!(
        "Best audio: {}, best video: {}",
        best_option(&catalog.audio_options).map_or("-", |o| o.quality.as_str()),
        best_option(&catalog.video_options).map_or("-", |o| o.quality.as_str())
    );
    println!("{}", serde_json::to_string_pretty(&catalog)?);
    Ok(())
}

fn print_stats(config: &Config) -> Result<()> {
    let store = UsageStore::open(&config.database_path, config.timezone()?)?;
    let stats = store.query_stats()?;
    println!("{}", serde_json::to_string_pretty(&stats)?);
    Ok(())
}
