//! Bot construction and the command list shown in the Telegram UI

use reqwest::ClientBuilder;
use secrecy::ExposeSecret;
use teloxide::prelude::*;
use teloxide::types::BotCommand;
use teloxide::utils::command::BotCommands;
use tubecore::Config;

/// Extra time the HTTP client allows on top of the delivery timeout,
/// so the flow's own timeout fires first.
const CLIENT_TIMEOUT_MARGIN_SECS: u64 = 60;

/// Bot commands enum with descriptions
#[derive(BotCommands, Clone, Debug, PartialEq, Eq)]
#[command(rename_rule = "lowercase", description = "Available commands:")]
pub enum Command {
    #[command(description = "start the bot")]
    Start,
    #[command(description = "how to use the bot")]
    Help,
    #[command(description = "usage statistics (admins only)")]
    Stats,
}

/// Creates a Bot instance with the configured token and an optional custom API URL
/// (`BOT_API_URL`, for a local Bot API server with larger upload limits).
pub fn create_bot(config: &Config) -> anyhow::Result<Bot> {
    let token = config.bot_token.expose_secret();
    if token.is_empty() {
        anyhow::bail!("bot token is not set (TUBEDROP_BOT_TOKEN, BOT_TOKEN or TELOXIDE_TOKEN)");
    }

    let timeout = config.delivery_timeout() + std::time::Duration::from_secs(CLIENT_TIMEOUT_MARGIN_SECS);
    let client = ClientBuilder::new().timeout(timeout).build()?;
    let bot = Bot::with_client(token, client);

    let bot = match std::env::var("BOT_API_URL") {
        Ok(bot_api_url) => {
            log::info!("Using custom Bot API URL: {}", bot_api_url);
            let url = url::Url::parse(&bot_api_url).map_err(|e| anyhow::anyhow!("Invalid BOT_API_URL: {}", e))?;
            bot.set_api_url(url)
        }
        Err(_) => bot,
    };

    Ok(bot)
}

/// Sets up bot commands in Telegram UI
pub async fn setup_bot_commands(bot: &Bot) -> Result<(), teloxide::RequestError> {
    bot.set_my_commands(vec![
        BotCommand::new("start", "start the bot"),
        BotCommand::new("help", "how to use the bot"),
        BotCommand::new("stats", "usage statistics (admins only)"),
    ])
    .await?;

    Ok(())
}
