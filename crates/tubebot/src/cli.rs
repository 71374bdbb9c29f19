use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tubedrop")]
#[command(author, version, about = "Telegram bot that turns YouTube links into audio and video files", long_about = None)]
pub struct Cli {
    /// Path to a TOML config file (defaults to ./tubedrop.toml when present)
    #[arg(short, long, global = true, env = "TUBEDROP_CONFIG")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the bot with long polling (default)
    Run,

    /// Print the stream catalog of a YouTube URL as JSON
    Info {
        /// YouTube video URL
        url: String,
    },

    /// Print usage statistics from the database as JSON
    Stats,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
