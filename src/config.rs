use std::path::PathBuf;

use clap::Parser;

#[derive(Parser, Debug, Clone)]
#[command(name = "gigwatch", about = "Marketplace job listing poller for Google Sheets")]
pub struct Config {
    /// Niche/category to search for
    #[arg(long, env = "NICHE")]
    pub niche: String,

    /// Google Sheet ID to append rows to
    #[arg(long, env = "SHEET_ID")]
    pub sheet_id: String,

    /// Delay between polls in seconds
    #[arg(long, env = "POLL_DELAY", default_value = "300")]
    pub delay: u64,

    /// Path to the OAuth client secrets file
    #[arg(long, env = "CREDENTIALS_FILE", default_value = "credentials.json")]
    pub credentials_file: PathBuf,

    /// Path where the OAuth token is cached between runs
    #[arg(long, env = "TOKEN_FILE", default_value = "token.json")]
    pub token_file: PathBuf,
}
