mod auth;
mod collectors;
mod config;
mod error;
mod models;
mod sheets;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::collectors::upwork::Upwork;
use crate::config::Config;
use crate::sheets::SheetsClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("gigwatch=info")),
        )
        .init();

    let config = Config::parse();

    tracing::info!("Authenticating with Google Sheets...");
    let secrets = auth::ClientSecrets::load(&config.credentials_file)?;
    let store = auth::TokenStore::new(config.token_file.clone());
    let http = reqwest::Client::new();
    let token = auth::acquire(&secrets, &store, &http).await?;

    let sink = SheetsClient::new(token.access_token, config.sheet_id.clone())?;
    let collector = Upwork::new()?;

    collectors::runner::run(&collector, &sink, &config.niche, config.delay).await
}
