//! topicmatch Server - HTTP REST API for supervisor allocation
//!
//! Reads `.env` (if present), then `topicmatch.{toml,yaml,json}` and
//! `TOPICMATCH__*` environment variables.

use server::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            return Err(err.into());
        }
    }

    let config = ServerConfig::load()?;
    server::start_server(config).await?;

    Ok(())
}
