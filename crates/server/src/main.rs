//! texgate server binary
//!
//! Serves the compilation gateway with configuration from `server.*` and
//! `TEXGATE_SERVER__*` environment variables.

use server::ServerConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config = ServerConfig::load()?;

    // Start server
    server::start_server(config).await?;

    Ok(())
}
