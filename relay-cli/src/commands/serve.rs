//! Relay serve command: run the gateway server in the foreground.

use anyhow::Result;
use clap::Args;
use relay_server::{RelayServer, ServerConfig};

/// Arguments for the serve command
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Port to listen on (defaults to RELAY_PORT or 7528)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host to bind to (defaults to RELAY_HOST or 0.0.0.0)
    #[arg(long)]
    pub host: Option<String>,
}

/// Run the serve command
pub async fn run(args: ServeArgs) -> Result<()> {
    let mut config = ServerConfig::default();
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }

    tracing::info!("starting relay gateway on {}", config.addr());
    RelayServer::new(config).run().await?;
    Ok(())
}
