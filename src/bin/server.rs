//! gigstore - TCP server

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use gigstore::marketplace::Marketplace;
use gigstore::server::{Server, ServerConfig, DEFAULT_DATA_PATH, DEFAULT_PORT};

/// Serve a gigstore document over line-delimited JSON
#[derive(Parser, Debug)]
#[command(name = "gigstore-server", version, about)]
struct Args {
    /// Address to bind
    #[arg(long, env = "GIGSTORE_HOST", default_value = "127.0.0.1")]
    host: String,

    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// JSON document backing the store
    #[arg(short, long, env = "GIGSTORE_DATA", default_value = DEFAULT_DATA_PATH)]
    data: PathBuf,

    /// Maximum concurrent connections
    #[arg(long, default_value_t = 100)]
    max_connections: usize,
}

impl Args {
    fn into_config(self) -> ServerConfig {
        ServerConfig::new()
            .host(self.host)
            .port(self.port)
            .data_path(self.data)
            .max_connections(self.max_connections)
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Args::parse().into_config();
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        data_path = %config.data_path.display(),
        address = %config.bind_address(),
        "starting gigstore server"
    );

    let server = Server::new(config);
    Marketplace::new(server.database()).init_schema()?;
    server.start()?;

    Ok(())
}
