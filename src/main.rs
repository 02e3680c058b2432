use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use todo_api_rust::config::{parse_port, AppConfig};
use todo_api_rust::server;

#[derive(Parser)]
#[command(name = "todo-api")]
#[command(about = "TODO CRUD service with basic-auth, access logging and client OS detection")]
#[command(version)]
struct Cli {
    /// Listen port, overrides PORT (accepts 8080 or :8080)
    #[arg(long, value_parser = port_arg)]
    port: Option<u16>,

    /// SQLite database file, overrides DB_PATH (":memory:" for a throwaway store)
    #[arg(long)]
    db_path: Option<PathBuf>,
}

fn port_arg(value: &str) -> Result<u16, String> {
    parse_port(value).ok_or_else(|| format!("invalid port: {}", value))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up PORT, DB_PATH, BASIC_AUTH_*, etc.
    let _ = dotenvy::dotenv();

    // Diagnostics go to stderr; stdout is reserved for the JSON access log
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut config = AppConfig::from_env();
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if let Some(db_path) = cli.db_path {
        config.database.path = db_path;
    }

    if config.auth.uses_default_credentials() {
        tracing::warn!(
            "Basic auth is using the built-in development credentials; set BASIC_AUTH_USER_ID and BASIC_AUTH_PASSWORD before exposing this server"
        );
    }
    tracing::info!("Starting Todo API with {:?}", config);

    server::run(config).await
}
