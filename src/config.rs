// Server configuration (command-line flags with defaults)

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug, Clone)]
#[command(name = "expense-server")]
#[command(about = "Expense Tracker - web server")]
pub struct ServerConfig {
    /// Path to the SQLite database file (created on first run)
    #[arg(short, long, default_value = "expenses.db")]
    pub db: PathBuf,

    /// Schema script executed when the database file does not exist
    #[arg(short, long, default_value = "schema.sql")]
    pub schema: PathBuf,

    /// Address to listen on
    #[arg(short, long, default_value = "127.0.0.1:5000")]
    pub addr: SocketAddr,

    /// Directory served under /static
    #[arg(long, default_value = "web/static")]
    pub static_dir: PathBuf,

    /// Enable debug logging
    #[arg(short, long)]
    pub verbose: bool,
}

/// Install the tracing subscriber. RUST_LOG wins over `verbose`.
pub fn init_logging(verbose: bool) {
    use tracing_subscriber::EnvFilter;

    let default = if verbose { "debug" } else { "info" };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default)),
        )
        .with_target(false)
        .compact()
        .try_init();
}
