mod api_commands;
mod auth_commands;

use std::{path::PathBuf, sync::Arc};

use {
    anyhow::Context,
    clap::{Parser, Subcommand},
    qtrade_api::QuestradeClient,
    qtrade_config::QtradeConfig,
    qtrade_oauth::CredentialManager,
    tracing::debug,
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

#[derive(Parser)]
#[command(name = "qtrade", about = "Questrade API client")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (defaults to ./qtrade.toml or ~/.config/qtrade/qtrade.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, global = true, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Credential management.
    Auth {
        #[command(subcommand)]
        action: auth_commands::AuthAction,
    },
    #[command(flatten)]
    Api(api_commands::ApiAction),
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    // Logs go to stderr so stdout stays pure JSON.
    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_writer(std::io::stderr),
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<QtradeConfig> {
    match &cli.config {
        Some(path) => qtrade_config::load_config(path),
        None => Ok(qtrade_config::discover_and_load()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_telemetry(&cli);

    let config = load_config(&cli)?;
    debug!(
        version = env!("CARGO_PKG_VERSION"),
        store = %qtrade_config::credentials_path(&config).display(),
        "qtrade starting"
    );

    let manager =
        Arc::new(CredentialManager::from_config(&config).context("failed to build HTTP client")?);

    match cli.command {
        Commands::Auth { action } => auth_commands::handle_auth(action, &config, &manager).await,
        Commands::Api(action) => {
            api_commands::handle_api(action, &QuestradeClient::new(manager)).await
        },
    }
}
