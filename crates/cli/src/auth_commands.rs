use {
    anyhow::Result,
    clap::Subcommand,
    qtrade_config::QtradeConfig,
    qtrade_oauth::{CredentialManager, Error, TokenStore},
};

#[derive(Subcommand)]
pub enum AuthAction {
    /// Store a refresh token generated in the Questrade API hub.
    Seed {
        #[arg(long, env = "QTRADE_REFRESH_TOKEN")]
        refresh_token: String,
    },
    /// Show where the credentials point and how long they remain valid.
    Status,
    /// Redeem the refresh token now.
    Refresh,
}

pub async fn handle_auth(
    action: AuthAction,
    config: &QtradeConfig,
    manager: &CredentialManager,
) -> Result<()> {
    match action {
        AuthAction::Seed { refresh_token } => seed(config, refresh_token.trim()),
        AuthAction::Status => status(manager),
        AuthAction::Refresh => refresh(manager).await,
    }
}

fn seed(config: &QtradeConfig, refresh_token: &str) -> Result<()> {
    if refresh_token.is_empty() {
        anyhow::bail!("refresh token is empty");
    }
    let store = TokenStore::from_config(config);
    store.seed(refresh_token)?;
    println!("Seeded credentials at {}", store.path().display());
    Ok(())
}

fn status(manager: &CredentialManager) -> Result<()> {
    let status = match manager.status() {
        Ok(s) => s,
        Err(e) if e.needs_reseed() => {
            anyhow::bail!("{e}\nrun `qtrade auth seed --refresh-token <token>` first")
        },
        Err(e) => return Err(e.into()),
    };

    let validity = match status.remaining_secs {
        Some(secs) => format!("valid ({}m {}s remaining)", secs / 60, secs % 60),
        None if status.api_server.is_empty() => "seeded, not yet redeemed".to_string(),
        None => "expired, renews on next call".to_string(),
    };
    let server = if status.api_server.is_empty() {
        "-"
    } else {
        status.api_server.as_str()
    };
    println!("{server} [{validity}]");
    Ok(())
}

async fn refresh(manager: &CredentialManager) -> Result<()> {
    match manager.renew().await {
        Ok(access) => {
            println!("Renewed; API server {}", access.api_server);
            Ok(())
        },
        Err(e @ Error::RenewalFailed(_)) => Err(anyhow::anyhow!(
            "{e}\nif the refresh token was already used, generate a new one and re-seed"
        )),
        Err(e) => Err(e.into()),
    }
}
