use {
    anyhow::{Context, Result},
    chrono::{DateTime, FixedOffset},
    clap::{Subcommand, ValueEnum},
    qtrade_api::{HistoricalDataGranularity, OrderStateFilter, OrdersQuery, QuestradeClient},
    qtrade_oauth::HttpMethod,
    serde_json::Value,
};

#[derive(Subcommand)]
pub enum ApiAction {
    /// Current server time.
    Time,
    /// Accounts of the authenticated user.
    Accounts,
    /// Positions held in an account.
    Positions { account: String },
    /// Balances of an account.
    Balances { account: String },
    /// Orders of an account.
    Orders {
        account: String,
        #[arg(long, value_enum, default_value_t = StateArg::All)]
        state: StateArg,
    },
    /// Level 1 quotes for one or more symbol ids.
    Quote {
        #[arg(required = true)]
        ids: Vec<u64>,
    },
    /// Historical candles for a symbol.
    Candles {
        id: u64,
        /// RFC 3339 start, e.g. 2024-01-02T09:30:00-05:00.
        #[arg(long, value_parser = parse_time)]
        start: DateTime<FixedOffset>,
        #[arg(long, value_parser = parse_time)]
        end: DateTime<FixedOffset>,
        #[arg(long, default_value = "OneDay")]
        interval: HistoricalDataGranularity,
    },
    /// Raw authenticated call, e.g. `call GET v1/markets`.
    Call {
        method: HttpMethod,
        endpoint: String,
        /// JSON object: query parameters for GET/DELETE, body for POST.
        #[arg(long)]
        params: Option<String>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
pub enum StateArg {
    All,
    Open,
    Closed,
}

impl From<StateArg> for OrderStateFilter {
    fn from(s: StateArg) -> Self {
        match s {
            StateArg::All => Self::All,
            StateArg::Open => Self::Open,
            StateArg::Closed => Self::Closed,
        }
    }
}

fn parse_time(s: &str) -> Result<DateTime<FixedOffset>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(s)
}

pub async fn handle_api(action: ApiAction, client: &QuestradeClient) -> Result<()> {
    let value = match action {
        ApiAction::Time => client.time().await?,
        ApiAction::Accounts => client.accounts().await?,
        ApiAction::Positions { account } => client.positions(&account).await?,
        ApiAction::Balances { account } => client.balances(&account).await?,
        ApiAction::Orders { account, state } => {
            let query = OrdersQuery::default().state(state.into());
            client.orders(&account, &query).await?
        },
        ApiAction::Quote { ids } => client.quotes(&ids).await?,
        ApiAction::Candles {
            id,
            start,
            end,
            interval,
        } => client.candles(id, &start, &end, interval).await?,
        ApiAction::Call {
            method,
            endpoint,
            params,
        } => {
            let params: Option<Value> = params
                .as_deref()
                .map(serde_json::from_str)
                .transpose()
                .context("--params is not valid JSON")?;
            client
                .credentials()
                .invoke(method, &endpoint, params.as_ref())
                .await?
        },
    };

    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
