//! Endpoint wrappers. Each call is a fixed path plus a parameter mapping,
//! dispatched through [`CredentialManager::invoke`]; responses are returned
//! as received.

use std::{fmt::Display, sync::Arc};

use {
    chrono::{DateTime, TimeZone},
    qtrade_oauth::{CredentialManager, Error, HttpMethod, Result},
    serde::Serialize,
    serde_json::{Value, json},
};

use crate::{
    requests::{HistoricalDataGranularity, OptionIdFilter, OrdersQuery, StrategyVariantRequest},
    time::format_time,
};

/// Questrade REST client bound to one credential manager.
#[derive(Clone)]
pub struct QuestradeClient {
    credentials: Arc<CredentialManager>,
}

impl QuestradeClient {
    pub fn new(credentials: Arc<CredentialManager>) -> Self {
        Self { credentials }
    }

    pub fn credentials(&self) -> &CredentialManager {
        &self.credentials
    }

    async fn get(&self, endpoint: &str, params: Option<Value>) -> Result<Value> {
        self.credentials
            .invoke(HttpMethod::Get, endpoint, params.as_ref())
            .await
    }

    async fn post(&self, endpoint: &str, body: &impl Serialize) -> Result<Value> {
        let body = serde_json::to_value(body).map_err(|e| Error::InvalidParams(e.to_string()))?;
        self.credentials
            .invoke(HttpMethod::Post, endpoint, Some(&body))
            .await
    }

    // ── Account calls ───────────────────────────────────────────────────

    pub async fn time(&self) -> Result<Value> {
        self.get("v1/time", None).await
    }

    pub async fn accounts(&self) -> Result<Value> {
        self.get("v1/accounts", None).await
    }

    pub async fn positions(&self, account_id: &str) -> Result<Value> {
        self.get(&format!("v1/accounts/{account_id}/positions"), None).await
    }

    pub async fn balances(&self, account_id: &str) -> Result<Value> {
        self.get(&format!("v1/accounts/{account_id}/balances"), None).await
    }

    pub async fn executions<Tz: TimeZone>(
        &self,
        account_id: &str,
        start: Option<&DateTime<Tz>>,
        end: Option<&DateTime<Tz>>,
    ) -> Result<Value>
    where
        Tz::Offset: Display,
    {
        let params = json!({
            "startTime": start.map(format_time),
            "endTime": end.map(format_time),
        });
        self.get(&format!("v1/accounts/{account_id}/executions"), Some(params)).await
    }

    pub async fn orders(&self, account_id: &str, query: &OrdersQuery) -> Result<Value> {
        self.get(
            &format!("v1/accounts/{account_id}/orders"),
            Some(query.to_params()),
        )
        .await
    }

    pub async fn order(&self, account_id: &str, order_id: u64) -> Result<Value> {
        self.get(&format!("v1/accounts/{account_id}/orders/{order_id}"), None).await
    }

    /// Account activities; the API caps the window at 31 days.
    pub async fn activities<Tz: TimeZone>(
        &self,
        account_id: &str,
        start: &DateTime<Tz>,
        end: &DateTime<Tz>,
    ) -> Result<Value>
    where
        Tz::Offset: Display,
    {
        let params = json!({
            "startTime": format_time(start),
            "endTime": format_time(end),
        });
        self.get(&format!("v1/accounts/{account_id}/activities"), Some(params)).await
    }

    // ── Market calls ────────────────────────────────────────────────────

    pub async fn symbol(&self, symbol_id: u64) -> Result<Value> {
        self.get(&format!("v1/symbols/{symbol_id}"), None).await
    }

    pub async fn symbols_by_ids(&self, ids: &[u64]) -> Result<Value> {
        self.get("v1/symbols", Some(json!({ "ids": ids }))).await
    }

    pub async fn symbols_by_names(&self, names: &[&str]) -> Result<Value> {
        self.get("v1/symbols", Some(json!({ "names": names }))).await
    }

    pub async fn symbols_search(&self, prefix: &str, offset: Option<u32>) -> Result<Value> {
        self.get(
            "v1/symbols/search",
            Some(json!({ "prefix": prefix, "offset": offset })),
        )
        .await
    }

    pub async fn option_chain(&self, symbol_id: u64) -> Result<Value> {
        self.get(&format!("v1/symbols/{symbol_id}/options"), None).await
    }

    pub async fn markets(&self) -> Result<Value> {
        self.get("v1/markets", None).await
    }

    pub async fn quote(&self, symbol_id: u64) -> Result<Value> {
        self.get(&format!("v1/markets/quotes/{symbol_id}"), None).await
    }

    pub async fn quotes(&self, ids: &[u64]) -> Result<Value> {
        self.get("v1/markets/quotes", Some(json!({ "ids": ids }))).await
    }

    pub async fn option_quotes(
        &self,
        filters: &[OptionIdFilter],
        option_ids: &[u64],
    ) -> Result<Value> {
        self.post(
            "v1/markets/quotes/options",
            &json!({ "filters": filters, "optionIds": option_ids }),
        )
        .await
    }

    pub async fn strategy_quotes(&self, variants: &[StrategyVariantRequest]) -> Result<Value> {
        self.post(
            "v1/markets/quotes/strategies",
            &json!({ "variants": variants }),
        )
        .await
    }

    pub async fn candles<Tz: TimeZone>(
        &self,
        symbol_id: u64,
        start: &DateTime<Tz>,
        end: &DateTime<Tz>,
        interval: HistoricalDataGranularity,
    ) -> Result<Value>
    where
        Tz::Offset: Display,
    {
        let params = json!({
            "startTime": format_time(start),
            "endTime": format_time(end),
            "interval": interval.as_str(),
        });
        self.get(&format!("v1/markets/candles/{symbol_id}"), Some(params)).await
    }

    // ── Order calls ─────────────────────────────────────────────────────

    pub async fn place_order(&self, account_id: &str, order: &Value) -> Result<Value> {
        self.post(&format!("v1/accounts/{account_id}/orders"), order).await
    }

    pub async fn order_impact(&self, account_id: &str, order: &Value) -> Result<Value> {
        self.post(&format!("v1/accounts/{account_id}/orders/impact"), order).await
    }

    pub async fn replace_order(
        &self,
        account_id: &str,
        order_id: u64,
        order: &Value,
    ) -> Result<Value> {
        self.post(
            &format!("v1/accounts/{account_id}/orders/{order_id}"),
            order,
        )
        .await
    }

    pub async fn replace_order_impact(
        &self,
        account_id: &str,
        order_id: u64,
        order: &Value,
    ) -> Result<Value> {
        self.post(
            &format!("v1/accounts/{account_id}/orders/{order_id}/impact"),
            order,
        )
        .await
    }

    pub async fn cancel_order(&self, account_id: &str, order_id: u64) -> Result<Value> {
        self.credentials
            .invoke(
                HttpMethod::Delete,
                &format!("v1/accounts/{account_id}/orders/{order_id}"),
                None,
            )
            .await
    }

    pub async fn place_bracket_order(&self, account_id: &str, order: &Value) -> Result<Value> {
        self.post(&format!("v1/accounts/{account_id}/orders/bracket"), order).await
    }

    pub async fn bracket_order_impact(&self, account_id: &str, order: &Value) -> Result<Value> {
        self.post(
            &format!("v1/accounts/{account_id}/orders/bracket/impact"),
            order,
        )
        .await
    }

    pub async fn place_strategy_order(&self, account_id: &str, order: &Value) -> Result<Value> {
        self.post(&format!("v1/accounts/{account_id}/orders/strategy"), order).await
    }

    pub async fn strategy_order_impact(&self, account_id: &str, order: &Value) -> Result<Value> {
        self.post(
            &format!("v1/accounts/{account_id}/orders/strategy/impact"),
            order,
        )
        .await
    }
}
