//! Request shapes for the market-data and order endpoints.

use {
    chrono::{DateTime, FixedOffset},
    serde::Serialize,
    serde_json::{Value, json},
};

use crate::time::{format_time, serialize_time};

/// Which orders `GET accounts/:id/orders` returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrderStateFilter {
    All,
    Open,
    Closed,
}

/// Candle interval for `GET markets/candles/:id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HistoricalDataGranularity {
    OneMinute,
    TwoMinutes,
    ThreeMinutes,
    FourMinutes,
    FiveMinutes,
    TenMinutes,
    FifteenMinutes,
    TwentyMinutes,
    HalfHour,
    OneHour,
    TwoHours,
    FourHours,
    OneDay,
    OneWeek,
    OneMonth,
    OneYear,
}

impl HistoricalDataGranularity {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OneMinute => "OneMinute",
            Self::TwoMinutes => "TwoMinutes",
            Self::ThreeMinutes => "ThreeMinutes",
            Self::FourMinutes => "FourMinutes",
            Self::FiveMinutes => "FiveMinutes",
            Self::TenMinutes => "TenMinutes",
            Self::FifteenMinutes => "FifteenMinutes",
            Self::TwentyMinutes => "TwentyMinutes",
            Self::HalfHour => "HalfHour",
            Self::OneHour => "OneHour",
            Self::TwoHours => "TwoHours",
            Self::FourHours => "FourHours",
            Self::OneDay => "OneDay",
            Self::OneWeek => "OneWeek",
            Self::OneMonth => "OneMonth",
            Self::OneYear => "OneYear",
        }
    }
}

impl std::str::FromStr for HistoricalDataGranularity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            Self::OneMinute,
            Self::TwoMinutes,
            Self::ThreeMinutes,
            Self::FourMinutes,
            Self::FiveMinutes,
            Self::TenMinutes,
            Self::FifteenMinutes,
            Self::TwentyMinutes,
            Self::HalfHour,
            Self::OneHour,
            Self::TwoHours,
            Self::FourHours,
            Self::OneDay,
            Self::OneWeek,
            Self::OneMonth,
            Self::OneYear,
        ]
        .into_iter()
        .find(|g| g.as_str().eq_ignore_ascii_case(s))
        .ok_or_else(|| format!("unknown candle interval: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OptionType {
    Call,
    Put,
}

/// Side of a strategy or bracket leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrderAction {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrderSide {
    Buy,
    Sell,
    Short,
    #[serde(rename = "Cov")]
    Cover,
    #[serde(rename = "BTO")]
    BuyToOpen,
    #[serde(rename = "STC")]
    SellToClose,
    #[serde(rename = "STO")]
    SellToOpen,
    #[serde(rename = "BTC")]
    BuyToClose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrderType {
    Market,
    Limit,
    Stop,
    StopLimit,
    TrailStopInPercentage,
    TrailStopInDollar,
    TrailStopLimitInPercentage,
    TrailStopLimitInDollar,
    LimitOnOpen,
    LimitOnClose,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TimeInForce {
    Day,
    GoodTillCanceled,
    GoodTillExtendedDay,
    GoodTillDate,
    ImmediateOrCancel,
    FillOrKill,
}

/// Role of a component inside a bracket order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum OrderClass {
    Primary,
    Limit,
    StopLoss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StrategyType {
    CoveredCall,
    MarriedPuts,
    VerticalCallSpread,
    VerticalPutSpread,
    CalendarCallSpread,
    CalendarPutSpread,
    DiagonalCallSpread,
    DiagonalPutSpread,
    Collar,
    Straddle,
    Strangle,
    ButterflyCall,
    ButterflyPut,
    IronButterfly,
    CondorCall,
    Custom,
}

/// Selects a range of option contracts for `POST markets/quotes/options`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionIdFilter {
    pub option_type: OptionType,
    pub underlying_id: u64,
    #[serde(serialize_with = "serialize_time")]
    pub expiry_date: DateTime<FixedOffset>,
    pub min_strike_price: f64,
    pub max_strike_price: f64,
}

/// One strategy to quote in `POST markets/quotes/strategies`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyVariantRequest {
    pub variant_id: u32,
    pub strategy: StrategyType,
    pub legs: Vec<StrategyVariantLeg>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrategyVariantLeg {
    pub symbol_id: u64,
    pub action: OrderAction,
    pub ratio: u32,
}

/// A primary, limit or stop-loss component of a bracket order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BracketOrderComponent {
    /// Zero for a new component, otherwise the order being replaced.
    pub order_id: u64,
    pub quantity: f64,
    pub action: OrderAction,
    pub limit_price: Option<f64>,
    pub stop_price: Option<f64>,
    pub order_type: OrderType,
    pub time_in_force: TimeInForce,
    pub order_class: OrderClass,
}

/// A leg of a multi-leg strategy order.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InsertOrderLegData {
    pub symbol_id: u64,
    pub action: OrderAction,
    pub leg_quantity: u32,
}

/// Filters for `GET accounts/:id/orders`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrdersQuery {
    pub state: Option<OrderStateFilter>,
    pub start: Option<DateTime<FixedOffset>>,
    pub end: Option<DateTime<FixedOffset>>,
    pub ids: Vec<u64>,
}

impl OrdersQuery {
    pub fn state(mut self, state: OrderStateFilter) -> Self {
        self.state = Some(state);
        self
    }

    pub fn between(mut self, start: DateTime<FixedOffset>, end: DateTime<FixedOffset>) -> Self {
        self.start = Some(start);
        self.end = Some(end);
        self
    }

    pub fn ids(mut self, ids: impl IntoIterator<Item = u64>) -> Self {
        self.ids = ids.into_iter().collect();
        self
    }

    pub(crate) fn to_params(&self) -> Value {
        json!({
            "stateFilter": self.state,
            "startTime": self.start.as_ref().map(format_time),
            "endTime": self.end.as_ref().map(format_time),
            "ids": (!self.ids.is_empty()).then_some(&self.ids),
        })
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn est(y: i32, m: u32, d: u32) -> DateTime<FixedOffset> {
        FixedOffset::west_opt(5 * 3600)
            .unwrap()
            .with_ymd_and_hms(y, m, d, 0, 0, 0)
            .unwrap()
    }

    #[test]
    fn option_filter_uses_wire_names() {
        let filter = OptionIdFilter {
            option_type: OptionType::Call,
            underlying_id: 27426,
            expiry_date: est(2017, 1, 20),
            min_strike_price: 70.0,
            max_strike_price: 80.0,
        };
        assert_eq!(
            serde_json::to_value(&filter).unwrap(),
            json!({
                "optionType": "Call",
                "underlyingId": 27426,
                "expiryDate": "2017-01-20T00:00:00-05:00",
                "minStrikePrice": 70.0,
                "maxStrikePrice": 80.0,
            })
        );
    }

    #[test]
    fn strategy_variant_nests_legs() {
        let variant = StrategyVariantRequest {
            variant_id: 1,
            strategy: StrategyType::Custom,
            legs: vec![StrategyVariantLeg {
                symbol_id: 27426,
                action: OrderAction::Buy,
                ratio: 1000,
            }],
        };
        assert_eq!(
            serde_json::to_value(&variant).unwrap(),
            json!({
                "variantId": 1,
                "strategy": "Custom",
                "legs": [{"symbolId": 27426, "action": "Buy", "ratio": 1000}],
            })
        );
    }

    #[test]
    fn bracket_component_and_leg_shapes() {
        let component = BracketOrderComponent {
            order_id: 0,
            quantity: 10.0,
            action: OrderAction::Sell,
            limit_price: None,
            stop_price: Some(9.5),
            order_type: OrderType::Stop,
            time_in_force: TimeInForce::GoodTillCanceled,
            order_class: OrderClass::StopLoss,
        };
        let value = serde_json::to_value(&component).unwrap();
        assert_eq!(value["orderClass"], "StopLoss");
        assert_eq!(value["timeInForce"], "GoodTillCanceled");
        assert_eq!(value["stopPrice"], 9.5);
        assert!(value["limitPrice"].is_null());

        let leg = InsertOrderLegData {
            symbol_id: 8049,
            action: OrderAction::Buy,
            leg_quantity: 2,
        };
        assert_eq!(
            serde_json::to_value(&leg).unwrap(),
            json!({"symbolId": 8049, "action": "Buy", "legQuantity": 2})
        );
    }

    #[test]
    fn order_side_short_codes() {
        assert_eq!(serde_json::to_value(OrderSide::BuyToOpen).unwrap(), "BTO");
        assert_eq!(serde_json::to_value(OrderSide::Cover).unwrap(), "Cov");
        assert_eq!(serde_json::to_value(OrderSide::Short).unwrap(), "Short");
    }

    #[test]
    fn granularity_round_trips_through_str() {
        let g: HistoricalDataGranularity = "oneday".parse().unwrap();
        assert_eq!(g, HistoricalDataGranularity::OneDay);
        assert_eq!(g.as_str(), "OneDay");
        assert!("Fortnight".parse::<HistoricalDataGranularity>().is_err());
    }

    #[test]
    fn orders_query_drops_unset_filters() {
        let params = OrdersQuery::default().state(OrderStateFilter::Open).to_params();
        assert_eq!(params["stateFilter"], "Open");
        assert!(params["startTime"].is_null());
        assert!(params["ids"].is_null());

        let params = OrdersQuery::default()
            .between(est(2024, 1, 1), est(2024, 1, 31))
            .ids([1, 2])
            .to_params();
        assert_eq!(params["startTime"], "2024-01-01T00:00:00-05:00");
        assert_eq!(params["endTime"], "2024-01-31T00:00:00-05:00");
        assert_eq!(params["ids"], json!([1, 2]));
    }
}
