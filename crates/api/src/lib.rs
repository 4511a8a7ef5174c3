//! Questrade REST endpoint wrappers over the credential layer.

pub mod client;
pub mod requests;
pub mod time;

pub use {
    client::QuestradeClient,
    requests::{
        BracketOrderComponent, HistoricalDataGranularity, InsertOrderLegData, OptionIdFilter,
        OptionType, OrderAction, OrderClass, OrderSide, OrderStateFilter, OrderType, OrdersQuery,
        StrategyType, StrategyVariantLeg, StrategyVariantRequest, TimeInForce,
    },
    time::{add_local_tz, format_time},
};
