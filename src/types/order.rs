//! Order entity types.
//!
//! Orders are a read-mostly mirror: the backend owns their lifecycle and the
//! dashboard only displays them. Bot-level aggregates (PnL, trade count) are
//! never reconstructed from order data client-side.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::bot::OrderSide;

/// Order type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    /// Limit order.
    Limit,
    /// Market order.
    Market,
    /// Stop-limit order.
    StopLimit,
}

/// Order status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    /// Created locally, not yet sent to the exchange.
    Pending,
    /// Resting on the exchange.
    Open,
    /// Partially filled.
    PartiallyFilled,
    /// Completely filled.
    Filled,
    /// Cancelled.
    Cancelled,
    /// Rejected by the exchange.
    Rejected,
}

/// An order as returned by the REST API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    /// Order ID.
    pub id: String,
    /// Bot that placed the order.
    pub bot_id: String,
    /// Exchange name.
    pub exchange: String,
    /// Traded symbol.
    pub ticker: String,
    /// Order side.
    pub side: OrderSide,
    /// Order type.
    pub order_type: OrderType,
    /// Ordered quantity.
    pub quantity: f64,
    /// Quantity filled so far.
    #[serde(default)]
    pub filled_quantity: f64,
    /// Limit price, absent for market orders.
    #[serde(default)]
    pub price: Option<f64>,
    /// Average fill price.
    #[serde(default)]
    pub average_fill_price: Option<f64>,
    /// Current status.
    pub status: OrderStatus,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

/// Order payload carried by `order_update` / `order_filled` stream events.
///
/// Only the bot reference is required; the consumer uses it to refetch the
/// bot's authoritative detail rather than trusting the rest of the payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEvent {
    /// Bot that owns the order.
    #[serde(alias = "botId")]
    pub bot_id: String,
    /// Order ID, when present.
    #[serde(default)]
    pub id: Option<String>,
    /// New status, when present.
    #[serde(default)]
    pub status: Option<OrderStatus>,
    /// Filled quantity, when present.
    #[serde(default)]
    pub filled_quantity: Option<f64>,
}

/// Builds an open order with fixed fields for tests.
#[cfg(test)]
pub(crate) fn sample_order(id: &str, bot_id: &str) -> Order {
    Order {
        id: id.to_string(),
        bot_id: bot_id.to_string(),
        exchange: "Binance".to_string(),
        ticker: "BTCUSDT".to_string(),
        side: OrderSide::Buy,
        order_type: OrderType::Limit,
        quantity: 1.0,
        filled_quantity: 0.0,
        price: Some(50000.0),
        average_fill_price: None,
        status: OrderStatus::Open,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}
