//! Bot entity types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Bot lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BotStatus {
    /// Bot is running and placing orders.
    Active,
    /// Bot is stopped.
    Stopped,
    /// Bot halted after an unrecoverable error.
    Error,
}

impl std::fmt::Display for BotStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "ACTIVE"),
            Self::Stopped => write!(f, "STOPPED"),
            Self::Error => write!(f, "ERROR"),
        }
    }
}

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderSide {
    /// Buy order.
    Buy,
    /// Sell order.
    Sell,
}

impl std::fmt::Display for OrderSide {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Buy => write!(f, "BUY"),
            Self::Sell => write!(f, "SELL"),
        }
    }
}

/// Supported exchanges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Exchange {
    /// CoinDCX futures.
    #[serde(rename = "CoinDCX F")]
    CoindcxFutures,
    /// Binance spot.
    #[serde(rename = "Binance")]
    Binance,
}

impl std::fmt::Display for Exchange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::CoindcxFutures => write!(f, "CoinDCX F"),
            Self::Binance => write!(f, "Binance"),
        }
    }
}

/// A trading bot as returned by the REST API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bot {
    /// Bot ID.
    pub id: String,
    /// Traded symbol.
    pub ticker: String,
    /// Exchange the bot trades on.
    pub exchange: Exchange,
    /// Side of the first order in the loop.
    pub first_order: OrderSide,
    /// Order quantity.
    pub quantity: f64,
    /// Buy price.
    pub buy_price: f64,
    /// Sell price.
    pub sell_price: f64,
    /// Trailing stop percentage, if enabled.
    #[serde(default)]
    pub trailing_percent: Option<f64>,
    /// Leverage multiplier.
    #[serde(default)]
    pub leverage: Option<u32>,
    /// Whether the bot loops indefinitely.
    pub infinite_loop: bool,
    /// Current status.
    pub status: BotStatus,
    /// Realized profit and loss.
    pub pnl: f64,
    /// Total number of completed trades.
    pub total_trades: u64,
    /// Time of the most recent fill.
    #[serde(default)]
    pub last_fill_time: Option<DateTime<Utc>>,
    /// Side of the most recent fill.
    #[serde(default)]
    pub last_fill_side: Option<OrderSide>,
    /// Price of the most recent fill.
    #[serde(default)]
    pub last_fill_price: Option<f64>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

/// A partial bot record as pushed on the event stream.
///
/// Only `id` is mandatory; every other field is merged into the existing
/// entity when present and left untouched when absent. Optional bot fields
/// cannot be cleared through a patch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BotPatch {
    /// ID of the bot being patched.
    pub id: String,
    /// New ticker.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ticker: Option<String>,
    /// New exchange.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exchange: Option<Exchange>,
    /// New first-order side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub first_order: Option<OrderSide>,
    /// New quantity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<f64>,
    /// New buy price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub buy_price: Option<f64>,
    /// New sell price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sell_price: Option<f64>,
    /// New trailing percentage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trailing_percent: Option<f64>,
    /// New leverage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leverage: Option<u32>,
    /// New infinite-loop flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub infinite_loop: Option<bool>,
    /// New status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<BotStatus>,
    /// New realized PnL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pnl: Option<f64>,
    /// New trade count.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_trades: Option<u64>,
    /// New last fill time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_fill_time: Option<DateTime<Utc>>,
    /// New last fill side.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_fill_side: Option<OrderSide>,
    /// New last fill price.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_fill_price: Option<f64>,
    /// New update time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl BotPatch {
    /// Creates an empty patch for the given bot ID.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Default::default()
        }
    }

    /// Merges the present fields into `bot`, leaving absent fields untouched.
    ///
    /// Merging is an overwrite, not an increment, so applying the same patch
    /// twice leaves the bot in the same state as applying it once.
    pub fn merge_into(&self, bot: &mut Bot) {
        if let Some(ref ticker) = self.ticker {
            bot.ticker = ticker.clone();
        }
        if let Some(exchange) = self.exchange {
            bot.exchange = exchange;
        }
        if let Some(first_order) = self.first_order {
            bot.first_order = first_order;
        }
        if let Some(quantity) = self.quantity {
            bot.quantity = quantity;
        }
        if let Some(buy_price) = self.buy_price {
            bot.buy_price = buy_price;
        }
        if let Some(sell_price) = self.sell_price {
            bot.sell_price = sell_price;
        }
        if let Some(trailing_percent) = self.trailing_percent {
            bot.trailing_percent = Some(trailing_percent);
        }
        if let Some(leverage) = self.leverage {
            bot.leverage = Some(leverage);
        }
        if let Some(infinite_loop) = self.infinite_loop {
            bot.infinite_loop = infinite_loop;
        }
        if let Some(status) = self.status {
            bot.status = status;
        }
        if let Some(pnl) = self.pnl {
            bot.pnl = pnl;
        }
        if let Some(total_trades) = self.total_trades {
            bot.total_trades = total_trades;
        }
        if let Some(last_fill_time) = self.last_fill_time {
            bot.last_fill_time = Some(last_fill_time);
        }
        if let Some(last_fill_side) = self.last_fill_side {
            bot.last_fill_side = Some(last_fill_side);
        }
        if let Some(last_fill_price) = self.last_fill_price {
            bot.last_fill_price = Some(last_fill_price);
        }
        if let Some(updated_at) = self.updated_at {
            bot.updated_at = updated_at;
        }
    }
}

/// Request body for creating a new bot.
#[derive(Debug, Clone, Serialize)]
pub struct NewBot {
    /// Traded symbol.
    pub ticker: String,
    /// Exchange to trade on.
    pub exchange: Exchange,
    /// Side of the first order.
    pub first_order: OrderSide,
    /// Order quantity.
    pub quantity: f64,
    /// Buy price.
    pub buy_price: f64,
    /// Sell price.
    pub sell_price: f64,
    /// Trailing stop percentage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trailing_percent: Option<f64>,
    /// Leverage multiplier.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub leverage: Option<u32>,
    /// Whether the bot loops indefinitely.
    pub infinite_loop: bool,
}

/// Aggregate bot statistics as returned by the REST API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BotStatistics {
    /// Total number of bots.
    pub total_bots: u64,
    /// Number of active bots.
    pub active_bots: u64,
    /// Number of stopped bots.
    pub stopped_bots: u64,
    /// Sum of realized PnL across all bots.
    pub total_pnl: f64,
    /// Sum of completed trades across all bots.
    pub total_trades: u64,
}

/// Builds a bot with fixed fields for tests.
#[cfg(test)]
pub(crate) fn sample_bot(id: &str) -> Bot {
    Bot {
        id: id.to_string(),
        ticker: "BTCUSDT".to_string(),
        exchange: Exchange::Binance,
        first_order: OrderSide::Buy,
        quantity: 0.01,
        buy_price: 50000.0,
        sell_price: 51000.0,
        trailing_percent: None,
        leverage: Some(3),
        infinite_loop: false,
        status: BotStatus::Stopped,
        pnl: 0.0,
        total_trades: 0,
        last_fill_time: None,
        last_fill_side: None,
        last_fill_price: None,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serde_roundtrip() {
        let json = serde_json::to_string(&BotStatus::Active).expect("serialize");
        assert_eq!(json, "\"ACTIVE\"");
        let status: BotStatus = serde_json::from_str("\"STOPPED\"").expect("deserialize");
        assert_eq!(status, BotStatus::Stopped);
    }

    #[test]
    fn test_exchange_wire_names() {
        let json = serde_json::to_string(&Exchange::CoindcxFutures).expect("serialize");
        assert_eq!(json, "\"CoinDCX F\"");
        let exchange: Exchange = serde_json::from_str("\"Binance\"").expect("deserialize");
        assert_eq!(exchange, Exchange::Binance);
    }

    #[test]
    fn test_patch_merges_only_present_fields() {
        let mut bot = sample_bot("b1");
        let patch: BotPatch =
            serde_json::from_str(r#"{"id":"b1","pnl":12.5}"#).expect("deserialize");

        patch.merge_into(&mut bot);

        assert_eq!(bot.pnl, 12.5);
        assert_eq!(bot.ticker, "BTCUSDT");
        assert_eq!(bot.status, BotStatus::Stopped);
    }

    #[test]
    fn test_patch_merge_is_idempotent() {
        let mut once = sample_bot("b1");
        let mut twice = once.clone();
        let patch = BotPatch {
            pnl: Some(7.25),
            status: Some(BotStatus::Active),
            total_trades: Some(4),
            ..BotPatch::new("b1")
        };

        patch.merge_into(&mut once);
        patch.merge_into(&mut twice);
        patch.merge_into(&mut twice);

        assert_eq!(once, twice);
    }

    #[test]
    fn test_patch_cannot_clear_optional_fields() {
        let mut bot = sample_bot("b1");
        bot.trailing_percent = Some(1.5);

        BotPatch::new("b1").merge_into(&mut bot);

        assert_eq!(bot.trailing_percent, Some(1.5));
    }
}
