//! Stream message types.
//!
//! The wire unit is an envelope of the form `{type, data, timestamp}` where
//! the shape of `data` is determined entirely by the `type` tag. The tag set
//! is closed: adding a variant to [`StreamEvent`] forces every exhaustive
//! match at the dispatch boundary to be revisited at compile time.

use serde::{Deserialize, Serialize};

use crate::types::{ActivityLog, BotPatch, OrderEvent};

/// Message type tags, used as subscription keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// Partial bot record pushed after a config or status change.
    BotUpdate,
    /// A bot was created.
    BotCreated,
    /// A bot was deleted.
    BotDeleted,
    /// An order changed state.
    OrderUpdate,
    /// An order was filled.
    OrderFilled,
    /// A ticker price moved.
    PriceUpdate,
    /// An activity log entry was written.
    LogCreated,
    /// A bot's realized PnL changed.
    PnlUpdate,
    /// Server notice.
    System,
    /// Keepalive request (control plane).
    Ping,
    /// Keepalive response (control plane).
    Pong,
}

impl EventKind {
    /// Returns true for control-plane messages that never reach subscribers.
    #[must_use]
    pub const fn is_control(&self) -> bool {
        matches!(self, Self::Ping | Self::Pong)
    }

    /// Returns the wire tag for this kind.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::BotUpdate => "bot_update",
            Self::BotCreated => "bot_created",
            Self::BotDeleted => "bot_deleted",
            Self::OrderUpdate => "order_update",
            Self::OrderFilled => "order_filled",
            Self::PriceUpdate => "price_update",
            Self::LogCreated => "log_created",
            Self::PnlUpdate => "pnl_update",
            Self::System => "system",
            Self::Ping => "ping",
            Self::Pong => "pong",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A ticker price tick.
///
/// Price ticks are high-frequency and scoped to individual widgets; they are
/// routed like any other event but never merged into the shared store.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PriceTick {
    /// Ticker symbol.
    pub ticker: String,
    /// Last price.
    pub price: f64,
    /// Exchange the price came from.
    #[serde(default)]
    pub exchange: Option<String>,
}

/// A server notice, sent as a connection banner.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SystemNotice {
    /// Notice text.
    #[serde(default)]
    pub message: Option<String>,
}

/// Server-to-client events, tagged by message type.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum StreamEvent {
    /// Partial bot record; merged by id into the store.
    BotUpdate(BotPatch),
    /// Bot created. The payload is not trusted to match the schema and is
    /// only a trigger for a full list refetch.
    BotCreated(serde_json::Value),
    /// Bot deleted; also resolved by a full list refetch.
    BotDeleted {
        /// ID of the deleted bot.
        id: String,
    },
    /// Order state change; triggers a single-bot refetch.
    OrderUpdate(OrderEvent),
    /// Order fill; triggers a single-bot refetch.
    OrderFilled(OrderEvent),
    /// Ticker price tick.
    PriceUpdate(PriceTick),
    /// Complete, self-sufficient log record.
    LogCreated(ActivityLog),
    /// Narrow single-field PnL merge.
    PnlUpdate {
        /// Bot whose PnL changed.
        bot_id: String,
        /// New realized PnL.
        pnl: f64,
    },
    /// Server notice.
    System(SystemNotice),
    /// Keepalive request.
    Ping,
    /// Keepalive response.
    Pong,
}

impl StreamEvent {
    /// Returns the kind tag of this event.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        match self {
            Self::BotUpdate(_) => EventKind::BotUpdate,
            Self::BotCreated(_) => EventKind::BotCreated,
            Self::BotDeleted { .. } => EventKind::BotDeleted,
            Self::OrderUpdate(_) => EventKind::OrderUpdate,
            Self::OrderFilled(_) => EventKind::OrderFilled,
            Self::PriceUpdate(_) => EventKind::PriceUpdate,
            Self::LogCreated(_) => EventKind::LogCreated,
            Self::PnlUpdate { .. } => EventKind::PnlUpdate,
            Self::System(_) => EventKind::System,
            Self::Ping => EventKind::Ping,
            Self::Pong => EventKind::Pong,
        }
    }
}

/// The wire-level unit exchanged over the stream.
///
/// `timestamp` is event origination time and advisory only; consumers must
/// not assume strict ordering across distinct connections. It is kept as an
/// opaque string because the backend emits zone-less ISO timestamps.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope {
    /// The typed event.
    #[serde(flatten)]
    pub event: StreamEvent,
    /// Origination time, advisory only.
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl Envelope {
    /// Returns the kind tag of the enclosed event.
    #[must_use]
    pub const fn kind(&self) -> EventKind {
        self.event.kind()
    }
}

/// Client-to-server messages.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Keepalive ping.
    Ping {
        /// Timestamp in milliseconds since the Unix epoch.
        timestamp: u64,
    },
}

impl ClientMessage {
    /// Builds a ping stamped with the current time.
    #[must_use]
    pub fn ping_now() -> Self {
        let timestamp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        Self::Ping { timestamp }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::LogLevel;

    #[test]
    fn test_envelope_bot_update() {
        let json = r#"{"type":"bot_update","data":{"id":"b1","pnl":12.5},"timestamp":"2024-01-30T12:00:00"}"#;
        let envelope: Envelope = serde_json::from_str(json).expect("deserialize");
        assert_eq!(envelope.kind(), EventKind::BotUpdate);
        assert_eq!(envelope.timestamp.as_deref(), Some("2024-01-30T12:00:00"));
        match envelope.event {
            StreamEvent::BotUpdate(patch) => {
                assert_eq!(patch.id, "b1");
                assert_eq!(patch.pnl, Some(12.5));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_envelope_log_created() {
        let json = r#"{"type":"log_created","data":{"id":"1","level":"INFO","message":"started","botId":"b1"},"timestamp":"T"}"#;
        let envelope: Envelope = serde_json::from_str(json).expect("deserialize");
        match envelope.event {
            StreamEvent::LogCreated(log) => {
                assert_eq!(log.id, "1");
                assert_eq!(log.level, LogLevel::Info);
                assert_eq!(log.bot_id, Some("b1".to_string()));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_envelope_pnl_update() {
        let json = r#"{"type":"pnl_update","data":{"bot_id":"b2","pnl":-3.75}}"#;
        let envelope: Envelope = serde_json::from_str(json).expect("deserialize");
        match envelope.event {
            StreamEvent::PnlUpdate { bot_id, pnl } => {
                assert_eq!(bot_id, "b2");
                assert_eq!(pnl, -3.75);
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn test_envelope_price_update() {
        let json =
            r#"{"type":"price_update","data":{"ticker":"BTCUSDT","price":50123.4,"exchange":"Binance"}}"#;
        let envelope: Envelope = serde_json::from_str(json).expect("deserialize");
        assert_eq!(envelope.kind(), EventKind::PriceUpdate);
    }

    #[test]
    fn test_envelope_bot_created_payload_is_opaque() {
        // bot_created payloads are untrusted; anything JSON must parse
        let json = r#"{"type":"bot_created","data":{"whatever":true}}"#;
        let envelope: Envelope = serde_json::from_str(json).expect("deserialize");
        assert_eq!(envelope.kind(), EventKind::BotCreated);
    }

    #[test]
    fn test_envelope_pong_without_data() {
        let json = r#"{"type":"pong","timestamp":""}"#;
        let envelope: Envelope = serde_json::from_str(json).expect("deserialize");
        assert_eq!(envelope.kind(), EventKind::Pong);
        assert!(envelope.kind().is_control());
    }

    #[test]
    fn test_envelope_system_banner() {
        let json = r#"{"type":"system","data":{"message":"Connected to Scalper Bot WebSocket"},"timestamp":"T"}"#;
        let envelope: Envelope = serde_json::from_str(json).expect("deserialize");
        assert_eq!(envelope.kind(), EventKind::System);
    }

    #[test]
    fn test_envelope_unknown_type_is_rejected() {
        let json = r#"{"type":"mystery","data":{}}"#;
        assert!(serde_json::from_str::<Envelope>(json).is_err());
    }

    #[test]
    fn test_client_ping_serialize() {
        let msg = ClientMessage::Ping {
            timestamp: 1706640000000,
        };
        let json = serde_json::to_string(&msg).expect("serialize");
        assert!(json.contains("\"type\":\"ping\""));
        assert!(json.contains("\"timestamp\":1706640000000"));
    }

    #[test]
    fn test_kind_wire_tags() {
        assert_eq!(EventKind::BotUpdate.to_string(), "bot_update");
        assert_eq!(EventKind::PnlUpdate.to_string(), "pnl_update");
        assert!(EventKind::Ping.is_control());
        assert!(!EventKind::System.is_control());
    }
}
