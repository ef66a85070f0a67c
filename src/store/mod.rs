//! Shared reactive store.
//!
//! Canonical client-side copies of bots, activity logs, and the order mirror.
//! Both the REST layer and the stream consumers write here; the store owns
//! the collections and exposes only merge-by-id mutations, so concurrent
//! writers cannot clobber fields they did not produce. All guards are held
//! for the duration of a single synchronous mutation and never across an
//! await point.

use std::collections::{HashMap, VecDeque};
use std::sync::{PoisonError, RwLock};

use tracing::debug;

use crate::types::{ActivityLog, Bot, BotPatch, BotStatus, Order, OrderEvent};

/// Maximum number of retained activity log entries.
pub const MAX_LOGS: usize = 1000;

/// In-memory store shared by the REST and real-time layers.
#[derive(Debug, Default)]
pub struct DashboardStore {
    bots: RwLock<HashMap<String, Bot>>,
    logs: RwLock<VecDeque<ActivityLog>>,
    orders: RwLock<HashMap<String, Order>>,
}

impl DashboardStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the bot with the given ID, if present.
    #[must_use]
    pub fn bot(&self, id: &str) -> Option<Bot> {
        self.bots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Returns all bots, newest first.
    #[must_use]
    pub fn bots(&self) -> Vec<Bot> {
        let mut bots: Vec<Bot> = self
            .bots
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        bots.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        bots
    }

    /// Replaces the whole bot collection with an authoritative list.
    pub fn replace_bots(&self, bots: Vec<Bot>) {
        let mut guard = self.bots.write().unwrap_or_else(PoisonError::into_inner);
        *guard = bots.into_iter().map(|bot| (bot.id.clone(), bot)).collect();
    }

    /// Inserts or fully replaces a single bot.
    pub fn upsert_bot(&self, bot: Bot) {
        self.bots
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(bot.id.clone(), bot);
    }

    /// Merges the present fields of `patch` into the existing bot.
    ///
    /// A patch for an unknown bot is dropped: set membership is owned by the
    /// refetch path, never patched in from a push payload.
    pub fn merge_bot(&self, patch: &BotPatch) {
        let mut bots = self.bots.write().unwrap_or_else(PoisonError::into_inner);
        match bots.get_mut(&patch.id) {
            Some(bot) => patch.merge_into(bot),
            None => debug!(bot_id = %patch.id, "bot_update for unknown bot dropped"),
        }
    }

    /// Overwrites a single bot's realized PnL.
    pub fn set_pnl(&self, id: &str, pnl: f64) {
        let mut bots = self.bots.write().unwrap_or_else(PoisonError::into_inner);
        match bots.get_mut(id) {
            Some(bot) => bot.pnl = pnl,
            None => debug!(bot_id = %id, "pnl_update for unknown bot dropped"),
        }
    }

    /// Overwrites a single bot's status.
    pub fn set_status(&self, id: &str, status: BotStatus) {
        let mut bots = self.bots.write().unwrap_or_else(PoisonError::into_inner);
        match bots.get_mut(id) {
            Some(bot) => bot.status = status,
            None => debug!(bot_id = %id, "status change for unknown bot dropped"),
        }
    }

    /// Returns all retained log entries, newest first.
    #[must_use]
    pub fn logs(&self) -> Vec<ActivityLog> {
        self.logs
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .cloned()
            .collect()
    }

    /// Prepends a log entry, trimming the oldest past [`MAX_LOGS`].
    ///
    /// Logs are append-only and self-sufficient, so this is a direct insert
    /// with no refetch. Redelivery produces a visible duplicate; that is the
    /// accepted cost of never dropping an entry.
    pub fn push_log(&self, log: ActivityLog) {
        let mut logs = self.logs.write().unwrap_or_else(PoisonError::into_inner);
        logs.push_front(log);
        logs.truncate(MAX_LOGS);
    }

    /// Replaces the retained log entries with an authoritative list, newest
    /// first.
    pub fn replace_logs(&self, entries: Vec<ActivityLog>) {
        let mut logs = self.logs.write().unwrap_or_else(PoisonError::into_inner);
        *logs = entries.into_iter().take(MAX_LOGS).collect();
    }

    /// Clears all retained log entries.
    pub fn clear_logs(&self) {
        self.logs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Returns the order with the given ID, if mirrored.
    #[must_use]
    pub fn order(&self, id: &str) -> Option<Order> {
        self.orders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(id)
            .cloned()
    }

    /// Returns all mirrored orders, newest first.
    #[must_use]
    pub fn orders(&self) -> Vec<Order> {
        let mut orders: Vec<Order> = self
            .orders
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        orders
    }

    /// Replaces the order mirror with an authoritative list.
    pub fn replace_orders(&self, orders: Vec<Order>) {
        let mut guard = self.orders.write().unwrap_or_else(PoisonError::into_inner);
        *guard = orders
            .into_iter()
            .map(|order| (order.id.clone(), order))
            .collect();
    }

    /// Inserts or fully replaces a mirrored order.
    pub fn upsert_order(&self, order: Order) {
        self.orders
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(order.id.clone(), order);
    }

    /// Applies an order stream event to the mirror.
    ///
    /// Only the fields the event carries are overwritten; an event for an
    /// order that was never mirrored is dropped (the authoritative bot
    /// refetch covers the aggregate effect either way).
    pub fn apply_order_event(&self, event: &OrderEvent) {
        let Some(ref id) = event.id else {
            return;
        };
        let mut orders = self.orders.write().unwrap_or_else(PoisonError::into_inner);
        let Some(order) = orders.get_mut(id) else {
            debug!(order_id = %id, "order event for unmirrored order dropped");
            return;
        };
        if let Some(status) = event.status {
            order.status = status;
        }
        if let Some(filled_quantity) = event.filled_quantity {
            order.filled_quantity = filled_quantity;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::bot::sample_bot;
    use crate::types::LogLevel;

    fn sample_log(id: &str) -> ActivityLog {
        ActivityLog {
            id: id.to_string(),
            level: LogLevel::Info,
            message: "started".to_string(),
            bot_id: Some("b1".to_string()),
            timestamp: None,
        }
    }

    #[test]
    fn test_merge_bot_updates_only_named_fields() {
        let store = DashboardStore::new();
        store.upsert_bot(sample_bot("b1"));

        let patch: BotPatch =
            serde_json::from_str(r#"{"id":"b1","pnl":12.5}"#).expect("deserialize");
        store.merge_bot(&patch);

        let bot = store.bot("b1").expect("bot");
        assert_eq!(bot.pnl, 12.5);
        assert_eq!(bot.ticker, "BTCUSDT");
    }

    #[test]
    fn test_merge_bot_is_idempotent() {
        let store = DashboardStore::new();
        store.upsert_bot(sample_bot("b1"));
        let patch = BotPatch {
            pnl: Some(5.0),
            total_trades: Some(3),
            ..BotPatch::new("b1")
        };

        store.merge_bot(&patch);
        let after_once = store.bot("b1").expect("bot");
        store.merge_bot(&patch);
        let after_twice = store.bot("b1").expect("bot");

        assert_eq!(after_once, after_twice);
    }

    #[test]
    fn test_merge_bot_unknown_id_is_dropped() {
        let store = DashboardStore::new();
        store.merge_bot(&BotPatch::new("ghost"));
        assert!(store.bots().is_empty());
    }

    #[test]
    fn test_set_pnl_overwrites() {
        let store = DashboardStore::new();
        store.upsert_bot(sample_bot("b1"));

        store.set_pnl("b1", 9.5);
        store.set_pnl("b1", 9.5);

        assert_eq!(store.bot("b1").expect("bot").pnl, 9.5);
    }

    #[test]
    fn test_replace_bots_drops_absent_entries() {
        let store = DashboardStore::new();
        store.upsert_bot(sample_bot("b1"));
        store.upsert_bot(sample_bot("b2"));

        store.replace_bots(vec![sample_bot("b2")]);

        assert!(store.bot("b1").is_none());
        assert!(store.bot("b2").is_some());
    }

    #[test]
    fn test_push_log_prepends() {
        let store = DashboardStore::new();
        store.push_log(sample_log("1"));
        store.push_log(sample_log("2"));

        let logs = store.logs();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0].id, "2");
        assert_eq!(logs[1].id, "1");
    }

    #[test]
    fn test_push_log_trims_to_capacity() {
        let store = DashboardStore::new();
        for i in 0..(MAX_LOGS + 10) {
            store.push_log(sample_log(&i.to_string()));
        }

        let logs = store.logs();
        assert_eq!(logs.len(), MAX_LOGS);
        assert_eq!(logs[0].id, (MAX_LOGS + 9).to_string());
    }

    #[test]
    fn test_apply_order_event_merges_mirror() {
        use crate::types::order::sample_order;
        use crate::types::OrderStatus;

        let store = DashboardStore::new();
        store.upsert_order(sample_order("o1", "b1"));

        let event: OrderEvent = serde_json::from_str(
            r#"{"bot_id":"b1","id":"o1","status":"FILLED","filled_quantity":1.0}"#,
        )
        .expect("deserialize");
        store.apply_order_event(&event);

        let order = store.order("o1").expect("order");
        assert_eq!(order.status, OrderStatus::Filled);
        assert_eq!(order.filled_quantity, 1.0);
    }

    #[test]
    fn test_replace_orders_seeds_mirror() {
        use crate::types::order::sample_order;
        use crate::types::OrderStatus;

        let store = DashboardStore::new();
        store.upsert_order(sample_order("stale", "b1"));

        store.replace_orders(vec![sample_order("o1", "b1"), sample_order("o2", "b2")]);

        assert!(store.order("stale").is_none());
        assert_eq!(store.orders().len(), 2);

        // A mirrored order now accepts stream merges.
        let event: OrderEvent =
            serde_json::from_str(r#"{"bot_id":"b1","id":"o1","status":"CANCELLED"}"#)
                .expect("deserialize");
        store.apply_order_event(&event);
        assert_eq!(store.order("o1").expect("order").status, OrderStatus::Cancelled);
    }
}
