//! Typed stream consumers and store reconciliation.
//!
//! Translates type-tagged stream events into safe mutations of the shared
//! store, given that the store is also written by REST round-trips. The
//! per-type policy is deliberate and non-uniform:
//!
//! | event                        | policy                                   |
//! |------------------------------|------------------------------------------|
//! | `bot_update`                 | partial merge-by-id                      |
//! | `bot_created`, `bot_deleted` | full bot-list refetch                    |
//! | `order_update`/`order_filled`| single-bot refetch (+ order mirror merge)|
//! | `log_created`                | direct prepend, no refetch               |
//! | `pnl_update`                 | single-field merge                       |
//! | `price_update`               | not merged; left to per-widget consumers |
//!
//! Events that change set membership or feed backend-computed aggregates are
//! resolved by an authoritative read; events carrying complete or narrowly
//! scoped payloads merge directly. Unifying either direction would change
//! observable behavior.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, error, info};

use crate::rest::{RestClient, RestError};
use crate::store::DashboardStore;
use crate::types::{ActivityLog, Bot, BotStatus, Order};
use crate::ws::{Envelope, EventKind, EventRouter, StreamEvent, SubscriptionHandle};

/// The slice of the REST API consumed by the reconciliation layer.
///
/// Kept narrow so the refetch contract can be exercised against a mock.
#[async_trait]
pub trait DashboardApi: Send + Sync {
    /// Lists all bots.
    async fn list_bots(&self) -> Result<Vec<Bot>, RestError>;

    /// Gets a single bot's authoritative detail.
    async fn get_bot(&self, id: &str) -> Result<Bot, RestError>;

    /// Starts or stops a bot.
    async fn set_bot_status(&self, id: &str, status: BotStatus) -> Result<Bot, RestError>;

    /// Lists activity logs, newest first.
    async fn list_logs(&self) -> Result<Vec<ActivityLog>, RestError>;

    /// Lists orders, newest first.
    async fn list_orders(&self) -> Result<Vec<Order>, RestError>;
}

#[async_trait]
impl DashboardApi for RestClient {
    async fn list_bots(&self) -> Result<Vec<Bot>, RestError> {
        self.get_bots().await
    }

    async fn get_bot(&self, id: &str) -> Result<Bot, RestError> {
        RestClient::get_bot(self, id).await
    }

    async fn set_bot_status(&self, id: &str, status: BotStatus) -> Result<Bot, RestError> {
        match status {
            BotStatus::Active => self.start_bot(id).await,
            _ => self.stop_bot(id).await,
        }
    }

    async fn list_logs(&self) -> Result<Vec<ActivityLog>, RestError> {
        self.get_logs(Some(crate::store::MAX_LOGS as u32)).await
    }

    async fn list_orders(&self) -> Result<Vec<Order>, RestError> {
        self.get_orders(None).await
    }
}

/// Applies stream events and REST results to the shared store.
pub struct Reconciler {
    store: Arc<DashboardStore>,
    api: Arc<dyn DashboardApi>,
}

impl std::fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reconciler").finish_non_exhaustive()
    }
}

impl Reconciler {
    /// Creates a reconciler over the given store and API seam.
    #[must_use]
    pub fn new(store: Arc<DashboardStore>, api: Arc<dyn DashboardApi>) -> Arc<Self> {
        Arc::new(Self { store, api })
    }

    /// Registers the per-type consumer hooks on `router`.
    ///
    /// `price_update` is intentionally not attached: price ticks stay a
    /// per-widget concern and never touch the shared store.
    pub fn attach(self: &Arc<Self>, router: &Arc<EventRouter>) -> Vec<SubscriptionHandle> {
        let mut handles = Vec::with_capacity(3);

        // Merge paths: synchronous, idempotent writes.
        let this = Arc::clone(self);
        handles.push(router.subscribe(
            &[EventKind::BotUpdate, EventKind::PnlUpdate, EventKind::LogCreated],
            Arc::new(move |envelope| this.apply_merge(envelope)),
        ));

        // Set-membership changes: resynchronize the whole list.
        let this = Arc::clone(self);
        handles.push(router.subscribe(
            &[EventKind::BotCreated, EventKind::BotDeleted],
            Arc::new(move |envelope| {
                debug!(kind = %envelope.kind(), "membership change; refetching bot list");
                let reconciler = Arc::clone(&this);
                tokio::spawn(async move { reconciler.refresh_bots().await });
            }),
        ));

        // Order events: aggregates are backend-computed, refetch the bot.
        let this = Arc::clone(self);
        handles.push(router.subscribe(
            &[EventKind::OrderUpdate, EventKind::OrderFilled],
            Arc::new(move |envelope| {
                let (StreamEvent::OrderUpdate(event) | StreamEvent::OrderFilled(event)) =
                    &envelope.event
                else {
                    return;
                };
                this.store.apply_order_event(event);
                let bot_id = event.bot_id.clone();
                let reconciler = Arc::clone(&this);
                tokio::spawn(async move { reconciler.refresh_bot(&bot_id).await });
            }),
        ));

        handles
    }

    /// Applies the synchronous merge-path events.
    fn apply_merge(&self, envelope: &Envelope) {
        match &envelope.event {
            StreamEvent::BotUpdate(patch) => self.store.merge_bot(patch),
            StreamEvent::PnlUpdate { bot_id, pnl } => self.store.set_pnl(bot_id, *pnl),
            StreamEvent::LogCreated(log) => self.store.push_log(log.clone()),
            _ => {}
        }
    }

    /// Replaces the bot collection from an authoritative list read.
    ///
    /// A failed refetch is logged and dropped; the next push or refetch will
    /// resynchronize.
    pub async fn refresh_bots(&self) {
        match self.api.list_bots().await {
            Ok(bots) => self.store.replace_bots(bots),
            Err(e) => error!(error = %e, "bot list refetch failed"),
        }
    }

    /// Refreshes a single bot from an authoritative detail read.
    pub async fn refresh_bot(&self, id: &str) {
        match self.api.get_bot(id).await {
            Ok(bot) => self.store.upsert_bot(bot),
            Err(e) => error!(bot_id = %id, error = %e, "bot refetch failed"),
        }
    }

    /// Replaces the retained logs from an authoritative list read.
    pub async fn refresh_logs(&self) {
        match self.api.list_logs().await {
            Ok(logs) => self.store.replace_logs(logs),
            Err(e) => error!(error = %e, "log refetch failed"),
        }
    }

    /// Seeds the order mirror from an authoritative list read.
    ///
    /// `order_update`/`order_filled` events merge only into orders that are
    /// already mirrored, so this runs once at mount before any event arrives.
    pub async fn refresh_orders(&self) {
        match self.api.list_orders().await {
            Ok(orders) => self.store.replace_orders(orders),
            Err(e) => error!(error = %e, "order refetch failed"),
        }
    }

    /// Toggles a bot between active and stopped, optimistically.
    ///
    /// The new status is applied locally first, then confirmed over REST. On
    /// success the full list is refetched so the REST path wins over any
    /// stale push event interleaved with it; on failure the local change is
    /// reverted.
    ///
    /// # Errors
    ///
    /// Returns an error if the bot is unknown or the REST call fails.
    pub async fn toggle_bot(&self, id: &str) -> Result<Bot, RestError> {
        let Some(current) = self.store.bot(id) else {
            return Err(RestError::NotFound(format!("bot {id}")));
        };
        let target = match current.status {
            BotStatus::Active => BotStatus::Stopped,
            _ => BotStatus::Active,
        };

        self.store.set_status(id, target);
        info!(bot_id = %id, status = %target, "toggling bot");

        match self.api.set_bot_status(id, target).await {
            Ok(bot) => {
                self.store.upsert_bot(bot.clone());
                self.refresh_bots().await;
                Ok(bot)
            }
            Err(e) => {
                self.store.set_status(id, current.status);
                Err(e)
            }
        }
    }
}
