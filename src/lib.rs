//! Client-side real-time layer for the Scalper Bot dashboard.
//!
//! Keeps a local view of the trading backend live over one WebSocket
//! connection plus its REST API:
//!
//! - [`ws`] - the stream connection (reconnect, keepalive) and the per-type
//!   event router
//! - [`rest`] - typed HTTP client for bots, logs, and statistics
//! - [`store`] - the shared reactive snapshot of bots, orders, and logs
//! - [`reconcile`] - per-event-type policies that keep the store consistent
//!   with the backend
//! - [`realtime`] - the mount/unmount lifecycle tying it all together
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use scalper_client::{RealtimeLayer, RestClient, WsConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let api = Arc::new(RestClient::with_defaults()?);
//!     let layer = RealtimeLayer::mount(WsConfig::default(), api).await?;
//!
//!     // The store now tracks backend pushes until unmount.
//!     for bot in layer.store().bots() {
//!         println!("{}: {} ({})", bot.id, bot.ticker, bot.status);
//!     }
//!
//!     layer.unmount().await;
//!     Ok(())
//! }
//! ```

pub mod realtime;
pub mod reconcile;
pub mod rest;
pub mod store;
pub mod types;
pub mod ws;

pub use realtime::RealtimeLayer;
pub use reconcile::{DashboardApi, Reconciler};
pub use rest::{RestClient, RestConfig, RestError};
pub use store::DashboardStore;
pub use types::{ActivityLog, Bot, BotPatch, BotStatus, Order, OrderEvent};
pub use ws::{
    ConnectionStatus, Envelope, EventKind, EventRouter, StreamConnection, StreamEvent,
    SubscriptionHandle, WsConfig, WsError,
};
