//! Real-time event layer.
//!
//! One persistent WebSocket connection to the backend event stream, a
//! per-type callback router, and the message types that travel between them.
//!
//! # Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use scalper_client::ws::{EventKind, EventRouter, StreamConnection, WsConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let router = Arc::new(EventRouter::new());
//!
//!     let _prices = router.subscribe(
//!         &[EventKind::PriceUpdate],
//!         Arc::new(|envelope| println!("tick: {envelope:?}")),
//!     );
//!
//!     let connection = StreamConnection::new(
//!         WsConfig::new("ws://localhost:8000/api/v1/ws/app"),
//!         Arc::clone(&router),
//!     )?;
//!     connection.connect().await;
//!
//!     // ... the connection reconnects on its own until closed.
//!     connection.close().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod messages;
pub mod router;

pub use config::WsConfig;
pub use connection::{ConnectionStatus, StreamConnection};
pub use error::WsError;
pub use messages::{ClientMessage, Envelope, EventKind, PriceTick, StreamEvent, SystemNotice};
pub use router::{EventCallback, EventRouter, SubscriptionHandle};
