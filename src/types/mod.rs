//! Shared entity types.
//!
//! Canonical client-side representations of the dashboard's entities. These
//! are the shapes held by the [`store`](crate::store) and exchanged with both
//! the REST API and the event stream.

pub mod bot;
pub mod log;
pub mod order;

pub use bot::{Bot, BotPatch, BotStatistics, BotStatus, Exchange, NewBot, OrderSide};
pub use log::{ActivityLog, LogLevel, NewActivityLog};
pub use order::{Order, OrderEvent, OrderStatus, OrderType};
