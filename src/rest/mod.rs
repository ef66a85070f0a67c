//! HTTP client for the dashboard REST API.
//!
//! # Example
//!
//! ```rust,ignore
//! use scalper_client::rest::RestClient;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = RestClient::with_base_url("http://localhost:8000/api/v1")?;
//!
//!     let bots = client.get_bots().await?;
//!     println!("{} bots configured", bots.len());
//!
//!     let logs = client.get_logs(Some(100)).await?;
//!     println!("latest log: {:?}", logs.first());
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod http;

pub use config::RestConfig;
pub use error::RestError;
pub use http::RestClient;
