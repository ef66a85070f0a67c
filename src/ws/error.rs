//! Stream error types.

/// Errors raised by the real-time layer.
///
/// Deliberately narrow: transport and serialization failures never surface
/// here, they are absorbed by the reconnect state machine or dropped with a
/// logged warning. Configuration validation is the only fallible edge left.
#[derive(Debug, thiserror::Error)]
pub enum WsError {
    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
