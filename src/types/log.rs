//! Activity log entity types.

use serde::{Deserialize, Serialize};

/// Severity level of an activity log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    /// Informational message.
    Info,
    /// Successful operation.
    Success,
    /// Recoverable problem.
    Warning,
    /// Failure.
    Error,
    /// Message mirrored to Telegram.
    Telegram,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Success => write!(f, "SUCCESS"),
            Self::Warning => write!(f, "WARNING"),
            Self::Error => write!(f, "ERROR"),
            Self::Telegram => write!(f, "TELEGRAM"),
        }
    }
}

/// An activity log entry.
///
/// The stream keys the bot reference `botId` while the REST surface uses
/// `bot_id`; the alias accepts both. The timestamp is carried verbatim: the
/// backend emits zone-less ISO strings on the stream, so parsing it into a
/// typed datetime would reject otherwise valid entries.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityLog {
    /// Log entry ID.
    pub id: String,
    /// Severity level.
    pub level: LogLevel,
    /// Human-readable message.
    pub message: String,
    /// Bot this entry relates to, if any.
    #[serde(default, alias = "botId")]
    pub bot_id: Option<String>,
    /// Origination time, advisory only.
    #[serde(default)]
    pub timestamp: Option<String>,
}

/// Request body for creating a log entry.
#[derive(Debug, Clone, Serialize)]
pub struct NewActivityLog {
    /// Severity level.
    pub level: LogLevel,
    /// Human-readable message.
    pub message: String,
    /// Bot this entry relates to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bot_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_serde() {
        let json = serde_json::to_string(&LogLevel::Telegram).expect("serialize");
        assert_eq!(json, "\"TELEGRAM\"");
        let level: LogLevel = serde_json::from_str("\"SUCCESS\"").expect("deserialize");
        assert_eq!(level, LogLevel::Success);
    }

    #[test]
    fn test_log_accepts_stream_key() {
        let json = r#"{"id":"1","level":"INFO","message":"started","botId":"b1"}"#;
        let log: ActivityLog = serde_json::from_str(json).expect("deserialize");
        assert_eq!(log.bot_id, Some("b1".to_string()));
        assert!(log.timestamp.is_none());
    }

    #[test]
    fn test_log_accepts_rest_key() {
        let json = r#"{"id":"1","level":"ERROR","message":"fill failed","bot_id":"b2","timestamp":"2024-01-30T12:00:00"}"#;
        let log: ActivityLog = serde_json::from_str(json).expect("deserialize");
        assert_eq!(log.bot_id, Some("b2".to_string()));
        assert_eq!(log.timestamp.as_deref(), Some("2024-01-30T12:00:00"));
    }
}
