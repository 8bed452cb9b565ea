//! Structured errors shared by the recorder, the storage layer and the CLI

use serde::{Deserialize, Serialize};

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Serialize, Deserialize, thiserror::Error)]
#[error("[{code:?}] {message}")]
pub struct Error {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// File missing, unreadable or unwritable
    IoFailure,
    /// A serialized event line could not be parsed
    ParseFailure,
    /// Stop/abort requested with no matching session running
    NoActiveSession,
    /// Start requested while another session is running
    SessionActive,
    /// Playback requested for a macro without events
    EmptyMacro,
    Config,
    Unknown,
}

impl Error {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            context: None,
        }
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = Some(context);
        self
    }

    pub fn io(path: &str, reason: impl std::fmt::Display) -> Self {
        Self::new(ErrorCode::IoFailure, format!("{}: {}", path, reason))
    }

    pub fn parse(line: &str, reason: &str) -> Self {
        Self::new(
            ErrorCode::ParseFailure,
            format!("Malformed event '{}': {}", line.trim_end(), reason),
        )
    }

    pub fn no_active_session(action: &str) -> Self {
        Self::new(
            ErrorCode::NoActiveSession,
            format!("Cannot {}: no matching session is active", action),
        )
    }

    pub fn session_active(action: &str) -> Self {
        Self::new(
            ErrorCode::SessionActive,
            format!("Cannot {}: another session is active", action),
        )
    }

    pub fn empty_macro() -> Self {
        Self::new(ErrorCode::EmptyMacro, "Macro has no events to play")
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Config, message)
    }

    /// Session state errors are expected during normal operation and carry no
    /// failure worth reporting.
    pub fn is_benign(&self) -> bool {
        self.code == ErrorCode::NoActiveSession
    }
}

impl From<anyhow::Error> for Error {
    fn from(e: anyhow::Error) -> Self {
        Self::new(ErrorCode::Unknown, e.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Self::new(ErrorCode::IoFailure, e.to_string())
    }
}
