//! User-facing notifications.
//!
//! Sessions and the orchestration layer report conditions the user must see
//! (state reset after reconnect, a failed autosave) through a callback
//! injected at construction time, so the core stays independent of any
//! particular UI surface.

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Warning,
    Error,
}

/// A message destined for the user, not for a log file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

/// Callback type for delivering notices to whatever front end is attached.
pub type NoticeSink = Arc<dyn Fn(Notice) + Send + Sync>;

/// A sink that drops every notice. Useful in tests and headless tools.
pub fn null_sink() -> NoticeSink {
    Arc::new(|_| {})
}
