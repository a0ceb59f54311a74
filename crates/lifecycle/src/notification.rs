//! Single-slot user notification.
//!
//! Exactly one notification is live at a time; setting a new one
//! replaces the old. Nothing auto-dismisses: the next outcome or an
//! explicit dismiss clears it.

use assetdeck_protocol::TransportError;
use serde::Serialize;

/// Visual category of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Success,
    Error,
}

/// A message shown to the user, optionally with a status code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub kind: NotificationKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            kind: NotificationKind::Success,
            message: message.into(),
            code: None,
        }
    }

    pub fn error(message: impl Into<String>, code: Option<String>) -> Self {
        Self {
            kind: NotificationKind::Error,
            message: message.into(),
            code,
        }
    }

    /// Error notification carrying the server detail, or `fallback` when
    /// there is none. The code is always the transport status.
    pub fn from_transport(err: &TransportError, fallback: &str) -> Self {
        Self::error(
            err.detail().unwrap_or(fallback),
            Some(err.status().to_string()),
        )
    }

    pub fn is_error(&self) -> bool {
        self.kind == NotificationKind::Error
    }
}

/// Holder for the one live notification.
#[derive(Debug, Clone, Default)]
pub struct NotificationSlot {
    current: Option<Notification>,
}

impl NotificationSlot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the live notification, returning the previous one.
    pub fn set(&mut self, notification: Notification) -> Option<Notification> {
        self.current.replace(notification)
    }

    /// Clears the slot. Returns `true` if something was cleared.
    pub fn clear(&mut self) -> bool {
        self.current.take().is_some()
    }

    pub fn get(&self) -> Option<&Notification> {
        self.current.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }
}
