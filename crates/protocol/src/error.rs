//! Closed failure taxonomy for remote calls.

use serde::{Deserialize, Deserializer};

/// Failure of a single remote operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// No response was received.
    #[error("network error: {0}")]
    Network(String),

    /// Non-2xx response carrying a structured `{detail, status}` body.
    #[error("request rejected ({status}): {detail}")]
    Rejection { status: u16, detail: String },

    /// Non-2xx response without a readable error body.
    #[error("request failed with status {status}")]
    Unstructured { status: u16 },

    /// 2xx response whose body could not be decoded.
    #[error("malformed response ({status}): {reason}")]
    Malformed { status: u16, reason: String },

    /// The request could not be built locally; nothing was sent.
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl TransportError {
    /// Status code to surface; `0` when no response was received.
    pub fn status(&self) -> u16 {
        match self {
            Self::Network(_) | Self::InvalidRequest(_) => 0,
            Self::Rejection { status, .. }
            | Self::Unstructured { status }
            | Self::Malformed { status, .. } => *status,
        }
    }

    /// Server-provided (or network) detail, if any.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Network(_) => Some("network error"),
            Self::Rejection { detail, .. } => Some(detail),
            Self::Unstructured { .. } | Self::Malformed { .. } | Self::InvalidRequest(_) => None,
        }
    }

    /// Classifies a non-2xx response by its body.
    pub fn from_response(http_status: u16, body: &[u8]) -> Self {
        match serde_json::from_slice::<ErrorBody>(body) {
            Ok(ErrorBody {
                detail: Some(detail),
                status,
            }) if !detail.is_empty() => Self::Rejection {
                status: status.unwrap_or(http_status),
                detail,
            },
            _ => Self::Unstructured {
                status: http_status,
            },
        }
    }
}

/// Error body schema accepted from the service.
///
/// `status` may arrive as a number or a numeric string.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub detail: Option<String>,
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: Option<u16>,
}

fn lenient_status<'de, D>(deserializer: D) -> Result<Option<u16>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(u16),
        Text(String),
    }

    Ok(match Option::<Repr>::deserialize(deserializer)? {
        Some(Repr::Number(n)) => Some(n),
        Some(Repr::Text(s)) => s.trim().parse().ok(),
        None => None,
    })
}
