//! Response Envelope
//!
//! Every API route answers with the same JSON shape:
//! `{error?, data?, status?, message?}`. `error` is only present on failure,
//! `data` only on success, `status`/`message` for plain acknowledgements.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    /// Success carrying a payload
    pub fn data(data: T) -> Self {
        Self {
            error: None,
            data: Some(data),
            status: None,
            message: None,
        }
    }

    /// Success carrying a payload and `status: "ok"`
    pub fn ok_with(data: T) -> Self {
        Self {
            status: Some("ok".to_string()),
            ..Self::data(data)
        }
    }
}

impl Envelope<()> {
    /// Failure
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            error: Some(message.into()),
            data: None,
            status: None,
            message: None,
        }
    }

    /// Acknowledgement without payload
    pub fn ack(message: impl Into<String>) -> Self {
        Self {
            error: None,
            data: None,
            status: Some("ok".to_string()),
            message: Some(message.into()),
        }
    }
}
