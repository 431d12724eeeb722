//! The tagged payload exchanged once a chat is open.
//!
//! Wire shape: `{ "type": "msg", "content": "<text>" }`. Payloads with any
//! other `type`, or that do not parse at all, decode to `None` and are
//! dropped by the caller.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Envelope {
    Msg { content: String },
    #[serde(other)]
    Unknown,
}

impl Envelope {
    pub fn msg(content: impl Into<String>) -> Self {
        Self::Msg {
            content: content.into(),
        }
    }

    /// Extract the chat text from a received payload, if it is a message.
    pub fn text_of(payload: &Value) -> Option<String> {
        match Envelope::deserialize(payload) {
            Ok(Envelope::Msg { content }) => Some(content),
            _ => None,
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
