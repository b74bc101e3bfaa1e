//! Wire format of the `/ws` endpoint.
//!
//! Every frame is a JSON text frame shaped `{"type": ..., "payload": {...}}`,
//! optionally carrying the client's `request_id` back on replies.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use water_tracker_domain::entities::realtime::RealtimeEvent;

pub const AUTHENTICATE: &str = "authenticate";
pub const SUBSCRIBE: &str = "subscribe";
pub const UNSUBSCRIBE: &str = "unsubscribe";
pub const SEND_MESSAGE: &str = "send_message";

/// Close code sent after a failed authentication
pub const CLOSE_AUTH_FAILED: u16 = 4001;

/// Frame sent by a client
#[derive(Debug, Clone, Deserialize)]
pub struct ClientMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    #[serde(default)]
    pub payload: Value,
    pub request_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthenticatePayload {
    pub token: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionPayload {
    pub channel: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ChatPayload {
    pub room_id: String,
    pub text: String,
}

/// Protocol replies that are not domain events
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum ServerMessage {
    SystemMessage {
        message: String,
    },
    AuthenticationStatus {
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        user_id: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    SubscriptionStatus {
        channel: String,
        success: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    Error {
        message: String,
        level: String,
    },
}

impl ServerMessage {
    pub fn error(message: impl Into<String>) -> Self {
        ServerMessage::Error { message: message.into(), level: "error".to_string() }
    }

    pub fn system(message: impl Into<String>) -> Self {
        ServerMessage::SystemMessage { message: message.into() }
    }

    /// Serialized frame, echoing the request id when there is one
    pub fn to_text(&self, request_id: Option<&str>) -> String {
        envelope(serde_json::to_value(self), request_id)
    }
}

/// Serialized frame for a domain event
pub fn event_text(event: &RealtimeEvent) -> String {
    envelope(serde_json::to_value(event), None)
}

fn envelope(value: Result<Value, serde_json::Error>, request_id: Option<&str>) -> String {
    match value {
        Ok(mut value) => {
            if let (Some(id), Some(object)) = (request_id, value.as_object_mut()) {
                object.insert("request_id".to_string(), Value::String(id.to_string()));
            }
            value.to_string()
        }
        Err(e) => {
            tracing::error!("Failed to serialize WebSocket frame: {}", e);
            r#"{"type":"error","payload":{"message":"Internal error.","level":"error"}}"#.to_string()
        }
    }
}
