/// Frames exchanged on the realtime socket
///
/// Client to server: `{"message": "<text>"}`, answered with an echo.
///
/// Server to client:
///
/// ```json
/// {"message": "Echo: <text>"}
/// {"type": "task_update", "tasks": [{"id": 1, "title": "...", "category_id": null, "user_id": 3, ...}]}
/// ```

use serde::{Deserialize, Serialize};
use taskhub_shared::models::task::Task;

/// A frame sent by the client
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ClientMessage {
    pub message: String,
}

impl ClientMessage {
    /// Parses a text frame; anything without a string `message` is an error
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

/// Reply to a client message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoReply {
    pub message: String,
}

impl EchoReply {
    pub fn to(msg: &ClientMessage) -> Self {
        Self {
            message: format!("Echo: {}", msg.message),
        }
    }
}

/// Pushes initiated by the server
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerPush<'a> {
    /// Full task snapshot after any task changed
    TaskUpdate { tasks: &'a [Task] },
}
