use serde::{Deserialize, Serialize};

/// Events sent over the WebSocket gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum GatewayEvent {
    /// A direct message pushed to its recipient's live connection
    ReceiveMsg { message: serde_json::Value },
}

/// Commands sent FROM client TO server over WebSocket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "camelCase")]
pub enum GatewayCommand {
    /// Bind this connection to a user id
    AddUser {
        #[serde(rename = "userId")]
        user_id: String,
    },

    /// Deliver `message` to `sent_to` if that user is connected
    SendMsg {
        #[serde(rename = "sentTo")]
        sent_to: String,
        message: serde_json::Value,
    },
}
