use serde::{Deserialize, Serialize};

/// Events sent from the server over the realtime channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ServerEvent {
    /// Join/leave notices
    System { msg: String },

    /// A chat line that has already been persisted
    Chat { user: String, msg: String },

    /// Delivered only to the connection that caused it
    Error { msg: String },
}

impl ServerEvent {
    pub fn joined(username: &str) -> Self {
        Self::System {
            msg: format!("{username} joined the chat."),
        }
    }

    pub fn left(username: &str) -> Self {
        Self::System {
            msg: format!("{username} left the chat."),
        }
    }
}

/// Commands sent FROM client TO server over the realtime channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum ClientCommand {
    Message {
        #[serde(default)]
        msg: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_event_wire_shape() {
        let event = ServerEvent::Chat {
            user: "alice".into(),
            msg: "hi".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(
            json,
            serde_json::json!({ "type": "chat", "data": { "user": "alice", "msg": "hi" } })
        );
    }

    #[test]
    fn message_command_without_msg_defaults_to_empty() {
        let cmd: ClientCommand =
            serde_json::from_str(r#"{"type":"message","data":{}}"#).unwrap();
        let ClientCommand::Message { msg } = cmd;
        assert!(msg.is_empty());
    }

    #[test]
    fn join_and_leave_notices() {
        assert_eq!(
            ServerEvent::joined("bob"),
            ServerEvent::System { msg: "bob joined the chat.".into() }
        );
        assert_eq!(
            ServerEvent::left("bob"),
            ServerEvent::System { msg: "bob left the chat.".into() }
        );
    }
}
