use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Channel, Message};

/// Events pushed over the WebSocket gateway after a mutation commits.
/// Clients re-query whatever the event invalidates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayEvent {
    /// Server accepted the connection
    Ready,

    /// A new message was posted
    MessageCreate { message: Message },

    /// A reaction was toggled on
    ReactionAdd {
        message_id: Uuid,
        user_id: String,
        username: String,
        emoji: String,
    },

    /// A reaction was toggled off
    ReactionRemove {
        message_id: Uuid,
        user_id: String,
        emoji: String,
    },

    /// A channel was created
    ChannelCreate { channel: Channel },

    /// A channel was deleted; its messages were moved to the default channel
    ChannelDelete { id: Uuid, name: String },

    /// The online-user count changed
    PresenceUpdate { online: u64 },
}

impl GatewayEvent {
    /// Returns the channel name if this event is scoped to a single channel.
    /// Events that return `None` are global and go to every client.
    pub fn channel(&self) -> Option<&str> {
        match self {
            Self::MessageCreate { message } => Some(message.channel.as_str()),
            // Reaction, channel, and presence events are global
            _ => None,
        }
    }
}

/// Commands sent FROM client TO server over the WebSocket.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum GatewayCommand {
    /// Replace the set of channels this connection receives scoped events for.
    Subscribe { channels: Vec<String> },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Message;
    use chrono::Utc;

    fn message_in(channel: &str) -> Message {
        Message {
            id: Uuid::new_v4(),
            text: "hi".into(),
            author: "bob".into(),
            user_id: None,
            avatar_url: None,
            channel: channel.into(),
            reactions: vec![],
            file_url: None,
            file_name: None,
            file_type: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn message_create_is_channel_scoped() {
        let event = GatewayEvent::MessageCreate {
            message: message_in("random"),
        };
        assert_eq!(event.channel(), Some("random"));
    }

    #[test]
    fn presence_and_channel_events_are_global() {
        assert_eq!(GatewayEvent::PresenceUpdate { online: 3 }.channel(), None);
        assert_eq!(
            GatewayEvent::ChannelDelete {
                id: Uuid::new_v4(),
                name: "random".into()
            }
            .channel(),
            None
        );
    }
}
