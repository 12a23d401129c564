use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A single emoji reaction on a message.
/// Invariant: at most one reaction per (user_id, emoji) pair per message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub emoji: String,
    pub user_id: String,
    pub username: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: Uuid,
    pub text: String,
    pub author: String,
    /// Identity-provider subject of the sender, if authenticated.
    pub user_id: Option<String>,
    pub avatar_url: Option<String>,
    pub channel: String,
    /// Insertion order — the order users reacted in.
    pub reactions: Vec<Reaction>,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

/// Presence record refreshed by the periodic client ping. Whether a user
/// counts as online is derived from `last_seen`, not from the stored flag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceUser {
    pub auth_id: String,
    pub username: String,
    pub avatar_url: Option<String>,
    pub last_seen: DateTime<Utc>,
    pub is_online: bool,
}
