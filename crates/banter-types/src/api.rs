use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SendMessageRequest {
    pub text: String,
    pub author: String,
    pub channel: Option<String>,
    pub avatar_url: Option<String>,
    pub file_id: Option<String>,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
}

// -- Reactions --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ToggleReactionRequest {
    pub emoji: String,
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct ToggleReactionResponse {
    pub added: bool,
}

// -- Channels --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateChannelRequest {
    pub name: String,
    pub description: Option<String>,
}

// -- Presence --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PresencePingRequest {
    pub username: String,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct OnlineCountResponse {
    pub online: u64,
}

// -- Admin --

#[derive(Debug, Serialize, Deserialize)]
pub struct AdminStatusResponse {
    pub is_admin: bool,
}

/// Per-collection counts deleted by a bulk clear.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct ClearResponse {
    pub messages: u64,
    pub channels: u64,
    pub users: u64,
}

// -- Files --

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadUrlResponse {
    pub file_id: Uuid,
    pub upload_url: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub file_id: Uuid,
    pub size: u64,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FileUrlResponse {
    pub url: Option<String>,
}
