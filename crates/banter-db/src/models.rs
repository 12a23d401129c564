/// Database row types — these map directly to SQLite rows.
/// Distinct from the banter-types API models to keep the DB layer independent.

pub struct MessageRow {
    pub id: String,
    pub text: String,
    pub author: String,
    pub user_id: Option<String>,
    pub avatar_url: Option<String>,
    /// `None` is the legacy form of the default channel.
    pub channel: Option<String>,
    pub file_url: Option<String>,
    pub file_name: Option<String>,
    pub file_type: Option<String>,
    pub created_at: i64,
}

pub struct ReactionRow {
    pub message_id: String,
    pub user_id: String,
    pub username: String,
    pub emoji: String,
    pub created_at: i64,
}

pub struct ChannelRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub created_by: String,
    pub created_at: i64,
}

pub struct UserRow {
    pub id: String,
    pub auth_id: String,
    pub username: String,
    pub avatar_url: Option<String>,
    pub last_seen: i64,
    pub is_online: bool,
}

pub struct FileRow {
    pub id: String,
    pub owner_id: Option<String>,
    pub size: i64,
    pub created_at: i64,
}
