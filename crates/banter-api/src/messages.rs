use std::collections::HashMap;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;
use tracing::warn;
use uuid::Uuid;

use banter_db::models::MessageRow;
use banter_types::DEFAULT_CHANNEL;
use banter_types::api::SendMessageRequest;
use banter_types::events::GatewayEvent;
use banter_types::models::{Message, Reaction};

use crate::auth::{AppState, CurrentIdentity};
use crate::error::ApiError;

/// Most recent messages returned per channel.
const MESSAGE_WINDOW: u32 = 100;
/// Hard cap on message text, in characters.
const MAX_MESSAGE_CHARS: usize = 2000;
/// Queries shorter than this return nothing without touching the index.
const MIN_SEARCH_CHARS: usize = 2;
/// Maximum search hits returned.
const SEARCH_LIMIT: u32 = 50;

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    pub channel: Option<String>,
}

pub async fn get_messages(
    State(state): State<AppState>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let channel = query.channel.unwrap_or_else(|| DEFAULT_CHANNEL.to_string());

    let mut rows = state.db.get_messages(&channel, MESSAGE_WINDOW)?;
    // Newest-first from the store, oldest-first for display
    rows.reverse();

    Ok(Json(attach_reactions(&state, rows)?))
}

pub async fn send_message(
    State(state): State<AppState>,
    Extension(CurrentIdentity(identity)): Extension<CurrentIdentity>,
    Json(req): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    // File-only messages may have empty text
    if req.file_id.is_none() && req.text.trim().is_empty() {
        return Err(ApiError::Validation("Message cannot be empty.".into()));
    }
    if req.text.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ApiError::Validation(
            "Message too long. Maximum 2000 characters.".into(),
        ));
    }

    let channel = req.channel.unwrap_or_else(|| DEFAULT_CHANNEL.to_string());
    let user_id = identity.map(|i| i.subject);

    // Resolve the attachment to a durable URL. An unknown id is dropped,
    // not fatal — the message still goes out.
    let file_url = match &req.file_id {
        Some(file_id) => match state.db.get_file(file_id)? {
            Some(file) => Some(crate::files::file_url(&state, &file.id)),
            None => {
                warn!("Unknown file id '{}', sending without attachment", file_id);
                None
            }
        },
        None => None,
    };

    let row = MessageRow {
        id: Uuid::new_v4().to_string(),
        text: req.text.trim().to_string(),
        author: req.author,
        user_id,
        avatar_url: req.avatar_url,
        channel: Some(channel),
        file_url,
        file_name: req.file_name,
        file_type: req.file_type,
        created_at: crate::now_ms(),
    };
    state.db.insert_message(&row)?;

    let message = to_message(row, vec![]);
    state.dispatcher.broadcast(GatewayEvent::MessageCreate {
        message: message.clone(),
    });

    Ok((StatusCode::CREATED, Json(message)))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
    pub channel: Option<String>,
}

pub async fn search_messages(
    State(state): State<AppState>,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<Message>>, ApiError> {
    if query.q.chars().count() < MIN_SEARCH_CHARS {
        return Ok(Json(vec![]));
    }

    let channel = query.channel.unwrap_or_else(|| DEFAULT_CHANNEL.to_string());
    let rows = state.db.search_messages(&query.q, &channel, SEARCH_LIMIT)?;

    Ok(Json(attach_reactions(&state, rows)?))
}

/// Batch-attach reactions to a page of message rows.
pub(crate) fn attach_reactions(
    state: &AppState,
    rows: Vec<MessageRow>,
) -> Result<Vec<Message>, ApiError> {
    let ids: Vec<String> = rows.iter().map(|r| r.id.clone()).collect();
    let reaction_rows = state.db.get_reactions_for_messages(&ids)?;

    let mut by_message: HashMap<String, Vec<Reaction>> = HashMap::new();
    for r in reaction_rows {
        by_message.entry(r.message_id).or_default().push(Reaction {
            emoji: r.emoji,
            user_id: r.user_id,
            username: r.username,
        });
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let reactions = by_message.remove(&row.id).unwrap_or_default();
            to_message(row, reactions)
        })
        .collect())
}

pub(crate) fn to_message(row: MessageRow, reactions: Vec<Reaction>) -> Message {
    Message {
        id: row.id.parse().unwrap_or_else(|e| {
            warn!("Corrupt message id '{}': {}", row.id, e);
            Uuid::default()
        }),
        text: row.text,
        author: row.author,
        user_id: row.user_id,
        avatar_url: row.avatar_url,
        channel: row.channel.unwrap_or_else(|| DEFAULT_CHANNEL.to_string()),
        reactions,
        file_url: row.file_url,
        file_name: row.file_name,
        file_type: row.file_type,
        created_at: chrono::DateTime::from_timestamp_millis(row.created_at).unwrap_or_default(),
    }
}
