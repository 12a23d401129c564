use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use tracing::{info, warn};
use uuid::Uuid;

use banter_db::models::ChannelRow;
use banter_types::DEFAULT_CHANNEL;
use banter_types::api::CreateChannelRequest;
use banter_types::events::GatewayEvent;
use banter_types::models::Channel;

use crate::auth::{AppState, CurrentIdentity};
use crate::error::ApiError;

/// Normalize a requested channel name: lowercase, keep only `[a-z0-9-]`.
fn sanitize_channel_name(raw: &str) -> String {
    raw.to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-')
        .collect()
}

pub async fn get_channels(State(state): State<AppState>) -> Result<Json<Vec<Channel>>, ApiError> {
    let rows = state.db.get_channels()?;
    Ok(Json(rows.into_iter().map(to_channel).collect()))
}

pub async fn create_channel(
    State(state): State<AppState>,
    Extension(CurrentIdentity(identity)): Extension<CurrentIdentity>,
    Json(req): Json<CreateChannelRequest>,
) -> Result<(StatusCode, Json<Channel>), ApiError> {
    let name = sanitize_channel_name(&req.name);
    if name.is_empty() {
        return Err(ApiError::Validation(
            "Channel name must contain letters, numbers, or hyphens.".into(),
        ));
    }

    if state.db.get_channel_by_name(&name)?.is_some() {
        return Err(ApiError::Conflict("Channel already exists".into()));
    }

    let created_by = identity
        .map(|i| i.subject)
        .unwrap_or_else(|| "anonymous".to_string());

    let row = ChannelRow {
        id: Uuid::new_v4().to_string(),
        name,
        description: req.description,
        created_by,
        created_at: crate::now_ms(),
    };
    state.db.insert_channel(&row)?;

    let channel = to_channel(row);
    state.dispatcher.broadcast(GatewayEvent::ChannelCreate {
        channel: channel.clone(),
    });

    Ok((StatusCode::CREATED, Json(channel)))
}

pub async fn delete_channel(
    State(state): State<AppState>,
    Path(channel_id): Path<Uuid>,
    Extension(CurrentIdentity(identity)): Extension<CurrentIdentity>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let Some(identity) = identity else {
        return Err(ApiError::Auth(
            "Must be authenticated to delete channels".into(),
        ));
    };
    if !state.admins.is_admin(Some(&identity)) {
        return Err(ApiError::Auth("Only an admin can delete channels".into()));
    }

    let id = channel_id.to_string();
    let Some(channel) = state.db.get_channel_by_id(&id)? else {
        return Err(ApiError::NotFound("Channel not found".into()));
    };
    if channel.name == DEFAULT_CHANNEL {
        return Err(ApiError::Validation(
            "The general channel cannot be deleted".into(),
        ));
    }

    let moved = state.db.delete_channel(&id, &channel.name)?;
    info!(
        "Deleted channel '{}', moved {} messages to {}",
        channel.name, moved, DEFAULT_CHANNEL
    );

    state.dispatcher.broadcast(GatewayEvent::ChannelDelete {
        id: channel_id,
        name: channel.name,
    });

    Ok(Json(serde_json::json!({ "moved_messages": moved })))
}

fn to_channel(row: ChannelRow) -> Channel {
    Channel {
        id: row.id.parse().unwrap_or_else(|e| {
            warn!("Corrupt channel id '{}': {}", row.id, e);
            Uuid::default()
        }),
        name: row.name,
        description: row.description,
        created_by: row.created_by,
        created_at: chrono::DateTime::from_timestamp_millis(row.created_at).unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::sanitize_channel_name;

    #[test]
    fn lowercases_and_strips() {
        assert_eq!(sanitize_channel_name("My Channel!"), "mychannel");
        assert_eq!(sanitize_channel_name("dev-talk"), "dev-talk");
        assert_eq!(sanitize_channel_name("Rust 2024"), "rust2024");
    }

    #[test]
    fn all_punctuation_collapses_to_empty() {
        assert_eq!(sanitize_channel_name("!!!"), "");
        assert_eq!(sanitize_channel_name("   "), "");
        assert_eq!(sanitize_channel_name("日本語"), "");
    }
}
