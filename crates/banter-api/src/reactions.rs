use axum::extract::{Path, State};
use axum::{Extension, Json};
use uuid::Uuid;

use banter_types::api::{ToggleReactionRequest, ToggleReactionResponse};
use banter_types::events::GatewayEvent;

use crate::auth::{AppState, CurrentIdentity};
use crate::error::ApiError;

pub async fn toggle_reaction(
    State(state): State<AppState>,
    Path(message_id): Path<Uuid>,
    Extension(CurrentIdentity(identity)): Extension<CurrentIdentity>,
    Json(req): Json<ToggleReactionRequest>,
) -> Result<Json<ToggleReactionResponse>, ApiError> {
    // Anonymous users still get a stable id derived from their name
    let user_id = identity
        .map(|i| i.subject)
        .unwrap_or_else(|| format!("temp_{}", req.username));

    let mid = message_id.to_string();
    if !state.db.message_exists(&mid)? {
        return Err(ApiError::NotFound("Message not found".into()));
    }

    let added = state
        .db
        .toggle_reaction(&mid, &user_id, &req.username, &req.emoji, crate::now_ms())?;

    if added {
        state.dispatcher.broadcast(GatewayEvent::ReactionAdd {
            message_id,
            user_id,
            username: req.username,
            emoji: req.emoji,
        });
    } else {
        state.dispatcher.broadcast(GatewayEvent::ReactionRemove {
            message_id,
            user_id,
            emoji: req.emoji,
        });
    }

    Ok(Json(ToggleReactionResponse { added }))
}
