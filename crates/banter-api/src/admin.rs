use axum::extract::State;
use axum::{Extension, Json};
use tracing::warn;

use banter_types::api::{AdminStatusResponse, ClearResponse};

use crate::auth::{AppState, CurrentIdentity};
use crate::error::ApiError;

/// GET /admin/me — whether the current identity is on the admin roster.
pub async fn admin_status(
    State(state): State<AppState>,
    Extension(CurrentIdentity(identity)): Extension<CurrentIdentity>,
) -> Json<AdminStatusResponse> {
    Json(AdminStatusResponse {
        is_admin: state.admins.is_admin(identity.as_ref()),
    })
}

// The clear operations below wipe whole collections with no auth gate.
// They exist for development and test resets only — never expose them on a
// production deployment.

pub async fn clear_all(State(state): State<AppState>) -> Result<Json<ClearResponse>, ApiError> {
    warn!("Clearing ALL data");
    let messages = state.db.clear_messages()?;
    let channels = state.db.clear_channels()?;
    let users = state.db.clear_users()?;
    warn!(
        "Cleared {} messages, {} channels, {} users",
        messages, channels, users
    );
    Ok(Json(ClearResponse {
        messages,
        channels,
        users,
    }))
}

pub async fn clear_messages(
    State(state): State<AppState>,
) -> Result<Json<ClearResponse>, ApiError> {
    let messages = state.db.clear_messages()?;
    warn!("Cleared {} messages", messages);
    Ok(Json(ClearResponse {
        messages,
        ..Default::default()
    }))
}

pub async fn clear_channels(
    State(state): State<AppState>,
) -> Result<Json<ClearResponse>, ApiError> {
    let channels = state.db.clear_channels()?;
    warn!("Cleared {} channels", channels);
    Ok(Json(ClearResponse {
        channels,
        ..Default::default()
    }))
}
