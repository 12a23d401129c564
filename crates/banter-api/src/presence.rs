use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{Extension, Json};
use tracing::{debug, warn};
use uuid::Uuid;

use banter_types::api::{OnlineCountResponse, PresencePingRequest};
use banter_types::events::GatewayEvent;

use crate::auth::{AppState, CurrentIdentity};
use crate::error::ApiError;

/// A user counts as online for this long after their last ping.
/// Clients ping every 2 minutes, so one missed ping keeps them online.
pub const ONLINE_WINDOW_MS: i64 = 5 * 60 * 1000;

pub async fn update_presence(
    State(state): State<AppState>,
    Extension(CurrentIdentity(identity)): Extension<CurrentIdentity>,
    Json(req): Json<PresencePingRequest>,
) -> Result<StatusCode, ApiError> {
    let auth_id = identity
        .map(|i| i.subject)
        .unwrap_or_else(|| format!("temp_{}", req.username));

    let cutoff = crate::now_ms() - ONLINE_WINDOW_MS;
    let was_online = state
        .db
        .get_user_by_auth_id(&auth_id)?
        .map(|u| u.is_online && u.last_seen >= cutoff)
        .unwrap_or(false);

    state.db.upsert_presence(
        &Uuid::new_v4().to_string(),
        &auth_id,
        &req.username,
        req.avatar_url.as_deref(),
        crate::now_ms(),
    )?;

    // Only a transition to online changes the count
    if !was_online {
        let online = state.db.online_count(crate::now_ms() - ONLINE_WINDOW_MS)?;
        state
            .dispatcher
            .broadcast(GatewayEvent::PresenceUpdate { online });
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn online_count(
    State(state): State<AppState>,
) -> Result<Json<OnlineCountResponse>, ApiError> {
    let cutoff = crate::now_ms() - ONLINE_WINDOW_MS;
    Ok(Json(OnlineCountResponse {
        online: state.db.online_count(cutoff)?,
    }))
}

/// Background sweep: clears online flags that outlived the window so the
/// stored flag converges with the time-window derivation, and notifies
/// subscribers when the count actually changed.
pub async fn run_presence_sweep(state: AppState, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        let cutoff = crate::now_ms() - ONLINE_WINDOW_MS;
        match state.db.expire_stale_presence(cutoff) {
            Ok(0) => {}
            Ok(n) => {
                debug!("Presence sweep: {} users went stale", n);
                match state.db.online_count(cutoff) {
                    Ok(online) => state
                        .dispatcher
                        .broadcast(GatewayEvent::PresenceUpdate { online }),
                    Err(e) => warn!("Presence sweep count error: {}", e),
                }
            }
            Err(e) => warn!("Presence sweep error: {}", e),
        }
    }
}
