pub mod admin;
pub mod auth;
pub mod channels;
pub mod error;
pub mod files;
pub mod messages;
pub mod presence;
pub mod reactions;
pub mod storage;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{delete, get, post, put};

use crate::auth::AppState;

pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// The full HTTP surface. Identity is attached (never required) on every
/// route; handlers that need authentication check for themselves.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/messages",
            get(messages::get_messages).post(messages::send_message),
        )
        .route("/messages/search", get(messages::search_messages))
        .route(
            "/messages/{message_id}/reactions",
            post(reactions::toggle_reaction),
        )
        .route(
            "/channels",
            get(channels::get_channels).post(channels::create_channel),
        )
        .route("/channels/{channel_id}", delete(channels::delete_channel))
        .route("/presence", post(presence::update_presence))
        .route("/presence/online-count", get(presence::online_count))
        .route("/admin/me", get(admin::admin_status))
        .route("/admin/clear-all", post(admin::clear_all))
        .route("/admin/clear-messages", post(admin::clear_messages))
        .route("/admin/clear-channels", post(admin::clear_channels))
        .route("/files/upload-url", post(files::generate_upload_url))
        .route("/files/{file_id}/url", get(files::get_file_url))
        .route(
            "/files/{file_id}",
            put(files::upload_file).get(files::download_file),
        )
        .layer(DefaultBodyLimit::max(files::MAX_FILE_SIZE + 1024))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::attach_identity,
        ))
        .with_state(state)
}
