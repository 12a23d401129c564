use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use banter_api::auth::{AdminRoster, AppState, AppStateInner};
use banter_api::presence;
use banter_api::storage::FileStore;
use banter_gateway::connection;
use banter_gateway::Dispatcher;

/// Seconds between presence sweep passes.
const PRESENCE_SWEEP_SECS: u64 = 60;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "banter=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let jwt_secret =
        std::env::var("BANTER_JWT_SECRET").unwrap_or_else(|_| "dev-secret-change-me".into());
    let db_path = std::env::var("BANTER_DB_PATH").unwrap_or_else(|_| "banter.db".into());
    let host = std::env::var("BANTER_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("BANTER_PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()?;
    let upload_dir = std::env::var("BANTER_UPLOAD_DIR").unwrap_or_else(|_| "./uploads".into());
    let public_base_url = std::env::var("BANTER_PUBLIC_BASE_URL")
        .unwrap_or_else(|_| format!("http://localhost:{}", port));
    let admin_ids = std::env::var("BANTER_ADMIN_IDS").unwrap_or_default();
    let admin_emails = std::env::var("BANTER_ADMIN_EMAILS").unwrap_or_default();

    // Init database and file store
    let db = banter_db::Database::open(&PathBuf::from(&db_path))?;
    let files = FileStore::new(PathBuf::from(&upload_dir)).await?;

    // Shared state
    let dispatcher = Dispatcher::new();
    let state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret,
        dispatcher: dispatcher.clone(),
        admins: AdminRoster::from_lists(&admin_ids, &admin_emails),
        files,
        public_base_url,
    });

    // Background presence sweep
    tokio::spawn(presence::run_presence_sweep(
        state.clone(),
        PRESENCE_SWEEP_SECS,
    ));

    // Routes
    let ws_route = Router::new()
        .route("/gateway", get(ws_upgrade))
        .with_state(dispatcher);

    let app = Router::new()
        .merge(banter_api::router(state))
        .merge(ws_route)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("Banter server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ws_upgrade(
    State(dispatcher): State<Dispatcher>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| connection::handle_connection(socket, dispatcher))
}
