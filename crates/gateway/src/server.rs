use std::{net::SocketAddr, sync::Arc};

use {
    axum::{
        Router,
        extract::{
            ConnectInfo, State, WebSocketUpgrade, ws::rejection::WebSocketUpgradeRejection,
        },
        response::{IntoResponse, Json, Response},
        routing::get,
    },
    tokio::net::TcpListener,
    tokio_util::sync::CancellationToken,
    tower_http::cors::{Any, CorsLayer},
    tracing::info,
};

use crate::{
    error::{Error, Result},
    hub::RelayHub,
    ws::handle_connection,
};

// ── Shared app state ─────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct AppState {
    pub hub: Arc<RelayHub>,
    pub shutdown: CancellationToken,
}

/// Build the relay router: WebSocket upgrades on `/` and `/ws`, plus
/// `/health`. Overlays are served from anywhere, so CORS is open.
pub fn build_relay_app(hub: Arc<RelayHub>, shutdown: CancellationToken) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root_handler))
        .route("/ws", get(ws_upgrade_handler))
        .route("/health", get(health_handler))
        .layer(cors)
        .with_state(AppState { hub, shutdown })
}

/// Bind the relay listener. Failure here is fatal for the process.
pub async fn bind_relay(host: &str, port: u16) -> Result<TcpListener> {
    let addr = format!("{host}:{port}");
    TcpListener::bind(&addr)
        .await
        .map_err(|source| Error::Bind { addr, source })
}

/// Serve overlays on `listener` until `shutdown` fires.
pub async fn serve_relay(
    listener: TcpListener,
    hub: Arc<RelayHub>,
    shutdown: CancellationToken,
) -> Result<()> {
    let local = listener.local_addr().map_err(|source| Error::Bind {
        addr: "<unknown>".into(),
        source,
    })?;
    info!(addr = %local, "relay listening on ws://{local}");

    let app = build_relay_app(hub, shutdown.clone());
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { shutdown.cancelled().await })
    .await
    .map_err(|source| Error::Serve {
        addr: local,
        source,
    })?;

    info!(addr = %local, "relay stopped");
    Ok(())
}

/// Bind `host:port` and serve until `shutdown` fires.
pub async fn start_relay(
    host: &str,
    port: u16,
    hub: Arc<RelayHub>,
    shutdown: CancellationToken,
) -> Result<()> {
    let listener = bind_relay(host, port).await?;
    serve_relay(listener, hub, shutdown).await
}

// ── Handlers ─────────────────────────────────────────────────────────────────

async fn health_handler(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "clients": state.hub.client_count().await,
        "history": state.hub.history_len().await,
    }))
}

async fn ws_upgrade_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_connection(socket, state.hub, addr, state.shutdown))
}

/// Overlays connect to the bare host, so `/` upgrades too. Plain HTTP gets
/// a short hint.
async fn root_handler(
    ws: std::result::Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(state): State<AppState>,
) -> Response {
    match ws {
        Ok(ws) => ws
            .on_upgrade(move |socket| handle_connection(socket, state.hub, addr, state.shutdown))
            .into_response(),
        Err(_) => "chatcast relay: connect with a WebSocket client\n".into_response(),
    }
}
