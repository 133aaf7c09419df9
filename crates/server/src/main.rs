use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Router,
};
use futures::{SinkExt, StreamExt};
use server_api::ApiContext;
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{ClientRequest, ServerEvent},
};
use storage::Storage;
use table::Table;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};
use tracing_subscriber::EnvFilter;

mod app_state;
mod config;
mod roster;

use app_state::AppState;
use config::{load_settings, prepare_database_url};
use roster::{ConnectionId, Target};

const EVENT_BUFFER: usize = 256;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = load_settings();
    let table_settings = settings.table_settings()?;
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;

    let table = match settings.shuffle_seed {
        Some(seed) => Table::with_seed(table_settings, seed),
        None => Table::new(table_settings),
    };
    info!(
        table = %settings.table_number,
        mode = %settings.game_mode,
        min_bet = settings.min_bet,
        max_bet = settings.max_bet,
        "table opened"
    );

    let api = ApiContext::new(table, Arc::new(storage));
    let state = AppState::new(api, EVENT_BUFFER);
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/ws", get(ws_handler))
        .with_state(state)
}

async fn healthz(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.api.store().health_check().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(err) => {
            warn!(error = %err, "health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "result store unavailable")
        }
    }
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_connection(state, socket))
}

async fn ws_connection(state: Arc<AppState>, socket: WebSocket) {
    let conn = ConnectionId::new();
    state.roster.join(conn);
    info!(%conn, connections = state.roster.len(), "client connected");

    let (mut sender, mut receiver) = socket.split();
    let mut events_rx = state.events.subscribe();

    let roster = state.roster.clone();
    let send_task = tokio::spawn(async move {
        loop {
            let outbound = match events_rx.recv().await {
                Ok(outbound) => outbound,
                Err(RecvError::Lagged(skipped)) => {
                    warn!(%conn, skipped, "client fell behind; events dropped");
                    continue;
                }
                Err(RecvError::Closed) => break,
            };
            if !roster.accepts(conn, &outbound.target) {
                continue;
            }
            let text = match serde_json::to_string(outbound.event.as_ref()) {
                Ok(v) => v,
                Err(err) => {
                    error!(error = %err, "failed to encode server event");
                    continue;
                }
            };
            if sender.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
    });

    state
        .api
        .publish_game_state(|dispatch| state.publish_dispatch(conn, dispatch))
        .await;

    while let Some(Ok(msg)) = receiver.next().await {
        match msg {
            Message::Text(text) => handle_text(&state, conn, &text).await,
            Message::Close(_) => break,
            _ => {}
        }
    }

    send_task.abort();
    state.roster.leave(conn);
    info!(%conn, connections = state.roster.len(), "client disconnected");
}

/// Decodes one inbound frame, updates the roster for registrations and publishes the outcome.
async fn handle_text(state: &AppState, conn: ConnectionId, text: &str) {
    let request = match serde_json::from_str::<ClientRequest>(text) {
        Ok(request) => request,
        Err(err) => {
            debug!(%conn, error = %err, "malformed request");
            state.publish(
                Target::Dealers,
                ServerEvent::Error(ApiError::new(
                    ErrorCode::Validation,
                    format!("malformed request: {err}"),
                )),
            );
            return;
        }
    };

    match &request {
        ClientRequest::RegisterDealer => {
            state.roster.register_dealer(conn);
            info!(%conn, dealers = state.roster.dealer_count(), "dealer registered");
        }
        ClientRequest::RegisterPlayer { player_id } => {
            state.roster.register_player(conn, player_id.clone());
            info!(%conn, player = %player_id, "player registered");
        }
        _ => {}
    }

    state
        .api
        .dispatch_request(request, |dispatch| state.publish_dispatch(conn, dispatch))
        .await;
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
