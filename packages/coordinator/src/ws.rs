use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use shared::models::events::ServerEvent;

use crate::connections::ConnectionHandle;
use crate::handlers::{dispatch, ConnectionContext};
use crate::protocol;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(ws_upgrade))
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "online": state.registry.online_count(),
    }))
}

#[derive(Deserialize)]
struct WsQuery {
    token: String,
}

/// Identity is settled here or not at all: a bad token never upgrades.
async fn ws_upgrade(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    match state.authenticator.verify(&query.token) {
        Ok(player_id) => ws.on_upgrade(move |socket| run_connection(socket, state, player_id)),
        Err(err) => {
            warn!("Rejected WebSocket handshake: {}", err);
            StatusCode::UNAUTHORIZED.into_response()
        }
    }
}

/// One task pair per connection: this reader loop plus a writer task that
/// drains the mpsc channel every other part of the system sends through.
async fn run_connection(socket: WebSocket, state: AppState, player_id: String) {
    let connection_id = Uuid::new_v4().to_string();
    let (ws_sender, mut ws_receiver) = socket.split();
    let (tx, rx) = mpsc::unbounded_channel::<Message>();

    state.registry.register(
        &player_id,
        ConnectionHandle {
            connection_id: connection_id.clone(),
            sender: tx,
        },
    );
    info!("Player {} connected on {}", player_id, connection_id);

    let writer = tokio::spawn(writer_task(ws_sender, rx));

    while let Some(Ok(message)) = ws_receiver.next().await {
        match message {
            Message::Text(text) => match protocol::decode(&text) {
                Ok(command) => {
                    let ctx = ConnectionContext {
                        player_id: player_id.clone(),
                        connection_id: connection_id.clone(),
                    };
                    // Each inbound event gets its own short-lived task so a
                    // slow storage round-trip never blocks the read loop.
                    let state = state.clone();
                    tokio::spawn(async move {
                        dispatch(&state, &ctx, command).await;
                    });
                }
                Err(err) => {
                    warn!("Undecodable message from {}: {}", player_id, err);
                    state
                        .notifier
                        .send_to_player(&player_id, &ServerEvent::error("Invalid message format"))
                        .await;
                }
            },
            Message::Close(_) => break,
            _ => {}
        }
    }

    // A drop only clears the queue entry and the registry mapping. An
    // in-progress session stays untouched so the player can rejoin.
    state.queue.leave(&connection_id);
    state.registry.unregister(&player_id, &connection_id);
    writer.abort();
    info!("Player {} disconnected from {}", player_id, connection_id);
}

async fn writer_task(
    mut sender: SplitSink<WebSocket, Message>,
    mut rx: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(message) = rx.recv().await {
        if sender.send(message).await.is_err() {
            break;
        }
    }
}
