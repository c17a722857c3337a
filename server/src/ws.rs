use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use tokio::sync::{mpsc, oneshot};
use tower_http::cors::CorsLayer;

use crate::config::ServerConfig;
use crate::game_loop::GameCommand;
use pocket_shared::protocol::{ClientMsg, ServerMsg};

/// Shared app state passed to each WebSocket handler
#[derive(Clone)]
pub struct AppState {
    pub game_tx: mpsc::Sender<GameCommand>,
    pub outbound_buffer: usize,
    pub max_message_bytes: usize,
    pub max_parse_errors: u32,
}

impl AppState {
    pub fn new(game_tx: mpsc::Sender<GameCommand>, config: &ServerConfig) -> Self {
        Self {
            game_tx,
            outbound_buffer: config.outbound_buffer,
            max_message_bytes: config.max_message_bytes,
            max_parse_errors: config.max_parse_errors,
        }
    }
}

/// The `/ws` route with permissive CORS
pub fn router(app_state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .layer(CorsLayer::permissive())
        .with_state(app_state)
}

/// HTTP handler for WebSocket upgrade
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(app_state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, app_state))
}

async fn handle_socket(socket: WebSocket, app_state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::channel::<ServerMsg>(app_state.outbound_buffer);

    // Join the game
    let (resp_tx, resp_rx) = oneshot::channel();
    if app_state
        .game_tx
        .send(GameCommand::PlayerJoin {
            outbound: outbound_tx,
            response: resp_tx,
        })
        .await
        .is_err()
    {
        tracing::error!("Failed to send PlayerJoin command");
        return;
    }

    let my_id = match resp_rx.await {
        Ok(id) => id,
        Err(_) => {
            tracing::error!("Failed to receive connection id");
            return;
        }
    };

    tracing::info!(connection = %my_id, "Client connected");

    let mut parse_errors: u32 = 0;

    loop {
        tokio::select! {
            // Client -> Server
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if text.len() > app_state.max_message_bytes {
                            tracing::warn!(connection = %my_id, bytes = text.len(), "Message too large, closing");
                            break;
                        }
                        match serde_json::from_str::<ClientMsg>(&text) {
                            Ok(client_msg) => {
                                let cmd = GameCommand::Client { id: my_id.clone(), msg: client_msg };
                                if app_state.game_tx.send(cmd).await.is_err() {
                                    break;
                                }
                            }
                            Err(e) => {
                                parse_errors += 1;
                                tracing::debug!(connection = %my_id, error = %e, "Unparseable message");
                                if parse_errors >= app_state.max_parse_errors {
                                    tracing::warn!(connection = %my_id, parse_errors, "Too many bad messages, closing");
                                    break;
                                }
                            }
                        }
                    }
                    Some(Ok(Message::Binary(data))) if data.len() > app_state.max_message_bytes => {
                        tracing::warn!(connection = %my_id, bytes = data.len(), "Message too large, closing");
                        break;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(connection = %my_id, error = %e, "WebSocket error");
                        break;
                    }
                    _ => {} // Ignore ping/pong/binary
                }
            }

            // Server -> Client
            outbound = outbound_rx.recv() => {
                let Some(server_msg) = outbound else {
                    break;
                };
                let json = match serde_json::to_string(&server_msg) {
                    Ok(json) => json,
                    Err(e) => {
                        tracing::warn!(connection = %my_id, error = %e, "Failed to serialize message");
                        continue;
                    }
                };
                if sink.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
        }
    }

    let _ = sink.close().await;

    // Cleanup on disconnect
    let _ = app_state
        .game_tx
        .send(GameCommand::PlayerLeave { id: my_id.clone() })
        .await;
    tracing::info!(connection = %my_id, "Client disconnected");
}
