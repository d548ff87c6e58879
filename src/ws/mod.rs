pub mod handlers;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use std::sync::Arc;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::room::ConnectionHandle;
use crate::state::AppState;

use handlers::Session;

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let (conn, mut outbound) = ConnectionHandle::channel(state.config.connection_buffer);
    tracing::info!("WebSocket connected: {}", conn.id);

    // Held until the join succeeds; afterwards only the room keeps a sender, so
    // the outbound channel ends when the room lets go of this connection.
    let mut pending = Some(conn);
    let mut session: Option<Session> = None;

    loop {
        tokio::select! {
            out_msg = outbound.recv() => {
                let Some(msg) = out_msg else {
                    tracing::info!("Connection replaced, closing socket");
                    break;
                };
                if send_json(&mut sender, &msg).await.is_err() {
                    break;
                }
            }

            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!("Received message: {}", text);

                        let client_msg = match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(msg) => msg,
                            Err(e) => {
                                tracing::warn!("Failed to parse client message: {}", e);
                                let error = ServerMessage::Error {
                                    code: "PARSE_ERROR".to_string(),
                                    message: format!("Invalid message format: {}", e),
                                };
                                let _ = send_json(&mut sender, &error).await;
                                continue;
                            }
                        };

                        let response = if let Some(session) = &session {
                            handlers::handle_message(client_msg, session).await
                        } else if let Some(conn) = pending.take() {
                            match handlers::handle_join(client_msg, &state, &conn).await {
                                Ok(joined) => {
                                    session = Some(joined);
                                    None
                                }
                                Err(e) => {
                                    tracing::info!("Join rejected: {}", e);
                                    pending = Some(conn);
                                    Some(ServerMessage::error(&e))
                                }
                            }
                        } else {
                            break;
                        };

                        if let Some(response) = response {
                            if send_json(&mut sender, &response).await.is_err() {
                                tracing::error!("Failed to send response");
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    if let Some(session) = session {
        handlers::handle_leave(&session).await;
        tracing::info!(
            observer = session.is_observer(),
            "WebSocket connection {} closed (room {}, nick {:?})",
            session.conn_id,
            session.room.id,
            session.nick
        );
    }
}

async fn send_json<S>(sender: &mut S, msg: &ServerMessage) -> Result<(), axum::Error>
where
    S: futures::Sink<Message, Error = axum::Error> + Unpin,
{
    match serde_json::to_string(msg) {
        Ok(json) => sender.send(Message::Text(json.into())).await,
        Err(e) => {
            tracing::error!("Failed to serialize {:?}: {}", msg, e);
            Ok(())
        }
    }
}
