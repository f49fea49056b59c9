//! Real-time chat WebSocket (spec §4.5): authenticates before accept, then
//! routes `ping`/`chat_message` frames, evicting any prior connection for
//! the same user. Modeled on the teacher's split-sender/spawn-tasks
//! `WebSocketHandler` shape, simplified to the chat grammar this spec
//! defines (no audio frames).

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use futures::{SinkExt, StreamExt};
use ragcore_conversation::PipelineOutcome;
use ragcore_pipeline::PipelineRunConfig;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::auth::authenticate;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct WsAuthQuery {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum IncomingMessage {
    Ping { timestamp: Option<i64> },
    ChatMessage { session_id: Uuid, content: String },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutgoingMessage {
    Pong { timestamp: i64 },
    Processing,
    AiResponse {
        session_id: Uuid,
        message_id: Uuid,
        content: String,
        sources: Vec<ragcore_core::Citation>,
        token_count: u32,
        timestamp: i64,
    },
    Error {
        message: String,
    },
}

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>, Query(auth): Query<WsAuthQuery>) -> Response {
    let secret = state.settings.server.jwt_secret.clone();
    match authenticate(&secret, auth.token.as_deref()) {
        Ok(user_id) => ws.on_upgrade(move |socket| handle_socket(socket, state, user_id)),
        Err(_) => axum::http::StatusCode::UNAUTHORIZED.into_response(),
    }
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: Uuid) {
    let (mut sender_side, mut receiver) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    // Evict any prior connection for this user (spec §4.5: one socket per user).
    if let Some((_, previous)) = state.ws_connections.remove(&user_id) {
        let _ = previous.send(Message::Close(None));
    }
    state.ws_connections.insert(user_id, tx.clone());

    let forward_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sender_side.send(msg).await.is_err() {
                break;
            }
        }
    });

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                handle_text_frame(&state, user_id, &text, &tx).await;
            }
            Ok(Message::Close(_)) => break,
            Ok(Message::Ping(data)) => {
                let _ = tx.send(Message::Pong(data));
            }
            Ok(_) => {}
            Err(err) => {
                tracing::warn!(error = %err, "websocket transport error");
                break;
            }
        }
    }

    state.ws_connections.remove(&user_id);
    forward_task.abort();
}

async fn handle_text_frame(state: &AppState, user_id: Uuid, text: &str, tx: &mpsc::UnboundedSender<Message>) {
    let parsed: Result<IncomingMessage, _> = serde_json::from_str(text);
    let incoming = match parsed {
        Ok(incoming) => incoming,
        Err(err) => {
            let _ = send_json(tx, &OutgoingMessage::Error { message: format!("malformed message: {err}") });
            return;
        }
    };

    match incoming {
        IncomingMessage::Ping { .. } => {
            let _ = send_json(tx, &OutgoingMessage::Pong { timestamp: Utc::now().timestamp_millis() });
        }
        IncomingMessage::ChatMessage { session_id, content } => {
            let _ = send_json(tx, &OutgoingMessage::Processing);

            let Some(conversation) = state.conversation.clone() else {
                let _ = send_json(tx, &OutgoingMessage::Error { message: "persistence is not configured".into() });
                return;
            };
            let Some(sessions) = state.sessions.clone() else {
                let _ = send_json(tx, &OutgoingMessage::Error { message: "persistence is not configured".into() });
                return;
            };

            use ragcore_conversation::SessionStore;
            let collection_id = match sessions.get(session_id).await {
                Ok(Some(session)) if session.user_id == user_id => session.collection_id,
                Ok(Some(_)) | Ok(None) => {
                    let _ = send_json(tx, &OutgoingMessage::Error { message: format!("session {session_id} not found") });
                    return;
                }
                Err(err) => {
                    let _ = send_json(tx, &OutgoingMessage::Error { message: err.to_string() });
                    return;
                }
            };

            let orchestrator = state.orchestrator.clone();
            let state_for_warning = state.clone();
            let tracker = state.token_tracker.clone();
            let context_limit = state.settings.tokens.default_context_window;

            let result = conversation
                .handle_turn(session_id, content, move |augmented_query| async move {
                    let request_id = Uuid::new_v4().to_string();
                    let ctx = orchestrator.run(request_id, augmented_query, user_id, collection_id, PipelineRunConfig::default()).await?;

                    let answer = ctx.answer_text.unwrap_or_default();
                    let sources = ctx.structured_answer.as_ref().map(|a| a.citations.clone()).unwrap_or_default();
                    let token_count = ragcore_llm::approx_token_count(&answer);

                    let usage = ragcore_core::TokenUsage { prompt_tokens: token_count, completion_tokens: 0 };
                    if let Some(warning) = tracker.check_usage_warning(&usage, context_limit, None) {
                        state_for_warning.record_warning(user_id, session_id, warning).await;
                    }

                    Ok(PipelineOutcome { answer, sources, token_count })
                })
                .await;

            match result {
                Ok(message) => {
                    let sources: Vec<ragcore_core::Citation> = serde_json::from_value(message.metadata.get("sources").cloned().unwrap_or_default()).unwrap_or_default();
                    let token_count = message.metadata.get("token_count").and_then(|v| v.as_u64()).unwrap_or(0) as u32;
                    let _ = send_json(
                        tx,
                        &OutgoingMessage::AiResponse {
                            session_id,
                            message_id: message.id,
                            content: message.content,
                            sources,
                            token_count,
                            timestamp: message.created_at.timestamp_millis(),
                        },
                    );
                }
                Err(err) => {
                    let _ = send_json(tx, &OutgoingMessage::Error { message: err.to_string() });
                }
            }
        }
    }
}

fn send_json(tx: &mpsc::UnboundedSender<Message>, message: &OutgoingMessage) -> Result<(), ()> {
    let json = serde_json::to_string(message).map_err(|_| ())?;
    tx.send(Message::Text(json)).map_err(|_| ())
}
