//! WebSocket presence streaming for form edit sessions.
//!
//! Each connection joins the `poll-edit:<form_id>` channel, announces its
//! presence record, and receives the membership snapshot plus every later
//! presence and form event. Closing the socket proactively removes the entry
//! so other editors' lists update without waiting for a transport timeout.

#![allow(missing_docs)]

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Path, Query, State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use pollboard_common::{AppError, AppResult};
use pollboard_db::entities::user;
use pollboard_realtime::presence::PresenceEvent;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::middleware::AppState;

/// Streaming query parameters.
#[derive(Debug, Deserialize)]
pub struct StreamQuery {
    /// Access token for authentication.
    #[serde(rename = "i")]
    pub token: Option<String>,
}

/// WebSocket handler for a form's presence channel.
///
/// Requires editor capability: presence tracks the edit view, not voters.
pub async fn presence_handler(
    ws: WebSocketUpgrade,
    Path(form_id): Path<String>,
    Query(query): Query<StreamQuery>,
    State(state): State<AppState>,
) -> AppResult<Response> {
    let token = query.token.ok_or(AppError::Unauthorized)?;
    let user = state.user_service.authenticate_by_token(&token).await?;

    // Capability is checked before the upgrade so a rejected client gets a
    // proper HTTP status instead of an immediately-closed socket.
    state.form_service.get_for_edit(&form_id, &user).await?;

    info!(form_id, user_id = %user.id, "presence connection");
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, form_id, user, state)))
}

async fn handle_socket(socket: WebSocket, form_id: String, user: user::Model, state: AppState) {
    let (mut sender, mut receiver) = socket.split();

    let (connection_id, mut presence_rx, snapshot) = state
        .presence
        .join(&form_id, &user.id, &user.username)
        .await;
    let mut form_events = state.pubsub.subscribe_local();

    // Initial authoritative snapshot; everything after arrives as events.
    let initial = PresenceEvent::Sync { members: snapshot };
    if let Ok(json) = serde_json::to_string(&initial) {
        if sender.send(Message::Text(json.into())).await.is_err() {
            state.presence.leave(&form_id, connection_id).await;
            return;
        }
    }

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!(form_id, user_id = %user.id, "client closed presence connection");
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        warn!(form_id, error = %e, "presence socket error");
                        break;
                    }
                }
            }

            event = presence_rx.recv() => {
                match event {
                    Ok(event) => {
                        let json = serde_json::to_string(&event).unwrap_or_default();
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        // Missed deltas are fine; resend the authoritative
                        // snapshot so the client converges.
                        warn!(form_id, lagged = n, "presence stream lagged");
                        let members = state.presence.snapshot(&form_id).await;
                        let json = serde_json::to_string(&PresenceEvent::Sync { members })
                            .unwrap_or_default();
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }

            event = form_events.recv() => {
                match event {
                    Ok(event) if event.form_id() == form_id => {
                        let json = serde_json::to_string(&event).unwrap_or_default();
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Ok(_) => {}
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                        warn!(form_id, lagged = n, "form event stream lagged");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    state.presence.leave(&form_id, connection_id).await;
    info!(form_id, user_id = %user.id, "presence connection closed");
}
