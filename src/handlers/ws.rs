use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::auth::jwt::{verify_token, TokenType};
use crate::repo::{PgMoodStore, PgProfileStore};
use crate::session::{Session, SessionEvent, SessionOrchestrator};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

/// Live `(user, streak)` snapshots for a signed-in client. Each connection
/// runs its own orchestrator; the auth handlers broadcast session events
/// into it.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
) -> Response {
    let (user_id, email) = match authenticate_ws(&state, query.token.as_deref()) {
        Ok(identity) => identity,
        Err(e) => {
            tracing::warn!("WebSocket auth failed: {}", e);
            return (StatusCode::UNAUTHORIZED, "Unauthorized").into_response();
        }
    };

    ws.on_upgrade(move |socket| handle_socket(socket, state, user_id, email))
}

fn authenticate_ws(
    state: &AppState,
    token: Option<&str>,
) -> Result<(Uuid, Option<String>), &'static str> {
    let token = token.ok_or("Missing token query parameter")?;

    let token_data = verify_token(token, &state.config).map_err(|_| "Invalid or expired token")?;

    if token_data.claims.token_type != TokenType::Access {
        return Err("Must use access token for WebSocket");
    }

    let email = if token_data.claims.email.is_empty() {
        None
    } else {
        Some(token_data.claims.email)
    };
    Ok((token_data.claims.sub, email))
}

async fn handle_socket(socket: WebSocket, state: AppState, user_id: Uuid, email: Option<String>) {
    let (mut sender, mut receiver) = socket.split();

    tracing::debug!(user_id = %user_id, "WebSocket connection established");

    let orchestrator = Arc::new(SessionOrchestrator::new(
        PgProfileStore::new(state.db.clone()),
        PgMoodStore::new(state.db.clone()),
    ));
    let mut snapshots = orchestrator.subscribe();
    let mut events = state.session_events.subscribe();

    // The upgraded connection itself proves a live session; seed the first
    // load from the token identity.
    orchestrator.handle_event(SessionEvent::signed_in(Session {
        user_id,
        email,
        metadata: serde_json::Map::new(),
    }));

    // Push the current snapshot and every subsequent change to the client.
    let mut send_task = tokio::spawn(async move {
        loop {
            let snapshot = snapshots.borrow_and_update().clone();
            let msg = match serde_json::to_string(&snapshot) {
                Ok(msg) => msg,
                Err(_) => break,
            };
            if sender.send(Message::Text(msg)).await.is_err() {
                break;
            }
            if snapshots.changed().await.is_err() {
                break;
            }
        }
    });

    // Feed this user's session events into the orchestrator and drain the
    // client side of the socket.
    let orch = Arc::clone(&orchestrator);
    let mut recv_task = tokio::spawn(async move {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Ok(event) if event.user_id == user_id => {
                        orch.handle_event(event);
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!(user_id = %user_id, skipped, "Session event stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                msg = receiver.next() => match msg {
                    Some(Ok(Message::Text(text))) => {
                        tracing::debug!(user_id = %user_id, message = %text, "WebSocket message received");
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                },
            }
        }
    });

    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    tracing::debug!(user_id = %user_id, "WebSocket connection closed");
}
