//! Direct messages between users, over REST and a per-user websocket feed.

mod api;
mod ws;

use axum::{
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tokio::sync::broadcast;

use crate::{
    db::{chat::{self, ChatMessage}, users, UserId},
    media, AppError, AppResult, AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/send", post(api::send))
        .route("/contacts", get(api::contacts))
        .route("/{user_id}/messages", get(api::messages))
        .route("/ws", get(ws::chat_ws))
}

/// A stored message, fanned out to every open websocket.
/// Each socket only forwards the ones its user takes part in.
#[derive(Debug, Clone)]
pub struct ChatEvent {
    pub message: ChatMessage,
}

impl ChatEvent {
    pub fn involves(&self, user_id: UserId) -> bool {
        self.message.sender_id == user_id || self.message.receiver_id == user_id
    }
}

#[derive(Debug, Deserialize)]
pub struct SendMessage {
    #[serde(default)]
    pub receiver_id: Option<UserId>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

/// Validates, stores and broadcasts a message from `sender_id`.
pub(crate) async fn deliver(
    db_pool: &SqlitePool,
    tx: &broadcast::Sender<ChatEvent>,
    sender_id: UserId,
    body: SendMessage,
) -> AppResult<ChatMessage> {
    let receiver_id = body.receiver_id.ok_or_else(|| AppError::bad_request("receiver_id is required"))?;
    let text = body.message.as_deref().map(str::trim).unwrap_or_default();
    let image = body.image.as_deref().and_then(media::stored_path);

    if text.is_empty() && image.is_none() {
        return Err(AppError::bad_request("message can't be empty"));
    }
    if users::find_by_id(db_pool, receiver_id).await?.is_none() {
        return Err(AppError::not_found("receiver"));
    }
    if receiver_id == sender_id {
        return Err(AppError::bad_request("you can't message yourself"));
    }

    let id = chat::insert(db_pool, sender_id, receiver_id, text, image.as_deref(), OffsetDateTime::now_utc()).await?;
    let message = chat::find(db_pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("message"))?;

    // no open sockets is fine
    let _ = tx.send(ChatEvent { message: message.clone() });
    tracing::debug!(message_id = id, sender_id, receiver_id, "chat message stored");

    Ok(message)
}
