use std::sync::Arc;

use axum::{
    debug_handler,
    extract::{ws::Message, State, WebSocketUpgrade},
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use sqlx::SqlitePool;
use tokio::sync::broadcast::{self, error::RecvError};
use tower_sessions::Session;

use crate::{db::chat::ChatMessageView, session, AppResult, AppState, Config};

use super::{deliver, ChatEvent, SendMessage};

/// Streams the session user's new messages as JSON; accepts outgoing ones in
/// the same shape as `POST /api/chat/send`.
#[debug_handler(state = AppState)]
pub(crate) async fn chat_ws(
    State(db_pool): State<SqlitePool>,
    State(tx): State<broadcast::Sender<ChatEvent>>,
    State(config): State<Arc<Config>>,
    session: Session,
    ws: WebSocketUpgrade,
) -> AppResult<Response> {
    let user_id = session::require_user(&session).await?;

    Ok(ws.on_upgrade(move |stream| async move {
        let mut rx = tx.subscribe();
        let (mut sender, mut receiver) = stream.split();

        let mut broadcast_task = tokio::spawn(async move {
            loop {
                let event = match rx.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(user_id, skipped, "chat socket lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };
                if !event.involves(user_id) {
                    continue;
                }

                let view = ChatMessageView::new(event.message, user_id, &config.public_url);
                let Ok(text) = serde_json::to_string(&view) else {
                    continue;
                };
                if sender.send(Message::Text(text.into())).await.is_err() {
                    break;
                }
            }
        });

        loop {
            tokio::select! {
                _ = &mut broadcast_task => break,
                incoming = receiver.next() => {
                    let Some(Ok(msg)) = incoming else { break };
                    if let Message::Close(_) = msg {
                        break;
                    }
                    let Ok(body) = serde_json::from_slice::<SendMessage>(&msg.into_data()) else {
                        continue;
                    };
                    if let Err(err) = deliver(&db_pool, &tx, user_id, body).await {
                        tracing::debug!(user_id, error = %err, "rejected chat message from socket");
                    }
                }
            }
        }

        broadcast_task.abort();
    }))
}
