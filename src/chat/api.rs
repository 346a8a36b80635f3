use std::sync::Arc;

use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use tower_sessions::Session;

use crate::{
    db::{
        chat::{self, ChatMessageView, Contact},
        users, UserId,
    },
    session, AppError, AppResult, AppState, Config,
};

use super::{deliver, ChatEvent, SendMessage};

#[debug_handler(state = AppState)]
pub(crate) async fn send(
    State(db_pool): State<SqlitePool>,
    State(tx): State<broadcast::Sender<ChatEvent>>,
    State(config): State<Arc<Config>>,
    session: Session,
    Json(body): Json<SendMessage>,
) -> AppResult<Response> {
    let user_id = session::require_user(&session).await?;
    let message = deliver(&db_pool, &tx, user_id, body).await?;

    Ok((
        StatusCode::CREATED,
        Json(ChatMessageView::new(message, user_id, &config.public_url)),
    )
        .into_response())
}

/// The thread with `other`, oldest first. Reading it marks their messages read.
#[debug_handler(state = AppState)]
pub(crate) async fn messages(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    session: Session,
    Path(other): Path<UserId>,
) -> AppResult<Json<Vec<ChatMessageView>>> {
    let user_id = session::require_user(&session).await?;
    if users::find_by_id(&db_pool, other).await?.is_none() {
        return Err(AppError::not_found("user"));
    }
    if other == user_id {
        return Ok(Json(Vec::new()));
    }

    chat::mark_read(&db_pool, other, user_id).await?;
    let thread = chat::thread(&db_pool, user_id, other).await?;

    Ok(Json(
        thread
            .into_iter()
            .map(|msg| ChatMessageView::new(msg, user_id, &config.public_url))
            .collect(),
    ))
}

#[debug_handler]
pub(crate) async fn contacts(State(db_pool): State<SqlitePool>, session: Session) -> AppResult<Json<Vec<Contact>>> {
    let user_id = session::require_user(&session).await?;
    let messages = chat::involving(&db_pool, user_id).await?;
    Ok(Json(chat::contacts(&messages, user_id)))
}
