use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tower_sessions::Session;

use crate::{
    db::comments::{self, Comment, CommentView},
    session, AppError, AppResult,
};

use super::find_announcement;

#[derive(Debug, Deserialize)]
pub struct CommentBody {
    #[serde(default)]
    content: String,
}

impl CommentBody {
    fn content(&self) -> AppResult<&str> {
        let content = self.content.trim();
        if content.is_empty() {
            return Err(AppError::bad_request("comment can't be empty"));
        }
        Ok(content)
    }
}

async fn find_own_comment(db_pool: &SqlitePool, id: i64, user_id: i64) -> AppResult<Comment> {
    let comment = comments::find(db_pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("comment"))?;
    if comment.author_id != user_id {
        return Err(AppError::forbidden("only the author can change this comment"));
    }
    Ok(comment)
}

#[debug_handler]
pub(crate) async fn list(State(db_pool): State<SqlitePool>, Path(id): Path<i64>) -> AppResult<Json<Vec<CommentView>>> {
    let announcement = find_announcement(&db_pool, id).await?;
    let comments = comments::for_announcement(&db_pool, announcement.id).await?;
    Ok(Json(comments.into_iter().map(CommentView::from).collect()))
}

#[debug_handler]
pub(crate) async fn create(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(id): Path<i64>,
    Json(body): Json<CommentBody>,
) -> AppResult<Response> {
    let user_id = session::require_user(&session).await?;
    let content = body.content()?;
    let announcement = find_announcement(&db_pool, id).await?;

    let comment_id = comments::insert(&db_pool, announcement.id, user_id, content, OffsetDateTime::now_utc()).await?;
    let comment = comments::find(&db_pool, comment_id)
        .await?
        .ok_or_else(|| AppError::not_found("comment"))?;

    Ok((StatusCode::CREATED, Json(CommentView::from(comment))).into_response())
}

#[debug_handler]
pub(crate) async fn update(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(id): Path<i64>,
    Json(body): Json<CommentBody>,
) -> AppResult<Json<CommentView>> {
    let user_id = session::require_user(&session).await?;
    let comment = find_own_comment(&db_pool, id, user_id).await?;
    let content = body.content()?;

    comments::edit(&db_pool, comment.id, content, OffsetDateTime::now_utc()).await?;
    let comment = comments::find(&db_pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("comment"))?;
    Ok(Json(comment.into()))
}

#[debug_handler]
pub(crate) async fn delete(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    let user_id = session::require_user(&session).await?;
    let comment = find_own_comment(&db_pool, id, user_id).await?;

    comments::delete(&db_pool, comment.id).await?;
    Ok(Json(json!({
        "message": "comment deleted",
        "announcement_id": comment.announcement_id,
    })))
}
