use std::sync::Arc;

use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tower_sessions::Session;

use crate::{
    db::profile_reviews::{self, ProfileReview, ProfileReviewView},
    session, AppError, AppResult, AppState, Config,
};

use super::find_profile;

#[derive(Debug, Deserialize)]
pub struct NewComment {
    #[serde(default)]
    comment: String,
}

#[derive(Debug, Deserialize)]
pub struct EditedComment {
    #[serde(default)]
    text: String,
}

fn non_empty(text: &str) -> AppResult<&str> {
    let text = text.trim();
    if text.is_empty() {
        return Err(AppError::bad_request("comment can't be empty"));
    }
    Ok(text)
}

async fn find_own(db_pool: &SqlitePool, id: i64, user_id: i64) -> AppResult<ProfileReview> {
    let review = profile_reviews::find(db_pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("comment"))?;
    if review.reviewer_id != user_id {
        return Err(AppError::forbidden("only the author can change this comment"));
    }
    Ok(review)
}

/// One comment per reviewer and profile; writing again replaces the text.
#[debug_handler(state = AppState)]
pub(crate) async fn create(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    session: Session,
    Path(username): Path<String>,
    Json(body): Json<NewComment>,
) -> AppResult<Response> {
    let user_id = session::require_user(&session).await?;
    let comment = non_empty(&body.comment)?;
    let profile = find_profile(&db_pool, &username).await?;

    profile_reviews::upsert(&db_pool, user_id, profile.id, comment, OffsetDateTime::now_utc()).await?;
    let review = profile_reviews::find_pair(&db_pool, user_id, profile.id)
        .await?
        .ok_or_else(|| AppError::not_found("comment"))?;

    Ok((
        StatusCode::CREATED,
        Json(ProfileReviewView::new(review, &config.public_url)),
    )
        .into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn update(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    session: Session,
    Path(id): Path<i64>,
    Json(body): Json<EditedComment>,
) -> AppResult<Json<ProfileReviewView>> {
    let user_id = session::require_user(&session).await?;
    let review = find_own(&db_pool, id, user_id).await?;
    let text = non_empty(&body.text)?;

    profile_reviews::edit(&db_pool, review.id, text).await?;
    let review = profile_reviews::find(&db_pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("comment"))?;
    Ok(Json(ProfileReviewView::new(review, &config.public_url)))
}

#[debug_handler]
pub(crate) async fn delete(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let user_id = session::require_user(&session).await?;
    let review = find_own(&db_pool, id, user_id).await?;

    profile_reviews::delete(&db_pool, review.id).await?;
    Ok(StatusCode::NO_CONTENT)
}
