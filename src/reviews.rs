//! Written reviews of guides. Every change re-rates the guide and its author.

use axum::{
    debug_handler,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tower_sessions::Session;

use crate::{
    db::reviews::{self, Review, ReviewView},
    guides::find_guide,
    hooks, session, AppError, AppResult, AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create))
        .route("/{id}", put(update).delete(delete))
}

#[derive(Debug, Deserialize)]
pub struct ReviewBody {
    #[serde(default)]
    guide_id: Option<i64>,
    #[serde(default)]
    text: String,
    #[serde(default)]
    stars: Option<i64>,
}

impl ReviewBody {
    fn checked(&self) -> AppResult<(&str, i64)> {
        let text = self.text.trim();
        if text.is_empty() {
            return Err(AppError::bad_request("review text can't be empty"));
        }
        let stars = self
            .stars
            .filter(|s| (1..=5).contains(s))
            .ok_or_else(|| AppError::bad_request("stars must be between 1 and 5"))?;
        Ok((text, stars))
    }
}

#[derive(Debug, Serialize)]
pub struct RatedReview {
    #[serde(flatten)]
    review: ReviewView,
    guide_average_rating: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile_average_rating: Option<i64>,
}

async fn find_review(db_pool: &SqlitePool, id: i64) -> AppResult<Review> {
    reviews::find(db_pool, id).await?.ok_or_else(|| AppError::not_found("review"))
}

fn ensure_author(review: &Review, user_id: i64) -> AppResult<()> {
    if review.author_id != user_id {
        return Err(AppError::forbidden("only the author can change this review"));
    }
    Ok(())
}

#[debug_handler]
pub async fn create(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Json(body): Json<ReviewBody>,
) -> AppResult<Response> {
    let user_id = session::require_user(&session).await?;
    let guide_id = body.guide_id.ok_or_else(|| AppError::bad_request("guide_id is required"))?;
    let guide = find_guide(&db_pool, guide_id).await?;
    let (text, stars) = body.checked()?;

    let mut tx = db_pool.begin().await?;
    if reviews::exists_for(&mut *tx, guide.id, user_id).await? {
        return Err(AppError::bad_request("you have already reviewed this guide"));
    }
    let id = reviews::insert(&mut *tx, guide.id, user_id, text, stars, OffsetDateTime::now_utc()).await?;
    let (guide_average_rating, _) = hooks::refresh_ratings(&mut tx, guide.id, guide.author_id).await?;
    tx.commit().await?;

    let review = find_review(&db_pool, id).await?;
    Ok((
        StatusCode::CREATED,
        Json(RatedReview {
            review: review.into(),
            guide_average_rating,
            profile_average_rating: None,
        }),
    )
        .into_response())
}

#[debug_handler]
pub async fn update(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(id): Path<i64>,
    Json(body): Json<ReviewBody>,
) -> AppResult<Json<RatedReview>> {
    let user_id = session::require_user(&session).await?;
    let review = find_review(&db_pool, id).await?;
    ensure_author(&review, user_id)?;
    let (text, stars) = body.checked()?;
    let guide = find_guide(&db_pool, review.guide_id).await?;

    let mut tx = db_pool.begin().await?;
    reviews::update(&mut *tx, id, text, stars).await?;
    let (guide_average_rating, profile_average_rating) =
        hooks::refresh_ratings(&mut tx, guide.id, guide.author_id).await?;
    tx.commit().await?;

    Ok(Json(RatedReview {
        review: find_review(&db_pool, id).await?.into(),
        guide_average_rating,
        profile_average_rating: Some(profile_average_rating),
    }))
}

#[debug_handler]
pub async fn delete(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(id): Path<i64>,
) -> AppResult<Json<Value>> {
    let user_id = session::require_user(&session).await?;
    let review = find_review(&db_pool, id).await?;
    ensure_author(&review, user_id)?;
    let guide = find_guide(&db_pool, review.guide_id).await?;

    let mut tx = db_pool.begin().await?;
    reviews::delete(&mut *tx, id).await?;
    let (guide_average_rating, profile_average_rating) =
        hooks::refresh_ratings(&mut tx, guide.id, guide.author_id).await?;
    tx.commit().await?;

    Ok(Json(json!({
        "message": "review deleted",
        "guide_average_rating": guide_average_rating,
        "profile_average_rating": profile_average_rating,
    })))
}
