use axum::{
    debug_handler,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use time::OffsetDateTime;
use tower_sessions::Session;

use crate::{
    db::{
        guides::{self, GuideDraft, GuideSearch, GuideSummary, GuideView},
        ratings,
    },
    filter::ListFilter,
    hooks, media, session, AppError, AppResult,
};

use super::{clean_tags, ensure_author, find_guide, publish, revise};

#[derive(Debug, Deserialize)]
pub struct GuideBody {
    title: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

impl From<GuideBody> for GuideDraft {
    fn from(body: GuideBody) -> Self {
        GuideDraft {
            title: body.title.trim().to_owned(),
            content: body.content,
            image: body.image.as_deref().and_then(media::stored_path),
            tags: clean_tags(body.tags),
        }
    }
}

/// Partial update; absent fields keep their value.
#[derive(Debug, Deserialize)]
pub struct GuidePatch {
    title: Option<String>,
    content: Option<String>,
    image: Option<String>,
    tags: Option<Vec<String>>,
}

impl GuidePatch {
    fn apply(self, mut draft: GuideDraft) -> GuideDraft {
        if let Some(title) = self.title {
            draft.title = title.trim().to_owned();
        }
        if let Some(content) = self.content {
            draft.content = content;
        }
        if let Some(image) = self.image {
            draft.image = media::stored_path(&image);
        }
        if let Some(tags) = self.tags {
            draft.tags = clean_tags(tags);
        }
        draft
    }
}

#[derive(Debug, Serialize)]
pub struct Filtered<T> {
    count: usize,
    results: Vec<T>,
}

#[debug_handler]
pub(crate) async fn list(State(db_pool): State<SqlitePool>) -> AppResult<Json<Vec<GuideView>>> {
    let guides = guides::all(&db_pool).await?;
    Ok(Json(guides.into_iter().map(GuideView::from).collect()))
}

#[debug_handler]
pub(crate) async fn create(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Json(body): Json<GuideBody>,
) -> AppResult<Response> {
    let user_id = session::require_user(&session).await?;

    let id = publish(&db_pool, user_id, &body.into()).await?;
    let guide = find_guide(&db_pool, id).await?;

    Ok((StatusCode::CREATED, Json(GuideView::from(guide))).into_response())
}

#[debug_handler]
pub(crate) async fn get(State(db_pool): State<SqlitePool>, Path(id): Path<i64>) -> AppResult<Json<GuideView>> {
    Ok(Json(find_guide(&db_pool, id).await?.into()))
}

#[debug_handler]
pub(crate) async fn replace(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(id): Path<i64>,
    Json(body): Json<GuideBody>,
) -> AppResult<Json<GuideView>> {
    let user_id = session::require_user(&session).await?;
    let guide = find_guide(&db_pool, id).await?;
    ensure_author(&guide, user_id)?;

    revise(&db_pool, &guide, &body.into()).await?;
    Ok(Json(find_guide(&db_pool, id).await?.into()))
}

#[debug_handler]
pub(crate) async fn patch(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(id): Path<i64>,
    Json(body): Json<GuidePatch>,
) -> AppResult<Json<GuideView>> {
    let user_id = session::require_user(&session).await?;
    let guide = find_guide(&db_pool, id).await?;
    ensure_author(&guide, user_id)?;

    let draft = body.apply(GuideDraft::of(&guide));
    revise(&db_pool, &guide, &draft).await?;
    Ok(Json(find_guide(&db_pool, id).await?.into()))
}

#[debug_handler]
pub(crate) async fn delete(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let user_id = session::require_user(&session).await?;
    let guide = find_guide(&db_pool, id).await?;
    ensure_author(&guide, user_id)?;

    let mut tx = db_pool.begin().await?;
    let profile_rating = hooks::delete_guide(&mut tx, &guide, OffsetDateTime::now_utc()).await?;
    tx.commit().await?;

    tracing::info!(guide_id = id, profile_rating, "guide deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[debug_handler]
pub(crate) async fn filter(
    State(db_pool): State<SqlitePool>,
    Query(params): Query<ListFilter>,
) -> AppResult<Json<Filtered<GuideView>>> {
    let now = OffsetDateTime::now_utc();
    let results: Vec<GuideView> = guides::all(&db_pool)
        .await?
        .into_iter()
        .filter(|guide| params.admits(&guide.title, &guide.tags.0, guide.created_at, now))
        .map(GuideView::from)
        .collect();

    Ok(Json(Filtered { count: results.len(), results }))
}

#[debug_handler]
pub(crate) async fn search(
    State(db_pool): State<SqlitePool>,
    Query(params): Query<GuideSearch>,
) -> AppResult<Json<Vec<GuideView>>> {
    let guides = guides::search(&db_pool, &params).await?;
    Ok(Json(guides.into_iter().map(GuideView::from).collect()))
}

#[debug_handler]
pub(crate) async fn summaries(State(db_pool): State<SqlitePool>) -> AppResult<Json<Vec<GuideSummary>>> {
    Ok(Json(guides::summaries(&db_pool).await?))
}

#[derive(Debug, Deserialize)]
pub struct RateBody {
    #[serde(default)]
    rating: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct Averages {
    pub guide_average_rating: i64,
    pub profile_average_rating: i64,
}

#[debug_handler]
pub(crate) async fn rate(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(id): Path<i64>,
    Json(body): Json<RateBody>,
) -> AppResult<Json<Averages>> {
    let user_id = session::require_user(&session).await?;
    let rating = body
        .rating
        .filter(|r| (1..=5).contains(r))
        .ok_or_else(|| AppError::bad_request("rating must be between 1 and 5"))?;
    let guide = find_guide(&db_pool, id).await?;

    let mut tx = db_pool.begin().await?;
    ratings::upsert(&mut *tx, guide.id, user_id, rating, OffsetDateTime::now_utc()).await?;
    let (guide_average_rating, profile_average_rating) =
        hooks::refresh_ratings(&mut tx, guide.id, guide.author_id).await?;
    tx.commit().await?;

    Ok(Json(Averages { guide_average_rating, profile_average_rating }))
}
