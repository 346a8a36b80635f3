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
    db::announcements::{self, AnnouncementDraft, AnnouncementView},
    filter::ListFilter,
    guides::clean_tags,
    media, session, AppResult,
};

use super::{ensure_author, find_announcement, publish, revise, withdraw};

#[derive(Debug, Deserialize)]
pub struct AnnouncementBody {
    title: String,
    #[serde(default)]
    description: String,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    tags: Vec<String>,
}

impl From<AnnouncementBody> for AnnouncementDraft {
    fn from(body: AnnouncementBody) -> Self {
        AnnouncementDraft {
            title: body.title.trim().to_owned(),
            description: body.description,
            image: body.image.as_deref().and_then(media::stored_path),
            tags: clean_tags(body.tags),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct AnnouncementPatch {
    title: Option<String>,
    description: Option<String>,
    image: Option<String>,
    tags: Option<Vec<String>>,
}

impl AnnouncementPatch {
    fn apply(self, mut draft: AnnouncementDraft) -> AnnouncementDraft {
        if let Some(title) = self.title {
            draft.title = title.trim().to_owned();
        }
        if let Some(description) = self.description {
            draft.description = description;
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
pub struct Filtered {
    count: usize,
    results: Vec<AnnouncementView>,
}

#[debug_handler]
pub(crate) async fn list(State(db_pool): State<SqlitePool>) -> AppResult<Json<Vec<AnnouncementView>>> {
    let announcements = announcements::all(&db_pool).await?;
    Ok(Json(announcements.into_iter().map(AnnouncementView::from).collect()))
}

#[debug_handler]
pub(crate) async fn create(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Json(body): Json<AnnouncementBody>,
) -> AppResult<Response> {
    let user_id = session::require_user(&session).await?;

    let id = publish(&db_pool, user_id, &body.into()).await?;
    let announcement = find_announcement(&db_pool, id).await?;

    Ok((StatusCode::CREATED, Json(AnnouncementView::from(announcement))).into_response())
}

#[debug_handler]
pub(crate) async fn get(State(db_pool): State<SqlitePool>, Path(id): Path<i64>) -> AppResult<Json<AnnouncementView>> {
    Ok(Json(find_announcement(&db_pool, id).await?.into()))
}

#[debug_handler]
pub(crate) async fn replace(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(id): Path<i64>,
    Json(body): Json<AnnouncementBody>,
) -> AppResult<Json<AnnouncementView>> {
    let user_id = session::require_user(&session).await?;
    let announcement = find_announcement(&db_pool, id).await?;
    ensure_author(&announcement, user_id)?;

    revise(&db_pool, &announcement, &body.into()).await?;
    Ok(Json(find_announcement(&db_pool, id).await?.into()))
}

#[debug_handler]
pub(crate) async fn patch(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(id): Path<i64>,
    Json(body): Json<AnnouncementPatch>,
) -> AppResult<Json<AnnouncementView>> {
    let user_id = session::require_user(&session).await?;
    let announcement = find_announcement(&db_pool, id).await?;
    ensure_author(&announcement, user_id)?;

    let draft = body.apply(AnnouncementDraft::of(&announcement));
    revise(&db_pool, &announcement, &draft).await?;
    Ok(Json(find_announcement(&db_pool, id).await?.into()))
}

#[debug_handler]
pub(crate) async fn delete(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(id): Path<i64>,
) -> AppResult<StatusCode> {
    let user_id = session::require_user(&session).await?;
    let announcement = find_announcement(&db_pool, id).await?;
    ensure_author(&announcement, user_id)?;

    withdraw(&db_pool, &announcement).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[debug_handler]
pub(crate) async fn filter(
    State(db_pool): State<SqlitePool>,
    Query(params): Query<ListFilter>,
) -> AppResult<Json<Filtered>> {
    let now = OffsetDateTime::now_utc();
    let results: Vec<AnnouncementView> = announcements::all(&db_pool)
        .await?
        .into_iter()
        .filter(|a| params.admits(&a.title, &a.tags.0, a.created_at, now))
        .map(AnnouncementView::from)
        .collect();

    Ok(Json(Filtered { count: results.len(), results }))
}
