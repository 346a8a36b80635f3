use axum::{
    debug_handler,
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::{
    db::{
        activity::{self, ActivityView},
        announcements::{self, AnnouncementView},
        guides::{self, GuideView},
        reviews::{self, ReviewView},
    },
    media, AppResult,
};

use super::find_profile;

const ACTIVITY_LIMIT: i64 = 50;

#[derive(Debug, Serialize)]
pub struct ProfileView {
    username: String,
    avatar: Option<String>,
    bio: String,
    rating: i64,
    reviews: Vec<ReviewView>,
    guides: Vec<GuideView>,
    announcements: Vec<AnnouncementView>,
}

#[debug_handler]
pub(crate) async fn profile(
    State(db_pool): State<SqlitePool>,
    Path(username): Path<String>,
) -> AppResult<Json<ProfileView>> {
    let profile = find_profile(&db_pool, &username).await?;

    let reviews = reviews::on_guides_of(&db_pool, profile.user_id).await?;
    let guides = guides::by_author(&db_pool, profile.user_id).await?;
    let announcements = announcements::by_author(&db_pool, profile.user_id).await?;

    Ok(Json(ProfileView {
        username: profile.username,
        avatar: profile.avatar.as_deref().map(media::url),
        bio: profile.bio,
        rating: profile.rating,
        reviews: reviews.into_iter().map(ReviewView::from).collect(),
        guides: guides.into_iter().map(GuideView::from).collect(),
        announcements: announcements.into_iter().map(AnnouncementView::from).collect(),
    }))
}

#[derive(Debug, Serialize)]
pub struct GuideItem {
    id: i64,
    title: String,
    image: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    created_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct ProfileGuides {
    guides: Vec<GuideItem>,
}

#[debug_handler]
pub(crate) async fn guides(
    State(db_pool): State<SqlitePool>,
    Path(username): Path<String>,
) -> AppResult<Json<ProfileGuides>> {
    let profile = find_profile(&db_pool, &username).await?;
    let guides = guides::by_author(&db_pool, profile.user_id)
        .await?
        .into_iter()
        .map(|guide| GuideItem {
            id: guide.id,
            image: guide.image.as_deref().map(media::url),
            title: guide.title,
            created_at: guide.created_at,
        })
        .collect();

    Ok(Json(ProfileGuides { guides }))
}

#[debug_handler]
pub(crate) async fn activities(
    State(db_pool): State<SqlitePool>,
    Path(username): Path<String>,
) -> AppResult<Json<Vec<ActivityView>>> {
    let profile = find_profile(&db_pool, &username).await?;
    let entries = activity::recent_for_user(&db_pool, profile.user_id, ACTIVITY_LIMIT).await?;
    Ok(Json(entries.into_iter().map(ActivityView::from).collect()))
}
