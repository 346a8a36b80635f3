mod api;
mod comments;
pub(crate) mod pages;

use axum::{
    routing::{get, put},
    Router,
};
use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::{
    db::{
        activity::Target,
        announcements::{self, Announcement, AnnouncementDraft},
        UserId,
    },
    hooks, AppError, AppResult, AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(pages::list))
        .route("/new", get(pages::new_form).post(pages::create))
        .route("/{id}", get(pages::detail))
        .route("/{id}/edit", get(pages::edit_form).post(pages::update))
}

pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/", get(api::list).post(api::create))
        .route("/filter", get(api::filter))
        .route(
            "/{id}",
            get(api::get).put(api::replace).patch(api::patch).delete(api::delete),
        )
        .route("/{id}/comments", get(comments::list).post(comments::create))
        .route("/comments/{id}", put(comments::update).delete(comments::delete))
}

pub const TITLE_MAX: usize = 255;

fn check_title(title: &str) -> AppResult<()> {
    if title.trim().is_empty() {
        return Err(AppError::bad_request("title can't be blank"));
    }
    if title.chars().count() > TITLE_MAX {
        return Err(AppError::bad_request(format!("title must be at most {TITLE_MAX} characters")));
    }
    Ok(())
}

pub(crate) async fn find_announcement(db_pool: &SqlitePool, id: i64) -> AppResult<Announcement> {
    announcements::find(db_pool, id)
        .await?
        .ok_or_else(|| AppError::not_found("announcement"))
}

fn ensure_author(announcement: &Announcement, user_id: UserId) -> AppResult<()> {
    if announcement.author_id != user_id {
        return Err(AppError::forbidden("only the author can change this announcement"));
    }
    Ok(())
}

async fn publish(db_pool: &SqlitePool, author_id: UserId, draft: &AnnouncementDraft) -> AppResult<i64> {
    check_title(&draft.title)?;
    let now = OffsetDateTime::now_utc();

    let mut tx = db_pool.begin().await?;
    let id = announcements::insert(&mut *tx, author_id, draft, now).await?;
    hooks::record_created(&mut tx, author_id, Target::Announcement(Some(id)), &draft.title, now).await?;
    tx.commit().await?;

    tracing::info!(announcement_id = id, author_id, "announcement published");
    Ok(id)
}

async fn revise(db_pool: &SqlitePool, announcement: &Announcement, draft: &AnnouncementDraft) -> AppResult<()> {
    check_title(&draft.title)?;
    let now = OffsetDateTime::now_utc();
    let before = AnnouncementDraft::of(announcement);

    let mut tx = db_pool.begin().await?;
    announcements::update(&mut *tx, announcement.id, draft, now).await?;
    hooks::record_updated(
        &mut tx,
        announcement.author_id,
        Target::Announcement(Some(announcement.id)),
        &before,
        draft,
        &draft.title,
        now,
    )
    .await?;
    tx.commit().await?;
    Ok(())
}

async fn withdraw(db_pool: &SqlitePool, announcement: &Announcement) -> AppResult<()> {
    let now = OffsetDateTime::now_utc();

    let mut tx = db_pool.begin().await?;
    announcements::delete(&mut *tx, announcement.id).await?;
    hooks::record_deleted(
        &mut tx,
        announcement.author_id,
        Target::Announcement(Some(announcement.id)),
        &announcement.title,
        now,
    )
    .await?;
    tx.commit().await?;

    tracing::info!(announcement_id = announcement.id, "announcement deleted");
    Ok(())
}
