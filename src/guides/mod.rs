mod api;
pub(crate) mod pages;

use axum::{
    routing::{get, post},
    Router,
};
use sqlx::SqlitePool;
use time::OffsetDateTime;

use crate::{
    db::{
        activity::Target,
        guides::{self, Guide, GuideDraft},
        UserId,
    },
    hooks, AppError, AppResult, AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(pages::list))
        .route("/new", get(pages::form).post(pages::save))
        .route("/{id}", get(pages::detail))
}

pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/", get(api::list).post(api::create))
        .route("/filter", get(api::filter))
        .route("/search", get(api::search))
        .route("/summaries", get(api::summaries))
        .route(
            "/{id}",
            get(api::get).put(api::replace).patch(api::patch).delete(api::delete),
        )
        .route("/{id}/rate", post(api::rate))
}

pub const TITLE_MAX: usize = 200;

fn check_title(title: &str) -> AppResult<()> {
    if title.trim().is_empty() {
        return Err(AppError::bad_request("title can't be blank"));
    }
    if title.chars().count() > TITLE_MAX {
        return Err(AppError::bad_request(format!("title must be at most {TITLE_MAX} characters")));
    }
    Ok(())
}

/// Trims tags and drops empty ones.
pub(crate) fn clean_tags(tags: Vec<String>) -> Vec<String> {
    tags.into_iter()
        .map(|tag| tag.trim().to_owned())
        .filter(|tag| !tag.is_empty())
        .collect()
}

pub(crate) async fn find_guide(db_pool: &SqlitePool, id: i64) -> AppResult<Guide> {
    guides::find(db_pool, id).await?.ok_or_else(|| AppError::not_found("guide"))
}

pub(crate) fn ensure_author(guide: &Guide, user_id: UserId) -> AppResult<()> {
    if guide.author_id != user_id {
        return Err(AppError::forbidden("only the author can change this guide"));
    }
    Ok(())
}

/// Inserts a guide and logs its creation.
pub(crate) async fn publish(db_pool: &SqlitePool, author_id: UserId, draft: &GuideDraft) -> AppResult<i64> {
    check_title(&draft.title)?;
    let now = OffsetDateTime::now_utc();

    let mut tx = db_pool.begin().await?;
    let id = guides::insert(&mut *tx, author_id, draft, now).await?;
    hooks::record_created(&mut tx, author_id, Target::Guide(Some(id)), &draft.title, now).await?;
    tx.commit().await?;

    tracing::info!(guide_id = id, author_id, "guide published");
    Ok(id)
}

/// Saves the new fields; logs an update only when something visible changed.
pub(crate) async fn revise(db_pool: &SqlitePool, guide: &Guide, draft: &GuideDraft) -> AppResult<()> {
    check_title(&draft.title)?;
    let now = OffsetDateTime::now_utc();
    let before = GuideDraft::of(guide);

    let mut tx = db_pool.begin().await?;
    guides::update(&mut *tx, guide.id, draft, now).await?;
    hooks::record_updated(
        &mut tx,
        guide.author_id,
        Target::Guide(Some(guide.id)),
        &before,
        draft,
        &draft.title,
        now,
    )
    .await?;
    tx.commit().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn titles_are_bounded() {
        assert!(check_title("Ownership 101").is_ok());
        assert!(check_title("  ").is_err());
        assert!(check_title(&"x".repeat(TITLE_MAX)).is_ok());
        assert!(check_title(&"x".repeat(TITLE_MAX + 1)).is_err());
    }

    #[test]
    fn tags_are_cleaned() {
        let tags = clean_tags(vec![" rust ".into(), "".into(), "web".into()]);
        assert_eq!(tags, vec!["rust".to_owned(), "web".to_owned()]);
    }
}
