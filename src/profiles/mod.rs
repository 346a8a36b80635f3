mod api;
mod comments;
mod edit;
mod page;

use axum::{
    routing::{get, post, put},
    Router,
};
use sqlx::SqlitePool;

use crate::{
    db::profiles::{self, Profile},
    AppError, AppResult, AppState,
};

/// Pages under `/users`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/edit", get(edit::edit_page).post(edit::save))
        .route("/{username}", get(page::profile))
}

pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/{username}", get(api::profile))
        .route("/{username}/guides", get(api::guides))
        .route("/{username}/activities", get(api::activities))
        .route("/{username}/comments", post(comments::create))
}

/// Editing and removing profile comments, under `/api/profile-comments`.
pub fn comments_router() -> Router<AppState> {
    Router::new().route("/{id}", put(comments::update).delete(comments::delete))
}

pub(crate) async fn find_profile(db_pool: &SqlitePool, username: &str) -> AppResult<Profile> {
    profiles::find_by_username(db_pool, username)
        .await?
        .ok_or_else(|| AppError::not_found("user"))
}
