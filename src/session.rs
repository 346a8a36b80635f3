use axum::response::{IntoResponse, Redirect, Response};
use tower_sessions::Session;

use crate::{db::UserId, AppError, AppResult};

pub const USER_ID: &str = "user_id";
pub const RETURN_URL: &str = "return_url";

pub async fn current_user(session: &Session) -> AppResult<Option<UserId>> {
    Ok(session.get::<UserId>(USER_ID).await?)
}

/// The logged-in user, or 401 for API callers.
pub async fn require_user(session: &Session) -> AppResult<UserId> {
    current_user(session)
        .await?
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))
}

/// The logged-in user, or a redirect to the login page. `return_url` is
/// remembered in the session and handed back by a successful login.
pub async fn require_page_user(session: &Session, return_url: &str) -> AppResult<Result<UserId, Response>> {
    match current_user(session).await? {
        Some(user_id) => Ok(Ok(user_id)),
        None => {
            session.insert(RETURN_URL, return_url).await?;
            Ok(Err(Redirect::to("/login").into_response()))
        }
    }
}
