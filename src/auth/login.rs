use axum::{
    debug_handler,
    extract::State,
    response::{Html, IntoResponse},
    Json,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    db::users::{self, CurrentUserView},
    include_res,
    session::{self, RETURN_URL, USER_ID},
    AppError, AppResult,
};

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    #[serde(default)]
    username: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoggedIn {
    username: String,
    email: String,
    return_url: String,
}

#[debug_handler]
pub(crate) async fn login_page() -> impl IntoResponse {
    Html(include_res!(str, "/pages/login.html"))
}

#[debug_handler]
pub async fn login(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Json(body): Json<LoginBody>,
) -> AppResult<Json<LoggedIn>> {
    let (Some(username), Some(password)) = (
        body.username.as_deref().map(str::trim).filter(|u| !u.is_empty()),
        body.password.as_deref().filter(|p| !p.is_empty()),
    ) else {
        return Err(AppError::bad_request("username and password are required"));
    };

    let user = users::find_by_username(&db_pool, username)
        .await?
        .filter(|user| super::verify_password(password, &user.password_hash))
        .ok_or_else(|| AppError::Unauthorized("invalid credentials".to_owned()))?;

    if !user.is_active {
        return Err(AppError::Unauthorized(
            "email not confirmed, check your mail and confirm the registration".to_owned(),
        ));
    }

    let return_url = session.remove::<String>(RETURN_URL).await?.unwrap_or_else(|| "/".to_owned());
    session.cycle_id().await?;
    session.insert(USER_ID, user.id).await?;

    tracing::info!(user_id = user.id, "logged in");
    Ok(Json(LoggedIn {
        username: user.username,
        email: user.email,
        return_url,
    }))
}

#[debug_handler]
pub(crate) async fn me(State(db_pool): State<SqlitePool>, session: Session) -> AppResult<Json<CurrentUserView>> {
    let user_id = session::require_user(&session).await?;
    let user = users::find_by_id(&db_pool, user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))?;
    Ok(Json(user.into()))
}
