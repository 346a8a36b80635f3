use std::sync::Arc;

use axum::{
    debug_handler,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;
use time::{Duration, OffsetDateTime};
use validator::Validate;

use crate::{
    db::{profiles, users, verification},
    include_res, AppError, AppResult, AppState, Config, Mailer,
};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterBody {
    #[validate(length(min = 1, max = 150, message = "username must be 1 to 150 characters"))]
    username: String,

    #[validate(email(message = "invalid email address"))]
    email: String,

    #[validate(length(min = 6, message = "password must be at least 6 characters long"))]
    password: String,
}

impl RegisterBody {
    /// Surrounding whitespace never counts towards the username or email.
    fn trimmed(self) -> Self {
        RegisterBody {
            username: self.username.trim().to_owned(),
            email: self.email.trim().to_owned(),
            password: self.password,
        }
    }
}

#[debug_handler]
pub(crate) async fn register_page() -> impl IntoResponse {
    Html(include_res!(str, "/pages/register.html"))
}

#[debug_handler(state = AppState)]
pub async fn register(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    State(mailer): State<Mailer>,
    Json(body): Json<RegisterBody>,
) -> AppResult<Response> {
    let body = body.trimmed();
    body.validate()?;
    let username = body.username.as_str();
    let email = body.email.as_str();

    if users::find_by_email(&db_pool, email).await?.is_some() {
        return Err(AppError::bad_request("a user with this email already exists"));
    }
    if users::find_by_username(&db_pool, username).await?.is_some() {
        return Err(AppError::bad_request("a user with this username already exists"));
    }

    let password_hash = super::hash_password(&body.password)?;
    let now = OffsetDateTime::now_utc();

    let mut tx = db_pool.begin().await?;
    let user_id = users::insert(&mut *tx, username, email, &password_hash, now).await?;
    profiles::insert_for_user(&mut *tx, user_id, now).await?;
    let ttl = Duration::minutes(config.verification_ttl_minutes);
    let code = verification::issue(&mut *tx, user_id, email, ttl, now).await?;
    tx.commit().await?;

    tracing::info!(user_id, %username, "registered");
    send_code(&mailer, email, username, &code, config.verification_ttl_minutes).await;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "user registered, a confirmation code was sent to the email",
            "id": user_id,
            "email": email,
        })),
    )
        .into_response())
}

/// Mail failures are logged; the user can ask for the code again.
pub(crate) async fn send_code(mailer: &Mailer, email: &str, username: &str, code: &str, ttl_minutes: i64) {
    if let Err(err) = mailer.send_verification_code(email, username, code, ttl_minutes).await {
        tracing::warn!(%email, error = %err, "could not send confirmation code");
    }
}
