use std::sync::Arc;

use axum::{debug_handler, extract::State, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use sqlx::SqlitePool;
use time::{Duration, OffsetDateTime};

use crate::{
    db::{users, verification},
    AppError, AppResult, AppState, Config, Mailer,
};

#[derive(Debug, Deserialize)]
pub struct VerifyBody {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    code: Option<String>,
}

#[debug_handler]
pub async fn verify_email(
    State(db_pool): State<SqlitePool>,
    Json(body): Json<VerifyBody>,
) -> AppResult<Json<Value>> {
    let (Some(email), Some(code)) = (
        body.email.as_deref().map(str::trim).filter(|e| !e.is_empty()),
        body.code.as_deref().map(str::trim).filter(|c| !c.is_empty()),
    ) else {
        return Err(AppError::bad_request("email and code are required"));
    };

    let user = users::find_by_email(&db_pool, email)
        .await?
        .ok_or_else(|| AppError::not_found("user"))?;

    let mut tx = db_pool.begin().await?;
    let Some(found) = verification::latest_unused(&mut *tx, user.id, code).await? else {
        return Err(AppError::bad_request("invalid confirmation code"));
    };
    if found.is_expired(OffsetDateTime::now_utc()) {
        return Err(AppError::bad_request("confirmation code expired, request a new one"));
    }

    verification::mark_used(&mut *tx, found.id).await?;
    users::activate(&mut *tx, user.id).await?;
    tx.commit().await?;

    tracing::info!(user_id = user.id, "email confirmed");
    Ok(Json(json!({
        "message": "email confirmed",
        "username": user.username,
    })))
}

#[derive(Debug, Deserialize)]
pub struct ResendBody {
    #[serde(default)]
    email: Option<String>,
}

#[debug_handler(state = AppState)]
pub(crate) async fn resend_code(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
    State(mailer): State<Mailer>,
    Json(body): Json<ResendBody>,
) -> AppResult<Json<Value>> {
    let Some(email) = body.email.as_deref().map(str::trim).filter(|e| !e.is_empty()) else {
        return Err(AppError::bad_request("email is required"));
    };

    let user = users::find_by_email(&db_pool, email)
        .await?
        .ok_or_else(|| AppError::bad_request("user not found"))?;
    if user.is_active {
        return Err(AppError::bad_request("email already confirmed"));
    }

    let ttl = Duration::minutes(config.verification_ttl_minutes);
    let code = verification::issue(&db_pool, user.id, email, ttl, OffsetDateTime::now_utc()).await?;
    super::register::send_code(&mailer, email, &user.username, &code, config.verification_ttl_minutes).await;

    Ok(Json(json!({ "message": "a new confirmation code was sent" })))
}
