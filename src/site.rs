use axum::{
    debug_handler,
    extract::State,
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;

use crate::{
    announcements::pages::announcement_card,
    db::{announcements, guides},
    guides::pages::guide_card,
    include_res, res, AppError, AppResult, AppState,
};

const LANGUAGES: [&str; 2] = ["RU", "EN"];
const LANG_COOKIE_MAX_AGE: i64 = 60 * 60 * 24 * 365;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index))
        .route("/static/style.css", get(res::stylesheet))
}

pub fn api_router() -> Router<AppState> {
    Router::new().route("/set-language", post(set_language))
}

#[debug_handler]
pub async fn index(State(db_pool): State<SqlitePool>) -> AppResult<Response> {
    let guides: String = guides::top_rated(&db_pool, 6).await?.iter().map(guide_card).collect();
    let announcements: String = announcements::latest(&db_pool, 6)
        .await?
        .iter()
        .map(announcement_card)
        .collect();

    let body = include_res!(str, "/pages/index.html")
        .replace("{guides}", &guides)
        .replace("{announcements}", &announcements);

    Ok(res::page("SkillIssue", &body).into_response())
}

#[derive(Debug, Deserialize)]
pub struct LanguageBody {
    #[serde(default)]
    language: Option<String>,
}

/// Remembers the interface language in a year-long `lang` cookie.
#[debug_handler]
pub async fn set_language(Json(body): Json<LanguageBody>) -> AppResult<Response> {
    let language = body.language.as_deref().unwrap_or_default().trim().to_uppercase();
    if !LANGUAGES.contains(&language.as_str()) {
        return Err(AppError::bad_request("unsupported language"));
    }

    let cookie = format!("lang={language}; Max-Age={LANG_COOKIE_MAX_AGE}; Path=/; SameSite=Lax");
    Ok((
        [(header::SET_COOKIE, cookie)],
        Json(json!({ "success": true, "language": language })),
    )
        .into_response())
}
