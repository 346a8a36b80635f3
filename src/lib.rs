pub mod announcements;
pub mod auth;
pub mod chat;
pub mod config;
pub mod db;
pub mod filter;
pub mod guides;
pub mod hooks;
pub mod mailer;
pub mod media;
pub mod profiles;
pub mod res;
pub mod reviews;
pub mod search;
pub mod session;
pub mod site;

use std::sync::Arc;

use axum::{extract::FromRef, http::StatusCode, response::{IntoResponse, Response}, Json, Router};
use serde_json::json;
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};
use tower_sessions::{cookie::SameSite, Expiry, MemoryStore, SessionManagerLayer};

pub use config::Config;
pub use mailer::Mailer;
pub use media::MediaStore;

#[derive(Clone, FromRef)]
pub struct AppState {
    pub db_pool: SqlitePool,
    pub config: Arc<Config>,
    pub mailer: Mailer,
    pub media: MediaStore,
    pub chat_tx: broadcast::Sender<chat::ChatEvent>,
}

impl AppState {
    pub fn new(config: Config, db_pool: SqlitePool) -> Self {
        let mailer = Mailer::from_config(&config);
        let media = MediaStore::new(&config.media_root);

        AppState {
            db_pool,
            config: Arc::new(config),
            mailer,
            media,
            chat_tx: broadcast::channel(256).0,
        }
    }
}

/// Builds the full application: pages, `/api`, media files and the session layer.
pub fn app(state: AppState) -> Router {
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(false)
        .with_same_site(SameSite::Lax)
        .with_expiry(Expiry::OnInactivity(time::Duration::minutes(
            state.config.session_idle_minutes,
        )));

    let api = Router::new()
        .merge(auth::api_router())
        .merge(search::router())
        .merge(site::api_router())
        .nest("/guides", guides::api_router())
        .nest("/reviews", reviews::router())
        .nest("/announcements", announcements::api_router())
        .nest("/profiles", profiles::api_router())
        .nest("/profile-comments", profiles::comments_router())
        .nest("/chat", chat::router())
        .nest("/media", media::router())
        .layer(CorsLayer::permissive());

    Router::new()
        .merge(site::router())
        .merge(auth::router())
        .nest("/guides", guides::router())
        .nest("/announcements", announcements::router())
        .nest("/users", profiles::router())
        .nest("/api", api)
        .nest_service("/media", ServeDir::new(&state.config.media_root))
        .fallback(res::not_found)
        .with_state(state)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn forbidden(msg: impl Into<String>) -> Self {
        Self::Forbidden(msg.into())
    }

    pub fn not_found(what: &str) -> Self {
        Self::NotFound(format!("{what} not found"))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Internal(err) => {
                tracing::error!(error = ?err, "request failed");
                "internal server error".to_owned()
            }
            other => other.to_string(),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

macro_rules! apperr_impl {
    ($E:ty) => {
        impl From<$E> for AppError {
            fn from(err: $E) -> Self {
                Self::Internal(anyhow::Error::from(err))
            }
        }
    };
}

apperr_impl!(sqlx::Error);
apperr_impl!(serde_json::Error);
apperr_impl!(tower_sessions::session::Error);
apperr_impl!(axum::Error);
apperr_impl!(reqwest::Error);
apperr_impl!(std::io::Error);
apperr_impl!(time::error::Format);

impl From<axum::extract::multipart::MultipartError> for AppError {
    fn from(err: axum::extract::multipart::MultipartError) -> Self {
        Self::BadRequest(err.body_text())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::BadRequest(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_statuses() {
        assert_eq!(AppError::bad_request("x").status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::forbidden("x").status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::not_found("guide").status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::not_found("guide").to_string(), "guide not found");
        assert_eq!(
            AppError::from(anyhow::anyhow!("boom")).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }
}
