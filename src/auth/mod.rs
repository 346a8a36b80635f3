mod login;
mod logout;
mod register;
mod verify;

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    routing::{get, post},
    Router,
};

use crate::{AppResult, AppState};

pub use login::login;
pub use logout::logout;
pub use register::register;
pub use verify::verify_email;

/// Pages: `/login`, `/register`, `/logout`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/login", get(login::login_page))
        .route("/register", get(register::register_page))
        .route("/logout", get(logout::logout))
}

pub fn api_router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register::register))
        .route("/login", post(login::login))
        .route("/verify-email", post(verify::verify_email))
        .route("/resend-code", post(verify::resend_code))
        .route("/me", get(login::me))
}

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| anyhow::anyhow!("hashing password: {err}"))?
        .to_string();
    Ok(hash)
}

/// False for a wrong password and for a stored hash that doesn't parse.
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(hash) = PasswordHash::new(hash) else {
        tracing::warn!("stored password hash is not a PHC string");
        return false;
    };
    Argon2::default().verify_password(password.as_bytes(), &hash).is_ok()
}
