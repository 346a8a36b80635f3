use serde::Serialize;
use sqlx::{FromRow, SqliteExecutor};
use time::OffsetDateTime;

use super::UserId;

#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub is_active: bool,
    pub date_joined: OffsetDateTime,
}

/// Body of `GET /api/me`.
#[derive(Debug, Serialize)]
pub struct CurrentUserView {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub date_joined: OffsetDateTime,
}

impl From<User> for CurrentUserView {
    fn from(user: User) -> Self {
        CurrentUserView {
            id: user.id,
            username: user.username,
            email: user.email,
            is_active: user.is_active,
            date_joined: user.date_joined,
        }
    }
}

const SELECT: &str = "SELECT id,username,email,password_hash,is_active,date_joined FROM users";

pub async fn find_by_id(db: impl SqliteExecutor<'_>, id: UserId) -> sqlx::Result<Option<User>> {
    sqlx::query_as(&format!("{SELECT} WHERE id=?"))
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn find_by_username(db: impl SqliteExecutor<'_>, username: &str) -> sqlx::Result<Option<User>> {
    sqlx::query_as(&format!("{SELECT} WHERE username=?"))
        .bind(username)
        .fetch_optional(db)
        .await
}

pub async fn find_by_email(db: impl SqliteExecutor<'_>, email: &str) -> sqlx::Result<Option<User>> {
    sqlx::query_as(&format!("{SELECT} WHERE email=?"))
        .bind(email)
        .fetch_optional(db)
        .await
}

pub async fn insert(
    db: impl SqliteExecutor<'_>,
    username: &str,
    email: &str,
    password_hash: &str,
    now: OffsetDateTime,
) -> sqlx::Result<UserId> {
    let result = sqlx::query(
        "INSERT INTO users (username,email,password_hash,is_active,date_joined) VALUES (?,?,?,0,?)",
    )
    .bind(username)
    .bind(email)
    .bind(password_hash)
    .bind(now)
    .execute(db)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn activate(db: impl SqliteExecutor<'_>, id: UserId) -> sqlx::Result<()> {
    sqlx::query("UPDATE users SET is_active=1 WHERE id=?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn rename(db: impl SqliteExecutor<'_>, id: UserId, username: &str) -> sqlx::Result<()> {
    sqlx::query("UPDATE users SET username=? WHERE id=?")
        .bind(username)
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}
