use sqlx::{FromRow, SqliteExecutor};
use time::OffsetDateTime;

use super::{contains, UserId};

#[derive(Debug, Clone, FromRow)]
pub struct Profile {
    pub id: i64,
    pub user_id: UserId,
    pub username: String,
    pub bio: String,
    pub avatar: Option<String>,
    pub rating: i64,
    pub created_at: OffsetDateTime,
}

const SELECT: &str = "SELECT p.id,p.user_id,u.username,p.bio,p.avatar,p.rating,p.created_at \
    FROM profiles p JOIN users u ON u.id=p.user_id";

pub async fn insert_for_user(db: impl SqliteExecutor<'_>, user_id: UserId, now: OffsetDateTime) -> sqlx::Result<()> {
    sqlx::query("INSERT INTO profiles (user_id,bio,rating,created_at) VALUES (?,'',0,?)")
        .bind(user_id)
        .bind(now)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn find_by_username(db: impl SqliteExecutor<'_>, username: &str) -> sqlx::Result<Option<Profile>> {
    sqlx::query_as(&format!("{SELECT} WHERE u.username=?"))
        .bind(username)
        .fetch_optional(db)
        .await
}

pub async fn find_by_user(db: impl SqliteExecutor<'_>, user_id: UserId) -> sqlx::Result<Option<Profile>> {
    sqlx::query_as(&format!("{SELECT} WHERE p.user_id=?"))
        .bind(user_id)
        .fetch_optional(db)
        .await
}

/// Replaces the bio; the avatar only changes when a new one is given.
pub async fn update(db: impl SqliteExecutor<'_>, user_id: UserId, bio: &str, avatar: Option<&str>) -> sqlx::Result<()> {
    sqlx::query("UPDATE profiles SET bio=?, avatar=COALESCE(?, avatar) WHERE user_id=?")
        .bind(bio)
        .bind(avatar)
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn set_rating(db: impl SqliteExecutor<'_>, user_id: UserId, rating: i64) -> sqlx::Result<()> {
    sqlx::query("UPDATE profiles SET rating=? WHERE user_id=?")
        .bind(rating)
        .bind(user_id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn all(db: impl SqliteExecutor<'_>) -> sqlx::Result<Vec<Profile>> {
    sqlx::query_as(&format!("{SELECT} ORDER BY u.username"))
        .fetch_all(db)
        .await
}

pub async fn search(db: impl SqliteExecutor<'_>, query: &str, limit: i64) -> sqlx::Result<Vec<Profile>> {
    sqlx::query_as(&format!("{SELECT} WHERE {} ORDER BY u.username LIMIT ?", contains("u.username")))
        .bind(query)
        .bind(limit)
        .fetch_all(db)
        .await
}
