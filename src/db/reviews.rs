use serde::Serialize;
use sqlx::{FromRow, SqliteExecutor};
use time::OffsetDateTime;

use super::UserId;
use crate::media;

#[derive(Debug, Clone, FromRow)]
pub struct Review {
    pub id: i64,
    pub guide_id: i64,
    pub author_id: UserId,
    pub author_username: String,
    pub author_avatar: Option<String>,
    pub text: String,
    pub stars: i64,
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct ReviewView {
    pub id: i64,
    pub author_username: String,
    pub author_avatar: Option<String>,
    pub text: String,
    pub stars: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Review> for ReviewView {
    fn from(review: Review) -> Self {
        ReviewView {
            id: review.id,
            author_username: review.author_username,
            author_avatar: review.author_avatar.as_deref().map(media::url),
            text: review.text,
            stars: review.stars,
            created_at: review.created_at,
        }
    }
}

const SELECT: &str = "SELECT r.id,r.guide_id,r.author_id,u.username AS author_username,p.avatar AS author_avatar,\
    r.text,r.stars,r.created_at FROM reviews r JOIN users u ON u.id=r.author_id \
    LEFT JOIN profiles p ON p.user_id=r.author_id";

pub async fn find(db: impl SqliteExecutor<'_>, id: i64) -> sqlx::Result<Option<Review>> {
    sqlx::query_as(&format!("{SELECT} WHERE r.id=?"))
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn exists_for(db: impl SqliteExecutor<'_>, guide_id: i64, author_id: UserId) -> sqlx::Result<bool> {
    sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM reviews WHERE guide_id=? AND author_id=?)")
        .bind(guide_id)
        .bind(author_id)
        .fetch_one(db)
        .await
}

pub async fn for_guide(db: impl SqliteExecutor<'_>, guide_id: i64) -> sqlx::Result<Vec<Review>> {
    sqlx::query_as(&format!("{SELECT} WHERE r.guide_id=? ORDER BY r.created_at DESC, r.id DESC"))
        .bind(guide_id)
        .fetch_all(db)
        .await
}

/// Reviews left on any guide written by `author_id`.
pub async fn on_guides_of(db: impl SqliteExecutor<'_>, author_id: UserId) -> sqlx::Result<Vec<Review>> {
    sqlx::query_as(&format!(
        "{SELECT} JOIN guides g ON g.id=r.guide_id WHERE g.author_id=? ORDER BY r.created_at DESC, r.id DESC"
    ))
    .bind(author_id)
    .fetch_all(db)
    .await
}

pub async fn insert(
    db: impl SqliteExecutor<'_>,
    guide_id: i64,
    author_id: UserId,
    text: &str,
    stars: i64,
    now: OffsetDateTime,
) -> sqlx::Result<i64> {
    let result = sqlx::query("INSERT INTO reviews (guide_id,author_id,text,stars,created_at) VALUES (?,?,?,?,?)")
        .bind(guide_id)
        .bind(author_id)
        .bind(text)
        .bind(stars)
        .bind(now)
        .execute(db)
        .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update(db: impl SqliteExecutor<'_>, id: i64, text: &str, stars: i64) -> sqlx::Result<()> {
    sqlx::query("UPDATE reviews SET text=?, stars=? WHERE id=?")
        .bind(text)
        .bind(stars)
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn delete(db: impl SqliteExecutor<'_>, id: i64) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM reviews WHERE id=?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}
