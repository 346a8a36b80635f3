use serde::Serialize;
use sqlx::{FromRow, SqliteExecutor};
use time::OffsetDateTime;

use super::{serialize_display, UserId};
use crate::media;

#[derive(Debug, Clone, FromRow)]
pub struct Comment {
    pub id: i64,
    pub announcement_id: i64,
    pub author_id: UserId,
    pub author: String,
    pub author_avatar: Option<String>,
    pub content: String,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub is_edited: bool,
}

#[derive(Debug, Serialize)]
pub struct CommentView {
    pub id: i64,
    pub content: String,
    pub author: String,
    pub author_avatar: Option<String>,
    #[serde(serialize_with = "serialize_display")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub is_edited: bool,
    pub announcement_id: i64,
}

impl From<Comment> for CommentView {
    fn from(comment: Comment) -> Self {
        CommentView {
            id: comment.id,
            content: comment.content,
            author: comment.author,
            author_avatar: comment.author_avatar.as_deref().map(media::url),
            created_at: comment.created_at,
            updated_at: comment.updated_at,
            is_edited: comment.is_edited,
            announcement_id: comment.announcement_id,
        }
    }
}

const SELECT: &str = "SELECT c.id,c.announcement_id,c.author_id,u.username AS author,p.avatar AS author_avatar,\
    c.content,c.created_at,c.updated_at,c.is_edited FROM announcement_comments c \
    JOIN users u ON u.id=c.author_id LEFT JOIN profiles p ON p.user_id=c.author_id";

pub async fn find(db: impl SqliteExecutor<'_>, id: i64) -> sqlx::Result<Option<Comment>> {
    sqlx::query_as(&format!("{SELECT} WHERE c.id=?"))
        .bind(id)
        .fetch_optional(db)
        .await
}

/// Oldest first, the order they read in under an announcement.
pub async fn for_announcement(db: impl SqliteExecutor<'_>, announcement_id: i64) -> sqlx::Result<Vec<Comment>> {
    sqlx::query_as(&format!("{SELECT} WHERE c.announcement_id=? ORDER BY c.created_at, c.id"))
        .bind(announcement_id)
        .fetch_all(db)
        .await
}

pub async fn insert(
    db: impl SqliteExecutor<'_>,
    announcement_id: i64,
    author_id: UserId,
    content: &str,
    now: OffsetDateTime,
) -> sqlx::Result<i64> {
    let result = sqlx::query(
        "INSERT INTO announcement_comments (announcement_id,author_id,content,created_at,updated_at,is_edited) \
        VALUES (?,?,?,?,?,0)",
    )
    .bind(announcement_id)
    .bind(author_id)
    .bind(content)
    .bind(now)
    .bind(now)
    .execute(db)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn edit(db: impl SqliteExecutor<'_>, id: i64, content: &str, now: OffsetDateTime) -> sqlx::Result<()> {
    sqlx::query("UPDATE announcement_comments SET content=?, updated_at=?, is_edited=1 WHERE id=?")
        .bind(content)
        .bind(now)
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn delete(db: impl SqliteExecutor<'_>, id: i64) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM announcement_comments WHERE id=?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}
