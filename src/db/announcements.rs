use serde::Serialize;
use sqlx::{types::Json, FromRow, SqliteExecutor};
use time::OffsetDateTime;

use super::{contains, UserId};
use crate::media;

#[derive(Debug, Clone, FromRow)]
pub struct Announcement {
    pub id: i64,
    pub author_id: UserId,
    pub author_name: String,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub tags: Json<Vec<String>>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnnouncementDraft {
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub tags: Vec<String>,
}

impl AnnouncementDraft {
    pub fn of(announcement: &Announcement) -> Self {
        AnnouncementDraft {
            title: announcement.title.clone(),
            description: announcement.description.clone(),
            image: announcement.image.clone(),
            tags: announcement.tags.0.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AnnouncementView {
    pub id: i64,
    pub title: String,
    pub description: String,
    pub image: Option<String>,
    pub author: String,
    pub tags: Vec<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<Announcement> for AnnouncementView {
    fn from(announcement: Announcement) -> Self {
        AnnouncementView {
            id: announcement.id,
            title: announcement.title,
            description: announcement.description,
            image: announcement.image.as_deref().map(media::url),
            author: announcement.author_name,
            tags: announcement.tags.0,
            created_at: announcement.created_at,
            updated_at: announcement.updated_at,
        }
    }
}

const SELECT: &str = "SELECT a.id,a.author_id,u.username AS author_name,a.title,a.description,a.image,a.tags,\
    a.created_at,a.updated_at FROM announcements a JOIN users u ON u.id=a.author_id";

const NEWEST: &str = "ORDER BY a.created_at DESC, a.id DESC";

pub async fn all(db: impl SqliteExecutor<'_>) -> sqlx::Result<Vec<Announcement>> {
    sqlx::query_as(&format!("{SELECT} {NEWEST}"))
        .fetch_all(db)
        .await
}

pub async fn latest(db: impl SqliteExecutor<'_>, limit: i64) -> sqlx::Result<Vec<Announcement>> {
    sqlx::query_as(&format!("{SELECT} {NEWEST} LIMIT ?"))
        .bind(limit)
        .fetch_all(db)
        .await
}

pub async fn find(db: impl SqliteExecutor<'_>, id: i64) -> sqlx::Result<Option<Announcement>> {
    sqlx::query_as(&format!("{SELECT} WHERE a.id=?"))
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn by_author(db: impl SqliteExecutor<'_>, author_id: UserId) -> sqlx::Result<Vec<Announcement>> {
    sqlx::query_as(&format!("{SELECT} WHERE a.author_id=? {NEWEST}"))
        .bind(author_id)
        .fetch_all(db)
        .await
}

pub async fn with_title(db: impl SqliteExecutor<'_>, title: &str) -> sqlx::Result<Vec<Announcement>> {
    sqlx::query_as(&format!("{SELECT} WHERE {} {NEWEST}", contains("a.title")))
        .bind(title)
        .fetch_all(db)
        .await
}

/// Title or description contains `query`.
pub async fn text_search(db: impl SqliteExecutor<'_>, query: &str, limit: i64) -> sqlx::Result<Vec<Announcement>> {
    sqlx::query_as(&format!(
        "{SELECT} WHERE {} OR {} {NEWEST} LIMIT ?",
        contains("a.title"),
        contains("a.description")
    ))
    .bind(query)
    .bind(query)
    .bind(limit)
    .fetch_all(db)
    .await
}

pub async fn insert(
    db: impl SqliteExecutor<'_>,
    author_id: UserId,
    draft: &AnnouncementDraft,
    now: OffsetDateTime,
) -> sqlx::Result<i64> {
    let result = sqlx::query(
        "INSERT INTO announcements (author_id,title,description,image,tags,created_at,updated_at) \
        VALUES (?,?,?,?,?,?,?)",
    )
    .bind(author_id)
    .bind(&draft.title)
    .bind(&draft.description)
    .bind(&draft.image)
    .bind(Json(&draft.tags))
    .bind(now)
    .bind(now)
    .execute(db)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update(db: impl SqliteExecutor<'_>, id: i64, draft: &AnnouncementDraft, now: OffsetDateTime) -> sqlx::Result<()> {
    sqlx::query("UPDATE announcements SET title=?, description=?, image=?, tags=?, updated_at=? WHERE id=?")
        .bind(&draft.title)
        .bind(&draft.description)
        .bind(&draft.image)
        .bind(Json(&draft.tags))
        .bind(now)
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn delete(db: impl SqliteExecutor<'_>, id: i64) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM announcements WHERE id=?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}
