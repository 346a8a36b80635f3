use serde::Serialize;
use sqlx::{types::Json, FromRow, QueryBuilder, Sqlite, SqliteExecutor};
use time::OffsetDateTime;

use super::{contains, UserId};
use crate::media;

#[derive(Debug, Clone, FromRow)]
pub struct Guide {
    pub id: i64,
    pub author_id: UserId,
    pub author_name: String,
    pub title: String,
    pub content: String,
    pub image: Option<String>,
    pub tags: Json<Vec<String>>,
    pub rating: i64,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// The author-editable fields of a guide.
#[derive(Debug, Clone, PartialEq)]
pub struct GuideDraft {
    pub title: String,
    pub content: String,
    pub image: Option<String>,
    pub tags: Vec<String>,
}

impl GuideDraft {
    pub fn of(guide: &Guide) -> Self {
        GuideDraft {
            title: guide.title.clone(),
            content: guide.content.clone(),
            image: guide.image.clone(),
            tags: guide.tags.0.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct GuideView {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub image: Option<String>,
    pub tags: Vec<String>,
    pub rating: i64,
    pub author_name: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Guide> for GuideView {
    fn from(guide: Guide) -> Self {
        GuideView {
            id: guide.id,
            title: guide.title,
            content: guide.content,
            image: guide.image.as_deref().map(media::url),
            tags: guide.tags.0,
            rating: guide.rating,
            author_name: guide.author_name,
            created_at: guide.created_at,
        }
    }
}

#[derive(Debug, Serialize, FromRow)]
pub struct GuideSummary {
    pub id: i64,
    pub title: String,
    pub author: String,
    pub rating: i64,
}

/// Optional conditions for [`search`]; unset fields don't filter.
#[derive(Debug, Default, serde::Deserialize)]
pub struct GuideSearch {
    pub title: Option<String>,
    pub author: Option<String>,
    pub tag: Option<String>,
    pub min_rating: Option<i64>,
}

const SELECT: &str = "SELECT g.id,g.author_id,u.username AS author_name,g.title,g.content,g.image,g.tags,\
    g.rating,g.created_at,g.updated_at FROM guides g JOIN users u ON u.id=g.author_id";

const BY_RATING: &str = "ORDER BY g.rating DESC, g.created_at DESC, g.id DESC";

pub async fn all(db: impl SqliteExecutor<'_>) -> sqlx::Result<Vec<Guide>> {
    sqlx::query_as(&format!("{SELECT} {BY_RATING}"))
        .fetch_all(db)
        .await
}

pub async fn top_rated(db: impl SqliteExecutor<'_>, limit: i64) -> sqlx::Result<Vec<Guide>> {
    sqlx::query_as(&format!("{SELECT} {BY_RATING} LIMIT ?"))
        .bind(limit)
        .fetch_all(db)
        .await
}

pub async fn find(db: impl SqliteExecutor<'_>, id: i64) -> sqlx::Result<Option<Guide>> {
    sqlx::query_as(&format!("{SELECT} WHERE g.id=?"))
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn by_author(db: impl SqliteExecutor<'_>, author_id: UserId) -> sqlx::Result<Vec<Guide>> {
    sqlx::query_as(&format!("{SELECT} WHERE g.author_id=? ORDER BY g.created_at DESC, g.id DESC"))
        .bind(author_id)
        .fetch_all(db)
        .await
}

pub async fn with_title(db: impl SqliteExecutor<'_>, title: &str) -> sqlx::Result<Vec<Guide>> {
    sqlx::query_as(&format!("{SELECT} WHERE {} ORDER BY g.created_at DESC, g.id DESC", contains("g.title")))
        .bind(title)
        .fetch_all(db)
        .await
}

/// Title or body contains `query`.
pub async fn text_search(db: impl SqliteExecutor<'_>, query: &str, limit: i64) -> sqlx::Result<Vec<Guide>> {
    sqlx::query_as(&format!(
        "{SELECT} WHERE {} OR {} {BY_RATING} LIMIT ?",
        contains("g.title"),
        contains("g.content")
    ))
    .bind(query)
    .bind(query)
    .bind(limit)
    .fetch_all(db)
    .await
}

pub async fn search(db: impl SqliteExecutor<'_>, params: &GuideSearch) -> sqlx::Result<Vec<Guide>> {
    let mut query = QueryBuilder::<Sqlite>::new(SELECT);
    query.push(" WHERE 1=1");

    if let Some(title) = params.title.as_deref().filter(|t| !t.is_empty()) {
        query.push(" AND instr(lower(g.title), lower(").push_bind(title).push(")) > 0");
    }
    if let Some(author) = params.author.as_deref().filter(|a| !a.is_empty()) {
        query.push(" AND u.username=").push_bind(author);
    }
    if let Some(tag) = params.tag.as_deref().filter(|t| !t.is_empty()) {
        query
            .push(" AND EXISTS (SELECT 1 FROM json_each(g.tags) WHERE json_each.value=")
            .push_bind(tag)
            .push(")");
    }
    if let Some(min_rating) = params.min_rating {
        query.push(" AND g.rating>=").push_bind(min_rating);
    }

    query.push(" ").push(BY_RATING);
    query.build_query_as::<Guide>().fetch_all(db).await
}

pub async fn summaries(db: impl SqliteExecutor<'_>) -> sqlx::Result<Vec<GuideSummary>> {
    sqlx::query_as(&format!(
        "SELECT g.id,g.title,u.username AS author,g.rating FROM guides g \
        JOIN users u ON u.id=g.author_id {BY_RATING}"
    ))
    .fetch_all(db)
    .await
}

pub async fn insert(db: impl SqliteExecutor<'_>, author_id: UserId, draft: &GuideDraft, now: OffsetDateTime) -> sqlx::Result<i64> {
    let result = sqlx::query(
        "INSERT INTO guides (author_id,title,content,image,tags,rating,created_at,updated_at) \
        VALUES (?,?,?,?,?,0,?,?)",
    )
    .bind(author_id)
    .bind(&draft.title)
    .bind(&draft.content)
    .bind(&draft.image)
    .bind(Json(&draft.tags))
    .bind(now)
    .bind(now)
    .execute(db)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn update(db: impl SqliteExecutor<'_>, id: i64, draft: &GuideDraft, now: OffsetDateTime) -> sqlx::Result<()> {
    sqlx::query("UPDATE guides SET title=?, content=?, image=?, tags=?, updated_at=? WHERE id=?")
        .bind(&draft.title)
        .bind(&draft.content)
        .bind(&draft.image)
        .bind(Json(&draft.tags))
        .bind(now)
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn set_rating(db: impl SqliteExecutor<'_>, id: i64, rating: i64) -> sqlx::Result<()> {
    sqlx::query("UPDATE guides SET rating=? WHERE id=?")
        .bind(rating)
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn delete(db: impl SqliteExecutor<'_>, id: i64) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM guides WHERE id=?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}
