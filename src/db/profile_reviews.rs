use serde::Serialize;
use sqlx::{FromRow, SqliteExecutor};
use time::OffsetDateTime;

use super::{serialize_display, UserId};
use crate::media;

/// A comment one user leaves on another user's profile.
#[derive(Debug, Clone, FromRow)]
pub struct ProfileReview {
    pub id: i64,
    pub reviewer_id: UserId,
    pub author: String,
    pub author_avatar: Option<String>,
    pub profile_id: i64,
    pub profile: String,
    pub comment: String,
    pub created_at: OffsetDateTime,
    pub is_edited: bool,
}

#[derive(Debug, Serialize)]
pub struct ProfileReviewView {
    pub id: i64,
    pub comment: String,
    pub author: String,
    pub author_avatar: Option<String>,
    pub profile: String,
    #[serde(serialize_with = "serialize_display")]
    pub created_at: OffsetDateTime,
    pub is_edited: bool,
}

impl ProfileReviewView {
    pub fn new(review: ProfileReview, public_url: &str) -> Self {
        ProfileReviewView {
            id: review.id,
            comment: review.comment,
            author: review.author,
            author_avatar: review
                .author_avatar
                .as_deref()
                .map(|avatar| media::absolute_url(public_url, avatar)),
            profile: review.profile,
            created_at: review.created_at,
            is_edited: review.is_edited,
        }
    }
}

const SELECT: &str = "SELECT pr.id,pr.reviewer_id,ru.username AS author,rp.avatar AS author_avatar,\
    pr.profile_id,tu.username AS profile,pr.comment,pr.created_at,pr.is_edited \
    FROM profile_reviews pr \
    JOIN users ru ON ru.id=pr.reviewer_id \
    LEFT JOIN profiles rp ON rp.user_id=pr.reviewer_id \
    JOIN profiles tp ON tp.id=pr.profile_id \
    JOIN users tu ON tu.id=tp.user_id";

pub async fn find(db: impl SqliteExecutor<'_>, id: i64) -> sqlx::Result<Option<ProfileReview>> {
    sqlx::query_as(&format!("{SELECT} WHERE pr.id=?"))
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn find_pair(db: impl SqliteExecutor<'_>, reviewer_id: UserId, profile_id: i64) -> sqlx::Result<Option<ProfileReview>> {
    sqlx::query_as(&format!("{SELECT} WHERE pr.reviewer_id=? AND pr.profile_id=?"))
        .bind(reviewer_id)
        .bind(profile_id)
        .fetch_optional(db)
        .await
}

pub async fn for_profile(db: impl SqliteExecutor<'_>, profile_id: i64) -> sqlx::Result<Vec<ProfileReview>> {
    sqlx::query_as(&format!("{SELECT} WHERE pr.profile_id=? ORDER BY pr.created_at DESC, pr.id DESC"))
        .bind(profile_id)
        .fetch_all(db)
        .await
}

/// Writes the reviewer's comment on the profile, replacing the text of an earlier one.
pub async fn upsert(
    db: impl SqliteExecutor<'_>,
    reviewer_id: UserId,
    profile_id: i64,
    comment: &str,
    now: OffsetDateTime,
) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO profile_reviews (reviewer_id,profile_id,comment,created_at,is_edited) VALUES (?,?,?,?,0) \
        ON CONFLICT (reviewer_id,profile_id) DO UPDATE SET comment=excluded.comment",
    )
    .bind(reviewer_id)
    .bind(profile_id)
    .bind(comment)
    .bind(now)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn edit(db: impl SqliteExecutor<'_>, id: i64, comment: &str) -> sqlx::Result<()> {
    sqlx::query("UPDATE profile_reviews SET comment=?, is_edited=1 WHERE id=?")
        .bind(comment)
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

pub async fn delete(db: impl SqliteExecutor<'_>, id: i64) -> sqlx::Result<()> {
    sqlx::query("DELETE FROM profile_reviews WHERE id=?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}
