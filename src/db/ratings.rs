use sqlx::SqliteExecutor;
use time::OffsetDateTime;

use super::UserId;

/// Records `reviewer`'s vote on a guide, replacing any earlier vote.
pub async fn upsert(
    db: impl SqliteExecutor<'_>,
    guide_id: i64,
    reviewer_id: UserId,
    rating: i64,
    now: OffsetDateTime,
) -> sqlx::Result<()> {
    sqlx::query(
        "INSERT INTO guide_ratings (guide_id,reviewer_id,rating,created_at) VALUES (?,?,?,?) \
        ON CONFLICT (guide_id,reviewer_id) DO UPDATE SET rating=excluded.rating",
    )
    .bind(guide_id)
    .bind(reviewer_id)
    .bind(rating)
    .bind(now)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn find(db: impl SqliteExecutor<'_>, guide_id: i64, reviewer_id: UserId) -> sqlx::Result<Option<i64>> {
    sqlx::query_scalar("SELECT rating FROM guide_ratings WHERE guide_id=? AND reviewer_id=?")
        .bind(guide_id)
        .bind(reviewer_id)
        .fetch_optional(db)
        .await
}

/// `(sum, count)` over every vote on the guide: review stars and rating-only votes.
pub async fn vote_totals(db: impl SqliteExecutor<'_>, guide_id: i64) -> sqlx::Result<(i64, i64)> {
    sqlx::query_as(
        "SELECT COALESCE(SUM(score),0), COUNT(*) FROM (\
            SELECT stars AS score FROM reviews WHERE guide_id=? \
            UNION ALL \
            SELECT rating AS score FROM guide_ratings WHERE guide_id=?)",
    )
    .bind(guide_id)
    .bind(guide_id)
    .fetch_one(db)
    .await
}

/// `(sum, count)` over the `rating` of every guide by `author_id`.
pub async fn author_totals(db: impl SqliteExecutor<'_>, author_id: UserId) -> sqlx::Result<(i64, i64)> {
    sqlx::query_as("SELECT COALESCE(SUM(rating),0), COUNT(*) FROM guides WHERE author_id=?")
        .bind(author_id)
        .fetch_one(db)
        .await
}
