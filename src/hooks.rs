//! Side effects that follow a write: rating recalculation and the activity log.
//!
//! Every hook takes the connection of the transaction that made the change,
//! so the effect commits or rolls back together with it.

use sqlx::SqliteConnection;
use time::OffsetDateTime;

use crate::db::{
    activity::{self, Action, Target},
    guides, profiles, ratings, UserId,
};

/// Mean of `count` values summing to `sum`, rounded half up. Zero when empty.
pub fn rounded_mean(sum: i64, count: i64) -> i64 {
    if count <= 0 {
        return 0;
    }
    (2 * sum + count) / (2 * count)
}

pub async fn refresh_guide_rating(conn: &mut SqliteConnection, guide_id: i64) -> sqlx::Result<i64> {
    let (sum, count) = ratings::vote_totals(&mut *conn, guide_id).await?;
    let rating = rounded_mean(sum, count);
    guides::set_rating(&mut *conn, guide_id, rating).await?;
    Ok(rating)
}

pub async fn refresh_profile_rating(conn: &mut SqliteConnection, author_id: UserId) -> sqlx::Result<i64> {
    let (sum, count) = ratings::author_totals(&mut *conn, author_id).await?;
    let rating = rounded_mean(sum, count);
    profiles::set_rating(&mut *conn, author_id, rating).await?;
    Ok(rating)
}

/// Recomputes a guide's rating and then its author's, returning both.
pub async fn refresh_ratings(conn: &mut SqliteConnection, guide_id: i64, author_id: UserId) -> sqlx::Result<(i64, i64)> {
    let guide_rating = refresh_guide_rating(conn, guide_id).await?;
    let profile_rating = refresh_profile_rating(conn, author_id).await?;
    Ok((guide_rating, profile_rating))
}

pub async fn record_created(
    conn: &mut SqliteConnection,
    user_id: UserId,
    target: Target,
    title: &str,
    now: OffsetDateTime,
) -> sqlx::Result<()> {
    tracing::debug!(user_id, ?target, "recording create");
    activity::insert(&mut *conn, user_id, Action::Create, target, title, now).await
}

/// Logs an update only when the author-visible fields actually changed.
pub async fn record_updated<T: PartialEq>(
    conn: &mut SqliteConnection,
    user_id: UserId,
    target: Target,
    before: &T,
    after: &T,
    title: &str,
    now: OffsetDateTime,
) -> sqlx::Result<bool> {
    if before == after {
        return Ok(false);
    }
    activity::insert(&mut *conn, user_id, Action::Update, target, title, now).await?;
    Ok(true)
}

/// The target row is already gone, so only the title survives in the entry.
pub async fn record_deleted(
    conn: &mut SqliteConnection,
    user_id: UserId,
    target: Target,
    title: &str,
    now: OffsetDateTime,
) -> sqlx::Result<()> {
    let target = match target {
        Target::Guide(_) => Target::Guide(None),
        Target::Announcement(_) => Target::Announcement(None),
    };
    activity::insert(&mut *conn, user_id, Action::Delete, target, title, now).await
}

/// Deletes a guide, logs it and recomputes the author's profile rating.
pub async fn delete_guide(conn: &mut SqliteConnection, guide: &guides::Guide, now: OffsetDateTime) -> sqlx::Result<i64> {
    guides::delete(&mut *conn, guide.id).await?;
    record_deleted(conn, guide.author_id, Target::Guide(Some(guide.id)), &guide.title, now).await?;
    refresh_profile_rating(conn, guide.author_id).await
}

#[cfg(test)]
mod tests {
    use super::rounded_mean;

    #[test]
    fn rounds_half_up() {
        assert_eq!(rounded_mean(0, 0), 0);
        assert_eq!(rounded_mean(5, 1), 5);
        assert_eq!(rounded_mean(7, 2), 4);
        assert_eq!(rounded_mean(5, 2), 3);
        assert_eq!(rounded_mean(4, 3), 1);
        assert_eq!(rounded_mean(5, 3), 2);
        assert_eq!(rounded_mean(13, 3), 4);
    }
}
