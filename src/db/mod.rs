//! Data access: one module of query helpers per table.

pub mod activity;
pub mod announcements;
pub mod chat;
pub mod comments;
pub mod guides;
pub mod profile_reviews;
pub mod profiles;
pub mod ratings;
pub mod reviews;
pub mod users;
pub mod verification;

use std::str::FromStr;

use serde::Serializer;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    Executor, SqlitePool,
};
use time::OffsetDateTime;

pub type UserId = i64;

pub async fn connect(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?
        .create_if_missing(true)
        .foreign_keys(true);

    SqlitePoolOptions::new()
        .max_connections(16)
        .connect_with(options)
        .await
}

pub async fn prepare_db(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    pool.execute(include_str!("../sql/schema.sql")).await?;
    Ok(())
}

/// Lower-case substring predicate for `column`, with the needle bound as a parameter.
pub(crate) fn contains(column: &str) -> String {
    format!("instr(lower({column}), lower(?)) > 0")
}

/// `dd.mm.yyyy HH:MM`, the format used by comment and activity views.
pub fn display_timestamp(at: OffsetDateTime) -> String {
    format!("{:02}.{:02}.{:04} {}", at.day(), u8::from(at.month()), at.year(), display_time(at))
}

/// `HH:MM`
pub fn display_time(at: OffsetDateTime) -> String {
    format!("{:02}:{:02}", at.hour(), at.minute())
}

pub(crate) fn serialize_display<S: Serializer>(at: &OffsetDateTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&display_timestamp(*at))
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn display_formats() {
        let at = datetime!(2025-01-05 09:07 UTC);
        assert_eq!(display_timestamp(at), "05.01.2025 09:07");
        assert_eq!(display_time(at), "09:07");
        assert_eq!(display_timestamp(datetime!(2025-12-31 23:59:59.9 UTC)), "31.12.2025 23:59");
    }
}
