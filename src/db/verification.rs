use rand::seq::IndexedRandom;
use sqlx::{FromRow, SqliteExecutor};
use time::{Duration, OffsetDateTime};

use super::UserId;

pub const CODE_LEN: usize = 6;

#[derive(Debug, Clone, FromRow)]
pub struct VerificationCode {
    pub id: i64,
    pub user_id: UserId,
    pub code: String,
    pub email: String,
    pub created_at: OffsetDateTime,
    pub is_used: bool,
    pub expires_at: OffsetDateTime,
}

impl VerificationCode {
    pub fn is_expired(&self, now: OffsetDateTime) -> bool {
        now > self.expires_at
    }
}

pub fn generate_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LEN)
        .filter_map(|_| b"0123456789".choose(&mut rng).map(|&d| d as char))
        .collect()
}

/// Stores a fresh code for `user_id` that stays valid for `ttl`.
pub async fn issue(
    db: impl SqliteExecutor<'_>,
    user_id: UserId,
    email: &str,
    ttl: Duration,
    now: OffsetDateTime,
) -> sqlx::Result<String> {
    let code = generate_code();

    sqlx::query(
        "INSERT INTO email_verification_codes (user_id,code,email,created_at,is_used,expires_at) \
        VALUES (?,?,?,?,0,?)",
    )
    .bind(user_id)
    .bind(&code)
    .bind(email)
    .bind(now)
    .bind(now + ttl)
    .execute(db)
    .await?;

    Ok(code)
}

/// The most recent unused code for `user_id` equal to `code`.
pub async fn latest_unused(db: impl SqliteExecutor<'_>, user_id: UserId, code: &str) -> sqlx::Result<Option<VerificationCode>> {
    sqlx::query_as(
        "SELECT id,user_id,code,email,created_at,is_used,expires_at FROM email_verification_codes \
        WHERE user_id=? AND code=? AND is_used=0 ORDER BY created_at DESC, id DESC LIMIT 1",
    )
    .bind(user_id)
    .bind(code)
    .fetch_optional(db)
    .await
}

pub async fn mark_used(db: impl SqliteExecutor<'_>, id: i64) -> sqlx::Result<()> {
    sqlx::query("UPDATE email_verification_codes SET is_used=1 WHERE id=?")
        .bind(id)
        .execute(db)
        .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn codes_are_six_digits() {
        for _ in 0..32 {
            let code = generate_code();
            assert_eq!(code.len(), CODE_LEN);
            assert!(code.bytes().all(|b| b.is_ascii_digit()));
        }
    }

    #[test]
    fn expiry_is_exclusive() {
        let issued = datetime!(2025-01-01 12:00 UTC);
        let code = VerificationCode {
            id: 1,
            user_id: 1,
            code: "123456".into(),
            email: "a@b.c".into(),
            created_at: issued,
            is_used: false,
            expires_at: issued + Duration::minutes(15),
        };
        assert!(!code.is_expired(issued + Duration::minutes(15)));
        assert!(code.is_expired(issued + Duration::minutes(16)));
    }
}
