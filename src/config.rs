//! Runtime configuration, read from the environment (and `.env` when present).

use std::str::FromStr;

/// Settings for the web application.
#[derive(Debug, Clone)]
pub struct Config {
    /// SQLite connection string, e.g. `sqlite://skillissue.db?mode=rwc`
    pub database_url: String,
    /// Address the HTTP listener binds to
    pub bind_addr: String,
    /// Public base URL used to build absolute media links
    pub public_url: String,
    /// Directory uploaded media is stored in and served from
    pub media_root: String,
    pub session_idle_minutes: i64,
    /// Lifetime of an email verification code
    pub verification_ttl_minutes: i64,
    /// HTTP endpoint outgoing mail is posted to; mail is only logged when unset
    pub mail_relay_url: Option<String>,
    pub mail_from: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite://skillissue.db?mode=rwc".to_owned(),
            bind_addr: "0.0.0.0:8080".to_owned(),
            public_url: "http://localhost:8080".to_owned(),
            media_root: "media".to_owned(),
            session_idle_minutes: 60 * 24,
            verification_ttl_minutes: 15,
            mail_relay_url: None,
            mail_from: "no-reply@skillissue.local".to_owned(),
        }
    }
}

impl Config {
    /// Create config from environment variables
    ///
    /// Reads `DATABASE_URL`, `BIND_ADDR`, `PUBLIC_URL`, `MEDIA_ROOT`,
    /// `SESSION_IDLE_MINUTES`, `VERIFICATION_TTL_MINUTES`, `MAIL_RELAY_URL`
    /// and `MAIL_FROM`, falling back to [`Config::default`] for anything unset.
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            database_url: dotenv::var("DATABASE_URL").unwrap_or(defaults.database_url),
            bind_addr: dotenv::var("BIND_ADDR").unwrap_or(defaults.bind_addr),
            public_url: dotenv::var("PUBLIC_URL")
                .map(|url| url.trim_end_matches('/').to_owned())
                .unwrap_or(defaults.public_url),
            media_root: dotenv::var("MEDIA_ROOT").unwrap_or(defaults.media_root),
            session_idle_minutes: parsed("SESSION_IDLE_MINUTES", defaults.session_idle_minutes)?,
            verification_ttl_minutes: parsed(
                "VERIFICATION_TTL_MINUTES",
                defaults.verification_ttl_minutes,
            )?,
            mail_relay_url: dotenv::var("MAIL_RELAY_URL").ok().filter(|url| !url.is_empty()),
            mail_from: dotenv::var("MAIL_FROM").unwrap_or(defaults.mail_from),
        })
    }
}

fn parsed<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match dotenv::var(key) {
        Ok(raw) => raw
            .parse()
            .map_err(|err| anyhow::anyhow!("{key}={raw:?} is invalid: {err}")),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_usable() {
        let config = Config::default();
        assert_eq!(config.verification_ttl_minutes, 15);
        assert!(config.mail_relay_url.is_none());
        assert!(!config.public_url.ends_with('/'));
    }

    #[test]
    fn parsed_falls_back_when_unset() {
        let value: i64 = parsed("SKILLISSUE_SURELY_UNSET_KEY", 42).unwrap();
        assert_eq!(value, 42);
    }
}
