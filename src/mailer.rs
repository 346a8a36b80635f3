//! Outgoing mail. Without a relay configured, messages only go to the log.

use serde::Serialize;

use crate::{AppResult, Config};

#[derive(Debug, Clone)]
pub enum Mailer {
    Log,
    Relay {
        client: reqwest::Client,
        url: String,
        from: String,
    },
}

#[derive(Debug, Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: &'a str,
}

impl Mailer {
    pub fn from_config(config: &Config) -> Self {
        match &config.mail_relay_url {
            Some(url) => Mailer::Relay {
                client: reqwest::Client::new(),
                url: url.clone(),
                from: config.mail_from.clone(),
            },
            None => Mailer::Log,
        }
    }

    pub async fn send(&self, to: &str, subject: &str, text: &str) -> AppResult<()> {
        match self {
            Mailer::Log => {
                tracing::info!(%to, %subject, "mail not sent, no relay configured:\n{text}");
            }
            Mailer::Relay { client, url, from } => {
                client
                    .post(url)
                    .json(&RelayMessage { from, to, subject, text })
                    .send()
                    .await?
                    .error_for_status()?;
                tracing::info!(%to, %subject, "mail sent");
            }
        }
        Ok(())
    }

    pub async fn send_verification_code(&self, to: &str, username: &str, code: &str, ttl_minutes: i64) -> AppResult<()> {
        self.send(to, "Your SkillIssue confirmation code", &verification_text(username, code, ttl_minutes))
            .await
    }
}

fn verification_text(username: &str, code: &str, ttl_minutes: i64) -> String {
    format!(
        "Hello, {username}!\n\n\
        Your email confirmation code: {code}\n\n\
        The code is valid for {ttl_minutes} minutes.\n\n\
        If you did not register on SkillIssue, just ignore this message."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relay_only_when_configured() {
        let mut config = Config::default();
        assert!(matches!(Mailer::from_config(&config), Mailer::Log));

        config.mail_relay_url = Some("http://relay.local/send".into());
        assert!(matches!(Mailer::from_config(&config), Mailer::Relay { .. }));
    }

    #[test]
    fn verification_text_carries_code() {
        let text = verification_text("ann", "042137", 15);
        assert!(text.contains("ann"));
        assert!(text.contains("042137"));
        assert!(text.contains("15 minutes"));
    }
}
