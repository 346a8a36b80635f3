use std::collections::HashMap;

use serde::Serialize;
use sqlx::{FromRow, SqliteExecutor};
use time::OffsetDateTime;

use super::UserId;
use crate::media;

const PREVIEW_CHARS: usize = 200;

#[derive(Debug, Clone, FromRow)]
pub struct ChatMessage {
    pub id: i64,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub sender_username: String,
    pub receiver_username: String,
    pub sender_avatar: Option<String>,
    pub receiver_avatar: Option<String>,
    pub message: String,
    pub image: Option<String>,
    pub created_at: OffsetDateTime,
    pub is_read: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Outgoing,
    Incoming,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatMessageView {
    pub id: i64,
    pub sender: UserId,
    pub receiver: UserId,
    pub sender_username: String,
    pub receiver_username: String,
    pub message: String,
    pub image: Option<String>,
    pub image_url: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub is_read: bool,
    pub direction: Direction,
}

impl ChatMessageView {
    /// Shapes `msg` as seen by `viewer`.
    pub fn new(msg: ChatMessage, viewer: UserId, public_url: &str) -> Self {
        let direction = if msg.sender_id == viewer {
            Direction::Outgoing
        } else {
            Direction::Incoming
        };

        ChatMessageView {
            id: msg.id,
            sender: msg.sender_id,
            receiver: msg.receiver_id,
            sender_username: msg.sender_username,
            receiver_username: msg.receiver_username,
            message: msg.message,
            image_url: msg.image.as_deref().map(|image| media::absolute_url(public_url, image)),
            image: msg.image.as_deref().map(media::url),
            created_at: msg.created_at,
            is_read: msg.is_read,
            direction,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Contact {
    pub user_id: UserId,
    pub username: String,
    pub avatar: Option<String>,
    pub last_message: String,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_message_at: Option<OffsetDateTime>,
    pub unread_count: i64,
}

fn preview(msg: &ChatMessage) -> String {
    if !msg.message.trim().is_empty() {
        msg.message.chars().take(PREVIEW_CHARS).collect()
    } else if msg.image.is_some() {
        "Image".to_owned()
    } else {
        "No messages".to_owned()
    }
}

/// Folds `me`'s messages into one entry per counterpart.
///
/// `messages` must be newest first, as returned by [`involving`].
pub fn contacts(messages: &[ChatMessage], me: UserId) -> Vec<Contact> {
    let mut contacts: Vec<Contact> = Vec::new();
    let mut index: HashMap<UserId, usize> = HashMap::new();

    for msg in messages {
        let (user_id, username, avatar) = if msg.sender_id == me {
            (msg.receiver_id, &msg.receiver_username, &msg.receiver_avatar)
        } else {
            (msg.sender_id, &msg.sender_username, &msg.sender_avatar)
        };

        let slot = *index.entry(user_id).or_insert_with(|| {
            contacts.push(Contact {
                user_id,
                username: username.clone(),
                avatar: avatar.as_deref().map(media::url),
                last_message: preview(msg),
                last_message_at: Some(msg.created_at),
                unread_count: 0,
            });
            contacts.len() - 1
        });

        if msg.receiver_id == me && !msg.is_read {
            contacts[slot].unread_count += 1;
        }
    }

    // stable, so equal timestamps keep the newest-message-first order
    contacts.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));
    contacts
}

const SELECT: &str = "SELECT m.id,m.sender_id,m.receiver_id,su.username AS sender_username,\
    ru.username AS receiver_username,sp.avatar AS sender_avatar,rp.avatar AS receiver_avatar,\
    m.message,m.image,m.created_at,m.is_read FROM chat_messages m \
    JOIN users su ON su.id=m.sender_id JOIN users ru ON ru.id=m.receiver_id \
    LEFT JOIN profiles sp ON sp.user_id=m.sender_id LEFT JOIN profiles rp ON rp.user_id=m.receiver_id";

pub async fn find(db: impl SqliteExecutor<'_>, id: i64) -> sqlx::Result<Option<ChatMessage>> {
    sqlx::query_as(&format!("{SELECT} WHERE m.id=?"))
        .bind(id)
        .fetch_optional(db)
        .await
}

pub async fn insert(
    db: impl SqliteExecutor<'_>,
    sender_id: UserId,
    receiver_id: UserId,
    message: &str,
    image: Option<&str>,
    now: OffsetDateTime,
) -> sqlx::Result<i64> {
    let result = sqlx::query(
        "INSERT INTO chat_messages (sender_id,receiver_id,message,image,created_at,is_read) VALUES (?,?,?,?,?,0)",
    )
    .bind(sender_id)
    .bind(receiver_id)
    .bind(message)
    .bind(image)
    .bind(now)
    .execute(db)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Messages between `a` and `b`, oldest first.
pub async fn thread(db: impl SqliteExecutor<'_>, a: UserId, b: UserId) -> sqlx::Result<Vec<ChatMessage>> {
    sqlx::query_as(&format!(
        "{SELECT} WHERE (m.sender_id=? AND m.receiver_id=?) OR (m.sender_id=? AND m.receiver_id=?) \
        ORDER BY m.created_at, m.id"
    ))
    .bind(a)
    .bind(b)
    .bind(b)
    .bind(a)
    .fetch_all(db)
    .await
}

/// Marks everything `sender` sent to `receiver` as read.
pub async fn mark_read(db: impl SqliteExecutor<'_>, sender: UserId, receiver: UserId) -> sqlx::Result<u64> {
    let result = sqlx::query("UPDATE chat_messages SET is_read=1 WHERE sender_id=? AND receiver_id=? AND is_read=0")
        .bind(sender)
        .bind(receiver)
        .execute(db)
        .await?;
    Ok(result.rows_affected())
}

/// Every message `user` sent or received, newest first.
pub async fn involving(db: impl SqliteExecutor<'_>, user: UserId) -> sqlx::Result<Vec<ChatMessage>> {
    sqlx::query_as(&format!(
        "{SELECT} WHERE m.sender_id=? OR m.receiver_id=? ORDER BY m.created_at DESC, m.id DESC"
    ))
    .bind(user)
    .bind(user)
    .fetch_all(db)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn msg(id: i64, from: UserId, to: UserId, text: &str, image: Option<&str>, at: OffsetDateTime, read: bool) -> ChatMessage {
        ChatMessage {
            id,
            sender_id: from,
            receiver_id: to,
            sender_username: format!("user{from}"),
            receiver_username: format!("user{to}"),
            sender_avatar: None,
            receiver_avatar: Some(format!("avatars/{to}.png")),
            message: text.to_owned(),
            image: image.map(str::to_owned),
            created_at: at,
            is_read: read,
        }
    }

    #[test]
    fn contacts_fold_newest_first() {
        let messages = vec![
            msg(4, 3, 1, "   ", Some("chat/x.png"), datetime!(2025-03-01 12:00 UTC), false),
            msg(3, 1, 2, "latest to two", None, datetime!(2025-03-01 11:00 UTC), false),
            msg(2, 2, 1, "unread", None, datetime!(2025-03-01 10:00 UTC), false),
            msg(1, 2, 1, "read", None, datetime!(2025-03-01 09:00 UTC), true),
        ];

        let contacts = contacts(&messages, 1);
        assert_eq!(contacts.len(), 2);

        assert_eq!(contacts[0].user_id, 3);
        assert_eq!(contacts[0].last_message, "Image");
        assert_eq!(contacts[0].unread_count, 1);
        assert_eq!(contacts[0].avatar, None);

        assert_eq!(contacts[1].user_id, 2);
        assert_eq!(contacts[1].username, "user2");
        assert_eq!(contacts[1].last_message, "latest to two");
        assert_eq!(contacts[1].unread_count, 1);
        assert_eq!(contacts[1].avatar.as_deref(), Some("/media/avatars/2.png"));
    }

    #[test]
    fn preview_is_capped() {
        let long = "я".repeat(300);
        let m = msg(1, 1, 2, &long, None, datetime!(2025-03-01 12:00 UTC), false);
        assert_eq!(preview(&m).chars().count(), PREVIEW_CHARS);

        let empty = msg(2, 1, 2, "", None, datetime!(2025-03-01 12:00 UTC), false);
        assert_eq!(preview(&empty), "No messages");
    }

    #[test]
    fn direction_follows_viewer() {
        let m = msg(1, 1, 2, "hi", Some("chat/a.png"), datetime!(2025-03-01 12:00 UTC), false);
        let mine = ChatMessageView::new(m.clone(), 1, "http://localhost:8080");
        let theirs = ChatMessageView::new(m, 2, "http://localhost:8080");
        assert_eq!(mine.direction, Direction::Outgoing);
        assert_eq!(theirs.direction, Direction::Incoming);
        assert_eq!(mine.image_url.as_deref(), Some("http://localhost:8080/media/chat/a.png"));
    }
}
