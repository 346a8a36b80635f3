use serde::Serialize;
use sqlx::{FromRow, SqliteExecutor};
use time::OffsetDateTime;

use super::{display_time, display_timestamp, UserId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum Action {
    Create,
    Update,
    Delete,
}

impl Action {
    pub fn label(self) -> &'static str {
        match self {
            Action::Create => "Created",
            Action::Update => "Updated",
            Action::Delete => "Deleted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, sqlx::Type)]
#[serde(rename_all = "UPPERCASE")]
#[sqlx(rename_all = "UPPERCASE")]
pub enum TargetKind {
    Guide,
    Announcement,
}

impl TargetKind {
    pub fn label(self) -> &'static str {
        match self {
            TargetKind::Guide => "Guide",
            TargetKind::Announcement => "Announcement",
        }
    }
}

/// What an activity entry points at. The id is dropped once the row is deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Guide(Option<i64>),
    Announcement(Option<i64>),
}

#[derive(Debug, Clone, FromRow)]
pub struct Activity {
    pub id: i64,
    pub user_id: UserId,
    pub action: Action,
    pub target_type: TargetKind,
    pub target_title: String,
    pub guide_id: Option<i64>,
    pub announcement_id: Option<i64>,
    pub created_at: OffsetDateTime,
}

impl Activity {
    /// Page link for the target, if it still exists.
    pub fn url(&self) -> Option<String> {
        match self.target_type {
            TargetKind::Guide => self.guide_id.map(|id| format!("/guides/{id}")),
            TargetKind::Announcement => self.announcement_id.map(|id| format!("/announcements/{id}")),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ActivityView {
    pub id: i64,
    pub action: Action,
    pub action_display: &'static str,
    pub target_type: TargetKind,
    pub target_type_display: &'static str,
    pub target_title: String,
    pub created_at: String,
    pub time: String,
    pub url: Option<String>,
}

impl From<Activity> for ActivityView {
    fn from(activity: Activity) -> Self {
        ActivityView {
            id: activity.id,
            url: activity.url(),
            action: activity.action,
            action_display: activity.action.label(),
            target_type: activity.target_type,
            target_type_display: activity.target_type.label(),
            created_at: display_timestamp(activity.created_at),
            time: display_time(activity.created_at),
            target_title: activity.target_title,
        }
    }
}

pub async fn insert(
    db: impl SqliteExecutor<'_>,
    user_id: UserId,
    action: Action,
    target: Target,
    title: &str,
    now: OffsetDateTime,
) -> sqlx::Result<()> {
    let (kind, guide_id, announcement_id) = match target {
        Target::Guide(id) => (TargetKind::Guide, id, None),
        Target::Announcement(id) => (TargetKind::Announcement, None, id),
    };

    sqlx::query(
        "INSERT INTO user_activities (user_id,action,target_type,target_title,guide_id,announcement_id,created_at) \
        VALUES (?,?,?,?,?,?,?)",
    )
    .bind(user_id)
    .bind(action)
    .bind(kind)
    .bind(title)
    .bind(guide_id)
    .bind(announcement_id)
    .bind(now)
    .execute(db)
    .await?;
    Ok(())
}

pub async fn recent_for_user(db: impl SqliteExecutor<'_>, user_id: UserId, limit: i64) -> sqlx::Result<Vec<Activity>> {
    sqlx::query_as(
        "SELECT id,user_id,action,target_type,target_title,guide_id,announcement_id,created_at \
        FROM user_activities WHERE user_id=? ORDER BY created_at DESC, id DESC LIMIT ?",
    )
    .bind(user_id)
    .bind(limit)
    .fetch_all(db)
    .await
}
