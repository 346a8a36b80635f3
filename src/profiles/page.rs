use axum::{
    debug_handler,
    extract::{Path, State},
    response::{IntoResponse, Response},
};
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    announcements::pages::announcement_card,
    db::{
        activity::{self, Activity},
        announcements, guides, profile_reviews::{self, ProfileReview}, profiles,
    },
    guides::pages::{guide_card, image_tag},
    include_res,
    res::{self, escape},
    session, AppResult,
};

const RECENT_ACTIVITY: i64 = 20;

fn comment_item(review: &ProfileReview, viewer: Option<i64>) -> String {
    let mine = if viewer == Some(review.reviewer_id) { " mine" } else { "" };
    let edited = if review.is_edited { " (edited)" } else { "" };
    include_res!(str, "/pages/profiles/comment.html")
        .replace("{id}", &review.id.to_string())
        .replace("{mine}", mine)
        .replace("{avatar}", &image_tag(review.author_avatar.as_deref(), &review.author))
        .replace("{author}", &escape(&review.author))
        .replace("{created_at}", &crate::db::display_timestamp(review.created_at))
        .replace("{edited}", edited)
        .replace("{comment}", &escape(&review.comment))
}

fn activity_item(entry: &Activity) -> String {
    let title = match entry.url() {
        Some(url) => format!(r#"<a href="{url}">{}</a>"#, escape(&entry.target_title)),
        None => escape(&entry.target_title),
    };
    format!(
        r#"<li><time>{}</time> {} {}: {title}</li>"#,
        crate::db::display_timestamp(entry.created_at),
        entry.action.label(),
        entry.target_type.label().to_lowercase(),
    )
}

#[debug_handler]
pub(crate) async fn profile(
    Path(username): Path<String>,
    State(db_pool): State<SqlitePool>,
    session: Session,
) -> AppResult<Response> {
    let Some(profile) = profiles::find_by_username(&db_pool, &username).await? else {
        return res::sorry("profile");
    };
    let viewer = session::current_user(&session).await?;

    let guides: String = guides::by_author(&db_pool, profile.user_id).await?.iter().map(guide_card).collect();
    let announcements: String = announcements::by_author(&db_pool, profile.user_id)
        .await?
        .iter()
        .map(announcement_card)
        .collect();
    let comments: String = profile_reviews::for_profile(&db_pool, profile.id)
        .await?
        .iter()
        .map(|review| comment_item(review, viewer))
        .collect();
    let activities: String = activity::recent_for_user(&db_pool, profile.user_id, RECENT_ACTIVITY)
        .await?
        .iter()
        .map(activity_item)
        .collect();

    let edit_link = if viewer == Some(profile.user_id) {
        r#"<a class="button" href="/users/edit">Edit profile</a>"#
    } else {
        ""
    };

    let body = include_res!(str, "/pages/profiles/profile.html")
        .replace("{avatar}", &image_tag(profile.avatar.as_deref(), &profile.username))
        .replace("{username}", &escape(&profile.username))
        .replace("{rating}", &profile.rating.to_string())
        .replace("{edit_link}", edit_link)
        .replace("{guides}", &guides)
        .replace("{announcements}", &announcements)
        .replace("{activities}", &activities)
        .replace("{comments}", &comments)
        .replace("{bio}", &escape(&profile.bio));

    Ok(res::page(&profile.username, &body).into_response())
}
