use axum::{
    debug_handler,
    extract::{Multipart, Path, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    db::{
        announcements::{self, Announcement, AnnouncementDraft},
        comments::{self, Comment},
        display_timestamp,
    },
    filter::parse_tags,
    guides::pages::{image_tag, tag_list},
    include_res,
    media::{FormData, MediaKind, MediaStore},
    res::{self, escape},
    session, AppResult, AppState,
};

use super::{publish, revise};

#[derive(Debug, Deserialize)]
pub(crate) struct ListQuery {
    search: Option<String>,
}

pub(crate) fn announcement_card(announcement: &Announcement) -> String {
    include_res!(str, "/pages/announcements/card.html")
        .replace("{id}", &announcement.id.to_string())
        .replace("{image}", &image_tag(announcement.image.as_deref(), &announcement.title))
        .replace("{title}", &escape(&announcement.title))
        .replace("{author}", &escape(&announcement.author_name))
        .replace("{created_at}", &display_timestamp(announcement.created_at))
        .replace("{tags}", &tag_list(&announcement.tags.0))
}

fn comment_item(comment: &Comment, viewer: Option<i64>) -> String {
    let edited = if comment.is_edited { " (edited)" } else { "" };
    let mine = if viewer == Some(comment.author_id) { " mine" } else { "" };
    include_res!(str, "/pages/announcements/comment.html")
        .replace("{id}", &comment.id.to_string())
        .replace("{mine}", mine)
        .replace("{avatar}", &image_tag(comment.author_avatar.as_deref(), &comment.author))
        .replace("{author}", &escape(&comment.author))
        .replace("{created_at}", &display_timestamp(comment.created_at))
        .replace("{edited}", edited)
        .replace("{content}", &escape(&comment.content))
}

#[debug_handler]
pub(crate) async fn list(
    State(db_pool): State<SqlitePool>,
    Query(ListQuery { search }): Query<ListQuery>,
) -> AppResult<Response> {
    let search = search.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty());
    let announcements = match &search {
        Some(search) => announcements::with_title(&db_pool, search).await?,
        None => announcements::all(&db_pool).await?,
    };

    let cards: String = announcements.iter().map(announcement_card).collect();
    let body = include_res!(str, "/pages/announcements/list.html")
        .replace("{search}", &escape(search.as_deref().unwrap_or_default()))
        .replace("{cards}", &cards);

    Ok(res::page("Announcements", &body).into_response())
}

#[debug_handler]
pub(crate) async fn detail(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let Some(announcement) = announcements::find(&db_pool, id).await? else {
        return res::sorry("announcement");
    };
    let viewer = session::current_user(&session).await?;

    let comments: String = comments::for_announcement(&db_pool, id)
        .await?
        .iter()
        .map(|comment| comment_item(comment, viewer))
        .collect();
    let edit_link = if viewer == Some(announcement.author_id) {
        format!(r#"<a class="button" href="/announcements/{id}/edit">Edit</a>"#)
    } else {
        String::new()
    };

    let body = include_res!(str, "/pages/announcements/detail.html")
        .replace("{id}", &id.to_string())
        .replace("{image}", &image_tag(announcement.image.as_deref(), &announcement.title))
        .replace("{title}", &escape(&announcement.title))
        .replace("{author}", &escape(&announcement.author_name))
        .replace("{created_at}", &display_timestamp(announcement.created_at))
        .replace("{tags}", &tag_list(&announcement.tags.0))
        .replace("{edit_link}", &edit_link)
        .replace("{comments}", &comments)
        .replace("{description}", &escape(&announcement.description));

    Ok(res::page(&announcement.title, &body).into_response())
}

fn form_page(heading: &str, action: &str, announcement: Option<&Announcement>) -> Response {
    let (title, description, tags) = match announcement {
        Some(a) => (a.title.as_str(), a.description.as_str(), a.tags.0.join(", ")),
        None => ("", "", String::new()),
    };

    let body = include_res!(str, "/pages/announcements/form.html")
        .replace("{heading}", heading)
        .replace("{action}", &escape(action))
        .replace("{title}", &escape(title))
        .replace("{tags}", &escape(&tags))
        .replace("{description}", &escape(description));

    res::page(heading, &body).into_response()
}

async fn draft_from(media: &MediaStore, multipart: Multipart, current: Option<&Announcement>) -> AppResult<AnnouncementDraft> {
    let form = FormData::read(multipart).await?;
    let image = match form.file("image") {
        Some(upload) => Some(media.save(MediaKind::Announcements, &upload.file_name, &upload.bytes).await?),
        None => current.and_then(|a| a.image.clone()),
    };

    Ok(AnnouncementDraft {
        title: form.text("title"),
        description: form.text("description"),
        image,
        tags: parse_tags(&form.text("tags")),
    })
}

#[debug_handler]
pub(crate) async fn new_form(session: Session) -> AppResult<Response> {
    if let Err(redirect) = session::require_page_user(&session, "/announcements/new").await? {
        return Ok(redirect);
    }
    Ok(form_page("New announcement", "/announcements/new", None))
}

#[debug_handler(state = AppState)]
pub(crate) async fn create(
    State(db_pool): State<SqlitePool>,
    State(media): State<MediaStore>,
    session: Session,
    multipart: Multipart,
) -> AppResult<Response> {
    let user_id = match session::require_page_user(&session, "/announcements/new").await? {
        Ok(user_id) => user_id,
        Err(redirect) => return Ok(redirect),
    };

    let draft = draft_from(&media, multipart, None).await?;
    let id = publish(&db_pool, user_id, &draft).await?;
    Ok(Redirect::to(&format!("/announcements/{id}")).into_response())
}

/// The announcement when the session user wrote it; otherwise where to send them.
async fn own(db_pool: &SqlitePool, session: &Session, id: i64) -> AppResult<Result<Announcement, Response>> {
    let user_id = match session::require_page_user(session, &format!("/announcements/{id}/edit")).await? {
        Ok(user_id) => user_id,
        Err(redirect) => return Ok(Err(redirect)),
    };
    match announcements::find(db_pool, id).await? {
        Some(a) if a.author_id == user_id => Ok(Ok(a)),
        Some(_) => Ok(Err(Redirect::to(&format!("/announcements/{id}")).into_response())),
        None => res::sorry("announcement").map(Err),
    }
}

#[debug_handler]
pub(crate) async fn edit_form(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    match own(&db_pool, &session, id).await? {
        Ok(announcement) => Ok(form_page(
            "Edit announcement",
            &format!("/announcements/{id}/edit"),
            Some(&announcement),
        )),
        Err(response) => Ok(response),
    }
}

#[debug_handler(state = AppState)]
pub(crate) async fn update(
    State(db_pool): State<SqlitePool>,
    State(media): State<MediaStore>,
    session: Session,
    Path(id): Path<i64>,
    multipart: Multipart,
) -> AppResult<Response> {
    let announcement = match own(&db_pool, &session, id).await? {
        Ok(announcement) => announcement,
        Err(response) => return Ok(response),
    };

    let draft = draft_from(&media, multipart, Some(&announcement)).await?;
    revise(&db_pool, &announcement, &draft).await?;
    Ok(Redirect::to(&format!("/announcements/{id}")).into_response())
}
