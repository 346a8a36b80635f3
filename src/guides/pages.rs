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
        guides::{self, Guide, GuideDraft},
        reviews::{self, Review},
    },
    filter::parse_tags,
    include_res,
    media::{self, FormData, MediaKind, MediaStore},
    res::{self, escape, Markdown},
    session, AppResult, AppState,
};

use super::{publish, revise};

const TOP_COUNT: i64 = 6;

#[derive(Debug, Deserialize)]
pub(crate) struct ListQuery {
    search: Option<String>,
}

pub(crate) fn image_tag(image: Option<&str>, alt: &str) -> String {
    match image {
        Some(path) => format!(r#"<img src="{}" alt="{}">"#, escape(&media::url(path)), escape(alt)),
        None => String::new(),
    }
}

pub(crate) fn tag_list(tags: &[String]) -> String {
    tags.iter()
        .map(|tag| format!(r#"<span class="tag">{}</span>"#, escape(tag)))
        .collect()
}

pub(crate) fn guide_card(guide: &Guide) -> String {
    include_res!(str, "/pages/guides/card.html")
        .replace("{id}", &guide.id.to_string())
        .replace("{image}", &image_tag(guide.image.as_deref(), &guide.title))
        .replace("{title}", &escape(&guide.title))
        .replace("{author}", &escape(&guide.author_name))
        .replace("{rating}", &guide.rating.to_string())
        .replace("{tags}", &tag_list(&guide.tags.0))
}

fn review_item(review: &Review) -> String {
    include_res!(str, "/pages/guides/review.html")
        .replace("{avatar}", &image_tag(review.author_avatar.as_deref(), &review.author_username))
        .replace("{author}", &escape(&review.author_username))
        .replace("{stars}", &"★".repeat(review.stars.clamp(0, 5) as usize))
        .replace("{created_at}", &crate::db::display_timestamp(review.created_at))
        .replace("{text}", &escape(&review.text))
}

#[debug_handler]
pub(crate) async fn list(
    State(db_pool): State<SqlitePool>,
    Query(ListQuery { search }): Query<ListQuery>,
) -> AppResult<Response> {
    let search = search.map(|s| s.trim().to_owned()).filter(|s| !s.is_empty());

    let (heading, guides) = match &search {
        Some(search) => (format!("Guides matching “{search}”"), guides::with_title(&db_pool, search).await?),
        None => ("Top guides".to_owned(), guides::top_rated(&db_pool, TOP_COUNT).await?),
    };

    let cards: String = guides.iter().map(guide_card).collect();
    let body = include_res!(str, "/pages/guides/list.html")
        .replace("{heading}", &escape(&heading))
        .replace("{search}", &escape(search.as_deref().unwrap_or_default()))
        .replace("{cards}", &cards);

    Ok(res::page("Guides", &body).into_response())
}

#[debug_handler]
pub(crate) async fn detail(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Path(id): Path<i64>,
) -> AppResult<Response> {
    let Some(guide) = guides::find(&db_pool, id).await? else {
        return res::sorry("guide");
    };
    let viewer = session::current_user(&session).await?;

    let reviews: String = reviews::for_guide(&db_pool, id).await?.iter().map(review_item).collect();
    let edit_link = if viewer == Some(guide.author_id) {
        format!(r#"<a class="button" href="/guides/new?id={id}">Edit</a>"#)
    } else {
        String::new()
    };

    let body = include_res!(str, "/pages/guides/detail.html")
        .replace("{id}", &id.to_string())
        .replace("{image}", &image_tag(guide.image.as_deref(), &guide.title))
        .replace("{title}", &escape(&guide.title))
        .replace("{author}", &escape(&guide.author_name))
        .replace("{rating}", &guide.rating.to_string())
        .replace("{tags}", &tag_list(&guide.tags.0))
        .replace("{edit_link}", &edit_link)
        .replace("{reviews}", &reviews)
        .replace("{content}", &Markdown(guide.content.as_str()).to_html());

    Ok(res::page(&guide.title, &body).into_response())
}

#[derive(Debug, Deserialize)]
pub(crate) struct FormQuery {
    id: Option<i64>,
}

/// The guide being edited, or a redirect when the caller may not edit it.
async fn editable(db_pool: &SqlitePool, id: Option<i64>, user_id: i64) -> AppResult<Result<Option<Guide>, Response>> {
    let Some(id) = id else {
        return Ok(Ok(None));
    };
    match guides::find(db_pool, id).await? {
        Some(guide) if guide.author_id == user_id => Ok(Ok(Some(guide))),
        Some(_) => Ok(Err(Redirect::to("/guides").into_response())),
        None => res::sorry("guide").map(Err),
    }
}

#[debug_handler]
pub(crate) async fn form(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Query(FormQuery { id }): Query<FormQuery>,
) -> AppResult<Response> {
    let user_id = match session::require_page_user(&session, "/guides/new").await? {
        Ok(user_id) => user_id,
        Err(redirect) => return Ok(redirect),
    };
    let guide = match editable(&db_pool, id, user_id).await? {
        Ok(guide) => guide,
        Err(response) => return Ok(response),
    };

    let (heading, action, title, content, tags) = match &guide {
        Some(guide) => (
            "Edit guide",
            format!("/guides/new?id={}", guide.id),
            guide.title.as_str(),
            guide.content.as_str(),
            guide.tags.0.join(", "),
        ),
        None => ("New guide", "/guides/new".to_owned(), "", "", String::new()),
    };

    let body = include_res!(str, "/pages/guides/form.html")
        .replace("{heading}", heading)
        .replace("{action}", &escape(&action))
        .replace("{title}", &escape(title))
        .replace("{tags}", &escape(&tags))
        .replace("{content}", &escape(content));

    Ok(res::page(heading, &body).into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn save(
    State(db_pool): State<SqlitePool>,
    State(media): State<MediaStore>,
    session: Session,
    Query(FormQuery { id }): Query<FormQuery>,
    multipart: Multipart,
) -> AppResult<Response> {
    let user_id = match session::require_page_user(&session, "/guides/new").await? {
        Ok(user_id) => user_id,
        Err(redirect) => return Ok(redirect),
    };
    let guide = match editable(&db_pool, id, user_id).await? {
        Ok(guide) => guide,
        Err(response) => return Ok(response),
    };

    let form = FormData::read(multipart).await?;
    let mut content = form.text("content");

    // images the body links to by file name, stored under fresh names
    for upload in form.files.iter().filter(|upload| upload.field.starts_with("image_")) {
        let path = media.save(MediaKind::Guides, &upload.file_name, &upload.bytes).await?;
        content = content.replace(&format!("({})", upload.file_name), &format!("({})", media::url(&path)));
    }

    let cover = match form.file("image") {
        Some(upload) => Some(media.save(MediaKind::Guides, &upload.file_name, &upload.bytes).await?),
        None => None,
    };

    let draft = GuideDraft {
        title: form.text("title"),
        content,
        image: cover.or_else(|| guide.as_ref().and_then(|g| g.image.clone())),
        tags: parse_tags(&form.text("tags")),
    };

    let id = match &guide {
        Some(guide) => {
            revise(&db_pool, guide, &draft).await?;
            guide.id
        }
        None => publish(&db_pool, user_id, &draft).await?,
    };

    Ok(Redirect::to(&format!("/guides/{id}")).into_response())
}
