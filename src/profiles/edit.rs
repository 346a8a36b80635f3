use axum::{
    debug_handler,
    extract::{Multipart, Query, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use sqlx::SqlitePool;
use tower_sessions::Session;

use crate::{
    db::{profiles, users},
    guides::pages::image_tag,
    include_res,
    media::{FormData, MediaKind, MediaStore},
    res::{self, escape},
    session, AppResult, AppState,
};

const USERNAME_MAX: usize = 150;

#[derive(Debug, Deserialize)]
pub(crate) struct EditQuery {
    updated: Option<u8>,
    error: Option<String>,
}

#[debug_handler]
pub(crate) async fn edit_page(
    State(db_pool): State<SqlitePool>,
    session: Session,
    Query(EditQuery { updated, error }): Query<EditQuery>,
) -> AppResult<Response> {
    let user_id = match session::require_page_user(&session, "/users/edit").await? {
        Ok(user_id) => user_id,
        Err(redirect) => return Ok(redirect),
    };
    let Some(profile) = profiles::find_by_user(&db_pool, user_id).await? else {
        return res::sorry("profile");
    };

    let notice = match (updated, error.as_deref()) {
        (_, Some("username_taken")) => r#"<p class="notice error">That username is already taken.</p>"#,
        (_, Some("username_invalid")) => {
            r#"<p class="notice error">Usernames are at most 150 characters long.</p>"#
        }
        (Some(_), _) => r#"<p class="notice">Profile updated.</p>"#,
        _ => "",
    };

    let body = include_res!(str, "/pages/profiles/edit.html")
        .replace("{notice}", notice)
        .replace("{avatar}", &image_tag(profile.avatar.as_deref(), &profile.username))
        .replace("{username}", &escape(&profile.username))
        .replace("{bio}", &escape(&profile.bio));

    Ok(res::page("Edit profile", &body).into_response())
}

#[debug_handler(state = AppState)]
pub(crate) async fn save(
    State(db_pool): State<SqlitePool>,
    State(media): State<MediaStore>,
    session: Session,
    multipart: Multipart,
) -> AppResult<Response> {
    let user_id = match session::require_page_user(&session, "/users/edit").await? {
        Ok(user_id) => user_id,
        Err(redirect) => return Ok(redirect),
    };

    let form = FormData::read(multipart).await?;
    let username = form.text("username");
    if username.chars().count() > USERNAME_MAX {
        return Ok(Redirect::to("/users/edit?error=username_invalid").into_response());
    }

    let avatar = match form.file("avatar") {
        Some(upload) => Some(media.save(MediaKind::Avatars, &upload.file_name, &upload.bytes).await?),
        None => None,
    };

    let mut tx = db_pool.begin().await?;
    // blank keeps the current name
    if !username.is_empty() {
        match users::rename(&mut *tx, user_id, &username).await {
            Ok(()) => {}
            Err(sqlx::Error::Database(err)) if err.is_unique_violation() => {
                return Ok(Redirect::to("/users/edit?error=username_taken").into_response());
            }
            Err(err) => return Err(err.into()),
        }
    }
    profiles::update(&mut *tx, user_id, &form.text("description"), avatar.as_deref()).await?;
    tx.commit().await?;

    Ok(Redirect::to("/users/edit?updated=1").into_response())
}
