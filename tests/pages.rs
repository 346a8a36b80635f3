mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

fn id_from(location: &str, prefix: &str) -> i64 {
    location.strip_prefix(prefix).unwrap().parse().unwrap()
}

#[tokio::test]
async fn guide_form_stores_cover_and_inline_images() {
    let app = TestApp::new().await;
    let (_, alice) = app.sign_up("alice").await;

    let res = app
        .post_form(
            "/guides/new",
            Some(&alice),
            &[("title", "Camera basics"), ("content", "Look: ![shot](shot.png)"), ("tags", "photo, gear")],
            &[("image", "cover.png", b"ALICE-COVER"), ("image_1", "shot.png", b"ALICE-SHOT")],
        )
        .await;
    assert_eq!(res.status, StatusCode::SEE_OTHER);
    let id = id_from(res.location.as_deref().unwrap(), "/guides/");

    let guide = app.get(&format!("/api/guides/{id}"), None).await.body;
    assert_eq!(guide["tags"], json!(["photo", "gear"]));
    let cover = guide["image"].as_str().unwrap().to_owned();
    assert!(cover.starts_with("/media/guides/") && cover.ends_with(".png"));
    assert_eq!(app.media_file(&cover).await, b"ALICE-COVER");

    let content = guide["content"].as_str().unwrap();
    assert!(!content.contains("(shot.png)"));
    let inline = content.split('(').nth(1).unwrap().trim_end_matches(')');
    assert!(inline.starts_with("/media/guides/"));
    assert_ne!(inline, "/media/guides/shot.png");
    assert_eq!(app.media_file(inline).await, b"ALICE-SHOT");
}

#[tokio::test]
async fn uploads_cannot_replace_existing_media() {
    let app = TestApp::new().await;
    let (_, alice) = app.sign_up("alice").await;
    let (_, mallory) = app.sign_up("mallory").await;

    let res = app
        .post_form(
            "/guides/new",
            Some(&alice),
            &[("title", "Mine"), ("content", "text")],
            &[("image", "cover.png", b"ALICE-COVER")],
        )
        .await;
    let id = id_from(res.location.as_deref().unwrap(), "/guides/");
    let cover = app.get(&format!("/api/guides/{id}"), None).await.body["image"]
        .as_str()
        .unwrap()
        .to_owned();
    let stored_name = cover.rsplit('/').next().unwrap().to_owned();

    // same client file name as the stored cover, as inline image and as cover
    let res = app
        .post_form(
            "/guides/new",
            Some(&mallory),
            &[("title", "Theirs"), ("content", "text")],
            &[("image_1", &stored_name, b"PWNED"), ("image", &stored_name, b"PWNED")],
        )
        .await;
    assert_eq!(res.status, StatusCode::SEE_OTHER);
    assert_eq!(app.media_file(&cover).await, b"ALICE-COVER");
}

#[tokio::test]
async fn guide_edit_keeps_the_cover_and_is_author_only() {
    let app = TestApp::new().await;
    let (_, alice) = app.sign_up("alice").await;
    let (_, bob) = app.sign_up("bob").await;

    let res = app
        .post_form(
            "/guides/new",
            Some(&alice),
            &[("title", "Draft"), ("content", "v1")],
            &[("image", "cover.jpg", b"COVER")],
        )
        .await;
    let id = id_from(res.location.as_deref().unwrap(), "/guides/");
    let cover = app.get(&format!("/api/guides/{id}"), None).await.body["image"].clone();

    let res = app
        .post_form(&format!("/guides/new?id={id}"), Some(&bob), &[("title", "Stolen"), ("content", "x")], &[])
        .await;
    assert_eq!(res.location.as_deref(), Some("/guides"));

    let res = app
        .post_form(&format!("/guides/new?id={id}"), Some(&alice), &[("title", "Final"), ("content", "v2")], &[])
        .await;
    assert_eq!(res.location, Some(format!("/guides/{id}")));

    let guide = app.get(&format!("/api/guides/{id}"), None).await.body;
    assert_eq!(guide["title"], "Final");
    assert_eq!(guide["content"], "v2");
    assert_eq!(guide["image"], cover);

    let res = app.get("/api/profiles/alice/activities", None).await;
    assert_eq!(res.body[0]["action"], "UPDATE");
}

#[tokio::test]
async fn guide_form_requires_login() {
    let app = TestApp::new().await;
    let res = app.post_form("/guides/new", None, &[("title", "x")], &[]).await;
    assert_eq!(res.location.as_deref(), Some("/login"));
}

#[tokio::test]
async fn announcement_forms_create_and_edit() {
    let app = TestApp::new().await;
    let (_, alice) = app.sign_up("alice").await;
    let (_, bob) = app.sign_up("bob").await;

    let res = app
        .post_form(
            "/announcements/new",
            Some(&alice),
            &[("title", "Meetup"), ("description", "Friday"), ("tags", "event")],
            &[("image", "poster.png", b"POSTER")],
        )
        .await;
    assert_eq!(res.status, StatusCode::SEE_OTHER);
    let id = id_from(res.location.as_deref().unwrap(), "/announcements/");

    let announcement = app.get(&format!("/api/announcements/{id}"), None).await.body;
    let image = announcement["image"].as_str().unwrap().to_owned();
    assert!(image.starts_with("/media/announcements/"));
    assert_eq!(app.media_file(&image).await, b"POSTER");

    let edit = format!("/announcements/{id}/edit");
    let res = app.post_form(&edit, Some(&bob), &[("title", "Cancelled")], &[]).await;
    assert_eq!(res.location, Some(format!("/announcements/{id}")));
    assert_eq!(app.get(&format!("/api/announcements/{id}"), None).await.body["title"], "Meetup");

    let res = app
        .post_form(&edit, Some(&alice), &[("title", "Meetup moved"), ("description", "Saturday")], &[])
        .await;
    assert_eq!(res.location, Some(format!("/announcements/{id}")));

    let announcement = app.get(&format!("/api/announcements/{id}"), None).await.body;
    assert_eq!(announcement["title"], "Meetup moved");
    assert_eq!(announcement["description"], "Saturday");
    assert_eq!(announcement["image"], image);
}

#[tokio::test]
async fn profile_edit_renames_and_rejects_taken_names() {
    let app = TestApp::new().await;
    app.sign_up("alice").await;
    let (_, bob) = app.sign_up("bob").await;

    let res = app
        .post_form("/users/edit", Some(&bob), &[("username", "alice"), ("description", "hijack")], &[])
        .await;
    assert_eq!(res.location.as_deref(), Some("/users/edit?error=username_taken"));
    let profile = app.get("/api/profiles/bob", None).await;
    assert_eq!(profile.status, StatusCode::OK);
    assert_eq!(profile.body["bio"], "");

    let long = "b".repeat(151);
    let res = app
        .post_form("/users/edit", Some(&bob), &[("username", &long), ("description", "x")], &[])
        .await;
    assert_eq!(res.location.as_deref(), Some("/users/edit?error=username_invalid"));

    let res = app
        .post_form(
            "/users/edit",
            Some(&bob),
            &[("username", "robert"), ("description", "Builder")],
            &[("avatar", "me.png", b"FACE")],
        )
        .await;
    assert_eq!(res.location.as_deref(), Some("/users/edit?updated=1"));

    assert_eq!(app.get("/api/profiles/bob", None).await.status, StatusCode::NOT_FOUND);
    let profile = app.get("/api/profiles/robert", None).await.body;
    assert_eq!(profile["bio"], "Builder");
    let avatar = profile["avatar"].as_str().unwrap();
    assert!(avatar.starts_with("/media/avatars/"));
    assert_eq!(app.media_file(avatar).await, b"FACE");

    // keeping one's own name is not a conflict
    let res = app
        .post_form("/users/edit", Some(&bob), &[("username", "robert"), ("description", "Still")], &[])
        .await;
    assert_eq!(res.location.as_deref(), Some("/users/edit?updated=1"));
}
