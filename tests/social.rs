mod common;

use axum::http::StatusCode;
use common::TestApp;
use serde_json::json;

#[tokio::test]
async fn announcements_and_comments() {
    let app = TestApp::new().await;
    let (_, alice) = app.sign_up("alice").await;
    let (_, bob) = app.sign_up("bob").await;
    let id = app.new_announcement(&alice, "Meetup", &["event"]).await;

    let res = app
        .patch(&format!("/api/announcements/{id}"), Some(&bob), json!({ "title": "Hijacked" }))
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app.get("/api/announcements/filter?tags=EVENT", None).await;
    assert_eq!(res.body["count"], 1);
    assert_eq!(res.body["results"][0]["author"], "alice");

    let uri = format!("/api/announcements/{id}/comments");
    let res = app.post(&uri, Some(&bob), json!({ "content": "  " })).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app.post(&uri, Some(&bob), json!({ "content": "Count me in" })).await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["is_edited"], false);
    let comment_id = res.body["id"].as_i64().unwrap();

    let res = app
        .put(&format!("/api/announcements/comments/{comment_id}"), Some(&alice), json!({ "content": "No" }))
        .await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app
        .put(
            &format!("/api/announcements/comments/{comment_id}"),
            Some(&bob),
            json!({ "content": "Count me in, +1" }),
        )
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["is_edited"], true);

    let res = app.get(&uri, None).await;
    assert_eq!(res.body.as_array().unwrap().len(), 1);
    assert_eq!(res.body[0]["content"], "Count me in, +1");

    let res = app.delete(&format!("/api/announcements/comments/{comment_id}"), Some(&bob)).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["announcement_id"], id);

    let res = app.delete(&format!("/api/announcements/{id}"), Some(&alice)).await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);

    let res = app.get("/api/profiles/alice/activities", None).await;
    assert_eq!(res.body[0]["action"], "DELETE");
    assert_eq!(res.body[0]["target_type"], "ANNOUNCEMENT");
    assert_eq!(res.body[0]["target_title"], "Meetup");
}

#[tokio::test]
async fn profile_comments_are_one_per_reviewer() {
    let app = TestApp::new().await;
    app.sign_up("alice").await;
    let (_, bob) = app.sign_up("bob").await;
    let (_, carol) = app.sign_up("carol").await;

    let res = app.post("/api/profiles/alice/comments", Some(&bob), json!({ "comment": "Helpful" })).await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["profile"], "alice");
    let id = res.body["id"].as_i64().unwrap();

    // writing again replaces the first comment
    let res = app
        .post("/api/profiles/alice/comments", Some(&bob), json!({ "comment": "Very helpful" }))
        .await;
    assert_eq!(res.body["id"], id);
    assert_eq!(res.body["comment"], "Very helpful");

    let res = app.post("/api/profiles/nobody/comments", Some(&bob), json!({ "comment": "Hi" })).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);

    let res = app.put(&format!("/api/profile-comments/{id}"), Some(&carol), json!({ "text": "x" })).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);

    let res = app
        .put(&format!("/api/profile-comments/{id}"), Some(&bob), json!({ "text": "Really helpful" }))
        .await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["is_edited"], true);

    let res = app.delete(&format!("/api/profile-comments/{id}"), Some(&bob)).await;
    assert_eq!(res.status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn chat_threads_and_contacts() {
    let app = TestApp::new().await;
    let (alice_id, alice) = app.sign_up("alice").await;
    let (bob_id, bob) = app.sign_up("bob").await;
    let (carol_id, carol) = app.sign_up("carol").await;

    let res = app
        .post("/api/chat/send", Some(&alice), json!({ "receiver_id": alice_id, "message": "me" }))
        .await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
    let res = app
        .post("/api/chat/send", Some(&alice), json!({ "receiver_id": 9999, "message": "hi" }))
        .await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    let res = app.post("/api/chat/send", Some(&alice), json!({ "receiver_id": bob_id })).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);

    let res = app
        .post("/api/chat/send", Some(&alice), json!({ "receiver_id": bob_id, "message": "hi bob" }))
        .await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.body["direction"], "outgoing");

    app.post("/api/chat/send", Some(&alice), json!({ "receiver_id": bob_id, "image": "/media/chat/cat.png" }))
        .await;
    app.post("/api/chat/send", Some(&carol), json!({ "receiver_id": bob_id, "message": "yo" }))
        .await;

    let res = app.get("/api/chat/contacts", Some(&bob)).await;
    let contacts = res.body.as_array().unwrap();
    assert_eq!(contacts.len(), 2);
    assert_eq!(contacts[0]["user_id"], carol_id);
    assert_eq!(contacts[0]["last_message"], "yo");
    assert_eq!(contacts[1]["user_id"], alice_id);
    assert_eq!(contacts[1]["last_message"], "Image");
    assert_eq!(contacts[1]["unread_count"], 2);

    let res = app.get(&format!("/api/chat/{alice_id}/messages"), Some(&bob)).await;
    let thread = res.body.as_array().unwrap();
    assert_eq!(thread.len(), 2);
    assert_eq!(thread[0]["message"], "hi bob");
    assert_eq!(thread[0]["direction"], "incoming");
    assert_eq!(thread[1]["image"], "chat/cat.png");

    // reading the thread marked alice's messages read
    let res = app.get("/api/chat/contacts", Some(&bob)).await;
    assert_eq!(res.body[1]["unread_count"], 0);
    assert_eq!(res.body[0]["unread_count"], 1);

    let res = app.get(&format!("/api/chat/{bob_id}/messages"), Some(&bob)).await;
    assert_eq!(res.body, json!([]));
    let res = app.get("/api/chat/9999/messages", Some(&bob)).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    let res = app.get("/api/chat/contacts", None).await;
    assert_eq!(res.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn language_cookie() {
    let app = TestApp::new().await;

    let res = app.post("/api/set-language", None, json!({ "language": "en" })).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.body["language"], "EN");
    assert_eq!(res.cookie.as_deref(), Some("lang=EN"));

    let res = app.post("/api/set-language", None, json!({ "language": "fr" })).await;
    assert_eq!(res.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn pages_render() {
    let app = TestApp::new().await;
    let (_, alice) = app.sign_up("alice").await;
    let id = app.new_guide(&alice, "Visible", &[]).await;

    for uri in ["/", "/guides", "/announcements", "/users/alice", "/login", "/register"] {
        let res = app.get(uri, None).await;
        assert_eq!(res.status, StatusCode::OK, "{uri}");
    }
    let res = app.get(&format!("/guides/{id}"), None).await;
    assert_eq!(res.status, StatusCode::OK);

    assert_eq!(app.get("/guides/9999", None).await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.get("/nowhere", None).await.status, StatusCode::NOT_FOUND);
    assert_eq!(app.get("/api/nowhere", None).await.status, StatusCode::NOT_FOUND);
}
