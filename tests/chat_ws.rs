mod common;

use axum::http::{header, HeaderValue};
use common::TestApp;
use futures_util::{SinkExt, Stream, StreamExt};
use serde_json::{json, Value};
use tokio_tungstenite::{
    connect_async,
    tungstenite::{client::IntoClientRequest, Message},
};

async fn serve(app: &TestApp) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app.router.clone();
    tokio::spawn(async move { axum::serve(listener, router).await });
    format!("ws://{addr}/api/chat/ws")
}

async fn next_json<S>(socket: &mut S) -> Value
where
    S: Stream<Item = Result<Message, tokio_tungstenite::tungstenite::Error>> + Unpin,
{
    loop {
        match socket.next().await.unwrap().unwrap() {
            Message::Text(text) => return serde_json::from_str(text.as_str()).unwrap(),
            Message::Close(_) => panic!("socket closed"),
            _ => continue,
        }
    }
}

#[tokio::test]
async fn socket_pushes_and_accepts_messages() {
    let app = TestApp::new().await;
    let (alice_id, alice) = app.sign_up("alice").await;
    let (bob_id, bob) = app.sign_up("bob").await;
    let (_, carol) = app.sign_up("carol").await;
    let url = serve(&app).await;

    let mut request = url.as_str().into_client_request().unwrap();
    request
        .headers_mut()
        .insert(header::COOKIE, HeaderValue::from_str(&bob).unwrap());
    let (mut socket, _) = connect_async(request).await.unwrap();

    // the echo of their own message shows the socket is subscribed
    socket
        .send(Message::Text(json!({ "receiver_id": alice_id, "message": "hey alice" }).to_string().into()))
        .await
        .unwrap();
    let echoed = next_json(&mut socket).await;
    assert_eq!(echoed["message"], "hey alice");
    assert_eq!(echoed["direction"], "outgoing");

    // not bob's conversation, so it never reaches their socket
    app.post("/api/chat/send", Some(&carol), json!({ "receiver_id": alice_id, "message": "psst" }))
        .await;
    app.post("/api/chat/send", Some(&alice), json!({ "receiver_id": bob_id, "message": "hi bob" }))
        .await;

    let pushed = next_json(&mut socket).await;
    assert_eq!(pushed["message"], "hi bob");
    assert_eq!(pushed["sender"], alice_id);
    assert_eq!(pushed["direction"], "incoming");

    let thread = app.get(&format!("/api/chat/{bob_id}/messages"), Some(&alice)).await.body;
    assert_eq!(thread.as_array().unwrap().len(), 2);
    assert_eq!(thread[0]["message"], "hey alice");
}

#[tokio::test]
async fn socket_requires_a_session() {
    let app = TestApp::new().await;
    let url = serve(&app).await;
    assert!(connect_async(url.as_str()).await.is_err());
}
