#![allow(dead_code)]

use std::{env, path::PathBuf};

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use skillissue::{app, db, AppState, Config};
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};
use tower::ServiceExt;

pub struct TestApp {
    pub router: Router,
    pub db_pool: SqlitePool,
    pub media_root: PathBuf,
}

pub struct Reply {
    pub status: StatusCode,
    pub cookie: Option<String>,
    pub location: Option<String>,
    pub body: Value,
}

/// A file part of a multipart form: field name, client file name, contents.
pub type FilePart<'a> = (&'a str, &'a str, &'a [u8]);

const BOUNDARY: &str = "skillissue-test-boundary";

fn multipart_body(fields: &[(&str, &str)], files: &[FilePart<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for (name, value) in fields {
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n")
                .as_bytes(),
        );
    }
    for (name, file_name, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\n\
                Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

impl TestApp {
    pub async fn new() -> Self {
        // one connection keeps the in-memory database alive for the whole test
        let options = "sqlite::memory:"
            .parse::<SqliteConnectOptions>()
            .unwrap()
            .foreign_keys(true);
        let db_pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .unwrap();
        db::prepare_db(&db_pool).await.unwrap();

        let media_root = env::temp_dir().join(format!("skillissue-test-{}", uuid::Uuid::now_v7()));
        let config = Config {
            database_url: "sqlite::memory:".to_owned(),
            media_root: media_root.to_string_lossy().into_owned(),
            ..Config::default()
        };

        TestApp {
            router: app(AppState::new(config, db_pool.clone())),
            db_pool,
            media_root,
        }
    }

    pub async fn send(&self, method: Method, uri: &str, cookie: Option<&str>, body: Option<Value>) -> Reply {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }
        let req = match body {
            Some(body) => req
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => req.body(Body::empty()).unwrap(),
        };
        self.dispatch(req).await
    }

    /// Posts a `multipart/form-data` body, the way the page forms submit.
    pub async fn post_form(
        &self,
        uri: &str,
        cookie: Option<&str>,
        fields: &[(&str, &str)],
        files: &[FilePart<'_>],
    ) -> Reply {
        let mut req = Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"));
        if let Some(cookie) = cookie {
            req = req.header(header::COOKIE, cookie);
        }
        let req = req.body(Body::from(multipart_body(fields, files))).unwrap();
        self.dispatch(req).await
    }

    async fn dispatch(&self, req: Request<Body>) -> Reply {
        let res = self.router.clone().oneshot(req).await.unwrap();
        let status = res.status();
        let cookie = res
            .headers()
            .get(header::SET_COOKIE)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(';').next())
            .map(str::to_owned);
        let location = res
            .headers()
            .get(header::LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let bytes = res.into_body().collect().await.unwrap().to_bytes();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        Reply { status, cookie, location, body }
    }

    pub async fn get(&self, uri: &str, cookie: Option<&str>) -> Reply {
        self.send(Method::GET, uri, cookie, None).await
    }

    pub async fn post(&self, uri: &str, cookie: Option<&str>, body: Value) -> Reply {
        self.send(Method::POST, uri, cookie, Some(body)).await
    }

    pub async fn put(&self, uri: &str, cookie: Option<&str>, body: Value) -> Reply {
        self.send(Method::PUT, uri, cookie, Some(body)).await
    }

    pub async fn patch(&self, uri: &str, cookie: Option<&str>, body: Value) -> Reply {
        self.send(Method::PATCH, uri, cookie, Some(body)).await
    }

    pub async fn delete(&self, uri: &str, cookie: Option<&str>) -> Reply {
        self.send(Method::DELETE, uri, cookie, None).await
    }

    /// The newest code issued to `email`, read straight from the database.
    pub async fn code_for(&self, email: &str) -> String {
        let (code,): (String,) = sqlx::query_as(
            "SELECT code FROM email_verification_codes WHERE email=? ORDER BY id DESC LIMIT 1",
        )
        .bind(email)
        .fetch_one(&self.db_pool)
        .await
        .unwrap();
        code
    }

    /// Registers, confirms and logs in `username`, returning their id and session cookie.
    pub async fn sign_up(&self, username: &str) -> (i64, String) {
        let email = format!("{username}@example.com");
        let res = self
            .post(
                "/api/register",
                None,
                json!({ "username": username, "email": email, "password": "hunter22" }),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
        let id = res.body["id"].as_i64().unwrap();

        let code = self.code_for(&email).await;
        let res = self.post("/api/verify-email", None, json!({ "email": email, "code": code })).await;
        assert_eq!(res.status, StatusCode::OK, "{}", res.body);

        let res = self
            .post("/api/login", None, json!({ "username": username, "password": "hunter22" }))
            .await;
        assert_eq!(res.status, StatusCode::OK, "{}", res.body);

        (id, res.cookie.expect("login sets the session cookie"))
    }

    /// Contents of a stored upload, given its `/media/...` URL or stored path.
    pub async fn media_file(&self, reference: &str) -> Vec<u8> {
        let path = reference.trim_start_matches("/media/");
        tokio::fs::read(self.media_root.join(path)).await.unwrap()
    }

    pub async fn new_guide(&self, cookie: &str, title: &str, tags: &[&str]) -> i64 {
        let res = self
            .post(
                "/api/guides",
                Some(cookie),
                json!({ "title": title, "content": "# Steps\n\nDo the thing.", "tags": tags }),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
        res.body["id"].as_i64().unwrap()
    }

    pub async fn new_announcement(&self, cookie: &str, title: &str, tags: &[&str]) -> i64 {
        let res = self
            .post(
                "/api/announcements",
                Some(cookie),
                json!({ "title": title, "description": "See you there.", "tags": tags }),
            )
            .await;
        assert_eq!(res.status, StatusCode::CREATED, "{}", res.body);
        res.body["id"].as_i64().unwrap()
    }
}
