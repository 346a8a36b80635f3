//! Uploaded files: storage under the media root and the upload endpoint.

use std::{collections::HashMap, path::PathBuf, sync::Arc};

use axum::{
    debug_handler,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_sessions::Session;
use uuid::Uuid;

use crate::{session, AppError, AppResult, AppState, Config};

pub const URL_PREFIX: &str = "/media";

/// Site-relative URL of a stored file.
pub fn url(path: &str) -> String {
    format!("{URL_PREFIX}/{}", path.trim_start_matches('/'))
}

pub fn absolute_url(public_url: &str, path: &str) -> String {
    format!("{}{}", public_url.trim_end_matches('/'), url(path))
}

/// Path under the media root for an image reference sent by a client,
/// which may be a bare stored path or a `/media/...` URL. Blank means none.
pub fn stored_path(reference: &str) -> Option<String> {
    let reference = reference.trim();
    let path = match reference.find("/media/") {
        Some(at) => &reference[at + "/media/".len()..],
        None => reference.trim_start_matches('/'),
    };
    (!path.is_empty()).then(|| path.to_owned())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Avatars,
    Guides,
    Announcements,
    Chat,
}

impl MediaKind {
    pub fn dir(self) -> &'static str {
        match self {
            MediaKind::Avatars => "avatars",
            MediaKind::Guides => "guides",
            MediaKind::Announcements => "announcements",
            MediaKind::Chat => "chat",
        }
    }
}

#[derive(Debug, Clone)]
pub struct MediaStore {
    root: Arc<PathBuf>,
}

impl MediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        MediaStore { root: Arc::new(root.into()) }
    }

    pub fn root(&self) -> &std::path::Path {
        &self.root
    }

    /// Writes `bytes` under `kind` with a fresh name and returns the stored path.
    pub async fn save(&self, kind: MediaKind, file_name: &str, bytes: &[u8]) -> AppResult<String> {
        let name = match extension(file_name) {
            Some(ext) => format!("{}.{ext}", Uuid::now_v7().simple()),
            None => Uuid::now_v7().simple().to_string(),
        };

        let dir = self.root.join(kind.dir());
        tokio::fs::create_dir_all(&dir).await?;
        tokio::fs::write(dir.join(&name), bytes).await?;

        let path = format!("{}/{name}", kind.dir());
        tracing::debug!(%path, size = bytes.len(), "stored upload");
        Ok(path)
    }
}

fn extension(file_name: &str) -> Option<String> {
    let (_, ext) = file_name.rsplit_once('.')?;
    let ext = ext.to_ascii_lowercase();
    (!ext.is_empty() && ext.len() <= 8 && ext.bytes().all(|b| b.is_ascii_alphanumeric())).then_some(ext)
}

/// An uploaded file from a multipart body.
#[derive(Debug)]
pub struct Upload {
    pub field: String,
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Text fields and non-empty files of a multipart form.
#[derive(Debug, Default)]
pub struct FormData {
    pub fields: HashMap<String, String>,
    pub files: Vec<Upload>,
}

impl FormData {
    pub async fn read(mut multipart: Multipart) -> AppResult<Self> {
        let mut form = FormData::default();

        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_owned();
            match field.file_name().map(str::to_owned) {
                Some(file_name) => {
                    let bytes = field.bytes().await?;
                    if !file_name.is_empty() && !bytes.is_empty() {
                        form.files.push(Upload { field: name, file_name, bytes: bytes.to_vec() });
                    }
                }
                None => {
                    form.fields.insert(name, field.text().await?);
                }
            }
        }

        Ok(form)
    }

    /// Trimmed text field, empty when absent.
    pub fn text(&self, name: &str) -> String {
        self.fields.get(name).map(|v| v.trim().to_owned()).unwrap_or_default()
    }

    pub fn file(&self, field: &str) -> Option<&Upload> {
        self.files.iter().find(|upload| upload.field == field)
    }
}

pub fn router() -> Router<AppState> {
    Router::new().route("/{kind}", post(upload))
}

#[derive(Serialize)]
struct Uploaded {
    path: String,
    url: String,
}

#[debug_handler(state = AppState)]
async fn upload(
    State(media): State<MediaStore>,
    State(config): State<Arc<Config>>,
    session: Session,
    Path(kind): Path<MediaKind>,
    multipart: Multipart,
) -> AppResult<Response> {
    session::require_user(&session).await?;

    let form = FormData::read(multipart).await?;
    let file = form.file("file").ok_or_else(|| AppError::bad_request("file is required"))?;
    let path = media.save(kind, &file.file_name, &file.bytes).await?;

    let url = absolute_url(&config.public_url, &path);
    Ok((StatusCode::CREATED, Json(Uploaded { path, url })).into_response())
}
