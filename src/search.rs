//! Site-wide search and the front page carousel.

use std::sync::Arc;

use axum::{
    debug_handler,
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use sqlx::SqlitePool;

use crate::{
    db::{
        announcements::{self, Announcement},
        guides::{self, Guide},
        profiles::{self, Profile},
    },
    media, AppResult, AppState, Config,
};

const PER_KIND: i64 = 10;
const MAX_RESULTS: usize = 20;
const POPULAR_GUIDES: i64 = 5;
const LATEST_ANNOUNCEMENTS: i64 = 5;
const CAROUSEL_ITEMS: usize = 6;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/search", get(search))
        .route("/search/all", get(search_all))
        .route("/popular-items", get(popular_items))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HitKind {
    Profile,
    Announcement,
    Guide,
}

#[derive(Debug, Serialize)]
pub struct Hit {
    pub title: String,
    #[serde(rename = "type")]
    pub kind: HitKind,
    pub url: String,
}

impl From<Profile> for Hit {
    fn from(profile: Profile) -> Self {
        Hit {
            url: format!("/users/{}", profile.username),
            title: profile.username,
            kind: HitKind::Profile,
        }
    }
}

impl From<Announcement> for Hit {
    fn from(announcement: Announcement) -> Self {
        Hit {
            url: format!("/announcements/{}", announcement.id),
            title: announcement.title,
            kind: HitKind::Announcement,
        }
    }
}

impl From<Guide> for Hit {
    fn from(guide: Guide) -> Self {
        Hit {
            url: format!("/guides/{}", guide.id),
            title: guide.title,
            kind: HitKind::Guide,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    q: String,
}

#[debug_handler]
pub async fn search(
    State(db_pool): State<SqlitePool>,
    Query(SearchQuery { q }): Query<SearchQuery>,
) -> AppResult<Json<Vec<Hit>>> {
    let q = q.trim();
    if q.is_empty() {
        return Ok(Json(Vec::new()));
    }

    let mut hits: Vec<Hit> = profiles::search(&db_pool, q, PER_KIND).await?.into_iter().map(Hit::from).collect();
    hits.extend(announcements::text_search(&db_pool, q, PER_KIND).await?.into_iter().map(Hit::from));
    hits.extend(guides::text_search(&db_pool, q, PER_KIND).await?.into_iter().map(Hit::from));
    hits.truncate(MAX_RESULTS);

    Ok(Json(hits))
}

#[debug_handler]
pub async fn search_all(State(db_pool): State<SqlitePool>) -> AppResult<Json<Vec<Hit>>> {
    let mut hits: Vec<Hit> = profiles::all(&db_pool).await?.into_iter().map(Hit::from).collect();
    hits.extend(announcements::all(&db_pool).await?.into_iter().map(Hit::from));
    hits.extend(guides::all(&db_pool).await?.into_iter().map(Hit::from));
    Ok(Json(hits))
}

#[derive(Debug, Clone, Serialize)]
pub struct PopularItem {
    id: i64,
    title: String,
    image: Option<String>,
    author: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    rating: Option<i64>,
    url: String,
    #[serde(rename = "type")]
    kind: HitKind,
}

#[derive(Debug, Serialize)]
pub struct Popular {
    guides: Vec<PopularItem>,
    announcements: Vec<PopularItem>,
    items: Vec<PopularItem>,
}

pub(crate) async fn popular(db_pool: &SqlitePool, public_url: &str) -> AppResult<Popular> {
    let image = |path: Option<&str>| path.map(|p| media::absolute_url(public_url, p));

    let guides: Vec<PopularItem> = guides::top_rated(db_pool, POPULAR_GUIDES)
        .await?
        .into_iter()
        .map(|guide| PopularItem {
            id: guide.id,
            image: image(guide.image.as_deref()),
            author: guide.author_name,
            rating: Some(guide.rating),
            url: format!("/guides/{}", guide.id),
            title: guide.title,
            kind: HitKind::Guide,
        })
        .collect();

    let announcements: Vec<PopularItem> = announcements::latest(db_pool, LATEST_ANNOUNCEMENTS)
        .await?
        .into_iter()
        .map(|announcement| PopularItem {
            id: announcement.id,
            image: image(announcement.image.as_deref()),
            author: announcement.author_name,
            rating: None,
            url: format!("/announcements/{}", announcement.id),
            title: announcement.title,
            kind: HitKind::Announcement,
        })
        .collect();

    let items = guides.iter().chain(&announcements).take(CAROUSEL_ITEMS).cloned().collect();
    Ok(Popular { guides, announcements, items })
}

#[debug_handler(state = AppState)]
pub async fn popular_items(
    State(db_pool): State<SqlitePool>,
    State(config): State<Arc<Config>>,
) -> AppResult<Json<Popular>> {
    Ok(Json(popular(&db_pool, &config.public_url).await?))
}
