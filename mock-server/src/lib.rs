use std::{collections::BTreeMap, sync::Arc, time::Duration};

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, Method, StatusCode},
    response::{IntoResponse, Redirect},
    routing::{any, get},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};

/// A blog post in the jsonplaceholder shape.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub user_id: u64,
    pub id: u64,
    pub title: String,
    pub body: String,
}

/// A story in the Lobsters shape (snake_case keys, as the real API sends).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Story {
    pub short_id: String,
    pub created_at: String,
    pub title: String,
    pub url: String,
    pub score: i64,
    pub comment_count: u64,
    pub submitter_user: String,
    pub tags: Vec<String>,
}

pub type Db = Arc<RwLock<BTreeMap<u64, Value>>>;

#[derive(Clone)]
pub struct AppState {
    posts: Db,
    stories: Arc<Vec<Story>>,
}

pub const STORIES_PER_PAGE: usize = 2;

pub fn seed_posts() -> BTreeMap<u64, Value> {
    (1..=3)
        .map(|id| {
            let post = Post {
                user_id: 1,
                id,
                title: format!("post {id}"),
                body: format!("body of post {id}"),
            };
            (id, serde_json::to_value(post).unwrap_or(Value::Null))
        })
        .collect()
}

pub fn seed_stories() -> Vec<Story> {
    ["xriq3g", "a1b2c3", "zz9yy8"]
        .iter()
        .enumerate()
        .map(|(i, id)| Story {
            short_id: id.to_string(),
            created_at: format!("2024-01-0{}T00:00:00.000-06:00", i + 1),
            title: format!("story {id}"),
            url: format!("https://example.com/{id}"),
            score: 10 - i as i64,
            comment_count: i as u64,
            submitter_user: "alice".to_string(),
            tags: vec!["rust".to_string()],
        })
        .collect()
}

pub const SLOW_DELAY: Duration = Duration::from_secs(2);

pub fn app() -> Router {
    let state = AppState {
        posts: Arc::new(RwLock::new(seed_posts())),
        stories: Arc::new(seed_stories()),
    };
    Router::new()
        .route("/posts", get(list_posts).post(create_post))
        .route(
            "/posts/{id}",
            get(get_post).put(replace_post).patch(update_post).delete(delete_post),
        )
        .route("/active/page/{page}", get(active_page))
        .route("/s/{id}", get(get_story))
        .route("/echo", any(echo))
        .route("/redirect/{hops}", get(redirect))
        .route("/text", get(|| async { "plain text, not json" }))
        .route("/slow", get(slow))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

async fn list_posts(State(state): State<AppState>) -> Json<Vec<Value>> {
    let posts = state.posts.read().await;
    Json(posts.values().cloned().collect())
}

fn with_id(input: Value, id: u64) -> Value {
    let mut fields = match input {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    fields.insert("id".to_string(), json!(id));
    Value::Object(fields)
}

async fn create_post(State(state): State<AppState>, Json(input): Json<Value>) -> (StatusCode, Json<Value>) {
    let mut posts = state.posts.write().await;
    let id = posts.keys().next_back().copied().unwrap_or(0) + 1;
    let post = with_id(input, id);
    posts.insert(id, post.clone());
    (StatusCode::CREATED, Json(post))
}

async fn get_post(State(state): State<AppState>, Path(id): Path<u64>) -> Result<Json<Value>, StatusCode> {
    let posts = state.posts.read().await;
    posts.get(&id).cloned().map(Json).ok_or(StatusCode::NOT_FOUND)
}

async fn replace_post(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(input): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    let mut posts = state.posts.write().await;
    let slot = posts.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    *slot = with_id(input, id);
    Ok(Json(slot.clone()))
}

async fn update_post(
    State(state): State<AppState>,
    Path(id): Path<u64>,
    Json(input): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    let mut posts = state.posts.write().await;
    let slot = posts.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    if let (Value::Object(existing), Value::Object(changes)) = (&mut *slot, input) {
        for (key, value) in changes {
            if key != "id" {
                existing.insert(key, value);
            }
        }
    }
    Ok(Json(slot.clone()))
}

/// Deletes answer 200 with an empty body.
async fn delete_post(State(state): State<AppState>, Path(id): Path<u64>) -> StatusCode {
    state.posts.write().await.remove(&id);
    StatusCode::OK
}

fn strip_json(segment: &str) -> Option<&str> {
    segment.strip_suffix(".json")
}

async fn active_page(
    State(state): State<AppState>,
    Path(page): Path<String>,
) -> Result<Json<Vec<Story>>, StatusCode> {
    let page: usize = strip_json(&page)
        .and_then(|p| p.parse().ok())
        .filter(|p| *p >= 1)
        .ok_or(StatusCode::NOT_FOUND)?;
    let stories = state
        .stories
        .iter()
        .skip((page - 1) * STORIES_PER_PAGE)
        .take(STORIES_PER_PAGE)
        .cloned()
        .collect();
    Ok(Json(stories))
}

async fn get_story(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    let found = strip_json(&id).and_then(|id| state.stories.iter().find(|s| s.short_id == id));
    match found {
        Some(story) => (StatusCode::OK, Json(json!(story))),
        None => (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" }))),
    }
}

/// Reflect the request back so clients can inspect what went over the wire.
async fn echo(method: Method, headers: HeaderMap, body: Bytes) -> Json<Value> {
    let headers: Map<String, Value> = headers
        .iter()
        .map(|(name, value)| {
            let value = String::from_utf8_lossy(value.as_bytes()).into_owned();
            (name.as_str().to_string(), Value::String(value))
        })
        .collect();
    Json(json!({
        "method": method.as_str(),
        "headers": headers,
        "raw_body": String::from_utf8_lossy(&body),
    }))
}

/// Redirect `hops` times before landing on post 1.
async fn redirect(Path(hops): Path<u32>) -> Redirect {
    if hops <= 1 {
        Redirect::temporary("/posts/1")
    } else {
        Redirect::temporary(&format!("/redirect/{}", hops - 1))
    }
}

/// Answers after `SLOW_DELAY`, long enough to trip a short client timeout.
async fn slow() -> Json<Value> {
    tokio::time::sleep(SLOW_DELAY).await;
    Json(json!({ "slow": true }))
}
