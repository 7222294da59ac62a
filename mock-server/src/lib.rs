//! In-process emulation of the Zenzap external integration API.
//!
//! Verifies bearer tokens and HMAC signatures, scopes topics to their
//! members, resolves short and full (`botId:shortId`) external ids the way
//! the real service does, and paginates with opaque cursors.

pub mod auth;
pub mod error;
pub mod store;

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    routing::{get, post},
    Extension, Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub use auth::{signature, Caller};
pub use error::ApiError;
pub use store::{Bot, Fixture, Member, Message, Store, Task, Topic};

pub type Db = Arc<RwLock<Store>>;

pub fn app() -> Router {
    app_with(Fixture::default())
}

pub fn app_with(fixture: Fixture) -> Router {
    router(Arc::new(RwLock::new(Store::new(fixture))))
}

/// Router over an existing store, so tests can inspect state afterwards.
pub fn router(db: Db) -> Router {
    Router::new()
        .route("/v2/members/me", get(current_member))
        .route("/v2/members", get(list_members))
        .route("/v2/topics", get(list_topics).post(create_topic))
        .route("/v2/topics/external/{external_id}", get(get_topic_by_external_id))
        .route("/v2/topics/{id}", get(get_topic).patch(update_topic))
        .route("/v2/topics/{id}/members", post(add_members).delete(remove_members))
        .route("/v2/topics/{id}/messages", post(send_message))
        .route("/v2/topics/{id}/tasks", post(create_task))
        .layer(middleware::from_fn_with_state(db.clone(), auth::authenticate))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

pub async fn run_with(listener: TcpListener, fixture: Fixture) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with(fixture)).await
}

/// Log the seeded bot accounts. Keys and secrets stay out of the log.
pub fn announce(fixture: &Fixture) {
    for bot in &fixture.bots {
        tracing::info!(bot = %bot.id, name = %bot.name, "seeded bot account");
    }
}

#[derive(Deserialize)]
struct ListQuery {
    limit: Option<u32>,
    cursor: Option<String>,
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

fn listing<T: serde::Serialize>(key: &str, page: store::Listing<T>) -> Json<Value> {
    let mut body = serde_json::Map::new();
    body.insert(key.to_string(), json!(page.items));
    if let Some(cursor) = page.next_cursor {
        body.insert("nextCursor".to_string(), Value::String(cursor));
    }
    Json(Value::Object(body))
}

async fn current_member(
    State(db): State<Db>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Member>, ApiError> {
    let store = db.read().await;
    store.member(caller.id).cloned().map(Json)
}

async fn list_members(State(db): State<Db>, Query(query): Query<ListQuery>) -> Result<Json<Value>, ApiError> {
    let store = db.read().await;
    let page = store.list_members(query.limit, query.cursor.as_deref())?;
    Ok(listing("members", page))
}

async fn create_topic(
    State(db): State<Db>,
    Extension(caller): Extension<Caller>,
    Json(input): Json<store::CreateTopic>,
) -> Result<(StatusCode, Json<Topic>), ApiError> {
    let topic = db.write().await.create_topic(caller.id, input, now_millis())?;
    Ok((StatusCode::CREATED, Json(topic)))
}

async fn get_topic(
    State(db): State<Db>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<Json<Topic>, ApiError> {
    let store = db.read().await;
    store.topic(caller.id, id).cloned().map(Json)
}

async fn get_topic_by_external_id(
    State(db): State<Db>,
    Extension(caller): Extension<Caller>,
    Path(external_id): Path<String>,
) -> Result<Json<Topic>, ApiError> {
    let store = db.read().await;
    store.topic_by_external_id(caller.id, &external_id).cloned().map(Json)
}

async fn list_topics(
    State(db): State<Db>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<ListQuery>,
) -> Result<Json<Value>, ApiError> {
    let store = db.read().await;
    let page = store.list_topics(caller.id, query.limit, query.cursor.as_deref())?;
    Ok(listing("topics", page))
}

async fn update_topic(
    State(db): State<Db>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
    Json(input): Json<store::UpdateTopic>,
) -> Result<Json<Topic>, ApiError> {
    db.write().await.update_topic(caller.id, id, input).map(Json)
}

async fn add_members(
    State(db): State<Db>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
    Json(input): Json<store::MemberIds>,
) -> Result<Json<Topic>, ApiError> {
    db.write().await.add_members(caller.id, id, input).map(Json)
}

async fn remove_members(
    State(db): State<Db>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
    Json(input): Json<store::MemberIds>,
) -> Result<Json<Topic>, ApiError> {
    db.write().await.remove_members(caller.id, id, input).map(Json)
}

async fn send_message(
    State(db): State<Db>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
    Json(input): Json<store::SendMessage>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let message = db.write().await.create_message(caller.id, id, input, now_millis())?;
    Ok((StatusCode::CREATED, Json(message)))
}

async fn create_task(
    State(db): State<Db>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
    Json(input): Json<store::CreateTask>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let task = db.write().await.create_task(caller.id, id, input, now_millis())?;
    Ok((StatusCode::CREATED, Json(task)))
}
