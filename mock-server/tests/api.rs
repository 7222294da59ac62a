use std::sync::Arc;

use axum::http::{self, Request, StatusCode};
use http_body_util::BodyExt;
use mock_server::{app, router, signature, Bot, Fixture, Member, Store, Topic};
use serde_json::{json, Value};
use tokio::sync::RwLock;
use tower::ServiceExt;

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_bytes(response: axum::response::Response) -> bytes::Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

fn bots() -> (Bot, Bot) {
    let fixture = Fixture::default();
    (fixture.bots[0].clone(), fixture.bots[1].clone())
}

fn people() -> Vec<Member> {
    Fixture::default().people
}

fn signed_get(bot: &Bot, uri: &str) -> Request<String> {
    Request::builder()
        .uri(uri)
        .header(http::header::AUTHORIZATION, format!("Bearer {}", bot.api_key))
        .header("X-Signature", signature(&bot.secret, uri.as_bytes()))
        .body(String::new())
        .unwrap()
}

fn signed_json(bot: &Bot, method: &str, uri: &str, body: &str) -> Request<String> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(http::header::AUTHORIZATION, format!("Bearer {}", bot.api_key))
        .header(http::header::CONTENT_TYPE, "application/json")
        .header("X-Signature", signature(&bot.secret, body.as_bytes()))
        .body(body.to_string())
        .unwrap()
}

async fn create_topic(app: &axum::Router, bot: &Bot, body: Value) -> Topic {
    let resp = app
        .clone()
        .oneshot(signed_json(bot, "POST", "/v2/topics", &body.to_string()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    body_json(resp).await
}

// --- authentication ---

#[tokio::test]
async fn missing_bearer_is_rejected() {
    let resp = app()
        .oneshot(Request::builder().uri("/v2/members/me").body(String::new()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = body_json(resp).await;
    assert_eq!(body, json!({"error": "invalid api key"}));
}

#[tokio::test]
async fn wrong_signature_is_rejected() {
    let (bot, _) = bots();
    let mut req = signed_get(&bot, "/v2/members/me");
    req.headers_mut().insert("x-signature", signature("wrong", b"/v2/members/me").parse().unwrap());

    let resp = app().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body: Value = body_json(resp).await;
    assert_eq!(body, json!({"error": "invalid signature"}));
}

#[tokio::test]
async fn get_signature_covers_query_string() {
    let (bot, _) = bots();
    let mut req = signed_get(&bot, "/v2/members?limit=2");
    req.headers_mut().insert("x-signature", signature(&bot.secret, b"/v2/members").parse().unwrap());

    let resp = app().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn body_signature_covers_exact_bytes() {
    let (bot, _) = bots();
    let alice = people()[0].id;
    let compact = json!({"name": "Launch", "members": [alice]}).to_string();
    let pretty = serde_json::to_string_pretty(&json!({"name": "Launch", "members": [alice]})).unwrap();

    let mut req = signed_json(&bot, "POST", "/v2/topics", &pretty);
    req.headers_mut().insert("x-signature", signature(&bot.secret, compact.as_bytes()).parse().unwrap());

    let resp = app().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

// --- members ---

#[tokio::test]
async fn current_member_is_the_calling_bot() {
    let (bot, _) = bots();
    let resp = app().oneshot(signed_get(&bot, "/v2/members/me")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let me: Value = body_json(resp).await;
    assert_eq!(me["id"], json!(bot.id));
    assert_eq!(me["type"], "bot");
}

#[tokio::test]
async fn members_paginate_with_cursor() {
    let (bot, _) = bots();
    let app = app();

    let resp = app.clone().oneshot(signed_get(&bot, "/v2/members?limit=4")).await.unwrap();
    let first: Value = body_json(resp).await;
    assert_eq!(first["members"].as_array().unwrap().len(), 4);
    let cursor = first["nextCursor"].as_str().unwrap().to_string();

    let uri = format!("/v2/members?limit=4&cursor={cursor}");
    let resp = app.oneshot(signed_get(&bot, &uri)).await.unwrap();
    let second: Value = body_json(resp).await;
    assert_eq!(second["members"].as_array().unwrap().len(), 3);
    assert!(second.get("nextCursor").is_none());
}

#[tokio::test]
async fn limit_out_of_range_returns_400() {
    let (bot, _) = bots();
    let resp = app().oneshot(signed_get(&bot, "/v2/topics?limit=500")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}

// --- topics ---

#[tokio::test]
async fn create_topic_validates_members() {
    let (bot, _) = bots();
    let resp = app()
        .oneshot(signed_json(&bot, "POST", "/v2/topics", r#"{"name":"Empty","members":[]}"#))
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    let body: Value = body_json(resp).await;
    assert_eq!(body["error"], "at least one member is required");
}

#[tokio::test]
async fn external_id_resolution_by_bot() {
    let (a, b) = bots();
    let app = app();
    let topic = create_topic(
        &app,
        &a,
        json!({"name": "Shared", "members": [b.id], "externalId": "project-123"}),
    )
    .await;
    assert_eq!(topic.external_id, Some(format!("{}:project-123", a.id)));

    // creator resolves the short form
    let resp = app
        .clone()
        .oneshot(signed_get(&a, "/v2/topics/external/project-123"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // another member cannot
    let resp = app
        .clone()
        .oneshot(signed_get(&b, "/v2/topics/external/project-123"))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // but can use the percent-encoded full form
    let uri = format!("/v2/topics/external/{}%3Aproject-123", a.id);
    let resp = app.oneshot(signed_get(&b, &uri)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let found: Topic = body_json(resp).await;
    assert_eq!(found.id, topic.id);
}

#[tokio::test]
async fn duplicate_external_id_returns_409() {
    let (a, _) = bots();
    let alice = people()[0].id;
    let app = app();
    let body = json!({"name": "One", "members": [alice], "externalId": "dup"});
    create_topic(&app, &a, body.clone()).await;

    let resp = app
        .oneshot(signed_json(&a, "POST", "/v2/topics", &body.to_string()))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn bad_topic_uuid_returns_400_text() {
    let (a, _) = bots();
    let resp = app().oneshot(signed_get(&a, "/v2/topics/not-a-uuid")).await.unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert!(!body_bytes(resp).await.is_empty());
}

#[tokio::test]
async fn topic_lifecycle() {
    let (a, b) = bots();
    let people = people();
    let db = Arc::new(RwLock::new(Store::new(Fixture::default())));
    let app = router(db.clone());

    let topic = create_topic(&app, &a, json!({"name": "Launch", "members": [people[0].id]})).await;
    assert_eq!(topic.members, vec![a.id, people[0].id]);
    let uri = format!("/v2/topics/{}", topic.id);

    // not visible to a non-member
    let resp = app.clone().oneshot(signed_get(&b, &uri)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // rename
    let resp = app
        .clone()
        .oneshot(signed_json(&a, "PATCH", &uri, r#"{"name":"Launch v2"}"#))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let updated: Topic = body_json(resp).await;
    assert_eq!(updated.name, "Launch v2");

    // add bot b, which can now see it
    let members_uri = format!("{uri}/members");
    let body = json!({"memberIds": [b.id]}).to_string();
    let resp = app
        .clone()
        .oneshot(signed_json(&a, "POST", &members_uri, &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = app.clone().oneshot(signed_get(&b, &uri)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // message and task
    let body = r#"{"text":"Hello","externalId":"msg-1"}"#;
    let resp = app
        .clone()
        .oneshot(signed_json(&a, "POST", &format!("{uri}/messages"), body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let message: Value = body_json(resp).await;
    assert_eq!(message["topicId"], json!(topic.id));
    assert_eq!(message["externalId"], format!("{}:msg-1", a.id));

    let body = json!({"title": "Review", "assignee": people[0].id, "dueDate": 1_700_000_000_000_i64}).to_string();
    let resp = app
        .clone()
        .oneshot(signed_json(&a, "POST", &format!("{uri}/tasks"), &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    // bot b leaves
    let body = json!({"memberIds": [b.id]}).to_string();
    let resp = app
        .clone()
        .oneshot(signed_json(&b, "DELETE", &members_uri, &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let resp = app.oneshot(signed_get(&b, &uri)).await.unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let store = db.read().await;
    assert_eq!(store.messages().len(), 1);
    assert_eq!(store.tasks().len(), 1);
    assert_eq!(store.tasks()[0].due_date, Some(1_700_000_000_000));
}

#[tokio::test]
async fn more_than_five_members_returns_400() {
    let (a, _) = bots();
    let people = people();
    let app = app();
    let topic = create_topic(&app, &a, json!({"name": "Batch", "members": [people[0].id]})).await;

    let ids: Vec<_> = people.iter().map(|p| p.id).chain([a.id]).collect();
    let body = json!({ "memberIds": ids }).to_string();
    let resp = app
        .oneshot(signed_json(&a, "POST", &format!("/v2/topics/{}/members", topic.id), &body))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
