//! End-to-end tests against the live mock server.
//!
//! # Design
//! Each test starts its own mock server on a random port, so state never
//! leaks between tests, then drives `ZenzapClient` over real HTTP with the
//! default ureq transport.

use std::time::{Duration, Instant};

use mock_server::{Bot, Fixture};
use serde_json::json;
use uuid::Uuid;
use zenzap_core::{
    ApiResponse, ClientConfig, CreateTask, CreateTopic, ListParams, Member, Message, Page, SendMessage, Task, Topic,
    TransportError, UpdateTopic, ZenzapClient, ZenzapError,
};

fn spawn_server() -> String {
    let std_listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = std_listener.local_addr().unwrap();
    std_listener.set_nonblocking(true).unwrap();

    std::thread::spawn(move || {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        rt.block_on(async {
            let listener = tokio::net::TcpListener::from_std(std_listener).unwrap();
            mock_server::run(listener).await
        })
        .unwrap();
    });

    format!("http://{addr}")
}

fn client(base_url: &str, bot: &Bot) -> ZenzapClient {
    let config = ClientConfig::new(&bot.api_key, &bot.secret)
        .with_base_url(base_url)
        .with_timeout(Duration::from_secs(5));
    ZenzapClient::new(config).unwrap()
}

fn created<T: serde::de::DeserializeOwned>(response: ApiResponse) -> T {
    assert!(response.success, "unexpected failure: {} {}", response.status, response.data);
    assert_eq!(response.status, 201);
    response.json().unwrap()
}

#[test]
fn topic_workflow() {
    let fixture = Fixture::default();
    let (bot, partner) = (&fixture.bots[0], &fixture.bots[1]);
    let alice = fixture.people[0].id;
    let bob = fixture.people[1].id;
    let client = client(&spawn_server(), bot);

    // Step 1: who am I.
    let me: Member = client.get_current_member().unwrap().json().unwrap();
    assert_eq!(me.id, bot.id);
    assert_eq!(me.kind.as_deref(), Some("bot"));

    // Step 2: create a topic.
    let topic: Topic = created(
        client
            .create_topic(&CreateTopic::new("Launch", vec![alice]).description("Kickoff"))
            .unwrap(),
    );
    assert_eq!(topic.name, "Launch");
    assert_eq!(topic.description.as_deref(), Some("Kickoff"));
    assert!(topic.members.contains(&bot.id));
    assert!(topic.members.contains(&alice));

    // Step 3: message and task.
    let message: Message = created(
        client
            .send_message(topic.id, &SendMessage::new("Hello team").external_id("msg-1"))
            .unwrap(),
    );
    assert_eq!(message.topic_id, topic.id);
    assert_eq!(message.text, "Hello team");
    assert_eq!(message.external_id, Some(format!("{}:msg-1", bot.id)));

    let task: Task = created(
        client
            .create_task(
                topic.id,
                &CreateTask::new("Review").assignee(alice).due_date(1_700_000_000_000),
            )
            .unwrap(),
    );
    assert_eq!(task.topic_id, topic.id);
    assert_eq!(task.assignee, Some(alice));
    assert_eq!(task.due_date, Some(1_700_000_000_000));

    // Step 4: rename.
    let response = client
        .update_topic(topic.id, &UpdateTopic::default().name("Launch v2"))
        .unwrap();
    assert!(response.success);
    assert_eq!(response.str_field("name"), Some("Launch v2"));

    // Step 5: add and remove members.
    let response = client.add_topic_members(topic.id, &[bob, partner.id]).unwrap();
    assert!(response.success);
    let updated: Topic = response.json().unwrap();
    assert!(updated.members.contains(&bob));

    let response = client.remove_topic_members(topic.id, &[bob]).unwrap();
    let updated: Topic = response.json().unwrap();
    assert!(!updated.members.contains(&bob));
    assert!(updated.members.contains(&partner.id));

    // Step 6: read back.
    let fetched: Topic = client.get_topic(topic.id).unwrap().json().unwrap();
    assert_eq!(fetched.name, "Launch v2");
    assert_eq!(fetched.members, updated.members);

    // Step 7: leave; the topic is no longer visible.
    let response = client.leave_topic(topic.id).unwrap();
    assert!(response.success);
    let response = client.get_topic(topic.id).unwrap();
    assert!(response.is_not_found());
    assert!(!response.success);
}

#[test]
fn external_id_resolution() {
    let fixture = Fixture::default();
    let (bot, partner) = (&fixture.bots[0], &fixture.bots[1]);
    let base_url = spawn_server();
    let creator = client(&base_url, bot);
    let other = client(&base_url, partner);

    let topic: Topic = created(
        creator
            .create_topic(&CreateTopic::new("Shared", vec![partner.id]).external_id("project-123"))
            .unwrap(),
    );
    let full = format!("{}:project-123", bot.id);
    assert_eq!(topic.external_id.as_deref(), Some(full.as_str()));
    let parsed = topic.parsed_external_id().unwrap();
    assert_eq!(parsed.short_id(), "project-123");
    assert_eq!(parsed.bot_id(), Some(bot.id.to_string().as_str()));

    // the creator resolves both forms
    let found: Topic = creator.get_topic_by_external_id("project-123").unwrap().json().unwrap();
    assert_eq!(found.id, topic.id);
    let found: Topic = creator.get_topic_by_external_id(&full).unwrap().json().unwrap();
    assert_eq!(found.id, topic.id);

    // another member needs the full form
    let response = other.get_topic_by_external_id("project-123").unwrap();
    assert!(response.is_not_found());
    let found: Topic = other.get_topic_by_external_id(&full).unwrap().json().unwrap();
    assert_eq!(found.id, topic.id);

    // reusing the short id is a conflict for the same bot only
    let response = creator
        .create_topic(&CreateTopic::new("Again", vec![partner.id]).external_id("project-123"))
        .unwrap();
    assert_eq!(response.status, 409);
    let response = other
        .create_topic(&CreateTopic::new("Theirs", vec![bot.id]).external_id("project-123"))
        .unwrap();
    assert_eq!(response.status, 201);
}

#[test]
fn pagination() {
    let fixture = Fixture::default();
    let bot = &fixture.bots[0];
    let alice = fixture.people[0].id;
    let client = client(&spawn_server(), bot);

    for n in 0..5 {
        let response = client.create_topic(&CreateTopic::new(format!("Topic {n}"), vec![alice])).unwrap();
        assert!(response.success);
    }

    // pages are disjoint and the cursor round-trips verbatim
    let first = client.list_topics(&ListParams::new(2)).unwrap();
    let first: Page<Topic> = Page::from_value(&first.data, "topics").unwrap();
    assert_eq!(first.items.len(), 2);
    let cursor = first.next_cursor.clone().unwrap();

    let second = client.list_topics(&ListParams::new(2).cursor(cursor)).unwrap();
    let second: Page<Topic> = Page::from_value(&second.data, "topics").unwrap();
    assert_eq!(second.items.len(), 2);
    assert!(second.items.iter().all(|t| !first.items.contains(t)));

    let all = client.list_all_topics(2).unwrap();
    assert_eq!(all.len(), 5);

    let members = client.list_all_members(3).unwrap();
    assert_eq!(members.len(), fixture.bots.len() + fixture.people.len());
    let mut ids: Vec<Uuid> = members.iter().map(|m| m.id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), members.len());
}

#[test]
fn server_rejections_are_data() {
    let fixture = Fixture::default();
    let bot = &fixture.bots[0];
    let base_url = spawn_server();

    let config = ClientConfig::new(&bot.api_key, "not-the-secret").with_base_url(&base_url);
    let client = ZenzapClient::new(config).unwrap();
    let response = client.get_current_member().unwrap();
    assert_eq!(
        response,
        ApiResponse {
            success: false,
            status: 401,
            data: json!({"error": "invalid signature"}),
        }
    );
    assert!(response.is_unauthorized());
    assert_eq!(response.error_message(), Some("invalid signature"));

    let config = ClientConfig::new("unknown-key", &bot.secret).with_base_url(&base_url);
    let client = ZenzapClient::new(config).unwrap();
    let response = client.list_topics(&ListParams::default()).unwrap();
    assert_eq!(response.status, 401);
    assert_eq!(response.error_message(), Some("invalid api key"));
    assert!(matches!(
        response.error_for_status(),
        Err(ZenzapError::Api { status: 401, .. })
    ));
}

#[test]
fn unknown_topic_is_not_found() {
    let fixture = Fixture::default();
    let client = client(&spawn_server(), &fixture.bots[0]);

    let response = client.get_topic(Uuid::new_v4()).unwrap();
    assert_eq!(response.status, 404);
    assert!(response.error_message().is_some());
}

#[test]
fn unreachable_server_is_a_transport_error() {
    let fixture = Fixture::default();
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let client = client(&format!("http://{addr}"), &fixture.bots[0]);

    let err = client.get_current_member().unwrap_err();
    assert!(matches!(err, ZenzapError::Transport(_)), "got {err:?}");
    assert!(!err.is_local());

    // validation still runs before any I/O
    let err = client.create_topic(&CreateTopic::new("Empty", Vec::new())).unwrap_err();
    assert!(matches!(err, ZenzapError::Validation(_)), "got {err:?}");
}

#[test]
fn silent_server_times_out() {
    let fixture = Fixture::default();
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();

    // accept and hold every connection without ever answering
    std::thread::spawn(move || {
        let mut held = Vec::new();
        for stream in listener.incoming() {
            held.push(stream);
        }
    });

    let bot = &fixture.bots[0];
    let config = ClientConfig::new(&bot.api_key, &bot.secret)
        .with_base_url(format!("http://{addr}"))
        .with_timeout(Duration::from_millis(500));
    let client = ZenzapClient::new(config).unwrap();

    let started = Instant::now();
    let err = client.get_current_member().unwrap_err();
    let elapsed = started.elapsed();

    assert!(
        matches!(err, ZenzapError::Transport(TransportError::Timeout(_))),
        "got {err:?}"
    );
    assert!(elapsed >= Duration::from_millis(400), "returned after {elapsed:?}");
    assert!(elapsed < Duration::from_secs(5), "returned after {elapsed:?}");
}
