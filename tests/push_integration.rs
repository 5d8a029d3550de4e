//! End-to-end flush tests against a mock ingester.

use logpush_agent::{args, Agent, AgentConfig, AgentError, LogLevel, MetadataInit, SinkError, Value};
use mockito::{Matcher, Server};
use serde_json::json;
use std::time::Duration;

fn static_meta() -> MetadataInit {
    MetadataInit::new()
        .with("api", "console-test")
        .with("agent", "rust")
        .with("env", "dev")
        .with("remote_addr", None::<&str>)
}

#[tokio::test]
async fn flush_posts_entries_in_order_and_clears_buffer() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/push/stream/svc-1")
        .match_header("content-type", "application/json")
        .match_header("authorization", Matcher::Missing)
        .match_body(Matcher::AllOf(vec![
            Matcher::PartialJson(json!({ "meta": { "api": "console-test", "agent": "rust", "env": "dev" } })),
            Matcher::Regex(
                r#""entries":\[\{"date":\d+,"level":"info","message":"start"\},\{"date":\d+,"level":"error","message":"boom","meta":\{"code":"500"\}\}\]"#
                    .to_string(),
            ),
        ]))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let config = AgentConfig::new(server.url())
        .service_id("svc-1")
        .meta(static_meta())
        .mirror(false);
    let agent = Agent::from_config(config).unwrap();
    assert!(!agent.meta().contains_key("remote_addr"));

    agent.logger().info("start");
    agent.logger().error_with("boom", &MetadataInit::new().with("code", 500));
    agent.flush().await.unwrap();

    mock.assert_async().await;
    assert!(agent.is_empty());
}

#[tokio::test]
async fn empty_flush_sends_nothing() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let agent = Agent::from_config(AgentConfig::new(server.url()).mirror(false)).unwrap();
    agent.flush().await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn rejected_flush_keeps_entries_and_reports_body() {
    let mut server = Server::new_async().await;
    let failing = server
        .mock("POST", "/push/stream/")
        .with_status(500)
        .with_body("Internal Server Error")
        .expect(1)
        .create_async()
        .await;

    let agent = Agent::from_config(AgentConfig::new(server.url()).mirror(false)).unwrap();
    agent.append(LogLevel::Warn, "kept", Some(&MetadataInit::new().with("database", "postgres")));
    let before = agent.pending();

    let err = agent.flush().await.unwrap_err();
    match &err {
        AgentError::Flush(SinkError::Rejected { status, body }) => {
            assert_eq!(*status, 500);
            assert_eq!(body, "Internal Server Error");
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(err.to_string().contains("Internal Server Error"));
    assert_eq!(agent.pending(), before);
    failing.assert_async().await;
    failing.remove_async().await;

    let ok = server
        .mock("POST", "/push/stream/")
        .match_body(Matcher::Regex(r#""message":"kept","meta":\{"database":"postgres"\}"#.to_string()))
        .with_status(202)
        .expect(1)
        .create_async()
        .await;

    agent.flush().await.unwrap();
    ok.assert_async().await;
    assert!(agent.is_empty());
}

#[tokio::test]
async fn credentials_move_into_basic_auth_header() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/push/stream/abc")
        .match_header("authorization", "Basic dXNlcjpwYXNz")
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let url = format!("http://user:pass@{}/push/stream/abc", server.host_with_port());
    let agent = Agent::new(&url, MetadataInit::new()).unwrap().mirror(false);
    agent.append(LogLevel::Info, "authorized", None);
    agent.flush().await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn console_values_arrive_as_one_message() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/push/stream/")
        .match_body(Matcher::Regex(r#""level":"debug","message":"true 42 /a/i""#.to_string()))
        .with_status(200)
        .expect(1)
        .create_async()
        .await;

    let agent = Agent::from_config(AgentConfig::new(server.url()).mirror(false)).unwrap();
    agent.console().debug(&args![true, 42, Value::regexp("a", "i")]);
    agent.flush().await.unwrap();

    mock.assert_async().await;
}

#[tokio::test]
async fn unreachable_ingester_is_a_flush_error() {
    // Port 9 (discard) is not expected to accept HTTP connections.
    let config = AgentConfig::new("http://127.0.0.1:9")
        .timeout(Duration::from_secs(2))
        .mirror(false);
    let agent = Agent::from_config(config).unwrap();
    agent.append(LogLevel::Error, "lost?", None);

    let err = agent.flush().await.unwrap_err();
    assert!(matches!(err, AgentError::Flush(SinkError::Request(_))));
    assert_eq!(agent.len(), 1);
}

#[test]
fn invalid_url_is_rejected_at_construction() {
    assert!(matches!(
        Agent::new("definitely not a url", MetadataInit::new()),
        Err(AgentError::Endpoint(_))
    ));
}
