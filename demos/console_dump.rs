use chrono::Utc;
use logpush_agent::value::{ErrorValue, RequestInfo, ResponseInfo};
use logpush_agent::{args, Agent, AgentConfig, MetadataInit, Value};

#[tokio::main]
async fn main() {
    let config = AgentConfig::from_env()
        .unwrap_or_else(|| AgentConfig::new("http://localhost:8000/push/stream/demo"))
        .meta(MetadataInit::new().with("api", "console-test").with("agent", "rust").with("env", "dev"));
    let agent = match Agent::from_config(config) {
        Ok(agent) => agent,
        Err(e) => {
            eprintln!("cannot create agent: {e}");
            return;
        }
    };
    let console = agent.console();

    console.debug(&args![
        "Dumping form data:",
        Value::form_data([("name", "John Doe"), ("phone", "+100000000000")]),
    ]);

    console.debug(&args![
        "Just writing multiple values",
        true,
        42,
        Utc::now(),
        Value::regexp("heeey", "ig"),
        Value::map([("uhm", "secret")]),
        Value::set([Value::from("aaa"), Value::object([("key", "bbb")])]),
    ]);

    console.debug(&args![ErrorValue::new("Task failed successfully")]);

    console.debug(&args![Value::object([
        ("type", Value::from("lead data")),
        ("title", Value::from("miata shop")),
        ("bid_price", Value::from(35_000)),
    ])]);

    console.debug(&args![Value::headers([("content-type", "application/json")])]);
    console.debug(&args![ResponseInfo::new(200).with_headers([("content-type", "application/json")])]);
    console.debug(&args![RequestInfo::new("https://localhost:8080/path?query=goth")
        .with_method("GET")
        .with_headers([("content-type", "application/json")])]);

    if let Err(e) = agent.flush().await {
        eprintln!("{e}");
    }
}
