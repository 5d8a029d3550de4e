use logpush_agent::{Agent, AgentConfig, Logger, MetadataInit};
use std::time::Instant;

fn process_lead_form(logger: &Logger<'_>) {
    logger.info("Processing lead form request");
    logger.warn_with(
        "Pretending that theres an issue with something, but we still can proceed",
        &MetadataInit::new().with("database", "postgres"),
    );
    logger.info_with("Recaptcha OK", &MetadataInit::new().with("score", 0.9));
    logger.log_with(
        "Accepted form",
        &MetadataInit::new()
            .with("product_code", "miata mx5-nd")
            .with("lead_price", 35_000)
            .with("currency", "EUR"),
    );
}

#[tokio::main]
async fn main() {
    let started = Instant::now();

    let config = AgentConfig::from_env()
        .unwrap_or_else(|| AgentConfig::new("http://localhost:8000").service_id("demo"))
        .meta(
            MetadataInit::new()
                .with("remote_addr", Some("10.10.10.10"))
                .with("method", "get")
                .with("api", "/api/name/procedure")
                .with("env", "prod"),
        );
    let agent = match Agent::from_config(config) {
        Ok(agent) => agent,
        Err(e) => {
            eprintln!("cannot create agent: {e}");
            return;
        }
    };

    let logger = agent.logger();
    process_lead_form(&logger);
    logger.debug_with(
        "Request done",
        &MetadataInit::new().with("t", started.elapsed().as_millis() as u64),
    );

    if let Err(e) = agent.flush().await {
        eprintln!("{e}");
    }
}
