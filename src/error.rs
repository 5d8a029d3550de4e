/// Error returned by a [`LogSink`](crate::sink::LogSink) when a payload
/// could not be delivered.
#[derive(thiserror::Error, Debug)]
pub enum SinkError {
    #[cfg(feature = "http")]
    #[error("push request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("ingester rejected push with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

impl SinkError {
    /// Response body text for rejected pushes.
    pub fn body(&self) -> Option<&str> {
        match self {
            SinkError::Rejected { body, .. } => Some(body),
            #[cfg(feature = "http")]
            SinkError::Request(_) => None,
        }
    }
}

/// Error returned when resolving the ingester endpoint.
#[derive(thiserror::Error, Debug)]
pub enum EndpointError {
    #[error("invalid push url: {0}")]
    Parse(#[from] url::ParseError),

    #[error("unsupported push url scheme: {0}")]
    UnsupportedScheme(String),
}

/// Error type surfaced by [`Agent`](crate::agent::Agent).
#[derive(thiserror::Error, Debug)]
pub enum AgentError {
    #[error(transparent)]
    Endpoint(#[from] EndpointError),

    #[error("failed to flush log entries: {0}")]
    Flush(#[from] SinkError),

    #[cfg(feature = "http")]
    #[error("failed to build http client: {0}")]
    Client(reqwest::Error),
}

/// Reasons a composite value could not be rendered as JSON.
///
/// Never escapes the serializer; callers see the `{}` placeholder instead.
#[derive(thiserror::Error, Debug)]
pub enum SerializeError {
    #[error("converting circular structure to JSON")]
    Circular,

    #[error("bigint values cannot be serialized to JSON")]
    BigInt,

    #[error("value is locked by a panicked writer")]
    Poisoned,

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

