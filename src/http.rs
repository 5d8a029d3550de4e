use crate::endpoint::Endpoint;
use crate::error::SinkError;
use crate::record::FlushPayload;
use crate::sink::LogSink;
use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use std::time::Duration;

/// Logpush ingester implementation of [`LogSink`] using its HTTP push API.
///
/// Every payload is sent as one `POST` with a JSON body. Credentials taken
/// from the endpoint URL are sent as a Basic `authorization` header.
#[derive(Clone)]
pub struct HttpSink {
    client: Client,
    endpoint: Endpoint,
    authorization: Option<String>,
}

impl HttpSink {
    /// Construct a sink for an already resolved endpoint.
    ///
    /// **Parameters**
    /// - `endpoint`: push URL plus optional credentials.
    /// - `timeout`: optional per-request timeout; without one a request
    ///   runs until the server answers or the connection fails.
    pub fn new(endpoint: Endpoint, timeout: Option<Duration>) -> Result<Self, reqwest::Error> {
        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        Ok(Self::with_client(builder.build()?, endpoint))
    }

    /// Construct a sink that reuses an existing client.
    pub fn with_client(client: Client, endpoint: Endpoint) -> Self {
        let authorization = endpoint.auth.as_ref().map(|auth| auth.header_value());
        Self {
            client,
            endpoint,
            authorization,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }
}

#[async_trait]
impl LogSink for HttpSink {
    async fn push(&self, payload: &FlushPayload) -> Result<(), SinkError> {
        let mut request = self
            .client
            .post(self.endpoint.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .json(payload);
        if let Some(authorization) = &self.authorization {
            request = request.header(AUTHORIZATION, authorization);
        }

        let resp = request.send().await?;
        if resp.status().is_success() {
            Ok(())
        } else {
            let status = resp.status().as_u16();
            let body = resp.text().await.unwrap_or_else(|_| "<no body>".to_string());
            Err(SinkError::Rejected { status, body })
        }
    }
}
