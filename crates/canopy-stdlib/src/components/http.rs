use async_trait::async_trait;
use canopy_core::{HttpRequest, HttpResponse, HttpTransport, TransportError};
use canopy_dsl::HttpMethod;
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{Client, Method};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::StdlibError;

/// Settings of the reqwest client behind [`ReqwestTransport`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Whole-request timeout in milliseconds
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Connect timeout in milliseconds
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,

    /// User agent sent with every request
    #[serde(default)]
    pub user_agent: Option<String>,
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_connect_timeout_ms() -> u64 {
    10_000
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            connect_timeout_ms: default_connect_timeout_ms(),
            user_agent: None,
        }
    }
}

/// The fetch collaborator backed by `reqwest`
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    /// Build a transport with its own client
    pub fn from_config(config: &TransportConfig) -> Result<Self, StdlibError> {
        let mut builder = Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms));

        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.as_str());
        }

        Ok(Self { client: builder.build()? })
    }

    /// Use an existing client
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

fn method_of(method: HttpMethod) -> Method {
    match method {
        HttpMethod::Get => Method::GET,
        HttpMethod::Post => Method::POST,
        HttpMethod::Put => Method::PUT,
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn perform_request(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError> {
        let mut builder = self.client.request(method_of(request.method), request.url.clone());

        // Repeated keys are appended, not replaced
        for header in &request.headers {
            match (
                HeaderName::from_bytes(header.key.as_bytes()),
                HeaderValue::from_str(&header.value),
            ) {
                (Ok(name), Ok(value)) => builder = builder.header(name, value),
                _ => warn!(
                    "Dropping header '{}' of request to {}: not a valid HTTP header",
                    header.key, request.url
                ),
            }
        }

        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        let response = builder
            .send()
            .await
            .map_err(|e| TransportError(format!("Failed to connect: {}", e)))?;

        let status = response.status().as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| TransportError(format!("Failed to read response body: {}", e)))?;

        debug!("{} {} -> {} ({} bytes)", request.method, request.url, status, body.len());

        Ok(HttpResponse {
            status,
            body: body.to_vec(),
        })
    }
}
