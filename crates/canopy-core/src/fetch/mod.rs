//! Data source fetching.
//!
//! The engine never talks to the network itself. A host supplies an
//! [`HttpTransport`]; [`DataSourceFetcher`] resolves a data source's
//! templates into a concrete [`HttpRequest`], hands it to the transport and
//! decodes the response into a payload.

mod coordinator;

pub use coordinator::{FetchCompletion, FetchCoordinator, FetchState};

use async_trait::async_trait;
use canopy_dsl::{DataSource, Header, HttpMethod};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::error::FetchError;
use crate::expression::resolve;
use crate::scope::DataScope;

/// A fully resolved request, ready for the transport.
///
/// Two requests are equal when method, url, headers (in order) and body are
/// equal; the coordinator uses this to skip redundant refetches.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HttpRequest {
    /// HTTP method
    pub method: HttpMethod,
    /// Absolute URL
    pub url: Url,
    /// Headers in send order; keys may repeat
    pub headers: Vec<Header>,
    /// Request body
    pub body: Option<String>,
}

/// Raw transport response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    /// Status code
    pub status: u16,
    /// Body bytes
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Whether the status is in the 2xx range
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Failure reported by a transport before any response was received
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct TransportError(pub String);

/// The fetch collaborator supplied by the host
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Perform exactly one request
    async fn perform_request(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

/// Resolves data sources into requests and executes them
#[derive(Clone)]
pub struct DataSourceFetcher {
    transport: Arc<dyn HttpTransport>,
    default_headers: Vec<Header>,
}

impl DataSourceFetcher {
    /// Create a fetcher over a transport
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            transport,
            default_headers: Vec::new(),
        }
    }

    /// Headers appended to every request after the data source's own
    pub fn with_default_headers(mut self, headers: Vec<Header>) -> Self {
        self.default_headers = headers;
        self
    }

    /// Resolve the templates of a data source against a scope.
    ///
    /// Headers whose key or value does not resolve are left out. An
    /// unresolved URL or body fails the whole request.
    pub fn resolve_request(&self, source: &DataSource, scope: &DataScope) -> Result<HttpRequest, FetchError> {
        let resolved_url =
            resolve(&source.url, scope).ok_or_else(|| FetchError::UnresolvedUrl(source.url.clone()))?;

        let url = Url::parse(&resolved_url).map_err(|e| FetchError::InvalidUrl {
            url: resolved_url.clone(),
            reason: e.to_string(),
        })?;

        let mut headers = Vec::with_capacity(source.headers.len() + self.default_headers.len());
        for header in source.headers.iter().chain(self.default_headers.iter()) {
            match (resolve(&header.key, scope), resolve(&header.value, scope)) {
                (Some(key), Some(value)) => headers.push(Header { key, value }),
                _ => warn!("Dropping header '{}' of request to {}: template does not resolve", header.key, url),
            }
        }

        let body = match &source.http_body {
            Some(template) => Some(resolve(template, scope).ok_or(FetchError::UnresolvedBody)?),
            None => None,
        };

        Ok(HttpRequest {
            method: source.http_method,
            url,
            headers,
            body,
        })
    }

    /// Send a resolved request and decode the response payload
    pub async fn execute(&self, request: &HttpRequest) -> Result<Value, FetchError> {
        debug!("Fetching {} {}", request.method, request.url);

        let response = self
            .transport
            .perform_request(request)
            .await
            .map_err(|e| FetchError::FetchFailed(e.to_string()))?;

        if !response.is_success() {
            return Err(FetchError::FetchFailed(format!(
                "unexpected status code {}",
                response.status
            )));
        }

        serde_json::from_slice(&response.body).map_err(|e| FetchError::MalformedPayload(e.to_string()))
    }

    /// Resolve and execute in one step
    pub async fn fetch(&self, source: &DataSource, scope: &DataScope) -> Result<Value, FetchError> {
        let request = self.resolve_request(source, scope)?;
        self.execute(&request).await
    }
}

impl fmt::Debug for DataSourceFetcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataSourceFetcher")
            .field("default_headers", &self.default_headers)
            .finish()
    }
}
