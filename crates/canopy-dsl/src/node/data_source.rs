use serde::{Deserialize, Serialize};
use std::fmt;

/// HTTP methods a data source may use
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HttpMethod {
    /// GET
    #[default]
    #[serde(rename = "GET")]
    Get,
    /// POST
    #[serde(rename = "POST")]
    Post,
    /// PUT
    #[serde(rename = "PUT")]
    Put,
}

impl HttpMethod {
    /// The wire name of the method
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request header. Key and value are both expression templates.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Header {
    /// Header name template
    pub key: String,
    /// Header value template
    pub value: String,
}

impl Header {
    /// Create a header
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A node that fetches remote data and exposes it as the data scope of
/// its children.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSource {
    /// Expression template of the request URL
    pub url: String,

    /// Request method (defaults to GET)
    #[serde(default)]
    pub http_method: HttpMethod,

    /// Optional expression template of the request body
    #[serde(default)]
    pub http_body: Option<String>,

    /// Ordered request headers; keys need not be unique
    pub headers: Vec<Header>,
}

impl DataSource {
    /// A GET data source with no headers
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http_method: HttpMethod::Get,
            http_body: None,
            headers: Vec::new(),
        }
    }
}
