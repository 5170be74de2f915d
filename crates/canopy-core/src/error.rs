use thiserror::Error;

/// Core error type for the Canopy engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Node not found in the document
    #[error("Node not found: {0}")]
    NodeNotFound(String),

    /// No fetch state is recorded for a view
    #[error("No data source instance for view: {0}")]
    ViewNotFound(String),

    /// Session settling exceeded its deadline
    #[error("Timed out waiting for {0} in-flight fetches")]
    SettleTimeout(usize),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::SerializationError(err.to_string())
    }
}

/// Why a data source fetch produced no payload.
///
/// Failures are local to the data source instance that produced them.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The URL template did not fully resolve; no request was sent
    #[error("URL template does not resolve: {0}")]
    UnresolvedUrl(String),

    /// The URL resolved but is not a valid absolute URL
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The resolved string
        url: String,
        /// Parser message
        reason: String,
    },

    /// The body template did not fully resolve; no request was sent
    #[error("Request body template does not resolve")]
    UnresolvedBody,

    /// Transport failure or non-success status
    #[error("Fetch failed: {0}")]
    FetchFailed(String),

    /// The response body is not a structured payload
    #[error("Malformed payload: {0}")]
    MalformedPayload(String),
}

impl FetchError {
    /// Whether the failure happened before any request was sent
    pub fn is_unresolved(&self) -> bool {
        matches!(
            self,
            FetchError::UnresolvedUrl(_) | FetchError::InvalidUrl { .. } | FetchError::UnresolvedBody
        )
    }

    /// Stable error code for hosts
    pub fn error_code(&self) -> &'static str {
        match self {
            FetchError::UnresolvedUrl(_) => "ERR_FETCH_UNRESOLVED_URL",
            FetchError::InvalidUrl { .. } => "ERR_FETCH_INVALID_URL",
            FetchError::UnresolvedBody => "ERR_FETCH_UNRESOLVED_BODY",
            FetchError::FetchFailed(_) => "ERR_FETCH_FAILED",
            FetchError::MalformedPayload(_) => "ERR_FETCH_MALFORMED_PAYLOAD",
        }
    }
}
