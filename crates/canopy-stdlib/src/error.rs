use thiserror::Error;

/// Errors raised while setting up the standard collaborators
#[derive(Error, Debug)]
pub enum StdlibError {
    /// The HTTP client could not be built
    #[error("Failed to build HTTP client: {0}")]
    ClientBuild(#[from] reqwest::Error),
}

impl StdlibError {
    /// Stable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            StdlibError::ClientBuild(_) => "ERR_STDLIB_CLIENT_BUILD",
        }
    }
}
