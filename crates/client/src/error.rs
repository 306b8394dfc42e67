/// Errors from the generation API layer.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response (connection refused, DNS,
    /// TLS, timeout).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The API answered with a non-2xx status. `message` is the server's
    /// own text when the body carried one.
    #[error("{message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// User-facing message.
        message: String,
    },

    /// The download endpoint answered with a non-2xx status.
    #[error("Download failed: {status}")]
    Download { status: u16 },

    /// A 2xx response whose body did not match the expected shape.
    #[error("Invalid response body: {0}")]
    Decode(String),

    /// The configured base URL cannot carry request paths.
    #[error("Invalid API URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// HTTP status of the failed response, if there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Network(e) => e.status().map(|s| s.as_u16()),
            Self::Api { status, .. } | Self::Download { status } => Some(*status),
            Self::Decode(_) | Self::InvalidUrl(_) => None,
        }
    }
}
