use thiserror::Error;

/// Type alias for Result with ExporterError
pub type Result<T> = std::result::Result<T, ExporterError>;

/// Error types for the Gmail label exporter
#[derive(Error, Debug)]
pub enum ExporterError {
    /// Gmail API returned an error
    #[error("Gmail API error: {0}")]
    ApiError(String),

    /// OAuth2 bootstrap failed
    #[error("Authentication failed: {0}")]
    AuthError(String),

    /// Rate limit exceeded - should retry after specified seconds
    #[error("Rate limit exceeded, retry after {retry_after} seconds")]
    RateLimitExceeded { retry_after: u64 },

    /// Network-related error (connection issues, timeouts, etc.)
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Server returned 5xx error
    #[error("Server error (HTTP {status}): {message}")]
    ServerError { status: u16, message: String },

    /// Resource not found (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Bad request (400)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Forbidden (403)
    #[error("Access forbidden: {0}")]
    Forbidden(String),

    /// Fetching the counts of a single label failed during a scrape
    #[error("getting label data for label: {label_id}: {source}")]
    LabelDetail {
        label_id: String,
        #[source]
        source: Box<ExporterError>,
    },

    /// Building or encoding metric families failed
    #[error("Metrics error: {0}")]
    MetricsError(#[from] prometheus::Error),

    /// IO error (file operations, sockets)
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Internal error that indicates a bug rather than an environmental condition
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ExporterError {
    /// Check if the error is transient and should be retried
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ExporterError::RateLimitExceeded { .. }
                | ExporterError::ServerError { .. }
                | ExporterError::NetworkError(_)
        )
    }

    /// Check if the error is permanent and should not be retried
    pub fn is_permanent(&self) -> bool {
        !self.is_transient()
    }

    /// Delay the service asked for before the next attempt
    pub fn retry_after(&self) -> Option<std::time::Duration> {
        match self {
            ExporterError::RateLimitExceeded { retry_after } => {
                Some(std::time::Duration::from_secs(*retry_after))
            }
            _ => None,
        }
    }

    /// Whether the error came from the remote mail service rather than from this process
    pub fn is_remote(&self) -> bool {
        match self {
            ExporterError::LabelDetail { source, .. } => source.is_remote(),
            ExporterError::ApiError(_)
            | ExporterError::RateLimitExceeded { .. }
            | ExporterError::NetworkError(_)
            | ExporterError::ServerError { .. }
            | ExporterError::NotFound(_)
            | ExporterError::BadRequest(_)
            | ExporterError::Forbidden(_) => true,
            _ => false,
        }
    }
}

/// Parse the Retry-After header from an HTTP response
///
/// Only the delay-seconds form is honoured. If the header is missing or not
/// an integer, returns a default of 5 seconds.
fn parse_retry_after_header<B>(response: &hyper::Response<B>) -> u64 {
    const DEFAULT_RETRY_AFTER: u64 = 5;

    response
        .headers()
        .get(hyper::header::RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER)
}

impl From<google_gmail1::Error> for ExporterError {
    fn from(error: google_gmail1::Error) -> Self {
        match error {
            // HTTP response with status code (non-success responses)
            google_gmail1::Error::Failure(ref response) => {
                let status = response.status();
                let status_code = status.as_u16();
                let message = format!(
                    "HTTP {}: {}",
                    status_code,
                    status.canonical_reason().unwrap_or("Unknown")
                );

                match status_code {
                    429 => {
                        let retry_after = parse_retry_after_header(response);
                        ExporterError::RateLimitExceeded { retry_after }
                    }
                    404 => ExporterError::NotFound("Resource not found".to_string()),
                    400 => ExporterError::BadRequest(message),
                    403 => ExporterError::Forbidden(message),
                    500..=599 => ExporterError::ServerError {
                        status: status_code,
                        message,
                    },
                    _ => ExporterError::ApiError(message),
                }
            }
            google_gmail1::Error::BadRequest(ref err) => {
                ExporterError::BadRequest(format!("{}", err))
            }
            google_gmail1::Error::HttpError(ref err) => {
                ExporterError::NetworkError(format!("Connection error: {}", err))
            }
            google_gmail1::Error::Io(err) => ExporterError::NetworkError(err.to_string()),
            _ => ExporterError::ApiError(error.to_string()),
        }
    }
}
