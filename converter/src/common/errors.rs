use thiserror::Error;

/// HTTP-related errors raised while talking to theme stores.
///
/// Both the package downloader and the marketplace search client report
/// network problems through this enum. Every variant carries the URL or the
/// value that caused it so that a failed conversion can be diagnosed from the
/// log alone.
///
/// # Error Categories
///
/// ## Client Configuration Errors
/// - [`ClientCreation`] - HTTP client initialization failures
///
/// ## Request Execution Errors
/// - [`RequestFailed`] - Connection or transfer failures with URL and reason
/// - [`Timeout`] - Request timeout with duration and target URL
/// - [`Status`] - Server answered with a non-success status code
/// - [`InvalidResponse`] - Body did not have the expected shape
///
/// # Examples
///
/// ```no_run
/// use converter::common::errors::HttpError;
///
/// fn describe(error: &HttpError) -> String {
///     match error {
///         HttpError::Status { status, .. } if *status == 404 => {
///             "The theme package no longer exists on the store".to_string()
///         }
///         HttpError::Timeout { seconds, .. } => {
///             format!("The store did not answer within {seconds}s")
///         }
///         other => other.to_string(),
///     }
/// }
/// ```
///
/// [`ClientCreation`]: HttpError::ClientCreation
/// [`RequestFailed`]: HttpError::RequestFailed
/// [`Timeout`]: HttpError::Timeout
/// [`Status`]: HttpError::Status
/// [`InvalidResponse`]: HttpError::InvalidResponse
#[derive(Debug, Error)]
pub enum HttpError {
    /// HTTP client initialization failed.
    ///
    /// Usually caused by an invalid user agent header or a TLS backend that
    /// could not be initialised.
    #[error("HTTP client creation failed: {reason}")]
    ClientCreation { reason: String },

    /// HTTP request execution failed.
    ///
    /// Covers DNS failures, refused connections and connections dropped in
    /// the middle of a body transfer.
    #[error("Request failed: {url} - {reason}")]
    RequestFailed { url: String, reason: String },

    /// HTTP request timed out.
    ///
    /// # Fields
    /// - `url`: The URL that timed out
    /// - `seconds`: The timeout duration that was exceeded
    #[error("Request timeout after {seconds}s: {url}")]
    Timeout { url: String, seconds: u64 },

    /// The server responded with a status outside the 2xx range.
    #[error("Server returned HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    /// Received response doesn't match expected format.
    ///
    /// # Fields
    /// - `expected`: Description of what was expected
    /// - `actual`: Description of what was actually received
    #[error("Invalid response: expected {expected}, got {actual}")]
    InvalidResponse { expected: String, actual: String },
}

impl HttpError {
    /// Classifies a [`reqwest::Error`] raised for `url`.
    ///
    /// `timeout_secs` is the configured request timeout, reported back when
    /// reqwest flags the error as a timeout.
    pub fn from_reqwest(url: &str, timeout_secs: u64, error: reqwest::Error) -> Self {
        if error.is_timeout() {
            HttpError::Timeout {
                url: url.to_string(),
                seconds: timeout_secs,
            }
        } else if let Some(status) = error.status() {
            HttpError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            HttpError::RequestFailed {
                url: url.to_string(),
                reason: error.to_string(),
            }
        }
    }
}
