use converter::ConversionError;
use converter::common::HttpError;
use std::fmt::Display;

/// Errors surfaced by the `theme-porter` command line front end.
///
/// Every variant carries a message that is already meant for the user;
/// the conversion library's own [`ConversionError::user_message`] is used
/// where one exists.
#[derive(Debug, Clone, PartialEq)]
pub enum AppError {
    /// A theme conversion failed at one of its pipeline stages.
    Conversion(String),

    /// Configuration loading and validation errors.
    ///
    /// Raised when `theme-porter.toml` cannot be read, does not deserialize
    /// or holds values outside of the supported limits.
    Config(String),

    /// Marketplace or download requests that failed.
    Network(String),

    /// Local file system failures outside of a conversion.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AppError::Conversion(msg) => write!(f, "Conversion Error: {msg}"),
            AppError::Config(msg) => write!(f, "Configuration Error: {msg}"),
            AppError::Network(msg) => write!(f, "Network Error: {msg}"),
            AppError::Io(msg) => write!(f, "IO Error: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<ConversionError> for AppError {
    fn from(err: ConversionError) -> Self {
        match err {
            ConversionError::Network(_) => AppError::Network(err.user_message()),
            other => AppError::Conversion(other.user_message()),
        }
    }
}

impl From<HttpError> for AppError {
    fn from(err: HttpError) -> Self {
        AppError::Network(err.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
