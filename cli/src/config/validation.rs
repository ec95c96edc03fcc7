use super::app::AppConfig;

/// Configuration validation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid http.timeout_secs: {configured} (min: {min_limit}, max: {max_limit})")]
    HttpTimeout {
        configured: u64,
        min_limit: u64,
        max_limit: u64,
    },
    #[error(
        "Invalid http.connect_timeout_secs: {configured} (min: {min_limit}, max: {max_limit})"
    )]
    ConnectTimeout {
        configured: u64,
        min_limit: u64,
        max_limit: u64,
    },
    #[error("Invalid marketplace.page_size: {configured} (min: {min_limit}, max: {max_limit})")]
    PageSize {
        configured: u32,
        min_limit: u32,
        max_limit: u32,
    },
    #[error("Invalid scheme_version: {configured} (min: {min_limit})")]
    SchemeVersion { configured: u32, min_limit: u32 },
}

impl ConfigValidationError {
    pub fn user_message(&self) -> String {
        match self {
            ConfigValidationError::HttpTimeout {
                configured,
                min_limit,
                max_limit,
            } => {
                format!(
                    "Request timeout out of range!\n\n\
                    Your configured value: {configured} seconds\n\
                    Valid range: {min_limit} - {max_limit} seconds\n\n\
                    Please update http.timeout_secs in theme-porter.toml."
                )
            }
            ConfigValidationError::ConnectTimeout {
                configured,
                min_limit,
                max_limit,
            } => {
                format!(
                    "Connect timeout out of range!\n\n\
                    Your configured value: {configured} seconds\n\
                    Valid range: {min_limit} - {max_limit} seconds\n\n\
                    Please update http.connect_timeout_secs in theme-porter.toml."
                )
            }
            ConfigValidationError::PageSize {
                configured,
                min_limit,
                max_limit,
            } => {
                format!(
                    "Marketplace page size out of range!\n\n\
                    Your configured value: {configured}\n\
                    Valid range: {min_limit} - {max_limit}\n\n\
                    Please update marketplace.page_size in theme-porter.toml."
                )
            }
            ConfigValidationError::SchemeVersion {
                configured,
                min_limit,
            } => {
                format!(
                    "Scheme version too low!\n\n\
                    Your configured value: {configured}\n\
                    Minimum: {min_limit}\n\n\
                    Please update scheme_version in theme-porter.toml."
                )
            }
        }
    }
}

/// Configuration loading result
#[derive(Debug)]
pub enum ConfigLoadResult {
    Success(Box<AppConfig>),
    LoadError(String),
    DeserializeError(String),
}
