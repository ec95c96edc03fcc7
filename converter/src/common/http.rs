use std::time::Duration;

use super::errors::HttpError;

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_USER_AGENT: &str = concat!("theme-porter/", env!("CARGO_PKG_VERSION"));

/// Network knobs shared by the downloader and the marketplace client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpSettings {
    pub timeout_secs: u64,
    pub connect_timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            connect_timeout_secs: DEFAULT_CONNECT_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

pub fn build_client(settings: &HttpSettings) -> Result<reqwest::Client, HttpError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(settings.timeout_secs))
        .connect_timeout(Duration::from_secs(settings.connect_timeout_secs))
        .user_agent(settings.user_agent.clone())
        .build()
        .map_err(|e| HttpError::ClientCreation {
            reason: e.to_string(),
        })
}
