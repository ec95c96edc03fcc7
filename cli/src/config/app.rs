use super::{LoggingConfig, limits::*, validation::ConfigValidationError};
use converter::ConverterSettings;
use converter::common::HttpSettings;
use converter::common::http::{
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS, DEFAULT_USER_AGENT,
};
use converter::emitter::DEFAULT_SCHEME_VERSION;
use converter::marketplace::DEFAULT_PAGE_SIZE;
use serde::Deserialize;
use std::path::PathBuf;

const OUTPUT_DIR_NAME: &str = "AndroidIDEThemes";
const WORK_DIR_NAME: &str = "theme-porter";

/// Network settings
#[derive(Debug, Deserialize, Default, Clone)]
pub struct HttpConfig {
    timeout_secs: Option<u64>,
    connect_timeout_secs: Option<u64>,
    user_agent: Option<String>,
}

impl HttpConfig {
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)
    }

    pub fn connect_timeout_secs(&self) -> u64 {
        self.connect_timeout_secs
            .unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS)
    }

    pub fn user_agent(&self) -> &str {
        self.user_agent.as_deref().unwrap_or(DEFAULT_USER_AGENT)
    }

    pub fn settings(&self) -> HttpSettings {
        HttpSettings {
            timeout_secs: self.timeout_secs(),
            connect_timeout_secs: self.connect_timeout_secs(),
            user_agent: self.user_agent().to_string(),
        }
    }
}

/// VS Code Marketplace search settings
#[derive(Debug, Deserialize, Default, Clone)]
pub struct MarketplaceConfig {
    page_size: Option<u32>,
}

impl MarketplaceConfig {
    pub fn page_size(&self) -> u32 {
        self.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }
}

/// Main application configuration
#[derive(Debug, Deserialize, Default, Clone)]
pub struct AppConfig {
    output_dir: Option<PathBuf>,
    work_dir: Option<PathBuf>,
    scheme_version: Option<u32>,
    fill_defaults: Option<bool>,

    #[serde(default)]
    http: HttpConfig,
    #[serde(default)]
    marketplace: MarketplaceConfig,
    #[serde(default)]
    logging: LoggingConfig,
}

impl AppConfig {
    /// Validate the configuration against defined limits
    pub fn validate(&self) -> Result<(), Vec<ConfigValidationError>> {
        let mut errors = Vec::new();

        let timeout = self.http.timeout_secs();
        if !(MIN_HTTP_TIMEOUT_SECS..=MAX_HTTP_TIMEOUT_SECS).contains(&timeout) {
            errors.push(ConfigValidationError::HttpTimeout {
                configured: timeout,
                min_limit: MIN_HTTP_TIMEOUT_SECS,
                max_limit: MAX_HTTP_TIMEOUT_SECS,
            });
        }

        let connect_timeout = self.http.connect_timeout_secs();
        if !(MIN_HTTP_TIMEOUT_SECS..=MAX_HTTP_TIMEOUT_SECS).contains(&connect_timeout) {
            errors.push(ConfigValidationError::ConnectTimeout {
                configured: connect_timeout,
                min_limit: MIN_HTTP_TIMEOUT_SECS,
                max_limit: MAX_HTTP_TIMEOUT_SECS,
            });
        }

        let page_size = self.marketplace.page_size();
        if !(MIN_MARKETPLACE_PAGE_SIZE..=MAX_MARKETPLACE_PAGE_SIZE).contains(&page_size) {
            errors.push(ConfigValidationError::PageSize {
                configured: page_size,
                min_limit: MIN_MARKETPLACE_PAGE_SIZE,
                max_limit: MAX_MARKETPLACE_PAGE_SIZE,
            });
        }

        if self.scheme_version() < MIN_SCHEME_VERSION {
            errors.push(ConfigValidationError::SchemeVersion {
                configured: self.scheme_version(),
                min_limit: MIN_SCHEME_VERSION,
            });
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Where bundles are written; the user's download directory by default.
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir.clone().unwrap_or_else(|| {
            dirs::download_dir()
                .map(|downloads| downloads.join(OUTPUT_DIR_NAME))
                .unwrap_or_else(|| PathBuf::from(OUTPUT_DIR_NAME))
        })
    }

    pub fn work_dir(&self) -> PathBuf {
        self.work_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(WORK_DIR_NAME))
    }

    pub fn scheme_version(&self) -> u32 {
        self.scheme_version.unwrap_or(DEFAULT_SCHEME_VERSION)
    }

    pub fn fill_defaults(&self) -> bool {
        self.fill_defaults.unwrap_or(true)
    }

    // Configuration section accessors
    pub fn http(&self) -> &HttpConfig {
        &self.http
    }

    pub fn marketplace(&self) -> &MarketplaceConfig {
        &self.marketplace
    }

    pub fn logging(&self) -> &LoggingConfig {
        &self.logging
    }

    pub fn converter_settings(&self) -> ConverterSettings {
        ConverterSettings {
            output_dir: self.output_dir(),
            work_dir: self.work_dir(),
            scheme_version: self.scheme_version(),
            fill_defaults: self.fill_defaults(),
            http: self.http.settings(),
        }
    }
}
