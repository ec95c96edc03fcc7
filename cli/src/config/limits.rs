//! Hard limits applied when validating `theme-porter.toml`.

/// Minimum request timeout (seconds)
pub const MIN_HTTP_TIMEOUT_SECS: u64 = 1;

/// Maximum reasonable request timeout (10 minutes)
pub const MAX_HTTP_TIMEOUT_SECS: u64 = 600;

/// Minimum marketplace page size
pub const MIN_MARKETPLACE_PAGE_SIZE: u32 = 1;

/// Largest page the marketplace gallery API answers reliably
pub const MAX_MARKETPLACE_PAGE_SIZE: u32 = 100;

/// AndroidIDE rejects schemes with a version below 1
pub const MIN_SCHEME_VERSION: u32 = 1;
