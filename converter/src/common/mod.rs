pub mod errors;
pub mod http;

pub use errors::HttpError;
pub use http::{HttpSettings, build_client};
