pub mod content_type_validation;
pub mod error_handling;
pub mod ip_rate_limiter;
pub mod metrics;
pub mod request_id;
pub mod security_headers;

pub use error_handling::*;
pub use ip_rate_limiter::*;
