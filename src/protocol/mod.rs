pub mod envelope;
pub mod error;
pub mod http;
pub mod types;

pub use envelope::ApiEnvelope;
pub use error::ApiError;
pub use http::ApiClient;
