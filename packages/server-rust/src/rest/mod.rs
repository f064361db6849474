//! Building blocks for REST endpoints: routes, path helpers, the response
//! envelope and the handler error type.

pub mod envelope;
pub mod error;
pub mod path;
pub mod route;

pub use envelope::{panic_response, response_envelope, EnvelopeStatus, ResponseEnvelope};
pub use error::ApiError;
pub use path::{concatenate_endpoints, marshal_or_empty, query_id, sanitize_path};
pub use route::{Route, Routes};
