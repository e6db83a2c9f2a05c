//! API request and response types

pub mod error;
pub mod json;

pub use error::{ApiError, ErrorKind};
pub use json::Json;
