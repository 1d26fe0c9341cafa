//! HTTP protocol layer module
//!
//! Transport-independent request and response types plus the payload
//! coercion used by the dispatcher. The serving layer converts between
//! these and Hyper's types at the connection boundary.

pub mod request;
pub mod response;

// Re-export commonly used types
pub use request::Request;
pub use response::{
    build_404_response, build_405_response, build_413_response, build_500_response,
    build_redirect_response, Payload, Response,
};
