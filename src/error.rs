//! Failure taxonomy for routing, dispatch and session handling.
//!
//! Routing failures are carried as values on the request context and only
//! converted into responses at the dispatcher boundary. Errors that map to
//! an HTTP status code (`NotFound`, `MethodNotAllowed`, `RedirectSlash`)
//! are first offered to registered error handlers; everything else is a
//! server-side fault and surfaces as 500.

use hyper::Method;
use thiserror::Error;

use crate::http::response;
use crate::http::Response;

/// Errors produced while resolving, dispatching or finalizing a request.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum HttpError {
    /// No registered pattern matched the requested path.
    #[error("404 Not Found")]
    NotFound,

    /// A pattern matched the path but not the request method.
    #[error("405 Method Not Allowed")]
    MethodNotAllowed { allow: Vec<Method> },

    /// The path is missing a required trailing slash; the canonical
    /// location is carried along for the redirect response.
    #[error("redirecting to canonical path {location}")]
    RedirectSlash { location: String },

    /// Session mutation was attempted without a configured secret key.
    #[error(
        "the session is unavailable because no secret key was set. \
         Set secret_key in the [app] configuration section"
    )]
    SessionUnavailable,

    /// Reverse URL construction referenced an unregistered endpoint.
    #[error("endpoint {0:?} is not registered")]
    EndpointNotFound(String),

    /// Reverse URL construction could not render the pattern.
    #[error("could not build URL: {0}")]
    BuildError(String),

    /// A handler or hook produced no response payload.
    #[error("handler did not return a response")]
    MissingResponse,

    /// A handler, hook or error handler failed internally.
    #[error("handler failure: {0}")]
    HandlerFailure(String),
}

impl HttpError {
    /// The HTTP status code for errors that are themselves renderable as
    /// a response. Server-side faults return `None` and follow the
    /// debug/500 policy instead.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::NotFound => Some(404),
            Self::MethodNotAllowed { .. } => Some(405),
            Self::RedirectSlash { .. } => Some(301),
            _ => None,
        }
    }

    /// Whether this error belongs to the HTTP-classed group that error
    /// handlers can be registered for.
    pub fn is_http(&self) -> bool {
        self.status().is_some()
    }

    /// Default rendering when no error handler claimed the failure.
    pub fn to_response(&self) -> Response {
        match self {
            Self::NotFound => response::build_404_response(),
            Self::MethodNotAllowed { allow } => response::build_405_response(allow),
            Self::RedirectSlash { location } => response::build_redirect_response(location),
            _ => response::build_500_response(),
        }
    }
}
