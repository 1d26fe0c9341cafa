//! HTTP response building module
//!
//! Provides the transport-independent response type, the handler payload
//! shapes the dispatcher coerces into responses, and builders for the
//! status-code responses the framework emits itself.

use hyper::Method;

use crate::error::HttpError;

/// Outbound HTTP response, owned by the dispatch pipeline until the
/// serving layer writes it out.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Response {
    /// Create a 200 response with the given body and no headers.
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.set_header(name, value);
        self
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    pub fn set_status(&mut self, status: u16) {
        self.status = status;
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Drop the body while keeping status and headers. Used when
    /// answering HEAD requests.
    pub fn clear_body(&mut self) {
        self.body.clear();
    }

    pub fn body_str(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First header value for `name`, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Set a header, replacing any existing values with the same name.
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.headers.retain(|(n, _)| !n.eq_ignore_ascii_case(name));
        self.headers.push((name.to_string(), value.to_string()));
    }

    /// Append a header without replacing existing values. Used for
    /// headers that may legitimately repeat, such as `Set-Cookie`.
    pub fn add_header(&mut self, name: &str, value: &str) {
        self.headers.push((name.to_string(), value.to_string()));
    }
}

/// The shapes a handler, hook or error handler may return. The
/// dispatcher coerces these into a [`Response`] via [`Payload::into_response`].
#[derive(Debug)]
pub enum Payload {
    /// A finished response, passed through unchanged.
    Response(Response),
    /// Plain text body with the configured default content type.
    Text(String),
    /// JSON body with `application/json` content type.
    Json(serde_json::Value),
    /// Explicit (body, status) pair.
    WithStatus(String, u16),
    /// Explicit (body, status, headers) triple.
    Full(String, u16, Vec<(String, String)>),
    /// The absent return value; coercion fails with `MissingResponse`.
    None,
}

impl Payload {
    /// Coerce this payload into a response. `default_content_type` is
    /// applied to text bodies that do not carry their own.
    pub fn into_response(self, default_content_type: &str) -> Result<Response, HttpError> {
        match self {
            Self::Response(response) => Ok(response),
            Self::Text(body) => {
                Ok(Response::new(body).with_header("Content-Type", default_content_type))
            }
            Self::Json(value) => {
                let body = serde_json::to_string(&value)
                    .map_err(|e| HttpError::HandlerFailure(format!("JSON encoding: {e}")))?;
                Ok(Response::new(body).with_header("Content-Type", "application/json"))
            }
            Self::WithStatus(body, status) => Ok(Response::new(body)
                .with_status(status)
                .with_header("Content-Type", default_content_type)),
            Self::Full(body, status, headers) => {
                let mut response = Response::new(body).with_status(status);
                for (name, value) in headers {
                    response.add_header(&name, &value);
                }
                if response.header("Content-Type").is_none() {
                    response.set_header("Content-Type", default_content_type);
                }
                Ok(response)
            }
            Self::None => Err(HttpError::MissingResponse),
        }
    }
}

impl From<&str> for Payload {
    fn from(body: &str) -> Self {
        Self::Text(body.to_string())
    }
}

impl From<String> for Payload {
    fn from(body: String) -> Self {
        Self::Text(body)
    }
}

impl From<Response> for Payload {
    fn from(response: Response) -> Self {
        Self::Response(response)
    }
}

impl From<serde_json::Value> for Payload {
    fn from(value: serde_json::Value) -> Self {
        Self::Json(value)
    }
}

impl From<(String, u16)> for Payload {
    fn from((body, status): (String, u16)) -> Self {
        Self::WithStatus(body, status)
    }
}

/// Build 404 Not Found response
pub fn build_404_response() -> Response {
    Response::new("404 Not Found")
        .with_status(404)
        .with_header("Content-Type", "text/plain")
}

/// Build 405 Method Not Allowed response with an `Allow` header listing
/// the methods the matched pattern accepts.
pub fn build_405_response(allow: &[Method]) -> Response {
    let allowed = allow
        .iter()
        .map(Method::as_str)
        .collect::<Vec<_>>()
        .join(", ");
    Response::new("405 Method Not Allowed")
        .with_status(405)
        .with_header("Content-Type", "text/plain")
        .with_header("Allow", &allowed)
}

/// Build 413 Payload Too Large response
pub fn build_413_response() -> Response {
    Response::new("413 Payload Too Large")
        .with_status(413)
        .with_header("Content-Type", "text/plain")
}

/// Build 500 Internal Server Error response
pub fn build_500_response() -> Response {
    Response::new("500 Internal Server Error")
        .with_status(500)
        .with_header("Content-Type", "text/plain")
}

/// Build 301 redirect response for trailing-slash canonicalization
pub fn build_redirect_response(target: &str) -> Response {
    Response::new(format!("Redirecting to {target}"))
        .with_status(301)
        .with_header("Location", target)
        .with_header("Content-Type", "text/plain")
}
