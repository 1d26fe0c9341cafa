//! Inbound request snapshot.
//!
//! A `Request` captures everything the dispatch pipeline needs from the
//! transport: method, path, query string, headers and the collected body.
//! It is immutable for the lifetime of the request. The builder-style
//! constructors double as the test client for exercising an application
//! without a socket.

use hyper::Method;
use url::form_urlencoded;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Immutable snapshot of an inbound HTTP request.
#[derive(Debug, Clone)]
pub struct Request {
    method: Method,
    path: String,
    query_string: Option<String>,
    /// Header names are stored lowercased; lookup is case-insensitive.
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Request {
    /// Create a request for the given method and target. A query string
    /// after `?` is split off from the path.
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query_string) = match target.split_once('?') {
            Some((p, q)) => (p.to_string(), Some(q.to_string())),
            None => (target.to_string(), None),
        };
        Self {
            method,
            path,
            query_string,
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Shortcut for a GET request.
    pub fn get(target: &str) -> Self {
        Self::new(Method::GET, target)
    }

    /// Shortcut for a POST request.
    pub fn post(target: &str) -> Self {
        Self::new(Method::POST, target)
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Attach URL-encoded form fields as the request body and set the
    /// matching content type.
    pub fn with_form(self, fields: &[(&str, &str)]) -> Self {
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        for (name, value) in fields {
            serializer.append_pair(name, value);
        }
        let encoded = serializer.finish();
        self.with_header("content-type", FORM_CONTENT_TYPE)
            .with_body(encoded.into_bytes())
    }

    /// Attach a cookie pair to the `Cookie` header.
    pub fn with_cookie(self, name: &str, value: &str) -> Self {
        self.with_header("cookie", &format!("{name}={value}"))
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query_string(&self) -> Option<&str> {
        self.query_string.as_deref()
    }

    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// First header value for `name`, case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Decoded query string pairs, in order of appearance.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        match &self.query_string {
            Some(qs) => form_urlencoded::parse(qs.as_bytes()).into_owned().collect(),
            None => Vec::new(),
        }
    }

    /// Decoded form body pairs. Empty unless the content type is
    /// `application/x-www-form-urlencoded`.
    pub fn form_pairs(&self) -> Vec<(String, String)> {
        let is_form = self
            .content_type()
            .is_some_and(|ct| ct.starts_with(FORM_CONTENT_TYPE));
        if !is_form {
            return Vec::new();
        }
        form_urlencoded::parse(&self.body).into_owned().collect()
    }

    /// First form field with the given name.
    pub fn form_value(&self, name: &str) -> Option<String> {
        self.form_pairs()
            .into_iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// Parsed JSON body, when the content type is `application/json`.
    pub fn json(&self) -> Option<serde_json::Value> {
        let is_json = self
            .content_type()
            .is_some_and(|ct| ct.starts_with("application/json"));
        if !is_json {
            return None;
        }
        serde_json::from_slice(&self.body).ok()
    }

    /// Value of the named cookie from the `Cookie` header.
    pub fn cookie(&self, name: &str) -> Option<String> {
        let header = self.header("cookie")?;
        for pair in header.split(';') {
            if let Some((n, v)) = pair.trim().split_once('=') {
                if n == name {
                    return Some(v.to_string());
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_string_split() {
        let req = Request::get("/search?q=hello&page=2");
        assert_eq!(req.path(), "/search");
        assert_eq!(req.query_string(), Some("q=hello&page=2"));
        let pairs = req.query_pairs();
        assert_eq!(pairs[0], ("q".to_string(), "hello".to_string()));
        assert_eq!(pairs[1], ("page".to_string(), "2".to_string()));
    }

    #[test]
    fn test_header_lookup_case_insensitive() {
        let req = Request::get("/").with_header("X-Custom", "abc");
        assert_eq!(req.header("x-custom"), Some("abc"));
        assert_eq!(req.header("X-CUSTOM"), Some("abc"));
        assert_eq!(req.header("missing"), None);
    }

    #[test]
    fn test_form_round_trip() {
        let req = Request::post("/login").with_form(&[("username", "admin"), ("password", "p w")]);
        assert_eq!(req.form_value("username"), Some("admin".to_string()));
        assert_eq!(req.form_value("password"), Some("p w".to_string()));
        assert_eq!(req.form_value("missing"), None);
    }

    #[test]
    fn test_form_requires_content_type() {
        let req = Request::post("/login").with_body(b"username=admin".to_vec());
        assert!(req.form_pairs().is_empty());
    }

    #[test]
    fn test_json_body() {
        let req = Request::post("/api")
            .with_header("content-type", "application/json")
            .with_body(br#"{"id": 42}"#.to_vec());
        let value = req.json().unwrap();
        assert_eq!(value["id"], 42);

        let not_json = Request::post("/api").with_body(br#"{"id": 42}"#.to_vec());
        assert!(not_json.json().is_none());
    }

    #[test]
    fn test_cookie_lookup() {
        let req = Request::get("/").with_header("cookie", "a=1; session=abc.def; b=2");
        assert_eq!(req.cookie("session"), Some("abc.def".to_string()));
        assert_eq!(req.cookie("a"), Some("1".to_string()));
        assert_eq!(req.cookie("missing"), None);
    }
}
