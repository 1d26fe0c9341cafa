//! Reverse URL construction.
//!
//! Given an endpoint name and a parameter mapping, renders the
//! registered rule back into a path. Parameters the rule does not
//! consume are appended as a query string.

use url::form_urlencoded;

use crate::error::HttpError;
use crate::routing::matcher::RouteMap;
use crate::routing::pattern::Segment;

impl RouteMap {
    /// Render the URL for `endpoint`, substituting placeholders from
    /// `params`. Fails with `EndpointNotFound` for an unregistered name
    /// and `BuildError` when a required placeholder is missing or a
    /// value does not fit the placeholder type.
    pub fn build(&self, endpoint: &str, params: &[(&str, &str)]) -> Result<String, HttpError> {
        let route = self
            .route_for_endpoint(endpoint)
            .ok_or_else(|| HttpError::EndpointNotFound(endpoint.to_string()))?;

        let mut path = String::new();
        let mut consumed: Vec<&str> = Vec::new();

        for segment in route.pattern.segments() {
            path.push('/');
            match segment {
                Segment::Literal(literal) => path.push_str(literal),
                Segment::Placeholder { name, kind } => {
                    let value = params
                        .iter()
                        .find(|(n, _)| *n == name.as_str())
                        .map(|(_, v)| *v)
                        .ok_or_else(|| {
                            HttpError::BuildError(format!(
                                "missing value for placeholder {name:?} of endpoint {endpoint:?}"
                            ))
                        })?;
                    if !kind.accepts(value) {
                        return Err(HttpError::BuildError(format!(
                            "value {value:?} does not fit placeholder {name:?} of endpoint {endpoint:?}"
                        )));
                    }
                    path.push_str(value);
                    consumed.push(name.as_str());
                }
            }
        }

        if path.is_empty() {
            path.push('/');
        } else if route.pattern.trailing_slash() {
            path.push('/');
        }

        // Anything the rule did not consume becomes the query string
        let mut serializer = form_urlencoded::Serializer::new(String::new());
        let mut has_extra = false;
        for (name, value) in params {
            if !consumed.contains(name) {
                serializer.append_pair(name, value);
                has_extra = true;
            }
        }
        if has_extra {
            path.push('?');
            path.push_str(&serializer.finish());
        }

        Ok(path)
    }
}
