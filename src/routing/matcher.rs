//! Route table and resolution.
//!
//! The table is built once during application setup and is immutable
//! afterwards, so request tasks can read it without locking. Resolution
//! tries every registered pattern and prefers the most specific match:
//! fewest placeholders, then most literal segments, then registration
//! order.

use std::cmp::Reverse;
use std::collections::HashMap;

use hyper::Method;

use crate::error::HttpError;
use crate::routing::pattern::{PathArgs, Pattern};

/// One registered route.
#[derive(Debug)]
pub struct Route {
    pub pattern: Pattern,
    pub endpoint: String,
    pub methods: Vec<Method>,
    /// Explicit hook scope for this route, `None` for the application
    /// scope.
    pub module: Option<String>,
}

impl Route {
    /// Whether this route accepts the method. HEAD is implied wherever
    /// GET is listed.
    fn allows(&self, method: &Method) -> bool {
        if self.methods.contains(method) {
            return true;
        }
        *method == Method::HEAD && self.methods.contains(&Method::GET)
    }

    /// The methods advertised in an `Allow` header, HEAD included when
    /// implied.
    fn allowed_methods(&self) -> Vec<Method> {
        let mut methods = self.methods.clone();
        if methods.contains(&Method::GET) && !methods.contains(&Method::HEAD) {
            methods.push(Method::HEAD);
        }
        methods
    }
}

/// A successful resolution: the endpoint to dispatch to and the typed
/// parameters extracted from the path.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteMatch {
    pub endpoint: String,
    pub module: Option<String>,
    pub args: PathArgs,
}

/// The immutable route table.
#[derive(Debug, Default)]
pub struct RouteMap {
    routes: Vec<Route>,
    by_endpoint: HashMap<String, usize>,
}

impl RouteMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a route. Endpoint names must be unique; additions only
    /// happen during setup, there is no removal.
    pub fn add(
        &mut self,
        rule: &str,
        endpoint: &str,
        methods: &[Method],
        module: Option<&str>,
    ) -> Result<(), String> {
        if self.by_endpoint.contains_key(endpoint) {
            return Err(format!("endpoint {endpoint:?} is already registered"));
        }
        if methods.is_empty() {
            return Err(format!("endpoint {endpoint:?} registered without methods"));
        }
        let pattern = Pattern::compile(rule)?;
        self.by_endpoint.insert(endpoint.to_string(), self.routes.len());
        self.routes.push(Route {
            pattern,
            endpoint: endpoint.to_string(),
            methods: methods.to_vec(),
            module: module.map(ToString::to_string),
        });
        Ok(())
    }

    pub fn route_for_endpoint(&self, endpoint: &str) -> Option<&Route> {
        self.by_endpoint.get(endpoint).map(|&index| &self.routes[index])
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Resolve a (method, path) pair to a route match or an explicit
    /// routing failure.
    ///
    /// Failure precedence: a matching route with a wrong method yields
    /// `MethodNotAllowed`; a GET/HEAD path that only misses a required
    /// trailing slash yields `RedirectSlash`; everything else is
    /// `NotFound`.
    pub fn resolve(&self, method: &Method, path: &str) -> Result<RouteMatch, HttpError> {
        // Lower key wins: fewest placeholders, most literals, earliest
        // registration.
        type SpecificityKey = (usize, Reverse<usize>, usize);
        let mut best: Option<(SpecificityKey, &Route, PathArgs)> = None;
        let mut redirect: Option<(SpecificityKey, String)> = None;
        let mut allowed: Vec<Method> = Vec::new();

        for (index, route) in self.routes.iter().enumerate() {
            let key = (
                route.pattern.placeholder_count(),
                Reverse(route.pattern.literal_count()),
                index,
            );
            if let Some(args) = route.pattern.match_path(path) {
                if route.allows(method) {
                    let replace = best.as_ref().is_none_or(|(best_key, _, _)| key < *best_key);
                    if replace {
                        best = Some((key, route, args));
                    }
                } else {
                    for m in route.allowed_methods() {
                        if !allowed.contains(&m) {
                            allowed.push(m);
                        }
                    }
                }
            } else if route.pattern.trailing_slash()
                && !path.ends_with('/')
                && route.allows(method)
            {
                let canonical = format!("{path}/");
                if route.pattern.match_path(&canonical).is_some() {
                    let replace = redirect.as_ref().is_none_or(|(best_key, _)| key < *best_key);
                    if replace {
                        redirect = Some((key, canonical));
                    }
                }
            }
        }

        if let Some((_, route, args)) = best {
            return Ok(RouteMatch {
                endpoint: route.endpoint.clone(),
                module: route.module.clone(),
                args,
            });
        }
        if !allowed.is_empty() {
            return Err(HttpError::MethodNotAllowed { allow: allowed });
        }
        if let Some((_, location)) = redirect {
            // Canonicalization is only applied to safe methods
            if *method == Method::GET || *method == Method::HEAD {
                return Err(HttpError::RedirectSlash { location });
            }
        }
        Err(HttpError::NotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_map() -> RouteMap {
        let mut map = RouteMap::new();
        map.add("/index", "index", &[Method::GET], None).unwrap();
        map.add("/user/<username>/", "user_page", &[Method::GET], None)
            .unwrap();
        map.add("/post/<int:id>", "post_page", &[Method::GET], None)
            .unwrap();
        map.add("/login", "login", &[Method::GET, Method::POST], None)
            .unwrap();
        map
    }

    #[test]
    fn test_resolve_literal_route() {
        let map = sample_map();
        let m = map.resolve(&Method::GET, "/index").unwrap();
        assert_eq!(m.endpoint, "index");
        assert!(m.args.is_empty());
    }

    #[test]
    fn test_resolve_extracts_typed_params() {
        let map = sample_map();
        let m = map.resolve(&Method::GET, "/user/testuser1/").unwrap();
        assert_eq!(m.endpoint, "user_page");
        assert_eq!(m.args.get_str("username"), Some("testuser1"));

        let m = map.resolve(&Method::GET, "/post/7").unwrap();
        assert_eq!(m.args.get_int("id"), Some(7));
    }

    #[test]
    fn test_unregistered_path_is_not_found() {
        let map = sample_map();
        assert_eq!(
            map.resolve(&Method::GET, "/nothing").unwrap_err(),
            HttpError::NotFound
        );
    }

    #[test]
    fn test_wrong_method_is_method_not_allowed() {
        let map = sample_map();
        let err = map.resolve(&Method::DELETE, "/index").unwrap_err();
        match err {
            HttpError::MethodNotAllowed { allow } => {
                assert!(allow.contains(&Method::GET));
                assert!(allow.contains(&Method::HEAD));
            }
            other => panic!("expected MethodNotAllowed, got {other:?}"),
        }
    }

    #[test]
    fn test_head_implied_by_get() {
        let map = sample_map();
        assert!(map.resolve(&Method::HEAD, "/index").is_ok());
    }

    #[test]
    fn test_missing_trailing_slash_redirects_get() {
        let map = sample_map();
        let err = map.resolve(&Method::GET, "/user/testuser1").unwrap_err();
        assert_eq!(
            err,
            HttpError::RedirectSlash { location: "/user/testuser1/".to_string() }
        );
        // Repeating against the canonical path resolves normally
        assert!(map.resolve(&Method::GET, "/user/testuser1/").is_ok());
    }

    #[test]
    fn test_missing_trailing_slash_is_not_found_for_post() {
        let map = sample_map();
        assert_eq!(
            map.resolve(&Method::POST, "/user/testuser1").unwrap_err(),
            HttpError::NotFound
        );
    }

    #[test]
    fn test_unexpected_trailing_slash_is_not_found() {
        let map = sample_map();
        assert_eq!(
            map.resolve(&Method::GET, "/index/").unwrap_err(),
            HttpError::NotFound
        );
    }

    #[test]
    fn test_more_specific_pattern_wins() {
        let mut map = RouteMap::new();
        map.add("/pages/<name>", "generic", &[Method::GET], None).unwrap();
        map.add("/pages/about", "about", &[Method::GET], None).unwrap();
        // Fewer placeholders wins regardless of registration order
        let m = map.resolve(&Method::GET, "/pages/about").unwrap();
        assert_eq!(m.endpoint, "about");
        let m = map.resolve(&Method::GET, "/pages/contact").unwrap();
        assert_eq!(m.endpoint, "generic");
    }

    #[test]
    fn test_tie_broken_by_registration_order() {
        let mut map = RouteMap::new();
        map.add("/items/<name>", "first", &[Method::GET], None).unwrap();
        map.add("/items/<code>", "second", &[Method::GET], None).unwrap();
        let m = map.resolve(&Method::GET, "/items/x").unwrap();
        assert_eq!(m.endpoint, "first");
    }

    #[test]
    fn test_duplicate_endpoint_rejected() {
        let mut map = RouteMap::new();
        map.add("/a", "dup", &[Method::GET], None).unwrap();
        assert!(map.add("/b", "dup", &[Method::GET], None).is_err());
    }
}
