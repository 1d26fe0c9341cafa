//! Application object.
//!
//! The `App` is the central registry: URL rules bound to handlers,
//! error handlers keyed by status code, pre/post hooks and context
//! processors, the session store and the template engine. All
//! registration happens during setup; once serving starts the tables
//! are immutable and request tasks read them without locking.

use std::collections::HashMap;
use std::sync::Arc;

use hyper::Method;
use serde_json::Value;

use crate::config::Config;
use crate::error::HttpError;
use crate::hooks::{HookRegistry, Scope};
use crate::http::{Payload, Response};
use crate::routing::{PathArgs, RouteMap};
use crate::server;
use crate::session::{SessionStore, SignedCookieStore};
use crate::template::TemplateEngine;

/// A view handler: receives the extracted, type-converted path
/// parameters and produces a response payload.
pub type Handler = Box<dyn Fn(&PathArgs) -> Result<Payload, HttpError> + Send + Sync>;

/// An error handler registered for a status code.
pub type ErrorHandler = Box<dyn Fn(&HttpError) -> Result<Payload, HttpError> + Send + Sync>;

pub struct App {
    config: Config,
    routes: RouteMap,
    handlers: HashMap<String, Handler>,
    error_handlers: HashMap<u16, ErrorHandler>,
    hooks: HookRegistry,
    session_store: Option<Box<dyn SessionStore>>,
    template_engine: Option<Box<dyn TemplateEngine>>,
}

impl App {
    /// Create an application from configuration. A secret key in the
    /// configuration wires up the default signed-cookie session store;
    /// without one, requests run with the read-only null session.
    pub fn new(config: Config) -> Self {
        let session_store: Option<Box<dyn SessionStore>> =
            config.app.secret_key.as_ref().map(|secret_key| {
                Box::new(SignedCookieStore::new(
                    secret_key,
                    &config.app.session_cookie_name,
                    config.app.permanent_session_lifetime_days,
                )) as Box<dyn SessionStore>
            });

        Self {
            config,
            routes: RouteMap::new(),
            handlers: HashMap::new(),
            error_handlers: HashMap::new(),
            hooks: HookRegistry::new(),
            session_store,
            template_engine: None,
        }
    }

    /// Register a URL rule with an explicit method set.
    pub fn add_route<H>(
        &mut self,
        rule: &str,
        endpoint: &str,
        methods: &[Method],
        handler: H,
    ) -> Result<(), String>
    where
        H: Fn(&PathArgs) -> Result<Payload, HttpError> + Send + Sync + 'static,
    {
        self.add_scoped_route_inner(rule, endpoint, methods, None, handler)
    }

    /// Register a GET-only URL rule.
    pub fn route<H>(&mut self, rule: &str, endpoint: &str, handler: H) -> Result<(), String>
    where
        H: Fn(&PathArgs) -> Result<Payload, HttpError> + Send + Sync + 'static,
    {
        self.add_route(rule, endpoint, &[Method::GET], handler)
    }

    /// Register a URL rule under a module scope. Module-scoped hooks
    /// run for requests matched to this route.
    pub fn add_scoped_route<H>(
        &mut self,
        module: &str,
        rule: &str,
        endpoint: &str,
        methods: &[Method],
        handler: H,
    ) -> Result<(), String>
    where
        H: Fn(&PathArgs) -> Result<Payload, HttpError> + Send + Sync + 'static,
    {
        self.add_scoped_route_inner(rule, endpoint, methods, Some(module), handler)
    }

    fn add_scoped_route_inner<H>(
        &mut self,
        rule: &str,
        endpoint: &str,
        methods: &[Method],
        module: Option<&str>,
        handler: H,
    ) -> Result<(), String>
    where
        H: Fn(&PathArgs) -> Result<Payload, HttpError> + Send + Sync + 'static,
    {
        self.routes.add(rule, endpoint, methods, module)?;
        self.handlers.insert(endpoint.to_string(), Box::new(handler));
        Ok(())
    }

    /// Register an error handler for a status code. The dispatcher
    /// consults this table before rendering an HTTP-classed failure
    /// itself; status 500 additionally catches server-side faults
    /// outside debug mode.
    pub fn error_handler<F>(&mut self, status: u16, handler: F)
    where
        F: Fn(&HttpError) -> Result<Payload, HttpError> + Send + Sync + 'static,
    {
        self.error_handlers.insert(status, Box::new(handler));
    }

    /// Register a pre-request hook. The first hook returning a payload
    /// short-circuits routing and handler execution.
    pub fn before_request<F>(&mut self, scope: Scope, hook: F)
    where
        F: Fn() -> Result<Option<Payload>, HttpError> + Send + Sync + 'static,
    {
        self.hooks.add_before(scope, Box::new(hook));
    }

    /// Register a post-request hook. Each hook receives and returns the
    /// (possibly replaced) response.
    pub fn after_request<F>(&mut self, scope: Scope, hook: F)
    where
        F: Fn(Response) -> Response + Send + Sync + 'static,
    {
        self.hooks.add_after(scope, Box::new(hook));
    }

    /// Register a template context processor.
    pub fn context_processor<F>(&mut self, scope: Scope, processor: F)
    where
        F: Fn() -> HashMap<String, Value> + Send + Sync + 'static,
    {
        self.hooks.add_processor(scope, Box::new(processor));
    }

    /// Replace the session store. Setting a store makes sessions
    /// writable regardless of the configured secret key.
    pub fn set_session_store(&mut self, store: Box<dyn SessionStore>) {
        self.session_store = Some(store);
    }

    pub fn set_template_engine(&mut self, engine: Box<dyn TemplateEngine>) {
        self.template_engine = Some(engine);
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn debug(&self) -> bool {
        self.config.app.debug
    }

    pub fn routes(&self) -> &RouteMap {
        &self.routes
    }

    pub(crate) fn handler(&self, endpoint: &str) -> Option<&Handler> {
        self.handlers.get(endpoint)
    }

    pub(crate) fn error_handler_for(&self, status: u16) -> Option<&ErrorHandler> {
        self.error_handlers.get(&status)
    }

    pub(crate) fn hooks(&self) -> &HookRegistry {
        &self.hooks
    }

    pub(crate) fn session_store(&self) -> Option<&dyn SessionStore> {
        self.session_store.as_deref()
    }

    pub(crate) fn template_engine(&self) -> Option<&dyn TemplateEngine> {
        self.template_engine.as_deref()
    }

    /// Run the application on the configured address. Consumes the app:
    /// registration is over once serving starts.
    pub fn run(self) -> Result<(), Box<dyn std::error::Error>> {
        server::run(Arc::new(self))
    }
}
