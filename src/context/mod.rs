//! Per-request state binding.
//!
//! A `RequestContext` is created exactly once per inbound request at the
//! entry of the dispatch pipeline. Construction binds the request
//! snapshot, opens the session (falling back to the read-only null
//! session when no secret key is configured) and runs route resolution
//! once, recording either the match or the routing failure for the
//! dispatcher to raise later. The context is pushed onto the
//! thread-confined stack for the duration of the pipeline and popped on
//! exit; in debug mode an unhandled failure leaves it in place for
//! post-mortem inspection.

pub mod store;

use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::Arc;

use serde_json::Value;

use crate::app::App;
use crate::error::HttpError;
use crate::http::Request;
use crate::routing::PathArgs;
use crate::session::{Session, SessionStore as _};

/// Everything a single request's handling needs, bundled.
pub struct RequestContext {
    app: Arc<App>,
    request: Request,
    session: RefCell<Session>,
    /// Scratch storage for handler-local data, the `g` of the pipeline.
    globals: RefCell<HashMap<String, Value>>,
    /// Routing outcome, recorded once at construction.
    endpoint: Option<String>,
    module: Option<String>,
    args: PathArgs,
    routing_failure: Option<HttpError>,
    /// Flash messages pulled from the session, cached for the rest of
    /// the request.
    flashes: RefCell<Option<Vec<String>>>,
}

impl RequestContext {
    /// Bind a request: open the session and resolve the route. The
    /// outcome (match or failure) is recorded, not raised; the
    /// dispatcher raises it when the pipeline reaches routing.
    pub fn new(app: Arc<App>, request: Request) -> Rc<Self> {
        let session = match app.session_store() {
            Some(session_store) => session_store.open(&request),
            None => Session::null(),
        };

        let (endpoint, module, args, routing_failure) =
            match app.routes().resolve(request.method(), request.path()) {
                Ok(route_match) => (
                    Some(route_match.endpoint),
                    route_match.module,
                    route_match.args,
                    None,
                ),
                Err(failure) => (None, None, PathArgs::new(), Some(failure)),
            };

        Rc::new(Self {
            app,
            request,
            session: RefCell::new(session),
            globals: RefCell::new(HashMap::new()),
            endpoint,
            module,
            args,
            routing_failure,
            flashes: RefCell::new(None),
        })
    }

    pub fn app(&self) -> &Arc<App> {
        &self.app
    }

    pub fn request(&self) -> &Request {
        &self.request
    }

    pub fn session(&self) -> Ref<'_, Session> {
        self.session.borrow()
    }

    pub fn session_mut(&self) -> RefMut<'_, Session> {
        self.session.borrow_mut()
    }

    pub fn globals(&self) -> Ref<'_, HashMap<String, Value>> {
        self.globals.borrow()
    }

    pub fn globals_mut(&self) -> RefMut<'_, HashMap<String, Value>> {
        self.globals.borrow_mut()
    }

    /// Endpoint name of the matched route, if routing succeeded.
    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    /// Module scope of the matched route, used for scoped hook lookup.
    pub fn module(&self) -> Option<&str> {
        self.module.as_deref()
    }

    pub fn args(&self) -> &PathArgs {
        &self.args
    }

    pub fn routing_failure(&self) -> Option<&HttpError> {
        self.routing_failure.as_ref()
    }

    pub fn flashes(&self) -> RefMut<'_, Option<Vec<String>>> {
        self.flashes.borrow_mut()
    }
}

/// The context of the currently executing request, reachable from
/// anywhere on the handling task without parameter threading.
pub fn current_context() -> Option<Rc<RequestContext>> {
    store::current()
}
