//! Request dispatch pipeline.
//!
//! `App::handle` is the single entry point invoked once per inbound
//! request by the serving layer. The pipeline runs synchronously:
//!
//! 1. Bind the request context and push it onto the context stack
//! 2. Run pre-hooks (global, then module); the first payload returned
//!    short-circuits routing and handler execution
//! 3. Raise the recorded routing failure, or invoke the matched handler
//!    with the extracted path parameters
//! 4. Coerce the returned payload into a response
//! 5. Persist the session when it was mutated
//! 6. Thread the response through post-hooks (module, then global)
//! 7. Pop the context and hand the response back
//!
//! HTTP-classed failures are offered to registered error handlers by
//! status code and otherwise render themselves. Server-side faults
//! propagate to the caller in debug mode (leaving the context pushed
//! for post-mortem inspection) and become the generic 500 response
//! otherwise.

use std::rc::Rc;
use std::sync::Arc;

use crate::app::App;
use crate::context::{store, RequestContext};
use crate::error::HttpError;
use crate::http::{response, Payload, Request, Response};
use crate::session::SessionStore as _;

impl App {
    /// Run the full per-request pipeline.
    ///
    /// Returns `Err` only in debug mode, for failures no error handler
    /// covered; the serving layer decides how to surface those.
    pub fn handle(self: &Arc<Self>, request: Request) -> Result<Response, HttpError> {
        let ctx = RequestContext::new(Arc::clone(self), request);
        store::push(Rc::clone(&ctx));

        match self.run_pipeline(&ctx) {
            Ok(response) => {
                store::pop();
                Ok(response)
            }
            Err(failure) if failure.is_http() => {
                // A hook raised an HTTP failure after the dispatch
                // step's error handling; render it as-is.
                store::pop();
                Ok(failure.to_response())
            }
            Err(failure) => {
                if self.debug() {
                    // Keep the context alive for post-mortem inspection
                    return Err(failure);
                }
                store::pop();
                Ok(response::build_500_response())
            }
        }
    }

    fn run_pipeline(&self, ctx: &Rc<RequestContext>) -> Result<Response, HttpError> {
        let payload = match self.preprocess_request(ctx)? {
            Some(payload) => payload,
            None => self.dispatch_request(ctx)?,
        };
        let response = payload.into_response(&self.config().http.default_content_type)?;
        Ok(self.process_response(ctx, response))
    }

    /// Run pre-hooks in order. A payload from any hook becomes the
    /// response and stops further pre-hooks and dispatch.
    fn preprocess_request(&self, ctx: &RequestContext) -> Result<Option<Payload>, HttpError> {
        for hook in self.hooks().before_for(ctx.module()) {
            if let Some(payload) = hook()? {
                return Ok(Some(payload));
            }
        }
        Ok(None)
    }

    /// Raise the routing outcome or invoke the handler, translating
    /// failures through the error-handler table.
    fn dispatch_request(&self, ctx: &RequestContext) -> Result<Payload, HttpError> {
        match self.invoke_handler(ctx) {
            Ok(payload) => Ok(payload),
            Err(failure) => match failure.status() {
                Some(status) => match self.error_handler_for(status) {
                    Some(handler) => handler(&failure),
                    None => Ok(Payload::Response(failure.to_response())),
                },
                None => {
                    if self.debug() {
                        return Err(failure);
                    }
                    match self.error_handler_for(500) {
                        Some(handler) => handler(&failure),
                        None => Err(failure),
                    }
                }
            },
        }
    }

    fn invoke_handler(&self, ctx: &RequestContext) -> Result<Payload, HttpError> {
        if let Some(failure) = ctx.routing_failure() {
            return Err(failure.clone());
        }
        let endpoint = ctx.endpoint().ok_or_else(|| {
            HttpError::HandlerFailure("routing succeeded without an endpoint".to_string())
        })?;
        // A route registered without a bound callable is a
        // configuration error, not a 404.
        let handler = self.handler(endpoint).ok_or_else(|| {
            HttpError::HandlerFailure(format!("endpoint {endpoint:?} has no bound handler"))
        })?;
        handler(ctx.args())
    }

    /// Persist the session, then thread the response through the
    /// post-hooks.
    fn process_response(&self, ctx: &RequestContext, mut response: Response) -> Response {
        {
            let session = ctx.session();
            if session.is_modified() && !session.is_null() {
                if let Some(session_store) = self.session_store() {
                    session_store.save(&session, &mut response);
                }
            }
        }
        for hook in self.hooks().after_for(ctx.module()) {
            response = hook(response);
        }
        response
    }
}

/// Serve-time finalization: HEAD responses keep their headers and
/// advertised length but carry no body. The serving layer applies this
/// after dispatch so handlers stay method-agnostic.
pub fn strip_body_for_head(method: &hyper::Method, response: &mut Response) {
    if *method == hyper::Method::HEAD {
        let length = response.body().len();
        response.set_header("Content-Length", &length.to_string());
        response.clear_body();
    }
}

#[cfg(test)]
mod tests {
    use hyper::Method;

    use super::*;
    use crate::config::Config;
    use crate::context::current_context;
    use crate::hooks::Scope;

    fn base_config() -> Config {
        let mut config = Config::default();
        config.app.secret_key = Some("test secret".to_string());
        config
    }

    fn demo_app(config: Config) -> App {
        let mut app = App::new(config);
        app.route("/index", "index", |_| Ok("Hello world".into()))
            .unwrap();
        app.route("/user/<username>/", "user_page", |args| {
            let username = args.get_str("username").unwrap_or_default();
            Ok(format!("Hello, {username}").into())
        })
        .unwrap();
        app.add_route(
            "/login",
            "login",
            &[Method::GET, Method::POST],
            |_| {
                let ctx = current_context().expect("handler runs inside a request context");
                if *ctx.request().method() == Method::GET {
                    return Ok("<form>login</form>".into());
                }
                let username = ctx.request().form_value("username").unwrap_or_default();
                let password = ctx.request().form_value("password").unwrap_or_default();
                if username == "admin" && password == "password" {
                    ctx.session_mut().insert("username", username.as_str())?;
                    Ok("Login successful".into())
                } else {
                    Ok("Invalid credentials".into())
                }
            },
        )
        .unwrap();
        app
    }

    #[test]
    fn test_literal_route_dispatch() {
        let app = Arc::new(demo_app(base_config()));
        let response = app.handle(Request::get("/index")).unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.body_str(), "Hello world");
    }

    #[test]
    fn test_path_params_reach_handler() {
        let app = Arc::new(demo_app(base_config()));
        let response = app.handle(Request::get("/user/testuser1/")).unwrap();
        assert_eq!(response.status(), 200);
        assert_eq!(response.body_str(), "Hello, testuser1");
    }

    #[test]
    fn test_missing_trailing_slash_redirects() {
        let app = Arc::new(demo_app(base_config()));
        let response = app.handle(Request::get("/user/testuser1")).unwrap();
        assert_eq!(response.status(), 301);
        assert_eq!(response.header("Location"), Some("/user/testuser1/"));
    }

    #[test]
    fn test_not_found_and_method_not_allowed() {
        let app = Arc::new(demo_app(base_config()));
        let response = app.handle(Request::get("/missing")).unwrap();
        assert_eq!(response.status(), 404);

        let response = app.handle(Request::new(Method::DELETE, "/index")).unwrap();
        assert_eq!(response.status(), 405);
        assert!(response.header("Allow").unwrap().contains("GET"));
    }

    #[test]
    fn test_login_form_scenarios() {
        let app = Arc::new(demo_app(base_config()));

        let ok = app
            .handle(Request::post("/login").with_form(&[
                ("username", "admin"),
                ("password", "password"),
            ]))
            .unwrap();
        assert_eq!(ok.status(), 200);
        assert!(ok.body_str().contains("Login successful"));

        let bad = app
            .handle(Request::post("/login").with_form(&[
                ("username", "admin"),
                ("password", "wrong"),
            ]))
            .unwrap();
        assert_eq!(bad.status(), 200);
        assert!(bad.body_str().contains("Invalid credentials"));
    }

    #[test]
    fn test_session_mutation_sets_cookie() {
        let app = Arc::new(demo_app(base_config()));

        let mutated = app
            .handle(Request::post("/login").with_form(&[
                ("username", "admin"),
                ("password", "password"),
            ]))
            .unwrap();
        assert!(mutated.header("Set-Cookie").is_some());

        // An unmutated session produces no outgoing credential
        let untouched = app.handle(Request::get("/index")).unwrap();
        assert!(untouched.header("Set-Cookie").is_none());
    }

    #[test]
    fn test_pre_hook_short_circuits_dispatch() {
        let mut app = demo_app(base_config());
        app.before_request(Scope::Global, || Ok(Some("intercepted".into())));
        app.before_request(Scope::Global, || {
            panic!("second pre-hook must not run after a short-circuit")
        });
        let app = Arc::new(app);
        let response = app.handle(Request::get("/index")).unwrap();
        assert_eq!(response.body_str(), "intercepted");
    }

    #[test]
    fn test_post_hooks_thread_the_response() {
        let mut app = demo_app(base_config());
        app.after_request(Scope::Global, |response| {
            response.with_header("X-Frame", "deny")
        });
        let app = Arc::new(app);
        let response = app.handle(Request::get("/index")).unwrap();
        assert_eq!(response.header("X-Frame"), Some("deny"));
        assert_eq!(response.body_str(), "Hello world");
    }

    #[test]
    fn test_post_hooks_run_for_short_circuited_requests() {
        let mut app = demo_app(base_config());
        app.before_request(Scope::Global, || Ok(Some("intercepted".into())));
        app.after_request(Scope::Global, |response| {
            response.with_header("X-Seen", "yes")
        });
        let app = Arc::new(app);
        let response = app.handle(Request::get("/index")).unwrap();
        assert_eq!(response.header("X-Seen"), Some("yes"));
    }

    #[test]
    fn test_module_hooks_only_for_module_routes() {
        let mut app = demo_app(base_config());
        app.add_scoped_route("admin", "/admin/panel", "admin_panel", &[Method::GET], |_| {
            Ok("panel".into())
        })
        .unwrap();
        app.after_request(Scope::Module("admin".to_string()), |response| {
            response.with_header("X-Admin", "1")
        });
        let app = Arc::new(app);

        let admin = app.handle(Request::get("/admin/panel")).unwrap();
        assert_eq!(admin.header("X-Admin"), Some("1"));

        let public = app.handle(Request::get("/index")).unwrap();
        assert!(public.header("X-Admin").is_none());
    }

    #[test]
    fn test_error_handler_overrides_not_found() {
        let mut app = demo_app(base_config());
        app.error_handler(404, |_| {
            Ok(Payload::WithStatus("custom not found".to_string(), 404))
        });
        let app = Arc::new(app);
        let response = app.handle(Request::get("/missing")).unwrap();
        assert_eq!(response.status(), 404);
        assert_eq!(response.body_str(), "custom not found");
    }

    #[test]
    fn test_handler_fault_becomes_500_outside_debug() {
        let mut app = demo_app(base_config());
        app.route("/broken", "broken", |_| {
            Err(HttpError::HandlerFailure("boom".to_string()))
        })
        .unwrap();
        let app = Arc::new(app);
        let response = app.handle(Request::get("/broken")).unwrap();
        assert_eq!(response.status(), 500);
        // The pipeline completed, so no context was left behind
        assert!(current_context().is_none());
    }

    #[test]
    fn test_handler_fault_reaches_500_handler() {
        let mut app = demo_app(base_config());
        app.route("/broken", "broken", |_| {
            Err(HttpError::HandlerFailure("boom".to_string()))
        })
        .unwrap();
        app.error_handler(500, |_| {
            Ok(Payload::WithStatus("handled fault".to_string(), 500))
        });
        let app = Arc::new(app);
        let response = app.handle(Request::get("/broken")).unwrap();
        assert_eq!(response.status(), 500);
        assert_eq!(response.body_str(), "handled fault");
    }

    #[test]
    fn test_debug_mode_propagates_and_keeps_context() {
        let mut config = base_config();
        config.app.debug = true;
        let mut app = demo_app(config);
        app.route("/broken", "broken", |_| {
            Err(HttpError::HandlerFailure("boom".to_string()))
        })
        .unwrap();
        let app = Arc::new(app);

        let failure = app.handle(Request::get("/broken")).unwrap_err();
        assert!(matches!(failure, HttpError::HandlerFailure(_)));
        // Post-mortem: the failing request's context is still current
        let ctx = current_context().expect("context kept for inspection");
        assert_eq!(ctx.request().path(), "/broken");
        store::pop();
    }

    #[test]
    fn test_missing_response_is_server_fault() {
        let mut app = demo_app(base_config());
        app.route("/silent", "silent", |_| Ok(Payload::None)).unwrap();
        let app = Arc::new(app);
        let response = app.handle(Request::get("/silent")).unwrap();
        assert_eq!(response.status(), 500);
    }

    #[test]
    fn test_context_popped_after_each_request() {
        let app = Arc::new(demo_app(base_config()));
        assert!(current_context().is_none());
        app.handle(Request::get("/index")).unwrap();
        assert!(current_context().is_none());
        app.handle(Request::get("/missing")).unwrap();
        assert!(current_context().is_none());
    }

    #[test]
    fn test_head_request_body_stripped_at_bridge() {
        let app = Arc::new(demo_app(base_config()));
        let mut response = app.handle(Request::new(Method::HEAD, "/index")).unwrap();
        strip_body_for_head(&Method::HEAD, &mut response);
        assert_eq!(response.status(), 200);
        assert!(response.body().is_empty());
        assert_eq!(response.header("Content-Length"), Some("11"));
    }
}
