//! Template collaborator boundary.
//!
//! The core does not implement template syntax. It defines the engine
//! contract and owns the context merge: every render sees the request,
//! session and scratch globals plus whatever the registered context
//! processors contribute.

use std::collections::HashMap;

use serde_json::{json, Value};

use crate::context::{current_context, RequestContext};
use crate::error::HttpError;

/// External rendering engine. Registered on the application; the core
/// only ever calls `render`.
pub trait TemplateEngine: Send + Sync {
    fn render(&self, name: &str, context: &HashMap<String, Value>) -> Result<String, HttpError>;
}

/// Render a template with the full request context merged in.
///
/// The merge order follows the processor chain: caller-supplied
/// variables first, then the standard request/session/g injection,
/// then registered context processors (global before module-scoped).
pub fn render_template(
    name: &str,
    vars: HashMap<String, Value>,
) -> Result<String, HttpError> {
    let ctx = current_context().ok_or_else(|| {
        HttpError::HandlerFailure("render_template called outside a request context".to_string())
    })?;
    let engine = ctx.app().template_engine().ok_or_else(|| {
        HttpError::HandlerFailure("no template engine is configured".to_string())
    })?;

    let mut context = vars;
    context.extend(standard_context(&ctx));
    for processor in ctx.app().hooks().processors_for(ctx.module()) {
        context.extend(processor());
    }

    engine.render(name, &context)
}

/// The variables every template render can rely on.
fn standard_context(ctx: &RequestContext) -> HashMap<String, Value> {
    let mut standard = HashMap::new();
    standard.insert(
        "request".to_string(),
        json!({
            "method": ctx.request().method().as_str(),
            "path": ctx.request().path(),
        }),
    );
    standard.insert(
        "session".to_string(),
        Value::Object(
            ctx.session()
                .data()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
    );
    standard.insert(
        "g".to_string(),
        Value::Object(
            ctx.globals()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        ),
    );
    standard
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;
    use std::sync::Arc;

    use super::*;
    use crate::app::App;
    use crate::config::Config;
    use crate::context::store;
    use crate::hooks::Scope;
    use crate::http::Request;

    /// Renders a deterministic dump of selected context keys.
    struct ProbeEngine;

    impl TemplateEngine for ProbeEngine {
        fn render(
            &self,
            name: &str,
            context: &HashMap<String, Value>,
        ) -> Result<String, HttpError> {
            let user = context
                .get("user")
                .and_then(Value::as_str)
                .unwrap_or("-");
            let path = context
                .get("request")
                .and_then(|r| r.get("path"))
                .and_then(Value::as_str)
                .unwrap_or("-");
            Ok(format!("{name}:{user}:{path}"))
        }
    }

    fn app_with_engine() -> App {
        let mut config = Config::default();
        config.app.secret_key = Some("secret".to_string());
        let mut app = App::new(config);
        app.route("/profile", "profile", |_| Ok("unused".into())).unwrap();
        app.set_template_engine(Box::new(ProbeEngine));
        app
    }

    fn with_context<T>(app: App, target: &str, body: impl FnOnce() -> T) -> T {
        let ctx = crate::context::RequestContext::new(Arc::new(app), Request::get(target));
        store::push(Rc::clone(&ctx));
        let result = body();
        store::pop();
        result
    }

    #[test]
    fn test_render_merges_standard_context() {
        let rendered = with_context(app_with_engine(), "/profile", || {
            render_template(
                "profile.html",
                HashMap::from([("user".to_string(), Value::from("admin"))]),
            )
            .unwrap()
        });
        assert_eq!(rendered, "profile.html:admin:/profile");
    }

    #[test]
    fn test_context_processors_contribute() {
        let mut app = app_with_engine();
        app.context_processor(Scope::Global, || {
            HashMap::from([("user".to_string(), Value::from("from_processor"))])
        });
        let rendered = with_context(app, "/profile", || {
            render_template("t", HashMap::new()).unwrap()
        });
        assert_eq!(rendered, "t:from_processor:/profile");
    }

    #[test]
    fn test_render_outside_context_fails() {
        assert!(matches!(
            render_template("t", HashMap::new()),
            Err(HttpError::HandlerFailure(_))
        ));
    }

    #[test]
    fn test_render_without_engine_fails() {
        let mut config = Config::default();
        config.app.secret_key = Some("secret".to_string());
        let app = App::new(config);
        let result = with_context(app, "/x", || render_template("t", HashMap::new()));
        assert!(matches!(result, Err(HttpError::HandlerFailure(_))));
    }
}
