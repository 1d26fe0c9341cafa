//! Login demo application: form handling, signed sessions, flash
//! messages and reverse URL construction.

use hyper::Method;
use rust_webframework::{
    current_context, flash, get_flashed_messages, url_for, App, Config, HttpError, Payload,
    Scope,
};

fn redirect_to(location: &str) -> Payload {
    Payload::Full(
        format!("Redirecting to {location}"),
        302,
        vec![("Location".to_string(), location.to_string())],
    )
}

fn page(title: &str, body: &str) -> String {
    format!(
        "<!doctype html>\n<html>\n<head><title>{title}</title></head>\n\
         <body>\n<h1>{title}</h1>\n{body}\n</body>\n</html>"
    )
}

fn login_form(notice: &str) -> String {
    page(
        "Sign in",
        &format!(
            "<p>{notice}</p>\n\
             <form method=\"post\" action=\"/login\">\n\
             <input name=\"username\" placeholder=\"username\">\n\
             <input name=\"password\" type=\"password\" placeholder=\"password\">\n\
             <button type=\"submit\">Sign in</button>\n\
             </form>"
        ),
    )
}

fn require_context() -> Result<std::rc::Rc<rust_webframework::context::RequestContext>, HttpError> {
    current_context()
        .ok_or_else(|| HttpError::HandlerFailure("handler ran outside a request context".to_string()))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::load()?;
    if config.app.secret_key.is_none() {
        // The demo needs writable sessions even without a config file
        config.app.secret_key = Some("development key".to_string());
    }
    let mut app = App::new(config);

    app.route("/", "home", |_| {
        let ctx = require_context()?;
        let username = ctx.session().get_str("username").map(ToString::to_string);
        let messages = get_flashed_messages()?;
        let notices = messages
            .iter()
            .map(|m| format!("<p><em>{m}</em></p>"))
            .collect::<String>();
        match username {
            Some(username) => Ok(page(
                "Home",
                &format!("{notices}<p>Signed in as {username}.</p><p><a href=\"/logout\">Log out</a></p>"),
            )
            .into()),
            None => {
                let target = url_for("login", &[])?;
                Ok(redirect_to(&target))
            }
        }
    })?;

    app.add_route("/login", "login", &[Method::GET, Method::POST], |_| {
        let ctx = require_context()?;
        if *ctx.request().method() == Method::GET {
            return Ok(login_form("Please sign in.").into());
        }
        let username = ctx.request().form_value("username").unwrap_or_default();
        let password = ctx.request().form_value("password").unwrap_or_default();
        if username == "admin" && password == "password" {
            ctx.session_mut().insert("username", username.as_str())?;
            flash("You were logged in")?;
            Ok(page("Welcome", "<p>Login successful.</p><p><a href=\"/\">Continue</a></p>").into())
        } else {
            Ok(login_form("Invalid credentials.").into())
        }
    })?;

    app.route("/logout", "logout", |_| {
        let ctx = require_context()?;
        ctx.session_mut().remove("username")?;
        flash("You were logged out")?;
        let target = url_for("login", &[])?;
        Ok(redirect_to(&target))
    })?;

    app.error_handler(404, |_| {
        Ok(Payload::WithStatus(
            page("Not found", "<p>Nothing here. <a href=\"/\">Back home</a></p>"),
            404,
        ))
    });

    app.after_request(Scope::Global, |response| {
        response.with_header("X-Content-Type-Options", "nosniff")
    });

    app.run()
}
