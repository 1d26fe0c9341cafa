//! Minimal demo application: two routes, no session use.

use rust_webframework::{App, Config};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::load()?;
    let mut app = App::new(config);

    app.route("/index", "index", |_| Ok("Hello world".into()))?;

    app.route("/user/<username>/", "user_greeting", |args| {
        let username = args.get_str("username").unwrap_or_default();
        Ok(format!("Hello, {username}").into())
    })?;

    app.run()
}
