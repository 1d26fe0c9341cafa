//! A micro web framework built on Tokio and Hyper.
//!
//! The crate is organized around a small request-dispatch core:
//! - `routing` compiles URL rules with typed placeholders and resolves
//!   incoming (method, path) pairs
//! - `context` binds per-request state (request, session, scratch globals)
//!   and makes it reachable through a thread-confined context stack
//! - `dispatch` runs the pipeline: pre-hooks, handler, response coercion,
//!   session persistence, post-hooks
//! - `server` is a thin Hyper serving layer that feeds requests into the
//!   core and writes the produced responses back out
//!
//! Applications are assembled through the [`App`] builder: register routes,
//! hooks and error handlers, then call [`App::run`].

pub mod app;
pub mod config;
pub mod context;
pub mod dispatch;
pub mod error;
pub mod helpers;
pub mod hooks;
pub mod http;
pub mod logger;
pub mod routing;
pub mod server;
pub mod session;
pub mod template;

// Re-export the types an application touches directly
pub use app::App;
pub use config::Config;
pub use context::current_context;
pub use error::HttpError;
pub use helpers::{flash, get_flashed_messages, jsonify, url_for};
pub use http::{Payload, Request, Response};
pub use hooks::Scope;
pub use hyper::Method;
pub use routing::PathArgs;
pub use session::Session;
pub use template::{render_template, TemplateEngine};
