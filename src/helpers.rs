//! Request-context helpers.
//!
//! Free functions reading the current request context from the context
//! stack, so handlers and templates use them without carrying the
//! context around: reverse URL construction, flash messages and JSON
//! payloads.

use std::rc::Rc;

use serde_json::Value;

use crate::context::{current_context, RequestContext};
use crate::error::HttpError;
use crate::http::Payload;

/// Session key holding queued flash messages.
const FLASHES_KEY: &str = "_flashes";

fn require_context(caller: &str) -> Result<Rc<RequestContext>, HttpError> {
    current_context().ok_or_else(|| {
        HttpError::HandlerFailure(format!("{caller} called outside a request context"))
    })
}

/// Build the URL for a registered endpoint. Parameters the rule does
/// not consume are appended as a query string.
pub fn url_for(endpoint: &str, params: &[(&str, &str)]) -> Result<String, HttpError> {
    let ctx = require_context("url_for")?;
    ctx.app().routes().build(endpoint, params)
}

/// Queue a message to be shown on the next rendered request. Stored in
/// the session, so it survives a redirect.
pub fn flash(message: &str) -> Result<(), HttpError> {
    let ctx = require_context("flash")?;
    let mut session = ctx.session_mut();
    let mut messages = session
        .get(FLASHES_KEY)
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    messages.push(Value::from(message));
    session.insert(FLASHES_KEY, Value::Array(messages))
}

/// Pull all queued flash messages. The first call in a request removes
/// them from the session and caches them on the context, so repeated
/// calls within the same request see the same list.
pub fn get_flashed_messages() -> Result<Vec<String>, HttpError> {
    let ctx = require_context("get_flashed_messages")?;
    let mut cache = ctx.flashes();
    if let Some(messages) = cache.as_ref() {
        return Ok(messages.clone());
    }

    let pulled = {
        let mut session = ctx.session_mut();
        if session.contains(FLASHES_KEY) {
            session.remove(FLASHES_KEY)?
        } else {
            None
        }
    };
    let messages: Vec<String> = pulled
        .as_ref()
        .and_then(Value::as_array)
        .map(|values| {
            values
                .iter()
                .filter_map(|v| v.as_str().map(ToString::to_string))
                .collect()
        })
        .unwrap_or_default();

    *cache = Some(messages.clone());
    Ok(messages)
}

/// Wrap a JSON value as a response payload with the
/// `application/json` content type.
pub fn jsonify(value: Value) -> Payload {
    Payload::Json(value)
}
