// Connection handling module
// Serves a single TCP connection and bridges Hyper requests into the
// framework's dispatch pipeline

use std::convert::Infallible;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use http_body_util::{BodyExt, Full};
use hyper::body::{Bytes, Incoming};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;

use crate::app::App;
use crate::dispatch::strip_body_for_head;
use crate::http::{self, Request, Response};
use crate::logger::{self, AccessLogEntry};

/// Accept a connection, enforcing the connection limit before handing
/// it off to a spawned task.
pub fn accept_connection(
    stream: tokio::net::TcpStream,
    peer_addr: std::net::SocketAddr,
    app: &Arc<App>,
    conn_counter: &Arc<AtomicUsize>,
) {
    // Increment counter first, then check limit (prevents race condition)
    let prev_count = conn_counter.fetch_add(1, Ordering::SeqCst);

    if let Some(max_conn) = app.config().performance.max_connections {
        if prev_count >= usize::try_from(max_conn).unwrap_or(usize::MAX) {
            // Exceeded limit: rollback counter and reject
            conn_counter.fetch_sub(1, Ordering::SeqCst);
            logger::log_warning(&format!(
                "Max connections reached: {prev_count}/{max_conn}. Connection rejected."
            ));
            drop(stream);
            return;
        }
    }

    if app.config().logging.access_log {
        logger::log_connection_accepted(&peer_addr);
    }

    handle_connection(stream, peer_addr, Arc::clone(app), Arc::clone(conn_counter));
}

/// Serve one connection on a local task: HTTP/1.1 with keep-alive and a
/// read/write timeout from configuration.
fn handle_connection(
    stream: tokio::net::TcpStream,
    peer_addr: std::net::SocketAddr,
    app: Arc<App>,
    conn_counter: Arc<AtomicUsize>,
) {
    tokio::task::spawn_local(async move {
        let io = TokioIo::new(stream);

        let keep_alive_timeout = app.config().performance.keep_alive_timeout;
        let timeout_duration = std::time::Duration::from_secs(std::cmp::max(
            app.config().performance.read_timeout,
            app.config().performance.write_timeout,
        ));

        let mut builder = http1::Builder::new();
        if keep_alive_timeout > 0 {
            builder.keep_alive(true);
        }

        let service_app = Arc::clone(&app);
        let conn = builder.serve_connection(
            io,
            service_fn(move |req| {
                let app = Arc::clone(&service_app);
                async move { serve_request(req, app, peer_addr).await }
            }),
        );

        match tokio::time::timeout(timeout_duration, conn).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => {
                logger::log_warning(&format!(
                    "Connection timeout after {} seconds",
                    timeout_duration.as_secs()
                ));
            }
        }

        conn_counter.fetch_sub(1, Ordering::SeqCst);
    });
}

/// Bridge one Hyper request through the dispatch core and back.
async fn serve_request(
    req: hyper::Request<Incoming>,
    app: Arc<App>,
    peer_addr: std::net::SocketAddr,
) -> Result<hyper::Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let mut entry =
        AccessLogEntry::new(peer_addr.ip().to_string(), method.to_string(), path.clone());
    entry.query = req.uri().query().map(ToString::to_string);

    let mut response = match build_response(req, &app, &path).await {
        Ok(response) => response,
        Err(response) => response,
    };
    strip_body_for_head(&method, &mut response);

    entry.status = response.status();
    entry.body_bytes = response.body().len();
    entry.request_time_us = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
    if app.config().logging.access_log {
        logger::log_access(&entry, &app.config().logging.access_log_format);
    }

    Ok(to_hyper_response(&response))
}

/// Guard the declared body size, collect the body and run the dispatch
/// pipeline. The `Err` arm carries an already-built error response.
async fn build_response(
    req: hyper::Request<Incoming>,
    app: &Arc<App>,
    path: &str,
) -> Result<Response, Response> {
    if let Some(response) = check_body_size(&req, app.config().http.max_body_size) {
        return Err(response);
    }

    let request = read_request(req).await.map_err(|e| {
        logger::log_error(&format!("Failed to read request body: {e}"));
        Response::new("400 Bad Request")
            .with_status(400)
            .with_header("Content-Type", "text/plain")
    })?;

    match app.handle(request) {
        Ok(response) => Ok(response),
        Err(failure) => {
            // Debug mode surfaced an unhandled failure; show it to the
            // operator instead of a bare 500
            logger::log_dispatch_failure(path, &failure.to_string());
            Err(Response::new(format!("Unhandled failure: {failure}"))
                .with_status(500)
                .with_header("Content-Type", "text/plain"))
        }
    }
}

/// Validate the Content-Length header against the configured limit.
fn check_body_size(req: &hyper::Request<Incoming>, max_body_size: u64) -> Option<Response> {
    let content_length = req.headers().get("content-length")?;
    let Ok(size_str) = content_length.to_str() else {
        logger::log_warning("Content-Length header contains non-ASCII characters");
        return None;
    };
    match size_str.parse::<u64>() {
        Ok(size) if size > max_body_size => {
            logger::log_error(&format!(
                "Request body too large: {size} bytes (max: {max_body_size})"
            ));
            Some(http::build_413_response())
        }
        Err(_) => {
            logger::log_warning(&format!(
                "Invalid Content-Length value: '{size_str}', skipping size check"
            ));
            None
        }
        _ => None,
    }
}

/// Convert a Hyper request into the framework's request snapshot,
/// collecting the body.
async fn read_request(req: hyper::Request<Incoming>) -> Result<Request, hyper::Error> {
    let (parts, body) = req.into_parts();
    let target = parts
        .uri
        .path_and_query()
        .map_or_else(|| parts.uri.path().to_string(), ToString::to_string);

    let mut request = Request::new(parts.method, &target);
    for (name, value) in &parts.headers {
        if let Ok(text) = value.to_str() {
            request = request.with_header(name.as_str(), text);
        }
    }

    let collected = body.collect().await?;
    Ok(request.with_body(collected.to_bytes().to_vec()))
}

/// Convert the framework response back into Hyper's representation.
fn to_hyper_response(response: &Response) -> hyper::Response<Full<Bytes>> {
    let mut builder = hyper::Response::builder().status(response.status());
    for (name, value) in response.headers() {
        builder = builder.header(name.as_str(), value.as_str());
    }
    builder
        .body(Full::new(Bytes::from(response.body().to_vec())))
        .unwrap_or_else(|e| {
            logger::log_error(&format!("Failed to build response: {e}"));
            hyper::Response::new(Full::new(Bytes::new()))
        })
}
