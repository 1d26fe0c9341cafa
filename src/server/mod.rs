// Server module entry
// Runtime setup and the accept loop feeding requests into the dispatch core

pub mod connection;
pub mod listener;

// Re-export commonly used functions
pub use listener::create_reusable_listener;

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::app::App;
use crate::logger;

/// Build the runtime from configuration and serve the application.
/// This call blocks for the lifetime of the server.
pub fn run(app: Arc<App>) -> Result<(), Box<dyn std::error::Error>> {
    logger::init(app.config())?;

    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();
    if let Some(workers) = app.config().server.workers {
        runtime_builder.worker_threads(workers);
    }
    let runtime = runtime_builder.build()?;

    runtime.block_on(serve(app))
}

async fn serve(app: Arc<App>) -> Result<(), Box<dyn std::error::Error>> {
    let addr = app.config().get_socket_addr()?;
    let listener = create_reusable_listener(addr)?;
    logger::log_server_start(&addr, app.config());

    // Connections are served with spawn_local: the dispatch pipeline is
    // synchronous and per-request state is thread-confined.
    let local = tokio::task::LocalSet::new();
    local.run_until(accept_loop(listener, app)).await
}

async fn accept_loop(
    listener: TcpListener,
    app: Arc<App>,
) -> Result<(), Box<dyn std::error::Error>> {
    let active_connections = Arc::new(AtomicUsize::new(0));
    loop {
        match listener.accept().await {
            Ok((stream, peer_addr)) => {
                connection::accept_connection(stream, peer_addr, &app, &active_connections);
            }
            Err(e) => {
                logger::log_error(&format!("Failed to accept connection: {e}"));
            }
        }
    }
}
