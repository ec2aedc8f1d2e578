// Connection handling module
// Serves a single accepted TCP connection over HTTP/1.1

use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use crate::config;
use crate::handler;
use crate::logger::{self, AccessLogEntry};

/// Accept a connection and serve it in a spawned task.
///
/// # Arguments
///
/// * `stream` - The TCP stream to handle
/// * `peer_addr` - The peer's socket address
/// * `state` - Shared application state
pub fn accept_connection(
    stream: tokio::net::TcpStream,
    peer_addr: std::net::SocketAddr,
    state: &Arc<config::AppState>,
) {
    logger::log_connection_accepted(&peer_addr);
    handle_connection(stream, peer_addr, Arc::clone(state));
}

/// Handle a single connection in a spawned task.
///
/// This function:
/// 1. Wraps the TCP stream in `TokioIo`
/// 2. Configures HTTP/1.1 keep-alive
/// 3. Serves requests, writing an access log line per request when enabled
/// 4. Bounds the whole connection by `http.connection_timeout`
fn handle_connection(
    stream: tokio::net::TcpStream,
    peer_addr: std::net::SocketAddr,
    state: Arc<config::AppState>,
) {
    tokio::spawn(async move {
        let io = TokioIo::new(stream);
        let timeout_duration = Duration::from_secs(state.config.http.connection_timeout);

        let mut builder = http1::Builder::new();
        builder.keep_alive(state.config.http.keep_alive);

        let conn = builder.serve_connection(
            io,
            service_fn(move |req| {
                let state = Arc::clone(&state);
                async move {
                    let entry = state
                        .config
                        .logging
                        .access_log
                        .then(|| AccessLogEntry::from_request(&req, peer_addr));

                    let resp = handler::handle_request(req, Arc::clone(&state)).await?;

                    if let Some(mut entry) = entry {
                        let body_bytes = resp.body().size_hint().exact().unwrap_or(0);
                        entry.finish(resp.status().as_u16(), body_bytes);
                        logger::log_access(&entry, &state.config.logging.access_log_format);
                    }
                    Ok::<hyper::Response<Full<Bytes>>, Infallible>(resp)
                }
            }),
        );

        match tokio::time::timeout(timeout_duration, conn).await {
            Ok(Ok(())) => {}
            Ok(Err(err)) => logger::log_connection_error(&err),
            Err(_) => {
                logger::log_warning(&format!(
                    "Connection from {peer_addr} closed after {} seconds",
                    timeout_duration.as_secs()
                ));
            }
        }
    });
}
