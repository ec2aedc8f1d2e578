//! Request routing dispatch module
//!
//! Entry point for HTTP request processing: route matching, method
//! validation, the early body-size check, then dispatch to a handler.

use crate::config::AppState;
use crate::handler::{convert, download, pages, transcribe};
use crate::http;
use crate::logger;
use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::CONTENT_LENGTH;
use hyper::{Method, Request, Response, StatusCode};
use std::convert::Infallible;
use std::sync::Arc;
use tokio::fs;

const DOWNLOAD_PREFIX: &str = "/download/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Route<'a> {
    Index,
    Convert,
    Transcribe,
    Download(&'a str),
    Liveness,
    Readiness,
}

impl<'a> Route<'a> {
    fn resolve(path: &'a str) -> Option<Self> {
        match path {
            "/" => Some(Self::Index),
            "/convert" => Some(Self::Convert),
            "/transcribe" => Some(Self::Transcribe),
            "/healthz" => Some(Self::Liveness),
            "/readyz" => Some(Self::Readiness),
            _ => path.strip_prefix(DOWNLOAD_PREFIX).map(Self::Download),
        }
    }

    const fn allow(self) -> &'static str {
        match self {
            Self::Index => "GET, HEAD, POST, OPTIONS",
            Self::Convert | Self::Transcribe => "POST, OPTIONS",
            _ => "GET, HEAD, OPTIONS",
        }
    }

    fn accepts(self, method: &Method) -> bool {
        match self {
            Self::Index => [Method::GET, Method::HEAD, Method::POST].contains(method),
            Self::Convert | Self::Transcribe => method == Method::POST,
            _ => method == Method::GET || method == Method::HEAD,
        }
    }
}

/// Main entry point for HTTP request handling
pub async fn handle_request<B>(
    req: Request<B>,
    state: Arc<AppState>,
) -> Result<Response<Full<Bytes>>, Infallible>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let path = req.uri().path().to_string();
    let method = req.method().clone();
    let is_head = method == Method::HEAD;

    // 1. Resolve the route
    let Some(route) = Route::resolve(&path) else {
        logger::log_debug(&format!("No route for {method} {path}"));
        return Ok(http::build_404_response());
    };

    // 2. Check HTTP method
    if method == Method::OPTIONS {
        return Ok(http::build_options_response(route.allow()));
    }
    if !route.accepts(&method) {
        logger::log_warning(&format!("Method not allowed: {method} {path}"));
        return Ok(http::build_405_response(route.allow()));
    }

    // 3. Check body size
    if let Some(resp) = check_body_size(&req, state.config.http.max_body_size) {
        return Ok(resp);
    }

    // 4. Dispatch
    let response = match route {
        // The page's URL form may also post to itself
        Route::Index if method == Method::POST => transcribe::handle(req, &state).await,
        Route::Index => pages::index(req.headers(), &state, is_head),
        Route::Convert => convert::handle(req, &state).await,
        Route::Transcribe => transcribe::handle(req, &state).await,
        Route::Download(name) => download::handle(name, is_head, &state).await,
        Route::Liveness => http::build_health_response(StatusCode::OK, "ok"),
        Route::Readiness => readiness(&state).await,
    };
    Ok(response)
}

/// Ready once both working directories exist
async fn readiness(state: &AppState) -> Response<Full<Bytes>> {
    let storage = &state.config.storage;
    for dir in [&storage.upload_dir, &storage.output_dir] {
        let is_dir = fs::metadata(dir).await.is_ok_and(|m| m.is_dir());
        if !is_dir {
            logger::log_warning(&format!("Not ready: {} is missing", dir.display()));
            return http::build_health_response(StatusCode::SERVICE_UNAVAILABLE, "not ready");
        }
    }
    http::build_health_response(StatusCode::OK, "ok")
}

/// Validate Content-Length header and return 413 if exceeded
fn check_body_size<B>(req: &Request<B>, max_body_size: u64) -> Option<Response<Full<Bytes>>> {
    let content_length = req.headers().get(CONTENT_LENGTH)?;
    content_length.to_str().map_or_else(
        |_| {
            logger::log_warning("Content-Length header contains non-ASCII characters");
            None
        },
        |size_str| match size_str.parse::<u64>() {
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
        },
    )
}
