//! Helpers shared by the form-handling routes

use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::header::CONTENT_TYPE;
use hyper::{Request, Response};

use crate::config::AppState;
use crate::http::{self, BodyError, FlashMessage, FormData};
use crate::logger;

/// Redirect to the index page with flash messages
pub fn redirect_home(state: &AppState, messages: &[FlashMessage]) -> Response<Full<Bytes>> {
    let cookie = state.flash.set_cookie(messages);
    if cookie.is_none() {
        logger::log_warning("Failed to encode flash messages");
    }
    http::build_see_other_response("/", cookie.as_deref())
}

/// Read and decode a form submission. On failure the response to send
/// back is returned instead: 413 for oversized bodies, a flash redirect
/// otherwise.
#[allow(clippy::result_large_err)]
pub async fn read_form<B>(
    req: Request<B>,
    state: &AppState,
) -> Result<FormData, Response<Full<Bytes>>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let content_type = req
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string);
    let limit = usize::try_from(state.config.http.max_body_size).unwrap_or(usize::MAX);

    let body = match http::read_body(req.into_body(), limit).await {
        Ok(body) => body,
        Err(e @ BodyError::TooLarge { .. }) => {
            logger::log_warning(&e.to_string());
            return Err(http::build_413_response());
        }
        Err(e) => {
            logger::log_error(&e.to_string());
            return Err(redirect_home(
                state,
                &[FlashMessage::error("The upload could not be read. Please try again.")],
            ));
        }
    };

    http::parse_form(content_type.as_deref(), body)
        .await
        .map_err(|e| {
            logger::log_warning(&format!("Rejected form submission: {e}"));
            redirect_home(state, &[FlashMessage::error("Invalid form submission.")])
        })
}
