//! `POST /transcribe` (and `POST /`): YouTube audio to MIDI
//!
//! `POST /convert` forwards here when it receives `youtube_url` instead of a file.

use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::{Request, Response};

use super::common::{read_form, redirect_home};
use crate::config::AppState;
use crate::convert::{validate_url, ConvertError};
use crate::http::FlashMessage;
use crate::logger;

pub async fn handle<B>(req: Request<B>, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    if !state.transcriber.enabled() {
        return disabled(state);
    }

    match read_form(req, state).await {
        Ok(form) => transcribe_field(form.field("youtube_url"), state).await,
        Err(resp) => resp,
    }
}

/// Validate a submitted `youtube_url` value and run the transcription
pub async fn transcribe_field(raw: Option<&str>, state: &AppState) -> Response<Full<Bytes>> {
    if !state.transcriber.enabled() {
        return disabled(state);
    }

    let url = match validate_url(raw.unwrap_or_default()) {
        Ok(url) => url,
        Err(e) => {
            logger::log_warning(&format!("Rejected transcription request: {e}"));
            return redirect_home(state, &[FlashMessage::error(e.user_message())]);
        }
    };

    match state.transcriber.transcribe(&url).await {
        Ok(output) => redirect_home(
            state,
            &[FlashMessage::success(format!("MIDI ready: {}.", output.file_name))
                .with_download(&output.file_name)],
        ),
        Err(e) => {
            logger::log_error(&format!("Transcription of {url} failed: {e}"));
            redirect_home(state, &[FlashMessage::error(e.user_message())])
        }
    }
}

fn disabled(state: &AppState) -> Response<Full<Bytes>> {
    redirect_home(
        state,
        &[FlashMessage::error(ConvertError::Disabled.user_message())],
    )
}
