//! `POST /convert`: PDF score upload to MusicXML, or a `youtube_url`
//! submission handed to the transcriber

use http_body_util::Full;
use hyper::body::{Body, Bytes};
use hyper::{Request, Response};

use super::common::{read_form, redirect_home};
use super::transcribe;
use crate::config::AppState;
use crate::convert::{self, ConvertError, UploadError};
use crate::http::FlashMessage;
use crate::logger;

pub async fn handle<B>(req: Request<B>, state: &AppState) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    let form = match read_form(req, state).await {
        Ok(form) => form,
        Err(resp) => return resp,
    };

    let file = match form.file("file") {
        Some(part) => part,
        None if form.field("youtube_url").is_some() => {
            return transcribe::transcribe_field(form.field("youtube_url"), state).await;
        }
        // A file input left empty may arrive as a plain text field
        None if form.field("file").is_some() => {
            return reject(state, UploadError::EmptyFilename.into());
        }
        None => return reject(state, UploadError::MissingFile.into()),
    };

    let upload = match state.uploads.save(file.filename.as_deref(), &file.data).await {
        Ok(upload) => upload,
        Err(e) => return reject(state, e.into()),
    };
    let original_name = upload.original_name().to_string();

    match convert::convert_upload(&state.uploads, state.converter.as_ref(), upload).await {
        Ok(output) => {
            let mut messages = vec![FlashMessage::success(format!(
                "Converted {original_name} to {}.",
                output.file_name
            ))
            .with_download(&output.file_name)];
            if output.mocked {
                messages.push(FlashMessage::info(
                    "Demo mode: this is a placeholder score, not a real recognition result.",
                ));
            }
            redirect_home(state, &messages)
        }
        Err(e) => redirect_home(state, &[FlashMessage::error(e.user_message())]),
    }
}

fn reject(state: &AppState, err: ConvertError) -> Response<Full<Bytes>> {
    logger::log_warning(&format!("Rejected upload: {err}"));
    redirect_home(state, &[FlashMessage::error(err.user_message())])
}
