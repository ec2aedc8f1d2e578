//! `GET /download/<name>`: serve a converted file as an attachment

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::Response;
use std::path::PathBuf;
use tokio::fs;

use super::common::redirect_home;
use crate::config::AppState;
use crate::convert::{secure_filename, upload::extension_of};
use crate::http::{self, mime, FlashMessage};
use crate::logger;

pub async fn handle(name: &str, is_head: bool, state: &AppState) -> Response<Full<Bytes>> {
    let Some(path) = resolve(name, state).await else {
        logger::log_debug(&format!("Download not found: {name:?}"));
        return not_found(is_head, state);
    };

    match fs::read(&path).await {
        Ok(data) => {
            let content_type = mime::get_content_type(extension_of(name).as_deref());
            http::build_attachment_response(Bytes::from(data), content_type, name, is_head)
        }
        Err(e) => {
            logger::log_error(&format!("Failed to read {}: {e}", path.display()));
            not_found(is_head, state)
        }
    }
}

/// Map a requested name to a regular file inside the output directory
async fn resolve(name: &str, state: &AppState) -> Option<PathBuf> {
    // Only names that survive sanitizing unchanged are served
    if secure_filename(name).as_deref() != Some(name) {
        return None;
    }

    let output_dir = &state.config.storage.output_dir;
    let dir_canonical = match fs::canonicalize(output_dir).await {
        Ok(p) => p,
        Err(e) => {
            logger::log_warning(&format!(
                "Output directory inaccessible '{}': {e}",
                output_dir.display()
            ));
            return None;
        }
    };
    let file_canonical = fs::canonicalize(output_dir.join(name)).await.ok()?;
    if !file_canonical.starts_with(&dir_canonical) {
        logger::log_warning(&format!("Download escapes output directory: {name:?}"));
        return None;
    }

    let metadata = fs::metadata(&file_canonical).await.ok()?;
    metadata.is_file().then_some(file_canonical)
}

fn not_found(is_head: bool, state: &AppState) -> Response<Full<Bytes>> {
    if is_head {
        http::build_404_response()
    } else {
        redirect_home(state, &[FlashMessage::error("File not found.")])
    }
}
