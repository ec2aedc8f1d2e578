//! Index page rendering

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::header::HeaderMap;
use hyper::Response;
use minijinja::Environment;
use serde::Serialize;

use crate::config::AppState;
use crate::http::{self, FlashMessage};
use crate::logger;

const INDEX_TEMPLATE: &str = include_str!("../../templates/index.html");

/// Compiled page templates
pub struct Pages {
    env: Environment<'static>,
}

#[derive(Serialize)]
struct IndexView<'a> {
    server_name: &'a str,
    messages: &'a [FlashMessage],
    mock_mode: bool,
    transcribe_enabled: bool,
}

impl Pages {
    pub fn new() -> Result<Self, minijinja::Error> {
        let mut env = Environment::new();
        env.add_template("index.html", INDEX_TEMPLATE)?;
        Ok(Self { env })
    }

    fn render_index(&self, view: &IndexView<'_>) -> Result<String, minijinja::Error> {
        self.env.get_template("index.html")?.render(view)
    }
}

/// `GET /`: the upload forms plus any pending flash messages, which are
/// consumed by clearing the cookie
pub fn index(headers: &HeaderMap, state: &AppState, is_head: bool) -> Response<Full<Bytes>> {
    let messages = state.flash.read(headers);
    let view = IndexView {
        server_name: &state.config.http.server_name,
        messages: &messages,
        mock_mode: state.config.omr.mock_mode,
        transcribe_enabled: state.transcriber.enabled(),
    };

    match state.pages.render_index(&view) {
        Ok(html) => {
            let clear = (!messages.is_empty()).then(|| state.flash.clear_cookie());
            http::build_html_response(html, is_head, clear.as_deref())
        }
        Err(e) => {
            logger::log_error(&format!("Failed to render index page: {e}"));
            http::build_500_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_escapes_messages() {
        let pages = Pages::new().unwrap();
        let messages = vec![
            FlashMessage::error("<script>alert(1)</script>"),
            FlashMessage::success("Converted").with_download("abc_score.mxl"),
        ];
        let html = pages
            .render_index(&IndexView {
                server_name: "scorebridge",
                messages: &messages,
                mock_mode: true,
                transcribe_enabled: false,
            })
            .unwrap();
        assert!(html.contains("&lt;script&gt;"));
        assert!(!html.contains("<script>"));
        assert!(html.contains("href=\"/download/abc_score.mxl\""));
        assert!(html.contains("class=\"flash error\""));
        assert!(html.contains("demo mode"));
        assert!(!html.contains("youtube_url"));
    }
}
