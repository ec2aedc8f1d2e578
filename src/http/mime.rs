//! MIME type detection module
//!
//! Returns the Content-Type for the files this server hands out.

/// Get MIME Content-Type based on file extension
///
/// # Examples
/// ```
/// use scorebridge::http::mime::get_content_type;
/// assert_eq!(get_content_type(Some("mxl")), "application/vnd.recordare.musicxml");
/// assert_eq!(get_content_type(Some("MID")), "audio/midi");
/// assert_eq!(get_content_type(None), "application/octet-stream");
/// ```
pub fn get_content_type(extension: Option<&str>) -> &'static str {
    let ext = extension.map(str::to_ascii_lowercase);
    match ext.as_deref() {
        // Scores
        Some("musicxml") => "application/vnd.recordare.musicxml+xml",
        Some("mxl") => "application/vnd.recordare.musicxml",
        Some("xml") => "application/xml",
        Some("pdf") => "application/pdf",

        // Audio
        Some("mid" | "midi") => "audio/midi",
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("m4a") => "audio/mp4",

        // Page assets
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("txt") => "text/plain; charset=utf-8",
        Some("json") => "application/json",
        Some("svg") => "image/svg+xml",

        _ => "application/octet-stream",
    }
}
