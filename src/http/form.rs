//! Request body and form parsing
//!
//! Bodies are collected under a size limit, then decoded as
//! `multipart/form-data` (via `multer`) or
//! `application/x-www-form-urlencoded`.

use futures::stream;
use http_body_util::{BodyExt, LengthLimitError, Limited};
use hyper::body::{Body, Bytes};
use std::collections::HashMap;
use std::convert::Infallible;

#[derive(Debug, thiserror::Error)]
pub enum BodyError {
    #[error("request body exceeds {limit} bytes")]
    TooLarge { limit: usize },
    #[error("failed to read request body: {0}")]
    Read(String),
}

#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),
    #[error("malformed multipart body: {0}")]
    Multipart(#[from] multer::Error),
    #[error("malformed form body: {0}")]
    UrlEncoded(#[from] serde_urlencoded::de::Error),
}

/// A file part of a multipart form
#[derive(Debug, Clone)]
pub struct FilePart {
    /// Filename as sent by the client; `Some("")` when nothing was chosen
    pub filename: Option<String>,
    pub data: Bytes,
}

/// Decoded form fields. Only the first value of a repeated name is kept.
#[derive(Debug, Default, Clone)]
pub struct FormData {
    fields: HashMap<String, String>,
    files: HashMap<String, FilePart>,
}

impl FormData {
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }

    pub fn file(&self, name: &str) -> Option<&FilePart> {
        self.files.get(name)
    }
}

/// Collect a request body, failing once it grows past `limit` bytes
pub async fn read_body<B>(body: B, limit: usize) -> Result<Bytes, BodyError>
where
    B: Body<Data = Bytes>,
    B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
{
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(e) if e.downcast_ref::<LengthLimitError>().is_some() => {
            Err(BodyError::TooLarge { limit })
        }
        Err(e) => Err(BodyError::Read(e.to_string())),
    }
}

/// Decode a collected body according to its Content-Type
pub async fn parse_form(content_type: Option<&str>, body: Bytes) -> Result<FormData, FormError> {
    let content_type = content_type.unwrap_or_default();
    let essence = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();

    match essence.as_str() {
        "multipart/form-data" => parse_multipart(content_type, body).await,
        "application/x-www-form-urlencoded" => parse_urlencoded(&body),
        _ => Err(FormError::UnsupportedContentType(content_type.to_string())),
    }
}

async fn parse_multipart(content_type: &str, body: Bytes) -> Result<FormData, FormError> {
    let boundary = multer::parse_boundary(content_type)?;
    let source = stream::once(async move { Ok::<Bytes, Infallible>(body) });
    let mut multipart = multer::Multipart::new(source, boundary);

    let mut form = FormData::default();
    while let Some(field) = multipart.next_field().await? {
        let Some(name) = field.name().map(ToString::to_string) else {
            continue;
        };
        match field.file_name().map(ToString::to_string) {
            Some(filename) => {
                let data = field.bytes().await?;
                form.files.entry(name).or_insert(FilePart {
                    filename: Some(filename),
                    data,
                });
            }
            None => {
                let text = field.text().await?;
                form.fields.entry(name).or_insert(text);
            }
        }
    }
    Ok(form)
}

fn parse_urlencoded(body: &[u8]) -> Result<FormData, FormError> {
    let pairs: Vec<(String, String)> = serde_urlencoded::from_bytes(body)?;
    let mut form = FormData::default();
    for (name, value) in pairs {
        form.fields.entry(name).or_insert(value);
    }
    Ok(form)
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use http_body_util::Full;

    pub const BOUNDARY: &str = "----scorebridge-test-boundary";

    /// Build a multipart body with one file part and optional text fields
    pub fn multipart_body(
        file_field: &str,
        filename: &str,
        data: &[u8],
        fields: &[(&str, &str)],
    ) -> Vec<u8> {
        let mut body = Vec::new();
        for (name, value) in fields {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; \
                     name=\"{name}\"\r\n\r\n{value}\r\n"
                )
                .as_bytes(),
            );
        }
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; \
                 name=\"{file_field}\"; filename=\"{filename}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    pub fn multipart_content_type() -> String {
        format!("multipart/form-data; boundary={BOUNDARY}")
    }

    #[tokio::test]
    async fn test_multipart_file_and_field() {
        let body = multipart_body("file", "score.pdf", b"%PDF-1.4\n\x00\x01", &[("note", "hi")]);
        let form = parse_form(Some(&multipart_content_type()), Bytes::from(body))
            .await
            .unwrap();
        let file = form.file("file").unwrap();
        assert_eq!(file.filename.as_deref(), Some("score.pdf"));
        assert_eq!(&file.data[..], b"%PDF-1.4\n\x00\x01");
        assert_eq!(form.field("note"), Some("hi"));
    }

    #[tokio::test]
    async fn test_multipart_empty_filename() {
        let body = multipart_body("file", "", b"", &[]);
        let form = parse_form(Some(&multipart_content_type()), Bytes::from(body))
            .await
            .unwrap();
        let chosen = form
            .file("file")
            .and_then(|f| f.filename.as_deref())
            .or_else(|| form.field("file"));
        assert_eq!(chosen, Some(""));
    }

    #[tokio::test]
    async fn test_urlencoded() {
        let body = Bytes::from_static(b"youtube_url=https%3A%2F%2Fyoutu.be%2Fabc&x=1&x=2");
        let form = parse_form(Some("application/x-www-form-urlencoded; charset=UTF-8"), body)
            .await
            .unwrap();
        assert_eq!(form.field("youtube_url"), Some("https://youtu.be/abc"));
        assert_eq!(form.field("x"), Some("1"));
    }

    #[tokio::test]
    async fn test_unsupported_content_type() {
        let err = parse_form(Some("application/json"), Bytes::from_static(b"{}"))
            .await
            .unwrap_err();
        assert!(matches!(err, FormError::UnsupportedContentType(_)));
        assert!(parse_form(None, Bytes::new()).await.is_err());
    }

    #[tokio::test]
    async fn test_read_body_limit() {
        let ok = read_body(Full::new(Bytes::from_static(b"12345")), 5).await.unwrap();
        assert_eq!(&ok[..], b"12345");

        let err = read_body(Full::new(Bytes::from_static(b"123456")), 5).await.unwrap_err();
        assert!(matches!(err, BodyError::TooLarge { limit: 5 }));
    }
}
