//! Upload storage
//!
//! Uploaded scores are written as `<random id>_<sanitized name>` so two
//! uploads of `score.pdf` never collide and the stored name is always safe
//! to use on a command line or in a URL.

use std::path::{Path, PathBuf};
use tokio::fs;

use super::error::UploadError;
use crate::logger;

/// A score saved to the upload directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    path: PathBuf,
    original_name: String,
    stored_name: String,
}

impl StoredUpload {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    pub fn stored_name(&self) -> &str {
        &self.stored_name
    }

    /// Stored name without its extension; converters name their output after it
    pub fn stem(&self) -> &str {
        self.stored_name
            .rsplit_once('.')
            .map_or(self.stored_name.as_str(), |(stem, _)| stem)
    }
}

/// Reduce a client-supplied filename to ASCII letters, digits, `.`, `-`
/// and `_`. Path components are flattened, whitespace runs become a
/// single `_`, accented Latin letters lose their accents, and leading or
/// trailing dots and underscores are stripped. Returns `None` when nothing
/// usable remains.
pub fn secure_filename(name: &str) -> Option<String> {
    let flattened = name.replace(['/', '\\'], " ");
    let joined = flattened.split_whitespace().collect::<Vec<_>>().join("_");
    let mut kept = String::with_capacity(joined.len());
    for c in joined.chars() {
        if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
            kept.push(c);
        } else if let Some(folded) = fold_latin(c) {
            kept.push_str(folded);
        }
    }
    let trimmed = kept.trim_matches(|c| c == '.' || c == '_');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// ASCII spelling of a Latin-1 or Latin Extended-A letter
fn fold_latin(c: char) -> Option<&'static str> {
    let folded = match c {
        'À'..='Å' | 'Ā' | 'Ă' | 'Ą' => "A",
        'à'..='å' | 'ā' | 'ă' | 'ą' => "a",
        'Æ' => "AE",
        'æ' => "ae",
        'Ç' | 'Ć' | 'Ĉ' | 'Ċ' | 'Č' => "C",
        'ç' | 'ć' | 'ĉ' | 'ċ' | 'č' => "c",
        'Ð' | 'Ď' | 'Đ' => "D",
        'ð' | 'ď' | 'đ' => "d",
        'È'..='Ë' | 'Ē' | 'Ĕ' | 'Ė' | 'Ę' | 'Ě' => "E",
        'è'..='ë' | 'ē' | 'ĕ' | 'ė' | 'ę' | 'ě' => "e",
        'Ĝ' | 'Ğ' | 'Ġ' | 'Ģ' => "G",
        'ĝ' | 'ğ' | 'ġ' | 'ģ' => "g",
        'Ì'..='Ï' | 'Ĩ' | 'Ī' | 'Ĭ' | 'Į' | 'İ' => "I",
        'ì'..='ï' | 'ĩ' | 'ī' | 'ĭ' | 'į' | 'ı' => "i",
        'Ł' | 'Ĺ' | 'Ļ' | 'Ľ' => "L",
        'ł' | 'ĺ' | 'ļ' | 'ľ' => "l",
        'Ñ' | 'Ń' | 'Ņ' | 'Ň' => "N",
        'ñ' | 'ń' | 'ņ' | 'ň' => "n",
        'Ò'..='Ö' | 'Ø' | 'Ō' | 'Ŏ' | 'Ő' => "O",
        'ò'..='ö' | 'ø' | 'ō' | 'ŏ' | 'ő' => "o",
        'Œ' => "OE",
        'œ' => "oe",
        'Ŕ' | 'Ŗ' | 'Ř' => "R",
        'ŕ' | 'ŗ' | 'ř' => "r",
        'Ś' | 'Ŝ' | 'Ş' | 'Š' => "S",
        'ś' | 'ŝ' | 'ş' | 'š' => "s",
        'ß' => "ss",
        'Ţ' | 'Ť' => "T",
        'ţ' | 'ť' => "t",
        'Ù'..='Ü' | 'Ũ' | 'Ū' | 'Ŭ' | 'Ů' | 'Ű' | 'Ų' => "U",
        'ù'..='ü' | 'ũ' | 'ū' | 'ŭ' | 'ů' | 'ű' | 'ų' => "u",
        'Ý' | 'Ÿ' => "Y",
        'ý' | 'ÿ' => "y",
        'Ź' | 'Ż' | 'Ž' => "Z",
        'ź' | 'ż' | 'ž' => "z",
        _ => return None,
    };
    Some(folded)
}

/// Last extension of `name`, lowercased, if any
pub fn extension_of(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Case-insensitive check of the last extension against `allowed`
/// (entries may be written with or without the leading dot)
pub fn has_allowed_extension(name: &str, allowed: &[String]) -> bool {
    extension_of(name).is_some_and(|ext| {
        allowed
            .iter()
            .any(|a| a.trim_start_matches('.').eq_ignore_ascii_case(&ext))
    })
}

/// Writes uploads into one directory
#[derive(Debug, Clone)]
pub struct UploadStore {
    dir: PathBuf,
    allowed_extensions: Vec<String>,
}

impl UploadStore {
    pub fn new(dir: impl Into<PathBuf>, allowed_extensions: Vec<String>) -> Self {
        Self {
            dir: dir.into(),
            allowed_extensions,
        }
    }

    /// Validate and persist an uploaded file
    pub async fn save(
        &self,
        original_name: Option<&str>,
        data: &[u8],
    ) -> Result<StoredUpload, UploadError> {
        let original = original_name.ok_or(UploadError::MissingFile)?;
        if original.trim().is_empty() {
            return Err(UploadError::EmptyFilename);
        }
        if !has_allowed_extension(original, &self.allowed_extensions) {
            let ext = extension_of(original).unwrap_or_default();
            return Err(UploadError::DisallowedExtension(ext));
        }
        let safe = secure_filename(original)
            .filter(|s| has_allowed_extension(s, &self.allowed_extensions))
            .ok_or_else(|| UploadError::UnsafeFilename(original.to_string()))?;
        if data.is_empty() {
            return Err(UploadError::EmptyContent);
        }

        let stored_name = format!("{}_{safe}", uuid::Uuid::new_v4().simple());
        let path = self.dir.join(&stored_name);
        fs::create_dir_all(&self.dir).await?;
        fs::write(&path, data).await?;
        logger::log_debug(&format!(
            "Stored upload {original:?} as {} ({} bytes)",
            path.display(),
            data.len()
        ));

        Ok(StoredUpload {
            path,
            original_name: original.to_string(),
            stored_name,
        })
    }

    /// Delete a stored upload; failures are logged, not returned
    pub async fn remove(&self, upload: &StoredUpload) {
        match fs::remove_file(upload.path()).await {
            Ok(()) => logger::log_debug(&format!("Removed upload {}", upload.path().display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => logger::log_warning(&format!(
                "Failed to remove upload {}: {e}",
                upload.path().display()
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pdf_only() -> Vec<String> {
        vec!["pdf".to_string()]
    }

    #[test]
    fn test_secure_filename() {
        assert_eq!(secure_filename("My Score.pdf").as_deref(), Some("My_Score.pdf"));
        assert_eq!(
            secure_filename("../../etc/passwd").as_deref(),
            Some("etc_passwd")
        );
        assert_eq!(
            secure_filename(r"C:\Users\me\Bach  Prelude.pdf").as_deref(),
            Some("C_Users_me_Bach_Prelude.pdf")
        );
        assert_eq!(secure_filename("été.pdf").as_deref(), Some("ete.pdf"));
        assert_eq!(
            secure_filename("Müller Übung Nr. 5.pdf").as_deref(),
            Some("Muller_Ubung_Nr._5.pdf")
        );
        assert_eq!(
            secure_filename("Dvořák – Humoreske.pdf").as_deref(),
            Some("Dvorak__Humoreske.pdf")
        );
        assert_eq!(secure_filename("練習曲.pdf").as_deref(), Some("pdf"));
        assert_eq!(secure_filename("..."), None);
        assert_eq!(secure_filename("  "), None);
    }

    #[test]
    fn test_allowed_extension() {
        assert!(has_allowed_extension("score.PDF", &pdf_only()));
        assert!(has_allowed_extension("a.b.pdf", &[".pdf".to_string()]));
        assert!(!has_allowed_extension("score.pdf.txt", &pdf_only()));
        assert!(!has_allowed_extension("pdf", &pdf_only()));
        assert!(!has_allowed_extension(".pdf", &pdf_only()));
    }

    #[test]
    fn test_stem() {
        let upload = StoredUpload {
            path: PathBuf::from("/tmp/abc_score.v2.pdf"),
            original_name: "score.v2.pdf".into(),
            stored_name: "abc_score.v2.pdf".into(),
        };
        assert_eq!(upload.stem(), "abc_score.v2");
    }

    #[tokio::test]
    async fn test_save_writes_prefixed_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path().join("uploads"), pdf_only());
        let upload = store.save(Some("Sonata No 1.pdf"), b"%PDF-1.4").await.unwrap();

        let name = upload.stored_name();
        let (id, rest) = name.split_once('_').unwrap();
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(rest, "Sonata_No_1.pdf");
        assert_eq!(std::fs::read(upload.path()).unwrap(), b"%PDF-1.4");

        store.remove(&upload).await;
        assert!(!upload.path().exists());
    }

    #[tokio::test]
    async fn test_save_rejects_bad_input() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path(), pdf_only());

        assert!(matches!(
            store.save(None, b"x").await,
            Err(UploadError::MissingFile)
        ));
        assert!(matches!(
            store.save(Some(""), b"x").await,
            Err(UploadError::EmptyFilename)
        ));
        assert!(matches!(
            store.save(Some("notes.txt"), b"x").await,
            Err(UploadError::DisallowedExtension(ext)) if ext == "txt"
        ));
        assert!(matches!(
            store.save(Some("score.pdf"), b"").await,
            Err(UploadError::EmptyContent)
        ));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }
}
