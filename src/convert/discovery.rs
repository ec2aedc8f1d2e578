//! Output discovery
//!
//! External tools pick their own output names (Audiveris writes
//! `<stem>.mxl`, basic-pitch writes `<stem>_basic_pitch.mid`), so results
//! are located by filename prefix and a list of candidate extensions.

use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Ensure an extension is written with its leading dot
pub fn normalize_extension(ext: &str) -> String {
    if ext.starts_with('.') {
        ext.to_ascii_lowercase()
    } else {
        format!(".{}", ext.to_ascii_lowercase())
    }
}

/// Find the file in `dir` whose name starts with `prefix` and ends with one
/// of `extensions`. Extensions are tried in order, so an earlier one wins
/// even if a later one also matches; within one extension the
/// lexicographically first name is returned. Subdirectories are ignored.
pub async fn find_output(
    dir: &Path,
    prefix: &str,
    extensions: &[String],
) -> io::Result<Option<PathBuf>> {
    let mut candidates = Vec::new();
    let mut entries = fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        if name.starts_with(prefix) {
            candidates.push(name);
        }
    }
    candidates.sort();

    Ok(extensions
        .iter()
        .map(|ext| normalize_extension(ext))
        .find_map(|ext| {
            candidates
                .iter()
                .find(|name| name.to_ascii_lowercase().ends_with(&ext))
        })
        .map(|name| dir.join(name)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exts(list: &[&str]) -> Vec<String> {
        list.iter().map(|e| (*e).to_string()).collect()
    }

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), b"").unwrap();
    }

    #[test]
    fn test_normalize_extension() {
        assert_eq!(normalize_extension("mxl"), ".mxl");
        assert_eq!(normalize_extension(".XML"), ".xml");
    }

    #[tokio::test]
    async fn test_priority_follows_extension_order() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "abc_score.xml");
        touch(dir.path(), "abc_score.mxl");
        touch(dir.path(), "other.mxl");

        let found = find_output(dir.path(), "abc_score", &exts(&[".mxl", ".musicxml", ".xml"]))
            .await
            .unwrap();
        assert_eq!(found, Some(dir.path().join("abc_score.mxl")));

        let found = find_output(dir.path(), "abc_score", &exts(&["xml", "mxl"]))
            .await
            .unwrap();
        assert_eq!(found, Some(dir.path().join("abc_score.xml")));
    }

    #[tokio::test]
    async fn test_prefix_and_case() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "job1_basic_pitch.MID");
        touch(dir.path(), "job10_basic_pitch.mid");
        std::fs::create_dir(dir.path().join("job1_dir.mid")).unwrap();

        let found = find_output(dir.path(), "job1_", &exts(&[".mid", ".midi"]))
            .await
            .unwrap();
        assert_eq!(found, Some(dir.path().join("job1_basic_pitch.MID")));
    }

    #[tokio::test]
    async fn test_nothing_found() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "abc_score.pdf");
        let found = find_output(dir.path(), "abc_score", &exts(&[".mxl"]))
            .await
            .unwrap();
        assert_eq!(found, None);
    }
}
