use std::fs;
use std::path::{Path, PathBuf};

use tracing::warn;

/// Extensions picked up when scanning the documents directory.
pub const DOCUMENT_EXTENSIONS: [&str; 4] = ["pdf", "txt", "md", "docx"];

/// Read a UTF-8 template. Missing or unreadable files degrade to an empty string.
pub fn read_template(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "failed to read template");
            String::new()
        }
    }
}

fn has_document_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| DOCUMENT_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// List the document files directly inside `dir`, sorted by path.
///
/// A missing directory yields an empty list; the run proceeds and the vendor decides.
pub fn discover_documents(dir: &Path) -> Vec<PathBuf> {
    let entries = match fs::read_dir(dir) {
        Ok(e) => e,
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "failed to read documents directory");
            return Vec::new();
        }
    };

    let mut out: Vec<PathBuf> = entries
        .flatten()
        .map(|ent| ent.path())
        .filter(|p| p.is_file() && has_document_extension(p))
        .collect();
    out.sort();

    if out.is_empty() {
        warn!(path = %dir.display(), "no document files found in documents directory");
    }
    out
}
