//! Local knowledge-base loader.
//!
//! Walks a directory tree and reads every `.md`, `.txt` and `.rst` file as
//! one document. Nothing here ever fails: a missing directory is an empty
//! knowledge base, and unreadable or non-UTF-8 files are skipped.

use std::path::Path;
use walkdir::WalkDir;

use designpack_rag_core::models::LocalDocument;

/// File name suffixes treated as knowledge-base documents.
pub const KB_EXTENSIONS: [&str; 3] = [".md", ".txt", ".rst"];

/// Load all knowledge-base documents under `root`, sorted by path.
pub fn load_kb(root: &Path) -> Vec<LocalDocument> {
    if !root.exists() {
        tracing::debug!("knowledge base directory {} does not exist", root.display());
        return Vec::new();
    }

    let mut docs = Vec::new();

    for entry in WalkDir::new(root) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                tracing::debug!("skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() || !is_kb_file(entry.path()) {
            continue;
        }

        match std::fs::read_to_string(entry.path()) {
            Ok(text) => docs.push(LocalDocument {
                path: entry.path().to_path_buf(),
                text,
            }),
            Err(e) => tracing::debug!("skipping {}: {}", entry.path().display(), e),
        }
    }

    docs.sort_by(|a, b| a.path.cmp(&b.path));
    docs
}

fn is_kb_file(path: &Path) -> bool {
    path.file_name()
        .map(|n| n.to_string_lossy())
        .map(|name| KB_EXTENSIONS.iter().any(|ext| name.ends_with(ext)))
        .unwrap_or(false)
}
