//! Finding the documents to lint.

use crate::error::{ErrorKind, Result};
use std::path::{Path, PathBuf};

const EXTENSIONS: [&str; 2] = ["html", "htm"];

fn is_html(path: &Path) -> bool {
    let extension = path.extension().and_then(|ext| ext.to_str());
    extension.is_some_and(|ext| EXTENSIONS.iter().any(|html| html.eq_ignore_ascii_case(ext)))
}

/// Every HTML file under `paths`, sorted and deduplicated.
///
/// Files named explicitly are kept whatever their extension; hidden
/// directories are not descended into.
pub fn collect(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_file() {
            files.push(path.clone());
        } else if path.is_dir() {
            walk(path, &mut files);
        } else {
            exn::bail!(ErrorKind::MissingPath(path.clone()));
        }
    }
    files.sort();
    files.dedup();
    Ok(files)
}

fn walk(directory: &Path, files: &mut Vec<PathBuf>) {
    let entries = match std::fs::read_dir(directory) {
        Ok(entries) => entries,
        Err(error) => {
            tracing::warn!(directory = %directory.display(), %error, "Could not read directory");
            return;
        },
    };
    for entry in entries.flatten() {
        let path = entry.path();
        let hidden = entry.file_name().to_str().is_some_and(|name| name.starts_with('.'));
        match entry.file_type() {
            Ok(kind) if kind.is_dir() && !hidden => walk(&path, files),
            Ok(kind) if kind.is_file() && is_html(&path) => files.push(path),
            _ => {},
        }
    }
}
