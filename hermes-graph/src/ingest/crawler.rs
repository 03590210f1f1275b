//! Workspace crawler
//!
//! Recursive walk that skips well-known build/VCS/dependency directories by
//! leaf name and keeps only supported extensions. The result is sorted so
//! downstream ingestion is reproducible.

use std::path::{Path, PathBuf};

use crate::error::Result;

/// Directory leaf names that are never crawled.
const IGNORED_DIRS: &[&str] = &[
    "target",
    "node_modules",
    ".git",
    ".venv",
    ".mypy_cache",
    ".pytest_cache",
    ".ruff_cache",
    "dist",
    ".next",
    ".vite",
    "build",
    ".gradle",
    ".idea",
    "out",
];

/// File extensions the chunker knows how to handle.
const SUPPORTED_EXTENSIONS: &[&str] = &[
    "rs", "tsx", "ts", "jsx", "js", "md", "toml", "json", "css", "kt", "kts", "java", "py",
    "go", "yaml", "yml",
];

/// Walk `root` and return every supported file, sorted lexicographically.
pub fn crawl(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    crawl_into(root, &mut files)?;
    files.sort();
    Ok(files)
}

fn crawl_into(dir: &Path, files: &mut Vec<PathBuf>) -> Result<()> {
    if !dir.is_dir() {
        return Ok(());
    }

    let leaf = dir
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    if IGNORED_DIRS.contains(&leaf.as_str()) {
        return Ok(());
    }

    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            crawl_into(&path, files)?;
        } else if is_supported(&path) {
            files.push(path);
        }
    }
    Ok(())
}

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SUPPORTED_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}
