//! Finding source files to index.

use crate::error::{IngestError, IngestResult};
use glob::Pattern;
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

/// List files under `dir` whose name matches any of `patterns`, sorted by path.
pub fn discover_files(dir: &Path, patterns: &[String], recursive: bool) -> IngestResult<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(IngestError::FileNotFound(dir.to_path_buf()));
    }

    let patterns: Vec<Pattern> = patterns
        .iter()
        .filter_map(|p| match Pattern::new(p) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                warn!("Ignoring invalid file pattern '{}': {}", p, e);
                None
            }
        })
        .collect();

    if patterns.is_empty() {
        return Err(IngestError::InvalidConfig(
            "no valid file patterns configured".to_string(),
        ));
    }

    let max_depth = if recursive { usize::MAX } else { 1 };

    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .max_depth(max_depth)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(e) => Some(e),
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|e| e.file_type().is_file())
        .filter(|e| {
            let name = e.file_name().to_string_lossy();
            patterns.iter().any(|p| p.matches(&name))
        })
        .map(|e| e.into_path())
        .collect();

    files.sort();
    Ok(files)
}
