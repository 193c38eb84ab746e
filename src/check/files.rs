//! Sample file existence and case checks.
//!
//! Paths are resolved one component at a time against real directory
//! listings, so a reference that only works on a case-insensitive filesystem
//! is reported even when the lint runs on one.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileStatus {
    Found,
    /// Generated source such as `*sine`; nothing to look up.
    Virtual,
    Missing,
    /// Exists, but only under this differently-cased relative path.
    CaseMismatch(String),
}

/// Directory listings are cached for the lifetime of the checker.
#[derive(Debug, Default)]
pub struct FileChecker {
    listings: HashMap<PathBuf, Option<Vec<String>>>,
}

impl FileChecker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn check(&mut self, base: &Path, value: &str) -> FileStatus {
        if value.starts_with('*') {
            return FileStatus::Virtual;
        }
        let normalized = normalize(value);
        let mut dir = if normalized.starts_with('/') {
            PathBuf::from("/")
        } else {
            base.to_path_buf()
        };

        let mut actual: Vec<String> = Vec::new();
        let mut mismatch = false;
        for part in normalized.split('/').filter(|p| !p.is_empty() && *p != ".") {
            if part == ".." {
                dir.push(part);
                actual.push(part.to_string());
                continue;
            }
            let Some(entries) = self.list(&dir) else {
                return FileStatus::Missing;
            };
            let found = match entries.iter().find(|e| e.as_str() == part) {
                Some(exact) => exact.clone(),
                None => match entries.iter().find(|e| e.to_lowercase() == part.to_lowercase()) {
                    Some(other) => {
                        mismatch = true;
                        other.clone()
                    }
                    None => return FileStatus::Missing,
                },
            };
            dir.push(&found);
            actual.push(found);
        }

        if actual.is_empty() {
            FileStatus::Missing
        } else if mismatch {
            FileStatus::CaseMismatch(actual.join("/"))
        } else {
            FileStatus::Found
        }
    }

    fn list(&mut self, dir: &Path) -> Option<&Vec<String>> {
        self.listings
            .entry(dir.to_path_buf())
            .or_insert_with(|| {
                let entries = fs::read_dir(dir).ok()?;
                Some(
                    entries
                        .filter_map(|e| e.ok())
                        .map(|e| e.file_name().to_string_lossy().into_owned())
                        .collect(),
                )
            })
            .as_ref()
    }
}

/// Accept either separator in sfz paths.
pub fn normalize(value: &str) -> String {
    value.replace('\\', "/")
}

/// Prefix a path value with the control header's `default_path`.
pub fn with_default_path(default_path: Option<&str>, value: &str) -> String {
    match default_path.map(normalize) {
        Some(prefix) if !prefix.is_empty() => {
            if prefix.ends_with('/') {
                format!("{}{}", prefix, normalize(value))
            } else {
                format!("{}/{}", prefix, normalize(value))
            }
        }
        _ => normalize(value),
    }
}
