//! # Snapshots
//!
//! A [`SourceSet`] is one version of a program: file paths relative to the
//! snapshot root mapped to their text. Paths are kept sorted so every
//! consumer sees files in the same order.

use crate::errors::ServiceError;
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::collections::BTreeMap;
use std::path::Path;
use walkdir::WalkDir;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceSet {
    files: BTreeMap<String, String>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<String>, text: impl Into<String>) {
        self.files.insert(path.into(), text.into());
    }

    pub fn with_file(mut self, path: impl Into<String>, text: impl Into<String>) -> Self {
        self.insert(path, text);
        self
    }

    pub fn get(&self, path: &str) -> Option<&str> {
        self.files.get(path).map(String::as_str)
    }

    /// Files in path order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.files.iter().map(|(p, t)| (p.as_str(), t.as_str()))
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Load every file under `root` matching one of `include`.
    ///
    /// Files larger than `max_file_size` bytes and files that are not valid
    /// UTF-8 are skipped with a warning.
    pub fn from_directory(
        root: &Path,
        include: &[String],
        max_file_size: u64,
    ) -> Result<Self, ServiceError> {
        if !root.is_dir() {
            return Err(ServiceError::FileNotFound(root.to_path_buf()));
        }
        let globset = build_globset(include)?;
        let mut set = Self::new();

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry?;
            let path = entry.path();
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };
            if !globset.is_match(relative) {
                continue;
            }
            let metadata = entry.metadata()?;
            if metadata.len() > max_file_size {
                tracing::warn!(
                    file_path = ?path,
                    file_size_mb = metadata.len() / (1024 * 1024),
                    "Skipping large file"
                );
                continue;
            }
            match std::fs::read_to_string(path) {
                Ok(text) => {
                    let key = relative
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy())
                        .collect::<Vec<_>>()
                        .join("/");
                    set.insert(key, text);
                }
                Err(e) => tracing::warn!("Skipping unreadable file {}: {}", path.display(), e),
            }
        }

        tracing::debug!("Loaded {} files from {}", set.len(), root.display());
        Ok(set)
    }
}

impl FromIterator<(String, String)> for SourceSet {
    fn from_iter<I: IntoIterator<Item = (String, String)>>(iter: I) -> Self {
        Self {
            files: iter.into_iter().collect(),
        }
    }
}

fn build_globset(patterns: &[String]) -> Result<GlobSet, ServiceError> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_from_directory_filters_and_sorts() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        fs::create_dir_all(root.join("pkg")).unwrap();
        fs::write(root.join("pkg/b.py"), "x = 1\n").unwrap();
        fs::write(root.join("a.py"), "y = 2\n").unwrap();
        fs::write(root.join("notes.txt"), "ignored").unwrap();

        let set = SourceSet::from_directory(root, &["**/*.py".to_string()], 1024).unwrap();
        let paths: Vec<&str> = set.iter().map(|(p, _)| p).collect();
        assert_eq!(paths, vec!["a.py", "pkg/b.py"]);
        assert_eq!(set.get("a.py"), Some("y = 2\n"));
    }

    #[test]
    fn test_large_files_are_skipped() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("big.py"), "x = 1\n".repeat(100)).unwrap();

        let set =
            SourceSet::from_directory(temp_dir.path(), &["*.py".to_string()], 10).unwrap();
        assert!(set.is_empty());
    }

    #[test]
    fn test_missing_root_is_an_error() {
        let result = SourceSet::from_directory(Path::new("/no/such/dir"), &[], 10);
        assert!(matches!(result, Err(ServiceError::FileNotFound(_))));
    }
}
