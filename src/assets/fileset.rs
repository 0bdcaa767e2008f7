// src/assets/fileset.rs

//! Glob-driven file sets, resolved fresh on every task run.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::debug;

use crate::errors::Result;
use crate::fs::FileSystem;
use crate::watch::patterns::{build_globset, glob_base};

/// A matched source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path relative to the project root, forward slashes.
    pub path: String,
    /// Literal directory prefix of the glob that matched it (may be empty).
    pub base: String,
}

impl SourceFile {
    /// Path relative to the glob base: `scss/pages/a.scss` matched by
    /// `scss/**/*.scss` gives `pages/a.scss`.
    pub fn relative_to_base(&self) -> &str {
        if self.base.is_empty() {
            return &self.path;
        }
        self.path
            .strip_prefix(&self.base)
            .map(|s| s.trim_start_matches('/'))
            .unwrap_or(&self.path)
    }

    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }

    pub fn extension(&self) -> Option<String> {
        let name = self.file_name();
        let (stem, ext) = name.rsplit_once('.')?;
        if stem.is_empty() {
            return None;
        }
        Some(ext.to_lowercase())
    }
}

/// Ordered, de-duplicated files matching a list of globs.
#[derive(Debug, Clone, Default)]
pub struct FileSet {
    files: Vec<SourceFile>,
}

impl FileSet {
    /// Walk the filesystem below `root` and collect every file matching any
    /// of `patterns`, sorted by path.
    ///
    /// The walk starts at each pattern's literal base directory; a base
    /// directory that does not exist contributes no files.
    pub fn resolve(fs: &dyn FileSystem, root: &Path, patterns: &[String]) -> Result<FileSet> {
        let mut found: BTreeMap<String, SourceFile> = BTreeMap::new();

        for pattern in patterns {
            let (base, rest) = glob_base(pattern);
            let set = build_globset(std::slice::from_ref(pattern))?;
            let max_depth = if rest.contains("**") {
                usize::MAX
            } else {
                rest.split('/').count()
            };

            let start = if base.is_empty() {
                root.to_path_buf()
            } else {
                root.join(base)
            };
            if !fs.is_dir(&start) {
                debug!(%pattern, dir = ?start, "glob base directory missing; nothing to match");
                continue;
            }

            let mut stack = vec![(start, 1usize)];
            while let Some((dir, depth)) = stack.pop() {
                for path in fs.read_dir(&dir)? {
                    if fs.is_dir(&path) {
                        if depth < max_depth {
                            stack.push((path, depth + 1));
                        }
                        continue;
                    }
                    let Ok(rel) = path.strip_prefix(root) else {
                        continue;
                    };
                    let rel = rel.to_string_lossy().replace('\\', "/");
                    if set.is_match(&rel) && !found.contains_key(&rel) {
                        found.insert(
                            rel.clone(),
                            SourceFile {
                                path: rel,
                                base: base.to_string(),
                            },
                        );
                    }
                }
            }
        }

        let files: Vec<SourceFile> = found.into_values().collect();
        debug!(?patterns, count = files.len(), "resolved file set");
        Ok(FileSet { files })
    }

    pub fn files(&self) -> &[SourceFile] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}
