// src/fs/mock.rs

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Result};

use super::FileSystem;

/// In-memory filesystem for tests.
///
/// Only files are stored; directories exist implicitly whenever a file lives
/// below them. `./a/b` and `a/b` name the same entry.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<BTreeMap<PathBuf, Vec<u8>>>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let key = normalize(path.as_ref());
        self.files.lock().unwrap().insert(key, content.into());
    }

    /// Contents of a file as UTF-8, if it exists.
    pub fn contents(&self, path: impl AsRef<Path>) -> Option<String> {
        let key = normalize(path.as_ref());
        self.files
            .lock()
            .unwrap()
            .get(&key)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    /// All stored file paths, sorted.
    pub fn paths(&self) -> Vec<PathBuf> {
        self.files.lock().unwrap().keys().cloned().collect()
    }
}

/// Drop `.` components so lookups are independent of how the root was joined.
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let key = normalize(path);
        self.files
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| anyhow!("File not found: {:?}", path))
    }

    fn write(&self, path: &Path, contents: &[u8]) -> Result<()> {
        if self.is_dir(path) {
            return Err(anyhow!("Is a directory: {:?}", path));
        }
        self.add_file(path, contents);
        Ok(())
    }

    fn exists(&self, path: &Path) -> bool {
        self.is_file(path) || self.is_dir(path)
    }

    fn is_file(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(&normalize(path))
    }

    fn is_dir(&self, path: &Path) -> bool {
        let key = normalize(path);
        let files = self.files.lock().unwrap();
        files
            .keys()
            .any(|p| p != &key && p.starts_with(&key))
    }

    fn canonicalize(&self, path: &Path) -> Result<PathBuf> {
        Ok(path.to_path_buf())
    }

    fn read_dir(&self, path: &Path) -> Result<Vec<PathBuf>> {
        let key = normalize(path);
        let files = self.files.lock().unwrap();

        let children: BTreeSet<PathBuf> = files
            .keys()
            .filter_map(|p| p.strip_prefix(&key).ok())
            .filter_map(|rel| rel.components().next())
            .map(|first| PathBuf::from(first.as_os_str()))
            .collect();

        if children.is_empty() {
            return Err(anyhow!("Not a directory or not found: {:?}", path));
        }

        Ok(children.into_iter().map(|name| path.join(name)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directories_are_implicit() {
        let fs = MockFileSystem::new();
        fs.add_file("./js/app.js", "app");
        fs.add_file("js/lib/util.js", "util");

        assert!(fs.is_dir(Path::new("js")));
        assert!(fs.is_dir(Path::new("./js/lib")));
        assert!(fs.is_file(Path::new("./js/app.js")));

        let entries = fs.read_dir(Path::new("./js")).unwrap();
        assert_eq!(
            entries,
            vec![PathBuf::from("./js/app.js"), PathBuf::from("./js/lib")]
        );
    }
}
