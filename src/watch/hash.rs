// src/watch/hash.rs

//! Content hashes used to skip modify events that did not change a file.

use std::collections::HashMap;

use blake3::Hasher;
use tracing::debug;

/// Hash bytes to a hex digest.
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(bytes);
    hasher.finalize().to_hex().to_string()
}

/// Last seen content hash per project-relative path, in memory only.
#[derive(Debug, Default)]
pub struct ContentHashes {
    seen: HashMap<String, String>,
}

impl ContentHashes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current contents of `rel` and report whether they differ
    /// from what was seen before. `None` means the file is gone, which
    /// always counts as a change.
    pub fn observe(&mut self, rel: &str, contents: Option<&[u8]>) -> bool {
        let Some(bytes) = contents else {
            self.seen.remove(rel);
            return true;
        };
        let hash = content_hash(bytes);
        match self.seen.insert(rel.to_string(), hash.clone()) {
            Some(prev) if prev == hash => {
                debug!(path = %rel, "content unchanged");
                false
            }
            _ => true,
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_contents_are_not_a_change() {
        let mut hashes = ContentHashes::new();
        assert!(hashes.observe("scss/a.scss", Some(b"a{}")));
        assert!(!hashes.observe("scss/a.scss", Some(b"a{}")));
        assert!(hashes.observe("scss/a.scss", Some(b"a{b:c}")));
        assert!(hashes.observe("scss/a.scss", None));
        assert!(hashes.is_empty());
    }
}
