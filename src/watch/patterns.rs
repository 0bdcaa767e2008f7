// src/watch/patterns.rs

use std::fmt;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};

use crate::errors::Result;

/// Drop leading `./` segments: `./scss/*.scss` and `scss/*.scss` name the
/// same files, and matched paths never carry the prefix.
pub fn strip_dot_prefix(pattern: &str) -> &str {
    let mut rest = pattern;
    while let Some(stripped) = rest.strip_prefix("./") {
        rest = stripped.trim_start_matches('/');
    }
    rest
}

/// Compile globs with shell-like semantics: `*` never crosses a `/`, only
/// `**` does. So `*.html` matches `index.html` but not `docs/index.html`.
pub fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = GlobBuilder::new(strip_dot_prefix(pat))
            .literal_separator(true)
            .build()?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}

/// A compiled glob that matches paths relative to the project root
/// (forward slashes, no leading `./`).
#[derive(Clone)]
pub struct WatchPattern {
    source: String,
    set: GlobSet,
}

impl fmt::Debug for WatchPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchPattern")
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

impl WatchPattern {
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            source: pattern.to_string(),
            set: build_globset(&[pattern.to_string()])?,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, rel_path: &str) -> bool {
        self.set.is_match(rel_path)
    }
}

/// Split a glob into its literal directory prefix and the remaining
/// pattern, e.g. `scss/**/*.scss` -> (`scss`, `**/*.scss`).
///
/// The prefix is where a file walk can start and what output paths are made
/// relative to.
pub fn glob_base(pattern: &str) -> (&str, &str) {
    let pattern = strip_dot_prefix(pattern);
    let mut base_end = 0;
    for (idx, segment) in segment_bounds(pattern) {
        if segment.contains(['*', '?', '[', '{']) {
            break;
        }
        // The last segment is a file name, not a directory.
        if idx + segment.len() == pattern.len() {
            break;
        }
        base_end = idx + segment.len() + 1;
    }
    let base = pattern[..base_end].trim_end_matches('/');
    (base, &pattern[base_end..])
}

/// A directory below the root that the watcher observes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchScope {
    /// Root-relative, empty for the root itself.
    pub dir: String,
    pub recursive: bool,
}

impl WatchScope {
    fn covers(&self, other: &WatchScope) -> bool {
        self.recursive
            && self.dir != other.dir
            && (self.dir.is_empty() || other.dir.starts_with(&format!("{}/", self.dir)))
    }
}

/// The smallest set of directories that sees every path `patterns` can
/// match. `*.html` only needs the root itself, so unrelated trees such as
/// `node_modules` are never watched unless a pattern reaches into them.
pub fn watch_scopes<'a>(patterns: impl IntoIterator<Item = &'a str>) -> Vec<WatchScope> {
    let mut scopes: Vec<WatchScope> = patterns
        .into_iter()
        .map(|pattern| {
            let (base, rest) = glob_base(pattern);
            WatchScope {
                dir: base.to_string(),
                recursive: rest.contains('/') || rest.contains("**"),
            }
        })
        .collect();

    // Recursive first, so dedup keeps the stronger of two same-dir scopes.
    scopes.sort_by(|a, b| a.dir.cmp(&b.dir).then(b.recursive.cmp(&a.recursive)));
    scopes.dedup_by(|later, kept| later.dir == kept.dir);

    let all = scopes.clone();
    scopes.retain(|scope| !all.iter().any(|outer| outer.covers(scope)));
    scopes
}

fn segment_bounds(pattern: &str) -> impl Iterator<Item = (usize, &str)> {
    let mut start = 0;
    pattern.split('/').map(move |seg| {
        let out = (start, seg);
        start += seg.len() + 1;
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_star_does_not_cross_directories() {
        let p = WatchPattern::new("*.html").unwrap();
        assert!(p.matches("index.html"));
        assert!(!p.matches("docs/index.html"));
    }

    #[test]
    fn double_star_matches_nested_files() {
        let p = WatchPattern::new("scss/**/*.scss").unwrap();
        assert!(p.matches("scss/style.scss"));
        assert!(p.matches("scss/parts/_nav.scss"));
        assert!(!p.matches("css/style.css"));
    }

    #[test]
    fn glob_base_splits_literal_prefix() {
        assert_eq!(glob_base("scss/**/*.scss"), ("scss", "**/*.scss"));
        assert_eq!(glob_base("img/**/*"), ("img", "**/*"));
        assert_eq!(glob_base("*.html"), ("", "*.html"));
        assert_eq!(glob_base("js/app.js"), ("js", "app.js"));
        assert_eq!(glob_base("a/b/c*.js"), ("a/b", "c*.js"));
        assert_eq!(glob_base("./scss/**/*.scss"), ("scss", "**/*.scss"));
        assert_eq!(glob_base("./*.html"), ("", "*.html"));
    }

    fn scope(dir: &str, recursive: bool) -> WatchScope {
        WatchScope {
            dir: dir.to_string(),
            recursive,
        }
    }

    #[test]
    fn default_bindings_watch_only_scss_and_the_top_level() {
        let scopes = watch_scopes(["scss/**/*.scss", "*.html"]);
        assert_eq!(scopes, vec![scope("", false), scope("scss", true)]);
    }

    #[test]
    fn recursive_scopes_absorb_nested_and_duplicate_ones() {
        let scopes = watch_scopes([
            "js/**/*.js",
            "js/vendor/*.js",
            "./js/app.js",
            "img/*.png",
            "img/**/*.svg",
        ]);
        assert_eq!(scopes, vec![scope("img", true), scope("js", true)]);

        let scopes = watch_scopes(["**/*.html", "scss/**/*.scss"]);
        assert_eq!(scopes, vec![scope("", true)]);
    }

    #[test]
    fn leading_dot_slash_is_ignored_when_matching() {
        let p = WatchPattern::new("./scss/**/*.scss").unwrap();
        assert_eq!(p.as_str(), "./scss/**/*.scss");
        assert!(p.matches("scss/style.scss"));
        assert!(!p.matches("./scss/style.scss"));
        assert_eq!(strip_dot_prefix(".//./js/*.js"), "js/*.js");
        assert_eq!(strip_dot_prefix(".hidden/*.js"), ".hidden/*.js");
    }
}
