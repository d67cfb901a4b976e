use crate::error::Result;
use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::gitignore::{Gitignore, GitignoreBuilder};
use regex::Regex;
use std::path::{Path, PathBuf};

/// Decides whether a directory entry is skipped during a walk.
///
/// Evaluated against the entry's logical path, i.e. the path as reached through
/// the walked tree including symlink hops. Shared across worker threads.
pub trait IgnorePredicate: Sync {
    fn is_ignored(&self, logical_path: &Path, is_dir: bool) -> bool;
}

impl<F> IgnorePredicate for F
where
    F: Fn(&Path, bool) -> bool + Sync,
{
    fn is_ignored(&self, logical_path: &Path, is_dir: bool) -> bool {
        self(logical_path, is_dir)
    }
}

/// Predicate that ignores nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoIgnore;

impl IgnorePredicate for NoIgnore {
    fn is_ignored(&self, _: &Path, _: bool) -> bool {
        false
    }
}

/// Ignore rules for a directory walk rooted at `root`.
///
/// An entry is ignored when any configured source matches it:
/// - a regular expression tested against the whole logical path,
/// - glob patterns tested against the logical path relative to `root`,
/// - a gitignore-style file whose patterns are anchored at `root`.
#[derive(Debug, Clone)]
pub struct IgnoreRules {
    root: PathBuf,
    pattern: Option<Regex>,
    globs: Option<GlobSet>,
    gitignore: Option<Gitignore>,
}

impl IgnoreRules {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            pattern: None,
            globs: None,
            gitignore: None,
        }
    }

    /// Adds a regular expression matched against the full logical path
    ///
    /// # Errors
    ///
    /// Returns `BundlerError::Regex` if the pattern does not compile.
    pub fn with_pattern(mut self, pattern: &str) -> Result<Self> {
        self.pattern = Some(Regex::new(pattern)?);
        Ok(self)
    }

    /// Adds glob patterns matched against paths relative to the root
    ///
    /// # Errors
    ///
    /// Returns `BundlerError::Glob` if a pattern is invalid.
    pub fn with_globs<I, S>(mut self, globs: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut builder = GlobSetBuilder::new();
        let mut any = false;
        for glob in globs {
            builder.add(Glob::new(glob.as_ref())?);
            any = true;
        }
        if any {
            self.globs = Some(builder.build()?);
        }
        Ok(self)
    }

    /// Adds the patterns of a gitignore-style file
    ///
    /// # Errors
    ///
    /// Returns `BundlerError::Ignore` if the file cannot be read or parsed.
    pub fn with_ignore_file(mut self, path: &Path) -> Result<Self> {
        let mut builder = GitignoreBuilder::new(&self.root);
        if let Some(err) = builder.add(path) {
            return Err(err.into());
        }
        self.gitignore = Some(builder.build()?);
        Ok(self)
    }

    /// Whether any ignore source is configured
    pub fn is_empty(&self) -> bool {
        self.pattern.is_none() && self.globs.is_none() && self.gitignore.is_none()
    }
}

impl IgnorePredicate for IgnoreRules {
    fn is_ignored(&self, logical_path: &Path, is_dir: bool) -> bool {
        if let Some(pattern) = &self.pattern
            && pattern.is_match(&logical_path.to_string_lossy())
        {
            return true;
        }

        if let Some(globs) = &self.globs {
            let relative = logical_path
                .strip_prefix(&self.root)
                .unwrap_or(logical_path);
            if globs.is_match(relative) {
                return true;
            }
        }

        self.gitignore
            .as_ref()
            .is_some_and(|gi| gi.matched(logical_path, is_dir).is_ignore())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_no_rules_ignore_nothing() {
        let rules = IgnoreRules::new("site");
        assert!(rules.is_empty());
        assert!(!rules.is_ignored(Path::new("site/a.js"), false));
        assert!(!NoIgnore.is_ignored(Path::new("site/a.js"), false));
    }

    #[test]
    fn test_regex_pattern() {
        let rules = IgnoreRules::new("site").with_pattern(r"\.gitignore$").unwrap();
        assert!(rules.is_ignored(Path::new("site/.gitignore"), false));
        assert!(!rules.is_ignored(Path::new("site/app.js"), false));

        let rules = IgnoreRules::new("site").with_pattern("/vendor").unwrap();
        assert!(rules.is_ignored(Path::new("site/vendor"), true));
        assert!(rules.is_ignored(Path::new("site/lib/vendor/x.js"), false));
    }

    #[test]
    fn test_invalid_regex() {
        let result = IgnoreRules::new("site").with_pattern("(unclosed");
        assert!(matches!(result, Err(crate::BundlerError::Regex(_))));
    }

    #[test]
    fn test_globs_relative_to_root() {
        let rules = IgnoreRules::new("/srv/site")
            .with_globs(["vendor", "**/*.min.js"])
            .unwrap();
        assert!(rules.is_ignored(Path::new("/srv/site/vendor"), true));
        assert!(rules.is_ignored(Path::new("/srv/site/js/app.min.js"), false));
        assert!(!rules.is_ignored(Path::new("/srv/site/js/app.js"), false));
        assert!(!rules.is_ignored(Path::new("/srv/site/lib/vendor"), true));
    }

    #[test]
    fn test_empty_glob_list() {
        let rules = IgnoreRules::new("site")
            .with_globs(Vec::<String>::new())
            .unwrap();
        assert!(rules.is_empty());
    }

    #[test]
    fn test_ignore_file() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path();
        let ignore_file = root.join(".bundleignore");
        fs::write(&ignore_file, "# comment\nbuild/\n*.bak\n").unwrap();

        let rules = IgnoreRules::new(root).with_ignore_file(&ignore_file).unwrap();
        assert!(rules.is_ignored(&root.join("build"), true));
        assert!(!rules.is_ignored(&root.join("build"), false));
        assert!(rules.is_ignored(&root.join("src/old.bak"), false));
        assert!(!rules.is_ignored(&root.join("src/new.txt"), false));
    }

    #[test]
    fn test_missing_ignore_file() {
        let temp_dir = TempDir::new().unwrap();
        let result = IgnoreRules::new(temp_dir.path()).with_ignore_file(&temp_dir.path().join("nope"));
        assert!(matches!(result, Err(crate::BundlerError::Ignore(_))));
    }

    #[test]
    fn test_closure_predicate() {
        let predicate = |path: &Path, is_dir: bool| is_dir && path.ends_with("skip");
        assert!(predicate.is_ignored(Path::new("a/skip"), true));
        assert!(!predicate.is_ignored(Path::new("a/skip"), false));
    }
}
