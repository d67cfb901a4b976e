/// Default left delimiter of an include directive
pub const DEFAULT_LEFT_DELIM: &str = "//include(";

/// Default right delimiter of an include directive
pub const DEFAULT_RIGHT_DELIM: &str = ")";

/// Default ceiling on include nesting
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// The pair of markers wrapping an include reference
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delimiters {
    left: String,
    right: String,
}

impl Delimiters {
    /// Builds a delimiter pair. An empty side falls back to its default.
    pub fn new(left: impl Into<String>, right: impl Into<String>) -> Self {
        let left = left.into();
        let right = right.into();
        Self {
            left: if left.is_empty() {
                DEFAULT_LEFT_DELIM.to_string()
            } else {
                left
            },
            right: if right.is_empty() {
                DEFAULT_RIGHT_DELIM.to_string()
            } else {
                right
            },
        }
    }

    pub fn left(&self) -> &str {
        &self.left
    }

    pub fn right(&self) -> &str {
        &self.right
    }
}

impl Default for Delimiters {
    fn default() -> Self {
        Self::new(DEFAULT_LEFT_DELIM, DEFAULT_RIGHT_DELIM)
    }
}

/// Configuration for a bundle operation
#[derive(Debug, Clone)]
pub struct BundleConfig {
    /// Markers wrapping include references
    pub delimiters: Delimiters,
    /// Whether delimiter markers are copied to the output
    pub keep_delims: bool,
    /// Maximum include nesting; `None` disables the ceiling
    pub max_depth: Option<usize>,
    /// Compose the files of a directory concurrently
    pub parallel: bool,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            delimiters: Delimiters::default(),
            keep_delims: false,
            max_depth: Some(DEFAULT_MAX_DEPTH),
            parallel: false,
        }
    }
}

impl BundleConfig {
    /// Configuration with custom delimiters and everything else defaulted
    pub fn with_delimiters(left: impl Into<String>, right: impl Into<String>) -> Self {
        Self {
            delimiters: Delimiters::new(left, right),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = BundleConfig::default();
        assert_eq!(config.delimiters.left(), "//include(");
        assert_eq!(config.delimiters.right(), ")");
        assert!(!config.keep_delims);
        assert_eq!(config.max_depth, Some(DEFAULT_MAX_DEPTH));
        assert!(!config.parallel);
    }

    #[test]
    fn test_empty_delimiters_fall_back() {
        let delims = Delimiters::new("", "]]");
        assert_eq!(delims.left(), DEFAULT_LEFT_DELIM);
        assert_eq!(delims.right(), "]]");

        let delims = Delimiters::new("[[", "");
        assert_eq!(delims.left(), "[[");
        assert_eq!(delims.right(), DEFAULT_RIGHT_DELIM);
    }

    #[test]
    fn test_with_delimiters() {
        let config = BundleConfig::with_delimiters("include(", ")");
        assert_eq!(config.delimiters.left(), "include(");
        assert_eq!(config.max_depth, Some(DEFAULT_MAX_DEPTH));
    }
}
