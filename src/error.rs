use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Main error type for bundler operations
#[derive(Error, Debug)]
pub enum BundlerError {
    /// IO error when reading, writing or renaming files
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// IO error tied to a specific path
    #[error("IO error on {path}: {source}")]
    PathIo {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Path expected to be a directory is not one (after symlink resolution)
    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },

    /// Broken, looping or otherwise unresolvable symbolic link
    #[error("Failed to resolve symlink {path}: {reason}")]
    SymlinkResolution { path: PathBuf, reason: String },

    /// Include directive not closed before a line break or end of input
    #[error("Unclosed include directive in {origin} at byte {position}")]
    UnclosedInclude { origin: PathBuf, position: usize },

    /// Included file does not exist or cannot be opened
    #[error("Cannot open included file {path}{}: {source}", format_chain(.chain))]
    MissingIncludedFile {
        path: PathBuf,
        chain: Vec<PathBuf>,
        #[source]
        source: io::Error,
    },

    /// An include chain revisits a file that is still being expanded
    #[error("Cyclic inclusion: {}", display_chain(.chain))]
    CyclicInclusion { chain: Vec<PathBuf> },

    /// Include nesting went past the configured ceiling
    #[error("Include depth limit of {limit} exceeded at {path}{}", format_chain(.chain))]
    IncludeDepthExceeded {
        path: PathBuf,
        limit: usize,
        chain: Vec<PathBuf>,
    },

    /// Include reference text that cannot name a file
    #[error("Invalid include reference in {origin} at byte {position}: {reference:?}")]
    InvalidReference {
        origin: PathBuf,
        position: usize,
        reference: String,
    },

    /// Regex compilation error
    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    /// Glob pattern compilation error
    #[error("Glob error: {0}")]
    Glob(#[from] globset::Error),

    /// Ignore file parsing error
    #[error("Ignore file error: {0}")]
    Ignore(#[from] ignore::Error),

    /// `WalkDir` error when traversing directories
    #[error("Directory traversal error: {0}")]
    WalkDir(#[from] walkdir::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BundlerError {
    pub(crate) fn path_io(path: &Path, source: io::Error) -> Self {
        Self::PathIo {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, BundlerError>;

fn display_chain(chain: &[PathBuf]) -> String {
    chain
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

fn format_chain(chain: &[PathBuf]) -> String {
    if chain.is_empty() {
        String::new()
    } else {
        format!(" (included via {})", display_chain(chain))
    }
}
