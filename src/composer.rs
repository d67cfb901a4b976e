use crate::config::BundleConfig;
use crate::error::{BundlerError, Result};
use crate::scanner::{Token, TokenKind, scan};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, trace};

/// Origin reported for errors in input that has no file of its own
pub const STREAM_ORIGIN: &str = "<stream>";

/// Recursive include expander for one top-level bundle.
///
/// Keeps the stack of canonical paths currently being expanded so that cycles
/// are reported instead of recursing forever. `depth` counts nested includes
/// only, so the root of a file bundle and a stream share the same ceiling. A
/// fresh composer is used for each top-level bundle.
#[derive(Debug)]
pub struct Composer<'c> {
    config: &'c BundleConfig,
    stack: Vec<PathBuf>,
    depth: usize,
}

impl<'c> Composer<'c> {
    pub fn new(config: &'c BundleConfig) -> Self {
        Self {
            config,
            stack: Vec::new(),
            depth: 0,
        }
    }

    /// Composes `input`, resolving includes relative to `base_dir`, into `sink`
    ///
    /// # Errors
    ///
    /// - `BundlerError::NotADirectory` if `base_dir` is not a directory.
    /// - `BundlerError::UnclosedInclude`, `BundlerError::MissingIncludedFile`,
    ///   `BundlerError::CyclicInclusion` from the expansion itself.
    /// - `BundlerError::Io` if reading the input or writing the sink fails.
    pub fn compose_stream<R, W>(
        &mut self,
        mut input: R,
        base_dir: &Path,
        sink: &mut W,
    ) -> Result<()>
    where
        R: Read,
        W: Write + ?Sized,
    {
        let base_dir = resolve_base_dir(base_dir)?;
        let mut buffer = Vec::new();
        input.read_to_end(&mut buffer)?;
        self.compose_bytes(&buffer, &base_dir, Path::new(STREAM_ORIGIN), sink)
    }

    /// Composes the file at `path` into `sink`. The file itself counts as the
    /// root of the inclusion chain, so a file including itself is a cycle.
    ///
    /// # Errors
    ///
    /// Same as [`Composer::compose_stream`], plus `BundlerError::PathIo` if the
    /// file cannot be resolved or read.
    pub fn compose_file<W>(&mut self, path: &Path, sink: &mut W) -> Result<()>
    where
        W: Write + ?Sized,
    {
        let real = path
            .canonicalize()
            .map_err(|e| BundlerError::path_io(path, e))?;
        let input = fs::read(&real).map_err(|e| BundlerError::path_io(path, e))?;
        self.expand(&real, &input, sink)
    }

    fn compose_bytes<W>(
        &mut self,
        input: &[u8],
        base_dir: &Path,
        origin: &Path,
        sink: &mut W,
    ) -> Result<()>
    where
        W: Write + ?Sized,
    {
        let config = self.config;
        for token in scan(input, &config.delimiters) {
            match token.kind {
                TokenKind::Text => sink.write_all(token.value)?,
                TokenKind::LeftDelim | TokenKind::RightDelim => {
                    if config.keep_delims {
                        sink.write_all(token.value)?;
                    }
                }
                TokenKind::FileRef => {
                    let target = self.resolve(base_dir, origin, &token)?;
                    trace!(origin = %origin.display(), target = %target.display(), "inlining include");
                    self.include(&target, sink)?;
                }
                TokenKind::EndOfInput => break,
                TokenKind::Error => {
                    return Err(BundlerError::UnclosedInclude {
                        origin: origin.to_path_buf(),
                        position: token.position,
                    });
                }
            }
        }
        Ok(())
    }

    fn resolve(&self, base_dir: &Path, origin: &Path, token: &Token<'_>) -> Result<PathBuf> {
        let reference = std::str::from_utf8(token.value)
            .ok()
            .filter(|r| !r.trim().is_empty())
            .ok_or_else(|| BundlerError::InvalidReference {
                origin: origin.to_path_buf(),
                position: token.position,
                reference: token.text().into_owned(),
            })?;

        // Rooted references are still relative to the including file
        let relative: PathBuf = Path::new(reference)
            .components()
            .filter(|c| {
                matches!(
                    c,
                    Component::Normal(_) | Component::CurDir | Component::ParentDir
                )
            })
            .collect();
        let candidate = base_dir.join(relative);
        candidate
            .canonicalize()
            .map_err(|e| self.open_error(&candidate, e))
    }

    fn include<W>(&mut self, target: &Path, sink: &mut W) -> Result<()>
    where
        W: Write + ?Sized,
    {
        if let Some(limit) = self.config.max_depth
            && self.depth >= limit
        {
            return Err(BundlerError::IncludeDepthExceeded {
                path: target.to_path_buf(),
                limit,
                chain: self.stack.clone(),
            });
        }
        let input = fs::read(target).map_err(|e| self.open_error(target, e))?;

        self.depth += 1;
        let result = self.expand(target, &input, sink);
        self.depth -= 1;
        result
    }

    fn expand<W>(&mut self, real: &Path, input: &[u8], sink: &mut W) -> Result<()>
    where
        W: Write + ?Sized,
    {
        if self.stack.iter().any(|p| p == real) {
            let mut chain = self.stack.clone();
            chain.push(real.to_path_buf());
            return Err(BundlerError::CyclicInclusion { chain });
        }

        let base_dir = real.parent().unwrap_or(real);
        debug!(file = %real.display(), depth = self.depth, "expanding");

        self.stack.push(real.to_path_buf());
        let result = self.compose_bytes(input, base_dir, real, sink);
        self.stack.pop();
        result
    }

    fn open_error(&self, path: &Path, source: io::Error) -> BundlerError {
        BundlerError::MissingIncludedFile {
            path: path.to_path_buf(),
            chain: self.stack.clone(),
            source,
        }
    }
}

/// Makes `dir` absolute with symlinks resolved and checks it is a directory
///
/// # Errors
///
/// - `BundlerError::SymlinkResolution` if `dir` is a link that cannot be resolved.
/// - `BundlerError::NotADirectory` if the resolved path is not a directory.
/// - `BundlerError::PathIo` for any other resolution failure.
pub fn resolve_base_dir(dir: &Path) -> Result<PathBuf> {
    let real = dir.canonicalize().map_err(|e| {
        let is_link = dir
            .symlink_metadata()
            .is_ok_and(|m| m.file_type().is_symlink());
        if is_link {
            BundlerError::SymlinkResolution {
                path: dir.to_path_buf(),
                reason: e.to_string(),
            }
        } else {
            BundlerError::path_io(dir, e)
        }
    })?;

    if !real.is_dir() {
        return Err(BundlerError::NotADirectory {
            path: dir.to_path_buf(),
        });
    }
    Ok(real)
}
