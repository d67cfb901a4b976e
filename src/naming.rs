//! Output naming and artifact materialization.
//!
//! Composed output is first written to a temporary file in the destination
//! directory and digested on the way through. Once the final name is known the
//! temporary file is renamed into place. A staged file that is dropped without
//! being committed is deleted.

use crate::error::{BundlerError, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::ffi::OsString;
use std::fs;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info, warn};

/// Number of digest bytes kept in a fingerprinted name
pub const FINGERPRINT_BYTES: usize = 16;

/// How the output artifact of a bundle is named
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum OutputName {
    /// `stem-<digest>.ext` next to the original
    #[default]
    Fingerprint,
    /// The given file name, next to the original
    Explicit(String),
    /// `stem-<suffix>.ext` next to the original
    Suffix(String),
}

impl OutputName {
    /// Naming for a single file: an explicit name, or a fingerprint when absent
    pub fn for_file(explicit: Option<&str>) -> Self {
        match explicit {
            Some(name) if !name.is_empty() => Self::Explicit(name.to_string()),
            _ => Self::Fingerprint,
        }
    }

    /// Naming for directory mode: a suffix, or a fingerprint when absent
    pub fn for_directory(suffix: Option<&str>) -> Self {
        match suffix {
            Some(suffix) if !suffix.is_empty() => Self::Suffix(suffix.to_string()),
            _ => Self::Fingerprint,
        }
    }
}

/// A composed artifact and the file it was produced from
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedFile {
    pub original_path: PathBuf,
    pub new_path: PathBuf,
}

/// Lowercase hex fingerprint of `bytes`
pub fn fingerprint(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    hex::encode(&digest[..FINGERPRINT_BYTES])
}

/// Final output path for `original` given the naming rule and content fingerprint
pub fn final_path(original: &Path, name: &OutputName, fingerprint: &str) -> PathBuf {
    match name {
        OutputName::Explicit(name) => original.with_file_name(name),
        OutputName::Suffix(suffix) => tagged(original, suffix),
        OutputName::Fingerprint => tagged(original, fingerprint),
    }
}

fn tagged(original: &Path, tag: &str) -> PathBuf {
    let mut name = original
        .file_stem()
        .map(OsString::from)
        .unwrap_or_default();
    name.push("-");
    name.push(tag);
    if let Some(ext) = original.extension() {
        name.push(".");
        name.push(ext);
    }
    original.with_file_name(name)
}

fn output_dir(original: &Path) -> &Path {
    match original.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    }
}

/// Writer that digests everything passing through it
struct HashingWriter<W> {
    inner: W,
    hasher: Sha256,
}

impl<W: Write> HashingWriter<W> {
    fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
        }
    }

    fn finish(mut self) -> io::Result<String> {
        self.inner.flush()?;
        let digest = self.hasher.finalize();
        Ok(hex::encode(&digest[..FINGERPRINT_BYTES]))
    }
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let written = self.inner.write(buf)?;
        self.hasher.update(&buf[..written]);
        Ok(written)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Composed output waiting to be renamed to its final path
#[derive(Debug)]
pub struct StagedFile {
    original: PathBuf,
    target: PathBuf,
    temp: NamedTempFile,
}

impl StagedFile {
    pub fn original(&self) -> &Path {
        &self.original
    }

    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Atomically moves the staged output to its final path
    ///
    /// # Errors
    ///
    /// Returns `BundlerError::PathIo` if the rename fails; the staged file is
    /// removed in that case.
    pub fn commit(self) -> Result<ProcessedFile> {
        let Self {
            original,
            target,
            temp,
        } = self;
        temp.persist(&target)
            .map_err(|e| BundlerError::path_io(&target, e.error))?;
        info!(original = %original.display(), output = %target.display(), "bundled");
        Ok(ProcessedFile {
            original_path: original,
            new_path: target,
        })
    }
}

/// Stages the output for `original`.
///
/// `compose` writes the full output into the sink it is handed. The staged file
/// lives next to `original` and takes over its permissions.
///
/// # Errors
///
/// Returns whatever `compose` fails with, or `BundlerError::PathIo` if the
/// staging file cannot be created or written.
pub fn stage<F>(original: &Path, name: &OutputName, compose: F) -> Result<StagedFile>
where
    F: FnOnce(&mut dyn Write) -> Result<()>,
{
    let dir = output_dir(original);
    let temp = tempfile::Builder::new()
        .prefix(".bundler-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|e| BundlerError::path_io(dir, e))?;

    let fingerprint = {
        let mut writer = HashingWriter::new(BufWriter::new(temp.as_file()));
        compose(&mut writer)?;
        writer
            .finish()
            .map_err(|e| BundlerError::path_io(temp.path(), e))?
    };

    if let Ok(metadata) = fs::metadata(original) {
        temp.as_file()
            .set_permissions(metadata.permissions())
            .map_err(|e| BundlerError::path_io(temp.path(), e))?;
    }

    let target = final_path(original, name, &fingerprint);
    debug!(staged = %temp.path().display(), target = %target.display(), "staged");
    Ok(StagedFile {
        original: original.to_path_buf(),
        target,
        temp,
    })
}

/// Commits every staged file, or none of them.
///
/// If a rename fails, artifacts already committed by this call are removed and
/// the remaining staged files are discarded.
///
/// # Errors
///
/// Returns the first commit failure.
pub fn commit_all(staged: Vec<StagedFile>) -> Result<Vec<ProcessedFile>> {
    let mut committed = Vec::with_capacity(staged.len());
    for file in staged {
        match file.commit() {
            Ok(processed) => committed.push(processed),
            Err(err) => {
                for processed in &committed {
                    if let Err(e) = fs::remove_file(&processed.new_path) {
                        warn!(path = %processed.new_path.display(), error = %e, "rollback failed");
                    }
                }
                return Err(err);
            }
        }
    }
    Ok(committed)
}
