use crate::composer::Composer;
use crate::config::BundleConfig;
use crate::error::Result;
use crate::filter::IgnorePredicate;
use crate::naming::{OutputName, ProcessedFile, StagedFile, commit_all, stage};
use crate::walker::{self, SourceFile};
use rayon::prelude::*;
use std::io::{Read, Write};
use std::path::Path;
use tracing::debug;

/// Bundles `input` into `output`, resolving includes relative to `base_dir`.
/// No naming or traversal happens.
///
/// # Errors
///
/// - `BundlerError::NotADirectory` if `base_dir` is not a directory.
/// - Any composition error (unclosed, missing or cyclic includes).
/// - `BundlerError::Io` if reading `input` or writing `output` fails.
pub fn bundle_stream<R, W>(
    input: R,
    output: &mut W,
    base_dir: &Path,
    config: &BundleConfig,
) -> Result<()>
where
    R: Read,
    W: Write + ?Sized,
{
    Composer::new(config).compose_stream(input, base_dir, output)?;
    output.flush()?;
    Ok(())
}

/// Bundles the file at `path` and writes the result next to it.
///
/// The output is named `explicit_name` when given, otherwise after the file
/// with a fingerprint of the composed content.
///
/// # Errors
///
/// Any composition error, or `BundlerError::PathIo` if the output cannot be
/// written. Nothing is left on disk on failure.
pub fn bundle_file(
    path: &Path,
    explicit_name: Option<&str>,
    config: &BundleConfig,
) -> Result<ProcessedFile> {
    let name = OutputName::for_file(explicit_name);
    let staged = stage(path, &name, |sink| {
        Composer::new(config).compose_file(path, sink)
    })?;
    staged.commit()
}

/// Bundles every file under `root` that `ignore` lets through.
///
/// Each output lands next to its source, named with `suffix` when given and a
/// content fingerprint otherwise. All outputs are staged before any is
/// committed, so a failure leaves no new artifacts behind. Results follow walk
/// order, also when `config.parallel` is set.
///
/// # Errors
///
/// - Walk errors: `BundlerError::NotADirectory`, `BundlerError::SymlinkResolution`,
///   `BundlerError::WalkDir`.
/// - Any composition or naming error from any file.
pub fn bundle_directory(
    root: &Path,
    suffix: Option<&str>,
    config: &BundleConfig,
    ignore: &dyn IgnorePredicate,
) -> Result<Vec<ProcessedFile>> {
    let sources = walker::walk(root, ignore)?;
    let name = OutputName::for_directory(suffix);
    debug!(files = sources.len(), parallel = config.parallel, "bundling directory");

    let stage_source = |source: &SourceFile| -> Result<StagedFile> {
        stage(&source.path, &name, |sink| {
            Composer::new(config).compose_file(&source.real, sink)
        })
    };

    let staged: Vec<StagedFile> = if config.parallel {
        sources.par_iter().map(stage_source).collect::<Result<_>>()?
    } else {
        sources.iter().map(stage_source).collect::<Result<_>>()?
    };

    commit_all(staged)
}
