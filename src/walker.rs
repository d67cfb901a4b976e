use crate::composer::resolve_base_dir;
use crate::error::{BundlerError, Result};
use crate::filter::IgnorePredicate;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, trace};
use walkdir::WalkDir;

/// A regular file found by [`walk`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Path as reached through the walked tree, symlink hops included
    pub logical: PathBuf,
    /// The entry inside the physical directory being walked. Output artifacts
    /// are placed next to it and named after it.
    pub path: PathBuf,
    /// Fully resolved location of the file contents
    pub real: PathBuf,
}

/// Recursively lists the regular files under `root`.
///
/// Ignore rules see logical paths, which start with `root` as given. Symlinked
/// directories are enumerated through their real location while their children
/// keep logical paths under the link. Entries come back in file name order.
///
/// # Errors
///
/// - `BundlerError::NotADirectory` if `root` is not a directory.
/// - `BundlerError::SymlinkResolution` for broken links and link cycles.
/// - `BundlerError::WalkDir` if a directory cannot be read.
pub fn walk(root: &Path, ignore: &dyn IgnorePredicate) -> Result<Vec<SourceFile>> {
    let physical = resolve_base_dir(root)?;
    let mut files = Vec::new();
    let mut roots = vec![physical.clone()];
    walk_dir(&physical, root, ignore, &mut roots, &mut files)?;
    debug!(root = %root.display(), files = files.len(), "walk complete");
    Ok(files)
}

fn walk_dir(
    physical: &Path,
    logical: &Path,
    ignore: &dyn IgnorePredicate,
    roots: &mut Vec<PathBuf>,
    files: &mut Vec<SourceFile>,
) -> Result<()> {
    let logical_of = |path: &Path| logical.join(path.strip_prefix(physical).unwrap_or(path));

    let entries = WalkDir::new(physical)
        .min_depth(1)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| {
            let is_dir = entry.file_type().is_dir()
                || (entry.path_is_symlink() && entry.path().is_dir());
            let logical_path = logical_of(entry.path());
            let skip = ignore.is_ignored(&logical_path, is_dir);
            if skip {
                trace!(path = %logical_path.display(), "ignored");
            }
            !skip
        });

    for entry in entries {
        let entry = entry?;
        let file_type = entry.file_type();

        if file_type.is_symlink() {
            let logical_path = logical_of(entry.path());
            let target = entry
                .path()
                .canonicalize()
                .map_err(|e| BundlerError::SymlinkResolution {
                    path: logical_path.clone(),
                    reason: e.to_string(),
                })?;
            let metadata =
                fs::metadata(&target).map_err(|e| BundlerError::path_io(&target, e))?;

            if metadata.is_dir() {
                let loops = entry.path().starts_with(&target)
                    || roots.iter().any(|r| r.starts_with(&target));
                if loops {
                    return Err(BundlerError::SymlinkResolution {
                        path: logical_path,
                        reason: format!("link cycle through {}", target.display()),
                    });
                }
                trace!(link = %logical_path.display(), target = %target.display(), "following directory link");
                roots.push(target.clone());
                let result = walk_dir(&target, &logical_path, ignore, roots, files);
                roots.pop();
                result?;
            } else if metadata.is_file() {
                files.push(SourceFile {
                    logical: logical_path,
                    path: entry.path().to_path_buf(),
                    real: target,
                });
            }
        } else if file_type.is_file() {
            files.push(SourceFile {
                logical: logical_of(entry.path()),
                path: entry.path().to_path_buf(),
                real: entry.path().to_path_buf(),
            });
        }
    }
    Ok(())
}
