//! In-place conversion with atomic replacement.
//!
//! The converted content is written to a sibling staging file
//! (`<path>.new`, `<path>.1.new`, ...) which then replaces the original in
//! two renames:
//!
//! 1. `<path>` -> `<path>.old` (or `<path>.N.old`)
//! 2. `<path>.new` -> `<path>`
//!
//! If the process dies between the two renames, `<path>` is missing and the
//! original sits at the `.old` path next to the converted `.new` file. Closing
//! that window would need platform specific transactional renames.

use std::ffi::OsString;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::transform::TransformChain;

/// How many sibling names are tried before giving up.
pub const TMP_MAX_TRIAL: usize = 10;

/// Pick a free sibling path: `<path>.<suffix>`, then `<path>.1.<suffix>` up to
/// `<path>.9.<suffix>`.
pub fn temp_path(path: &Path, suffix: &str) -> Result<PathBuf> {
    (0..TMP_MAX_TRIAL)
        .map(|i| {
            if i == 0 {
                with_suffix(path, &format!(".{suffix}"))
            } else {
                with_suffix(path, &format!(".{i}.{suffix}"))
            }
        })
        .find(|candidate| is_free(candidate))
        .ok_or_else(|| Error::TempPathExhausted(path.to_path_buf()))
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(suffix);
    PathBuf::from(name)
}

/// Only a definite "not found" counts as free.
fn is_free(path: &Path) -> bool {
    matches!(fs::symlink_metadata(path), Err(e) if e.kind() == io::ErrorKind::NotFound)
}

/// Convert the file at `path` through `chain` and replace it in place.
///
/// On failure the original file is left as it was and the staging file is
/// removed, except when the second rename fails and the original could not be
/// moved back (see [`Error::SwapInstall`]).
pub fn convert(path: &Path, chain: &mut TransformChain) -> Result<()> {
    let staged = temp_path(path, "new")?;
    let out = create_exclusive(&staged)?;
    debug!(staged = %staged.display(), "staging conversion");

    if let Err(e) = write_converted(path, out, chain) {
        discard(&staged);
        return Err(e);
    }

    match swap_files(path, &staged) {
        Ok(()) => Ok(()),
        Err(e @ Error::SwapInstall { restored: false, .. }) => Err(e),
        Err(e @ Error::Cleanup { .. }) => Err(e),
        Err(e) => {
            discard(&staged);
            Err(e)
        }
    }
}

fn create_exclusive(path: &Path) -> Result<File> {
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| {
            if e.kind() == io::ErrorKind::AlreadyExists {
                Error::DestinationExists(path.to_path_buf())
            } else {
                Error::Io(e)
            }
        })
}

/// Stream `src` through the chain into the already created staging file.
fn write_converted(src: &Path, out: File, chain: &mut TransformChain) -> Result<()> {
    let mut input = File::open(src)?;
    let mut writer = BufWriter::new(out);
    let read = chain.run(&mut input, &mut writer)?;
    writer.flush()?;
    let out = writer.into_inner().map_err(|e| e.into_error())?;

    // Keep the original mode (e.g. executable scripts).
    let permissions = input.metadata()?.permissions();
    out.set_permissions(permissions)?;
    out.sync_all()?;
    debug!(bytes = read, "conversion written");
    Ok(())
}

/// Replace `path` with `staged`, keeping the original until the new file is
/// in place.
fn swap_files(path: &Path, staged: &Path) -> Result<()> {
    let backup = temp_path(path, "old")?;

    if let Err(source) = fs::rename(path, &backup).and_then(|()| ensure_exists(&backup)) {
        return Err(Error::SwapAside {
            path: path.to_path_buf(),
            backup,
            source,
        });
    }

    if let Err(source) = fs::rename(staged, path).and_then(|()| ensure_exists(path)) {
        let restored = is_free(path)
            && fs::rename(&backup, path).and_then(|()| ensure_exists(path)).is_ok();
        if !restored {
            warn!(
                original = %backup.display(),
                converted = %staged.display(),
                "could not restore original after failed swap"
            );
        }
        return Err(Error::SwapInstall {
            path: path.to_path_buf(),
            staged: staged.to_path_buf(),
            backup,
            restored,
            source,
        });
    }

    fs::remove_file(&backup).map_err(|source| Error::Cleanup { backup, source })
}

fn ensure_exists(path: &Path) -> io::Result<()> {
    fs::symlink_metadata(path).map(|_| ())
}

/// Best-effort removal of a staging file.
fn discard(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "failed to remove staging file");
        }
    }
}
