//! Error types for detection and conversion.
//!
//! The library reports failures through [`Error`]. Per-file errors are
//! printed by the binary; configuration problems use `anyhow` instead.

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::format::Encoding;

/// Result alias used throughout the library.
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Failures raised while detecting or converting a file.
#[derive(Error, Debug)]
pub enum Error {
    /// Low-level I/O error (open, read, write, sync).
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Every candidate temporary path next to the file was already taken.
    #[error("can't generate temporary path for {}", .0.display())]
    TempPathExhausted(PathBuf),

    /// The staging file appeared between path generation and creation.
    #[error("staging file already exists: {}", .0.display())]
    DestinationExists(PathBuf),

    /// Renaming the original out of the way failed. The original is untouched.
    #[error("failed to move {} aside to {}: {source}", .path.display(), .backup.display())]
    SwapAside {
        path: PathBuf,
        backup: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Renaming the converted file into place failed.
    ///
    /// `restored` tells whether the original was moved back to `path`.
    #[error(
        "failed to move {} into place at {}: {source} ({})",
        .staged.display(),
        .path.display(),
        restore_note(.restored, .backup)
    )]
    SwapInstall {
        path: PathBuf,
        staged: PathBuf,
        backup: PathBuf,
        restored: bool,
        #[source]
        source: io::Error,
    },

    /// The file was converted but its backup could not be removed.
    #[error("converted, but failed to remove backup {}: {source}", .backup.display())]
    Cleanup {
        backup: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The target encoding has no representation for a character.
    #[error("{encoding} can't represent character {ch:?} (U+{:04X})", codepoint(.ch))]
    Unmappable { ch: char, encoding: Encoding },

    /// The encoder was fed bytes that are not UTF-8.
    #[error("malformed UTF-8 given to the {encoding} encoder")]
    MalformedInput { encoding: Encoding },

    /// A transform reported a full output buffer without making progress.
    #[error("transform made no progress with {0} bytes of output space")]
    Stalled(usize),
}

impl Error {
    /// Whether the underlying cause is a permission problem.
    pub fn is_permission_denied(&self) -> bool {
        self.io_kind() == Some(io::ErrorKind::PermissionDenied)
    }

    fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Error::Io(e) => Some(e.kind()),
            Error::SwapAside { source, .. }
            | Error::SwapInstall { source, .. }
            | Error::Cleanup { source, .. } => Some(source.kind()),
            _ => None,
        }
    }
}

fn restore_note(restored: &bool, backup: &Path) -> String {
    if *restored {
        "original restored".to_string()
    } else {
        format!("original left at {}", backup.display())
    }
}

fn codepoint(ch: &char) -> u32 {
    u32::from(*ch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_swap_install_message_mentions_restore() {
        let err = Error::SwapInstall {
            path: PathBuf::from("a.txt"),
            staged: PathBuf::from("a.txt.new"),
            backup: PathBuf::from("a.txt.old"),
            restored: true,
            source: io::Error::other("boom"),
        };
        let msg = err.to_string();
        assert!(msg.contains("a.txt.new"));
        assert!(msg.contains("original restored"));
    }

    #[test]
    fn test_swap_install_message_names_backup_when_not_restored() {
        let err = Error::SwapInstall {
            path: PathBuf::from("a.txt"),
            staged: PathBuf::from("a.txt.new"),
            backup: PathBuf::from("a.txt.1.old"),
            restored: false,
            source: io::Error::other("boom"),
        };
        assert!(err.to_string().contains("original left at a.txt.1.old"));
    }

    #[test]
    fn test_unmappable_message() {
        let err = Error::Unmappable {
            ch: '\u{1F600}',
            encoding: Encoding::ShiftJis,
        };
        assert_eq!(
            err.to_string(),
            "Shift_JIS can't represent character '\u{1F600}' (U+1F600)"
        );
    }

    #[test]
    fn test_permission_denied_classification() {
        let err = Error::from(io::Error::new(io::ErrorKind::PermissionDenied, "nope"));
        assert!(err.is_permission_denied());

        let err = Error::TempPathExhausted(PathBuf::from("x"));
        assert!(!err.is_permission_denied());
    }
}
