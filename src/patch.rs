//! Main-config patching.
//!
//! The historical shell version of this tool did an existence grep and a
//! separate append, racing against itself between the two. Here the
//! membership check and the append happen against one open file handle
//! held under an exclusive advisory `flock`.

use crate::error::{Result, SyncError};
use std::fs::OpenOptions;
use std::io::{Read, Seek, SeekFrom, Write};
use std::os::fd::AsRawFd;
use std::path::Path;

/// Ensures `directive` is present as a line of the file at `path`,
/// appending it at end-of-file if absent.
///
/// Idempotent: any number of calls with the same arguments leaves the
/// file identical to one call. Purely additive; existing lines are
/// never removed or reordered.
///
/// Returns `true` if the directive was appended, `false` if it was
/// already present.
///
/// # Errors
///
/// Returns [`SyncError::Write`] if the file cannot be opened or
/// mutated (permissions, missing path).
pub fn ensure_include_directive(path: &Path, directive: &str) -> Result<bool> {
    let wrap = |source: std::io::Error| SyncError::Write {
        path: path.display().to_string(),
        source,
    };

    let mut file = OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .map_err(wrap)?;

    // Lock held until the file handle drops.
    lock_exclusive(&file).map_err(wrap)?;

    let mut content = String::new();
    file.read_to_string(&mut content).map_err(wrap)?;

    if content.lines().any(|line| line.trim() == directive) {
        tracing::debug!(path = %path.display(), "Include directive already present");
        return Ok(false);
    }

    file.seek(SeekFrom::End(0)).map_err(wrap)?;
    if !content.is_empty() && !content.ends_with('\n') {
        file.write_all(b"\n").map_err(wrap)?;
    }
    file.write_all(directive.as_bytes()).map_err(wrap)?;
    file.write_all(b"\n").map_err(wrap)?;
    file.flush().map_err(wrap)?;

    tracing::info!(
        path = %path.display(),
        directive = %directive,
        "Appended include directive"
    );
    Ok(true)
}

/// Takes an exclusive advisory lock on `file`, blocking until acquired.
fn lock_exclusive(file: &std::fs::File) -> std::io::Result<()> {
    // SAFETY: flock on an open, owned descriptor; the lock is released
    // when the descriptor closes.
    let rc = unsafe { libc::flock(file.as_raw_fd(), libc::LOCK_EX) };
    if rc == 0 {
        Ok(())
    } else {
        Err(std::io::Error::last_os_error())
    }
}
