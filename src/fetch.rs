//! Remote artifact retrieval.
//!
//! Downloads go to a temp file in the destination directory and are
//! renamed into place only after the full body has been written, so a
//! failed transfer never leaves a path that probes as present.

use crate::context::Artifact;
use crate::error::{Result, SyncError};
use std::io::Write;
use std::path::Path;
use std::time::Duration;

/// Default per-request timeout.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A source of artifact bytes.
///
/// The reconciler is generic over this seam so tests can serve bytes
/// without touching the network.
pub trait ArtifactSource {
    /// Retrieves `url` and writes the body to `dest`, replacing any
    /// existing file.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Download`] on any transfer failure; `dest`
    /// is left untouched in that case.
    fn fetch(&self, artifact: Artifact, url: &str, dest: &Path) -> Result<()>;
}

/// Fetches artifacts over HTTP/HTTPS with a blocking client.
///
/// One GET per artifact, no retries; scheduling retries is the
/// caller's (e.g. a cron wrapper's) concern.
pub struct HttpFetcher {
    timeout: Duration,
}

impl HttpFetcher {
    /// Creates a fetcher with the default timeout.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Overrides the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn get(&self, url: &str) -> reqwest::Result<Vec<u8>> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()?;
        let body = client.get(url).send()?.error_for_status()?.bytes()?;
        Ok(body.to_vec())
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl ArtifactSource for HttpFetcher {
    fn fetch(&self, artifact: Artifact, url: &str, dest: &Path) -> Result<()> {
        tracing::info!(artifact = %artifact, url = %url, "Fetching artifact");

        let body = self.get(url).map_err(|e| SyncError::Download {
            artifact,
            url: url.to_string(),
            source: Box::new(e),
        })?;

        write_atomic(dest, &body)?;
        tracing::info!(
            artifact = %artifact,
            bytes = body.len(),
            dest = %dest.display(),
            "Artifact written"
        );
        Ok(())
    }
}

/// Writes `bytes` to `dest` via a temp file in the same directory,
/// renamed into place once complete.
pub(crate) fn write_atomic(dest: &Path, bytes: &[u8]) -> Result<()> {
    let dir = dest.parent().filter(|p| !p.as_os_str().is_empty());
    let dir = dir.unwrap_or_else(|| Path::new("."));
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
    }

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(dest).map_err(|e| SyncError::Io(e.error))?;
    Ok(())
}
