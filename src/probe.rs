//! Local state inspection.
//!
//! Everything here is pure observation; corrective action belongs to the
//! reconciler.

use crate::context::{Artifact, RunContext};
use std::path::Path;

/// Probes local filesystem and environment state for one run.
pub struct StateProbe<'a> {
    ctx: &'a RunContext,
}

impl<'a> StateProbe<'a> {
    /// Creates a probe over the given context.
    #[must_use]
    pub const fn new(ctx: &'a RunContext) -> Self {
        Self { ctx }
    }

    /// Returns `true` if the daemon binary resolves on `PATH`
    /// (or, for a name containing `/`, exists at that path).
    #[must_use]
    pub fn daemon_installed(&self) -> bool {
        let binary = &self.ctx.daemon_binary;
        if binary.contains('/') {
            return is_executable(Path::new(binary));
        }
        let Some(paths) = std::env::var_os("PATH") else {
            return false;
        };
        std::env::split_paths(&paths).any(|dir| is_executable(&dir.join(binary)))
    }

    /// Returns `true` if the daemon's main configuration file exists.
    #[must_use]
    pub fn main_config_exists(&self) -> bool {
        self.ctx.main_config.is_file()
    }

    /// Returns `true` if the include directive is already present as a
    /// line of the main config. A missing or unreadable config reads as
    /// absent.
    #[must_use]
    pub fn include_directive_present(&self) -> bool {
        let directive = self.ctx.include_directive();
        std::fs::read_to_string(&self.ctx.main_config)
            .is_ok_and(|c| c.lines().any(|line| line.trim() == directive))
    }

    /// The subset of required artifacts not present on disk,
    /// in fetch order.
    #[must_use]
    pub fn missing_artifacts(&self) -> Vec<Artifact> {
        Artifact::all()
            .into_iter()
            .filter(|a| !self.ctx.artifact_path(*a).is_file())
            .collect()
    }
}

/// Checks for a regular file with any execute bit set.
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}
