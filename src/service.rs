//! Service manager integration.

use crate::error::{Result, SyncError};
use std::process::Command;

/// Commands issued to the host's service manager.
///
/// The reconciler is generic over this seam; tests substitute a fake
/// that records calls instead of touching the host.
pub trait ServiceManager {
    /// Restarts the named service synchronously and reports the
    /// manager's own success/failure signal. No retry, and no check
    /// that the daemon answers queries afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::Restart`] when the manager reports failure.
    fn restart(&self, service: &str) -> Result<()>;

    /// Runs the operator-supplied daemon install command.
    ///
    /// # Errors
    ///
    /// Returns [`SyncError::InstallFailed`] when the command exits
    /// non-zero.
    fn install_daemon(&self, command: &str) -> Result<()>;
}

/// Drives services through `systemctl`.
pub struct Systemctl;

impl ServiceManager for Systemctl {
    fn restart(&self, service: &str) -> Result<()> {
        tracing::info!(service = %service, "Restarting resolver daemon");
        let output = Command::new("systemctl")
            .arg("restart")
            .arg(service)
            .output()?;

        if output.status.success() {
            tracing::info!(service = %service, "Restart reported success");
            Ok(())
        } else {
            let detail = String::from_utf8_lossy(&output.stderr).trim().to_string();
            Err(SyncError::Restart {
                service: service.to_string(),
                detail: if detail.is_empty() {
                    output.status.to_string()
                } else {
                    detail
                },
            })
        }
    }

    fn install_daemon(&self, command: &str) -> Result<()> {
        tracing::info!(command = %command, "Running daemon install command");
        let status = Command::new("sh").arg("-c").arg(command).status()?;

        if status.success() {
            Ok(())
        } else {
            Err(SyncError::InstallFailed {
                command: command.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn install_command_success() {
        Systemctl.install_daemon("true").unwrap();
    }

    #[test]
    fn install_command_failure() {
        let err = Systemctl.install_daemon("false").unwrap_err();
        assert!(matches!(err, SyncError::InstallFailed { .. }));
    }
}
