//! Reconciliation workflow.
//!
//! One pass walks preconditions → artifacts → config patch → restart,
//! aborting on the first failure. Nothing is rolled back on abort: a
//! downloaded file or patched config left behind is still valid input
//! for the next attempt, and "config updated, restart needs manual
//! attention" beats silent reversal.

use crate::context::{Artifact, RunContext};
use crate::error::{Result, SyncError};
use crate::fetch::ArtifactSource;
use crate::patch;
use crate::probe::StateProbe;
use crate::service::ServiceManager;

/// What a single invocation is asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Full pass: fetch missing artifacts, patch the config, restart.
    /// Safe to repeat; an already-converged host only restarts.
    Run,

    /// Patch the config if needed. No fetch, no restart.
    Check,

    /// Destructive refresh of the selected artifacts, then patch.
    /// Restarts only when `restart` is set.
    Update {
        /// Refresh the zone data file.
        zone: bool,
        /// Refresh the access-control file.
        acl: bool,
        /// Chain a restart after a successful refresh.
        restart: bool,
    },
}

/// What one successful pass actually did.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Outcome {
    /// Artifacts fetched this pass, in fetch order.
    pub fetched: Vec<Artifact>,
    /// Whether the include directive was appended (vs. already present).
    pub directive_appended: bool,
    /// Whether the daemon was restarted.
    pub restarted: bool,
}

/// Sequences the probe, fetcher, patcher, and service manager for one
/// reconciliation pass.
///
/// # Example
///
/// ```rust,ignore
/// use blocklist_sync::{HttpFetcher, Operation, Reconciler, RunContext, Systemctl};
///
/// let ctx = RunContext::new();
/// let outcome = Reconciler::new(&ctx, &HttpFetcher::new(), &Systemctl)
///     .execute(Operation::Run)?;
/// ```
pub struct Reconciler<'a, S, M> {
    ctx: &'a RunContext,
    source: &'a S,
    services: &'a M,
}

impl<'a, S: ArtifactSource, M: ServiceManager> Reconciler<'a, S, M> {
    /// Creates a reconciler over the given context and collaborators.
    pub const fn new(ctx: &'a RunContext, source: &'a S, services: &'a M) -> Self {
        Self {
            ctx,
            source,
            services,
        }
    }

    /// Executes one pass of `op`.
    ///
    /// # Errors
    ///
    /// Returns the first step's error; later steps are not attempted.
    /// See the module docs for what is (not) cleaned up on failure.
    pub fn execute(&self, op: Operation) -> Result<Outcome> {
        let probe = StateProbe::new(self.ctx);
        self.check_preconditions(&probe)?;

        let mut outcome = Outcome::default();

        for artifact in self.artifacts_to_fetch(&probe, op) {
            self.source.fetch(
                artifact,
                self.ctx.artifact_url(artifact),
                self.ctx.artifact_path(artifact),
            )?;
            outcome.fetched.push(artifact);
        }

        outcome.directive_appended =
            patch::ensure_include_directive(&self.ctx.main_config, &self.ctx.include_directive())?;

        if self.should_restart(op) {
            self.services.restart(&self.ctx.service_name)?;
            outcome.restarted = true;
        }

        Ok(outcome)
    }

    /// Verifies the daemon and its base config exist before any
    /// mutation. A missing daemon triggers the opt-in install command
    /// when one is configured, then re-probes.
    fn check_preconditions(&self, probe: &StateProbe<'_>) -> Result<()> {
        if !probe.daemon_installed() {
            let Some(command) = &self.ctx.install_command else {
                return Err(SyncError::DaemonNotInstalled {
                    binary: self.ctx.daemon_binary.clone(),
                });
            };
            tracing::warn!(
                binary = %self.ctx.daemon_binary,
                "Daemon not installed, invoking install command"
            );
            self.services.install_daemon(command)?;
            if !probe.daemon_installed() {
                return Err(SyncError::DaemonNotInstalled {
                    binary: self.ctx.daemon_binary.clone(),
                });
            }
        }

        if !probe.main_config_exists() {
            return Err(SyncError::MainConfigMissing {
                path: self.ctx.main_config.display().to_string(),
            });
        }

        tracing::info!(
            config = %self.ctx.main_config.display(),
            directive_present = probe.include_directive_present(),
            missing = ?probe.missing_artifacts(),
            "Preconditions satisfied"
        );
        Ok(())
    }

    fn artifacts_to_fetch(&self, probe: &StateProbe<'_>, op: Operation) -> Vec<Artifact> {
        match op {
            Operation::Check => Vec::new(),
            Operation::Run => probe.missing_artifacts(),
            Operation::Update { zone, acl, .. } => Artifact::all()
                .into_iter()
                .filter(|a| match a {
                    Artifact::Zone => zone,
                    Artifact::Acl => acl,
                })
                .collect(),
        }
    }

    const fn should_restart(&self, op: Operation) -> bool {
        match op {
            Operation::Run => true,
            Operation::Check => false,
            Operation::Update { restart, .. } => restart,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Serves fixed bytes per artifact; records every fetch.
    struct FakeSource {
        fail: Option<Artifact>,
        fetched: RefCell<Vec<Artifact>>,
    }

    impl FakeSource {
        fn new() -> Self {
            Self {
                fail: None,
                fetched: RefCell::new(Vec::new()),
            }
        }

        fn failing_on(artifact: Artifact) -> Self {
            Self {
                fail: Some(artifact),
                ..Self::new()
            }
        }
    }

    impl ArtifactSource for FakeSource {
        fn fetch(&self, artifact: Artifact, url: &str, dest: &std::path::Path) -> Result<()> {
            if self.fail == Some(artifact) {
                return Err(SyncError::Download {
                    artifact,
                    url: url.to_string(),
                    source: "connection refused".into(),
                });
            }
            self.fetched.borrow_mut().push(artifact);
            let body = match artifact {
                Artifact::Zone => "ZONE_FETCHED",
                Artifact::Acl => "ACL_FETCHED",
            };
            crate::fetch::write_atomic(dest, body.as_bytes())
        }
    }

    /// Counts restarts; optionally reports restart failure.
    struct FakeServices {
        fail_restart: bool,
        restarts: RefCell<u32>,
    }

    impl FakeServices {
        fn new() -> Self {
            Self {
                fail_restart: false,
                restarts: RefCell::new(0),
            }
        }

        fn failing() -> Self {
            Self {
                fail_restart: true,
                ..Self::new()
            }
        }
    }

    impl ServiceManager for FakeServices {
        fn restart(&self, service: &str) -> Result<()> {
            *self.restarts.borrow_mut() += 1;
            if self.fail_restart {
                return Err(SyncError::Restart {
                    service: service.to_string(),
                    detail: "unit failed".to_string(),
                });
            }
            Ok(())
        }

        fn install_daemon(&self, _command: &str) -> Result<()> {
            Ok(())
        }
    }

    /// Context rooted in a tempdir, with `sh` standing in for the daemon.
    fn test_ctx(dir: &std::path::Path) -> RunContext {
        let config = dir.join("named.conf");
        std::fs::write(&config, "options {};\n").unwrap();
        RunContext::new()
            .with_daemon_binary("sh")
            .with_main_config(config)
            .with_zone_file(dir.join("blackhole.zone"))
            .with_acl_file(dir.join("blocked.conf"))
            .with_zone_url("http://localhost/zone")
            .with_acl_url("http://localhost/acl")
    }

    #[test]
    fn run_fetches_only_missing_artifacts() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_ctx(dir.path());
        std::fs::write(&ctx.zone_file, "ZONE_V1").unwrap();

        let source = FakeSource::new();
        let services = FakeServices::new();
        let outcome = Reconciler::new(&ctx, &source, &services)
            .execute(Operation::Run)
            .unwrap();

        assert_eq!(outcome.fetched, vec![Artifact::Acl]);
        assert_eq!(*source.fetched.borrow(), vec![Artifact::Acl]);
        // Pre-existing zone data untouched.
        assert_eq!(std::fs::read(&ctx.zone_file).unwrap(), b"ZONE_V1");
    }

    #[test]
    fn run_skips_fetch_when_artifacts_present() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_ctx(dir.path());
        std::fs::write(&ctx.zone_file, "ZONE_V1").unwrap();
        std::fs::write(&ctx.acl_file, "ACL_V1").unwrap();

        let source = FakeSource::new();
        let services = FakeServices::new();
        let outcome = Reconciler::new(&ctx, &source, &services)
            .execute(Operation::Run)
            .unwrap();

        assert!(source.fetched.borrow().is_empty());
        assert!(outcome.restarted);
        assert_eq!(*services.restarts.borrow(), 1);
    }

    #[test]
    fn update_is_destructive_refresh_of_selection_only() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_ctx(dir.path());
        std::fs::write(&ctx.zone_file, "ZONE_V1").unwrap();
        std::fs::write(&ctx.acl_file, "ACL_V1").unwrap();

        let source = FakeSource::new();
        let services = FakeServices::new();
        let outcome = Reconciler::new(&ctx, &source, &services)
            .execute(Operation::Update {
                zone: false,
                acl: true,
                restart: false,
            })
            .unwrap();

        assert_eq!(outcome.fetched, vec![Artifact::Acl]);
        assert_eq!(std::fs::read(&ctx.acl_file).unwrap(), b"ACL_FETCHED");
        assert_eq!(std::fs::read(&ctx.zone_file).unwrap(), b"ZONE_V1");
        assert!(!outcome.restarted);
        assert_eq!(*services.restarts.borrow(), 0);
    }

    #[test]
    fn update_with_restart_flag_restarts() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_ctx(dir.path());

        let source = FakeSource::new();
        let services = FakeServices::new();
        let outcome = Reconciler::new(&ctx, &source, &services)
            .execute(Operation::Update {
                zone: true,
                acl: true,
                restart: true,
            })
            .unwrap();

        assert_eq!(outcome.fetched, vec![Artifact::Zone, Artifact::Acl]);
        assert!(outcome.restarted);
    }

    #[test]
    fn check_never_fetches_or_restarts() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_ctx(dir.path());

        let source = FakeSource::new();
        let services = FakeServices::new();
        let outcome = Reconciler::new(&ctx, &source, &services)
            .execute(Operation::Check)
            .unwrap();

        assert!(source.fetched.borrow().is_empty());
        assert!(!outcome.restarted);
        assert_eq!(*services.restarts.borrow(), 0);
        assert!(outcome.directive_appended);
        // Artifacts were never created.
        assert!(!ctx.zone_file.exists());
        assert!(!ctx.acl_file.exists());
    }

    #[test]
    fn fetch_failure_aborts_before_config_mutation() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_ctx(dir.path());
        let before = std::fs::read_to_string(&ctx.main_config).unwrap();

        let source = FakeSource::failing_on(Artifact::Zone);
        let services = FakeServices::new();
        let err = Reconciler::new(&ctx, &source, &services)
            .execute(Operation::Run)
            .unwrap_err();

        assert!(matches!(err, SyncError::Download { .. }));
        assert_eq!(std::fs::read_to_string(&ctx.main_config).unwrap(), before);
        assert_eq!(*services.restarts.borrow(), 0);
    }

    #[test]
    fn restart_failure_keeps_filesystem_changes() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_ctx(dir.path());

        let source = FakeSource::new();
        let services = FakeServices::failing();
        let err = Reconciler::new(&ctx, &source, &services)
            .execute(Operation::Run)
            .unwrap_err();

        assert!(err.is_restart_failure());
        // No rollback: artifacts and directive stay in place.
        assert!(ctx.zone_file.exists());
        assert!(ctx.acl_file.exists());
        let config = std::fs::read_to_string(&ctx.main_config).unwrap();
        assert_eq!(config.matches(&ctx.include_directive()).count(), 1);
    }

    #[test]
    fn missing_daemon_is_fatal_before_any_write() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_ctx(dir.path()).with_daemon_binary("no-such-daemon-xyzzy");

        let source = FakeSource::new();
        let services = FakeServices::new();
        let err = Reconciler::new(&ctx, &source, &services)
            .execute(Operation::Run)
            .unwrap_err();

        assert!(matches!(err, SyncError::DaemonNotInstalled { .. }));
        assert!(source.fetched.borrow().is_empty());
        assert!(!ctx.zone_file.exists());
    }

    #[test]
    fn missing_main_config_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = test_ctx(dir.path()).with_main_config(dir.path().join("absent.conf"));

        let source = FakeSource::new();
        let services = FakeServices::new();
        let err = Reconciler::new(&ctx, &source, &services)
            .execute(Operation::Run)
            .unwrap_err();

        assert!(matches!(err, SyncError::MainConfigMissing { .. }));
        assert!(source.fetched.borrow().is_empty());
    }

    #[test]
    fn install_command_failure_stops_the_run() {
        struct RefusingServices;
        impl ServiceManager for RefusingServices {
            fn restart(&self, _service: &str) -> Result<()> {
                panic!("restart must not be reached");
            }
            fn install_daemon(&self, command: &str) -> Result<()> {
                Err(SyncError::InstallFailed {
                    command: command.to_string(),
                })
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let ctx = test_ctx(dir.path())
            .with_daemon_binary("no-such-daemon-xyzzy")
            .with_install_command("pkg install resolver");

        let source = FakeSource::new();
        let err = Reconciler::new(&ctx, &source, &RefusingServices)
            .execute(Operation::Run)
            .unwrap_err();

        assert!(matches!(err, SyncError::InstallFailed { .. }));
        assert!(source.fetched.borrow().is_empty());
    }
}
