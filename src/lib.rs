//! # blocklist-sync
//!
//! Reconcile a DNS resolver's local configuration against a remotely
//! published domain blocklist.
//!
//! A pass checks preconditions (daemon installed, main config present),
//! fetches the sinkhole zone file and access-control fragment when
//! missing (or on explicit update), idempotently appends the include
//! directive to the main config, and restarts the daemon. Any failure
//! aborts the remaining steps; nothing already applied is rolled back.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use blocklist_sync::{HttpFetcher, Operation, Reconciler, RunContext, Systemctl};
//!
//! let ctx = RunContext::new();
//! let reconciler = Reconciler::new(&ctx, &HttpFetcher::new(), &Systemctl);
//!
//! // First-time setup or idempotent re-run.
//! let outcome = reconciler.execute(Operation::Run)?;
//!
//! // Force-refresh just the access-control file, no restart.
//! reconciler.execute(Operation::Update { zone: false, acl: true, restart: false })?;
//! ```
//!
//! ## Idempotence
//!
//! Re-running `Operation::Run` on a converged host fetches nothing and
//! appends nothing; it only restarts the daemon. The include directive
//! appears at most once in the main config no matter how many passes run.
//!
//! ## Permissions
//!
//! The default paths live under `/etc` and `/var`; the caller is
//! responsible for privilege elevation (`sudo`, a systemd timer unit
//! running as root, etc.).

#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions)]

pub mod context;
pub mod error;
pub mod fetch;
pub mod patch;
pub mod probe;
pub mod reconcile;
pub mod service;

pub use context::{Artifact, RunContext};
pub use error::{Result, SyncError};
pub use fetch::{ArtifactSource, HttpFetcher};
pub use probe::StateProbe;
pub use reconcile::{Operation, Outcome, Reconciler};
pub use service::{ServiceManager, Systemctl};
