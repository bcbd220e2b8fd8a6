//! Run configuration.

use std::fmt;
use std::path::{Path, PathBuf};

/// Default main configuration file of the resolver daemon.
const DEFAULT_MAIN_CONFIG: &str = "/etc/named.conf";

/// Default path of the sinkhole zone data file.
const DEFAULT_ZONE_FILE: &str = "/var/named/blackhole.zone";

/// Default path of the blocked-domains access-control fragment.
const DEFAULT_ACL_FILE: &str = "/etc/named/blocked-domains.conf";

/// Default remote locator for the zone data.
const DEFAULT_ZONE_URL: &str = "https://mirror1.malwaredomains.com/files/blackhole.zone";

/// Default remote locator for the access-control fragment.
const DEFAULT_ACL_URL: &str = "https://mirror1.malwaredomains.com/files/spywaredomains.zones";

/// The two remote artifacts a run keeps in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    /// Sinkhole zone data loaded by the daemon.
    Zone,
    /// Access-control fragment included from the main config.
    Acl,
}

impl Artifact {
    /// Both artifacts, in fetch order.
    #[must_use]
    pub const fn all() -> [Self; 2] {
        [Self::Zone, Self::Acl]
    }
}

impl fmt::Display for Artifact {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Zone => f.write_str("zone file"),
            Self::Acl => f.write_str("access-control file"),
        }
    }
}

/// Immutable configuration for a single reconciliation pass.
///
/// Created once at process start and passed by reference to every
/// component; nothing in the crate reads global state.
///
/// # Example
///
/// ```
/// use blocklist_sync::RunContext;
///
/// let ctx = RunContext::new()
///     .with_main_config("/etc/bind/named.conf")
///     .with_service("bind9");
///
/// assert_eq!(ctx.service_name, "bind9");
/// ```
#[derive(Debug, Clone)]
pub struct RunContext {
    /// The daemon's main configuration file; must already exist.
    pub main_config: PathBuf,

    /// Destination path of the zone data file.
    pub zone_file: PathBuf,

    /// Destination path of the access-control fragment.
    pub acl_file: PathBuf,

    /// Remote locator for the zone data.
    pub zone_url: String,

    /// Remote locator for the access-control fragment.
    pub acl_url: String,

    /// Daemon binary probed for on `PATH`.
    pub daemon_binary: String,

    /// Service unit name passed to the service manager.
    pub service_name: String,

    /// Operator-supplied shell command to install the daemon when the
    /// binary is absent. `None` means a missing daemon is fatal.
    pub install_command: Option<String>,
}

impl RunContext {
    /// Creates a context with the built-in defaults (a BIND host).
    #[must_use]
    pub fn new() -> Self {
        Self {
            main_config: PathBuf::from(DEFAULT_MAIN_CONFIG),
            zone_file: PathBuf::from(DEFAULT_ZONE_FILE),
            acl_file: PathBuf::from(DEFAULT_ACL_FILE),
            zone_url: DEFAULT_ZONE_URL.to_string(),
            acl_url: DEFAULT_ACL_URL.to_string(),
            daemon_binary: "named".to_string(),
            service_name: "named".to_string(),
            install_command: None,
        }
    }

    /// Overrides the main configuration file path.
    #[must_use]
    pub fn with_main_config(mut self, path: impl Into<PathBuf>) -> Self {
        self.main_config = path.into();
        self
    }

    /// Overrides the zone file destination path.
    #[must_use]
    pub fn with_zone_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.zone_file = path.into();
        self
    }

    /// Overrides the access-control file destination path.
    #[must_use]
    pub fn with_acl_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.acl_file = path.into();
        self
    }

    /// Overrides the zone data locator.
    #[must_use]
    pub fn with_zone_url(mut self, url: impl Into<String>) -> Self {
        self.zone_url = url.into();
        self
    }

    /// Overrides the access-control locator.
    #[must_use]
    pub fn with_acl_url(mut self, url: impl Into<String>) -> Self {
        self.acl_url = url.into();
        self
    }

    /// Overrides the daemon binary name.
    #[must_use]
    pub fn with_daemon_binary(mut self, binary: impl Into<String>) -> Self {
        self.daemon_binary = binary.into();
        self
    }

    /// Overrides the service unit name.
    #[must_use]
    pub fn with_service(mut self, service: impl Into<String>) -> Self {
        self.service_name = service.into();
        self
    }

    /// Sets the opt-in daemon install command.
    #[must_use]
    pub fn with_install_command(mut self, command: impl Into<String>) -> Self {
        self.install_command = Some(command.into());
        self
    }

    /// The include line the main config must carry, derived from the
    /// configured access-control path.
    #[must_use]
    pub fn include_directive(&self) -> String {
        format!("include \"{}\";", self.acl_file.display())
    }

    /// Destination path for `artifact`.
    #[must_use]
    pub fn artifact_path(&self, artifact: Artifact) -> &Path {
        match artifact {
            Artifact::Zone => &self.zone_file,
            Artifact::Acl => &self.acl_file,
        }
    }

    /// Remote locator for `artifact`.
    #[must_use]
    pub fn artifact_url(&self, artifact: Artifact) -> &str {
        match artifact {
            Artifact::Zone => &self.zone_url,
            Artifact::Acl => &self.acl_url,
        }
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new()
    }
}
