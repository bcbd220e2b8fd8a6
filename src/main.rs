use blocklist_sync::{HttpFetcher, Operation, Reconciler, RunContext, Systemctl};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "blocklist-sync", version, about = "Sync a resolver's domain blocklist")]
struct Cli {
    #[arg(long, global = true, help = "Main config file of the resolver daemon")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Destination path of the zone data file")]
    zone_file: Option<PathBuf>,
    #[arg(long, global = true, help = "Destination path of the access-control file")]
    acl_file: Option<PathBuf>,
    #[arg(long, global = true, help = "Remote locator for the zone data")]
    zone_url: Option<String>,
    #[arg(long, global = true, help = "Remote locator for the access-control file")]
    acl_url: Option<String>,
    #[arg(long, global = true, help = "Daemon binary probed for on PATH")]
    daemon: Option<String>,
    #[arg(long, global = true, help = "Service unit name to restart")]
    service: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Full pass: fetch missing artifacts, patch the config, restart.
    Run {
        #[arg(
            long,
            value_name = "COMMAND",
            help = "Shell command to install the daemon if it is missing"
        )]
        install_missing: Option<String>,
    },
    /// Force re-fetch of the blocklist artifacts (both when no flag is given).
    Update {
        #[arg(long, help = "Refresh only the zone data file")]
        zone: bool,
        #[arg(long, help = "Refresh only the access-control file")]
        acl: bool,
        #[arg(long, help = "Restart the daemon after a successful refresh")]
        restart: bool,
    },
    /// Ensure the include directive is present. No fetch, no restart.
    Check,
}

fn build_context(cli: &Cli) -> RunContext {
    let mut ctx = RunContext::new();
    if let Some(path) = &cli.config {
        ctx = ctx.with_main_config(path);
    }
    if let Some(path) = &cli.zone_file {
        ctx = ctx.with_zone_file(path);
    }
    if let Some(path) = &cli.acl_file {
        ctx = ctx.with_acl_file(path);
    }
    if let Some(url) = &cli.zone_url {
        ctx = ctx.with_zone_url(url.as_str());
    }
    if let Some(url) = &cli.acl_url {
        ctx = ctx.with_acl_url(url.as_str());
    }
    if let Some(daemon) = &cli.daemon {
        ctx = ctx.with_daemon_binary(daemon.as_str());
    }
    if let Some(service) = &cli.service {
        ctx = ctx.with_service(service.as_str());
    }
    if let Commands::Run {
        install_missing: Some(command),
    } = &cli.command
    {
        ctx = ctx.with_install_command(command.as_str());
    }
    ctx
}

fn operation(command: &Commands) -> Operation {
    match command {
        Commands::Run { .. } => Operation::Run,
        Commands::Check => Operation::Check,
        Commands::Update { zone, acl, restart } => {
            // No selection flag means refresh everything.
            let both = !zone && !acl;
            Operation::Update {
                zone: *zone || both,
                acl: *acl || both,
                restart: *restart,
            }
        }
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let ctx = build_context(&cli);
    let op = operation(&cli.command);

    let fetcher = HttpFetcher::new();
    let reconciler = Reconciler::new(&ctx, &fetcher, &Systemctl);
    match reconciler.execute(op) {
        Ok(outcome) => {
            tracing::info!(
                fetched = outcome.fetched.len(),
                directive_appended = outcome.directive_appended,
                restarted = outcome.restarted,
                "Reconciliation complete"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Reconciliation failed");
            if e.is_restart_failure() {
                tracing::warn!(
                    "Config and artifacts are up to date; restart the service manually"
                );
            }
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_without_flags_selects_both() {
        let cli = Cli::parse_from(["blocklist-sync", "update"]);
        assert_eq!(
            operation(&cli.command),
            Operation::Update {
                zone: true,
                acl: true,
                restart: false
            }
        );
    }

    #[test]
    fn update_acl_only() {
        let cli = Cli::parse_from(["blocklist-sync", "update", "--acl"]);
        assert_eq!(
            operation(&cli.command),
            Operation::Update {
                zone: false,
                acl: true,
                restart: false
            }
        );
    }

    #[test]
    fn global_overrides_reach_the_context() {
        let cli = Cli::parse_from([
            "blocklist-sync",
            "--config",
            "/etc/bind/named.conf",
            "--service",
            "bind9",
            "run",
        ]);
        let ctx = build_context(&cli);
        assert_eq!(ctx.main_config, PathBuf::from("/etc/bind/named.conf"));
        assert_eq!(ctx.service_name, "bind9");
    }

    #[test]
    fn install_missing_flag_sets_install_command() {
        let cli = Cli::parse_from([
            "blocklist-sync",
            "run",
            "--install-missing",
            "dnf install -y bind",
        ]);
        let ctx = build_context(&cli);
        assert_eq!(ctx.install_command.as_deref(), Some("dnf install -y bind"));
    }
}
