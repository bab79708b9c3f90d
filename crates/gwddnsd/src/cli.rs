//! Command line flags for both binaries

use std::path::PathBuf;

use clap::Parser;
use gwddns_core::{FamilyFilter, RunOptions};

/// Publish the addresses behind healthy gateways to DNS
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "gwddns", version)]
pub struct ReconcileArgs {
    /// Publish even when the healthy address sets did not change
    #[arg(long)]
    pub force_update: bool,

    /// Only publish and cache IPv4 addresses
    #[arg(long = "ipv4only", conflicts_with = "ipv6_only")]
    pub ipv4_only: bool,

    /// Only publish and cache IPv6 addresses
    #[arg(long = "ipv6only")]
    pub ipv6_only: bool,

    /// Reason for the run, logged only (e.g. Gateway-Event)
    #[arg(long, default_value = "Scheduled")]
    pub reason: String,

    /// Show what would be published without publishing
    #[arg(long)]
    pub dry_run: bool,

    /// Only log warnings and errors
    #[arg(long)]
    pub quiet: bool,
}

impl ReconcileArgs {
    pub fn run_options(&self) -> RunOptions {
        let family = if self.ipv4_only {
            FamilyFilter::V4Only
        } else if self.ipv6_only {
            FamilyFilter::V6Only
        } else {
            FamilyFilter::Both
        };

        RunOptions {
            force_update: self.force_update,
            family,
            reason: self.reason.clone(),
            dry_run: self.dry_run,
        }
    }
}

/// Watch gateway health and run the reconciler when it changes
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(name = "gwddns-watch", version)]
pub struct WatchArgs {
    /// Seconds between gateway polls (overrides GWDDNS_POLL_INTERVAL_SECS)
    #[arg(long)]
    pub interval_secs: Option<u64>,

    /// Seconds a triggered run may take (overrides GWDDNS_RUN_TIMEOUT_SECS)
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Reconciler binary to run (defaults to `gwddns` next to this binary)
    #[arg(long)]
    pub reconciler: Option<PathBuf>,

    /// Only log warnings and errors
    #[arg(long)]
    pub quiet: bool,
}
