//! Subprocess run trigger
//!
//! The watcher starts each forced reconciliation as a separate `gwddns`
//! process and waits for it, bounded by a timeout. A run that overstays the
//! timeout is killed.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use gwddns_core::traits::{RunTrigger, TriggerRequest};
use gwddns_core::{Error, Result};
use tracing::{debug, info, warn};

/// Runs the reconciler binary once per trigger
#[derive(Debug, Clone)]
pub struct CommandTrigger {
    program: PathBuf,
    timeout: Duration,
}

impl CommandTrigger {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// `gwddns` next to the running executable
    pub fn sibling_reconciler() -> Result<PathBuf> {
        let current = std::env::current_exe()?;
        Ok(current.with_file_name("gwddns"))
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Command line flags for `request`
    pub fn args(request: &TriggerRequest) -> Vec<String> {
        let mut args = Vec::new();
        if request.force_update {
            args.push("--force-update".to_string());
        }
        args.push(format!("--reason={}", request.reason));
        if request.ipv4_only {
            args.push("--ipv4only".to_string());
        }
        args
    }
}

#[async_trait]
impl RunTrigger for CommandTrigger {
    async fn trigger(&self, request: &TriggerRequest) -> Result<()> {
        let args = Self::args(request);
        info!("Running {} {}", self.program.display(), args.join(" "));

        let child = tokio::process::Command::new(&self.program)
            .args(&args)
            .kill_on_drop(true)
            .output();

        // Dropping the output future on timeout kills the child
        let output = match tokio::time::timeout(self.timeout, child).await {
            Ok(result) => result.map_err(|e| {
                Error::Other(format!("Failed to run {}: {}", self.program.display(), e))
            })?,
            Err(_) => {
                return Err(Error::Other(format!(
                    "{} did not finish within {:?} and was killed",
                    self.program.display(),
                    self.timeout
                )));
            }
        };

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            debug!("reconciler: {}", line);
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!("Reconciler stderr: {}", stderr.trim());
            return Err(Error::Other(format!(
                "{} exited with {}",
                self.program.display(),
                output.status
            )));
        }

        Ok(())
    }
}
