//! dpinger status reading
//!
//! pfSense runs one dpinger per monitored gateway. Each instance serves its
//! current status on a unix socket named
//! `dpinger_<gateway>~<source>~<monitor>.sock`; connecting yields a single
//! line `<name> <latency_avg_us> <latency_stddev_us> <loss_pct>`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use gwddns_core::health::ProbeReading;
use gwddns_core::{Error, Result};
use tokio::io::AsyncReadExt;
use tracing::{debug, warn};

/// Upper bound for reading one status socket
pub const PROBE_READ_TIMEOUT: Duration = Duration::from_secs(2);

const SOCKET_PREFIX: &str = "dpinger_";
const SOCKET_SUFFIX: &str = ".sock";

/// Gateway name encoded in a status socket file name
///
/// Returns `None` for files that are not dpinger sockets.
pub fn gateway_name(file_name: &str) -> Option<&str> {
    let rest = file_name
        .strip_prefix(SOCKET_PREFIX)?
        .strip_suffix(SOCKET_SUFFIX)?;
    let name = rest.split('~').next().unwrap_or(rest);
    (!name.is_empty()).then_some(name)
}

/// Parse one status line
pub fn parse_status_line(line: &str) -> ProbeReading {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 4 {
        return ProbeReading::invalid(format!("expected 4 fields, got {}", fields.len()));
    }

    match (fields[1].parse::<u64>(), fields[3].parse::<u32>()) {
        (Ok(latency_us), Ok(loss_pct)) => ProbeReading::sample(latency_us, loss_pct),
        _ => ProbeReading::invalid(format!("non-numeric status '{}'", line.trim())),
    }
}

/// Status sockets in `dir`, keyed by gateway name
pub async fn find_sockets(dir: &Path) -> Result<Vec<(String, PathBuf)>> {
    let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
        Error::platform(format!("Failed to list probe directory {}: {}", dir.display(), e))
    })?;

    let mut sockets = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let file_name = entry.file_name();
        if let Some(name) = file_name.to_str().and_then(gateway_name) {
            sockets.push((name.to_string(), entry.path()));
        }
    }
    sockets.sort();
    Ok(sockets)
}

/// Read the first status line from a socket (or a plain status file)
async fn read_status(path: &Path) -> Result<String> {
    let metadata = tokio::fs::metadata(path).await?;

    let raw = if metadata.is_file() {
        tokio::fs::read_to_string(path).await?
    } else {
        let mut stream = tokio::net::UnixStream::connect(path).await?;
        let mut raw = String::new();
        stream.read_to_string(&mut raw).await?;
        raw
    };

    Ok(raw.lines().next().unwrap_or_default().to_string())
}

/// Read every status socket in `dir`
///
/// A socket that cannot be read in time is reported as an invalid reading
/// for its gateway; only an unreadable directory fails the whole call.
pub async fn read_probes(dir: &Path) -> Result<HashMap<String, ProbeReading>> {
    let mut readings = HashMap::new();

    for (gateway, path) in find_sockets(dir).await? {
        let reading = match tokio::time::timeout(PROBE_READ_TIMEOUT, read_status(&path)).await {
            Ok(Ok(line)) => parse_status_line(&line),
            Ok(Err(e)) => ProbeReading::invalid(format!("read failed: {}", e)),
            Err(_) => ProbeReading::invalid("read timed out"),
        };

        if let ProbeReading::Invalid { reason } = &reading {
            warn!("Could not read status for {}, assuming down: {}", gateway, reason);
        } else {
            debug!("Probe {}: {:?}", gateway, reading);
        }
        readings.insert(gateway, reading);
    }

    Ok(readings)
}
