//! `ifconfig` output parsing
//!
//! FreeBSD prints one unindented header line per interface followed by
//! tab-indented detail lines:
//!
//! ```text
//! em0: flags=8843<UP,BROADCAST,RUNNING,SIMPLEX,MULTICAST> metric 0 mtu 1500
//!         inet 203.0.113.5 netmask 0xffffff00 broadcast 203.0.113.255
//!         inet6 fe80::1%em0 prefixlen 64 scopeid 0x1
//!         inet6 2001:db8::5 prefixlen 64
//! ```

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::path::Path;

use gwddns_core::{Error, Result};
use regex::Regex;

/// One address line, attributed to its interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceAddress {
    pub interface: String,
    pub address: IpAddr,
}

/// Compiled line patterns
#[derive(Debug, Clone)]
pub struct IfconfigParser {
    inet: Regex,
    inet6: Regex,
}

impl IfconfigParser {
    pub fn new() -> Result<Self> {
        let compile = |pattern: &str| {
            Regex::new(pattern)
                .map_err(|e| Error::platform(format!("Invalid ifconfig pattern: {}", e)))
        };
        Ok(Self {
            inet: compile(r"\binet (\d{1,3}\.\d{1,3}\.\d{1,3}\.\d{1,3})")?,
            inet6: compile(r"\binet6 ([0-9a-fA-F:]+)")?,
        })
    }

    /// Every address in `output`, in order of appearance
    ///
    /// IPv6 scope suffixes (`%em0`) are dropped.
    pub fn parse(&self, output: &str) -> Vec<InterfaceAddress> {
        let mut addresses = Vec::new();
        let mut current: Option<&str> = None;

        for line in output.lines() {
            if line.is_empty() {
                continue;
            }
            if !line.starts_with(char::is_whitespace) {
                current = line.split_once(':').map(|(name, _)| name);
                continue;
            }
            let Some(interface) = current else {
                continue;
            };

            let address = self
                .inet
                .captures(line)
                .and_then(|c| c[1].parse::<Ipv4Addr>().ok().map(IpAddr::V4))
                .or_else(|| {
                    self.inet6
                        .captures(line)
                        .and_then(|c| c[1].parse::<Ipv6Addr>().ok().map(IpAddr::V6))
                });

            if let Some(address) = address {
                addresses.push(InterfaceAddress {
                    interface: interface.to_string(),
                    address,
                });
            }
        }

        addresses
    }
}

/// Whether `address` can be published
///
/// IPv4 excludes loopback, link-local and RFC 1918 space. IPv6 excludes
/// link-local (`fe80::/10`), unique-local (`fc00::/7`), `::1`, `::` and `::10`.
pub fn is_public(address: &IpAddr) -> bool {
    match address {
        IpAddr::V4(v4) => !(v4.is_loopback() || v4.is_link_local() || v4.is_private()),
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            let link_local = first & 0xffc0 == 0xfe80;
            let unique_local = first & 0xfe00 == 0xfc00;
            !(link_local
                || unique_local
                || v6.is_loopback()
                || v6.is_unspecified()
                || *v6 == Ipv6Addr::new(0, 0, 0, 0, 0, 0, 0, 0x10))
        }
    }
}

/// Run `ifconfig` and return its stdout
pub async fn run(binary: &Path) -> Result<String> {
    let output = tokio::process::Command::new(binary)
        .output()
        .await
        .map_err(|e| Error::platform(format!("Failed to run {}: {}", binary.display(), e)))?;

    if !output.status.success() {
        return Err(Error::platform(format!(
            "{} exited with {}",
            binary.display(),
            output.status
        )));
    }

    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}
