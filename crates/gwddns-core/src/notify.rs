//! Change notification helpers
//!
//! The reconciler builds one subject/body pair per published change and hands
//! it to a [`Notifier`].

use async_trait::async_trait;
use std::collections::BTreeSet;
use std::fmt::Display;
use std::net::{Ipv4Addr, Ipv6Addr};

use crate::error::Result;
use crate::traits::Notifier;

/// Subject line of every change notification
pub const NOTIFY_SUBJECT: &str = "DynDNS Gateway Update";

/// Body of a change notification
///
/// ```text
/// DynDNS for home.example.org. updated.
/// Healthy IPs:
/// IPv4: 198.51.100.7, 203.0.113.5
/// IPv6: 2001:db8::5
/// ```
pub fn change_body(
    record: &str,
    healthy_v4: &BTreeSet<Ipv4Addr>,
    healthy_v6: &BTreeSet<Ipv6Addr>,
) -> String {
    format!(
        "DynDNS for {} updated.\nHealthy IPs:\nIPv4: {}\nIPv6: {}",
        record,
        join(healthy_v4),
        join(healthy_v6)
    )
}

fn join<T: Display>(addresses: &BTreeSet<T>) -> String {
    addresses
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Notifier that only writes the notification to the log
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<()> {
        tracing::info!("{}: {}", subject, body.replace('\n', " | "));
        Ok(())
    }

    fn notifier_name(&self) -> &'static str {
        "log"
    }
}
