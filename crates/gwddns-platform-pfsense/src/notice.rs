//! pfSense system notices
//!
//! Notices show up in the web UI bell menu and go out through whatever
//! notification channels (SMTP, Pushover, Telegram) the firewall has set up.

use std::path::PathBuf;

use async_trait::async_trait;
use gwddns_core::traits::Notifier;
use gwddns_core::{Error, Result};
use tracing::debug;

const NOTICE_ID: &str = "dynupdate";
const NOTICE_CATEGORY: &str = "DynDNS";

/// Files notices through pfSense's PHP notice API
#[derive(Debug, Clone)]
pub struct PfSenseNotifier {
    php_path: PathBuf,
}

impl PfSenseNotifier {
    pub fn new(php_path: impl Into<PathBuf>) -> Self {
        Self {
            php_path: php_path.into(),
        }
    }

    /// PHP snippet filing `message` as a notice
    pub fn php_code(message: &str) -> String {
        format!(
            r#"require_once("/etc/inc/notices.inc"); file_notice("{}", "{}", "{}", "", 1, false);"#,
            NOTICE_ID,
            escape(message),
            NOTICE_CATEGORY
        )
    }
}

/// Make `message` safe inside a double-quoted PHP string
fn escape(message: &str) -> String {
    message
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('$', "\\$")
        .replace('`', "'")
}

#[async_trait]
impl Notifier for PfSenseNotifier {
    async fn notify(&self, subject: &str, body: &str) -> Result<()> {
        debug!("Filing pfSense notice '{}'", subject);

        let output = tokio::process::Command::new(&self.php_path)
            .arg("-r")
            .arg(Self::php_code(body))
            .output()
            .await
            .map_err(|e| {
                Error::notify(format!("Failed to run {}: {}", self.php_path.display(), e))
            })?;

        if !output.status.success() {
            return Err(Error::notify(format!(
                "php exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }

    fn notifier_name(&self) -> &'static str {
        "pfsense"
    }
}
