//! One-time installation of the headless browser runtime.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::error::ScraperError;

/// Shown when no browser binary is available and auto-install is off or
/// failed.
pub const MISSING_BROWSER_WARNING: &str = "Headless Chrome is not available. \
Set MENUSCAN_AUTO_INSTALL_BROWSER=true to install it automatically, or point \
MENUSCAN_CHROME_PATH at an existing Chrome/Chromium binary.";

/// Runs the configured install command at most once per process.
#[derive(Debug)]
pub struct BrowserProvisioner {
    install_cmd: String,
    attempted: AtomicBool,
}

impl BrowserProvisioner {
    #[must_use]
    pub fn new(install_cmd: impl Into<String>) -> Self {
        Self {
            install_cmd: install_cmd.into(),
            attempted: AtomicBool::new(false),
        }
    }

    /// Runs the install command unless it already ran. Returns `Ok(false)`
    /// when a previous call already made the attempt.
    ///
    /// # Errors
    ///
    /// Returns [`ScraperError::Provisioning`] if the command is empty, cannot
    /// be spawned, or exits unsuccessfully.
    pub async fn provision_once(&self) -> Result<bool, ScraperError> {
        if self.attempted.swap(true, Ordering::SeqCst) {
            return Ok(false);
        }

        let mut parts = self.install_cmd.split_whitespace();
        let Some(program) = parts.next() else {
            return Err(ScraperError::Provisioning(
                "browser install command is empty".to_owned(),
            ));
        };

        tracing::info!(command = %self.install_cmd, "installing headless browser runtime");
        let output = tokio::process::Command::new(program)
            .args(parts)
            .output()
            .await
            .map_err(|e| ScraperError::Provisioning(format!("could not run {program}: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: String = stderr.trim().chars().take(500).collect();
            return Err(ScraperError::Provisioning(format!(
                "install command exited with {}: {tail}",
                output.status
            )));
        }

        tracing::info!("headless browser runtime installed");
        Ok(true)
    }
}

/// Heuristic for launch failures caused by a missing browser binary.
#[must_use]
pub fn is_missing_browser_error(err: &ScraperError) -> bool {
    let ScraperError::Browser(message) = err else {
        return false;
    };
    let lower = message.to_ascii_lowercase();
    [
        "could not auto detect",
        "executable",
        "no such file",
        "not found",
    ]
    .iter()
    .any(|needle| lower.contains(needle))
}
