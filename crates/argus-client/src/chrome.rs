use std::future::Future;
use std::path::PathBuf;
use std::time::Duration;

use argus_core::config::{HarnessConfig, Viewport};
use argus_core::error::AppError;

/// How each browser is started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchOptions {
    pub headless: bool,
    pub viewport: Viewport,
    /// Upper bound for every single DevTools call, launch included.
    pub call_timeout: Duration,
}

impl Default for LaunchOptions {
    fn default() -> Self {
        Self::from(&HarnessConfig::default())
    }
}

impl From<&HarnessConfig> for LaunchOptions {
    fn from(config: &HarnessConfig) -> Self {
        Self {
            headless: config.headless,
            viewport: config.viewport,
            call_timeout: config.session_call_timeout(),
        }
    }
}

/// Command-line flags passed to Chromium on top of the launcher's own.
pub fn chrome_args(options: &LaunchOptions) -> Vec<String> {
    let mut args = Vec::with_capacity(8);
    if options.headless {
        args.push("--headless=new".to_string());
    }
    args.extend(
        [
            "--disable-gpu",
            "--disable-dev-shm-usage",
            "--disable-extensions",
            "--disable-popup-blocking",
            "--disable-translate",
            "--no-first-run",
        ]
        .map(String::from),
    );
    args.push(format!(
        "--window-size={},{}",
        options.viewport.width, options.viewport.height
    ));
    args
}

/// Tries to locate the real Chrome/Chromium binary.
///
/// On systems where Chromium is installed via **snap**, the wrapper at
/// `/snap/bin/chromium` strips unknown CLI flags, breaking headless mode.
/// We look for the real binary inside the snap first, then fall back to
/// well-known system paths. `CHROME_BIN` overrides all of them. If nothing
/// is found we return `None` and let `chromiumoxide` do its own lookup.
pub fn find_chrome_binary() -> Option<PathBuf> {
    let candidates: &[&str] = &[
        // Snap (Ubuntu default)
        "/snap/chromium/current/usr/lib/chromium-browser/chrome",
        // Flatpak
        "/var/lib/flatpak/exports/bin/org.chromium.Chromium",
        "/usr/bin/google-chrome-stable",
        "/usr/bin/google-chrome",
        "/usr/bin/chromium",
        "/usr/bin/chromium-browser",
    ];

    if let Ok(p) = std::env::var("CHROME_BIN") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
        tracing::warn!(path = %p, "CHROME_BIN does not exist, falling back to defaults");
    }

    candidates.iter().map(PathBuf::from).find(|p| p.exists())
}

/// The parts of a running browser process needed to shut it down.
pub trait BrowserProcess {
    /// Ask the browser to exit.
    fn request_close(&mut self) -> impl Future<Output = Result<(), String>> + Send;
    /// Kill the process outright.
    fn kill(&mut self) -> impl Future<Output = Result<(), String>> + Send;
    /// Wait for the process to exit.
    fn wait_exit(&mut self) -> impl Future<Output = Result<(), String>> + Send;
}

/// Close the browser, killing it if it does not close within `timeout`.
///
/// Every step is bounded by `timeout`, so a hung browser delays shutdown by
/// at most three timeouts. The error is the one from the close request.
pub async fn shut_down<B: BrowserProcess>(
    process: &mut B,
    timeout: Duration,
) -> Result<(), AppError> {
    let result = match tokio::time::timeout(timeout, process.request_close()).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(AppError::TransportError(format!("Closing browser failed: {e}"))),
        Err(_) => Err(AppError::Timeout(timeout.as_millis() as u64)),
    };

    if let Err(e) = &result {
        tracing::warn!(error = %e, "Browser did not close cleanly, killing it");
        match tokio::time::timeout(timeout, process.kill()).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "Killing browser failed"),
            Err(_) => tracing::warn!("Killing browser timed out"),
        }
    }

    match tokio::time::timeout(timeout, process.wait_exit()).await {
        Ok(Ok(())) => {}
        Ok(Err(e)) => tracing::debug!(error = %e, "Waiting for browser exit failed"),
        Err(_) => tracing::warn!("Browser process did not exit in time"),
    }
    result
}
