use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::AppError;
use crate::models::ElementRole;
use crate::style::DefaultStyleTable;

/// Options for [`crate::readiness::await_ready`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReadinessConfig {
    /// Total budget for the page to become ready.
    pub max_wait_ms: u64,
    /// Delay between two observations.
    pub poll_interval_ms: u64,
    /// Root inner-markup length, in characters, below which the mount point
    /// counts as empty.
    pub min_root_content_length: usize,
    pub require_navigation_landmark: bool,
    /// The application's mount point.
    pub root_selector: String,
    /// The navigation landmark.
    pub navigation_selector: String,
}

impl ReadinessConfig {
    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for ReadinessConfig {
    fn default() -> Self {
        Self {
            max_wait_ms: 20_000,
            poll_interval_ms: 250,
            min_root_content_length: 100,
            require_navigation_landmark: true,
            root_selector: "#root".to_string(),
            navigation_selector: "nav".to_string(),
        }
    }
}

/// Browser window size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
        }
    }
}

impl std::str::FromStr for Viewport {
    type Err = String;

    /// Parses `WIDTHxHEIGHT`, e.g. `1280x720`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("Invalid viewport '{s}': expected WIDTHxHEIGHT"))?;
        let width = w
            .trim()
            .parse()
            .map_err(|_| format!("Invalid viewport width in '{s}'"))?;
        let height = h
            .trim()
            .parse()
            .map_err(|_| format!("Invalid viewport height in '{s}'"))?;
        Ok(Self { width, height })
    }
}

/// Complete harness configuration.
///
/// Every field has a default, so `HarnessConfig::default()` runs against a
/// local dev server with no further setup. JSON config files may specify
/// any subset of fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    pub target_url: String,
    /// Route paths, each run as an independent scenario.
    pub routes: Vec<String>,
    pub readiness: ReadinessConfig,
    pub flicker_interval_ms: u64,
    pub headless: bool,
    pub viewport: Viewport,
    /// Directory receiving one screenshot per scenario.
    pub screenshot_dir: PathBuf,
    /// Roles sampled by the style inspector.
    pub style_roles: Vec<ElementRole>,
    /// Text fragments identifying the page heading to sample.
    pub heading_probes: Vec<String>,
    /// Labels of which at least one should appear in the navigation.
    pub expected_nav_labels: Vec<String>,
    /// Substrings marking known-benign console errors.
    pub console_allow_list: Vec<String>,
    /// Visible-text fragments that indicate an error rendered on the page.
    pub page_error_markers: Vec<String>,
    pub default_styles: DefaultStyleTable,
    /// Upper bound for any single browser call.
    pub session_call_timeout_ms: u64,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            target_url: "http://localhost:4200".to_string(),
            routes: vec!["/".to_string(), "/settings".to_string()],
            readiness: ReadinessConfig::default(),
            flicker_interval_ms: 3_000,
            headless: true,
            viewport: Viewport::default(),
            screenshot_dir: std::env::temp_dir(),
            style_roles: ElementRole::ALL.to_vec(),
            heading_probes: vec!["Innstillinger".to_string(), "Settings".to_string()],
            expected_nav_labels: Vec::new(),
            console_allow_list: Vec::new(),
            page_error_markers: vec![
                "Failed to fetch".to_string(),
                "NetworkError".to_string(),
                "Error when attempting to fetch resource".to_string(),
            ],
            default_styles: DefaultStyleTable::default(),
            session_call_timeout_ms: 30_000,
        }
    }
}

impl HarnessConfig {
    /// Load a (possibly partial) JSON config file on top of the defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            AppError::ConfigError(format!("Failed to read config file {}: {e}", path.display()))
        })?;
        let config: Self = serde_json::from_str(&raw)?;
        Ok(config)
    }

    pub fn flicker_interval(&self) -> Duration {
        Duration::from_millis(self.flicker_interval_ms)
    }

    pub fn session_call_timeout(&self) -> Duration {
        Duration::from_millis(self.session_call_timeout_ms)
    }

    /// Reject configurations that cannot produce a meaningful run.
    pub fn validate(&self) -> Result<(), AppError> {
        let url = Url::parse(&self.target_url).map_err(|e| {
            AppError::ConfigError(format!("Invalid target URL '{}': {e}", self.target_url))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(AppError::ConfigError(format!(
                "Target URL scheme '{}' is not supported (only http/https)",
                url.scheme()
            )));
        }

        if self.routes.is_empty() {
            return Err(AppError::ConfigError("At least one route is required".into()));
        }
        if let Some(bad) = self.routes.iter().find(|r| !r.starts_with('/')) {
            return Err(AppError::ConfigError(format!(
                "Route '{bad}' must start with '/'"
            )));
        }

        if self.readiness.poll_interval_ms == 0 {
            return Err(AppError::ConfigError(
                "Poll interval must be at least 1 ms".into(),
            ));
        }
        if self.readiness.poll_interval_ms > self.readiness.max_wait_ms {
            return Err(AppError::ConfigError(format!(
                "Poll interval ({} ms) exceeds the readiness budget ({} ms)",
                self.readiness.poll_interval_ms, self.readiness.max_wait_ms
            )));
        }

        if self.viewport.width == 0 || self.viewport.height == 0 {
            return Err(AppError::ConfigError("Viewport must be non-empty".into()));
        }

        if self.session_call_timeout_ms == 0 {
            return Err(AppError::ConfigError(
                "Session call timeout must be at least 1 ms".into(),
            ));
        }

        Ok(())
    }

    /// Absolute URL for a configured route.
    pub fn route_url(&self, route: &str) -> Result<String, AppError> {
        let base = Url::parse(&self.target_url).map_err(|e| {
            AppError::ConfigError(format!("Invalid target URL '{}': {e}", self.target_url))
        })?;
        let joined = base
            .join(route)
            .map_err(|e| AppError::ConfigError(format!("Invalid route '{route}': {e}")))?;
        Ok(joined.to_string())
    }
}
