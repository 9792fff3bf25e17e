use thiserror::Error;

/// Application-wide error types for Argus.
#[derive(Error, Debug)]
pub enum AppError {
    /// The browser could not be launched, navigation failed outright,
    /// or the session died mid-run.
    #[error("Transport error: {0}")]
    TransportError(String),

    /// The page never reached the readiness condition within budget.
    #[error(
        "Page not ready after {elapsed_ms} ms (last root content length: {last_content_length:?})"
    )]
    ReadinessTimeout {
        elapsed_ms: u64,
        last_content_length: Option<usize>,
    },

    /// A DOM or computed-style read failed.
    #[error("Script error: {0}")]
    ScriptError(String),

    /// Writing the screenshot artifact failed.
    #[error("Screenshot error: {0}")]
    ScreenshotError(String),

    /// Invalid configuration.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// JSON serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// A single session call exceeded its budget.
    #[error("Session call timed out after {0} ms")]
    Timeout(u64),
}

impl AppError {
    /// Returns true if this error terminates the scenario without running
    /// the remaining inspectors.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            AppError::TransportError(_) | AppError::ReadinessTimeout { .. } | AppError::Timeout(_)
        )
    }

    /// Short machine-friendly tag, used in reports.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::TransportError(_) => "transport_failure",
            AppError::ReadinessTimeout { .. } => "readiness_timeout",
            AppError::ScriptError(_) => "script_error",
            AppError::ScreenshotError(_) => "screenshot_error",
            AppError::ConfigError(_) => "config_error",
            AppError::SerializationError(_) => "serialization_error",
            AppError::Timeout(_) => "timeout",
        }
    }
}
