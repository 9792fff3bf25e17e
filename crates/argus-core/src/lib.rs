pub mod config;
pub mod console;
pub mod error;
pub mod flicker;
pub mod models;
pub mod poll;
pub mod readiness;
pub mod scenario;
pub mod style;
pub mod traits;
pub mod translation;
pub mod verdict;

#[cfg(test)]
pub mod testutil;

pub use config::{HarnessConfig, ReadinessConfig, Viewport};
pub use error::AppError;
pub use models::{ConsoleEntry, ConsoleLevel, ElementRole, compute_hash};
pub use scenario::{ScenarioReporter, ScenarioRunner, TracingScenarioReporter};
pub use style::DefaultStyleTable;
pub use traits::{BrowserSession, SessionLauncher};
pub use verdict::VerificationReport;
