pub mod chrome;
pub mod console_capture;
#[cfg(feature = "browser")]
pub mod session;

pub use chrome::LaunchOptions;
#[cfg(feature = "browser")]
pub use session::{ChromiumLauncher, ChromiumSession};
