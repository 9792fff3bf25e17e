use std::future::Future;
use std::path::Path;
use std::time::Duration;

use crate::error::AppError;
use crate::models::ConsoleEntry;

/// A single browser tab driven by one scenario.
///
/// Implementations are stateful and not shared: a session belongs to exactly
/// one scenario run and is closed when that run ends. All query methods are
/// read-only against the page; only [`navigate`](Self::navigate) mutates it.
pub trait BrowserSession: Send + Sync {
    /// Opaque handle to a DOM element returned by the selector queries.
    type Element: Send + Sync;

    /// Load `url` in the tab. Failure here is a transport failure.
    fn navigate(&self, url: &str) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Real-time delay. Overridable so fakes can observe requested waits.
    fn wait(&self, duration: Duration) -> impl Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    /// First element matching `selector` in document order.
    fn query_selector(
        &self,
        selector: &str,
    ) -> impl Future<Output = Result<Option<Self::Element>, AppError>> + Send;

    /// Every element matching `selector`, in document order.
    fn query_selector_all(
        &self,
        selector: &str,
    ) -> impl Future<Output = Result<Vec<Self::Element>, AppError>> + Send;

    /// Computed value of a CSS property (`getComputedStyle`), as the browser
    /// serializes it (e.g. `rgb(0, 0, 238)`).
    fn computed_style(
        &self,
        element: &Self::Element,
        property: &str,
    ) -> impl Future<Output = Result<String, AppError>> + Send;

    /// Rendered text of an element.
    fn text(
        &self,
        element: &Self::Element,
    ) -> impl Future<Output = Result<String, AppError>> + Send;

    /// Value of an HTML attribute, `None` when absent.
    fn attribute(
        &self,
        element: &Self::Element,
        name: &str,
    ) -> impl Future<Output = Result<Option<String>, AppError>> + Send;

    /// Serialized inner markup of an element.
    fn inner_html(
        &self,
        element: &Self::Element,
    ) -> impl Future<Output = Result<String, AppError>> + Send;

    /// Full serialized markup of the current document.
    fn page_source(&self) -> impl Future<Output = Result<String, AppError>> + Send;

    /// Console messages captured since navigation, oldest first.
    fn console_log(&self) -> impl Future<Output = Result<Vec<ConsoleEntry>, AppError>> + Send;

    /// Write a PNG screenshot of the viewport to `path`, overwriting it.
    fn screenshot(&self, path: &Path) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Release the tab and any browser process owned by this session.
    fn close(&self) -> impl Future<Output = Result<(), AppError>> + Send;
}

/// Acquires a fresh [`BrowserSession`] for each scenario.
///
/// Replaces process-wide browser singletons: every call hands out a new,
/// independent session that the caller must close.
pub trait SessionLauncher: Send + Sync {
    type Session: BrowserSession;

    fn launch(&self) -> impl Future<Output = Result<Self::Session, AppError>> + Send;
}
