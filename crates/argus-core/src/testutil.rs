//! Test utilities: in-memory browser session, launcher and reporter.
//!
//! Handwritten fakes for dependency injection in unit tests.
//! All fakes use `Arc<Mutex<_>>` for interior mutability, allowing
//! test assertions on recorded calls.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use crate::error::AppError;
use crate::models::ConsoleEntry;
use crate::scenario::{ScenarioEvent, ScenarioReporter};
use crate::traits::{BrowserSession, SessionLauncher};

// ---------------------------------------------------------------------------
// FakeElement
// ---------------------------------------------------------------------------

/// Description of one element in the fake DOM.
#[derive(Debug, Clone, Default)]
pub struct FakeElement {
    text: String,
    styles: HashMap<String, String>,
    attributes: HashMap<String, String>,
    /// Successive `inner_html` reads pop from the front; the last one sticks.
    html_frames: VecDeque<String>,
    /// Number of queries for its selector that must happen before it exists.
    hidden_for_queries: usize,
}

impl FakeElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, text: &str) -> Self {
        self.text = text.to_string();
        self
    }

    pub fn style(mut self, property: &str, value: &str) -> Self {
        self.styles.insert(property.to_string(), value.to_string());
        self
    }

    pub fn attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    /// Inner markup of exactly `len` characters.
    pub fn content_length(self, len: usize) -> Self {
        self.html_frames(vec![len])
    }

    /// Fixed inner markup.
    pub fn html(mut self, markup: &str) -> Self {
        self.html_frames = VecDeque::from([markup.to_string()]);
        self
    }

    /// Inner markup whose length changes on every read.
    pub fn html_frames(mut self, lengths: Vec<usize>) -> Self {
        self.html_frames = lengths.into_iter().map(|n| "x".repeat(n)).collect();
        self
    }

    /// Element only shows up after `n` queries for its selector.
    pub fn appears_after(mut self, n: usize) -> Self {
        self.hidden_for_queries = n;
        self
    }
}

/// Handle into the fake DOM: (selector, index within that selector).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FakeHandle {
    selector: String,
    index: usize,
}

// ---------------------------------------------------------------------------
// FakeSession
// ---------------------------------------------------------------------------

#[derive(Default)]
struct FakePage {
    elements: HashMap<String, Vec<FakeElement>>,
    query_counts: HashMap<String, usize>,
    sources: VecDeque<String>,
    console: Vec<ConsoleEntry>,
    navigate_error: Option<AppError>,
    console_error: Option<AppError>,
    inner_html_error: Option<AppError>,
    query_error: Option<String>,
    failing_styles: Vec<String>,
}

/// In-memory [`BrowserSession`] with scripted content.
///
/// Elements are registered per selector string; a query returns whatever
/// was registered under that exact selector.
#[derive(Clone, Default)]
pub struct FakeSession {
    page: Arc<Mutex<FakePage>>,
    pub calls: Arc<Mutex<Vec<String>>>,
    pub waits: Arc<Mutex<Vec<Duration>>>,
    pub screenshots: Arc<Mutex<Vec<PathBuf>>>,
    pub closed: Arc<AtomicBool>,
}

impl FakeSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_element(self, selector: &str, element: FakeElement) -> Self {
        self.page
            .lock()
            .unwrap()
            .elements
            .entry(selector.to_string())
            .or_default()
            .push(element);
        self
    }

    /// Root mount point (`#root`) holding `len` characters of markup.
    pub fn with_root(self, len: usize) -> Self {
        self.with_element("#root", FakeElement::new().content_length(len))
    }

    /// Navigation landmark (`nav`).
    pub fn with_nav(self) -> Self {
        self.with_element("nav", FakeElement::new().text("nav"))
    }

    /// Successive `page_source` reads pop from the front; the last one sticks.
    pub fn with_page_sources(self, sources: Vec<&str>) -> Self {
        self.page.lock().unwrap().sources = sources.into_iter().map(String::from).collect();
        self
    }

    pub fn with_console(self, entries: Vec<ConsoleEntry>) -> Self {
        self.page.lock().unwrap().console = entries;
        self
    }

    pub fn with_navigate_error(self, error: AppError) -> Self {
        self.page.lock().unwrap().navigate_error = Some(error);
        self
    }

    /// The next console read fails with `error`.
    pub fn with_console_error(self, error: AppError) -> Self {
        self.page.lock().unwrap().console_error = Some(error);
        self
    }

    /// Every query fails with a transport error, as after a browser crash.
    pub fn with_query_error(self, message: &str) -> Self {
        self.page.lock().unwrap().query_error = Some(message.to_string());
        self
    }

    /// The next `inner_html` read fails with `error`.
    pub fn with_inner_html_error_once(self, error: AppError) -> Self {
        self.page.lock().unwrap().inner_html_error = Some(error);
        self
    }

    /// Computed-style reads for `property` fail with a script error.
    pub fn with_failing_style(self, property: &str) -> Self {
        self.page
            .lock()
            .unwrap()
            .failing_styles
            .push(property.to_string());
        self
    }

    pub fn was_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn called(&self, prefix: &str) -> bool {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .any(|c| c.starts_with(prefix))
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn visible(page: &mut FakePage, selector: &str) -> Vec<usize> {
        let seen = page.query_counts.entry(selector.to_string()).or_insert(0);
        *seen += 1;
        let seen = *seen;
        page.elements
            .get(selector)
            .map(|els| {
                els.iter()
                    .enumerate()
                    .filter(|(_, el)| seen > el.hidden_for_queries)
                    .map(|(i, _)| i)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn with_el<T>(&self, handle: &FakeHandle, f: impl FnOnce(&mut FakeElement) -> T) -> T {
        let mut page = self.page.lock().unwrap();
        let el = page
            .elements
            .get_mut(&handle.selector)
            .and_then(|els| els.get_mut(handle.index))
            .expect("fake handle points at a registered element");
        f(el)
    }
}

impl BrowserSession for FakeSession {
    type Element = FakeHandle;

    async fn navigate(&self, url: &str) -> Result<(), AppError> {
        self.record(format!("navigate {url}"));
        match self.page.lock().unwrap().navigate_error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn wait(&self, duration: Duration) {
        self.waits.lock().unwrap().push(duration);
        tokio::time::sleep(duration).await;
    }

    async fn query_selector(&self, selector: &str) -> Result<Option<FakeHandle>, AppError> {
        self.record(format!("query {selector}"));
        let mut page = self.page.lock().unwrap();
        if let Some(message) = &page.query_error {
            return Err(AppError::TransportError(message.clone()));
        }
        Ok(Self::visible(&mut page, selector)
            .first()
            .map(|&index| FakeHandle {
                selector: selector.to_string(),
                index,
            }))
    }

    async fn query_selector_all(&self, selector: &str) -> Result<Vec<FakeHandle>, AppError> {
        self.record(format!("query_all {selector}"));
        let mut page = self.page.lock().unwrap();
        if let Some(message) = &page.query_error {
            return Err(AppError::TransportError(message.clone()));
        }
        Ok(Self::visible(&mut page, selector)
            .into_iter()
            .map(|index| FakeHandle {
                selector: selector.to_string(),
                index,
            })
            .collect())
    }

    async fn computed_style(
        &self,
        element: &FakeHandle,
        property: &str,
    ) -> Result<String, AppError> {
        self.record(format!("style {} {property}", element.selector));
        if self
            .page
            .lock()
            .unwrap()
            .failing_styles
            .iter()
            .any(|p| p == property)
        {
            return Err(AppError::ScriptError(format!(
                "getComputedStyle failed for {property}"
            )));
        }
        Ok(self.with_el(element, |el| {
            el.styles.get(property).cloned().unwrap_or_default()
        }))
    }

    async fn text(&self, element: &FakeHandle) -> Result<String, AppError> {
        self.record(format!("text {}", element.selector));
        Ok(self.with_el(element, |el| el.text.clone()))
    }

    async fn attribute(
        &self,
        element: &FakeHandle,
        name: &str,
    ) -> Result<Option<String>, AppError> {
        self.record(format!("attribute {} {name}", element.selector));
        Ok(self.with_el(element, |el| el.attributes.get(name).cloned()))
    }

    async fn inner_html(&self, element: &FakeHandle) -> Result<String, AppError> {
        self.record(format!("inner_html {}", element.selector));
        if let Some(e) = self.page.lock().unwrap().inner_html_error.take() {
            return Err(e);
        }
        Ok(self.with_el(element, |el| {
            if el.html_frames.len() > 1 {
                el.html_frames.pop_front().unwrap_or_default()
            } else {
                el.html_frames.front().cloned().unwrap_or_default()
            }
        }))
    }

    async fn page_source(&self) -> Result<String, AppError> {
        self.record("page_source".to_string());
        let mut page = self.page.lock().unwrap();
        if page.sources.len() > 1 {
            Ok(page.sources.pop_front().unwrap_or_default())
        } else {
            Ok(page
                .sources
                .front()
                .cloned()
                .unwrap_or_else(|| "<html><body><div id=\"root\"></div></body></html>".into()))
        }
    }

    async fn console_log(&self) -> Result<Vec<ConsoleEntry>, AppError> {
        self.record("console_log".to_string());
        let mut page = self.page.lock().unwrap();
        match page.console_error.take() {
            Some(e) => Err(e),
            None => Ok(page.console.clone()),
        }
    }

    async fn screenshot(&self, path: &Path) -> Result<(), AppError> {
        self.record(format!("screenshot {}", path.display()));
        self.screenshots.lock().unwrap().push(path.to_path_buf());
        Ok(())
    }

    async fn close(&self) -> Result<(), AppError> {
        self.record("close".to_string());
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// FakeLauncher
// ---------------------------------------------------------------------------

/// Launcher that hands out one pre-built session per call.
#[derive(Clone)]
pub struct FakeLauncher {
    sessions: Arc<Mutex<VecDeque<Result<FakeSession, AppError>>>>,
    pub launched: Arc<Mutex<Vec<FakeSession>>>,
}

impl FakeLauncher {
    pub fn new(sessions: Vec<FakeSession>) -> Self {
        Self::with_results(sessions.into_iter().map(Ok).collect())
    }

    pub fn with_results(results: Vec<Result<FakeSession, AppError>>) -> Self {
        Self {
            sessions: Arc::new(Mutex::new(results.into())),
            launched: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

impl SessionLauncher for FakeLauncher {
    type Session = FakeSession;

    async fn launch(&self) -> Result<FakeSession, AppError> {
        let next = self.sessions.lock().unwrap().pop_front();
        match next {
            Some(Ok(session)) => {
                self.launched.lock().unwrap().push(session.clone());
                Ok(session)
            }
            Some(Err(e)) => Err(e),
            None => Err(AppError::TransportError("no more fake sessions".into())),
        }
    }
}

// ---------------------------------------------------------------------------
// RecordingReporter
// ---------------------------------------------------------------------------

/// Reporter that keeps a textual trace of every scenario event.
#[derive(Clone, Default)]
pub struct RecordingReporter {
    pub events: Arc<Mutex<Vec<String>>>,
}

impl ScenarioReporter for RecordingReporter {
    fn report(&self, event: ScenarioEvent<'_>) {
        self.events.lock().unwrap().push(event.name().to_string());
    }
}
