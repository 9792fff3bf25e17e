use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use argus_core::error::AppError;
use argus_core::models::ConsoleEntry;
use argus_core::traits::{BrowserSession, SessionLauncher};
use chromiumoxide::cdp::browser_protocol::log::{EnableParams as LogEnableParams, EventEntryAdded};
use chromiumoxide::cdp::browser_protocol::page::{
    AddScriptToEvaluateOnNewDocumentParams, CaptureScreenshotFormat,
};
use chromiumoxide::error::CdpError;
use chromiumoxide::page::ScreenshotParams;
use chromiumoxide::{Browser, BrowserConfig, Element, Page};
use futures::StreamExt;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::chrome::{BrowserProcess, LaunchOptions, chrome_args, find_chrome_binary, shut_down};
use crate::console_capture::{
    CAPTURE_SCRIPT, DRAIN_EXPRESSION, log_entry, merge_entries, parse_entries,
};

/// A browser session backed by its own headless Chromium process, driven
/// over the Chrome DevTools Protocol.
///
/// Owns exactly one tab. The console recorder and the DevTools log listener
/// are installed before the first navigation, so messages logged while the
/// app boots are captured too. Every DevTools call is bounded by the launch
/// options' call timeout.
pub struct ChromiumSession {
    browser: Mutex<Browser>,
    page: Page,
    handler: JoinHandle<()>,
    /// Browser-level log entries, filled by `log_listener`.
    logged: Arc<Mutex<Vec<ConsoleEntry>>>,
    log_listener: JoinHandle<()>,
    call_timeout: Duration,
    closed: AtomicBool,
}

impl ChromiumSession {
    /// Launch Chromium and open a blank tab with the console recorder.
    ///
    /// Requires a Chromium / Chrome binary reachable via `$PATH`,
    /// `CHROME_BIN`, or one of the well-known install locations.
    pub async fn launch(options: &LaunchOptions) -> Result<Self, AppError> {
        let mut builder = BrowserConfig::builder()
            .no_sandbox()
            .disable_default_args()
            .viewport(None);

        if let Some(bin) = find_chrome_binary() {
            tracing::info!(path = %bin.display(), "Using Chrome binary");
            builder = builder.chrome_executable(bin);
        }
        if !options.headless {
            builder = builder.with_head();
        }
        for arg in chrome_args(options) {
            builder = builder.arg(arg);
        }

        let config = builder
            .build()
            .map_err(|e| AppError::TransportError(format!("Browser config error: {e}")))?;

        let (browser, mut handler) = bounded(
            options.call_timeout,
            Browser::launch(config),
            AppError::TransportError,
            "Failed to launch browser",
        )
        .await?;

        // The CDP handler must be polled continuously for the connection to work.
        let handler = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                if let Err(e) = event {
                    tracing::warn!(error = %e, "Browser CDP handler error");
                    break;
                }
            }
        });

        let page = bounded(
            options.call_timeout,
            browser.new_page("about:blank"),
            AppError::TransportError,
            "Failed to open tab",
        )
        .await?;

        bounded(
            options.call_timeout,
            page.evaluate_on_new_document(AddScriptToEvaluateOnNewDocumentParams::new(
                CAPTURE_SCRIPT,
            )),
            AppError::TransportError,
            "Failed to install console recorder",
        )
        .await?;

        let mut log_events = bounded(
            options.call_timeout,
            page.event_listener::<EventEntryAdded>(),
            AppError::TransportError,
            "Failed to subscribe to browser log",
        )
        .await?;
        bounded(
            options.call_timeout,
            page.execute(LogEnableParams::default()),
            AppError::TransportError,
            "Failed to enable browser log",
        )
        .await?;

        let logged = Arc::new(Mutex::new(Vec::new()));
        let sink = logged.clone();
        let log_listener = tokio::spawn(async move {
            while let Some(event) = log_events.next().await {
                let entry = &event.entry;
                let converted = log_entry(
                    entry.level.as_ref(),
                    &entry.text,
                    entry.url.as_deref(),
                    *entry.timestamp.inner(),
                );
                tracing::trace!(
                    level = %converted.level,
                    message = %converted.message,
                    "Browser log entry"
                );
                sink.lock().await.push(converted);
            }
        });

        tracing::debug!(
            headless = options.headless,
            width = options.viewport.width,
            height = options.viewport.height,
            "Browser session started"
        );

        Ok(Self {
            browser: Mutex::new(browser),
            page,
            handler,
            logged,
            log_listener,
            call_timeout: options.call_timeout,
            closed: AtomicBool::new(false),
        })
    }

    async fn call<T>(
        &self,
        fut: impl Future<Output = Result<T, CdpError>>,
        wrap: fn(String) -> AppError,
        what: &str,
    ) -> Result<T, AppError> {
        bounded(self.call_timeout, fut, wrap, what).await
    }
}

/// Run a DevTools call under `timeout`, mapping its error through `wrap`.
async fn bounded<T>(
    timeout: Duration,
    fut: impl Future<Output = Result<T, CdpError>>,
    wrap: fn(String) -> AppError,
    what: &str,
) -> Result<T, AppError> {
    match tokio::time::timeout(timeout, fut).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e)) => Err(wrap(format!("{what}: {e}"))),
        Err(_) => Err(AppError::Timeout(timeout.as_millis() as u64)),
    }
}

impl BrowserSession for ChromiumSession {
    type Element = Element;

    async fn navigate(&self, url: &str) -> Result<(), AppError> {
        tracing::debug!(%url, "Navigating");
        self.call(
            async { self.page.goto(url).await.map(|_| ()) },
            AppError::TransportError,
            &format!("Failed to navigate to {url}"),
        )
        .await
    }

    async fn query_selector(&self, selector: &str) -> Result<Option<Element>, AppError> {
        Ok(self.query_selector_all(selector).await?.into_iter().next())
    }

    async fn query_selector_all(&self, selector: &str) -> Result<Vec<Element>, AppError> {
        self.call(
            self.page.find_elements(selector),
            AppError::ScriptError,
            &format!("Query '{selector}' failed"),
        )
        .await
    }

    async fn computed_style(&self, element: &Element, property: &str) -> Result<String, AppError> {
        let function = format!(
            "function() {{ return window.getComputedStyle(this).getPropertyValue({}); }}",
            serde_json::to_string(property)?
        );
        let returns = self
            .call(
                element.call_js_fn(function, false),
                AppError::ScriptError,
                &format!("getComputedStyle({property}) failed"),
            )
            .await?;

        if let Some(details) = returns.exception_details {
            return Err(AppError::ScriptError(format!(
                "getComputedStyle({property}) threw: {}",
                details.text
            )));
        }
        Ok(returns
            .result
            .value
            .as_ref()
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .trim()
            .to_string())
    }

    async fn text(&self, element: &Element) -> Result<String, AppError> {
        let text = self
            .call(element.inner_text(), AppError::ScriptError, "Reading text failed")
            .await?;
        Ok(text.unwrap_or_default())
    }

    async fn attribute(&self, element: &Element, name: &str) -> Result<Option<String>, AppError> {
        self.call(
            element.attribute(name),
            AppError::ScriptError,
            &format!("Reading attribute '{name}' failed"),
        )
        .await
    }

    async fn inner_html(&self, element: &Element) -> Result<String, AppError> {
        let html = self
            .call(element.inner_html(), AppError::ScriptError, "Reading markup failed")
            .await?;
        Ok(html.unwrap_or_default())
    }

    async fn page_source(&self) -> Result<String, AppError> {
        self.call(
            self.page.content(),
            AppError::ScriptError,
            "Reading page source failed",
        )
        .await
    }

    async fn console_log(&self) -> Result<Vec<ConsoleEntry>, AppError> {
        let result = self
            .call(
                self.page.evaluate(DRAIN_EXPRESSION),
                AppError::ScriptError,
                "Reading console buffer failed",
            )
            .await?;
        let raw: String = result.into_value()?;
        let recorded = parse_entries(&raw)?;
        Ok(merge_entries(recorded, &self.logged.lock().await))
    }

    async fn screenshot(&self, path: &Path) -> Result<(), AppError> {
        let png = self
            .call(
                self.page.screenshot(
                    ScreenshotParams::builder()
                        .format(CaptureScreenshotFormat::Png)
                        .full_page(false)
                        .build(),
                ),
                AppError::ScreenshotError,
                "Capturing screenshot failed",
            )
            .await?;

        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                AppError::ScreenshotError(format!("Failed to create {}: {e}", dir.display()))
            })?;
        }
        tokio::fs::write(path, &png).await.map_err(|e| {
            AppError::ScreenshotError(format!("Failed to write {}: {e}", path.display()))
        })?;
        tracing::debug!(path = %path.display(), bytes = png.len(), "Screenshot written");
        Ok(())
    }

    async fn close(&self) -> Result<(), AppError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        if let Err(e) = self
            .call(self.page.clone().close(), AppError::TransportError, "Closing tab failed")
            .await
        {
            tracing::debug!(error = %e, "Closing tab failed");
        }

        let mut browser = self.browser.lock().await;
        let result = shut_down(&mut *browser, self.call_timeout).await;
        self.log_listener.abort();
        self.handler.abort();
        result
    }
}

impl BrowserProcess for Browser {
    async fn request_close(&mut self) -> Result<(), String> {
        Browser::close(self)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    async fn kill(&mut self) -> Result<(), String> {
        match Browser::kill(self).await {
            Some(Err(e)) => Err(e.to_string()),
            _ => Ok(()),
        }
    }

    async fn wait_exit(&mut self) -> Result<(), String> {
        Browser::wait(self)
            .await
            .map(|_| ())
            .map_err(|e| e.to_string())
    }
}

/// Starts a fresh Chromium for every scenario.
#[derive(Debug, Clone, Default)]
pub struct ChromiumLauncher {
    options: LaunchOptions,
}

impl ChromiumLauncher {
    pub fn new(options: LaunchOptions) -> Self {
        Self { options }
    }
}

impl SessionLauncher for ChromiumLauncher {
    type Session = ChromiumSession;

    async fn launch(&self) -> Result<ChromiumSession, AppError> {
        ChromiumSession::launch(&self.options).await
    }
}
