use std::path::{Path, PathBuf};

use crate::config::HarnessConfig;
use crate::console;
use crate::error::AppError;
use crate::flicker::{self, FlickerSummary};
use crate::models::{ConsoleEntry, InspectionError};
use crate::readiness::{ReadinessResult, await_ready};
use crate::style::StyleInspector;
use crate::traits::{BrowserSession, SessionLauncher};
use crate::translation;
use crate::verdict::{
    CONSOLE_ERROR_SAMPLE, CONSOLE_WARNING_SAMPLE, ConsoleCounts, Diagnostics, Findings,
    NavLabelCheck, RunMeta, VerificationReport, aggregate,
};

/// Elements whose text is audited for untranslated labels.
pub const NAV_LABEL_SELECTOR: &str = "nav a, header a";

/// Events emitted while a scenario runs, for monitoring/logging.
#[derive(Debug, Clone)]
pub enum ScenarioEvent<'a> {
    Started {
        scenario: &'a str,
        url: &'a str,
    },
    Navigated {
        scenario: &'a str,
    },
    Ready {
        scenario: &'a str,
        result: &'a ReadinessResult,
    },
    ReadinessFailed {
        scenario: &'a str,
        result: &'a ReadinessResult,
    },
    InspectionFinished {
        scenario: &'a str,
        inspector: &'a str,
    },
    ScreenshotSaved {
        scenario: &'a str,
        path: &'a Path,
    },
    Finished {
        scenario: &'a str,
        passed: bool,
        failures: usize,
    },
}

impl ScenarioEvent<'_> {
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioEvent::Started { .. } => "started",
            ScenarioEvent::Navigated { .. } => "navigated",
            ScenarioEvent::Ready { .. } => "ready",
            ScenarioEvent::ReadinessFailed { .. } => "readiness_failed",
            ScenarioEvent::InspectionFinished { .. } => "inspection_finished",
            ScenarioEvent::ScreenshotSaved { .. } => "screenshot_saved",
            ScenarioEvent::Finished { .. } => "finished",
        }
    }
}

/// Trait for receiving scenario events (decoupled logging).
pub trait ScenarioReporter: Send + Sync {
    fn report(&self, event: ScenarioEvent<'_>) {
        let _ = event;
    }
}

/// Reporter that uses the `tracing` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingScenarioReporter;

impl ScenarioReporter for TracingScenarioReporter {
    fn report(&self, event: ScenarioEvent<'_>) {
        match event {
            ScenarioEvent::Started { scenario, url } => {
                tracing::info!(%scenario, %url, "Scenario started");
            }
            ScenarioEvent::Navigated { scenario } => {
                tracing::debug!(%scenario, "Navigation complete");
            }
            ScenarioEvent::Ready { scenario, result } => {
                tracing::info!(
                    %scenario,
                    elapsed_ms = result.elapsed_ms,
                    attempts = result.attempts,
                    "Page ready"
                );
            }
            ScenarioEvent::ReadinessFailed { scenario, result } => {
                tracing::warn!(
                    %scenario,
                    elapsed_ms = result.elapsed_ms,
                    content_length = ?result.last_content_length,
                    "Page never became ready, skipping inspectors"
                );
            }
            ScenarioEvent::InspectionFinished {
                scenario,
                inspector,
            } => {
                tracing::debug!(%scenario, %inspector, "Inspection finished");
            }
            ScenarioEvent::ScreenshotSaved { scenario, path } => {
                tracing::info!(%scenario, path = %path.display(), "Screenshot saved");
            }
            ScenarioEvent::Finished {
                scenario,
                passed,
                failures,
            } => {
                if passed {
                    tracing::info!(%scenario, "Scenario passed");
                } else {
                    tracing::warn!(%scenario, %failures, "Scenario failed");
                }
            }
        }
    }
}

/// Derive a scenario name from a route path.
///
/// Example: `"/"` → `"root"`, `"/settings"` → `"settings"`,
/// `"/admin/users/"` → `"admin-users"`.
pub fn scenario_name(route: &str) -> String {
    let trimmed = route.trim_matches('/');
    if trimmed.is_empty() {
        "root".to_string()
    } else {
        trimmed.replace('/', "-")
    }
}

/// Well-known screenshot location for a scenario. Overwritten on every run.
pub fn screenshot_path(dir: &Path, scenario: &str) -> PathBuf {
    dir.join(format!("argus-{scenario}.png"))
}

/// Drives one fresh browser session per route through the inspection
/// pipeline: navigate → wait ready → inspect → aggregate.
///
/// Generic over the session source so tests can run without a browser.
pub struct ScenarioRunner<L: SessionLauncher> {
    launcher: L,
    config: HarnessConfig,
}

impl<L: SessionLauncher> ScenarioRunner<L> {
    pub fn new(launcher: L, config: HarnessConfig) -> Self {
        Self { launcher, config }
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    /// Run every configured route in order, each with its own session.
    pub async fn run_all<R: ScenarioReporter>(
        &self,
        reporter: &R,
    ) -> Result<Vec<VerificationReport>, AppError> {
        let mut reports = Vec::with_capacity(self.config.routes.len());
        for route in &self.config.routes {
            reports.push(self.run_route(route, reporter).await?);
        }
        Ok(reports)
    }

    /// Run a single route.
    ///
    /// Only configuration errors are returned as `Err`; everything that
    /// happens once a session is involved ends up in the report. The session
    /// is closed on every path.
    pub async fn run_route<R: ScenarioReporter>(
        &self,
        route: &str,
        reporter: &R,
    ) -> Result<VerificationReport, AppError> {
        let url = self.config.route_url(route)?;
        let scenario = scenario_name(route);
        let meta = RunMeta::new(&scenario, route, &url);

        reporter.report(ScenarioEvent::Started {
            scenario: &scenario,
            url: &url,
        });

        let report = match self.launcher.launch().await {
            Ok(session) => {
                let report = self.drive(&session, meta, reporter).await;
                if let Err(e) = session.close().await {
                    tracing::warn!(%scenario, error = %e, "Failed to close browser session");
                }
                report
            }
            Err(e) => {
                tracing::error!(%scenario, error = %e, "Failed to start browser session");
                VerificationReport::transport_failure(meta, e.to_string(), Diagnostics::default())
            }
        };

        reporter.report(ScenarioEvent::Finished {
            scenario: &scenario,
            passed: report.overall_pass,
            failures: report.failures.len(),
        });
        Ok(report)
    }

    async fn drive<S: BrowserSession, R: ScenarioReporter>(
        &self,
        session: &S,
        meta: RunMeta,
        reporter: &R,
    ) -> VerificationReport {
        let config = &self.config;
        let scenario = meta.scenario.clone();

        if let Err(e) = session.navigate(&meta.url).await {
            tracing::error!(%scenario, url = %meta.url, error = %e, "Navigation failed");
            return VerificationReport::transport_failure(
                meta,
                e.to_string(),
                Diagnostics::default(),
            );
        }
        reporter.report(ScenarioEvent::Navigated {
            scenario: &scenario,
        });

        let readiness = await_ready(session, &config.readiness).await;
        let mut diagnostics = Diagnostics {
            readiness_elapsed_ms: Some(readiness.elapsed_ms),
            readiness_attempts: Some(readiness.attempts),
            root_content_length: readiness.last_content_length,
            ..Default::default()
        };

        if readiness.session_lost {
            let message = readiness.last_error.clone().unwrap_or_default();
            tracing::error!(
                %scenario,
                error = %message,
                "Browser session lost before the page was ready"
            );
            return VerificationReport::transport_failure(meta, message, diagnostics);
        }
        if !readiness.ready {
            reporter.report(ScenarioEvent::ReadinessFailed {
                scenario: &scenario,
                result: &readiness,
            });
            let (page_text, markup_length) = page_evidence(session).await;
            diagnostics.page_text_excerpt = Diagnostics::excerpt(&page_text);
            diagnostics.markup_length = markup_length;
            diagnostics.screenshot = self.capture_screenshot(session, &scenario, reporter).await;
            return aggregate(meta, readiness, Findings::default(), diagnostics);
        }
        reporter.report(ScenarioEvent::Ready {
            scenario: &scenario,
            result: &readiness,
        });

        let inspector = StyleInspector::new(&config.default_styles, &config.heading_probes);
        let (style, nav_texts, console_entries) = tokio::join!(
            inspector.inspect(session, &config.style_roles),
            nav_label_texts(session),
            session.console_log(),
        );

        let mut findings = Findings {
            style,
            ..Default::default()
        };
        reporter.report(ScenarioEvent::InspectionFinished {
            scenario: &scenario,
            inspector: "style",
        });

        match nav_texts {
            Ok(texts) => {
                findings.translations = translation::audit(&texts);
                if !config.expected_nav_labels.is_empty() {
                    findings.nav_labels =
                        Some(check_nav_labels(&config.expected_nav_labels, &texts));
                }
            }
            Err(e) => {
                tracing::warn!(%scenario, error = %e, "Failed to read navigation labels");
                findings
                    .inspection_errors
                    .push(InspectionError::new("translation", &e));
            }
        }
        reporter.report(ScenarioEvent::InspectionFinished {
            scenario: &scenario,
            inspector: "translation",
        });

        match console_entries {
            Ok(entries) => findings.console = console::audit(&entries, &config.console_allow_list),
            Err(e) => {
                tracing::warn!(%scenario, error = %e, "Failed to read console log");
                findings
                    .inspection_errors
                    .push(InspectionError::new("console", &e));
            }
        }
        reporter.report(ScenarioEvent::InspectionFinished {
            scenario: &scenario,
            inspector: "console",
        });

        if let Some(message) = fatal_error(&findings) {
            tracing::error!(%scenario, error = %message, "Browser session lost during inspection");
            return VerificationReport::transport_failure(meta, message, diagnostics);
        }

        match flicker::detect(session, &config.readiness, config.flicker_interval()).await {
            Ok(result) => findings.flicker = Some(FlickerSummary::from(&result)),
            Err(e) => {
                tracing::warn!(%scenario, error = %e, "Flicker detection failed");
                findings
                    .inspection_errors
                    .push(InspectionError::new("flicker", &e));
            }
        }
        reporter.report(ScenarioEvent::InspectionFinished {
            scenario: &scenario,
            inspector: "flicker",
        });

        if let Some(message) = fatal_error(&findings) {
            tracing::error!(%scenario, error = %message, "Browser session lost during inspection");
            return VerificationReport::transport_failure(meta, message, diagnostics);
        }

        let (page_text, markup_length) = page_evidence(session).await;
        findings.page_error_text = config
            .page_error_markers
            .iter()
            .filter(|marker| page_text.contains(marker.as_str()))
            .cloned()
            .collect();
        for marker in &findings.page_error_text {
            tracing::warn!(%scenario, %marker, "Error text visible on page");
        }

        diagnostics.page_text_excerpt = Diagnostics::excerpt(&page_text);
        diagnostics.markup_length = markup_length;
        diagnostics.console_counts = ConsoleCounts::from(&findings.console);
        diagnostics.console_error_sample =
            sample_messages(&findings.console.errors, CONSOLE_ERROR_SAMPLE);
        diagnostics.console_warning_sample =
            sample_messages(&findings.console.warnings, CONSOLE_WARNING_SAMPLE);
        diagnostics.screenshot = self.capture_screenshot(session, &scenario, reporter).await;

        aggregate(meta, readiness, findings, diagnostics)
    }

    async fn capture_screenshot<S: BrowserSession, R: ScenarioReporter>(
        &self,
        session: &S,
        scenario: &str,
        reporter: &R,
    ) -> Option<PathBuf> {
        let path = screenshot_path(&self.config.screenshot_dir, scenario);
        match session.screenshot(&path).await {
            Ok(()) => {
                reporter.report(ScenarioEvent::ScreenshotSaved {
                    scenario,
                    path: &path,
                });
                Some(path)
            }
            Err(e) => {
                tracing::warn!(%scenario, path = %path.display(), error = %e, "Screenshot failed");
                None
            }
        }
    }
}

/// Visible text of every navigation label, trimmed, empty ones dropped.
async fn nav_label_texts<S: BrowserSession>(session: &S) -> Result<Vec<String>, AppError> {
    let mut texts = Vec::new();
    for element in session.query_selector_all(NAV_LABEL_SELECTOR).await? {
        let text = session.text(&element).await?;
        let text = text.trim();
        if !text.is_empty() {
            texts.push(text.to_string());
        }
    }
    Ok(texts)
}

/// Which expected labels occur in the navigation text (case-insensitive).
fn check_nav_labels(expected: &[String], texts: &[String]) -> NavLabelCheck {
    let haystack: Vec<String> = texts.iter().map(|t| t.to_lowercase()).collect();
    let found = expected
        .iter()
        .filter(|label| {
            let label = label.to_lowercase();
            haystack.iter().any(|t| t.contains(&label))
        })
        .cloned()
        .collect();
    NavLabelCheck {
        expected: expected.to_vec(),
        found,
    }
}

/// Message of the first inspector error that left the session unusable.
fn fatal_error(findings: &Findings) -> Option<String> {
    findings
        .style
        .errors
        .iter()
        .chain(&findings.inspection_errors)
        .find(|e| e.fatal)
        .map(|e| e.message.clone())
}

/// Body text and total markup length. Read failures degrade to empty.
async fn page_evidence<S: BrowserSession>(session: &S) -> (String, usize) {
    let text = match session.query_selector("body").await {
        Ok(Some(body)) => session.text(&body).await.unwrap_or_default(),
        _ => String::new(),
    };
    let markup_length = session.page_source().await.map(|s| s.chars().count()).unwrap_or(0);
    (text, markup_length)
}

fn sample_messages(entries: &[ConsoleEntry], limit: usize) -> Vec<String> {
    entries.iter().take(limit).map(|e| e.message.clone()).collect()
}
