//! Combines inspector findings into the final pass/fail report.
//!
//! Hard failures: page not ready, load-bearing element unstyled or absent,
//! untranslated label, unsuppressed console error. Flicker is attached to
//! the report but never fails a run on its own.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::console::ConsoleAudit;
use crate::error::AppError;
use crate::flicker::FlickerSummary;
use crate::models::{
    ClassifiedSample, ConsoleEntry, ElementRole, InspectionError, TranslationFinding,
};
use crate::readiness::ReadinessResult;
use crate::style::StyleReport;
use crate::translation::untranslated;

/// Why a run failed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailureReason {
    Transport {
        message: String,
    },
    NotReady {
        elapsed_ms: u64,
        last_content_length: Option<usize>,
    },
    DefaultStyling {
        role: ElementRole,
        property: String,
        value: String,
    },
    MissingElement {
        role: ElementRole,
    },
    Untranslated {
        text: String,
    },
    ConsoleError {
        message: String,
    },
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::Transport { message } => write!(f, "transport failure: {message}"),
            FailureReason::NotReady {
                elapsed_ms,
                last_content_length,
            } => write!(
                f,
                "page not ready after {elapsed_ms} ms (root content length: {})",
                last_content_length.map_or("none".to_string(), |l| l.to_string())
            ),
            FailureReason::DefaultStyling {
                role,
                property,
                value,
            } => write!(f, "{role} uses browser default {property}: {value}"),
            FailureReason::MissingElement { role } => write!(f, "no {role} element on page"),
            FailureReason::Untranslated { text } => write!(f, "untranslated label '{text}'"),
            FailureReason::ConsoleError { message } => write!(f, "console error: {message}"),
        }
    }
}

/// Findings worth surfacing that do not fail the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Advisory {
    Flicker {
        elapsed_ms: u64,
    },
    DefaultStyling {
        role: ElementRole,
        property: String,
        value: String,
    },
    MissingElement {
        role: ElementRole,
    },
    NavLabelsMissing {
        expected: Vec<String>,
    },
    PageErrorText {
        marker: String,
    },
    InspectionFailed {
        inspector: String,
        message: String,
    },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::Flicker { elapsed_ms } => {
                write!(f, "page markup changed within {elapsed_ms} ms (possible flicker)")
            }
            Advisory::DefaultStyling {
                role,
                property,
                value,
            } => write!(f, "{role} uses browser default {property}: {value}"),
            Advisory::MissingElement { role } => write!(f, "no {role} element on page"),
            Advisory::NavLabelsMissing { expected } => write!(
                f,
                "none of the expected navigation labels found: {}",
                expected.join(", ")
            ),
            Advisory::PageErrorText { marker } => write!(f, "page shows error text '{marker}'"),
            Advisory::InspectionFailed { inspector, message } => {
                write!(f, "{inspector} inspection failed: {message}")
            }
        }
    }
}

/// The pass/fail rule.
///
/// True iff the page became ready, no load-bearing role is default-styled or
/// absent, no text looks untranslated and no console error remains.
/// `flicker_detected` is accepted but never consulted.
pub fn overall_pass(
    readiness: &ReadinessResult,
    style: &StyleReport,
    flicker_detected: bool,
    translations: &[TranslationFinding],
    console_errors: &[ConsoleEntry],
) -> bool {
    let _ = flicker_detected;
    readiness.ready
        && !style.has_load_bearing_failure()
        && !translations.iter().any(|t| t.looks_untranslated)
        && console_errors.is_empty()
}

/// Identity and timing of one scenario run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunMeta {
    pub run_id: Uuid,
    pub scenario: String,
    pub route: String,
    pub url: String,
    pub started_at: DateTime<Utc>,
}

impl RunMeta {
    pub fn new(scenario: &str, route: &str, url: &str) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            scenario: scenario.to_string(),
            route: route.to_string(),
            url: url.to_string(),
            started_at: Utc::now(),
        }
    }
}

/// Result of the optional expected-navigation-label check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavLabelCheck {
    pub expected: Vec<String>,
    pub found: Vec<String>,
}

/// Console entry counts per bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ConsoleCounts {
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
    pub suppressed: usize,
}

impl From<&ConsoleAudit> for ConsoleCounts {
    fn from(audit: &ConsoleAudit) -> Self {
        Self {
            errors: audit.errors.len(),
            warnings: audit.warnings.len(),
            infos: audit.infos.len(),
            suppressed: audit.suppressed.len(),
        }
    }
}

pub const PAGE_TEXT_EXCERPT_CHARS: usize = 1000;
pub const CONSOLE_ERROR_SAMPLE: usize = 10;
pub const CONSOLE_WARNING_SAMPLE: usize = 5;

/// Evidence for reproducing a failure without re-running.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub page_text_excerpt: String,
    pub markup_length: usize,
    pub readiness_elapsed_ms: Option<u64>,
    pub readiness_attempts: Option<u32>,
    pub root_content_length: Option<usize>,
    pub console_counts: ConsoleCounts,
    pub console_error_sample: Vec<String>,
    pub console_warning_sample: Vec<String>,
    pub screenshot: Option<PathBuf>,
}

impl Diagnostics {
    /// Cap page text to the excerpt length on a char boundary.
    pub fn excerpt(text: &str) -> String {
        text.chars().take(PAGE_TEXT_EXCERPT_CHARS).collect()
    }
}

/// Everything the inspectors produced for one loaded page.
#[derive(Debug, Clone, Default)]
pub struct Findings {
    pub style: StyleReport,
    pub flicker: Option<FlickerSummary>,
    pub translations: Vec<TranslationFinding>,
    pub console: ConsoleAudit,
    pub nav_labels: Option<NavLabelCheck>,
    pub page_error_text: Vec<String>,
    pub inspection_errors: Vec<InspectionError>,
}

/// The single externally visible artifact of a scenario run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationReport {
    #[serde(flatten)]
    pub meta: RunMeta,
    pub finished_at: DateTime<Utc>,
    pub readiness_ok: bool,
    pub readiness: Option<ReadinessResult>,
    pub style_findings: Vec<ClassifiedSample>,
    pub missing_roles: Vec<ElementRole>,
    pub flicker_detected: bool,
    pub flicker: Option<FlickerSummary>,
    pub translation_findings: Vec<TranslationFinding>,
    pub console_errors: Vec<ConsoleEntry>,
    pub nav_labels: Option<NavLabelCheck>,
    pub failures: Vec<FailureReason>,
    pub advisories: Vec<Advisory>,
    pub diagnostics: Diagnostics,
    pub overall_pass: bool,
}

/// Build the report for a page that loaded (or failed to become ready).
///
/// Only reads its inputs. When `readiness.ready` is false the other findings
/// are expected to be empty, and the result is always a failure.
pub fn aggregate(
    meta: RunMeta,
    readiness: ReadinessResult,
    findings: Findings,
    diagnostics: Diagnostics,
) -> VerificationReport {
    let flicker_detected = findings.flicker.as_ref().is_some_and(|f| f.changed);
    let pass = overall_pass(
        &readiness,
        &findings.style,
        flicker_detected,
        &findings.translations,
        &findings.console.errors,
    );

    let mut failures = Vec::new();
    let mut advisories = Vec::new();

    match readiness.to_error() {
        Some(AppError::ReadinessTimeout {
            elapsed_ms,
            last_content_length,
        }) => failures.push(FailureReason::NotReady {
            elapsed_ms,
            last_content_length,
        }),
        Some(e) => failures.push(FailureReason::Transport {
            message: readiness.last_error.clone().unwrap_or_else(|| e.to_string()),
        }),
        None => {}
    }

    failures.extend(
        findings
            .style
            .hard_failures()
            .map(|s| FailureReason::DefaultStyling {
                role: s.sample.role,
                property: s.sample.property.clone(),
                value: s.sample.value.clone(),
            }),
    );
    failures.extend(
        findings
            .style
            .missing_load_bearing()
            .map(|role| FailureReason::MissingElement { role }),
    );
    advisories.extend(
        findings
            .style
            .advisories()
            .map(|s| Advisory::DefaultStyling {
                role: s.sample.role,
                property: s.sample.property.clone(),
                value: s.sample.value.clone(),
            }),
    );
    advisories.extend(
        findings
            .style
            .missing_roles
            .iter()
            .filter(|role| !role.is_load_bearing())
            .map(|&role| Advisory::MissingElement { role }),
    );

    failures.extend(
        untranslated(&findings.translations).map(|t| FailureReason::Untranslated {
            text: t.text.clone(),
        }),
    );
    failures.extend(
        findings
            .console
            .errors
            .iter()
            .map(|e| FailureReason::ConsoleError {
                message: e.message.clone(),
            }),
    );

    if let Some(flicker) = findings.flicker.as_ref().filter(|f| f.changed) {
        advisories.push(Advisory::Flicker {
            elapsed_ms: flicker.elapsed_ms,
        });
    }
    if let Some(check) = findings.nav_labels.as_ref().filter(|c| c.found.is_empty()) {
        advisories.push(Advisory::NavLabelsMissing {
            expected: check.expected.clone(),
        });
    }
    advisories.extend(
        findings
            .page_error_text
            .iter()
            .map(|marker| Advisory::PageErrorText {
                marker: marker.clone(),
            }),
    );
    advisories.extend(
        findings
            .style
            .errors
            .iter()
            .chain(&findings.inspection_errors)
            .map(|e| Advisory::InspectionFailed {
                inspector: e.inspector.clone(),
                message: e.message.clone(),
            }),
    );

    debug_assert_eq!(pass, failures.is_empty());

    VerificationReport {
        meta,
        finished_at: Utc::now(),
        readiness_ok: readiness.ready,
        readiness: Some(readiness),
        style_findings: findings.style.samples,
        missing_roles: findings.style.missing_roles,
        flicker_detected,
        flicker: findings.flicker,
        translation_findings: findings.translations,
        console_errors: findings.console.errors,
        nav_labels: findings.nav_labels,
        failures,
        advisories,
        diagnostics,
        overall_pass: pass,
    }
}

impl VerificationReport {
    /// Report for a scenario whose session could not be created or navigated.
    pub fn transport_failure(meta: RunMeta, message: String, diagnostics: Diagnostics) -> Self {
        Self {
            meta,
            finished_at: Utc::now(),
            readiness_ok: false,
            readiness: None,
            style_findings: Vec::new(),
            missing_roles: Vec::new(),
            flicker_detected: false,
            flicker: None,
            translation_findings: Vec::new(),
            console_errors: Vec::new(),
            nav_labels: None,
            failures: vec![FailureReason::Transport { message }],
            advisories: Vec::new(),
            diagnostics,
            overall_pass: false,
        }
    }

    pub fn to_json_pretty(&self) -> Result<String, AppError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl fmt::Display for VerificationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.overall_pass { "PASS" } else { "FAIL" };
        writeln!(f, "== {} [{}] {}", self.meta.scenario, status, self.meta.url)?;
        writeln!(f, "   run id:       {}", self.meta.run_id)?;

        match &self.readiness {
            Some(r) => writeln!(
                f,
                "   readiness:    {} after {} ms, {} probes, root content {}",
                if r.ready { "ready" } else { "NOT READY" },
                r.elapsed_ms,
                r.attempts,
                r.last_content_length
                    .map_or("missing".to_string(), |l| format!("{l} chars")),
            )?,
            None => writeln!(f, "   readiness:    not reached")?,
        }

        if !self.style_findings.is_empty() {
            writeln!(f, "   styles:")?;
            for s in &self.style_findings {
                writeln!(
                    f,
                    "     {:<9} {:<17} {:<7} {}",
                    s.sample.role.as_str(),
                    s.sample.property,
                    s.verdict.to_string(),
                    s.sample.value
                )?;
            }
        }

        if !self.translation_findings.is_empty() {
            let labels: Vec<String> = self
                .translation_findings
                .iter()
                .map(|t| {
                    if t.looks_untranslated {
                        format!("{} (UNTRANSLATED)", t.text)
                    } else {
                        t.text.clone()
                    }
                })
                .collect();
            writeln!(f, "   nav labels:   {}", labels.join(", "))?;
        }

        if let Some(flicker) = &self.flicker {
            writeln!(
                f,
                "   flicker:      {} over {} ms",
                if flicker.changed { "markup changed" } else { "stable" },
                flicker.elapsed_ms
            )?;
        }

        let c = &self.diagnostics.console_counts;
        writeln!(
            f,
            "   console:      {} errors, {} warnings, {} info, {} suppressed",
            c.errors, c.warnings, c.infos, c.suppressed
        )?;
        for msg in &self.diagnostics.console_error_sample {
            writeln!(f, "     error: {msg}")?;
        }
        for msg in &self.diagnostics.console_warning_sample {
            writeln!(f, "     warning: {msg}")?;
        }

        if let Some(path) = &self.diagnostics.screenshot {
            writeln!(f, "   screenshot:   {}", path.display())?;
        }

        for failure in &self.failures {
            writeln!(f, "   FAIL: {failure}")?;
        }
        for advisory in &self.advisories {
            writeln!(f, "   note: {advisory}")?;
        }

        if !self.overall_pass && !self.diagnostics.page_text_excerpt.is_empty() {
            writeln!(f, "   page text ({} chars of markup):", self.diagnostics.markup_length)?;
            for line in self
                .diagnostics
                .page_text_excerpt
                .lines()
                .filter(|l| !l.trim().is_empty())
            {
                writeln!(f, "     | {}", line.trim())?;
            }
        }
        Ok(())
    }
}
