use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

use crate::config::ReadinessConfig;
use crate::error::AppError;
use crate::models::{PageSnapshot, now_ms};
use crate::traits::BrowserSession;

/// Two snapshots of the same page taken `interval` apart.
///
/// `changed` only states that the raw markup differs. Whether that matters
/// is the caller's call: clocks, live data and animations all change markup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlickerResult {
    pub before: PageSnapshot,
    pub after: PageSnapshot,
    pub changed: bool,
    pub elapsed: Duration,
}

/// Report-friendly view of a [`FlickerResult`], without the full markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlickerSummary {
    pub changed: bool,
    pub elapsed_ms: u64,
    pub digest_before: String,
    pub digest_after: String,
    pub markup_length_before: usize,
    pub markup_length_after: usize,
}

impl From<&FlickerResult> for FlickerSummary {
    fn from(result: &FlickerResult) -> Self {
        Self {
            changed: result.changed,
            elapsed_ms: result.elapsed.as_millis() as u64,
            digest_before: result.before.digest(),
            digest_after: result.after.digest(),
            markup_length_before: result.before.raw_markup.chars().count(),
            markup_length_after: result.after.raw_markup.chars().count(),
        }
    }
}

/// Capture the full page state once.
pub async fn capture_snapshot<S: BrowserSession>(
    session: &S,
    readiness: &ReadinessConfig,
) -> Result<PageSnapshot, AppError> {
    let timestamp_ms = now_ms();
    let raw_markup = session.page_source().await?;
    let root_content_length = match session.query_selector(&readiness.root_selector).await? {
        Some(root) => session.inner_html(&root).await?.chars().count(),
        None => 0,
    };
    let has_navigation = session
        .query_selector(&readiness.navigation_selector)
        .await?
        .is_some();

    Ok(PageSnapshot {
        timestamp_ms,
        raw_markup,
        root_content_length,
        has_navigation,
    })
}

/// Snapshot, wait `interval`, snapshot again, and compare raw markup.
pub async fn detect<S: BrowserSession>(
    session: &S,
    readiness: &ReadinessConfig,
    interval: Duration,
) -> Result<FlickerResult, AppError> {
    let started = Instant::now();
    let before = capture_snapshot(session, readiness).await?;
    session.wait(interval).await;
    let after = capture_snapshot(session, readiness).await?;
    let elapsed = started.elapsed();

    let changed = before.raw_markup != after.raw_markup;
    if changed {
        tracing::warn!(
            interval_ms = %interval.as_millis(),
            before_len = before.raw_markup.chars().count(),
            after_len = after.raw_markup.chars().count(),
            "Page markup changed between snapshots (possible flicker)"
        );
    } else {
        tracing::info!(interval_ms = %interval.as_millis(), "Page markup stable");
    }

    Ok(FlickerResult {
        before,
        after,
        changed,
        elapsed,
    })
}
