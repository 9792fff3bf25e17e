use serde::Serialize;

use crate::config::ReadinessConfig;
use crate::error::AppError;
use crate::poll::{PollConfig, poll_until};
use crate::traits::BrowserSession;

/// One observation of the page during readiness polling.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Observation {
    /// `None` while the root element does not exist.
    root_content_length: Option<usize>,
    has_navigation: bool,
    error: Option<String>,
    /// Set when the session itself is gone; polling stops.
    session_lost: bool,
}

impl Observation {
    fn satisfies(&self, config: &ReadinessConfig) -> bool {
        let content_ok = self
            .root_content_length
            .is_some_and(|len| len >= config.min_root_content_length);
        content_ok && (self.has_navigation || !config.require_navigation_landmark)
    }

    fn record_error(&mut self, error: AppError) {
        self.session_lost |= error.is_fatal();
        self.error = Some(error.to_string());
    }
}

/// Outcome of [`await_ready`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadinessResult {
    pub ready: bool,
    pub elapsed_ms: u64,
    pub attempts: u32,
    /// Root content length at the last observation.
    pub last_content_length: Option<usize>,
    pub has_navigation: bool,
    /// Last error reported by the session while probing, if any.
    pub last_error: Option<String>,
    /// The session died while probing; `last_error` holds the cause.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub session_lost: bool,
}

impl ReadinessResult {
    /// Converts a failed result into the fatal scenario error.
    pub fn to_error(&self) -> Option<AppError> {
        if self.session_lost {
            return Some(AppError::TransportError(self.last_error.clone().unwrap_or_default()));
        }
        (!self.ready).then(|| AppError::ReadinessTimeout {
            elapsed_ms: self.elapsed_ms,
            last_content_length: self.last_content_length,
        })
    }
}

async fn observe<S: BrowserSession>(session: &S, config: &ReadinessConfig) -> Observation {
    let mut observation = Observation::default();

    match session.query_selector(&config.root_selector).await {
        Ok(Some(root)) => match session.inner_html(&root).await {
            Ok(html) => observation.root_content_length = Some(html.chars().count()),
            Err(e) => observation.record_error(e),
        },
        Ok(None) => {}
        Err(e) => observation.record_error(e),
    }
    if observation.session_lost {
        return observation;
    }

    match session.query_selector(&config.navigation_selector).await {
        Ok(found) => observation.has_navigation = found.is_some(),
        Err(e) => observation.record_error(e),
    }

    tracing::debug!(
        content_length = ?observation.root_content_length,
        has_navigation = observation.has_navigation,
        "Readiness probe"
    );
    observation
}

/// Poll the page until its root mount point holds at least
/// `min_root_content_length` characters of markup and, if required, the
/// navigation landmark exists.
///
/// Never fails: a root element that never appears yields `ready == false`.
/// A transport failure or call timeout stops polling at once and sets
/// `session_lost`. The caller decides what is fatal.
pub async fn await_ready<S: BrowserSession>(
    session: &S,
    config: &ReadinessConfig,
) -> ReadinessResult {
    let outcome = poll_until(
        PollConfig::new(config.max_wait(), config.poll_interval()),
        || observe(session, config),
        |obs| obs.session_lost || obs.satisfies(config),
    )
    .await;

    let accepted = outcome.is_ready();
    let attempts = outcome.attempts();
    let elapsed_ms = outcome.elapsed().as_millis() as u64;
    let last = outcome.into_value();
    let session_lost = last.session_lost;
    let ready = accepted && !session_lost;

    if session_lost {
        tracing::error!(
            elapsed_ms,
            attempts,
            error = last.error.as_deref().unwrap_or_default(),
            "Browser session lost while waiting for the page"
        );
    } else if ready {
        tracing::info!(
            elapsed_ms,
            attempts,
            content_length = ?last.root_content_length,
            "Page ready"
        );
    } else {
        tracing::warn!(
            elapsed_ms,
            attempts,
            content_length = ?last.root_content_length,
            has_navigation = last.has_navigation,
            "Page did not become ready"
        );
    }

    ReadinessResult {
        ready,
        elapsed_ms,
        attempts,
        last_content_length: last.root_content_length,
        has_navigation: last.has_navigation,
        last_error: last.error,
        session_lost,
    }
}
