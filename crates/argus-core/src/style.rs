//! Computed-style sampling and default-vs-custom classification.

use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::models::{ClassifiedSample, ElementRole, InspectionError, StyleSample, StyleVerdict};
use crate::traits::BrowserSession;

/// Version of the built-in baseline table. Bump when entries change.
pub const DEFAULT_STYLE_TABLE_VERSION: u32 = 1;

/// Heading candidates, filtered by the configured text probes.
pub const HEADING_SELECTOR: &str = "h1, h2, h3, h4, h5, h6";

/// Searched when no real heading carries a probe text.
pub const HEADING_FALLBACK_SELECTOR: &str = "body *";

/// CSS selector used to locate the element sampled for `role`.
pub fn role_selector(role: ElementRole) -> &'static str {
    match role {
        ElementRole::NavLink => "nav a, header a",
        ElementRole::Heading => HEADING_SELECTOR,
        ElementRole::Button => "button",
        ElementRole::Table => "table",
        ElementRole::Body => "body",
    }
}

/// One baseline value: what the browser renders with zero custom styling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultStyleEntry {
    pub role: ElementRole,
    pub property: String,
    pub value: String,
}

impl DefaultStyleEntry {
    fn new(role: ElementRole, property: &str, value: &str) -> Self {
        Self {
            role,
            property: property.to_string(),
            value: value.to_string(),
        }
    }
}

/// Lookup table of unstyled-browser values per role and property.
///
/// Kept as data so it can be replaced per browser or platform from a
/// config file without touching the inspector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultStyleTable {
    pub version: u32,
    pub entries: Vec<DefaultStyleEntry>,
}

impl Default for DefaultStyleTable {
    /// Chromium's computed values for an unstyled document.
    fn default() -> Self {
        use ElementRole::*;
        Self {
            version: DEFAULT_STYLE_TABLE_VERSION,
            entries: vec![
                DefaultStyleEntry::new(NavLink, "color", "rgb(0, 0, 238)"),
                DefaultStyleEntry::new(Heading, "font-size", "16px"),
                DefaultStyleEntry::new(Heading, "font-weight", "400"),
                DefaultStyleEntry::new(Button, "background-color", "rgba(0, 0, 0, 0)"),
                DefaultStyleEntry::new(Button, "border-radius", "0px"),
                DefaultStyleEntry::new(Table, "border-collapse", "separate"),
                DefaultStyleEntry::new(Body, "background-color", "rgba(0, 0, 0, 0)"),
                DefaultStyleEntry::new(Body, "font-family", "\"Times New Roman\""),
            ],
        }
    }
}

impl DefaultStyleTable {
    /// Baseline value for a role/property pair, if one is known.
    pub fn lookup(&self, role: ElementRole, property: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.role == role && e.property == property)
            .map(|e| e.value.as_str())
    }

    /// `Default` iff `value` string-equals the table entry; anything else,
    /// including a pair with no entry, is `Custom`.
    pub fn classify(&self, role: ElementRole, property: &str, value: &str) -> StyleVerdict {
        match self.lookup(role, property) {
            Some(baseline) if baseline == value => StyleVerdict::Default,
            _ => StyleVerdict::Custom,
        }
    }
}

/// Everything the style inspector found on one page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StyleReport {
    pub samples: Vec<ClassifiedSample>,
    /// Requested roles with no matching element.
    pub missing_roles: Vec<ElementRole>,
    pub errors: Vec<InspectionError>,
}

impl StyleReport {
    /// Load-bearing samples still at their browser default.
    pub fn hard_failures(&self) -> impl Iterator<Item = &ClassifiedSample> {
        self.samples.iter().filter(|s| s.is_hard_failure())
    }

    /// Advisory samples still at their browser default.
    pub fn advisories(&self) -> impl Iterator<Item = &ClassifiedSample> {
        self.samples
            .iter()
            .filter(|s| s.verdict == StyleVerdict::Default && !s.sample.role.is_load_bearing())
    }

    /// Load-bearing roles whose element is absent from the page.
    pub fn missing_load_bearing(&self) -> impl Iterator<Item = ElementRole> + '_ {
        self.missing_roles
            .iter()
            .copied()
            .filter(ElementRole::is_load_bearing)
    }

    /// True when a load-bearing role is unstyled or absent.
    pub fn has_load_bearing_failure(&self) -> bool {
        self.hard_failures().next().is_some() || self.missing_load_bearing().next().is_some()
    }
}

/// Samples representative elements and classifies their computed styles.
pub struct StyleInspector<'a> {
    table: &'a DefaultStyleTable,
    heading_probes: &'a [String],
}

impl<'a> StyleInspector<'a> {
    pub fn new(table: &'a DefaultStyleTable, heading_probes: &'a [String]) -> Self {
        Self {
            table,
            heading_probes,
        }
    }

    /// Sample every requested role once, in the given order.
    ///
    /// A role with no matching element is listed in `missing_roles`; a
    /// failed read is listed in `errors`. Neither aborts the inspection.
    pub async fn inspect<S: BrowserSession>(
        &self,
        session: &S,
        roles: &[ElementRole],
    ) -> StyleReport {
        let mut report = StyleReport::default();
        let mut seen = Vec::with_capacity(roles.len());

        for &role in roles {
            if seen.contains(&role) {
                continue;
            }
            seen.push(role);

            let element = match self.locate(session, role).await {
                Ok(Some(element)) => element,
                Ok(None) => {
                    if role.is_load_bearing() {
                        tracing::warn!(%role, "Load-bearing element not found");
                    } else {
                        tracing::debug!(%role, "No element for role, skipping");
                    }
                    report.missing_roles.push(role);
                    continue;
                }
                Err(e) => {
                    tracing::warn!(%role, error = %e, "Failed to locate element");
                    report.errors.push(InspectionError::new("style", &e));
                    continue;
                }
            };

            for property in role.properties() {
                match session.computed_style(&element, property).await {
                    Ok(value) => {
                        let verdict = self.table.classify(role, property, &value);
                        match (verdict, role.is_load_bearing()) {
                            (StyleVerdict::Default, true) => {
                                tracing::warn!(%role, %property, %value, "Browser default styling");
                            }
                            (StyleVerdict::Default, false) => {
                                tracing::info!(
                                    %role,
                                    %property,
                                    %value,
                                    "Browser default styling (advisory)"
                                );
                            }
                            (StyleVerdict::Custom, _) => {
                                tracing::debug!(%role, %property, %value, "Custom styling");
                            }
                        }
                        report.samples.push(ClassifiedSample {
                            sample: StyleSample {
                                role,
                                property: property.to_string(),
                                value,
                            },
                            verdict,
                        });
                    }
                    Err(e) => {
                        tracing::warn!(
                            %role,
                            %property,
                            error = %e,
                            "Failed to read computed style"
                        );
                        report.errors.push(InspectionError::new("style", &e));
                    }
                }
            }
        }

        report
    }

    /// First element in document order for `role`. Headings must also
    /// contain one of the heading probes when any are configured.
    ///
    /// When no `h1`..`h6` matches, any element whose text contains a probe
    /// qualifies.
    /// Ancestors of the title contain its text too, so the candidate with the
    /// shortest text wins, the deepest one on a tie.
    async fn locate<S: BrowserSession>(
        &self,
        session: &S,
        role: ElementRole,
    ) -> Result<Option<S::Element>, AppError> {
        if role != ElementRole::Heading || self.heading_probes.is_empty() {
            return session.query_selector(role_selector(role)).await;
        }

        for candidate in session.query_selector_all(HEADING_SELECTOR).await? {
            let text = session.text(&candidate).await?;
            if self.matches_probe(&text) {
                return Ok(Some(candidate));
            }
        }

        let mut best: Option<(usize, S::Element)> = None;
        for candidate in session.query_selector_all(HEADING_FALLBACK_SELECTOR).await? {
            let text = session.text(&candidate).await?;
            let len = text.trim().chars().count();
            if self.matches_probe(&text)
                && best
                    .as_ref()
                    .is_none_or(|(shortest, _)| len <= *shortest)
            {
                best = Some((len, candidate));
            }
        }
        if best.is_some() {
            tracing::debug!("Heading found outside h1..h6");
        }
        Ok(best.map(|(_, element)| element))
    }

    fn matches_probe(&self, text: &str) -> bool {
        self.heading_probes.iter().any(|p| text.contains(p.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{FakeElement, FakeSession};

    fn probes() -> Vec<String> {
        vec!["Innstillinger".into(), "Settings".into()]
    }

    #[test]
    fn classify_is_exact_string_match() {
        let table = DefaultStyleTable::default();
        assert_eq!(
            table.classify(ElementRole::NavLink, "color", "rgb(0, 0, 238)"),
            StyleVerdict::Default
        );
        assert_eq!(
            table.classify(ElementRole::NavLink, "color", "rgb(59, 130, 246)"),
            StyleVerdict::Custom
        );
        // No normalization: a differently spaced serialization is custom.
        assert_eq!(
            table.classify(ElementRole::NavLink, "color", "rgb(0,0,238)"),
            StyleVerdict::Custom
        );
        assert_eq!(
            table.classify(ElementRole::Button, "border-radius", "6px"),
            StyleVerdict::Custom
        );
        assert_eq!(
            table.classify(ElementRole::Button, "background-color", "rgba(0, 0, 0, 0.5)"),
            StyleVerdict::Custom
        );
    }

    #[test]
    fn classify_without_entry_is_custom() {
        let table = DefaultStyleTable::default();
        assert_eq!(
            table.classify(ElementRole::Table, "width", "0px"),
            StyleVerdict::Custom
        );
    }

    #[test]
    fn classify_is_deterministic() {
        let table = DefaultStyleTable::default();
        for _ in 0..10 {
            assert_eq!(
                table.classify(ElementRole::Heading, "font-size", "16px"),
                StyleVerdict::Default
            );
        }
    }

    #[test]
    fn table_is_replaceable_data() {
        let table: DefaultStyleTable = serde_json::from_value(serde_json::json!({
            "version": 7,
            "entries": [{"role": "nav_link", "property": "color", "value": "LinkText"}]
        }))
        .unwrap();
        assert_eq!(table.version, 7);
        assert_eq!(
            table.classify(ElementRole::NavLink, "color", "LinkText"),
            StyleVerdict::Default
        );
        assert_eq!(
            table.classify(ElementRole::NavLink, "color", "rgb(0, 0, 238)"),
            StyleVerdict::Custom
        );
    }

    #[tokio::test]
    async fn styled_page_has_no_failures() {
        let session = FakeSession::new()
            .with_element(
                "nav a, header a",
                FakeElement::new()
                    .style("color", "rgb(59, 130, 246)")
                    .style("padding", "8px 12px"),
            )
            .with_element(
                "button",
                FakeElement::new()
                    .style("background-color", "rgb(37, 99, 235)")
                    .style("border-radius", "6px")
                    .style("padding", "8px 16px"),
            );
        let table = DefaultStyleTable::default();
        let probes = probes();
        let report = StyleInspector::new(&table, &probes)
            .inspect(&session, &[ElementRole::NavLink, ElementRole::Button])
            .await;

        assert_eq!(report.samples.len(), 5);
        assert!(!report.has_load_bearing_failure());
        assert!(report.errors.is_empty());
    }

    #[tokio::test]
    async fn default_nav_link_color_is_hard_failure() {
        let session = FakeSession::new().with_element(
            "nav a, header a",
            FakeElement::new().style("color", "rgb(0, 0, 238)"),
        );
        let table = DefaultStyleTable::default();
        let report = StyleInspector::new(&table, &[])
            .inspect(&session, &[ElementRole::NavLink])
            .await;

        assert!(report.has_load_bearing_failure());
        let failures: Vec<_> = report.hard_failures().collect();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].sample.property, "color");
    }

    #[tokio::test]
    async fn advisory_defaults_do_not_fail() {
        let session = FakeSession::new()
            .with_element(
                "h1, h2, h3, h4, h5, h6",
                FakeElement::new()
                    .text("Innstillinger")
                    .style("font-size", "16px")
                    .style("font-weight", "400"),
            )
            .with_element(
                "body",
                FakeElement::new().style("background-color", "rgba(0, 0, 0, 0)"),
            );
        let table = DefaultStyleTable::default();
        let probes = probes();
        let report = StyleInspector::new(&table, &probes)
            .inspect(&session, &[ElementRole::Heading, ElementRole::Body])
            .await;

        assert_eq!(report.advisories().count(), 3);
        assert!(!report.has_load_bearing_failure());
    }

    #[tokio::test]
    async fn missing_roles_are_skipped_but_load_bearing_absence_fails() {
        let session = FakeSession::new();
        let table = DefaultStyleTable::default();
        let report = StyleInspector::new(&table, &[])
            .inspect(&session, &[ElementRole::Table, ElementRole::Button])
            .await;

        assert!(report.samples.is_empty());
        assert_eq!(
            report.missing_roles,
            vec![ElementRole::Table, ElementRole::Button]
        );
        assert_eq!(
            report.missing_load_bearing().collect::<Vec<_>>(),
            vec![ElementRole::Button]
        );
        assert!(report.has_load_bearing_failure());
    }

    #[tokio::test]
    async fn heading_is_selected_by_text_probe() {
        let session = FakeSession::new()
            .with_element(
                "h1, h2, h3, h4, h5, h6",
                FakeElement::new().text("Dashbord").style("font-size", "16px"),
            )
            .with_element(
                "h1, h2, h3, h4, h5, h6",
                FakeElement::new()
                    .text("Settings")
                    .style("font-size", "24px")
                    .style("font-weight", "700"),
            );
        let table = DefaultStyleTable::default();
        let probes = probes();
        let report = StyleInspector::new(&table, &probes)
            .inspect(&session, &[ElementRole::Heading])
            .await;

        assert_eq!(report.samples.len(), 2);
        assert_eq!(report.samples[0].sample.value, "24px");
        assert_eq!(report.advisories().count(), 0);
    }

    #[tokio::test]
    async fn heading_falls_back_to_innermost_titled_element() {
        let session = FakeSession::new()
            .with_element("h1, h2, h3, h4, h5, h6", FakeElement::new().text("Dashbord"))
            .with_element(
                "body *",
                FakeElement::new()
                    .text("Innstillinger\nSpråk Tidssone Lagre")
                    .style("font-size", "16px"),
            )
            .with_element(
                "body *",
                FakeElement::new()
                    .text("Innstillinger")
                    .style("font-size", "28px"),
            )
            .with_element("body *", FakeElement::new().text("Lagre"));
        let table = DefaultStyleTable::default();
        let probes = probes();
        let report = StyleInspector::new(&table, &probes)
            .inspect(&session, &[ElementRole::Heading])
            .await;

        assert!(report.missing_roles.is_empty());
        assert_eq!(report.samples[0].sample.value, "28px");
    }

    #[tokio::test]
    async fn heading_without_matching_probe_is_missing() {
        let session = FakeSession::new().with_element(
            "h1, h2, h3, h4, h5, h6",
            FakeElement::new().text("Dashbord"),
        );
        let table = DefaultStyleTable::default();
        let probes = probes();
        let report = StyleInspector::new(&table, &probes)
            .inspect(&session, &[ElementRole::Heading])
            .await;

        assert_eq!(report.missing_roles, vec![ElementRole::Heading]);
        assert!(!report.has_load_bearing_failure());
    }

    #[tokio::test]
    async fn failed_style_read_is_recorded_not_raised() {
        let session = FakeSession::new()
            .with_element(
                "button",
                FakeElement::new()
                    .style("background-color", "rgb(37, 99, 235)")
                    .style("padding", "8px"),
            )
            .with_failing_style("border-radius");
        let table = DefaultStyleTable::default();
        let report = StyleInspector::new(&table, &[])
            .inspect(&session, &[ElementRole::Button])
            .await;

        assert_eq!(report.samples.len(), 2);
        assert_eq!(report.errors.len(), 1);
        assert_eq!(report.errors[0].kind, "script_error");
    }

    #[tokio::test]
    async fn duplicate_roles_are_sampled_once() {
        let session = FakeSession::new().with_element(
            "table",
            FakeElement::new()
                .style("border-collapse", "collapse")
                .style("width", "1200px"),
        );
        let table = DefaultStyleTable::default();
        let report = StyleInspector::new(&table, &[])
            .inspect(&session, &[ElementRole::Table, ElementRole::Table])
            .await;

        assert_eq!(report.samples.len(), 2);
    }
}
