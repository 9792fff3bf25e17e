use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Severity of a captured browser console entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ConsoleLevel {
    Info,
    Warning,
    Severe,
}

impl ConsoleLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsoleLevel::Info => "INFO",
            ConsoleLevel::Warning => "WARNING",
            ConsoleLevel::Severe => "SEVERE",
        }
    }
}

impl fmt::Display for ConsoleLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ConsoleLevel {
    type Err = String;

    /// Accepts both WebDriver level names and `console.*` method names.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "info" | "log" | "debug" | "trace" => Ok(ConsoleLevel::Info),
            "warning" | "warn" => Ok(ConsoleLevel::Warning),
            "severe" | "error" => Ok(ConsoleLevel::Severe),
            _ => Err(format!("Unknown console level: {}", s)),
        }
    }
}

/// A single browser console message, as produced by the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsoleEntry {
    pub level: ConsoleLevel,
    pub message: String,
    pub timestamp_ms: u64,
}

impl ConsoleEntry {
    pub fn new(level: ConsoleLevel, message: impl Into<String>, timestamp_ms: u64) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp_ms,
        }
    }
}

/// Representative element classes whose computed style is sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementRole {
    NavLink,
    Heading,
    Button,
    Table,
    Body,
}

impl ElementRole {
    pub const ALL: [ElementRole; 5] = [
        ElementRole::NavLink,
        ElementRole::Heading,
        ElementRole::Button,
        ElementRole::Table,
        ElementRole::Body,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ElementRole::NavLink => "nav_link",
            ElementRole::Heading => "heading",
            ElementRole::Button => "button",
            ElementRole::Table => "table",
            ElementRole::Body => "body",
        }
    }

    /// Load-bearing roles turn a default-styled (or missing) element into a
    /// scenario failure. The rest are advisory.
    pub fn is_load_bearing(&self) -> bool {
        matches!(self, ElementRole::NavLink | ElementRole::Button)
    }

    /// Computed-style properties sampled for this role.
    pub fn properties(&self) -> &'static [&'static str] {
        match self {
            ElementRole::NavLink => &["color", "padding"],
            ElementRole::Heading => &["font-size", "font-weight"],
            ElementRole::Button => &["background-color", "border-radius", "padding"],
            ElementRole::Table => &["border-collapse", "width"],
            ElementRole::Body => &["background-color", "font-family"],
        }
    }
}

impl fmt::Display for ElementRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ElementRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "nav_link" => Ok(ElementRole::NavLink),
            "heading" => Ok(ElementRole::Heading),
            "button" => Ok(ElementRole::Button),
            "table" => Ok(ElementRole::Table),
            "body" => Ok(ElementRole::Body),
            _ => Err(format!("Unknown element role: {}", s)),
        }
    }
}

/// One computed-style value read from the page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleSample {
    pub role: ElementRole,
    pub property: String,
    pub value: String,
}

/// Whether a sampled value equals the unstyled browser baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StyleVerdict {
    Default,
    Custom,
}

impl fmt::Display for StyleVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StyleVerdict::Default => write!(f, "default"),
            StyleVerdict::Custom => write!(f, "custom"),
        }
    }
}

/// A [`StyleSample`] tagged with its verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedSample {
    #[serde(flatten)]
    pub sample: StyleSample,
    pub verdict: StyleVerdict,
}

impl ClassifiedSample {
    /// True when this sample alone forces the scenario to fail.
    pub fn is_hard_failure(&self) -> bool {
        self.verdict == StyleVerdict::Default && self.sample.role.is_load_bearing()
    }
}

/// A visible text checked for the shape of an unresolved localization key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationFinding {
    pub text: String,
    pub looks_untranslated: bool,
}

/// Point-in-time capture of the rendered page.
///
/// Two snapshots are considered equal when their `raw_markup` is equal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSnapshot {
    pub timestamp_ms: u64,
    #[serde(skip_serializing, default)]
    pub raw_markup: String,
    pub root_content_length: usize,
    pub has_navigation: bool,
}

impl PageSnapshot {
    /// SHA-256 of the raw markup, used in reports instead of the full page.
    pub fn digest(&self) -> String {
        compute_hash(&self.raw_markup)
    }
}

impl PartialEq for PageSnapshot {
    fn eq(&self, other: &Self) -> bool {
        self.raw_markup == other.raw_markup
    }
}

impl Eq for PageSnapshot {}

/// An inspector step that could not complete. Recorded, never raised.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InspectionError {
    pub inspector: String,
    pub kind: String,
    pub message: String,
    /// The underlying error means the session is unusable.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub fatal: bool,
}

impl InspectionError {
    pub fn new(inspector: &str, error: &crate::AppError) -> Self {
        Self {
            inspector: inspector.to_string(),
            kind: error.kind().to_string(),
            message: error.to_string(),
            fatal: error.is_fatal(),
        }
    }
}

/// Compute a SHA-256 hash of a string, returned as 64-char hex.
pub fn compute_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Milliseconds since the Unix epoch.
pub fn now_ms() -> u64 {
    chrono::Utc::now().timestamp_millis().max(0) as u64
}
