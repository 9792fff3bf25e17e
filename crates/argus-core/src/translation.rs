//! Detection of unresolved localization keys in visible text.
//!
//! Purely lexical: a string such as `nav.settings` is flagged because it
//! has the shape of a dotted key path, not because any catalog says so.
//! Legitimate lowercase dotted text (file names, hosts) is flagged too.

use crate::models::TranslationFinding;

/// True when `text` looks like a dotted lowercase identifier path.
///
/// The text must contain a `.`, and everything before the first `.` must be
/// one or more lowercase letters. Surrounding whitespace is ignored.
pub fn is_key_like(text: &str) -> bool {
    let Some((head, _)) = text.trim().split_once('.') else {
        return false;
    };
    !head.is_empty() && head.chars().all(|c| c.is_alphabetic() && c.is_lowercase())
}

/// Classify each text, preserving input order.
pub fn audit<I, T>(texts: I) -> Vec<TranslationFinding>
where
    I: IntoIterator<Item = T>,
    T: AsRef<str>,
{
    texts
        .into_iter()
        .map(|text| {
            let text = text.as_ref().trim();
            let looks_untranslated = is_key_like(text);
            if looks_untranslated {
                tracing::warn!(%text, "Untranslated label");
            }
            TranslationFinding {
                text: text.to_string(),
                looks_untranslated,
            }
        })
        .collect()
}

/// Findings flagged as untranslated.
pub fn untranslated(findings: &[TranslationFinding]) -> impl Iterator<Item = &TranslationFinding> {
    findings.iter().filter(|f| f.looks_untranslated)
}
