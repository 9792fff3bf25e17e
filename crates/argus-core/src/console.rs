use serde::Serialize;

use crate::models::{ConsoleEntry, ConsoleLevel};

/// Console entries split by severity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ConsoleAudit {
    /// SEVERE entries not matched by the allow-list. Fatal by default.
    pub errors: Vec<ConsoleEntry>,
    pub warnings: Vec<ConsoleEntry>,
    pub infos: Vec<ConsoleEntry>,
    /// SEVERE entries downgraded by the allow-list.
    pub suppressed: Vec<ConsoleEntry>,
}

impl ConsoleAudit {
    pub fn total(&self) -> usize {
        self.errors.len() + self.warnings.len() + self.infos.len() + self.suppressed.len()
    }
}

/// Partition console entries by level.
///
/// A SEVERE entry whose message contains any `allow_list` substring is moved
/// to `suppressed` instead of `errors`. Order within each bucket follows the
/// input order.
pub fn audit(entries: &[ConsoleEntry], allow_list: &[String]) -> ConsoleAudit {
    let mut result = ConsoleAudit::default();

    for entry in entries {
        match entry.level {
            ConsoleLevel::Severe => {
                if allow_list.iter().any(|s| entry.message.contains(s.as_str())) {
                    tracing::debug!(
                        message = %entry.message,
                        "Console error suppressed by allow-list"
                    );
                    result.suppressed.push(entry.clone());
                } else {
                    result.errors.push(entry.clone());
                }
            }
            ConsoleLevel::Warning => result.warnings.push(entry.clone()),
            ConsoleLevel::Info => result.infos.push(entry.clone()),
        }
    }

    tracing::info!(
        errors = result.errors.len(),
        warnings = result.warnings.len(),
        infos = result.infos.len(),
        suppressed = result.suppressed.len(),
        "Console audit"
    );
    result
}
