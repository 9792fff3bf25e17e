//! Console capture from two sources.
//!
//! A small script, installed before any page script runs, wraps the
//! `console` methods and listens for uncaught errors and rejections. It
//! buffers everything on `window` and the session drains that buffer on
//! demand. Browser-level messages that never pass through `console`, such as
//! failed fetches, CORS rejections and CSP violations, arrive as DevTools
//! `Log.entryAdded` events and are converted with [`log_entry`].

use serde::Deserialize;

use argus_core::error::AppError;
use argus_core::models::{ConsoleEntry, ConsoleLevel};

/// Installed with `Page.addScriptToEvaluateOnNewDocument`.
pub const CAPTURE_SCRIPT: &str = r#"(() => {
  if (window.__argusConsole) return;
  const buffer = [];
  Object.defineProperty(window, "__argusConsole", { value: buffer, enumerable: false });
  const render = (args) => Array.from(args).map((a) => {
    if (typeof a === "string") return a;
    if (a instanceof Error) return a.stack || a.message;
    try { return JSON.stringify(a); } catch (_) { return String(a); }
  }).join(" ");
  const push = (level, message) => buffer.push({ level, message, timestamp_ms: Date.now() });
  for (const method of ["error", "warn", "info", "log", "debug"]) {
    const original = console[method];
    console[method] = function (...args) {
      push(method, render(args));
      return original.apply(this, args);
    };
  }
  window.addEventListener("error", (event) => {
    push("error", event.message || String(event.error));
  });
  window.addEventListener("unhandledrejection", (event) => {
    push("error", "Unhandled promise rejection: " + render([event.reason]));
  });
})();"#;

/// Evaluates to the buffered entries as a JSON string.
pub const DRAIN_EXPRESSION: &str = "JSON.stringify(window.__argusConsole || [])";

#[derive(Debug, Deserialize)]
struct RawEntry {
    level: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    timestamp_ms: f64,
}

/// Convert the drained JSON buffer into console entries, oldest first.
///
/// `console.error` and uncaught errors become SEVERE, `console.warn` becomes
/// WARNING and everything else INFO.
pub fn parse_entries(raw: &str) -> Result<Vec<ConsoleEntry>, AppError> {
    let entries: Vec<RawEntry> = serde_json::from_str(raw)?;
    Ok(entries
        .into_iter()
        .map(|e| {
            let level = e.level.parse().unwrap_or(ConsoleLevel::Info);
            ConsoleEntry::new(level, e.message, e.timestamp_ms.max(0.0) as u64)
        })
        .collect())
}

/// Convert a DevTools `Log.entryAdded` entry.
///
/// Levels follow the DevTools names (`verbose`, `info`, `warning`, `error`).
/// The message is prefixed with the resource URL when there is one.
pub fn log_entry(level: &str, text: &str, url: Option<&str>, timestamp_ms: f64) -> ConsoleEntry {
    let level = match level {
        "error" => ConsoleLevel::Severe,
        "warning" => ConsoleLevel::Warning,
        _ => ConsoleLevel::Info,
    };
    let message = match url.filter(|u| !u.is_empty()) {
        Some(url) => format!("{url} - {text}"),
        None => text.to_string(),
    };
    ConsoleEntry::new(level, message, timestamp_ms.max(0.0) as u64)
}

/// Both capture sources as one log, oldest first.
pub fn merge_entries(recorded: Vec<ConsoleEntry>, logged: &[ConsoleEntry]) -> Vec<ConsoleEntry> {
    let mut entries = recorded;
    entries.extend_from_slice(logged);
    entries.sort_by_key(|e| e.timestamp_ms);
    entries
}
