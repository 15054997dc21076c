//! pdflatex log parsing.

use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

use crate::rules::re;

static RE_SOURCE_LINE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"l\.(\d+)").ok());
static RE_MISSING_STY: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"File `([^']+)\.sty' not found").ok());

/// How far past a `!` line to look for its `l.<n>` marker.
const SOURCE_LINE_WINDOW: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warning,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Error => f.write_str("ERROR"),
            LogLevel::Warning => f.write_str("WARNING"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    #[serde(rename = "type")]
    pub level: LogLevel,
    /// Source line from the `l.<n>` marker, errors only.
    pub line: Option<usize>,
    pub message: String,
}

/// Extract errors (`!` lines) and warnings (lines mentioning `Warning`).
pub fn parse_log(log: &str) -> Vec<LogEntry> {
    let lines: Vec<&str> = log.split('\n').collect();
    let mut entries = Vec::new();
    for (i, line) in lines.iter().enumerate() {
        if let Some(rest) = line.strip_prefix('!') {
            let window = &lines[i + 1..(i + 1 + SOURCE_LINE_WINDOW).min(lines.len())];
            let source_line = re(&RE_SOURCE_LINE).and_then(|r| {
                window
                    .iter()
                    .find_map(|l| r.captures(l).and_then(|c| c[1].parse().ok()))
            });
            entries.push(LogEntry {
                level: LogLevel::Error,
                line: source_line,
                message: rest.trim().to_string(),
            });
        } else if line.contains("Warning") {
            entries.push(LogEntry {
                level: LogLevel::Warning,
                line: None,
                message: line.trim().to_string(),
            });
        }
    }
    entries
}

/// One line per entry, or a success note when there are none.
pub fn format_entries(entries: &[LogEntry]) -> String {
    if entries.is_empty() {
        return "Compilation successful!".to_string();
    }
    entries
        .iter()
        .map(|e| match e.line {
            Some(n) => format!("{} (line {}): {}", e.level, n, e.message),
            None => format!("{}: {}", e.level, e.message),
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Package names from ``File `x.sty' not found`` messages, in log order.
pub fn missing_packages(log: &str) -> Vec<String> {
    re(&RE_MISSING_STY)
        .map(|r| r.captures_iter(log).map(|c| c[1].to_string()).collect())
        .unwrap_or_default()
}

/// Lines `[line - context, line + context]` of the log (1-based `line`).
pub fn error_context(log: &str, line: usize, context: usize) -> Option<String> {
    let lines: Vec<&str> = log.split('\n').collect();
    if line < 1 || line > lines.len() {
        return None;
    }
    let start = line.saturating_sub(context + 1);
    let end = (line + context).min(lines.len());
    Some(lines[start..end].join("\n"))
}
