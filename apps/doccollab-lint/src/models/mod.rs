//! Shared data models: scan issues, reports, patches and fixes.

pub mod fix;
pub mod patch;

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::rules::{FixType, Rule};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
/// Issue severity. Only errors affect the exit code upstream.
pub enum Severity {
    Error,
    Warning,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Error => f.write_str("error"),
            Severity::Warning => f.write_str("warning"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// A single detected problem. `line` is 1-based and `None` for
/// whole-document findings; `column` is a 1-based character column.
pub struct Issue {
    pub rule_id: &'static str,
    pub severity: Severity,
    pub line: Option<usize>,
    pub column: Option<usize>,
    pub message: String,
    pub auto_fix: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix_type: Option<FixType>,
    /// Corrected line for line-scoped fixes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fix: Option<String>,
}

impl Issue {
    /// Build an issue carrying the severity and fix metadata of `rule`.
    pub fn new(rule: &Rule, line: Option<usize>, message: impl Into<String>) -> Self {
        Issue {
            rule_id: rule.id,
            severity: rule.severity,
            line,
            column: None,
            message: message.into(),
            auto_fix: rule.auto_fixable,
            fix_type: rule.fix_type(),
            fix: None,
        }
    }

    pub fn at_column(mut self, column: usize) -> Self {
        self.column = Some(column);
        self
    }

    pub fn with_fix(mut self, fixed_line: impl Into<String>) -> Self {
        self.fix = Some(fixed_line.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Advisory package suggestion; neither an error nor a warning.
pub struct Suggestion {
    pub package: &'static str,
    pub reason: &'static str,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
/// Issue counts for one scan.
pub struct Summary {
    pub total: usize,
    pub errors: usize,
    pub warnings: usize,
    pub auto_fixable: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
/// Result of scanning one document. Built fresh per call.
pub struct ScanReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
    pub suggestions: Vec<Suggestion>,
}

impl ScanReport {
    pub fn new(filename: Option<&str>, issues: Vec<Issue>, suggestions: Vec<Suggestion>) -> Self {
        let (errors, warnings) = issues
            .into_iter()
            .partition(|i| i.severity == Severity::Error);
        ScanReport {
            filename: filename.map(str::to_string),
            errors,
            warnings,
            suggestions,
        }
    }

    /// Errors first, then warnings, each in detection order.
    pub fn issues(&self) -> impl Iterator<Item = &Issue> {
        self.errors.iter().chain(self.warnings.iter())
    }

    pub fn summary(&self) -> Summary {
        Summary {
            total: self.errors.len() + self.warnings.len(),
            errors: self.errors.len(),
            warnings: self.warnings.len(),
            auto_fixable: self.issues().filter(|i| i.auto_fix).count(),
        }
    }

    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}
