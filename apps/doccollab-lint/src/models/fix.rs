//! Machine-applicable fixes synthesized from auto-fixable issues.

use serde::Serialize;

use super::patch::Range;
use crate::refactor::RefactorKind;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
/// What a fix does. Offsets are character offsets into the text the fix
/// was generated from.
pub enum FixKind {
    Insert { position: usize, content: String },
    Delete { range: Range },
    Replace { range: Range, content: String },
    /// Whole-document transform from the refactoring library.
    Refactor { refactor_type: RefactorKind },
    /// `content` is the `\usepackage` line inserted at `position`.
    InsertPackage {
        package: String,
        position: usize,
        content: String,
    },
    /// Regex substitution over the text outside comments and verbatim
    /// blocks.
    ReplacePattern { pattern: String, replacement: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fix {
    /// Rule id of the issue this fix resolves.
    pub issue_id: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    #[serde(flatten)]
    pub kind: FixKind,
    pub description: String,
}

impl Fix {
    /// Character span the fix touches. Inserts occupy an empty span.
    pub fn span(&self) -> Option<Range> {
        match &self.kind {
            FixKind::Insert { position, .. } | FixKind::InsertPackage { position, .. } => {
                Some(Range::new(*position, *position))
            }
            FixKind::Delete { range } | FixKind::Replace { range, .. } => Some(*range),
            FixKind::Refactor { .. } | FixKind::ReplacePattern { .. } => None,
        }
    }
}
