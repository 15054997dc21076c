//! Patch values, their loose wire form, and the result of applying one.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::PatchError;
use crate::refactor::RefactorKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Half-open character range `[start, end)`.
pub struct Range {
    pub start: usize,
    pub end: usize,
}

impl Range {
    pub fn new(start: usize, end: usize) -> Self {
        Range { start, end }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatchType {
    Insert,
    Delete,
    Replace,
    Refactor,
}

impl PatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PatchType::Insert => "insert",
            PatchType::Delete => "delete",
            PatchType::Replace => "replace",
            PatchType::Refactor => "refactor",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
/// A requested text mutation. Constructing one has no effect; see
/// [`crate::apply::apply_patch`].
pub enum Patch {
    Insert { position: usize, content: String },
    Delete { range: Range },
    Replace { range: Range, content: String },
    Refactor { refactor_type: RefactorKind },
}

impl Patch {
    pub fn patch_type(&self) -> PatchType {
        match self {
            Patch::Insert { .. } => PatchType::Insert,
            Patch::Delete { .. } => PatchType::Delete,
            Patch::Replace { .. } => PatchType::Replace,
            Patch::Refactor { .. } => PatchType::Refactor,
        }
    }

    /// Human-readable one-liner used in patch metadata.
    pub fn describe(&self) -> String {
        match self {
            Patch::Insert { position, content } => format!(
                "Insert {} character(s) at position {}",
                content.chars().count(),
                position
            ),
            Patch::Delete { range } => {
                format!("Delete characters {}..{}", range.start, range.end)
            }
            Patch::Replace { range, content } => format!(
                "Replace characters {}..{} with {} character(s)",
                range.start,
                range.end,
                content.chars().count()
            ),
            Patch::Refactor { refactor_type } => {
                format!("Refactor: {}", refactor_type.description())
            }
        }
    }

    /// Text payload carried by the patch, if any.
    pub fn content(&self) -> Option<&str> {
        match self {
            Patch::Insert { content, .. } | Patch::Replace { content, .. } => Some(content),
            Patch::Delete { .. } | Patch::Refactor { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Patch as received from an external caller (e.g. an assistant action).
///
/// Every field is optional; [`Patch::try_from`] decides whether the
/// combination is usable. Sanitize before converting.
pub struct PatchRequest {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub patch_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Range>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refactor_type: Option<String>,
}

impl TryFrom<&PatchRequest> for Patch {
    type Error = PatchError;

    fn try_from(req: &PatchRequest) -> Result<Self, Self::Error> {
        let kind = req.patch_type.as_deref().ok_or(PatchError::MissingField {
            patch_type: "<none>".into(),
            field: "type",
        })?;
        let missing = |field| PatchError::MissingField {
            patch_type: kind.to_string(),
            field,
        };
        match kind {
            "insert" => Ok(Patch::Insert {
                position: req.position.ok_or_else(|| missing("position"))?,
                content: req.content.clone().ok_or_else(|| missing("content"))?,
            }),
            "delete" => Ok(Patch::Delete {
                range: req.range.ok_or_else(|| missing("range"))?,
            }),
            "replace" => Ok(Patch::Replace {
                range: req.range.ok_or_else(|| missing("range"))?,
                content: req.content.clone().ok_or_else(|| missing("content"))?,
            }),
            "refactor" => {
                let name = req
                    .refactor_type
                    .as_deref()
                    .ok_or_else(|| missing("refactor_type"))?;
                Ok(Patch::Refactor {
                    refactor_type: RefactorKind::from_str(name)?,
                })
            }
            other => Err(PatchError::UnknownPatchType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// One rewrite performed by a refactoring transform.
pub struct ChangeRecord {
    pub refactor_type: RefactorKind,
    /// 1-based line of the rewritten token in the original text.
    pub line: usize,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchMetadata {
    /// Fresh per application, even for identical patches.
    pub patch_id: String,
    /// RFC 3339 / ISO-8601 UTC timestamp.
    pub timestamp: String,
    #[serde(rename = "type")]
    pub patch_type: PatchType,
    pub original_hash: String,
    pub modified_hash: String,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub changes: Vec<ChangeRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchResult {
    pub modified_content: String,
    pub metadata: PatchMetadata,
    pub diff: Vec<String>,
}

impl PatchResult {
    pub fn changed(&self) -> bool {
        self.metadata.original_hash != self.metadata.modified_hash
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn req(json: &str) -> PatchRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn converts_each_patch_type() {
        let p = Patch::try_from(&req(r#"{"type":"insert","position":5,"content":" x"}"#)).unwrap();
        assert_eq!(p, Patch::Insert { position: 5, content: " x".into() });

        let p = Patch::try_from(&req(r#"{"type":"delete","range":{"start":1,"end":3}}"#)).unwrap();
        assert_eq!(p, Patch::Delete { range: Range::new(1, 3) });

        let p = Patch::try_from(&req(
            r#"{"type":"refactor","refactor_type":"eqnarray_to_align"}"#,
        ))
        .unwrap();
        assert_eq!(p.patch_type(), PatchType::Refactor);
    }

    #[test]
    fn rejects_unknown_and_incomplete_requests() {
        assert_eq!(
            Patch::try_from(&req(r#"{"type":"rename"}"#)),
            Err(PatchError::UnknownPatchType("rename".into()))
        );
        assert_eq!(
            Patch::try_from(&req(r#"{"type":"refactor","refactor_type":"magic"}"#)),
            Err(PatchError::UnknownRefactor("magic".into()))
        );
        assert!(matches!(
            Patch::try_from(&req(r#"{"type":"replace","content":"x"}"#)),
            Err(PatchError::MissingField { field: "range", .. })
        ));
        assert!(matches!(
            Patch::try_from(&req(r#"{"file":"main.tex"}"#)),
            Err(PatchError::MissingField { field: "type", .. })
        ));
    }

    #[test]
    fn patch_serializes_with_type_tag() {
        let p = Patch::Replace { range: Range::new(6, 11), content: "Universe".into() };
        let v = serde_json::to_value(&p).unwrap();
        assert_eq!(v["type"], "replace");
        assert_eq!(v["range"]["start"], 6);
    }
}
