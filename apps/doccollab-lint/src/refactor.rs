//! Named structural transforms over LaTeX source.
//!
//! Every transform is a pure function `&str -> (String, Vec<ChangeRecord>)`.
//! They work by textual substitution: `eqnarray_to_align` renames the
//! environment and leaves `&=&` markers alone.

use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::error::PatchError;
use crate::models::patch::ChangeRecord;
use crate::rules::{
    re, RE_BEGIN_ENV, RE_DOCUMENTCLASS_LINE, RE_DOLLAR_DISPLAY, RE_ENUMERATE, RE_EQNARRAY_BEGIN,
    RE_EQNARRAY_END, RE_ITEMIZE, RE_USEPACKAGE,
};
use crate::utils::{line_of, line_starts, mask_code, strip_comments};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefactorKind {
    EqnarrayToAlign,
    ItemizeToEnumerate,
    EnumerateToItemize,
    DollarToDisplaymath,
    NormalizeWhitespace,
}

impl RefactorKind {
    pub const ALL: [RefactorKind; 5] = [
        RefactorKind::EqnarrayToAlign,
        RefactorKind::ItemizeToEnumerate,
        RefactorKind::EnumerateToItemize,
        RefactorKind::DollarToDisplaymath,
        RefactorKind::NormalizeWhitespace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RefactorKind::EqnarrayToAlign => "eqnarray_to_align",
            RefactorKind::ItemizeToEnumerate => "itemize_to_enumerate",
            RefactorKind::EnumerateToItemize => "enumerate_to_itemize",
            RefactorKind::DollarToDisplaymath => "dollar_to_displaymath",
            RefactorKind::NormalizeWhitespace => "normalize_whitespace",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            RefactorKind::EqnarrayToAlign => "Convert eqnarray to align (amsmath)",
            RefactorKind::ItemizeToEnumerate => "Convert itemize lists to enumerate",
            RefactorKind::EnumerateToItemize => "Convert enumerate lists to itemize",
            RefactorKind::DollarToDisplaymath => "Convert $$...$$ to \\[...\\]",
            RefactorKind::NormalizeWhitespace => {
                "Remove trailing whitespace and collapse blank lines"
            }
        }
    }

    /// Run the transform on `content`.
    pub fn apply(&self, content: &str) -> (String, Vec<ChangeRecord>) {
        match self {
            RefactorKind::EqnarrayToAlign => eqnarray_to_align(content),
            RefactorKind::ItemizeToEnumerate => itemize_to_enumerate(content),
            RefactorKind::EnumerateToItemize => enumerate_to_itemize(content),
            RefactorKind::DollarToDisplaymath => dollar_to_displaymath(content),
            RefactorKind::NormalizeWhitespace => normalize_whitespace(content),
        }
    }
}

impl fmt::Display for RefactorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RefactorKind {
    type Err = PatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RefactorKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| PatchError::UnknownRefactor(s.to_string()))
    }
}

/// Rewrite every match of `pattern`, recording one change per match for
/// which `record` returns true.
///
/// Matches are found on [`mask_code`] output, so commented-out text and
/// escaped `\$` never take part. `replace` gets the captures and the raw
/// matched slice; the result is spliced into `content` at the same offsets.
fn rewrite(
    content: &str,
    pattern: &'static LazyLock<Option<Regex>>,
    kind: RefactorKind,
    replace: impl Fn(&Captures, &str) -> String,
    record: impl Fn(&Captures) -> bool,
    changes: &mut Vec<ChangeRecord>,
) -> String {
    let Some(re) = re(pattern) else {
        return content.to_string();
    };
    let masked = mask_code(content);
    let starts = line_starts(content);
    let mut out = String::with_capacity(content.len());
    let mut last = 0;
    for caps in re.captures_iter(&masked) {
        let Some(m) = caps.get(0) else {
            continue;
        };
        let raw = &content[m.start()..m.end()];
        let to = replace(&caps, raw);
        if record(&caps) {
            changes.push(ChangeRecord {
                refactor_type: kind,
                line: line_of(&starts, m.start()),
                from: raw.to_string(),
                to: to.clone(),
            });
        }
        out.push_str(&content[last..m.start()]);
        out.push_str(&to);
        last = m.end();
    }
    out.push_str(&content[last..]);
    out
}

/// `eqnarray` / `eqnarray*` to `align` / `align*`; one change per
/// environment instance.
pub fn eqnarray_to_align(content: &str) -> (String, Vec<ChangeRecord>) {
    let kind = RefactorKind::EqnarrayToAlign;
    let mut changes = Vec::new();
    let out = rewrite(
        content,
        &RE_EQNARRAY_BEGIN,
        kind,
        |c, _| format!("\\begin{{align{}}}", &c[1]),
        |_| true,
        &mut changes,
    );
    let out = rewrite(
        &out,
        &RE_EQNARRAY_END,
        kind,
        |c, _| format!("\\end{{align{}}}", &c[1]),
        |_| false,
        &mut changes,
    );
    (out, changes)
}

fn swap_list(
    content: &str,
    pattern: &'static LazyLock<Option<Regex>>,
    target: &str,
    kind: RefactorKind,
) -> (String, Vec<ChangeRecord>) {
    let mut changes = Vec::new();
    let out = rewrite(
        content,
        pattern,
        kind,
        |c, _| format!("\\{}{{{}}}", &c[1], target),
        |_| true,
        &mut changes,
    );
    (out, changes)
}

/// `itemize` to `enumerate`; one change per `\begin`/`\end` token.
pub fn itemize_to_enumerate(content: &str) -> (String, Vec<ChangeRecord>) {
    swap_list(content, &RE_ITEMIZE, "enumerate", RefactorKind::ItemizeToEnumerate)
}

/// Inverse of [`itemize_to_enumerate`].
pub fn enumerate_to_itemize(content: &str) -> (String, Vec<ChangeRecord>) {
    swap_list(content, &RE_ENUMERATE, "itemize", RefactorKind::EnumerateToItemize)
}

/// `$$...$$` to `\[...\]`; one change per pair.
pub fn dollar_to_displaymath(content: &str) -> (String, Vec<ChangeRecord>) {
    let mut changes = Vec::new();
    let out = rewrite(
        content,
        &RE_DOLLAR_DISPLAY,
        RefactorKind::DollarToDisplaymath,
        // Inner text comes from the raw slice so comments inside survive.
        |_, raw| format!("\\[{}\\]", &raw[2..raw.len() - 2]),
        |_| true,
        &mut changes,
    );
    (out, changes)
}

/// Right-strip every line and collapse runs of blank lines to one.
pub fn normalize_whitespace(content: &str) -> (String, Vec<ChangeRecord>) {
    let kind = RefactorKind::NormalizeWhitespace;
    let mut changes = Vec::new();
    let mut out: Vec<&str> = Vec::new();
    let mut prev_blank = false;
    for (idx, line) in content.split('\n').enumerate() {
        let trimmed = line.trim_end();
        let blank = trimmed.is_empty();
        if blank && prev_blank {
            changes.push(ChangeRecord {
                refactor_type: kind,
                line: idx + 1,
                from: line.to_string(),
                to: String::new(),
            });
            continue;
        }
        if trimmed.len() != line.len() {
            changes.push(ChangeRecord {
                refactor_type: kind,
                line: idx + 1,
                from: line.to_string(),
                to: trimmed.to_string(),
            });
        }
        out.push(trimmed);
        prev_blank = blank;
    }
    (out.join("\n"), changes)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Advisory preview of a transform; nothing has been applied.
pub struct RefactorSuggestion {
    #[serde(rename = "type")]
    pub refactor_type: RefactorKind,
    pub description: String,
    /// Line of the first occurrence.
    pub line: usize,
    pub occurrences: usize,
}

/// Suggest transforms whose trigger appears in `content`. Read-only.
pub fn suggest_refactors(content: &str) -> Vec<RefactorSuggestion> {
    let starts = line_starts(content);
    let mut out = Vec::new();
    let mut push = |kind: RefactorKind, first: usize, count: usize, what: &str| {
        if count > 0 {
            out.push(RefactorSuggestion {
                refactor_type: kind,
                description: format!("{} ({} {})", kind.description(), count, what),
                line: line_of(&starts, first),
                occurrences: count,
            });
        }
    };

    let text = mask_code(content);
    let triggers: [(RefactorKind, &'static LazyLock<Option<Regex>>, &str); 4] = [
        (RefactorKind::EqnarrayToAlign, &RE_EQNARRAY_BEGIN, "environment(s)"),
        (RefactorKind::ItemizeToEnumerate, &RE_ITEMIZE, "list(s)"),
        (RefactorKind::EnumerateToItemize, &RE_ENUMERATE, "list(s)"),
        (RefactorKind::DollarToDisplaymath, &RE_DOLLAR_DISPLAY, "display(s)"),
    ];
    for (kind, pattern, what) in triggers {
        let Some(r) = re(pattern) else {
            continue;
        };
        // List patterns match both ends; only `\begin` counts.
        let found: Vec<usize> = r
            .find_iter(&text)
            .filter(|m| !m.as_str().starts_with("\\end"))
            .map(|m| m.start())
            .collect();
        let first = found.first().copied().unwrap_or(0);
        push(kind, first, found.len(), what);
    }
    let (_, ws) = normalize_whitespace(content);
    if let Some(first) = ws.first() {
        let first_byte = starts.get(first.line - 1).copied().unwrap_or(0);
        push(RefactorKind::NormalizeWhitespace, first_byte, ws.len(), "line(s)");
    }
    out
}

/// Whether `\usepackage{...}` (possibly a comma list) loads `package`.
/// Commented-out loads do not count.
pub fn package_loaded(content: &str, package: &str) -> bool {
    let Some(r) = re(&RE_USEPACKAGE) else {
        return false;
    };
    let text = strip_comments(content);
    r.captures_iter(&text)
        .any(|c| c[1].split(',').any(|p| p.trim() == package))
}

/// Where and what to insert to load `package`: just after the
/// `\documentclass` line, or at the very start when there is none.
/// Returns a character offset.
pub fn package_insertion(content: &str, package: &str, options: Option<&str>) -> (usize, String) {
    let line = match options {
        Some(o) => format!("\\usepackage[{}]{{{}}}", o, package),
        None => format!("\\usepackage{{{}}}", package),
    };
    let found = re(&RE_DOCUMENTCLASS_LINE).and_then(|r| r.find(content));
    match found {
        Some(m) if content[m.end()..].starts_with('\n') => {
            (content[..m.end() + 1].chars().count(), format!("{}\n", line))
        }
        Some(m) => (content[..m.end()].chars().count(), format!("\n{}", line)),
        None => (0, format!("{}\n", line)),
    }
}

/// Add a package after `\documentclass` unless it is already loaded.
/// Content without `\documentclass` is returned unchanged.
pub fn add_package(content: &str, package: &str, options: Option<&str>) -> String {
    let has_class = re(&RE_DOCUMENTCLASS_LINE).is_some_and(|r| r.is_match(content));
    if package_loaded(content, package) || !has_class {
        return content.to_string();
    }
    let (pos, text) = package_insertion(content, package, options);
    let byte = content
        .char_indices()
        .nth(pos)
        .map(|(b, _)| b)
        .unwrap_or(content.len());
    format!("{}{}{}", &content[..byte], text, &content[byte..])
}

/// Split at `\begin{document}` into trimmed (preamble, body). Without it
/// the preamble is empty.
pub fn extract_preamble(content: &str) -> (String, String) {
    let Some(r) = re(&RE_BEGIN_ENV) else {
        return (String::new(), content.to_string());
    };
    match r.captures_iter(content).find(|c| &c[1] == "document") {
        Some(c) => {
            let start = c.get(0).map(|m| m.start()).unwrap_or(0);
            (
                content[..start].trim().to_string(),
                content[start..].trim().to_string(),
            )
        }
        None => (String::new(), content.to_string()),
    }
}
