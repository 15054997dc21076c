//! Fix generator and batch application.
//!
//! [`generate_fixes`] re-scans a document and turns every auto-fixable
//! issue into exactly one [`Fix`]. [`apply_fixes`] applies a batch:
//! offset-based fixes are resolved against the original text and spliced
//! bottom to top, then whole-text fixes (refactors, pattern substitutions)
//! run over the result.

use std::collections::{HashMap, HashSet, VecDeque};

use regex::Regex;
use tracing::debug;

use crate::error::PatchError;
use crate::models::fix::{Fix, FixKind};
use crate::models::patch::Range;
use crate::models::Issue;
use crate::refactor::package_insertion;
use crate::rules::{self, re, Detector, FixTemplate, Rule};
use crate::scan::{
    blank_runs, lines, lint_content_with, lintable_text, missing_float_labels, BlankRun,
    FloatGap, Line, ScanOptions,
};
use crate::utils::{byte_to_char, char_to_byte, strip_comment};

/// Upper bound on rescan/apply rounds in [`autofix`].
pub const MAX_PASSES: usize = 8;

pub fn generate_fixes(content: &str) -> Vec<Fix> {
    generate_fixes_with(content, &ScanOptions::default())
}

/// Fixes for the issues a scan with `opts` reports, in detection order.
pub fn generate_fixes_with(content: &str, opts: &ScanOptions) -> Vec<Fix> {
    let issues = lint_content_with(content, opts);
    let mut ctx = FixContext {
        content,
        lines: lines(content),
        gaps: missing_float_labels(content),
        runs: blank_runs(content).into(),
        labels: LabelCounter::new(content),
    };
    issues
        .iter()
        .filter(|i| i.auto_fix)
        .filter_map(|issue| {
            let rule = rules::rule(issue.rule_id)?;
            let (kind, description) = ctx.build(rule, issue)?;
            Some(Fix {
                issue_id: issue.rule_id,
                line: issue.line,
                kind,
                description,
            })
        })
        .collect()
}

struct FixContext<'a> {
    content: &'a str,
    lines: Vec<Line<'a>>,
    gaps: Vec<FloatGap>,
    runs: VecDeque<BlankRun>,
    labels: LabelCounter,
}

impl FixContext<'_> {
    fn line(&self, issue: &Issue) -> Option<&Line<'_>> {
        issue
            .line
            .and_then(|n| n.checked_sub(1))
            .and_then(|i| self.lines.get(i))
    }

    fn build(&mut self, rule: &Rule, issue: &Issue) -> Option<(FixKind, String)> {
        match rule.fix {
            FixTemplate::None => None,
            FixTemplate::ReplaceLine => {
                let line = self.line(issue)?;
                let start = byte_to_char(self.content, line.start);
                let end = start + line.text.chars().count();
                let fixed = issue.fix.clone()?;
                Some((
                    FixKind::Replace {
                        range: Range::new(start, end),
                        content: fixed,
                    },
                    format!("Fix line {}: {}", line.number, issue.message),
                ))
            }
            FixTemplate::ReplacePattern { replacement } => {
                let Detector::LineMatch(pattern) = rule.detector else {
                    return None;
                };
                let r = re(pattern)?;
                Some((
                    FixKind::ReplacePattern {
                        pattern: r.as_str().to_string(),
                        replacement: replacement.to_string(),
                    },
                    format!("Pattern fix: {}", rule.id),
                ))
            }
            FixTemplate::ReplaceMatch(render) => {
                let Detector::LineMatch(pattern) = rule.detector else {
                    return None;
                };
                let r = re(pattern)?;
                let line = self.line(issue)?;
                let code = strip_comment(line.text);
                let caps = r.captures_iter(code).find(|c| {
                    c.get(0)
                        .is_some_and(|m| Some(code[..m.start()].chars().count() + 1) == issue.column)
                })?;
                let replacement = render(&caps);
                Some((
                    FixKind::ReplacePattern {
                        pattern: regex::escape(&caps[0]),
                        replacement: replacement.replace('$', "$$"),
                    },
                    format!("Replace {} with {}", &caps[0], replacement),
                ))
            }
            FixTemplate::Refactor(kind) => Some((
                FixKind::Refactor {
                    refactor_type: kind,
                },
                kind.description().to_string(),
            )),
            FixTemplate::InsertPackage(package) => {
                let (position, content) = package_insertion(self.content, package, None);
                Some((
                    FixKind::InsertPackage {
                        package: package.to_string(),
                        position,
                        content,
                    },
                    format!("Add \\usepackage{{{}}}", package),
                ))
            }
            FixTemplate::InsertLabel { prefix } => {
                let idx = self.gaps.iter().position(|g| g.rule.id == rule.id)?;
                let gap = self.gaps.remove(idx);
                let label = self.labels.next(prefix);
                let content = if gap.inline {
                    format!("\\label{{{}}}", label)
                } else {
                    format!("{}\\label{{{}}}\n", gap.indent, label)
                };
                Some((
                    FixKind::Insert {
                        position: byte_to_char(self.content, gap.insert_at),
                        content,
                    },
                    format!("Add \\label{{{}}}", label),
                ))
            }
            FixTemplate::DeleteRange => {
                let run = self.runs.pop_front()?;
                let start = byte_to_char(self.content, run.extra.0);
                let end = byte_to_char(self.content, run.extra.1);
                Some((
                    FixKind::Delete {
                        range: Range::new(start, end),
                    },
                    format!("Remove {} extra blank line(s)", run.count - 1),
                ))
            }
        }
    }
}

/// Hands out `prefix:N` labels not already used in the document.
struct LabelCounter {
    taken: HashSet<String>,
    next: HashMap<&'static str, usize>,
}

impl LabelCounter {
    fn new(content: &str) -> Self {
        let taken = re(&rules::RE_LABEL)
            .map(|r| r.captures_iter(content).map(|c| c[1].to_string()).collect())
            .unwrap_or_default();
        LabelCounter {
            taken,
            next: HashMap::new(),
        }
    }

    fn next(&mut self, prefix: &'static str) -> String {
        let n = self.next.entry(prefix).or_insert(0);
        loop {
            *n += 1;
            let label = format!("{}:{}", prefix, n);
            if self.taken.insert(label.clone()) {
                return label;
            }
        }
    }
}

/// Result of a batch application.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FixOutcome {
    pub content: String,
    pub applied: Vec<Fix>,
    /// Offset fixes dropped because they overlap an earlier one.
    pub skipped: Vec<Fix>,
}

impl FixOutcome {
    pub fn changed(&self, original: &str) -> bool {
        self.content != original
    }
}

/// Whether two character spans touch the same text. An insert conflicts
/// only with a span that strictly contains its position.
fn overlaps(a: Range, b: Range) -> bool {
    let inside = |pos: usize, r: Range| r.start < pos && pos < r.end;
    match (a.start == a.end, b.start == b.end) {
        (true, true) => false,
        (true, false) => inside(a.start, b),
        (false, true) => inside(b.start, a),
        (false, false) => a.start < b.end && b.start < a.end,
    }
}

fn check_span(span: Range, len: usize) -> Result<(), PatchError> {
    if span.start == span.end && span.start > len {
        return Err(PatchError::PositionOutOfRange {
            position: span.start,
            len,
        });
    }
    if span.start > span.end || span.end > len {
        return Err(PatchError::InvalidRange {
            start: span.start,
            end: span.end,
            len,
        });
    }
    Ok(())
}

fn replacement_text(kind: &FixKind) -> &str {
    match kind {
        FixKind::Insert { content, .. }
        | FixKind::InsertPackage { content, .. }
        | FixKind::Replace { content, .. } => content,
        _ => "",
    }
}

/// Apply a batch of fixes computed against `content`.
///
/// Offset-based fixes are applied in descending position order so earlier
/// offsets stay valid. Identical fixes are applied once; a fix whose span
/// overlaps an already accepted one is skipped. Whole-text fixes run
/// afterwards in the order given; where one rewrites text an offset fix
/// also touched, the later writer wins.
pub fn apply_fixes(content: &str, fixes: &[Fix]) -> Result<FixOutcome, PatchError> {
    let len = content.chars().count();
    let mut positioned: Vec<(Range, &Fix)> = Vec::new();
    let mut whole_text: Vec<&Fix> = Vec::new();
    for fix in fixes {
        match fix.span() {
            Some(span) => {
                check_span(span, len)?;
                positioned.push((span, fix));
            }
            None => whole_text.push(fix),
        }
    }
    positioned.sort_by_key(|(span, _)| (span.start, span.end));

    let mut accepted: Vec<(Range, &Fix)> = Vec::new();
    let mut skipped = Vec::new();
    for (span, fix) in positioned {
        if accepted.iter().any(|(_, f)| f.kind == fix.kind) {
            continue;
        }
        if accepted.iter().any(|(s, _)| overlaps(*s, span)) {
            debug!(issue = fix.issue_id, start = span.start, end = span.end, "skipping overlapping fix");
            skipped.push(fix.clone());
            continue;
        }
        accepted.push((span, fix));
    }

    let mut out = content.to_string();
    for (span, fix) in accepted.iter().rev() {
        let start = char_to_byte(content, span.start).unwrap_or(content.len());
        let end = char_to_byte(content, span.end).unwrap_or(content.len());
        out.replace_range(start..end, replacement_text(&fix.kind));
    }
    let mut applied: Vec<Fix> = accepted.into_iter().map(|(_, f)| f.clone()).collect();

    let mut seen: Vec<&FixKind> = Vec::new();
    for fix in whole_text {
        if seen.contains(&&fix.kind) {
            continue;
        }
        seen.push(&fix.kind);
        match &fix.kind {
            FixKind::Refactor { refactor_type } => {
                out = refactor_type.apply(&out).0;
            }
            FixKind::ReplacePattern {
                pattern,
                replacement,
            } => {
                let r = Regex::new(pattern).map_err(|e| PatchError::InvalidPattern {
                    pattern: pattern.clone(),
                    reason: e.to_string(),
                })?;
                out = replace_in_code(&out, &r, replacement);
            }
            _ => continue,
        }
        applied.push(fix.clone());
    }

    Ok(FixOutcome {
        content: out,
        applied,
        skipped,
    })
}

/// Substitute matches of `r` that lie wholly in lintable code. Comments
/// and verbatim blocks are left as written.
fn replace_in_code(content: &str, r: &Regex, replacement: &str) -> String {
    let view = lintable_text(content);
    let mut out = String::with_capacity(content.len());
    let mut last = 0;
    for caps in r.captures_iter(&view) {
        let Some(m) = caps.get(0) else {
            continue;
        };
        if m.is_empty() || content.get(m.range()) != Some(m.as_str()) {
            continue;
        }
        out.push_str(&content[last..m.start()]);
        caps.expand(replacement, &mut out);
        last = m.end();
    }
    out.push_str(&content[last..]);
    out
}

/// Result of repeated fix rounds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutofixOutcome {
    pub content: String,
    pub passes: usize,
    pub applied: usize,
}

/// Generate and apply fixes until the text stops changing (at most
/// [`MAX_PASSES`] rounds). Skipped overlapping fixes get picked up on the
/// next round because they are regenerated from the updated text.
pub fn autofix(content: &str, opts: &ScanOptions) -> Result<AutofixOutcome, PatchError> {
    let mut current = content.to_string();
    let mut passes = 0;
    let mut applied = 0;
    while passes < MAX_PASSES {
        let fixes = generate_fixes_with(&current, opts);
        if fixes.is_empty() {
            break;
        }
        let outcome = apply_fixes(&current, &fixes)?;
        passes += 1;
        if !outcome.changed(&current) {
            break;
        }
        applied += outcome.applied.len();
        current = outcome.content;
    }
    Ok(AutofixOutcome {
        content: current,
        passes,
        applied,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refactor::RefactorKind;
    use crate::scan::lint_content;

    fn fixes_for<'a>(fixes: &'a [Fix], id: &str) -> Vec<&'a Fix> {
        fixes.iter().filter(|f| f.issue_id == id).collect()
    }

    fn apply_only(content: &str, id: &str) -> String {
        let fixes: Vec<Fix> = generate_fixes(content)
            .into_iter()
            .filter(|f| f.issue_id == id)
            .collect();
        apply_fixes(content, &fixes).unwrap().content
    }

    #[test]
    fn trailing_whitespace_becomes_line_replace() {
        let content = "Text with spaces    \nOther line";
        let fixes = generate_fixes(content);
        let ws = fixes_for(&fixes, "trailing_whitespace");
        assert_eq!(ws.len(), 1);
        assert_eq!(
            ws[0].kind,
            FixKind::Replace {
                range: Range::new(0, 20),
                content: "Text with spaces".into()
            }
        );
        assert_eq!(ws[0].line, Some(1));
        assert_eq!(apply_only(content, "trailing_whitespace"), "Text with spaces\nOther line");
    }

    #[test]
    fn line_ranges_are_character_offsets() {
        let content = "ação  \nb";
        let fixes = generate_fixes(content);
        let ws = fixes_for(&fixes, "trailing_whitespace");
        assert_eq!(ws[0].span(), Some(Range::new(0, 6)));
        assert_eq!(apply_only(content, "trailing_whitespace"), "ação\nb");
    }

    #[test]
    fn refactor_fixes_leave_comments_alone() {
        let content = "% cost: $$\nSee $$x$$ here\n";
        assert_eq!(
            apply_only(content, "deprecated_dollar_display"),
            "% cost: $$\nSee \\[x\\] here\n"
        );

        let content = "% \\begin{eqnarray} was here\n\\begin{eqnarray}\nx\n\\end{eqnarray}\n";
        assert_eq!(
            apply_only(content, "deprecated_eqnarray"),
            "% \\begin{eqnarray} was here\n\\begin{align}\nx\n\\end{align}\n"
        );
    }

    #[test]
    fn deprecated_environments_become_whole_text_refactors() {
        let content = "\n\\begin{eqnarray}\n  x &=& 1\n\\end{eqnarray}\n";
        let fixes = generate_fixes(content);
        let f = fixes_for(&fixes, "deprecated_eqnarray");
        assert_eq!(
            f[0].kind,
            FixKind::Refactor {
                refactor_type: RefactorKind::EqnarrayToAlign
            }
        );
        let out = apply_only(content, "deprecated_eqnarray");
        assert!(out.contains("\\begin{align}") && out.contains("\\end{align}"));

        let out = apply_only("Equation: $$x^2 + y^2 = z^2$$", "deprecated_dollar_display");
        assert_eq!(out, "Equation: \\[x^2 + y^2 = z^2\\]");
    }

    #[test]
    fn figure_label_goes_after_caption_line() {
        let content = "\n\\begin{figure}\n  \\includegraphics{image.png}\n  \\caption{An image}\n\\end{figure}\n";
        let fixes = generate_fixes(content);
        let f = fixes_for(&fixes, "missing_label_in_figure");
        assert_eq!(f.len(), 1);
        assert!(matches!(&f[0].kind, FixKind::Insert { content, .. } if content == "  \\label{fig:1}\n"));
        assert_eq!(
            apply_only(content, "missing_label_in_figure"),
            "\n\\begin{figure}\n  \\includegraphics{image.png}\n  \\caption{An image}\n  \\label{fig:1}\n\\end{figure}\n"
        );
    }

    #[test]
    fn label_counter_skips_existing_labels() {
        let content = "\\label{fig:1}\n\\begin{figure}\n\\caption{A}\n\\end{figure}\n\\begin{figure}\n\\caption{B}\n\\end{figure}\n\\begin{table}\n\\caption{T}\n\\end{table}";
        let out = apply_only(content, "missing_label_in_figure");
        assert!(out.contains("\\caption{A}\n\\label{fig:2}\n"));
        assert!(out.contains("\\caption{B}\n\\label{fig:3}\n"));
        let out = apply_only(content, "missing_label_in_table");
        assert!(out.ends_with("\\caption{T}\n\\label{tab:1}\n\\end{table}"));
    }

    #[test]
    fn caption_without_line_break_gets_inline_label() {
        let content = "\\begin{table}\\caption{T}";
        let gaps = missing_float_labels(content);
        assert!(gaps.is_empty());
        let content = "\\begin{table}\n\\caption{T}\\end{table}";
        assert_eq!(
            apply_only(content, "missing_label_in_table"),
            "\\begin{table}\n\\caption{T}\\label{tab:1}\\end{table}"
        );
    }

    #[test]
    fn missing_package_inserts_after_documentclass() {
        let content = "\\documentclass{article}\n\\begin{document}\n\\includegraphics{test.png}\n\\end{document}\n";
        let fixes = generate_fixes(content);
        let f = fixes_for(&fixes, "missing_package_graphicx");
        assert_eq!(
            f[0].kind,
            FixKind::InsertPackage {
                package: "graphicx".into(),
                position: 24,
                content: "\\usepackage{graphicx}\n".into()
            }
        );
        let out = apply_fixes(content, &generate_fixes(content)).unwrap().content;
        assert!(out.starts_with("\\documentclass{article}\n\\usepackage{graphicx}\n\\begin{document}"));
    }

    #[test]
    fn duplicate_package_inserts_apply_once() {
        let content = "\\documentclass{article}\n\\includegraphics{a}\n\\includegraphics{b}\n";
        let fixes = generate_fixes(content);
        assert_eq!(fixes_for(&fixes, "missing_package_graphicx").len(), 2);
        let out = apply_fixes(content, &fixes).unwrap().content;
        assert_eq!(out.matches("\\usepackage{graphicx}").count(), 1);
    }

    #[test]
    fn reference_spacing_uses_pattern_substitution() {
        let fixes = generate_fixes("See Figure \\ref{fig:test}");
        assert!(matches!(fixes[0].kind, FixKind::ReplacePattern { .. }));
        assert_eq!(
            apply_only("See Figure \\ref{fig:test}", "non_breaking_space"),
            "See Figure~\\ref{fig:test}"
        );
    }

    #[test]
    fn old_fonts_are_rewritten_per_occurrence() {
        assert_eq!(
            apply_only("Text {\\bf bold} and {\\it italic}", "old_font_commands"),
            "Text \\textbf{bold} and \\textit{italic}"
        );
        assert_eq!(apply_only("{\\bf $x$ cost}", "old_font_commands"), "\\textbf{$x$ cost}");
    }

    #[test]
    fn pattern_fixes_skip_comments_and_verbatim() {
        let content = "{\\bf x}\n% {\\bf x}\n\\begin{verbatim}\n{\\bf x}\n\\end{verbatim}\n";
        assert_eq!(
            apply_only(content, "old_font_commands"),
            "\\textbf{x}\n% {\\bf x}\n\\begin{verbatim}\n{\\bf x}\n\\end{verbatim}\n"
        );

        let content = "See Figure \\ref{a}\n\\begin{lstlisting}\nFigure \\ref{b}\n\\end{lstlisting}\n";
        assert_eq!(
            apply_only(content, "non_breaking_space"),
            "See Figure~\\ref{a}\n\\begin{lstlisting}\nFigure \\ref{b}\n\\end{lstlisting}\n"
        );
    }

    #[test]
    fn extra_blank_lines_are_deleted() {
        assert_eq!(
            apply_only("Paragraph 1\n\n\n\nParagraph 2", "paragraph_spacing"),
            "Paragraph 1\n\nParagraph 2"
        );
    }

    #[test]
    fn every_auto_fixable_issue_gets_a_fix() {
        let doc = "\\documentclass{article}\n\\begin{document}\nSee Figure \\ref{a} and {\\bf b}  \n\\begin{eqnarray}\nx\n\\end{eqnarray}\n$$y$$\n\\begin{figure}\n\\caption{c}\n\\end{figure}\n\n\n\n\\includegraphics{z}\n\\begin{align}\nq\n\\end{align}\n\\nd{document}\n\"quoted\"\n";
        let fixable = lint_content(doc).iter().filter(|i| i.auto_fix).count();
        assert!(fixable >= 10);
        assert_eq!(generate_fixes(doc).len(), fixable);
    }

    #[test]
    fn overlapping_line_fixes_are_skipped_then_picked_up() {
        let content = "\\nd{x} \"q\"";
        let fixes = generate_fixes(content);
        let outcome = apply_fixes(content, &fixes).unwrap();
        assert_eq!(outcome.content, "\\end{x} \"q\"");
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].issue_id, "quote_style");

        let done = autofix(content, &ScanOptions::default()).unwrap();
        assert_eq!(done.content, "\\end{x} ``q''");
        assert_eq!(done.passes, 2);
    }

    #[test]
    fn offset_fixes_apply_bottom_to_top() {
        let fix = |kind| Fix {
            issue_id: "test",
            line: None,
            kind,
            description: String::new(),
        };
        let fixes = vec![
            fix(FixKind::Insert { position: 0, content: ">> ".into() }),
            fix(FixKind::Replace { range: Range::new(6, 11), content: "Universe".into() }),
            fix(FixKind::Delete { range: Range::new(11, 12) }),
        ];
        let out = apply_fixes("Hello World!", &fixes).unwrap();
        assert_eq!(out.content, ">> Hello Universe");
        assert_eq!(out.applied.len(), 3);
    }

    #[test]
    fn out_of_range_fix_is_an_error() {
        let fix = Fix {
            issue_id: "test",
            line: None,
            kind: FixKind::Delete { range: Range::new(2, 50) },
            description: String::new(),
        };
        assert_eq!(
            apply_fixes("short", &[fix]),
            Err(PatchError::InvalidRange { start: 2, end: 50, len: 5 })
        );
    }

    #[test]
    fn clean_document_is_a_fixed_point() {
        let doc = "\\documentclass{article}\n\\begin{document}\nHi.\n\\end{document}\n";
        assert!(generate_fixes(doc).is_empty());
        let done = autofix(doc, &ScanOptions::default()).unwrap();
        assert_eq!(done.content, doc);
        assert_eq!(done.passes, 0);
    }
}
