//! Document scanner.
//!
//! Walks the text line by line, then once over the whole document, and
//! evaluates the rule table from [`crate::rules`]. Scanning is a pure
//! function of its input: every call threads a fresh [`Session`] through
//! the checks, so two scans of the same text always agree.
//!
//! The scanner works at the lexical level (regexes, brace counting and a
//! small environment stack). It never fails; odd input just yields more
//! or fewer issues.

use std::collections::{BTreeMap, HashSet};

use crate::models::{Issue, ScanReport, Suggestion};
use crate::refactor::package_loaded;
use crate::rules::{self, re, Detector, Rule, Scope, RULES};
use crate::utils::{line_of, line_starts, mask_code, mask_comments, strip_comment, strip_comments};

/// Knobs that reach the scanner from configuration.
#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub max_line_length: usize,
    /// Rule ids whose issues are dropped.
    pub disabled: HashSet<String>,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            max_line_length: 120,
            disabled: HashSet::new(),
        }
    }
}

/// Scan `content` with default options. `filename` is carried into the
/// report and never affects detection.
pub fn scan(content: &str, filename: Option<&str>) -> ScanReport {
    scan_with(content, filename, &ScanOptions::default())
}

pub fn scan_with(content: &str, filename: Option<&str>, opts: &ScanOptions) -> ScanReport {
    ScanReport::new(filename, collect_issues(content, opts), suggest_packages(content))
}

/// All issues in detection order: line checks first, then document checks.
pub fn lint_content(content: &str) -> Vec<Issue> {
    collect_issues(content, &ScanOptions::default())
}

pub fn lint_content_with(content: &str, opts: &ScanOptions) -> Vec<Issue> {
    collect_issues(content, opts)
}

/// Packages the document seems to need but does not load. Advisory.
pub fn suggest_packages(content: &str) -> Vec<Suggestion> {
    let text = strip_comments(content);
    rules::PACKAGE_HINTS
        .iter()
        .filter(|h| h.triggers.iter().any(|t| text.contains(t)))
        .filter(|h| !package_loaded(content, h.package))
        .map(|h| Suggestion {
            package: h.package,
            reason: h.reason,
        })
        .collect()
}

struct Session<'a> {
    opts: &'a ScanOptions,
    issues: Vec<Issue>,
}

impl Session<'_> {
    fn push(&mut self, issue: Issue) {
        if !self.opts.disabled.contains(issue.rule_id) {
            self.issues.push(issue);
        }
    }
}

fn collect_issues(content: &str, opts: &ScanOptions) -> Vec<Issue> {
    let mut session = Session {
        opts,
        issues: Vec::new(),
    };
    check_lines(content, &mut session);
    check_document(content, &mut session);
    session.issues
}

/// One physical line. `text` excludes the newline and any `\r`.
pub(crate) struct Line<'a> {
    pub number: usize,
    pub start: usize,
    pub text: &'a str,
}

pub(crate) fn lines(content: &str) -> Vec<Line<'_>> {
    let mut start = 0;
    content
        .split('\n')
        .enumerate()
        .map(|(i, raw)| {
            let line = Line {
                number: i + 1,
                start,
                text: raw.strip_suffix('\r').unwrap_or(raw),
            };
            start += raw.len() + 1;
            line
        })
        .collect()
}

/// 1-based character column of byte offset `byte` in `line`.
fn column(line: &str, byte: usize) -> usize {
    line[..byte].chars().count() + 1
}

fn in_any(stack: &[String], names: &[&str]) -> bool {
    stack.iter().any(|e| names.contains(&e.as_str()))
}

static VERBATIM_ENVS: &[&str] = &["verbatim", "verbatim*", "lstlisting", "minted", "comment"];

/// `content` with comments and verbatim block lines blanked to spaces.
/// Byte offsets match `content`; this is the text the line checks see.
pub(crate) fn lintable_text(content: &str) -> String {
    let mut envs: Vec<String> = Vec::new();
    let mut out = String::with_capacity(content.len());
    for (i, raw) in content.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let code = strip_comment(raw);
        let verbatim = in_any(&envs, VERBATIM_ENVS);
        track_envs(code, &mut envs);
        let kept = if verbatim { "" } else { code };
        out.push_str(kept);
        out.extend(std::iter::repeat(' ').take(raw.len() - kept.len()));
    }
    out
}

// ── Line checks ────────────────────────────────────────────────────────────

fn check_lines(content: &str, s: &mut Session) {
    let mut envs: Vec<String> = Vec::new();
    let mut inline_math = false;
    for line in lines(content) {
        let code = strip_comment(line.text);
        let n = line.number;
        let verbatim = in_any(&envs, VERBATIM_ENVS);
        let started_math = in_any(&envs, rules::MATH_ENVS);
        let started_break = in_any(&envs, rules::LINE_BREAK_ENVS);
        track_envs(code, &mut envs);
        let in_math_env = started_math || in_any(&envs, rules::MATH_ENVS);
        let in_break_env = started_break || in_any(&envs, rules::LINE_BREAK_ENVS);

        if line.text.trim().is_empty() {
            inline_math = false;
        }

        if !verbatim {
            check_line_braces(code, n, s);
            check_typos(&line, code, s);
            if let Some(col) = math_violation(code, in_math_env, &mut inline_math) {
                let ch = code.chars().nth(col - 1).unwrap_or('_');
                s.push(
                    Issue::new(
                        &rules::MATH_MODE,
                        Some(n),
                        format!("'{}' outside math mode; wrap the expression in $...$", ch),
                    )
                    .at_column(col),
                );
            }
            check_quotes(&line, code, s);
            if !in_break_env && code.trim_end().ends_with("\\\\") {
                let r = &rules::TRAILING_LINE_BREAK;
                s.push(Issue::new(r, Some(n), r.message));
            }
            if n < 20
                && code.contains("\\includegraphics")
                && !package_loaded(&content[..line.start], "graphicx")
            {
                let r = &rules::MISSING_PACKAGE_GRAPHICX;
                let col = code.find("\\includegraphics").map(|b| column(code, b));
                let mut issue = Issue::new(r, Some(n), r.message);
                issue.column = col;
                s.push(issue);
            }
            check_input_paths(code, n, s);
            check_line_patterns(code, n, s);
        }

        let trimmed = line.text.trim_end();
        if trimmed.len() != line.text.len() {
            let r = &rules::TRAILING_WHITESPACE;
            s.push(
                Issue::new(r, Some(n), r.message)
                    .at_column(trimmed.chars().count() + 1)
                    .with_fix(trimmed),
            );
        }
        let len = line.text.chars().count();
        if len > s.opts.max_line_length {
            s.push(Issue::new(
                &rules::LINE_LENGTH,
                Some(n),
                format!("Line too long ({} characters)", len),
            ));
        }
    }
}

/// Update the open-environment stack with the `\begin`/`\end` tokens of a
/// line, in textual order.
fn track_envs(code: &str, envs: &mut Vec<String>) {
    let (Some(b), Some(e)) = (re(&rules::RE_BEGIN_ENV), re(&rules::RE_END_ENV)) else {
        return;
    };
    let mut tokens: Vec<(usize, bool, &str)> = Vec::new();
    for c in b.captures_iter(code) {
        if let (Some(m), Some(name)) = (c.get(0), c.get(1)) {
            tokens.push((m.start(), true, name.as_str()));
        }
    }
    for c in e.captures_iter(code) {
        if let (Some(m), Some(name)) = (c.get(0), c.get(1)) {
            tokens.push((m.start(), false, name.as_str()));
        }
    }
    tokens.sort_by_key(|t| t.0);
    for (_, begin, name) in tokens {
        if begin {
            envs.push(name.to_string());
        } else if let Some(pos) = envs.iter().rposition(|e| e == name) {
            envs.remove(pos);
        }
    }
}

fn check_line_braces(code: &str, n: usize, s: &mut Session) {
    let open = code.matches('{').count();
    let close = code.matches('}').count();
    if open != close {
        s.push(Issue::new(
            &rules::LINE_BRACE_BALANCE,
            Some(n),
            format!("Unbalanced braces on this line: {} '{{' vs {} '}}'", open, close),
        ));
    }
}

fn check_typos(line: &Line, code: &str, s: &mut Session) {
    for (typo, correct) in rules::TYPOS {
        if let Some(b) = code.find(typo) {
            s.push(
                Issue::new(
                    &rules::TYPO_COMMAND,
                    Some(line.number),
                    format!("Possible typo: '{}' should be '{}'", typo, correct),
                )
                .at_column(column(code, b))
                .with_fix(line.text.replace(typo, correct)),
            );
        }
    }
}

/// Blank out arguments of commands that take keys or paths, so that
/// `\label{eq_1}` does not look like a subscript. Keeps char columns.
fn mask_arguments(code: &str) -> String {
    match re(&rules::RE_ARGUMENT_COMMANDS) {
        Some(r) => r
            .replace_all(code, |c: &regex::Captures| " ".repeat(c[0].chars().count()))
            .into_owned(),
        None => code.to_string(),
    }
}

/// Column of the first `_`/`^` outside math on this line. `inline` carries
/// open `$`, `\(` or `\[` state across lines of a paragraph.
fn math_violation(code: &str, in_math_env: bool, inline: &mut bool) -> Option<usize> {
    let chars: Vec<char> = mask_arguments(code).chars().collect();
    let mut found = None;
    let mut i = 0;
    while i < chars.len() {
        match chars[i] {
            '\\' => {
                match chars.get(i + 1) {
                    Some('(') | Some('[') => *inline = true,
                    Some(')') | Some(']') => *inline = false,
                    _ => {}
                }
                i += 2;
                continue;
            }
            '$' => {
                if chars.get(i + 1) == Some(&'$') {
                    i += 1;
                }
                *inline = !*inline;
            }
            '_' | '^' if !*inline && !in_math_env && found.is_none() => found = Some(i + 1),
            _ => {}
        }
        i += 1;
    }
    found
}

/// Byte offsets of `"` not written as the `\"` accent.
fn quote_positions(code: &str) -> Vec<usize> {
    code.char_indices()
        .filter(|(i, c)| *c == '"' && !code[..*i].ends_with('\\'))
        .map(|(i, _)| i)
        .collect()
}

/// Rewrite the first `"..."` pair (or a lone `"`) as TeX quotes.
fn fix_quotes(text: &str, quotes: &[usize]) -> Option<String> {
    let first = *quotes.first()?;
    Some(match quotes.get(1) {
        Some(&second) => format!(
            "{}``{}''{}",
            &text[..first],
            &text[first + 1..second],
            &text[second + 1..]
        ),
        None => format!("{}``{}", &text[..first], &text[first + 1..]),
    })
}

fn check_quotes(line: &Line, code: &str, s: &mut Session) {
    let quotes = quote_positions(code);
    if let Some(fixed) = fix_quotes(line.text, &quotes) {
        let r = &rules::QUOTE_STYLE;
        s.push(
            Issue::new(r, Some(line.number), r.message)
                .at_column(column(code, quotes[0]))
                .with_fix(fixed),
        );
    }
}

/// Whether an `\input`/`\include` argument escapes the project.
pub(crate) fn unsafe_path(arg: &str) -> bool {
    let arg = arg.trim();
    arg.contains('|')
        || arg.starts_with('/')
        || re(&rules::RE_DRIVE_PATH).is_some_and(|r| r.is_match(arg))
}

fn check_input_paths(code: &str, n: usize, s: &mut Session) {
    let Some(r) = re(&rules::RE_INPUT_ARG) else {
        return;
    };
    for c in r.captures_iter(code) {
        if unsafe_path(&c[2]) {
            let start = c.get(0).map(|m| m.start()).unwrap_or(0);
            s.push(
                Issue::new(
                    &rules::FORBIDDEN_INPUT_PATH,
                    Some(n),
                    format!(
                        "Forbidden file reference \\{}{{{}}}: absolute paths and pipes are not allowed",
                        &c[1], &c[2]
                    ),
                )
                .at_column(column(code, start)),
            );
        }
    }
}

fn check_line_patterns(code: &str, n: usize, s: &mut Session) {
    for rule in RULES.iter().filter(|r| r.scope == Scope::Line) {
        let Detector::LineMatch(pattern) = rule.detector else {
            continue;
        };
        let Some(r) = re(pattern) else {
            continue;
        };
        for m in r.find_iter(code) {
            s.push(
                Issue::new(rule, Some(n), rule.render(m.as_str())).at_column(column(code, m.start())),
            );
        }
    }
}

// ── Document checks ────────────────────────────────────────────────────────

fn check_document(content: &str, s: &mut Session) {
    let text = mask_code(content);
    let starts = line_starts(content);

    check_structure_counts(&text, s);
    check_after_end_document(&text, &starts, s);
    check_duplicate_labels(&text, s);
    check_bibliography(&text, &starts, s);
    check_text_after_end(&text, s);
    check_global_braces(&text, s);
    check_environments(&text, s);
    check_missing_structure(&text, s);
    check_document_patterns(content, &text, &starts, s);
    for gap in missing_float_labels(content) {
        let rule = gap.rule;
        s.push(Issue::new(rule, Some(line_of(&starts, gap.begin)), rule.message));
    }
    check_amsmath(content, &text, &starts, s);
    for run in blank_runs(content) {
        s.push(Issue::new(
            &rules::PARAGRAPH_SPACING,
            Some(run.first_line + 1),
            format!("{} consecutive blank lines; one is enough", run.count),
        ));
    }
}

const DOCUMENTCLASS: &str = "\\documentclass";
const BEGIN_DOCUMENT: &str = "\\begin{document}";
const END_DOCUMENT: &str = "\\end{document}";

fn check_structure_counts(text: &str, s: &mut Session) {
    for (needle, rule) in [
        (DOCUMENTCLASS, &rules::MULTIPLE_DOCUMENTCLASS),
        (BEGIN_DOCUMENT, &rules::MULTIPLE_BEGIN_DOCUMENT),
        (END_DOCUMENT, &rules::MULTIPLE_END_DOCUMENT),
    ] {
        let count = text.matches(needle).count();
        if count > 1 {
            s.push(Issue::new(
                rule,
                None,
                format!("{} ({} found)", rule.message, count),
            ));
        }
    }
}

fn check_after_end_document(text: &str, starts: &[usize], s: &mut Session) {
    let Some(pos) = text.rfind(END_DOCUMENT) else {
        return;
    };
    let tail_start = pos + END_DOCUMENT.len();
    let tail = &text[tail_start..];
    let trimmed = tail.trim_start();
    if trimmed.is_empty() {
        return;
    }
    let offset = tail_start + (tail.len() - trimmed.len());
    let preview: String = trimmed.trim_end().chars().take(50).collect();
    s.push(Issue::new(
        &rules::CONTENT_AFTER_END_DOCUMENT,
        Some(line_of(starts, offset)),
        format!("Content after \\end{{document}}: \"{}\"", preview),
    ));
}

fn check_duplicate_labels(text: &str, s: &mut Session) {
    let Some(r) = re(&rules::RE_LABEL) else {
        return;
    };
    let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
    for c in r.captures_iter(text) {
        if let Some(m) = c.get(1) {
            *counts.entry(m.as_str()).or_default() += 1;
        }
    }
    for (label, count) in counts.into_iter().filter(|(_, c)| *c > 1) {
        s.push(Issue::new(
            &rules::DUPLICATE_LABEL,
            None,
            format!("Duplicate label \"{}\" found {} times", label, count),
        ));
    }
}

fn check_bibliography(text: &str, starts: &[usize], s: &mut Session) {
    let has_cite = re(&rules::RE_CITE).is_some_and(|r| r.is_match(text));
    let has_bib = text.contains("\\bibliography{")
        || text.contains("\\begin{thebibliography}")
        || text.contains("\\addbibresource{");
    if has_cite && !has_bib {
        let r = &rules::MISSING_BIBLIOGRAPHY;
        s.push(Issue::new(r, None, r.message));
    }
    let Some(r) = re(&rules::RE_BIBLIOGRAPHY) else {
        return;
    };
    for c in r.captures_iter(text) {
        let line = c.get(0).map(|m| line_of(starts, m.start()));
        for name in c[1].split(',').map(str::trim).filter(|n| !n.is_empty()) {
            let file = if name.ends_with(".bib") {
                name.to_string()
            } else {
                format!("{}.bib", name)
            };
            s.push(Issue::new(
                &rules::BIBLIOGRAPHY_FILE,
                line,
                format!("Bibliography file \"{}\" referenced - ensure it exists", file),
            ));
        }
    }
}

fn check_text_after_end(text: &str, s: &mut Session) {
    let Some(r) = re(&rules::RE_END_TRAILING) else {
        return;
    };
    for line in lines(text) {
        let Some(c) = r.captures(line.text) else {
            continue;
        };
        let Some(rest) = c.get(1) else {
            continue;
        };
        let trailing = rest.as_str().trim();
        if trailing.is_empty() {
            continue;
        }
        let lead = rest.as_str().len() - rest.as_str().trim_start().len();
        s.push(
            Issue::new(
                &rules::TEXT_AFTER_END,
                Some(line.number),
                format!("Text found after \\end command: \"{}\"", trailing),
            )
            .at_column(column(line.text, rest.start() + lead)),
        );
    }
}

fn check_global_braces(text: &str, s: &mut Session) {
    let open = text.matches('{').count();
    let close = text.matches('}').count();
    if open == close {
        return;
    }
    let (n, direction) = if open > close {
        (open - close, "extra opening")
    } else {
        (close - open, "extra closing")
    };
    s.push(Issue::new(
        &rules::UNBALANCED_BRACES,
        None,
        format!("Unbalanced braces: {} {}", n, direction),
    ));
}

fn check_environments(text: &str, s: &mut Session) {
    let (Some(b), Some(e)) = (re(&rules::RE_BEGIN_ENV), re(&rules::RE_END_ENV)) else {
        return;
    };
    let mut counts: BTreeMap<&str, (usize, usize)> = BTreeMap::new();
    for c in b.captures_iter(text) {
        if let Some(m) = c.get(1) {
            counts.entry(m.as_str()).or_default().0 += 1;
        }
    }
    for c in e.captures_iter(text) {
        if let Some(m) = c.get(1) {
            counts.entry(m.as_str()).or_default().1 += 1;
        }
    }
    for (env, (begins, ends)) in counts.into_iter().filter(|(_, (b, e))| b != e) {
        s.push(Issue::new(
            &rules::UNBALANCED_ENVIRONMENT,
            None,
            format!(
                "Unbalanced environment \"{}\": {} begin vs {} end",
                env, begins, ends
            ),
        ));
    }
}

fn check_missing_structure(text: &str, s: &mut Session) {
    for (needle, rule) in [
        (DOCUMENTCLASS, &rules::MISSING_DOCUMENTCLASS),
        (BEGIN_DOCUMENT, &rules::MISSING_BEGIN_DOCUMENT),
        (END_DOCUMENT, &rules::MISSING_END_DOCUMENT),
    ] {
        if !text.contains(needle) {
            s.push(Issue::new(rule, None, rule.message));
        }
    }
}

fn check_document_patterns(content: &str, text: &str, starts: &[usize], s: &mut Session) {
    for rule in RULES.iter().filter(|r| r.scope == Scope::Document) {
        let Detector::DocumentMatch(pattern) = rule.detector else {
            continue;
        };
        let Some(r) = re(pattern) else {
            continue;
        };
        for m in r.find_iter(text) {
            let line = line_of(starts, m.start());
            let line_start = starts[line - 1];
            s.push(
                Issue::new(rule, Some(line), rule.render(m.as_str()))
                    .at_column(column(&content[line_start..], m.start() - line_start)),
            );
        }
    }
}

fn check_amsmath(content: &str, text: &str, starts: &[usize], s: &mut Session) {
    let Some(r) = re(&rules::RE_AMSMATH_ENV) else {
        return;
    };
    let Some(c) = r.captures(text) else {
        return;
    };
    if package_loaded(content, "amsmath") || package_loaded(content, "mathtools") {
        return;
    }
    let start = c.get(0).map(|m| m.start()).unwrap_or(0);
    s.push(Issue::new(
        &rules::MISSING_PACKAGE_AMSMATH,
        Some(line_of(starts, start)),
        format!("Environment \"{}\" requires package amsmath", &c[1]),
    ));
}

/// A figure or table with a caption and no label.
pub(crate) struct FloatGap {
    pub rule: &'static Rule,
    /// Byte offset of `\begin{figure}` / `\begin{table}`.
    pub begin: usize,
    /// Byte offset where the label line goes.
    pub insert_at: usize,
    /// No line break between the caption and the end of the float; the
    /// label goes right after the caption's closing brace.
    pub inline: bool,
    pub indent: String,
}

pub(crate) fn missing_float_labels(content: &str) -> Vec<FloatGap> {
    let text = mask_comments(content);
    let Some(caption) = re(&rules::RE_CAPTION) else {
        return Vec::new();
    };
    let mut gaps = Vec::new();
    for (pattern, rule) in [
        (&rules::RE_FIGURE, &rules::MISSING_LABEL_IN_FIGURE),
        (&rules::RE_TABLE, &rules::MISSING_LABEL_IN_TABLE),
    ] {
        let Some(r) = re(pattern) else {
            continue;
        };
        for m in r.find_iter(&text) {
            let block = m.as_str();
            if block.contains("\\label{") {
                continue;
            }
            let Some(c) = caption.find(block) else {
                continue;
            };
            let open = m.start() + c.end() - 1;
            let close = matching_brace(&text, open)
                .filter(|c| *c < m.end())
                .unwrap_or(open);
            let caption_line_start = text[..m.start() + c.start()]
                .rfind('\n')
                .map(|i| i + 1)
                .unwrap_or(0);
            let indent: String = content[caption_line_start..]
                .chars()
                .take_while(|ch| *ch == ' ' || *ch == '\t')
                .collect();
            let (insert_at, inline) = match text[close..m.end()].find('\n') {
                Some(nl) => (close + nl + 1, false),
                None => (close + 1, true),
            };
            gaps.push(FloatGap {
                rule,
                begin: m.start(),
                insert_at,
                inline,
                indent,
            });
        }
    }
    gaps.sort_by_key(|g| g.begin);
    gaps
}

/// Byte offset of the `}` closing the `{` at `open`.
fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, ch) in text[open..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// A run of two or more consecutive blank lines.
pub(crate) struct BlankRun {
    /// 1-based line of the first blank line in the run.
    pub first_line: usize,
    pub count: usize,
    /// Byte range covering every blank line after the first.
    pub extra: (usize, usize),
}

pub(crate) fn blank_runs(content: &str) -> Vec<BlankRun> {
    let mut all = lines(content);
    // The empty segment after a final newline is not a line.
    if content.ends_with('\n') {
        all.pop();
    }
    let mut runs = Vec::new();
    let mut i = 0;
    while i < all.len() {
        if !all[i].text.trim().is_empty() {
            i += 1;
            continue;
        }
        let mut j = i;
        while j + 1 < all.len() && all[j + 1].text.trim().is_empty() {
            j += 1;
        }
        if j > i {
            let end = all
                .get(j + 1)
                .map(|l| l.start)
                .unwrap_or(content.len());
            runs.push(BlankRun {
                first_line: all[i].number,
                count: j - i + 1,
                extra: (all[i + 1].start, end),
            });
        }
        i = j + 1;
    }
    runs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;

    const CLEAN: &str = "\\documentclass{article}\n\\usepackage{amsmath}\n\\begin{document}\nHello $x^2$.\n\\end{document}\n";

    fn ids(content: &str) -> Vec<&'static str> {
        lint_content(content).into_iter().map(|i| i.rule_id).collect()
    }

    fn by_rule(content: &str, id: &str) -> Vec<Issue> {
        lint_content(content)
            .into_iter()
            .filter(|i| i.rule_id == id)
            .collect()
    }

    #[test]
    fn clean_document_has_no_issues() {
        assert!(lint_content(CLEAN).is_empty(), "{:?}", ids(CLEAN));
    }

    #[test]
    fn empty_and_non_latex_input_only_yield_structure_issues() {
        let report = scan("", None);
        let got: Vec<_> = report.issues().map(|i| i.rule_id).collect();
        assert_eq!(
            got,
            vec!["missing_begin_document", "missing_end_document", "missing_documentclass"]
        );
        let report = scan("just some plain words", Some("notes.txt"));
        assert_eq!(report.filename.as_deref(), Some("notes.txt"));
        assert_eq!(report.summary().total, 3);
    }

    #[test]
    fn scanning_is_idempotent() {
        let doc = "\\begin{itemize}\n\\item a_b \"q\"  \n\\label{x}\\label{x}\n";
        assert_eq!(scan(doc, None), scan(doc, None));
    }

    #[test]
    fn summary_reflects_only_the_current_scan() {
        let noisy = "\\write18{bad}\n\\begin{eqnarray}\nx = 1\n\\end{eqnarray}\n$$y = 2$$\n";
        let first = scan(noisy, None).summary();
        assert!(first.total > 0);
        assert!(first.errors > 0);
        assert!(first.warnings > 0);
        assert!(first.auto_fixable > 0);
        let second = scan(CLEAN, None).summary();
        assert_eq!(second, crate::models::Summary::default());
    }

    #[test]
    fn per_line_brace_heuristic() {
        let issues = by_rule("\\section{Open\n}", "line_brace_balance");
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].severity, Severity::Warning);
        assert!(by_rule("% {{{ folded", "line_brace_balance").is_empty());
    }

    #[test]
    fn typo_has_line_fix() {
        let issues = by_rule("a\n\\begin{itemize}\n\\nd{itemize}", "typo_command");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Error);
        assert_eq!(issues[0].line, Some(3));
        assert_eq!(issues[0].fix.as_deref(), Some("\\end{itemize}"));
        assert!(issues[0].auto_fix);
    }

    #[test]
    fn subscript_outside_math_is_an_error() {
        let issues = by_rule("the value x_1 is small", "math_mode");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].column, Some(12));
        assert!(by_rule("the value $x_1$ and \\(y^2\\)", "math_mode").is_empty());
        assert!(by_rule("\\label{eq_1} \\ref{sec_a} \\_ escaped", "math_mode").is_empty());
        assert!(by_rule("\\begin{equation}\nx_1 = y^2\n\\end{equation}", "math_mode").is_empty());
        assert!(by_rule("\\[\n  a_n\n\\]", "math_mode").is_empty());
        assert!(by_rule("Equation: $$x^2 + y^2 = z^2$$", "math_mode").is_empty());
    }

    #[test]
    fn straight_quotes_suggest_tex_quotes() {
        let issues = by_rule("He said \"hi\" twice", "quote_style");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].fix.as_deref(), Some("He said ``hi'' twice"));
        assert!(by_rule("na\\\"ive", "quote_style").is_empty());
        let lone = by_rule("open \" only", "quote_style");
        assert_eq!(lone[0].fix.as_deref(), Some("open `` only"));
    }

    #[test]
    fn trailing_line_break_outside_tables() {
        assert_eq!(by_rule("Some text\\\\", "trailing_line_break").len(), 1);
        let table = "\\begin{tabular}{cc}\na & b \\\\\nc & d \\\\\n\\end{tabular}";
        assert!(by_rule(table, "trailing_line_break").is_empty());
    }

    #[test]
    fn includegraphics_needs_graphicx_early() {
        let doc = "\\documentclass{article}\n\\begin{document}\n\\includegraphics{test.png}\n\\end{document}\n";
        let issues = by_rule(doc, "missing_package_graphicx");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Error);
        assert_eq!(issues[0].fix_type, Some(rules::FixType::InsertPackage));

        let ok = "\\documentclass{article}\n\\usepackage{graphicx}\n\\begin{document}\n\\includegraphics{test.png}\n\\end{document}\n";
        assert!(by_rule(ok, "missing_package_graphicx").is_empty());

        let late = format!("{}\\includegraphics{{a.png}}", "x\n".repeat(25));
        assert!(by_rule(&late, "missing_package_graphicx").is_empty());
    }

    #[test]
    fn trailing_whitespace_and_long_lines() {
        let issues = by_rule("Text with spaces    \nOther line", "trailing_whitespace");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].fix.as_deref(), Some("Text with spaces"));
        assert!(issues[0].auto_fix);

        let long = "a".repeat(121);
        let issues = by_rule(&long, "line_length");
        assert_eq!(issues.len(), 1);
        assert!(!issues[0].auto_fix);
        assert!(by_rule(&"a".repeat(120), "line_length").is_empty());
    }

    #[test]
    fn configured_line_length_and_disabled_rules() {
        let opts = ScanOptions {
            max_line_length: 10,
            disabled: ["missing_documentclass".to_string()].into_iter().collect(),
        };
        let report = scan_with("0123456789abc", None, &opts);
        let got: Vec<_> = report.issues().map(|i| i.rule_id).collect();
        assert!(got.contains(&"line_length"));
        assert!(!got.contains(&"missing_documentclass"));
    }

    #[test]
    fn dangerous_commands_are_errors_with_positions() {
        let issues = by_rule("Line 1\nLine 2\n\\write18{test}\nLine 4", "forbidden_write18");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].line, Some(3));
        assert_eq!(issues[0].severity, Severity::Error);

        let issues = by_rule("\\input{/etc/passwd}", "forbidden_input_path");
        assert_eq!(issues.len(), 1);
        assert!(by_rule("\\input{chapters/intro}", "forbidden_input_path").is_empty());
        assert_eq!(by_rule("\\include{C:/Windows/x}", "forbidden_input_path").len(), 1);
    }

    #[test]
    fn old_font_commands_reported_per_occurrence() {
        let issues = by_rule("Text {\\bf bold} and {\\it italic}", "old_font_commands");
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].column, Some(6));
    }

    #[test]
    fn reference_spacing() {
        let issues = by_rule("See Figure \\ref{fig:test}", "non_breaking_space");
        assert_eq!(issues.len(), 1);
        assert!(issues[0].auto_fix);
        assert!(by_rule("See Figure~\\ref{fig:test}", "non_breaking_space").is_empty());
    }

    #[test]
    fn structure_counts_and_trailing_content() {
        let doc = "\\documentclass{a}\n\\documentclass{b}\n\\begin{document}\n\\end{document}\n\\end{document}\nafterwards text";
        let issues = lint_content(doc);
        let multi = issues.iter().find(|i| i.rule_id == "multiple_documentclass").unwrap();
        assert!(multi.message.contains("2 found"));
        assert!(issues.iter().any(|i| i.rule_id == "multiple_end_document"));
        let after = issues
            .iter()
            .find(|i| i.rule_id == "content_after_end_document")
            .unwrap();
        assert!(after.message.contains("afterwards text"));
        assert_eq!(after.line, Some(6));

        let commented = "\\begin{document}\n\\end{document}\n% trailing note\n";
        assert!(by_rule(commented, "content_after_end_document").is_empty());
    }

    #[test]
    fn duplicate_labels_report_counts() {
        let doc = "\\label{fig:test}\ntext\n\\label{fig:test}\n\\label{other}";
        let issues = by_rule(doc, "duplicate_label");
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("\"fig:test\""));
        assert!(issues[0].message.contains("2 times"));
    }

    #[test]
    fn citations_and_bibliography_files() {
        assert_eq!(by_rule("see \\cite{knuth}", "missing_bibliography").len(), 1);
        let doc = "\\cite{knuth}\n\\bibliography{refs,extra}";
        assert!(by_rule(doc, "missing_bibliography").is_empty());
        let files = by_rule(doc, "bibliography_file");
        assert_eq!(files.len(), 2);
        assert!(files[0].message.contains("refs.bib"));
        assert_eq!(files[1].line, Some(2));
    }

    #[test]
    fn text_after_environment_end() {
        let issues = by_rule("\\begin{center}\nx\n\\end{center} stray", "text_after_end");
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("stray"));
        assert_eq!(issues[0].column, Some(14));
        assert!(by_rule("\\end{center} % fine", "text_after_end").is_empty());
    }

    #[test]
    fn global_brace_balance_direction() {
        let issues = by_rule("{{a}", "unbalanced_braces");
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("1 extra opening"));
        let issues = by_rule("a}}", "unbalanced_braces");
        assert!(issues[0].message.contains("2 extra closing"));
        assert!(by_rule("{a} % }", "unbalanced_braces").is_empty());
    }

    #[test]
    fn environment_balance_names_counts() {
        let issues = by_rule("\\begin{itemize}\n\\begin{itemize}\n\\end{itemize}", "unbalanced_environment");
        assert_eq!(issues.len(), 1);
        assert!(issues[0].message.contains("\"itemize\": 2 begin vs 1 end"));
    }

    #[test]
    fn dollar_display_reported_once_per_pair() {
        let issues = by_rule("Equation: $$x^2 + y^2 = z^2$$", "deprecated_dollar_display");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].column, Some(11));
        assert_eq!(issues[0].fix_type, Some(rules::FixType::Refactor));
    }

    #[test]
    fn dollar_display_ignores_comments_and_escapes() {
        assert!(by_rule("% cost: $$\nplain\n", "deprecated_dollar_display").is_empty());
        let issues = by_rule("Price \\$$5$ and $$a$$\n", "deprecated_dollar_display");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].column, Some(17));
    }

    #[test]
    fn eqnarray_is_deprecated() {
        let doc = "\n\\begin{eqnarray}\n  x &=& 1 \\\\\n  y &=& 2\n\\end{eqnarray}\n";
        let issues = by_rule(doc, "deprecated_eqnarray");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].severity, Severity::Warning);
        assert!(issues[0].auto_fix);
    }

    #[test]
    fn floats_without_labels() {
        let fig = "\n\\begin{figure}\n  \\includegraphics{image.png}\n  \\caption{An image}\n\\end{figure}\n";
        let issues = by_rule(fig, "missing_label_in_figure");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].line, Some(2));
        assert_eq!(issues[0].fix_type, Some(rules::FixType::Insert));

        let table = "\n\\begin{table}\n  \\caption{A table}\n  \\begin{tabular}{|c|c|}\n    A & B\n  \\end{tabular}\n\\end{table}\n";
        assert_eq!(by_rule(table, "missing_label_in_table").len(), 1);

        let labelled = "\\begin{figure}\n\\caption{x}\\label{fig:x}\n\\end{figure}";
        assert!(by_rule(labelled, "missing_label_in_figure").is_empty());
    }

    #[test]
    fn align_needs_amsmath() {
        let doc = "\\documentclass{article}\n\\begin{document}\n\\begin{align}\n  x = 1\n\\end{align}\n\\end{document}\n";
        let issues = by_rule(doc, "missing_package_amsmath");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].line, Some(3));
        assert!(by_rule(CLEAN, "missing_package_amsmath").is_empty());
    }

    #[test]
    fn paragraph_spacing_runs() {
        let issues = by_rule("Paragraph 1\n\n\n\nParagraph 2", "paragraph_spacing");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].line, Some(3));
        assert!(issues[0].message.starts_with("3 consecutive"));
        assert!(by_rule("a\n\nb\n", "paragraph_spacing").is_empty());
    }

    #[test]
    fn package_suggestions_are_separate_from_issues() {
        let report = scan("$x$ \\href{u}{t} \\textcolor{red}{r} \\includegraphics{a}", None);
        let pkgs: Vec<_> = report.suggestions.iter().map(|s| s.package).collect();
        assert_eq!(pkgs, vec!["amsmath", "graphicx", "xcolor", "hyperref"]);
        assert!(scan(CLEAN, None).suggestions.is_empty());
    }

    #[test]
    fn blank_run_ranges_cover_extra_lines() {
        let src = "a\n\n\n\nb";
        let runs = blank_runs(src);
        assert_eq!(runs.len(), 1);
        assert_eq!(runs[0].first_line, 2);
        assert_eq!(&src[runs[0].extra.0..runs[0].extra.1], "\n\n");
        let runs = blank_runs("a\n\n\n");
        assert_eq!(runs[0].extra, (3, 4));
    }
}
