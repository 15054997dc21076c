//! On-disk runner used by the binary.
//!
//! Resolves target files from globs, reads them, and drives the pure core
//! (scanner, fixer, refactorings, patch applier) over their contents. The
//! core never touches the filesystem; everything I/O-shaped lives here.

use glob::glob;
use rayon::prelude::*;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::apply::{apply_patch, apply_untrusted, generate_diff};
use crate::config::Effective;
use crate::error::{LintError, Rejection};
use crate::fixes::autofix;
use crate::models::patch::{Patch, PatchRequest, PatchResult};
use crate::models::{ScanReport, Suggestion};
use crate::refactor::{suggest_refactors, RefactorKind, RefactorSuggestion};
use crate::sanitize::{sanitize_content, sanitize_patch, strip_dangerous};
use crate::scan::{scan_with, suggest_packages};
use crate::texlog::{missing_packages, parse_log, LogEntry, LogLevel};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
/// Totals across every scanned file.
pub struct RunSummary {
    pub errors: usize,
    pub warnings: usize,
    pub auto_fixable: usize,
    pub files: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub reports: Vec<ScanReport>,
    pub summary: RunSummary,
}

impl LintResult {
    pub fn has_errors(&self) -> bool {
        self.summary.errors > 0
    }
}

#[derive(Debug, Clone, Serialize)]
/// Outcome of auto-fixing one file.
pub struct FixResult {
    pub file: String,
    pub changed: bool,
    pub passes: usize,
    pub applied: usize,
    pub wrote: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diff: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SuggestReport {
    pub file: String,
    pub refactors: Vec<RefactorSuggestion>,
    pub packages: Vec<Suggestion>,
}

#[derive(Debug, Clone, Serialize)]
/// Sanitizer verdict for a file or a patch payload.
pub struct Verdict {
    pub file: String,
    pub safe: bool,
    pub reason: Option<String>,
    /// Constructs removed by a strip run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub removed: Option<usize>,
}

impl Verdict {
    fn new(file: String, verdict: Result<(), Rejection>) -> Self {
        match verdict {
            Ok(()) => Verdict {
                file,
                safe: true,
                reason: None,
                removed: None,
            },
            Err(r) => {
                warn!(file = %file, reason = %r, "sanitizer rejected input");
                Verdict {
                    file,
                    safe: false,
                    reason: Some(r.to_string()),
                    removed: None,
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct LogReport {
    pub file: String,
    pub entries: Vec<LogEntry>,
    pub missing_packages: Vec<String>,
}

impl LogReport {
    pub fn errors(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.level == LogLevel::Error)
            .count()
    }
}

pub fn read_file(path: &Path) -> Result<String, LintError> {
    fs::read_to_string(path).map_err(|source| {
        warn!(path = %path.display(), error = %source, "cannot read file");
        LintError::FileRead {
            path: path.to_path_buf(),
            source,
        }
    })
}

pub fn write_file(path: &Path, content: &str) -> Result<(), LintError> {
    fs::write(path, content).map_err(|source| LintError::FileWrite {
        path: path.to_path_buf(),
        source,
    })
}

/// Path shown to users: relative to the repository root when possible.
pub fn display_path(root: &Path, path: &Path) -> String {
    pathdiff::diff_paths(path, root)
        .filter(|p| !p.starts_with(".."))
        .unwrap_or_else(|| path.to_path_buf())
        .to_string_lossy()
        .to_string()
}

fn is_glob(s: &str) -> bool {
    s.contains(['*', '?', '['])
}

/// Files to process. Explicit `paths` win over configured patterns;
/// literal paths are kept even when missing so reading them reports the
/// failure. Configured patterns resolve relative to the repository root.
pub fn collect_targets(
    root: &Path,
    patterns: &[String],
    paths: &[String],
) -> Result<Vec<PathBuf>, LintError> {
    let globs: Vec<PathBuf> = if paths.is_empty() {
        patterns.iter().map(|p| root.join(p)).collect()
    } else {
        paths.iter().map(PathBuf::from).collect()
    };
    let mut targets: Vec<PathBuf> = Vec::new();
    for g in globs {
        let pattern = g.to_string_lossy().to_string();
        if !is_glob(&pattern) {
            targets.push(g);
            continue;
        }
        let entries = glob(&pattern).map_err(|e| LintError::BadGlob {
            pattern: pattern.clone(),
            reason: e.to_string(),
        })?;
        targets.extend(entries.flatten().filter(|p| p.is_file()));
    }
    targets.sort();
    targets.dedup();
    debug!(count = targets.len(), "resolved target files");
    Ok(targets)
}

/// Scan every target in parallel. Reports come back sorted by file.
pub fn run_lint(eff: &Effective, paths: &[String]) -> Result<LintResult, LintError> {
    let targets = collect_targets(&eff.repo_root, &eff.patterns, paths)?;
    let opts = eff.scan_options();
    let mut reports = targets
        .par_iter()
        .map(|path| {
            let content = read_file(path)?;
            let name = display_path(&eff.repo_root, path);
            debug!(file = %name, "scanning");
            Ok(scan_with(&content, Some(&name), &opts))
        })
        .collect::<Result<Vec<ScanReport>, LintError>>()?;
    reports.sort_by(|a, b| a.filename.cmp(&b.filename));

    let mut summary = RunSummary {
        files: reports.len(),
        ..Default::default()
    };
    for r in &reports {
        let s = r.summary();
        summary.errors += s.errors;
        summary.warnings += s.warnings;
        summary.auto_fixable += s.auto_fixable;
    }
    Ok(LintResult { reports, summary })
}

/// Auto-fix every target. Files are written only when `write` is set and
/// the text actually changed; diffs are computed only when `diff` is set.
pub fn run_fix(
    eff: &Effective,
    paths: &[String],
    write: bool,
    diff: bool,
) -> Result<Vec<FixResult>, LintError> {
    let targets = collect_targets(&eff.repo_root, &eff.patterns, paths)?;
    let opts = eff.scan_options();
    let mut results = targets
        .par_iter()
        .map(|path| {
            let original = read_file(path)?;
            let outcome = autofix(&original, &opts)?;
            let changed = outcome.content != original;
            let file = display_path(&eff.repo_root, path);
            let wrote = write && changed;
            if wrote {
                write_file(path, &outcome.content)?;
                debug!(file = %file, applied = outcome.applied, "wrote fixes");
            }
            Ok(FixResult {
                file,
                changed,
                passes: outcome.passes,
                applied: outcome.applied,
                wrote,
                diff: if diff && changed {
                    generate_diff(&original, &outcome.content)
                } else {
                    Vec::new()
                },
            })
        })
        .collect::<Result<Vec<FixResult>, LintError>>()?;
    results.sort_by(|a, b| a.file.cmp(&b.file));
    Ok(results)
}

/// Run one named transform over `path`, optionally writing the result.
pub fn run_refactor(path: &Path, kind: &str, write: bool) -> Result<PatchResult, LintError> {
    let refactor_type: RefactorKind = kind.parse()?;
    let original = read_file(path)?;
    let result = apply_patch(&original, &Patch::Refactor { refactor_type })?;
    if write && result.changed() {
        write_file(path, &result.modified_content)?;
    }
    Ok(result)
}

pub fn run_suggest(root: &Path, path: &Path) -> Result<SuggestReport, LintError> {
    let content = read_file(path)?;
    Ok(SuggestReport {
        file: display_path(root, path),
        refactors: suggest_refactors(&content),
        packages: suggest_packages(&content),
    })
}

/// Load a patch request from inline JSON (starting with `{`) or a file.
pub fn load_patch_request(patch: &str) -> Result<PatchRequest, LintError> {
    let (source, text) = if patch.trim_start().starts_with('{') {
        (PathBuf::from("<inline>"), patch.to_string())
    } else {
        let p = PathBuf::from(patch);
        let text = read_file(&p)?;
        (p, text)
    };
    serde_json::from_str(&text).map_err(|source_err| LintError::PatchJson {
        path: source,
        source: source_err,
    })
}

/// Sanitize and apply an external patch to `path`.
pub fn run_apply(path: &Path, patch: &str, write: bool) -> Result<PatchResult, LintError> {
    let request = load_patch_request(patch)?;
    let original = read_file(path)?;
    let result = apply_untrusted(&original, &request).inspect_err(|e| {
        if let LintError::Rejected(r) = e {
            warn!(file = %path.display(), reason = %r, "patch rejected");
        }
    })?;
    debug!(patch_id = %result.metadata.patch_id, "patch applied");
    if write && result.changed() {
        write_file(path, &result.modified_content)?;
    }
    Ok(result)
}

/// Sanitize a file's content, or a patch payload when one is given.
pub fn run_sanitize(root: &Path, path: &Path, patch: Option<&str>) -> Result<Verdict, LintError> {
    let file = display_path(root, path);
    let verdict = match patch {
        Some(p) => sanitize_patch(&load_patch_request(p)?),
        None => sanitize_content(&read_file(path)?),
    };
    Ok(Verdict::new(file, verdict))
}

/// Remove denied constructs from `path` in place. The verdict reflects
/// the cleaned text; the file is rewritten only when something was removed.
pub fn run_strip(root: &Path, path: &Path) -> Result<Verdict, LintError> {
    let (cleaned, removed) = strip_dangerous(&read_file(path)?);
    if removed > 0 {
        write_file(path, &cleaned)?;
        debug!(file = %path.display(), removed, "stripped denied constructs");
    }
    let mut verdict = Verdict::new(display_path(root, path), sanitize_content(&cleaned));
    verdict.removed = Some(removed);
    Ok(verdict)
}

pub fn run_log(root: &Path, path: &Path) -> Result<LogReport, LintError> {
    let log = read_file(path)?;
    Ok(LogReport {
        file: display_path(root, path),
        entries: parse_log(&log),
        missing_packages: missing_packages(&log),
    })
}
