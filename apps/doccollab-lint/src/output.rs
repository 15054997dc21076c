//! Output rendering for the lint, fix, refactor, apply, sanitize, suggest
//! and log commands.
//!
//! Supports `human` (default) and `json` outputs. The JSON form includes
//! per-item fields and a top-level summary where one makes sense.

use crate::lint::{FixResult, LintResult, LogReport, SuggestReport, Verdict};
use crate::models::{Issue, Severity};
use crate::models::patch::PatchResult;
use crate::texlog::format_entries;
use crate::utils::use_colors;
use owo_colors::OwoColorize;
use serde_json::json;
use serde_json::Value as JsonVal;

fn print_json(v: &JsonVal) {
    println!("{}", serde_json::to_string_pretty(v).unwrap_or_default());
}

fn severity_tag(sev: Severity, color: bool) -> (String, String) {
    let (tag, icon) = match sev {
        Severity::Error => ("⟦error⟧", "✖"),
        Severity::Warning => ("⟦warn⟧", "▲"),
    };
    if !color {
        return (tag.to_string(), icon.to_string());
    }
    match sev {
        Severity::Error => (tag.red().bold().to_string(), icon.red().to_string()),
        Severity::Warning => (tag.yellow().bold().to_string(), icon.yellow().to_string()),
    }
}

fn location(file: &str, issue: &Issue) -> String {
    match (issue.line, issue.column) {
        (Some(l), Some(c)) => format!("{}:{}:{}", file, l, c),
        (Some(l), None) => format!("{}:{}", file, l),
        _ => file.to_string(),
    }
}

/// Print lint results in the requested format.
pub fn print_lint(res: &LintResult, output: &str) {
    match output {
        "json" => print_json(&compose_lint_json(res)),
        _ => {
            let color = use_colors(output);
            for rep in &res.reports {
                let file = rep.filename.as_deref().unwrap_or("<stdin>");
                for is in rep.issues() {
                    let (sev, icon) = severity_tag(is.severity, color);
                    let loc = location(file, is);
                    let loc = if color { loc.bold().to_string() } else { loc };
                    let fixable = if is.auto_fix { " (fixable)" } else { "" };
                    println!("{} {} {} ❲{}❳ — {}{}", icon, sev, loc, is.rule_id, is.message, fixable);
                }
                for s in &rep.suggestions {
                    let tag = if color {
                        "⟦info⟧".blue().bold().to_string()
                    } else {
                        "⟦info⟧".to_string()
                    };
                    println!("◆ {} {} ❲suggest:{}❳ — {}", tag, file, s.package, s.reason);
                }
            }
            let summary = format!(
                "— Summary — errors={} warnings={} fixable={} files={}",
                res.summary.errors, res.summary.warnings, res.summary.auto_fixable, res.summary.files
            );
            if color {
                println!("{}", summary.bold());
            } else {
                println!("{}", summary);
            }
        }
    }
}

/// Print fix results. When nothing is written, changed files show either
/// their diff or a short notice.
pub fn print_fix(results: &[FixResult], output: &str) {
    match output {
        "json" => print_json(&compose_fix_json(results)),
        _ => {
            let color = use_colors(output);
            for r in results {
                if r.wrote {
                    if color {
                        println!("{} {} ({} fixes)", "✏️  fixed:".green().bold(), r.file.bold(), r.applied);
                    } else {
                        println!("✏️  fixed: {} ({} fixes)", r.file, r.applied);
                    }
                } else if r.changed {
                    if color {
                        println!("{} {} ({} fixes)", "would fix:".yellow().bold(), r.file.bold(), r.applied);
                    } else {
                        println!("would fix: {} ({} fixes)", r.file, r.applied);
                    }
                    print_diff(&r.diff, color);
                } else if color {
                    println!("{} {}", "no changes:".bright_black(), r.file);
                } else {
                    println!("no changes: {}", r.file);
                }
            }
        }
    }
}

fn print_diff(diff: &[String], color: bool) {
    for line in diff {
        if !color {
            println!("{}", line);
        } else if line.starts_with("@@") {
            println!("{}", line.cyan());
        } else if line.starts_with("---") || line.starts_with("+++") {
            println!("{}", line.bold());
        } else if line.starts_with('-') {
            println!("{}", line.red());
        } else if line.starts_with('+') {
            println!("{}", line.green());
        } else {
            println!("{}", line);
        }
    }
}

/// Print the outcome of a refactor or an applied patch. Without `write`
/// and `diff` the modified text itself is the preview.
pub fn print_patch(file: &str, res: &PatchResult, output: &str, write: bool, diff: bool) {
    match output {
        "json" => print_json(&compose_patch_json(file, res, write, diff)),
        _ => {
            let color = use_colors(output);
            let head = if write && res.changed() {
                "✏️  patched:"
            } else if res.changed() {
                "preview:"
            } else {
                "no changes:"
            };
            if color {
                println!("{} {} — {}", head.green().bold(), file.bold(), res.metadata.description);
            } else {
                println!("{} {} — {}", head, file, res.metadata.description);
            }
            for c in &res.metadata.changes {
                println!("  line {}: {} → {}", c.line, c.from, c.to);
            }
            if !res.changed() || write {
                return;
            }
            if diff {
                print_diff(&res.diff, color);
            } else {
                println!("{}", res.modified_content);
            }
        }
    }
}

pub fn print_suggest(rep: &SuggestReport, output: &str) {
    match output {
        "json" => print_json(&json!(rep)),
        _ => {
            let color = use_colors(output);
            if rep.refactors.is_empty() && rep.packages.is_empty() {
                println!("no suggestions: {}", rep.file);
                return;
            }
            for r in &rep.refactors {
                let id = if color {
                    r.refactor_type.as_str().cyan().bold().to_string()
                } else {
                    r.refactor_type.as_str().to_string()
                };
                println!("{}:{} {} — {}", rep.file, r.line, id, r.description);
            }
            for p in &rep.packages {
                println!("{} \\usepackage{{{}}} — {}", rep.file, p.package, p.reason);
            }
        }
    }
}

pub fn print_verdict(v: &Verdict, output: &str) {
    match output {
        "json" => print_json(&json!(v)),
        _ => {
            let color = use_colors(output);
            let removed = match v.removed {
                Some(n) if n > 0 => format!(" (removed {})", n),
                _ => String::new(),
            };
            match (&v.reason, color) {
                (None, true) => println!("{} {}{}", "safe:".green().bold(), v.file, removed),
                (None, false) => println!("safe: {}{}", v.file, removed),
                (Some(r), true) => println!("{} {} — {}", "rejected:".red().bold(), v.file, r),
                (Some(r), false) => println!("rejected: {} — {}", v.file, r),
            }
        }
    }
}

pub fn print_log(rep: &LogReport, output: &str) {
    match output {
        "json" => print_json(&compose_log_json(rep)),
        _ => {
            println!("{}", format_entries(&rep.entries));
            for p in &rep.missing_packages {
                println!("{} missing package: {}", crate::utils::note_prefix(), p);
            }
        }
    }
}

/// Compose lint JSON object (pure) for testing/snapshot purposes.
pub fn compose_lint_json(res: &LintResult) -> JsonVal {
    let files: Vec<_> = res
        .reports
        .iter()
        .map(|r| {
            json!({
                "file": r.filename,
                "errors": r.errors,
                "warnings": r.warnings,
                "suggestions": r.suggestions,
                "summary": r.summary(),
            })
        })
        .collect();
    json!({"files": files, "summary": res.summary})
}

/// Compose fix JSON object (pure) for testing/snapshot purposes.
pub fn compose_fix_json(results: &[FixResult]) -> JsonVal {
    let summary = json!({
        "changed": results.iter().filter(|r| r.changed).count(),
        "wrote": results.iter().filter(|r| r.wrote).count(),
        "fixes": results.iter().map(|r| r.applied).sum::<usize>(),
        "total": results.len(),
    });
    json!({"results": results, "summary": summary})
}

/// Compose patch JSON object (pure). The modified text is included only
/// for previews; written results carry metadata alone.
pub fn compose_patch_json(file: &str, res: &PatchResult, write: bool, diff: bool) -> JsonVal {
    json!({
        "file": file,
        "changed": res.changed(),
        "wrote": write && res.changed(),
        "metadata": res.metadata,
        "modified_content": if write { None } else { Some(&res.modified_content) },
        "diff": if diff { Some(&res.diff) } else { None },
    })
}

/// Compose log JSON object (pure).
pub fn compose_log_json(rep: &LogReport) -> JsonVal {
    let errors = rep.errors();
    json!({
        "file": rep.file,
        "entries": rep.entries,
        "missing_packages": rep.missing_packages,
        "summary": {
            "errors": errors,
            "warnings": rep.entries.len() - errors,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apply::apply_patch;
    use crate::lint::RunSummary;
    use crate::models::patch::Patch;
    use crate::refactor::RefactorKind;
    use crate::scan::scan;
    use crate::texlog::parse_log;

    #[test]
    fn test_compose_lint_json_shape() {
        let report = scan("\\textbf{x\n", Some("a.tex"));
        let s = report.summary();
        let res = LintResult {
            reports: vec![report],
            summary: RunSummary {
                errors: s.errors,
                warnings: s.warnings,
                auto_fixable: s.auto_fixable,
                files: 1,
            },
        };
        let out = compose_lint_json(&res);
        assert_eq!(out["summary"]["files"], 1);
        assert_eq!(out["files"][0]["file"], "a.tex");
        assert_eq!(out["files"][0]["summary"]["errors"], s.errors);
        assert_eq!(out["files"][0]["errors"][0]["severity"], "error");
        assert!(out["files"][0]["warnings"].is_array());
    }

    #[test]
    fn test_compose_fix_json_counts() {
        let results = vec![
            FixResult {
                file: "a.tex".into(),
                changed: true,
                passes: 1,
                applied: 3,
                wrote: true,
                diff: Vec::new(),
            },
            FixResult {
                file: "b.tex".into(),
                changed: false,
                passes: 0,
                applied: 0,
                wrote: false,
                diff: Vec::new(),
            },
        ];
        let out = compose_fix_json(&results);
        assert_eq!(out["summary"]["changed"], 1);
        assert_eq!(out["summary"]["wrote"], 1);
        assert_eq!(out["summary"]["fixes"], 3);
        assert_eq!(out["summary"]["total"], 2);
        assert!(out["results"][0].get("diff").is_none());
    }

    #[test]
    fn test_compose_patch_json_preview_and_write() {
        let res = apply_patch(
            "$$x$$",
            &Patch::Refactor {
                refactor_type: RefactorKind::DollarToDisplaymath,
            },
        )
        .unwrap();
        let preview = compose_patch_json("m.tex", &res, false, true);
        assert_eq!(preview["changed"], true);
        assert_eq!(preview["wrote"], false);
        assert_eq!(preview["metadata"]["type"], "refactor");
        assert!(preview["modified_content"].is_string());
        assert!(preview["diff"].is_array());

        let written = compose_patch_json("m.tex", &res, true, false);
        assert_eq!(written["wrote"], true);
        assert!(written["modified_content"].is_null());
        assert!(written["diff"].is_null());
    }

    #[test]
    fn test_compose_log_json_summary() {
        let rep = LogReport {
            file: "x.log".into(),
            entries: parse_log("! Missing $ inserted.\nl.3 a_b\nLaTeX Warning: Label(s) may have changed.\n"),
            missing_packages: Vec::new(),
        };
        let out = compose_log_json(&rep);
        assert_eq!(out["summary"]["errors"], 1);
        assert_eq!(out["summary"]["warnings"], 1);
        assert_eq!(out["entries"][0]["type"], "error");
        assert_eq!(out["entries"][0]["line"], 3);
    }
}
