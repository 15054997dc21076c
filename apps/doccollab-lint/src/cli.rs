//! CLI argument parsing via `clap`.

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "doccollab-lint",
    version,
    about = "LaTeX linter, fixer and patch engine",
    long_about = "doccollab-lint — scan LaTeX sources for structural problems, apply safe automatic fixes and refactorings, and gate external patches through a sanitizer.\n\nConfiguration precedence: CLI > doccollab.toml > defaults.",
    after_help = "Examples:\n  doccollab-lint lint\n  doccollab-lint fix paper/main.tex --diff\n  doccollab-lint refactor eqnarray_to_align main.tex --write\n  doccollab-lint apply --patch patch.json main.tex\n  doccollab-lint log build/main.log",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    #[arg(long, global = true, help = "Repository root (default: current dir)")]
    pub repo_root: Option<String>,
    #[arg(long, global = true, help = "Output mode: human|json (default: human)")]
    pub output: Option<String>,
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Subcommand)]
/// Supported subcommands.
pub enum Commands {
    /// Show version
    #[command(about = "Show version", long_about = "Print the current doccollab-lint version.")]
    Version,
    /// Scan LaTeX files
    #[command(
        about = "Run lint checks",
        long_about = "Scan files matched by the configured patterns (or the given paths) and report errors, warnings and package suggestions. Exits non-zero when any error is found.",
        after_help = "Examples:\n  doccollab-lint lint\n  doccollab-lint lint 'chapters/*.tex' --output json"
    )]
    Lint {
        #[arg(help = "Files or globs (default: configured patterns)")]
        paths: Vec<String>,
    },
    /// Apply automatic fixes
    #[command(
        about = "Apply automatic fixes",
        long_about = "Generate fixes for auto-fixable issues and apply them until the text settles. When --diff or --check is set, write is disabled.",
        after_help = "Examples:\n  doccollab-lint fix --diff\n  doccollab-lint fix main.tex --write"
    )]
    Fix {
        #[arg(help = "Files or globs (default: configured patterns)")]
        paths: Vec<String>,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Write changes to files")]
        write: bool,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Show diffs for changed files (implies write=false)")]
        diff: bool,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Exit non-zero if changes would occur (implies write=false)")]
        check: bool,
    },
    /// Run one refactoring
    #[command(
        about = "Run a refactoring",
        long_about = "Apply one named transform: eqnarray_to_align, itemize_to_enumerate, enumerate_to_itemize, dollar_to_displaymath or normalize_whitespace.",
        after_help = "Examples:\n  doccollab-lint refactor dollar_to_displaymath main.tex --diff"
    )]
    Refactor {
        #[arg(help = "Refactoring name")]
        kind: String,
        #[arg(help = "File to transform")]
        file: String,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Write the result back")]
        write: bool,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Show a diff instead of the full text")]
        diff: bool,
    },
    /// Suggest refactorings and packages
    #[command(
        about = "Suggest refactorings and packages",
        long_about = "List transforms that would change the file and packages its commands need. Nothing is modified."
    )]
    Suggest {
        #[arg(help = "File to inspect")]
        file: String,
    },
    /// Apply an external patch
    #[command(
        about = "Apply an external patch",
        long_about = "Sanitize a JSON patch request (inline or from a file), then apply it. Rejected patches exit with code 1.",
        after_help = "Examples:\n  doccollab-lint apply --patch '{\"type\":\"insert\",\"position\":0,\"content\":\"% x\\n\"}' main.tex"
    )]
    Apply {
        #[arg(long, help = "Patch JSON, inline or a path to a .json file")]
        patch: String,
        #[arg(help = "Target file")]
        file: String,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Write the result back")]
        write: bool,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Show a diff instead of the full text")]
        diff: bool,
    },
    /// Run the sanitizer
    #[command(
        about = "Run the sanitizer",
        long_about = "Check a file (or a patch payload) against the deny-list. Exits with code 1 when rejected. With --strip, denied constructs are removed from the file instead."
    )]
    Sanitize {
        #[arg(help = "File to check")]
        file: String,
        #[arg(long, help = "Check this patch JSON instead of the file content")]
        patch: Option<String>,
        #[arg(long, action = clap::ArgAction::SetTrue, conflicts_with = "patch", help = "Remove denied constructs and write the file back")]
        strip: bool,
    },
    /// Parse a pdflatex log
    #[command(
        about = "Parse a pdflatex log",
        long_about = "Summarize errors, warnings and missing packages from a pdflatex log file. Exits with code 1 when the log has errors."
    )]
    Log {
        #[arg(help = "Log file")]
        file: String,
    },
}
