//! DocCollab LaTeX lint core library.
//!
//! This crate exposes programmatic APIs for scanning LaTeX sources,
//! generating and applying fixes, running refactorings, and sanitizing and
//! applying patches that arrive from untrusted collaborators.
//!
//! The core (`scan`, `fixes`, `sanitize`, `refactor`, `apply`, `texlog`)
//! is pure: text in, values out, no I/O. `lint` is the on-disk runner the
//! binary uses.
//!
//! High-level modules:
//! - `rules`: Static rule table with lazily compiled patterns.
//! - `scan`: Document scanner producing issues and suggestions.
//! - `fixes`: Fix generation and batch application.
//! - `sanitize`: Deny-list gate for external patches.
//! - `refactor`: Whole-document transforms and package helpers.
//! - `apply`: Patch applier and preview diffs.
//! - `texlog`: pdflatex log parsing.
//! - `models`: Issues, reports, patches and fixes.
//! - `error`: Error types and exit codes.
//! - `config`: Discovery and effective configuration resolution.
//! - `lint`: Multi-file runner.
//! - `output`: Human/JSON printers.
//! - `cli`: CLI argument parsing (binary uses this).
//! - `utils`: Supporting helpers.
pub mod apply;
pub mod cli;
pub mod config;
pub mod error;
pub mod fixes;
pub mod lint;
pub mod models;
pub mod output;
pub mod refactor;
pub mod rules;
pub mod sanitize;
pub mod scan;
pub mod texlog;
pub mod utils;

pub use apply::{apply_patch, generate_diff};
pub use fixes::{apply_fixes, generate_fixes};
pub use sanitize::{sanitize_content, sanitize_patch};
pub use scan::{lint_content, scan};
