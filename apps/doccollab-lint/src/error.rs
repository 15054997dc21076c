//! Error types for patch handling, sanitizer verdicts and the file runner.

use std::path::PathBuf;

use thiserror::Error;

/// Process exit codes for the `doccollab-lint` binary.
pub mod exit_code {
    /// No error-severity issues.
    pub const CLEAN: i32 = 0;
    /// Error-severity issues found, a check would change files, or a
    /// patch was rejected by the sanitizer.
    pub const ISSUES: i32 = 1;
    /// Bad input: unreadable file, invalid patch JSON, malformed patch.
    pub const USAGE: i32 = 2;
}

/// A patch that cannot be applied as written.
///
/// These indicate a caller bug, so offsets are never clamped.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    #[error("insert position {position} is outside the document (length {len})")]
    PositionOutOfRange { position: usize, len: usize },

    #[error("invalid range {start}..{end} for document of length {len}")]
    InvalidRange { start: usize, end: usize, len: usize },

    #[error("unknown patch type '{0}'")]
    UnknownPatchType(String),

    #[error("unknown refactor type '{0}'")]
    UnknownRefactor(String),

    #[error("patch of type '{patch_type}' is missing field '{field}'")]
    MissingField {
        patch_type: String,
        field: &'static str,
    },

    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Why the sanitizer refused a patch or a piece of content.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("dangerous command detected: {pattern}")]
    DangerousCommand { pattern: String },

    #[error("unsafe file reference in \\{command}{{{argument}}}")]
    UnsafeInclude { command: String, argument: String },

    #[error("patch too large: {size} bytes (limit {limit})")]
    TooLarge { size: usize, limit: usize },

    #[error("invalid filename: {file}")]
    InvalidFilename { file: String },

    #[error("unbalanced braces: {opening} opening vs {closing} closing")]
    UnbalancedBraces { opening: usize, closing: usize },

    #[error("unbalanced environments: {begins} begin vs {ends} end")]
    UnbalancedEnvironments { begins: usize, ends: usize },
}

/// Failures of the on-disk runner used by the binary.
#[derive(Error, Debug)]
pub enum LintError {
    #[error("I/O error reading {path}: {source}")]
    FileRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("I/O error writing {path}: {source}")]
    FileWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("bad glob pattern '{pattern}': {reason}")]
    BadGlob { pattern: String, reason: String },

    #[error("invalid patch JSON in {path}: {source}")]
    PatchJson {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error(transparent)]
    Patch(#[from] PatchError),

    #[error("patch rejected: {0}")]
    Rejected(#[from] Rejection),
}

impl LintError {
    /// Exit code the binary reports for this failure. Rejections are a
    /// verdict about the input, everything else is a usage problem.
    pub fn exit_code(&self) -> i32 {
        match self {
            LintError::Rejected(_) => exit_code::ISSUES,
            _ => exit_code::USAGE,
        }
    }
}
