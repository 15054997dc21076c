//! Patch sanitizer: the gate between untrusted patches and the applier.
//!
//! A deny-list. Rules run in a fixed order and the first match wins:
//! shell escapes, unsafe `\input`/`\include` targets, size, then
//! (patches only) parent-directory traversal in the target filename.
//! Anything not denied is accepted.

use crate::error::Rejection;
use crate::models::patch::PatchRequest;
use crate::rules::{re, RE_BEGIN_ENV, RE_END_ENV, RE_INPUT_ARG, RE_SHELL_ESCAPE};
use crate::scan::unsafe_path;

/// Largest accepted content, in bytes.
pub const MAX_PATCH_BYTES: usize = 102_400;

/// Check raw content. Comments are not exempt.
pub fn sanitize_content(content: &str) -> Result<(), Rejection> {
    if let Some(m) = re(&RE_SHELL_ESCAPE).and_then(|r| r.find(content)) {
        return Err(Rejection::DangerousCommand {
            pattern: m.as_str().to_string(),
        });
    }
    if let Some(r) = re(&RE_INPUT_ARG) {
        if let Some(c) = r.captures_iter(content).find(|c| unsafe_path(&c[2])) {
            return Err(Rejection::UnsafeInclude {
                command: c[1].to_string(),
                argument: c[2].to_string(),
            });
        }
    }
    if content.len() > MAX_PATCH_BYTES {
        return Err(Rejection::TooLarge {
            size: content.len(),
            limit: MAX_PATCH_BYTES,
        });
    }
    Ok(())
}

/// Check an externally sourced patch before it is converted and applied.
pub fn sanitize_patch(patch: &PatchRequest) -> Result<(), Rejection> {
    if let Some(content) = &patch.content {
        sanitize_content(content)?;
    }
    if let Some(file) = &patch.file {
        if file.contains("..") {
            return Err(Rejection::InvalidFilename { file: file.clone() });
        }
    }
    Ok(())
}

/// Remove denied constructs instead of rejecting: shell escapes are
/// dropped and unsafe `\input`/`\include` commands are removed whole.
/// Returns the cleaned text and the number of removals.
pub fn strip_dangerous(content: &str) -> (String, usize) {
    let mut removed = 0;
    let mut out = content.to_string();
    if let Some(r) = re(&RE_SHELL_ESCAPE) {
        removed += r.find_iter(&out).count();
        out = r.replace_all(&out, "").into_owned();
    }
    if let Some(r) = re(&RE_INPUT_ARG) {
        out = r
            .replace_all(&out, |c: &regex::Captures| {
                if unsafe_path(&c[2]) {
                    removed += 1;
                    String::new()
                } else {
                    c[0].to_string()
                }
            })
            .into_owned();
    }
    (out, removed)
}

/// Structural sanity of a patch payload: braces and `\begin`/`\end`
/// counts must balance within the snippet itself.
pub fn validate_patch(content: &str) -> Result<(), Rejection> {
    let opening = content.matches('{').count();
    let closing = content.matches('}').count();
    if opening != closing {
        return Err(Rejection::UnbalancedBraces { opening, closing });
    }
    let begins = re(&RE_BEGIN_ENV).map_or(0, |r| r.find_iter(content).count());
    let ends = re(&RE_END_ENV).map_or(0, |r| r.find_iter(content).count());
    if begins != ends {
        return Err(Rejection::UnbalancedEnvironments { begins, ends });
    }
    Ok(())
}
