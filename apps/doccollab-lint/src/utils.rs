//! Supporting helpers shared by the scanner, fix generator and printers.
//!
//! Offsets handed across the public API are character offsets (Unicode
//! scalar values); these helpers convert them to byte indices before any
//! slicing happens.

use owo_colors::OwoColorize;

/// Whether colored output is allowed for the given output mode.
pub fn use_colors(output: &str) -> bool {
    output != "json" && std::env::var_os("NO_COLOR").is_none()
}

pub fn error_prefix() -> String {
    if use_colors("human") {
        "error:".red().bold().to_string()
    } else {
        "error:".to_string()
    }
}

pub fn note_prefix() -> String {
    if use_colors("human") {
        "note:".cyan().bold().to_string()
    } else {
        "note:".to_string()
    }
}

/// Return the part of `line` before its first unescaped `%`.
///
/// A `%` counts as escaped when preceded by an odd number of backslashes,
/// so `\%` is text while `\\%` starts a comment.
pub fn strip_comment(line: &str) -> &str {
    let bytes = line.as_bytes();
    for (i, b) in bytes.iter().enumerate() {
        if *b != b'%' {
            continue;
        }
        let slashes = bytes[..i].iter().rev().take_while(|c| **c == b'\\').count();
        if slashes % 2 == 0 {
            return &line[..i];
        }
    }
    line
}

/// Strip comments from every line of `content`, keeping line structure.
pub fn strip_comments(content: &str) -> String {
    content
        .split('\n')
        .map(strip_comment)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Blank out comments with spaces, keeping every byte offset and line
/// number of `content` valid in the result.
pub fn mask_comments(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    for (i, line) in content.split('\n').enumerate() {
        if i > 0 {
            out.push('\n');
        }
        let code = strip_comment(line);
        out.push_str(code);
        out.extend(std::iter::repeat(' ').take(line.len() - code.len()));
    }
    out
}

/// [`mask_comments`], then blank every `$` escaped by an odd run of
/// backslashes. Offsets stay valid.
pub fn mask_code(content: &str) -> String {
    let masked = mask_comments(content);
    let mut out = String::with_capacity(masked.len());
    let mut slashes = 0usize;
    for ch in masked.chars() {
        if ch == '$' && slashes % 2 == 1 {
            out.push(' ');
        } else {
            out.push(ch);
        }
        slashes = if ch == '\\' { slashes + 1 } else { 0 };
    }
    out
}

/// Convert a character offset into a byte index. `None` when past the end.
pub fn char_to_byte(s: &str, char_idx: usize) -> Option<usize> {
    if char_idx == 0 {
        return Some(0);
    }
    let mut count = 0usize;
    for (b, _) in s.char_indices() {
        if count == char_idx {
            return Some(b);
        }
        count += 1;
    }
    if count == char_idx {
        Some(s.len())
    } else {
        None
    }
}

/// Convert a byte index (on a char boundary) into a character offset.
pub fn byte_to_char(s: &str, byte_idx: usize) -> usize {
    s[..byte_idx.min(s.len())].chars().count()
}

/// Byte offsets at which each line of `content` starts.
pub fn line_starts(content: &str) -> Vec<usize> {
    let mut starts = vec![0];
    for (i, b) in content.bytes().enumerate() {
        if b == b'\n' {
            starts.push(i + 1);
        }
    }
    starts
}

/// 1-based line number containing byte offset `byte_idx`.
pub fn line_of(starts: &[usize], byte_idx: usize) -> usize {
    match starts.binary_search(&byte_idx) {
        Ok(i) => i + 1,
        Err(i) => i,
    }
}
