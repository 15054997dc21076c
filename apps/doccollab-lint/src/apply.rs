//! Patch applier.
//!
//! Applies one [`Patch`] to a text and returns the new text with metadata
//! (fresh id, timestamp, content hashes) and a unified-style preview diff.
//! The input is never modified.

use chrono::Utc;
use uuid::Uuid;

use crate::error::{LintError, PatchError};
use crate::models::patch::{Patch, PatchMetadata, PatchRequest, PatchResult, Range};
use crate::sanitize::sanitize_patch;
use crate::utils::char_to_byte;

/// Lines of unchanged context around each diff hunk.
const CONTEXT: usize = 3;

/// Hex BLAKE3 digest of `text`. Equal texts hash equal; callers compare
/// hashes to notice that a document changed under a pending operation.
pub fn content_hash(text: &str) -> String {
    blake3::hash(text.as_bytes()).to_hex().to_string()
}

pub fn apply_patch(original: &str, patch: &Patch) -> Result<PatchResult, PatchError> {
    let (modified, changes) = match patch {
        Patch::Insert { position, content } => {
            let len = original.chars().count();
            if *position > len {
                return Err(PatchError::PositionOutOfRange {
                    position: *position,
                    len,
                });
            }
            (splice(original, Range::new(*position, *position), content)?, Vec::new())
        }
        Patch::Delete { range } => (splice(original, *range, "")?, Vec::new()),
        Patch::Replace { range, content } => (splice(original, *range, content)?, Vec::new()),
        Patch::Refactor { refactor_type } => refactor_type.apply(original),
    };

    let metadata = PatchMetadata {
        patch_id: Uuid::new_v4().to_string(),
        timestamp: Utc::now().to_rfc3339(),
        patch_type: patch.patch_type(),
        original_hash: content_hash(original),
        modified_hash: content_hash(&modified),
        description: patch.describe(),
        changes,
    };
    let diff = generate_diff(original, &modified);
    Ok(PatchResult {
        modified_content: modified,
        metadata,
        diff,
    })
}

/// Gate an externally sourced patch: sanitize, convert, then apply.
pub fn apply_untrusted(original: &str, request: &PatchRequest) -> Result<PatchResult, LintError> {
    sanitize_patch(request)?;
    let patch = Patch::try_from(request)?;
    Ok(apply_patch(original, &patch)?)
}

/// Replace the character range `range` of `original` with `with`.
fn splice(original: &str, range: Range, with: &str) -> Result<String, PatchError> {
    let len = original.chars().count();
    let invalid = || PatchError::InvalidRange {
        start: range.start,
        end: range.end,
        len,
    };
    if range.start > range.end {
        return Err(invalid());
    }
    let start = char_to_byte(original, range.start).ok_or_else(invalid)?;
    let end = char_to_byte(original, range.end).ok_or_else(invalid)?;
    let mut out = String::with_capacity(original.len() - (end - start) + with.len());
    out.push_str(&original[..start]);
    out.push_str(with);
    out.push_str(&original[end..]);
    Ok(out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op<'a> {
    Keep(&'a str),
    Del(&'a str),
    Add(&'a str),
}

/// Line edit script from `a` to `b`.
///
/// Myers' O((N+M)D) algorithm in its linear-space form: find the middle
/// snake of the shortest edit path, split there, recurse on both halves.
/// Memory stays proportional to the line count.
fn line_ops<'a>(a: &[&'a str], b: &[&'a str]) -> Vec<Op<'a>> {
    let mut ops = Vec::with_capacity(a.len().max(b.len()));
    let max_d = (a.len() + b.len() + 1) / 2 + 1;
    let mut vf = Frontier::new(max_d);
    let mut vb = Frontier::new(max_d);
    conquer(a, b, &mut vf, &mut vb, &mut ops);
    ops
}

/// Furthest-reaching x per diagonal `k`, indexed from `-len` to `len`.
struct Frontier {
    offset: isize,
    v: Vec<usize>,
}

impl Frontier {
    fn new(max_d: usize) -> Self {
        Frontier {
            offset: max_d as isize + 1,
            v: vec![0; 2 * max_d + 3],
        }
    }

    fn get(&self, k: isize) -> usize {
        self.v[(k + self.offset) as usize]
    }

    fn set(&mut self, k: isize, x: usize) {
        self.v[(k + self.offset) as usize] = x;
    }
}

fn common_prefix(a: &[&str], b: &[&str]) -> usize {
    a.iter().zip(b).take_while(|(x, y)| x == y).count()
}

fn common_suffix(a: &[&str], b: &[&str]) -> usize {
    a.iter().rev().zip(b.iter().rev()).take_while(|(x, y)| x == y).count()
}

fn conquer<'a>(
    a: &[&'a str],
    b: &[&'a str],
    vf: &mut Frontier,
    vb: &mut Frontier,
    ops: &mut Vec<Op<'a>>,
) {
    let prefix = common_prefix(a, b);
    ops.extend(a[..prefix].iter().map(|l| Op::Keep(*l)));
    let (a, b) = (&a[prefix..], &b[prefix..]);
    let suffix = common_suffix(a, b);
    let (am, bm) = (&a[..a.len() - suffix], &b[..b.len() - suffix]);

    if am.is_empty() {
        ops.extend(bm.iter().map(|l| Op::Add(*l)));
    } else if bm.is_empty() {
        ops.extend(am.iter().map(|l| Op::Del(*l)));
    } else {
        match middle_snake(am, bm, vf, vb) {
            Some((x, y)) if (x, y) != (0, 0) && (x, y) != (am.len(), bm.len()) => {
                conquer(&am[..x], &bm[..y], vf, vb, ops);
                conquer(&am[x..], &bm[y..], vf, vb, ops);
            }
            _ => {
                ops.extend(am.iter().map(|l| Op::Del(*l)));
                ops.extend(bm.iter().map(|l| Op::Add(*l)));
            }
        }
    }
    ops.extend(a[a.len() - suffix..].iter().map(|l| Op::Keep(*l)));
}

/// Start of the middle snake as `(x, y)`, searching forward from the top
/// left and backward from the bottom right until the paths overlap.
/// `None` when the walk leaves the edit graph.
fn middle_snake(
    a: &[&str],
    b: &[&str],
    vf: &mut Frontier,
    vb: &mut Frontier,
) -> Option<(usize, usize)> {
    let (n, m) = (a.len(), b.len());
    let delta = n as isize - m as isize;
    let odd = delta & 1 == 1;
    vf.set(1, 0);
    vb.set(1, 0);

    let max_d = ((n + m + 1) / 2 + 1) as isize;
    for d in 0..max_d {
        let mut k = -d;
        while k <= d {
            let mut x = if k == -d || (k != d && vf.get(k - 1) < vf.get(k + 1)) {
                vf.get(k + 1)
            } else {
                vf.get(k - 1) + 1
            };
            let y = usize::try_from(x as isize - k).ok()?;
            let (x0, y0) = (x, y);
            if x < n && y < m {
                x += common_prefix(&a[x..], &b[y..]);
            }
            vf.set(k, x);
            if odd && (k - delta).abs() < d && x + vb.get(delta - k) >= n {
                return (x0 <= n && y0 <= m).then_some((x0, y0));
            }
            k += 2;
        }

        k = -d;
        while k <= d {
            let mut x = if k == -d || (k != d && vb.get(k - 1) < vb.get(k + 1)) {
                vb.get(k + 1)
            } else {
                vb.get(k - 1) + 1
            };
            let mut y = usize::try_from(x as isize - k).ok()?;
            if x < n && y < m {
                let run = common_suffix(&a[..n - x], &b[..m - y]);
                x += run;
                y += run;
            }
            vb.set(k, x);
            if !odd && (k - delta).abs() <= d && x + vf.get(delta - k) >= n {
                return (x <= n && y <= m).then_some((n - x, m - y));
            }
            k += 2;
        }
    }
    None
}

/// Unified-style line diff for previews. Empty when the texts are equal.
pub fn generate_diff(original: &str, modified: &str) -> Vec<String> {
    if original == modified {
        return Vec::new();
    }
    let a: Vec<&str> = original.split('\n').collect();
    let b: Vec<&str> = modified.split('\n').collect();
    let ops = line_ops(&a, &b);

    // Line counters before each op.
    let mut before = Vec::with_capacity(ops.len() + 1);
    let (mut old, mut new) = (0usize, 0usize);
    for op in &ops {
        before.push((old, new));
        match op {
            Op::Keep(_) => {
                old += 1;
                new += 1;
            }
            Op::Del(_) => old += 1,
            Op::Add(_) => new += 1,
        }
    }
    before.push((old, new));

    let changed: Vec<usize> = ops
        .iter()
        .enumerate()
        .filter(|(_, op)| !matches!(op, Op::Keep(_)))
        .map(|(i, _)| i)
        .collect();
    let mut groups: Vec<(usize, usize)> = Vec::new();
    for &i in &changed {
        match groups.last_mut() {
            Some((_, last)) if i - *last <= 2 * CONTEXT => *last = i,
            _ => groups.push((i, i)),
        }
    }

    let mut out = vec!["--- original".to_string(), "+++ modified".to_string()];
    for (first, last) in groups {
        let start = first.saturating_sub(CONTEXT);
        let end = (last + CONTEXT + 1).min(ops.len());
        let (old_start, new_start) = before[start];
        let old_count = before[end].0 - old_start;
        let new_count = before[end].1 - new_start;
        let shown = |start: usize, count: usize| if count == 0 { start } else { start + 1 };
        out.push(format!(
            "@@ -{},{} +{},{} @@",
            shown(old_start, old_count),
            old_count,
            shown(new_start, new_count),
            new_count
        ));
        for op in &ops[start..end] {
            out.push(match op {
                Op::Keep(l) => format!(" {}", l),
                Op::Del(l) => format!("-{}", l),
                Op::Add(l) => format!("+{}", l),
            });
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Rejection;
    use crate::models::patch::PatchType;
    use crate::refactor::RefactorKind;

    #[test]
    fn replace_changes_hash_and_keeps_original() {
        let original = String::from("Hello World");
        let patch = Patch::Replace {
            range: Range::new(6, 11),
            content: "Universe".into(),
        };
        let res = apply_patch(&original, &patch).unwrap();
        assert_eq!(res.modified_content, "Hello Universe");
        assert_eq!(original, "Hello World");
        assert_ne!(res.metadata.original_hash, res.metadata.modified_hash);
        assert_eq!(res.metadata.original_hash, content_hash("Hello World"));
        assert_eq!(res.metadata.patch_type, PatchType::Replace);
        assert!(res.changed());
    }

    #[test]
    fn repeated_application_is_pure_but_ids_are_fresh() {
        let patch = Patch::Insert {
            position: 5,
            content: ",".into(),
        };
        let a = apply_patch("Hello World", &patch).unwrap();
        let b = apply_patch("Hello World", &patch).unwrap();
        assert_eq!(a.modified_content, "Hello, World");
        assert_eq!(a.modified_content, b.modified_content);
        assert_eq!(a.metadata.modified_hash, b.metadata.modified_hash);
        assert_ne!(a.metadata.patch_id, b.metadata.patch_id);
    }

    #[test]
    fn offsets_are_characters() {
        let res = apply_patch(
            "ação!",
            &Patch::Delete {
                range: Range::new(1, 3),
            },
        )
        .unwrap();
        assert_eq!(res.modified_content, "ao!");
        let res = apply_patch(
            "ação",
            &Patch::Insert {
                position: 4,
                content: "s".into(),
            },
        )
        .unwrap();
        assert_eq!(res.modified_content, "açãos");
    }

    #[test]
    fn out_of_range_offsets_are_errors() {
        assert_eq!(
            apply_patch("abc", &Patch::Insert { position: 4, content: "x".into() }),
            Err(PatchError::PositionOutOfRange { position: 4, len: 3 })
        );
        assert_eq!(
            apply_patch("abc", &Patch::Delete { range: Range::new(2, 1) }),
            Err(PatchError::InvalidRange { start: 2, end: 1, len: 3 })
        );
        assert!(apply_patch("abc", &Patch::Replace { range: Range::new(1, 9), content: "x".into() }).is_err());
        assert!(apply_patch("abc", &Patch::Insert { position: 3, content: "!".into() }).is_ok());
    }

    #[test]
    fn refactor_patch_records_changes() {
        let res = apply_patch(
            "\\begin{eqnarray}\nx = 1\n\\end{eqnarray}",
            &Patch::Refactor {
                refactor_type: RefactorKind::EqnarrayToAlign,
            },
        )
        .unwrap();
        assert_eq!(res.modified_content, "\\begin{align}\nx = 1\n\\end{align}");
        assert!(!res.modified_content.contains("eqnarray"));
        assert_eq!(res.metadata.changes.len(), 1);
        assert!(res.metadata.description.contains("eqnarray"));
    }

    #[test]
    fn untrusted_requests_pass_the_sanitizer_first() {
        let req: PatchRequest =
            serde_json::from_str(r#"{"type":"insert","position":0,"content":"\\write18{x}"}"#).unwrap();
        assert!(matches!(
            apply_untrusted("doc", &req),
            Err(LintError::Rejected(Rejection::DangerousCommand { .. }))
        ));
        let req: PatchRequest =
            serde_json::from_str(r#"{"type":"refactor","refactor_type":"nope"}"#).unwrap();
        assert!(matches!(
            apply_untrusted("doc", &req),
            Err(LintError::Patch(PatchError::UnknownRefactor(_)))
        ));
        let req: PatchRequest =
            serde_json::from_str(r#"{"type":"insert","position":3,"content":"!"}"#).unwrap();
        assert_eq!(apply_untrusted("doc", &req).unwrap().modified_content, "doc!");
    }

    #[test]
    fn diff_of_single_line_change() {
        assert_eq!(
            generate_diff("Hello World", "Hello Universe"),
            vec!["--- original", "+++ modified", "@@ -1,1 +1,1 @@", "-Hello World", "+Hello Universe"]
        );
        assert!(generate_diff("same", "same").is_empty());
    }

    #[test]
    fn diff_hunks_carry_context() {
        let a = "a\nb\nc\nd\ne\nf\ng\nh\ni\nj";
        let b = "a\nb\nc\nd\nE\nf\ng\nh\ni\nj";
        let diff = generate_diff(a, b);
        assert_eq!(
            diff,
            vec![
                "--- original",
                "+++ modified",
                "@@ -2,7 +2,7 @@",
                " b",
                " c",
                " d",
                "-e",
                "+E",
                " f",
                " g",
                " h",
            ]
        );
    }

    #[test]
    fn distant_changes_get_separate_hunks() {
        let a: Vec<String> = (0..30).map(|i| format!("l{}", i)).collect();
        let mut b = a.clone();
        b[2] = "changed".into();
        b[25] = "changed".into();
        let diff = generate_diff(&a.join("\n"), &b.join("\n"));
        assert_eq!(diff.iter().filter(|l| l.starts_with("@@")).count(), 2);
    }

    #[test]
    fn pure_insertion_hunk() {
        let diff = generate_diff("a\nb", "a\nx\nb");
        assert_eq!(diff[2], "@@ -1,2 +1,3 @@");
        assert!(diff.contains(&"+x".to_string()));
    }

    #[test]
    fn edit_script_is_shortest_and_rebuilds_both_sides() {
        let cases: [(&[&str], &[&str], usize); 4] = [
            (&["a", "b", "c", "a", "b", "b", "a"], &["c", "b", "a", "b", "a", "c"], 5),
            (&["x", "y", "z"], &["z", "y", "x"], 4),
            (&["a", "b"], &["c", "d", "e"], 5),
            (&["p", "q", "r", "s"], &["q", "s", "t"], 3),
        ];
        for (a, b, edits) in cases {
            let ops = line_ops(a, b);
            let old: Vec<&str> = ops
                .iter()
                .filter_map(|op| match op {
                    Op::Keep(l) | Op::Del(l) => Some(*l),
                    Op::Add(_) => None,
                })
                .collect();
            let new: Vec<&str> = ops
                .iter()
                .filter_map(|op| match op {
                    Op::Keep(l) | Op::Add(l) => Some(*l),
                    Op::Del(_) => None,
                })
                .collect();
            assert_eq!(old, a);
            assert_eq!(new, b);
            assert_eq!(ops.iter().filter(|op| !matches!(op, Op::Keep(_))).count(), edits);
        }
    }

    #[test]
    fn large_document_changed_at_both_ends() {
        let lines: Vec<String> = (0..12_000).map(|i| format!("line {}", i)).collect();
        let original = lines.join("\n");
        let mut edited = lines.clone();
        edited[0] = "first".into();
        edited[11_999] = "last".into();
        let diff = generate_diff(&original, &edited.join("\n"));
        assert_eq!(diff.iter().filter(|l| l.starts_with("@@")).count(), 2);
        assert_eq!(diff[2], "@@ -1,4 +1,4 @@");
        assert_eq!(diff.len(), 2 + 2 * 6);
        for edit in ["-line 0", "+first", "-line 11999", "+last"] {
            assert!(diff.iter().any(|l| l == edit), "missing {}", edit);
        }
        assert_eq!(diff[8], "@@ -11997,4 +11997,4 @@");
    }
}
