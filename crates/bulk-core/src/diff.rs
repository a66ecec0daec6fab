//! Unified diff rendering between canonical JSON buffers

use similar::{ChangeTag, TextDiff};

const CONTEXT_LINES: usize = 3;

/// Render a unified diff with `--- <left>` / `+++ <right>` headers and
/// three lines of context. An empty buffer on either side renders the
/// other side entirely as additions or removals. Returns `None` when the
/// buffers are identical.
pub fn render(left_label: &str, right_label: &str, left: &[u8], right: &[u8]) -> Option<String> {
    if left == right {
        return None;
    }

    let old = String::from_utf8_lossy(left);
    let new = String::from_utf8_lossy(right);

    let mut out = format!("--- {left_label}\n+++ {right_label}\n");
    let diff = TextDiff::from_lines(old.as_ref(), new.as_ref());
    let mut unified = diff.unified_diff();
    unified.context_radius(CONTEXT_LINES);

    for hunk in unified.iter_hunks() {
        out.push_str(&format!("{}\n", hunk.header()));
        for change in hunk.iter_changes() {
            out.push_str(match change.tag() {
                ChangeTag::Delete => "-",
                ChangeTag::Insert => "+",
                ChangeTag::Equal => " ",
            });
            out.push_str(change.value());
            if !change.value().ends_with('\n') {
                out.push('\n');
            }
        }
    }

    Some(out)
}
