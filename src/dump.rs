//! Format a field tree for display (dump text). Byte fields are shown as hex from the
//! dissected buffer; long runs are cut after [`HEX_PREVIEW`] bytes.

use crate::field::{FieldNode, FieldTree, Severity};
use crate::value::FieldValue;
use std::fmt::Write;

/// Bytes shown for a byte field before eliding the rest.
pub const HEX_PREVIEW: usize = 32;

fn hex_string(b: &[u8]) -> String {
    b.iter().map(|x| format!("{:02x}", x)).collect::<Vec<_>>().join(" ")
}

/// Hex preview of a range of `data`; out-of-range parts are ignored.
pub fn hex_preview(data: &[u8], start: usize, len: usize) -> String {
    let start = start.min(data.len());
    let end = start.saturating_add(len).min(data.len());
    let shown = (end - start).min(HEX_PREVIEW);
    let mut s = hex_string(&data[start..start + shown]);
    if end - start > shown {
        let _ = write!(s, " … (+{} bytes)", end - start - shown);
    }
    s
}

/// One-line form of a node (no indent, no children).
pub fn node_line(node: &FieldNode, data: &[u8]) -> String {
    let mut line = node.name.clone();
    if let Some(label) = &node.label {
        let _ = write!(line, " [{}]", label);
    }
    match &node.value {
        FieldValue::None => {}
        FieldValue::Bytes => {
            let _ = write!(line, ": {}", hex_preview(data, node.range.start, node.range.len));
        }
        v => {
            let _ = write!(line, ": {}", v);
        }
    }
    for a in &node.annotations {
        let _ = write!(line, " {}", a);
    }
    let _ = write!(line, " @{}", node.range);
    line
}

fn severity_tag(s: Severity) -> &'static str {
    match s {
        Severity::Note => "note",
        Severity::Warn => "warn",
        Severity::Error => "error",
    }
}

/// Indented tree followed by the diagnostic list.
pub fn render(tree: &FieldTree, data: &[u8]) -> String {
    let mut out = String::new();
    for (id, depth) in tree.walk() {
        let _ = writeln!(out, "{}{}", "  ".repeat(depth), node_line(tree.node(id), data));
    }
    if !tree.diagnostics().is_empty() {
        let _ = writeln!(out, "diagnostics:");
        for d in tree.diagnostics() {
            let _ = writeln!(out, "  [{}] {} @{}: {}", severity_tag(d.severity), d.code, d.range, d.message);
        }
    }
    out
}
