//! Field sinks: where walkers put decoded fields and diagnostics.
//!
//! [`FieldTree`] stores fields in an arena (`Vec<FieldNode>` indexed by [`NodeId`]); parents
//! own their children through index lists and children point back by index, so there are no
//! pointers to manage. [`NullSink`] discards fields but still checks subtree nesting, which
//! lets a walker run a cheap summary-only pass.
//!
//! Subtree open/close must nest. A mismatched close is an [`EngineError`]: it means the
//! walker itself is wrong, not the input.

use crate::value::FieldValue;
use std::fmt;

/// Absolute byte range in the dissected buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ByteRange {
    pub start: usize,
    pub len: usize,
}

impl ByteRange {
    pub fn new(start: usize, len: usize) -> Self {
        ByteRange { start, len }
    }

    pub fn end(&self) -> usize {
        self.start + self.len
    }

    /// Smallest range covering both.
    pub fn cover(&self, other: &ByteRange) -> ByteRange {
        let start = self.start.min(other.start);
        let end = self.end().max(other.end());
        ByteRange::new(start, end - start)
    }
}

impl fmt::Display for ByteRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Note,
    Warn,
    Error,
}

/// Stable diagnostic codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagCode {
    BlockSizeTooShort,
    HeaderSizeTooShort,
    HeaderSizeTooLong,
    HeaderTruncated,
    LogfileInfoTooShort,
    EntrySizeTooShort,
    EntrySizeTooLong,
    EntryTruncated,
    JsonParseError,
    JsonTypeMismatch,
    JsonMaxDepth,
    ExternalParserFailed,
}

impl DiagCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiagCode::BlockSizeTooShort => "block_size_too_short",
            DiagCode::HeaderSizeTooShort => "header_size_too_short",
            DiagCode::HeaderSizeTooLong => "header_size_too_long",
            DiagCode::HeaderTruncated => "header_truncated",
            DiagCode::LogfileInfoTooShort => "logfile_info_too_short",
            DiagCode::EntrySizeTooShort => "entry_size_too_short",
            DiagCode::EntrySizeTooLong => "entry_size_too_long",
            DiagCode::EntryTruncated => "entry_truncated",
            DiagCode::JsonParseError => "json_parse_error",
            DiagCode::JsonTypeMismatch => "json_type_mismatch",
            DiagCode::JsonMaxDepth => "json_max_depth",
            DiagCode::ExternalParserFailed => "external_parser_failed",
        }
    }
}

impl fmt::Display for DiagCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A structural anomaly tied to a byte range. Never alters control flow by itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagCode,
    pub range: ByteRange,
    pub message: String,
    /// Subtree that was open when the diagnostic was reported.
    pub parent: Option<NodeId>,
}

impl Diagnostic {
    pub fn new(severity: Severity, code: DiagCode, range: ByteRange, message: impl Into<String>) -> Self {
        Diagnostic { severity, code, range, message: message.into(), parent: None }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub usize);

/// Handle to an open subtree; pass it back to [`FieldSink::close_subtree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubtreeHandle(NodeId);

impl SubtreeHandle {
    pub fn id(&self) -> NodeId {
        self.0
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("subtree close out of order: expected {expected:?}, got {got:?}")]
    SubtreeMismatch { expected: NodeId, got: NodeId },
    #[error("subtree close with no subtree open ({0:?})")]
    NoOpenSubtree(NodeId),
    #[error("{0} subtree(s) still open at end of dissection")]
    UnclosedSubtree(usize),
    #[error("bitfield table is empty")]
    EmptyBitTable,
}

/// One decoded field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldNode {
    /// Filter-style identifier, e.g. `ttl.entry.size`.
    pub name: String,
    /// Display label (member key, array index, ...).
    pub label: Option<String>,
    pub range: ByteRange,
    pub value: FieldValue,
    pub parent: Option<NodeId>,
    pub children: Vec<NodeId>,
    pub annotations: Vec<String>,
}

/// Destination of walker output.
pub trait FieldSink {
    /// Appends a leaf to the current subtree.
    fn add_field(&mut self, name: &str, range: ByteRange, value: FieldValue) -> NodeId;

    /// Pushes a field that carries its own value and makes it current.
    fn open_valued(&mut self, name: &str, range: ByteRange, value: FieldValue) -> SubtreeHandle;

    /// Pushes a composite field and makes it current.
    fn open_subtree(&mut self, name: &str, range: ByteRange) -> SubtreeHandle {
        self.open_valued(name, range, FieldValue::None)
    }

    /// Pops back to the parent. The subtree's range is widened to cover its children.
    fn close_subtree(&mut self, handle: SubtreeHandle) -> Result<(), EngineError>;

    /// Appends annotation text (e.g. "(Ethernet)") to an existing field.
    fn append_text(&mut self, field: NodeId, text: &str);

    fn set_label(&mut self, field: NodeId, label: &str);

    /// Overrides a field's length once it is known.
    fn set_len(&mut self, field: NodeId, len: usize);

    /// Records a diagnostic against the current subtree.
    fn report(&mut self, diagnostic: Diagnostic);

    /// False for sinks that discard fields.
    fn builds_tree(&self) -> bool;

    fn add_labeled(&mut self, name: &str, label: &str, range: ByteRange, value: FieldValue) -> NodeId {
        let id = self.add_field(name, range, value);
        self.set_label(id, label);
        id
    }

    fn diag(&mut self, severity: Severity, code: DiagCode, range: ByteRange, message: &str) {
        self.report(Diagnostic::new(severity, code, range, message));
    }
}

/// Arena-backed field tree.
#[derive(Debug, Default, Clone)]
pub struct FieldTree {
    nodes: Vec<FieldNode>,
    roots: Vec<NodeId>,
    stack: Vec<NodeId>,
    diagnostics: Vec<Diagnostic>,
}

impl FieldTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks that every subtree was closed.
    pub fn finish(self) -> Result<FieldTree, EngineError> {
        if !self.stack.is_empty() {
            return Err(EngineError::UnclosedSubtree(self.stack.len()));
        }
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn node(&self, id: NodeId) -> &FieldNode {
        &self.nodes[id.0]
    }

    pub fn children(&self, id: NodeId) -> impl Iterator<Item = &FieldNode> {
        self.nodes[id.0].children.iter().map(move |c| &self.nodes[c.0])
    }

    pub fn child(&self, id: NodeId, name: &str) -> Option<NodeId> {
        self.nodes[id.0].children.iter().copied().find(|c| self.nodes[c.0].name == name)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn diagnostics_with(&self, code: DiagCode) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.code == code)
    }

    /// First node (pre-order) with this name.
    pub fn find(&self, name: &str) -> Option<NodeId> {
        self.walk().find(|(id, _)| self.nodes[id.0].name == name).map(|(id, _)| id)
    }

    pub fn find_all(&self, name: &str) -> Vec<NodeId> {
        self.walk().filter(|(id, _)| self.nodes[id.0].name == name).map(|(id, _)| id).collect()
    }

    /// Pre-order traversal yielding `(id, depth)`.
    pub fn walk(&self) -> impl Iterator<Item = (NodeId, usize)> + '_ {
        let mut pending: Vec<(NodeId, usize)> = self.roots.iter().rev().map(|&r| (r, 0)).collect();
        std::iter::from_fn(move || {
            let (id, depth) = pending.pop()?;
            for &c in self.nodes[id.0].children.iter().rev() {
                pending.push((c, depth + 1));
            }
            Some((id, depth))
        })
    }

    fn push(&mut self, name: &str, range: ByteRange, value: FieldValue) -> NodeId {
        let id = NodeId(self.nodes.len());
        let parent = self.stack.last().copied();
        self.nodes.push(FieldNode {
            name: name.to_string(),
            label: None,
            range,
            value,
            parent,
            children: Vec::new(),
            annotations: Vec::new(),
        });
        match parent {
            Some(p) => self.nodes[p.0].children.push(id),
            None => self.roots.push(id),
        }
        id
    }
}

impl FieldSink for FieldTree {
    fn add_field(&mut self, name: &str, range: ByteRange, value: FieldValue) -> NodeId {
        self.push(name, range, value)
    }

    fn open_valued(&mut self, name: &str, range: ByteRange, value: FieldValue) -> SubtreeHandle {
        let id = self.push(name, range, value);
        self.stack.push(id);
        SubtreeHandle(id)
    }

    fn close_subtree(&mut self, handle: SubtreeHandle) -> Result<(), EngineError> {
        let top = self.stack.last().copied().ok_or(EngineError::NoOpenSubtree(handle.0))?;
        if top != handle.0 {
            return Err(EngineError::SubtreeMismatch { expected: top, got: handle.0 });
        }
        self.stack.pop();
        let mut covered = self.nodes[top.0].range;
        for c in &self.nodes[top.0].children {
            covered = covered.cover(&self.nodes[c.0].range);
        }
        self.nodes[top.0].range = covered;
        Ok(())
    }

    fn append_text(&mut self, field: NodeId, text: &str) {
        if let Some(n) = self.nodes.get_mut(field.0) {
            n.annotations.push(text.to_string());
        }
    }

    fn set_label(&mut self, field: NodeId, label: &str) {
        if let Some(n) = self.nodes.get_mut(field.0) {
            n.label = Some(label.to_string());
        }
    }

    fn set_len(&mut self, field: NodeId, len: usize) {
        if let Some(n) = self.nodes.get_mut(field.0) {
            n.range.len = len;
        }
    }

    fn report(&mut self, mut diagnostic: Diagnostic) {
        diagnostic.parent = self.stack.last().copied();
        self.diagnostics.push(diagnostic);
    }

    fn builds_tree(&self) -> bool {
        true
    }
}

/// Sink that keeps no fields; used for summary-only passes.
#[derive(Debug, Default)]
pub struct NullSink {
    next: usize,
    stack: Vec<NodeId>,
    diagnostics: usize,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn diagnostic_count(&self) -> usize {
        self.diagnostics
    }

    fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }
}

impl FieldSink for NullSink {
    fn add_field(&mut self, _name: &str, _range: ByteRange, _value: FieldValue) -> NodeId {
        self.next_id()
    }

    fn open_valued(&mut self, _name: &str, _range: ByteRange, _value: FieldValue) -> SubtreeHandle {
        let id = self.next_id();
        self.stack.push(id);
        SubtreeHandle(id)
    }

    fn close_subtree(&mut self, handle: SubtreeHandle) -> Result<(), EngineError> {
        let top = self.stack.last().copied().ok_or(EngineError::NoOpenSubtree(handle.0))?;
        if top != handle.0 {
            return Err(EngineError::SubtreeMismatch { expected: top, got: handle.0 });
        }
        self.stack.pop();
        Ok(())
    }

    fn append_text(&mut self, _field: NodeId, _text: &str) {}

    fn set_label(&mut self, _field: NodeId, _label: &str) {}

    fn set_len(&mut self, _field: NodeId, _len: usize) {}

    fn report(&mut self, _diagnostic: Diagnostic) {
        self.diagnostics += 1;
    }

    fn builds_tree(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subtree_nesting_and_parenting() {
        let mut t = FieldTree::new();
        let outer = t.open_subtree("outer", ByteRange::new(0, 4));
        let leaf = t.add_field("leaf", ByteRange::new(0, 2), FieldValue::UInt16(5));
        let inner = t.open_subtree("inner", ByteRange::new(2, 2));
        t.add_field("x", ByteRange::new(2, 1), FieldValue::UInt8(1));
        t.close_subtree(inner).unwrap();
        t.close_subtree(outer).unwrap();
        let t = t.finish().unwrap();
        assert_eq!(t.roots(), &[outer.id()]);
        assert_eq!(t.node(leaf).parent, Some(outer.id()));
        assert_eq!(t.children(outer.id()).count(), 2);
        assert_eq!(t.find("x").map(|id| t.node(id).range), Some(ByteRange::new(2, 1)));
    }

    #[test]
    fn close_widens_to_children() {
        let mut t = FieldTree::new();
        let s = t.open_subtree("s", ByteRange::new(10, 0));
        t.add_field("a", ByteRange::new(10, 4), FieldValue::Bytes);
        t.add_field("b", ByteRange::new(14, 6), FieldValue::Bytes);
        t.close_subtree(s).unwrap();
        assert_eq!(t.node(s.id()).range, ByteRange::new(10, 10));
    }

    #[test]
    fn mismatched_close_is_engine_error() {
        let mut t = FieldTree::new();
        let a = t.open_subtree("a", ByteRange::default());
        let b = t.open_subtree("b", ByteRange::default());
        assert!(matches!(t.close_subtree(a), Err(EngineError::SubtreeMismatch { .. })));
        t.close_subtree(b).unwrap();
        t.close_subtree(a).unwrap();
        assert_eq!(t.close_subtree(a), Err(EngineError::NoOpenSubtree(a.id())));
    }

    #[test]
    fn unclosed_subtree_fails_finish() {
        let mut t = FieldTree::new();
        t.open_subtree("a", ByteRange::default());
        assert_eq!(t.finish().unwrap_err(), EngineError::UnclosedSubtree(1));
    }

    #[test]
    fn diagnostics_attach_to_current_subtree() {
        let mut t = FieldTree::new();
        let s = t.open_subtree("s", ByteRange::new(0, 8));
        t.diag(Severity::Warn, DiagCode::EntryTruncated, ByteRange::new(4, 4), "short");
        t.close_subtree(s).unwrap();
        t.diag(Severity::Note, DiagCode::JsonMaxDepth, ByteRange::new(0, 1), "top");
        let d = t.diagnostics();
        assert_eq!(d[0].parent, Some(s.id()));
        assert_eq!(d[1].parent, None);
        assert_eq!(d[0].code.as_str(), "entry_truncated");
    }

    #[test]
    fn null_sink_checks_nesting_only() {
        let mut n = NullSink::new();
        let a = n.open_subtree("a", ByteRange::default());
        let b = n.open_subtree("b", ByteRange::default());
        n.add_field("x", ByteRange::default(), FieldValue::Bool(true));
        assert!(n.close_subtree(a).is_err());
        n.close_subtree(b).unwrap();
        n.close_subtree(a).unwrap();
        assert!(!n.builds_tree());
    }
}
