//! The dissector capability and the registry used to reach sibling dissectors.
//!
//! A host hands a buffer and a start offset to a top-level dissector and gets back either
//! [`Dissection::NoMatch`] (try another dissector) or a field tree with diagnostics and a
//! consumed byte count. Embedded payloads are passed on through [`SubDissector`], which only
//! sees a bounded cursor and a sink.

use crate::cursor::ByteCursor;
use crate::field::{EngineError, FieldSink, FieldTree};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Dissects an embedded payload into the caller's sink. Returns bytes consumed.
pub trait SubDissector {
    fn dissect(&self, data: ByteCursor<'_>, sink: &mut dyn FieldSink) -> Result<usize, EngineError>;
}

/// Outcome of a top-level dissect call.
#[derive(Debug)]
pub enum Dissection {
    /// Not this format at this offset; nothing was emitted.
    NoMatch,
    Matched { tree: FieldTree, consumed: usize },
}

impl Dissection {
    pub fn is_match(&self) -> bool {
        matches!(self, Dissection::Matched { .. })
    }

    pub fn consumed(&self) -> usize {
        match self {
            Dissection::NoMatch => 0,
            Dissection::Matched { consumed, .. } => *consumed,
        }
    }

    pub fn tree(&self) -> Option<&FieldTree> {
        match self {
            Dissection::NoMatch => None,
            Dissection::Matched { tree, .. } => Some(tree),
        }
    }

    pub fn into_tree(self) -> Option<FieldTree> {
        match self {
            Dissection::NoMatch => None,
            Dissection::Matched { tree, .. } => Some(tree),
        }
    }
}

/// Named sibling dissectors, built once and shared read-only.
#[derive(Clone, Default)]
pub struct SubDissectors {
    by_name: HashMap<String, Arc<dyn SubDissector + Send + Sync>>,
}

impl SubDissectors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, dissector: Arc<dyn SubDissector + Send + Sync>) -> Self {
        self.by_name.insert(name.to_string(), dissector);
        self
    }

    pub fn get(&self, name: &str) -> Option<&(dyn SubDissector + Send + Sync)> {
        self.by_name.get(name).map(|d| d.as_ref())
    }
}

impl fmt::Debug for SubDissectors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.by_name.keys().collect();
        names.sort();
        f.debug_struct("SubDissectors").field("names", &names).finish()
    }
}
