//! Schema dictionary for dictionary-driven JSON walking.
//!
//! A dictionary maps canonical paths (`user.name`, `items[].id`) to [`SchemaNode`]s carrying a
//! declared type, display hint, enum table, info label and optional external parser. It is
//! built once from [`FieldDef`]s (usually parsed from the text format in [`parser`]) and never
//! mutated afterwards; lookups are pure.
//!
//! An empty dictionary is valid and means "generic mode": every JSON node is rendered from
//! its own shape.

pub mod defs;
pub mod parser;

pub use defs::{EnumKey, FieldDef, ParserRef, Segment};

use std::collections::HashMap;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("schema syntax error at {line}:{column}: {message}")]
    Syntax { line: usize, column: usize, message: String },
    #[error("invalid schema: {0}")]
    Invalid(String),
    #[error("cannot read schema {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Base types of the schema format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaType {
    String,
    Int64,
    UInt64,
    Int32,
    UInt32,
    Double,
    Float,
    Boolean,
    Object,
    Array,
}

impl SchemaType {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "string" => SchemaType::String,
            "int64" => SchemaType::Int64,
            "uint64" => SchemaType::UInt64,
            "int32" => SchemaType::Int32,
            "uint32" => SchemaType::UInt32,
            "double" => SchemaType::Double,
            "float" => SchemaType::Float,
            "boolean" => SchemaType::Boolean,
            "object" => SchemaType::Object,
            "array" => SchemaType::Array,
            _ => return None,
        })
    }

    pub fn is_container(&self) -> bool {
        matches!(self, SchemaType::Object | SchemaType::Array)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DisplayHint {
    #[default]
    None,
    Ipv4,
    Ipv6,
    Mac,
    AbsoluteTime,
    RelativeTime,
    HexAsDecimal,
}

impl DisplayHint {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "ipv4" => DisplayHint::Ipv4,
            "ipv6" => DisplayHint::Ipv6,
            "mac" => DisplayHint::Mac,
            "absolute_time" => DisplayHint::AbsoluteTime,
            "relative_time" => DisplayHint::RelativeTime,
            "hex_as_decimal" => DisplayHint::HexAsDecimal,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SchemaNode {
    /// Canonical path, array levels written `[]`.
    pub path: String,
    pub declared_type: SchemaType,
    pub display_hint: DisplayHint,
    pub enum_table: Vec<(EnumKey, String)>,
    /// Child segment (`name` or `[]`) to node index.
    pub children: Vec<(String, usize)>,
    pub info_label: Option<String>,
    pub external_parser: Option<ParserRef>,
    pub case_insensitive: bool,
}

impl SchemaNode {
    pub fn enum_label(&self, key: &EnumKey) -> Option<&str> {
        self.enum_table.iter().find(|(k, _)| k == key).map(|(_, l)| l.as_str())
    }
}

/// Path-indexed, immutable schema tree.
#[derive(Debug, Clone, Default)]
pub struct SchemaDictionary {
    nodes: Vec<SchemaNode>,
    by_path: HashMap<String, usize>,
    /// Nodes that opted into case-insensitive matching.
    folded: Vec<usize>,
}

/// Rewrites every `[<digits>]` to `[]`.
pub fn normalize_array_indices(path: &str) -> String {
    let bytes = path.as_bytes();
    let mut out = String::with_capacity(path.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'[' {
            let digits = bytes[i + 1..].iter().take_while(|b| b.is_ascii_digit()).count();
            if digits > 0 && bytes.get(i + 1 + digits) == Some(&b']') {
                out.push_str("[]");
                i += digits + 2;
                continue;
            }
        }
        // Copy one whole char so multi-byte keys survive.
        let ch_len = path[i..].chars().next().map(char::len_utf8).unwrap_or(1);
        out.push_str(&path[i..i + ch_len]);
        i += ch_len;
    }
    out
}

/// Joins a member key onto a path.
pub fn member_path(parent: &str, key: &str) -> String {
    if parent.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", parent, key)
    }
}

impl SchemaDictionary {
    /// Dictionary with no nodes: generic mode.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Indexes definitions. Duplicate paths and unknown type or hint names are logged and
    /// skipped; the first definition of a path wins.
    pub fn build(defs: Vec<FieldDef>) -> Self {
        let mut dict = SchemaDictionary::default();
        for def in &defs {
            dict.insert(def, None);
        }
        debug!(nodes = dict.nodes.len(), case_insensitive = dict.folded.len(), "schema dictionary built");
        dict
    }

    /// Parses schema text and builds the dictionary.
    pub fn from_source(source: &str) -> Result<Self, SchemaError> {
        Ok(Self::build(parser::parse(source)?))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path)
            .map_err(|source| SchemaError::Io { path: path.display().to_string(), source })?;
        Self::from_source(&source)
    }

    fn insert(&mut self, def: &FieldDef, parent: Option<usize>) {
        let parent_path = parent.map(|p| self.nodes[p].path.as_str()).unwrap_or("");
        let (segment, path) = match &def.segment {
            Segment::Member(name) => (name.clone(), normalize_array_indices(&member_path(parent_path, name))),
            Segment::Element => {
                if parent.map(|p| self.nodes[p].declared_type) != Some(SchemaType::Array) {
                    warn!(parent = parent_path, "element definition outside an array, skipped");
                    return;
                }
                ("[]".to_string(), format!("{}[]", parent_path))
            }
        };
        let Some(declared_type) = SchemaType::from_name(&def.type_name) else {
            warn!(path = %path, type_name = %def.type_name, "unknown schema type, skipped");
            return;
        };
        if self.by_path.contains_key(&path) {
            warn!(path = %path, "duplicate schema path, keeping the first definition");
            return;
        }
        let display_hint = match def.display.as_deref() {
            None => DisplayHint::None,
            Some(name) => DisplayHint::from_name(name).unwrap_or_else(|| {
                warn!(path = %path, hint = name, "unknown display hint, ignored");
                DisplayHint::None
            }),
        };

        let index = self.nodes.len();
        self.nodes.push(SchemaNode {
            path: path.clone(),
            declared_type,
            display_hint,
            enum_table: def.enum_values.clone(),
            children: Vec::new(),
            info_label: def.info.clone(),
            external_parser: def.parser.clone(),
            case_insensitive: def.case_insensitive,
        });
        self.by_path.insert(path, index);
        if def.case_insensitive {
            self.folded.push(index);
        }
        if let Some(p) = parent {
            self.nodes[p].children.push((segment, index));
        }
        for child in &def.children {
            self.insert(child, Some(index));
        }
    }

    /// Exact match, then a case-insensitive scan over opted-in nodes only.
    pub fn lookup(&self, path: &str) -> Option<&SchemaNode> {
        if let Some(&i) = self.by_path.get(path) {
            return Some(&self.nodes[i]);
        }
        self.folded
            .iter()
            .map(|&i| &self.nodes[i])
            .find(|n| n.path.eq_ignore_ascii_case(path))
    }

    pub fn get(&self, index: usize) -> Option<&SchemaNode> {
        self.nodes.get(index)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &SchemaNode> {
        self.nodes.iter()
    }
}
