//! Dictionary-driven walk over a JSON token tree.
//!
//! Paths are built while descending: a member extends its parent's path with `.key`, an
//! array element with `[index]`. Lookups use the path with indices normalized to `[]`.
//!
//! At each node one of three things happens:
//!
//! * the path is declared and the declared type fits the token: typed rendering;
//! * the path is declared but the shapes disagree (e.g. an array declared, an object found):
//!   the declaration is ignored and the node is rendered generically, its members extending
//!   the same path;
//! * the path is not declared: generic rendering from the token's own type.
//!
//! The walk is bounded by [`JsonPlusOptions::max_depth`]; a container at the limit is
//! reported once and rendered as a single opaque field.

use super::external::ExternalParser;
use super::token::{tokenize, JsonKind, JsonNode};
use crate::cursor::ByteCursor;
use crate::dissector::{Dissection, SubDissector};
use crate::field::{ByteRange, DiagCode, EngineError, FieldSink, FieldTree, NodeId, NullSink, Severity};
use crate::schema::{member_path, normalize_array_indices, DisplayHint, EnumKey, SchemaDictionary, SchemaNode, SchemaType};
use crate::value::FieldValue;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::sync::Arc;
use tracing::{debug, trace};

pub const DEFAULT_MAX_DEPTH: usize = 32;

#[derive(Debug, Clone)]
pub struct JsonPlusOptions {
    /// Deepest container level rendered field by field.
    pub max_depth: usize,
    /// Allow calls to the injected external parser.
    pub external_parsers: bool,
}

impl Default for JsonPlusOptions {
    fn default() -> Self {
        JsonPlusOptions { max_depth: DEFAULT_MAX_DEPTH, external_parsers: false }
    }
}

impl JsonPlusOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_external_parsers(mut self, on: bool) -> Self {
        self.external_parsers = on;
        self
    }
}

/// JSON+ dissector. Cheap to clone; the dictionary and parser are shared.
#[derive(Clone)]
pub struct JsonPlusDissector {
    dict: Arc<SchemaDictionary>,
    options: JsonPlusOptions,
    parser: Option<Arc<dyn ExternalParser + Send + Sync>>,
}

impl fmt::Debug for JsonPlusDissector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonPlusDissector")
            .field("schema_nodes", &self.dict.len())
            .field("options", &self.options)
            .field("external_parser", &self.parser.is_some())
            .finish()
    }
}

impl JsonPlusDissector {
    pub fn new(dict: Arc<SchemaDictionary>) -> Self {
        JsonPlusDissector { dict, options: JsonPlusOptions::default(), parser: None }
    }

    /// Dissector with an empty dictionary.
    pub fn generic() -> Self {
        Self::new(Arc::new(SchemaDictionary::empty()))
    }

    pub fn with_options(mut self, options: JsonPlusOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_external_parser(mut self, parser: Arc<dyn ExternalParser + Send + Sync>) -> Self {
        self.parser = Some(parser);
        self
    }

    pub fn dictionary(&self) -> &SchemaDictionary {
        &self.dict
    }

    /// True when the first non-whitespace byte opens an object or array.
    pub fn probe(cur: &ByteCursor<'_>) -> bool {
        matches!(
            cur.remaining_bytes().iter().find(|b| !b.is_ascii_whitespace()),
            Some(b'{') | Some(b'[')
        )
    }

    pub fn dissect(&self, buf: &[u8], offset: usize) -> Result<Dissection, EngineError> {
        let cur = ByteCursor::at(buf, offset);
        if !Self::probe(&cur) {
            return Ok(Dissection::NoMatch);
        }
        let mut tree = FieldTree::new();
        let (consumed, _) = self.walk(cur, &mut tree)?;
        Ok(Dissection::Matched { tree: tree.finish()?, consumed })
    }

    /// Summary-only pass: joins the info labels of matched schema nodes without building a
    /// tree. Empty when nothing matched or the bytes are not JSON.
    pub fn summary(&self, buf: &[u8], offset: usize) -> Result<String, EngineError> {
        let cur = ByteCursor::at(buf, offset);
        if !Self::probe(&cur) {
            return Ok(String::new());
        }
        let mut sink = NullSink::new();
        let (_, summary) = self.walk(cur, &mut sink)?;
        Ok(summary)
    }

    fn walk(&self, data: ByteCursor<'_>, sink: &mut dyn FieldSink) -> Result<(usize, String), EngineError> {
        let window = data.window();
        let root = sink.open_subtree("jsonp", window);
        let mut summary = Vec::new();
        match tokenize(data.remaining_bytes(), data.offset()) {
            Ok(doc) => {
                let mut walker = Walker {
                    dict: &self.dict,
                    options: &self.options,
                    parser: self.parser.as_deref(),
                    summary: &mut summary,
                };
                walker.value(&doc, "", None, 0, sink)?;
            }
            Err(e) => {
                debug!(error = %e, "json tokenizer failed");
                let at = e.offset().min(window.end());
                sink.diag(Severity::Error, DiagCode::JsonParseError, ByteRange::new(at, window.end() - at), &e.to_string());
                sink.add_field("json.unparsed", window, FieldValue::Bytes);
            }
        }
        let summary = summary.join(", ");
        if !summary.is_empty() {
            sink.append_text(root.id(), &summary);
        }
        sink.close_subtree(root)?;
        Ok((data.remaining(), summary))
    }
}

impl SubDissector for JsonPlusDissector {
    fn dissect(&self, data: ByteCursor<'_>, sink: &mut dyn FieldSink) -> Result<usize, EngineError> {
        if !Self::probe(&data) {
            return Ok(0);
        }
        self.walk(data, sink).map(|(consumed, _)| consumed)
    }
}

struct Walker<'a> {
    dict: &'a SchemaDictionary,
    options: &'a JsonPlusOptions,
    parser: Option<&'a (dyn ExternalParser + Send + Sync)>,
    summary: &'a mut Vec<String>,
}

fn compatible(schema: &SchemaNode, node: &JsonNode) -> bool {
    match (schema.declared_type, &node.kind) {
        (SchemaType::Object, JsonKind::Object(_)) | (SchemaType::Array, JsonKind::Array(_)) => true,
        (_, JsonKind::Null) => false,
        (t, _) => !t.is_container() && !node.is_container(),
    }
}

fn schema_field_name(schema: &SchemaNode) -> String {
    format!("jsonp.{}", schema.path)
}

impl<'a> Walker<'a> {
    fn value(
        &mut self,
        node: &JsonNode,
        path: &str,
        label: Option<&str>,
        depth: usize,
        sink: &mut dyn FieldSink,
    ) -> Result<(), EngineError> {
        if node.is_container() && depth >= self.options.max_depth {
            sink.diag(
                Severity::Note,
                DiagCode::JsonMaxDepth,
                node.range,
                &format!("nesting deeper than {} levels, {} rendered opaque", self.options.max_depth, node.kind_name()),
            );
            let id = sink.add_field("json.skipped", node.range, FieldValue::Bytes);
            if let Some(l) = label {
                sink.set_label(id, l);
            }
            return Ok(());
        }

        let dict = self.dict;
        let schema = if path.is_empty() { None } else { dict.lookup(&normalize_array_indices(path)) };
        match schema {
            Some(s) if compatible(s, node) => self.typed(node, s, path, label, depth, sink),
            Some(s) => {
                trace!(path, declared = ?s.declared_type, found = node.kind_name(), "schema shape mismatch, rendering generically");
                self.generic(node, path, label, depth, sink)
            }
            None => self.generic(node, path, label, depth, sink),
        }
    }

    fn children(&mut self, node: &JsonNode, path: &str, depth: usize, sink: &mut dyn FieldSink) -> Result<(), EngineError> {
        match &node.kind {
            JsonKind::Object(members) => {
                for m in members {
                    self.value(&m.value, &member_path(path, &m.key), Some(&m.key), depth + 1, sink)?;
                }
            }
            JsonKind::Array(items) => {
                for (i, item) in items.iter().enumerate() {
                    let index = format!("[{}]", i);
                    self.value(item, &format!("{}{}", path, index), Some(&index), depth + 1, sink)?;
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn typed(
        &mut self,
        node: &JsonNode,
        schema: &SchemaNode,
        path: &str,
        label: Option<&str>,
        depth: usize,
        sink: &mut dyn FieldSink,
    ) -> Result<(), EngineError> {
        let name = schema_field_name(schema);
        if node.is_container() {
            if let Some(info) = &schema.info_label {
                self.summary.push(info.clone());
            }
            let handle = sink.open_subtree(&name, node.range);
            if let Some(l) = label {
                sink.set_label(handle.id(), l);
            }
            self.children(node, path, depth, sink)?;
            return sink.close_subtree(handle);
        }

        let text = primitive_text(node);
        let value = match coerce_text(&text, schema) {
            Ok(v) => v,
            Err(reason) => {
                sink.diag(
                    Severity::Note,
                    DiagCode::JsonTypeMismatch,
                    node.range,
                    &format!("{} declared {:?}: {}", schema.path, schema.declared_type, reason),
                );
                return self.generic(node, path, label, depth, sink);
            }
        };
        if let Some(info) = &schema.info_label {
            self.summary.push(format!("{}: {}", info, value));
        }
        let enum_text = if schema.declared_type == SchemaType::String {
            schema.enum_label(&EnumKey::Str(text.clone())).map(str::to_string)
        } else {
            None
        };

        let delegated = self.delegate(&name, &text, schema, node.range, sink);
        match delegated {
            Some(out) if !out.fields.is_empty() => {
                let handle = sink.open_valued(&name, node.range, value);
                self.decorate(handle.id(), label, enum_text.as_deref(), out.text.as_deref(), sink);
                for (filter, v) in &out.fields {
                    self.delegated_field(filter, v, node.range, sink);
                }
                sink.close_subtree(handle)
            }
            other => {
                let id = sink.add_field(&name, node.range, value);
                let text = other.and_then(|o| o.text);
                self.decorate(id, label, enum_text.as_deref(), text.as_deref(), sink);
                Ok(())
            }
        }
    }

    fn decorate(
        &self,
        id: NodeId,
        label: Option<&str>,
        enum_text: Option<&str>,
        parser_text: Option<&str>,
        sink: &mut dyn FieldSink,
    ) {
        if let Some(l) = label {
            sink.set_label(id, l);
        }
        for t in [enum_text, parser_text].into_iter().flatten() {
            sink.append_text(id, t);
        }
    }

    /// Runs the external parser when allowed and a tree is being built; failures become a note.
    fn delegate(
        &self,
        name: &str,
        text: &str,
        schema: &SchemaNode,
        range: ByteRange,
        sink: &mut dyn FieldSink,
    ) -> Option<super::external::ParserOutput> {
        if !sink.builds_tree() || !self.options.external_parsers || schema.declared_type != SchemaType::String {
            return None;
        }
        let (Some(parser_ref), Some(parser)) = (&schema.external_parser, self.parser) else {
            return None;
        };
        match parser.run(name, text, parser_ref) {
            Ok(out) => Some(out),
            Err(e) => {
                debug!(field = name, error = %e, "external parser failed");
                sink.diag(Severity::Note, DiagCode::ExternalParserFailed, range, &e.to_string());
                None
            }
        }
    }

    /// Child declared by an external parser: typed when the dictionary knows the filter.
    fn delegated_field(&self, filter: &str, value: &str, range: ByteRange, sink: &mut dyn FieldSink) {
        let path = filter.strip_prefix("jsonp.").unwrap_or(filter);
        let known = self
            .dict
            .lookup(&normalize_array_indices(path))
            .filter(|s| !s.declared_type.is_container())
            .and_then(|s| coerce_text(value, s).ok().map(|v| (s, v)));
        match known {
            Some((s, v)) => {
                sink.add_field(&schema_field_name(s), range, v);
            }
            None => {
                let id = sink.add_field(filter, range, FieldValue::Str(value.to_string()));
                sink.append_text(id, "not in dictionary");
            }
        }
    }

    fn generic(
        &mut self,
        node: &JsonNode,
        path: &str,
        label: Option<&str>,
        depth: usize,
        sink: &mut dyn FieldSink,
    ) -> Result<(), EngineError> {
        let (name, value, shape) = match &node.kind {
            JsonKind::Object(_) => ("json.object", FieldValue::None, Some("{…}")),
            JsonKind::Array(_) => ("json.array", FieldValue::None, Some("[…]")),
            JsonKind::String(s) => ("json.string", FieldValue::Str(s.clone()), None),
            JsonKind::Number(n) => ("json.number", number_value(n), None),
            JsonKind::Bool(b) => ("json.boolean", FieldValue::Bool(*b), None),
            JsonKind::Null => ("json.null", FieldValue::None, None),
        };
        if node.is_container() {
            let handle = sink.open_subtree(name, node.range);
            if let Some(l) = label {
                sink.set_label(handle.id(), l);
            }
            if let Some(s) = shape {
                sink.append_text(handle.id(), s);
            }
            self.children(node, path, depth, sink)?;
            return sink.close_subtree(handle);
        }
        let id = sink.add_field(name, node.range, value);
        if let Some(l) = label {
            sink.set_label(id, l);
        }
        Ok(())
    }
}

fn primitive_text(node: &JsonNode) -> String {
    match &node.kind {
        JsonKind::String(s) => s.clone(),
        JsonKind::Number(n) => n.clone(),
        JsonKind::Bool(b) => b.to_string(),
        JsonKind::Null | JsonKind::Object(_) | JsonKind::Array(_) => String::new(),
    }
}

/// Generic number rendering: the narrowest of i64, u64, f64 that holds the text.
fn number_value(text: &str) -> FieldValue {
    if let Ok(n) = text.parse::<i64>() {
        FieldValue::Int64(n)
    } else if let Ok(n) = text.parse::<u64>() {
        FieldValue::UInt64(n)
    } else if let Ok(f) = text.parse::<f64>() {
        FieldValue::Float(f)
    } else {
        FieldValue::Str(text.to_string())
    }
}

fn parse_hex(text: &str) -> Option<u64> {
    let digits = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")).unwrap_or(text);
    u64::from_str_radix(digits, 16).ok()
}

fn parse_mac(text: &str) -> Option<[u8; 6]> {
    let mut out = [0u8; 6];
    let mut parts = text.split(|c| c == ':' || c == '-');
    for b in out.iter_mut() {
        let p = parts.next()?;
        if p.len() != 2 {
            return None;
        }
        *b = u8::from_str_radix(p, 16).ok()?;
    }
    parts.next().is_none().then_some(out)
}

/// Seconds (possibly fractional) to nanoseconds.
fn seconds_to_ns(text: &str) -> Result<f64, String> {
    let secs: f64 = text.parse().map_err(|_| format!("{:?} is not a number of seconds", text))?;
    if !secs.is_finite() {
        return Err(format!("{:?} is not finite", text));
    }
    Ok(secs * 1e9)
}

/// Converts primitive text to the declared type, applying the display hint and enum table.
pub(crate) fn coerce_text(text: &str, schema: &SchemaNode) -> Result<FieldValue, String> {
    let hint = schema.display_hint;
    match schema.declared_type {
        SchemaType::String => Ok(match hint {
            DisplayHint::Ipv4 => FieldValue::Ipv4(
                text.parse::<Ipv4Addr>().map_err(|_| format!("{:?} is not an IPv4 address", text))?,
            ),
            DisplayHint::Ipv6 => FieldValue::Ipv6(
                text.parse::<Ipv6Addr>().map_err(|_| format!("{:?} is not an IPv6 address", text))?,
            ),
            DisplayHint::Mac => FieldValue::Mac(parse_mac(text).ok_or_else(|| format!("{:?} is not a MAC address", text))?),
            DisplayHint::HexAsDecimal => {
                FieldValue::UInt64(parse_hex(text).ok_or_else(|| format!("{:?} is not hexadecimal", text))?)
            }
            _ => FieldValue::Str(text.to_string()),
        }),
        SchemaType::Int64 | SchemaType::Int32 | SchemaType::UInt64 | SchemaType::UInt32 => {
            coerce_integer(text, schema)
        }
        SchemaType::Double | SchemaType::Float => match hint {
            DisplayHint::AbsoluteTime | DisplayHint::RelativeTime => time_value(text, hint),
            _ => text.parse::<f64>().map(FieldValue::Float).map_err(|_| format!("{:?} is not a number", text)),
        },
        SchemaType::Boolean => match text {
            "true" => Ok(FieldValue::Bool(true)),
            "false" => Ok(FieldValue::Bool(false)),
            _ => Err(format!("{:?} is not a boolean", text)),
        },
        SchemaType::Object | SchemaType::Array => Err("container type for a primitive value".to_string()),
    }
}

fn time_value(text: &str, hint: DisplayHint) -> Result<FieldValue, String> {
    let ns = seconds_to_ns(text)?;
    match hint {
        DisplayHint::AbsoluteTime if ns >= 0.0 && ns <= u64::MAX as f64 => Ok(FieldValue::TimeAbsolute(ns as u64)),
        DisplayHint::AbsoluteTime => Err(format!("{:?} is outside the absolute time range", text)),
        _ if ns.abs() <= i64::MAX as f64 => Ok(FieldValue::TimeRelative(ns as i64)),
        _ => Err(format!("{:?} is outside the relative time range", text)),
    }
}

fn coerce_integer(text: &str, schema: &SchemaNode) -> Result<FieldValue, String> {
    let hint = schema.display_hint;
    if matches!(hint, DisplayHint::AbsoluteTime | DisplayHint::RelativeTime) {
        return time_value(text, hint);
    }
    let out_of_range = || format!("{:?} does not fit {:?}", text, schema.declared_type);
    let raw: i128 = if hint == DisplayHint::HexAsDecimal {
        parse_hex(text).map(i128::from).ok_or_else(|| format!("{:?} is not hexadecimal", text))?
    } else {
        text.parse::<i128>().map_err(|_| format!("{:?} is not an integer", text))?
    };
    let value = match schema.declared_type {
        SchemaType::Int64 => FieldValue::Int64(i64::try_from(raw).map_err(|_| out_of_range())?),
        SchemaType::Int32 => FieldValue::Int32(i32::try_from(raw).map_err(|_| out_of_range())?),
        SchemaType::UInt64 => FieldValue::UInt64(u64::try_from(raw).map_err(|_| out_of_range())?),
        _ => FieldValue::UInt32(u32::try_from(raw).map_err(|_| out_of_range())?),
    };
    if schema.enum_table.is_empty() {
        return Ok(value);
    }
    let key = i64::try_from(raw).map_err(|_| out_of_range())?;
    Ok(FieldValue::Enum { raw: key, label: schema.enum_label(&EnumKey::Int(key)).map(str::to_string) })
}
