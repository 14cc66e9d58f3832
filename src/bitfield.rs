//! Decompose an already-read integer into named sub-fields.
//!
//! Tables are static slices of [`BitSpec`]; decoding never touches the buffer. Each emitted
//! value is shifted down to bit 0 (`shift = mask.trailing_zeros()`), so
//! `(value << shift) & mask` reconstructs that sub-field's bits in place.

use crate::field::{ByteRange, EngineError, FieldSink, NodeId};
use crate::value::FieldValue;

/// How to label an extracted sub-field.
#[derive(Debug, Clone, Copy)]
pub enum BitLabel {
    /// Plain number.
    Plain,
    /// Single flag; labels for set and clear.
    Flag(&'static str, &'static str),
    /// Value table.
    Enum(&'static [(u64, &'static str)]),
}

/// One entry of a bitfield table.
#[derive(Debug, Clone, Copy)]
pub struct BitSpec {
    pub name: &'static str,
    pub mask: u64,
    pub label: BitLabel,
}

impl BitSpec {
    pub const fn plain(name: &'static str, mask: u64) -> Self {
        BitSpec { name, mask, label: BitLabel::Plain }
    }

    pub const fn flag(name: &'static str, mask: u64) -> Self {
        BitSpec { name, mask, label: BitLabel::Flag("True", "False") }
    }

    pub const fn flag_labeled(name: &'static str, mask: u64, set: &'static str, clear: &'static str) -> Self {
        BitSpec { name, mask, label: BitLabel::Flag(set, clear) }
    }

    pub const fn table(name: &'static str, mask: u64, table: &'static [(u64, &'static str)]) -> Self {
        BitSpec { name, mask, label: BitLabel::Enum(table) }
    }
}

/// Result of decoding one table entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedBits {
    pub name: &'static str,
    pub mask: u64,
    pub shift: u32,
    pub value: u64,
    pub label: Option<&'static str>,
}

/// Resolves a value against a static label table.
pub fn lookup_label(table: &[(u64, &'static str)], value: u64) -> Option<&'static str> {
    table.iter().find(|(v, _)| *v == value).map(|(_, l)| *l)
}

/// Decodes `raw` through `table`, preserving table order.
pub fn decode(raw: u64, table: &[BitSpec]) -> Result<Vec<DecodedBits>, EngineError> {
    if table.is_empty() {
        return Err(EngineError::EmptyBitTable);
    }
    Ok(table
        .iter()
        .map(|spec| {
            let shift = if spec.mask == 0 { 0 } else { spec.mask.trailing_zeros() };
            let value = (raw & spec.mask) >> shift;
            let label = match spec.label {
                BitLabel::Plain => None,
                BitLabel::Flag(set, clear) => Some(if value != 0 { set } else { clear }),
                BitLabel::Enum(t) => lookup_label(t, value),
            };
            DecodedBits { name: spec.name, mask: spec.mask, shift, value, label }
        })
        .collect())
}

/// Decodes `raw` and adds one field per table entry, all spanning `range`.
pub fn emit_bitfields(
    sink: &mut dyn FieldSink,
    range: ByteRange,
    raw: u64,
    table: &[BitSpec],
) -> Result<Vec<NodeId>, EngineError> {
    let decoded = decode(raw, table)?;
    let mut ids = Vec::with_capacity(decoded.len());
    for (spec, d) in table.iter().zip(decoded) {
        let value = match spec.label {
            BitLabel::Flag(..) => FieldValue::Bool(d.value != 0),
            BitLabel::Enum(_) => FieldValue::Enum { raw: d.value as i64, label: d.label.map(str::to_string) },
            BitLabel::Plain => FieldValue::UInt64(d.value),
        };
        let id = sink.add_field(d.name, range, value);
        if let (BitLabel::Flag(..), Some(l)) = (spec.label, d.label) {
            sink.append_text(id, l);
        }
        ids.push(id);
    }
    Ok(ids)
}

/// Adds a packed word as a field of its own with its sub-fields as children.
pub fn emit_word(
    sink: &mut dyn FieldSink,
    name: &str,
    range: ByteRange,
    value: FieldValue,
    raw: u64,
    table: &[BitSpec],
) -> Result<NodeId, EngineError> {
    let word = sink.open_valued(name, range, value);
    emit_bitfields(sink, range, raw, table)?;
    sink.close_subtree(word)?;
    Ok(word.id())
}
