//! Decoded field values and their semantic types.

use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

/// Semantic type of a field, as a display or filter layer would register it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SemanticType {
    Composite,
    Bytes,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Int8,
    Int16,
    Int32,
    Int64,
    Bool,
    Enum,
    Float,
    TimeAbsolute,
    TimeRelative,
    Str,
    Ipv4,
    Ipv6,
    Mac,
}

/// A single decoded value. Byte fields carry no copy of the data: their range in the
/// dissected buffer identifies them.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    /// Composite field (subtree) with no value of its own.
    None,
    Bytes,
    UInt8(u8),
    UInt16(u16),
    UInt32(u32),
    UInt64(u64),
    Int8(i8),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Bool(bool),
    /// Raw value with the label resolved from its table, if any.
    Enum { raw: i64, label: Option<String> },
    Float(f64),
    /// Nanoseconds since the Unix epoch.
    TimeAbsolute(u64),
    /// Signed nanoseconds.
    TimeRelative(i64),
    Str(String),
    Ipv4(Ipv4Addr),
    Ipv6(Ipv6Addr),
    Mac([u8; 6]),
}

impl FieldValue {
    pub fn semantic_type(&self) -> SemanticType {
        match self {
            FieldValue::None => SemanticType::Composite,
            FieldValue::Bytes => SemanticType::Bytes,
            FieldValue::UInt8(_) => SemanticType::UInt8,
            FieldValue::UInt16(_) => SemanticType::UInt16,
            FieldValue::UInt32(_) => SemanticType::UInt32,
            FieldValue::UInt64(_) => SemanticType::UInt64,
            FieldValue::Int8(_) => SemanticType::Int8,
            FieldValue::Int16(_) => SemanticType::Int16,
            FieldValue::Int32(_) => SemanticType::Int32,
            FieldValue::Int64(_) => SemanticType::Int64,
            FieldValue::Bool(_) => SemanticType::Bool,
            FieldValue::Enum { .. } => SemanticType::Enum,
            FieldValue::Float(_) => SemanticType::Float,
            FieldValue::TimeAbsolute(_) => SemanticType::TimeAbsolute,
            FieldValue::TimeRelative(_) => SemanticType::TimeRelative,
            FieldValue::Str(_) => SemanticType::Str,
            FieldValue::Ipv4(_) => SemanticType::Ipv4,
            FieldValue::Ipv6(_) => SemanticType::Ipv6,
            FieldValue::Mac(_) => SemanticType::Mac,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            FieldValue::UInt8(x) => Some(*x as u64),
            FieldValue::UInt16(x) => Some(*x as u64),
            FieldValue::UInt32(x) => Some(*x as u64),
            FieldValue::UInt64(x) => Some(*x),
            FieldValue::Enum { raw, .. } => (*raw).try_into().ok(),
            FieldValue::TimeAbsolute(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            FieldValue::Int8(x) => Some(*x as i64),
            FieldValue::Int16(x) => Some(*x as i64),
            FieldValue::Int32(x) => Some(*x as i64),
            FieldValue::Int64(x) => Some(*x),
            FieldValue::UInt8(x) => Some(*x as i64),
            FieldValue::UInt16(x) => Some(*x as i64),
            FieldValue::UInt32(x) => Some(*x as i64),
            FieldValue::UInt64(x) => (*x).try_into().ok(),
            FieldValue::Enum { raw, .. } => Some(*raw),
            FieldValue::TimeRelative(x) => Some(*x),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            FieldValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn enum_label(&self) -> Option<&str> {
        match self {
            FieldValue::Enum { label, .. } => label.as_deref(),
            _ => None,
        }
    }
}

fn format_duration_ns(f: &mut fmt::Formatter<'_>, ns: i64) -> fmt::Result {
    let sign = if ns < 0 { "-" } else { "" };
    let abs = ns.unsigned_abs();
    write!(f, "{}{}.{:09} s", sign, abs / 1_000_000_000, abs % 1_000_000_000)
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::None => Ok(()),
            FieldValue::Bytes => write!(f, "<bytes>"),
            FieldValue::UInt8(x) => write!(f, "{}", x),
            FieldValue::UInt16(x) => write!(f, "{}", x),
            FieldValue::UInt32(x) => write!(f, "{}", x),
            FieldValue::UInt64(x) => write!(f, "{}", x),
            FieldValue::Int8(x) => write!(f, "{}", x),
            FieldValue::Int16(x) => write!(f, "{}", x),
            FieldValue::Int32(x) => write!(f, "{}", x),
            FieldValue::Int64(x) => write!(f, "{}", x),
            FieldValue::Bool(x) => write!(f, "{}", x),
            FieldValue::Enum { raw, label: Some(l) } => write!(f, "{} ({})", l, raw),
            FieldValue::Enum { raw, label: None } => write!(f, "Unknown ({})", raw),
            FieldValue::Float(x) => write!(f, "{}", x),
            FieldValue::TimeAbsolute(ns) => {
                write!(f, "{}.{:09} s since epoch", ns / 1_000_000_000, ns % 1_000_000_000)
            }
            FieldValue::TimeRelative(ns) => format_duration_ns(f, *ns),
            FieldValue::Str(s) => write!(f, "\"{}\"", s),
            FieldValue::Ipv4(a) => write!(f, "{}", a),
            FieldValue::Ipv6(a) => write!(f, "{}", a),
            FieldValue::Mac(m) => write!(
                f,
                "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
                m[0], m[1], m[2], m[3], m[4], m[5]
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_enum_and_time() {
        let v = FieldValue::Enum { raw: 2, label: Some("CAN".to_string()) };
        assert_eq!(v.to_string(), "CAN (2)");
        assert_eq!(FieldValue::TimeRelative(-1_500_000_000).to_string(), "-1.500000000 s");
        assert_eq!(FieldValue::Mac([0, 0x1b, 0x21, 0xaa, 0xbb, 0xcc]).to_string(), "00:1b:21:aa:bb:cc");
    }

    #[test]
    fn numeric_accessors() {
        assert_eq!(FieldValue::UInt16(7).as_u64(), Some(7));
        assert_eq!(FieldValue::Int32(-3).as_u64(), None);
        assert_eq!(FieldValue::Int32(-3).as_i64(), Some(-3));
        assert_eq!(FieldValue::UInt64(u64::MAX).as_i64(), None);
        assert_eq!(FieldValue::Bool(true).semantic_type(), SemanticType::Bool);
    }
}
