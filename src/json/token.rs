//! JSON token tree with absolute byte ranges.
//!
//! Parsing is done by a PEST grammar; the resulting pairs are folded into [`JsonNode`]s whose
//! ranges are absolute offsets into the dissected buffer. Nesting is checked before the
//! grammar runs so a hostile document cannot exhaust the stack.

use crate::field::ByteRange;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser as PestParser;

#[derive(PestParser)]
#[grammar = "json.pest"]
struct JsonGrammar;

/// Deepest container nesting the tokenizer accepts.
pub const MAX_NESTING: usize = 128;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TokenError {
    #[error("invalid UTF-8 at offset {offset}")]
    Utf8 { offset: usize },
    #[error("nesting deeper than {max} at offset {offset}", max = MAX_NESTING)]
    TooDeep { offset: usize },
    #[error("JSON syntax error at offset {offset}: {message}")]
    Syntax { offset: usize, message: String },
}

impl TokenError {
    pub fn offset(&self) -> usize {
        match self {
            TokenError::Utf8 { offset } | TokenError::TooDeep { offset } | TokenError::Syntax { offset, .. } => *offset,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct JsonMember {
    pub key: String,
    pub key_range: ByteRange,
    pub value: JsonNode,
}

#[derive(Debug, Clone, PartialEq)]
pub enum JsonKind {
    Object(Vec<JsonMember>),
    Array(Vec<JsonNode>),
    /// Unescaped text.
    String(String),
    /// Number text as written.
    Number(String),
    Bool(bool),
    Null,
}

#[derive(Debug, Clone, PartialEq)]
pub struct JsonNode {
    pub kind: JsonKind,
    pub range: ByteRange,
}

impl JsonNode {
    pub fn kind_name(&self) -> &'static str {
        match self.kind {
            JsonKind::Object(_) => "object",
            JsonKind::Array(_) => "array",
            JsonKind::String(_) => "string",
            JsonKind::Number(_) => "number",
            JsonKind::Bool(_) => "boolean",
            JsonKind::Null => "null",
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(self.kind, JsonKind::Object(_) | JsonKind::Array(_))
    }
}

/// Tokenizes `data`; `base_offset` is the absolute offset of `data[0]`.
pub fn tokenize(data: &[u8], base_offset: usize) -> Result<JsonNode, TokenError> {
    let text = std::str::from_utf8(data)
        .map_err(|e| TokenError::Utf8 { offset: base_offset + e.valid_up_to() })?;
    check_nesting(text.as_bytes(), base_offset)?;
    let mut pairs = JsonGrammar::parse(Rule::document, text).map_err(|e| {
        let offset = match e.location {
            pest::error::InputLocation::Pos(p) => p,
            pest::error::InputLocation::Span((p, _)) => p,
        };
        TokenError::Syntax { offset: base_offset + offset, message: e.variant.message().into_owned() }
    })?;
    let document = pairs.next().ok_or(TokenError::Syntax { offset: base_offset, message: "empty document".into() })?;
    let value = document
        .into_inner()
        .find(|p| p.as_rule() != Rule::EOI)
        .ok_or(TokenError::Syntax { offset: base_offset, message: "no value".into() })?;
    Ok(build(value, base_offset))
}

/// Rejects documents nested deeper than [`MAX_NESTING`]; brackets inside strings do not count.
fn check_nesting(bytes: &[u8], base_offset: usize) -> Result<(), TokenError> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (i, &b) in bytes.iter().enumerate() {
        if in_string {
            match (escaped, b) {
                (true, _) => escaped = false,
                (false, b'\\') => escaped = true,
                (false, b'"') => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' | b'[' => {
                depth += 1;
                if depth > MAX_NESTING {
                    return Err(TokenError::TooDeep { offset: base_offset + i });
                }
            }
            b'}' | b']' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    Ok(())
}

fn range_of(pair: &Pair<Rule>, base: usize) -> ByteRange {
    let span = pair.as_span();
    ByteRange::new(base + span.start(), span.end() - span.start())
}

fn build(pair: Pair<Rule>, base: usize) -> JsonNode {
    let range = range_of(&pair, base);
    let kind = match pair.as_rule() {
        Rule::object => JsonKind::Object(
            pair.into_inner()
                .filter(|p| p.as_rule() == Rule::member)
                .filter_map(|m| build_member(m, base))
                .collect(),
        ),
        Rule::array => JsonKind::Array(pair.into_inner().map(|p| build(p, base)).collect()),
        Rule::string => JsonKind::String(unescape(pair.into_inner().next().map(|c| c.as_str()).unwrap_or(""))),
        Rule::number => JsonKind::Number(pair.as_str().to_string()),
        Rule::boolean => JsonKind::Bool(pair.as_str() == "true"),
        _ => JsonKind::Null,
    };
    JsonNode { kind, range }
}

fn build_member(pair: Pair<Rule>, base: usize) -> Option<JsonMember> {
    let mut it = pair.into_inner();
    let key = it.next()?;
    let key_range = range_of(&key, base);
    let key_text = unescape(key.into_inner().next().map(|c| c.as_str()).unwrap_or(""));
    let value = build(it.next()?, base);
    Some(JsonMember { key: key_text, key_range, value })
}

/// Resolves JSON escapes. Unpaired surrogates become U+FFFD.
fn unescape(raw: &str) -> String {
    if !raw.contains('\\') {
        return raw.to_string();
    }
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('b') => out.push('\u{08}'),
            Some('f') => out.push('\u{0C}'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('t') => out.push('\t'),
            Some('u') => {
                let hi = hex4(&mut chars);
                let cp = match hi {
                    Some(h) if (0xD800..0xDC00).contains(&h) => {
                        let mut look = chars.clone();
                        let lo = match (look.next(), look.next()) {
                            (Some('\\'), Some('u')) => hex4(&mut look).filter(|l| (0xDC00..0xE000).contains(l)),
                            _ => None,
                        };
                        match lo {
                            Some(l) => {
                                chars = look;
                                Some(0x10000 + ((h - 0xD800) << 10) + (l - 0xDC00))
                            }
                            None => None,
                        }
                    }
                    other => other,
                };
                out.push(cp.and_then(char::from_u32).unwrap_or('\u{FFFD}'));
            }
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

fn hex4(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) -> Option<u32> {
    let mut v = 0u32;
    for _ in 0..4 {
        v = v * 16 + chars.next()?.to_digit(16)?;
    }
    Some(v)
}
