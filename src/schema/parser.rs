//! Parse schema source into [`FieldDef`]s using PEST.

use super::defs::{EnumKey, FieldDef, ParserRef, Segment};
use super::SchemaError;
use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser as PestParser;

#[derive(PestParser)]
#[grammar = "schema.pest"]
struct SchemaParser;

/// Parse schema source text.
pub fn parse(source: &str) -> Result<Vec<FieldDef>, SchemaError> {
    let pairs = SchemaParser::parse(Rule::schema, source).map_err(syntax_error)?;
    let schema = pairs.into_iter().next().ok_or_else(|| SchemaError::Invalid("empty parse".to_string()))?;
    let mut defs = Vec::new();
    for inner in schema.into_inner() {
        if inner.as_rule() == Rule::field_def {
            defs.push(build_field(inner)?);
        }
    }
    Ok(defs)
}

fn syntax_error(e: pest::error::Error<Rule>) -> SchemaError {
    let (line, column) = match e.line_col {
        pest::error::LineColLocation::Pos(p) => p,
        pest::error::LineColLocation::Span(p, _) => p,
    };
    SchemaError::Syntax { line, column, message: e.variant.message().into_owned() }
}

fn build_field(pair: Pair<Rule>) -> Result<FieldDef, SchemaError> {
    let element = pair.as_rule() == Rule::element_def;
    let mut segment = if element { Some(Segment::Element) } else { None };
    let mut def = None;
    for inner in pair.into_inner() {
        match inner.as_rule() {
            Rule::field_path => {
                let path = inner.into_inner().next().ok_or_else(|| invalid("field: missing path"))?;
                let text = match path.as_rule() {
                    Rule::string => unquote(path)?,
                    _ => path.as_str().to_string(),
                };
                segment = Some(Segment::Member(text));
            }
            Rule::type_name => {
                let seg = segment.take().ok_or_else(|| invalid("field: type before path"))?;
                def = Some(FieldDef::new(seg, inner.as_str()));
            }
            Rule::field_body => {
                let d = def.as_mut().ok_or_else(|| invalid("field: body before type"))?;
                build_body(d, inner)?;
            }
            _ => {}
        }
    }
    def.ok_or_else(|| invalid("field: missing type"))
}

fn build_body(def: &mut FieldDef, pair: Pair<Rule>) -> Result<(), SchemaError> {
    for attr in pair.into_inner() {
        match attr.as_rule() {
            Rule::info_attr => {
                let s = attr.into_inner().next().ok_or_else(|| invalid("info: missing text"))?;
                def.info = Some(unquote(s)?);
            }
            Rule::display_attr => {
                let h = attr.into_inner().next().ok_or_else(|| invalid("display: missing hint"))?;
                def.display = Some(h.as_str().to_string());
            }
            Rule::enum_attr => {
                for entry in attr.into_inner() {
                    def.enum_values.push(build_enum_entry(entry)?);
                }
            }
            Rule::parser_attr => {
                let mut it = attr.into_inner();
                let command = unquote(it.next().ok_or_else(|| invalid("parser: missing command"))?)?;
                let args = match it.next() {
                    Some(a) => unquote(a)?,
                    None => String::new(),
                };
                def.parser = Some(ParserRef { command, args });
            }
            Rule::case_attr => def.case_insensitive = true,
            Rule::field_def | Rule::element_def => def.children.push(build_field(attr)?),
            _ => {}
        }
    }
    Ok(())
}

fn build_enum_entry(pair: Pair<Rule>) -> Result<(EnumKey, String), SchemaError> {
    let mut it = pair.into_inner();
    let key = it.next().ok_or_else(|| invalid("enum entry: missing key"))?;
    let key = match key.as_rule() {
        Rule::integer => {
            let n = key.as_str().parse::<i64>().map_err(|e| invalid(&format!("enum key {}: {}", key.as_str(), e)))?;
            EnumKey::Int(n)
        }
        _ => EnumKey::Str(unquote(key)?),
    };
    let label = unquote(it.next().ok_or_else(|| invalid("enum entry: missing label"))?)?;
    Ok((key, label))
}

/// Text of a `string` pair with `\"`, `\\`, `\n` and `\t` resolved.
fn unquote(pair: Pair<Rule>) -> Result<String, SchemaError> {
    let inner = pair.into_inner().next().ok_or_else(|| invalid("string: missing body"))?;
    let mut out = String::with_capacity(inner.as_str().len());
    let mut chars = inner.as_str().chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    Ok(out)
}

fn invalid(msg: &str) -> SchemaError {
    SchemaError::Invalid(msg.to_string())
}
