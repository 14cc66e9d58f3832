//! External field parsers.
//!
//! A schema string field may name a helper program. When delegation is enabled the walker
//! hands the field's name and value to an [`ExternalParser`] and splices the returned
//! annotation and child fields into the tree. Any failure degrades to plain rendering.
//!
//! Helper output protocol, one declaration per stdout line:
//!
//! ```text
//! text=<annotation appended to the field>
//! field=<filter name>=<value>
//! ```

use crate::schema::ParserRef;
use std::process::Command;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParserOutput {
    pub text: Option<String>,
    /// `(filter name, value)` in output order.
    pub fields: Vec<(String, String)>,
}

#[derive(Debug, thiserror::Error)]
pub enum DelegateError {
    #[error("cannot start parser {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parser {command} exited with {status}")]
    ExitStatus { command: String, status: String },
    #[error("malformed parser output line {line}: {text:?}")]
    Malformed { line: usize, text: String },
}

/// Turns a field value into structured output.
pub trait ExternalParser {
    fn run(&self, field_name: &str, value: &str, parser: &ParserRef) -> Result<ParserOutput, DelegateError>;
}

/// Runs the referenced command as a child process and reads its stdout.
#[derive(Debug, Clone, Default)]
pub struct ProcessParser;

impl ProcessParser {
    pub fn new() -> Self {
        ProcessParser
    }
}

/// Splits the argument template on whitespace and substitutes `%name%` and `%value%`.
pub fn expand_args(template: &str, field_name: &str, value: &str) -> Vec<String> {
    template
        .split_whitespace()
        .map(|arg| arg.replace("%name%", field_name).replace("%value%", value))
        .collect()
}

/// Parses helper stdout. Blank lines are ignored.
pub fn parse_output(stdout: &str) -> Result<ParserOutput, DelegateError> {
    let mut out = ParserOutput::default();
    for (i, line) in stdout.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        if let Some(text) = line.strip_prefix("text=") {
            out.text = Some(text.to_string());
        } else if let Some(decl) = line.strip_prefix("field=") {
            match decl.split_once('=') {
                Some((filter, value)) if !filter.is_empty() => out.fields.push((filter.to_string(), value.to_string())),
                _ => return Err(DelegateError::Malformed { line: i + 1, text: line.to_string() }),
            }
        } else {
            return Err(DelegateError::Malformed { line: i + 1, text: line.to_string() });
        }
    }
    Ok(out)
}

impl ExternalParser for ProcessParser {
    fn run(&self, field_name: &str, value: &str, parser: &ParserRef) -> Result<ParserOutput, DelegateError> {
        let mut cmd = Command::new(&parser.command);
        cmd.args(expand_args(&parser.args, field_name, value));
        let output = cmd
            .output()
            .map_err(|source| DelegateError::Spawn { command: parser.command.clone(), source })?;
        if !output.status.success() {
            return Err(DelegateError::ExitStatus { command: parser.command.clone(), status: output.status.to_string() });
        }
        parse_output(&String::from_utf8_lossy(&output.stdout))
    }
}
