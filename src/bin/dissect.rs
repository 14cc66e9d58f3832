//! Dissect a TTL trace log (default) or a JSON+ document and print the field tree.
//!
//! Usage:
//!   dissect [OPTIONS] FILE
//!
//! Options:
//!   --verbose, -v          Log walker decisions to stderr
//!   --json                 Treat FILE as JSON+ instead of TTL
//!   --schema FILE          Schema dictionary for JSON+ (generic rendering without one)
//!   --external-parsers     Allow schema-declared helper programs to run
//!   --summary              JSON+ only: print the info summary, no tree

use std::path::PathBuf;
use std::sync::Arc;
use tracedissect::json::ProcessParser;
use tracedissect::{dump, Dissection, JsonPlusDissector, JsonPlusOptions, SchemaDictionary, TtlDissector};

fn take_flag(args: &mut Vec<String>, names: &[&str]) -> bool {
    match args.iter().position(|a| names.contains(&a.as_str())) {
        Some(pos) => {
            args.remove(pos);
            true
        }
        None => false,
    }
}

fn take_value(args: &mut Vec<String>, name: &str) -> anyhow::Result<Option<String>> {
    let Some(pos) = args.iter().position(|a| a == name) else {
        return Ok(None);
    };
    args.remove(pos);
    if pos >= args.len() {
        anyhow::bail!("{} needs a value", name);
    }
    Ok(Some(args.remove(pos)))
}

fn main() -> anyhow::Result<()> {
    let mut raw_args: Vec<String> = std::env::args().skip(1).collect();
    let verbose = take_flag(&mut raw_args, &["--verbose", "-v"]);
    let json = take_flag(&mut raw_args, &["--json"]);
    let external = take_flag(&mut raw_args, &["--external-parsers"]);
    let summary_only = take_flag(&mut raw_args, &["--summary"]);
    let schema_path = take_value(&mut raw_args, "--schema")?.map(PathBuf::from);

    tracing_subscriber::fmt()
        .with_max_level(if verbose { tracing::Level::DEBUG } else { tracing::Level::WARN })
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let mut args = raw_args.into_iter();
    let path: PathBuf = match args.next() {
        Some(p) => PathBuf::from(p),
        None => anyhow::bail!("usage: dissect [--verbose] [--json] [--schema FILE] [--external-parsers] [--summary] FILE"),
    };
    let data = std::fs::read(&path).map_err(|e| anyhow::anyhow!("{}: {}", path.display(), e))?;

    let dissection = if json {
        let dict = match &schema_path {
            Some(p) => SchemaDictionary::from_file(p)?,
            None => SchemaDictionary::empty(),
        };
        let mut dissector = JsonPlusDissector::new(Arc::new(dict))
            .with_options(JsonPlusOptions::new().with_external_parsers(external));
        if external {
            dissector = dissector.with_external_parser(Arc::new(ProcessParser::new()));
        }
        if summary_only {
            println!("{}", dissector.summary(&data, 0)?);
            return Ok(());
        }
        dissector.dissect(&data, 0)?
    } else {
        TtlDissector::new().dissect(&data, 0)?
    };

    match dissection {
        Dissection::NoMatch => anyhow::bail!("{}: not a {} file", path.display(), if json { "JSON+" } else { "TTL" }),
        Dissection::Matched { tree, consumed } => {
            print!("{}", dump::render(&tree, &data));
            println!("consumed {} of {} bytes", consumed, data.len());
            #[cfg(feature = "walk_profile")]
            for (label, ns) in tracedissect::get_walk_profile() {
                eprintln!("profile {}: {} ns", label, ns);
            }
        }
    }
    Ok(())
}
