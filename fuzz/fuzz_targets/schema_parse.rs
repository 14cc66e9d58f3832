//! Schema fuzz target: feed arbitrary text to the schema dictionary builder.
//! It must not panic; it returns a dictionary or a SchemaError.
//! Build with: cargo fuzz run schema_parse (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let s = match std::str::from_utf8(data) {
        Ok(x) => x,
        Err(_) => return,
    };
    if let Ok(dict) = tracedissect::SchemaDictionary::from_source(s) {
        for node in dict.nodes() {
            assert!(dict.lookup(&node.path).is_some());
        }
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run schema_parse");
}
