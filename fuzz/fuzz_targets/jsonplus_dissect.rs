//! JSON+ fuzz target: arbitrary bytes through the generic (empty dictionary) walker.
//! Build with: cargo fuzz run jsonplus_dissect (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let d = tracedissect::JsonPlusDissector::generic()
        .dissect(data, 0)
        .expect("engine error on fuzz input");
    if let Some(tree) = d.tree() {
        for (id, _) in tree.walk() {
            assert!(tree.node(id).range.end() <= data.len());
        }
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run jsonplus_dissect");
}
