//! TTL fuzz target: arbitrary bytes, start offset taken from the first byte.
//! The walker must not panic, must not report ranges past the buffer and must not return
//! an engine error.
//! Build with: cargo fuzz run ttl_dissect (requires nightly and cargo fuzz).

#![cfg_attr(fuzzing, no_main)]

#[cfg(fuzzing)]
use libfuzzer_sys::fuzz_target;

#[cfg(fuzzing)]
fuzz_target!(|data: &[u8]| {
    let Some((&skew, buf)) = data.split_first() else { return };
    let offset = skew as usize % (buf.len() + 1);
    let d = tracedissect::TtlDissector::new()
        .dissect(buf, offset)
        .expect("engine error on fuzz input");
    assert!(d.consumed() <= buf.len() - offset);
    if let Some(tree) = d.tree() {
        for (id, _) in tree.walk() {
            assert!(tree.node(id).range.end() <= buf.len());
        }
    }
});

#[cfg(not(fuzzing))]
fn main() {
    eprintln!("Build with: cargo fuzz run ttl_dissect");
}
