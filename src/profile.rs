//! Walk profiling (feature `walk_profile`).
//!
//! With the feature on, each TTL nesting level records its cumulative time in a
//! thread-local table. Call [`reset_walk_profile`] before a run and [`get_walk_profile`]
//! after it for a label -> nanoseconds map (`"Header"`, `"Block"`, `"Entry"`, `"BusData"`).
//! Run the `walk_ttl` benchmark with `--features walk_profile` to print a summary.

use std::collections::HashMap;

#[cfg(feature = "walk_profile")]
use std::cell::RefCell;
#[cfg(feature = "walk_profile")]
use std::time::Instant;

#[cfg(feature = "walk_profile")]
thread_local!(static WALK_PROFILE: RefCell<HashMap<&'static str, u64>> = RefCell::new(HashMap::new()));

/// Clears the accumulated profile of the current thread.
#[cfg(feature = "walk_profile")]
pub fn reset_walk_profile() {
    WALK_PROFILE.with(|p| p.borrow_mut().clear());
}

/// Label -> total nanoseconds for the current thread.
#[cfg(feature = "walk_profile")]
pub fn get_walk_profile() -> HashMap<String, u64> {
    WALK_PROFILE.with(|p| p.borrow().iter().map(|(k, v)| (k.to_string(), *v)).collect())
}

#[cfg(feature = "walk_profile")]
pub(crate) struct ProfileGuard {
    label: &'static str,
    start: Instant,
}

#[cfg(feature = "walk_profile")]
impl ProfileGuard {
    pub(crate) fn new(label: &'static str) -> Self {
        Self { label, start: Instant::now() }
    }
}

#[cfg(feature = "walk_profile")]
impl Drop for ProfileGuard {
    fn drop(&mut self) {
        let ns = self.start.elapsed().as_nanos() as u64;
        WALK_PROFILE.with(|p| *p.borrow_mut().entry(self.label).or_insert(0) += ns);
    }
}

/// No-op when the `walk_profile` feature is not enabled.
#[cfg(not(feature = "walk_profile"))]
pub fn reset_walk_profile() {}

/// Returns an empty map when the `walk_profile` feature is not enabled.
#[cfg(not(feature = "walk_profile"))]
pub fn get_walk_profile() -> HashMap<String, u64> {
    HashMap::new()
}

#[cfg(not(feature = "walk_profile"))]
pub(crate) struct ProfileGuard;

#[cfg(not(feature = "walk_profile"))]
impl ProfileGuard {
    #[inline(always)]
    pub(crate) fn new(_label: &'static str) -> Self {
        ProfileGuard
    }
}
