//! Fresh-Name Generation
//!
//! The process-wide `unique_name` counter backs synthetic names that never
//! escape a pass (CSE temporaries). The prover's placeholder names are built
//! by `scoped_names` instead, which is deterministic for a given input so
//! that repeated proofs of the same update yield structurally equal results.

use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};

static NAME_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generate a process-unique identifier with the given prefix.
pub fn unique_name(prefix: &str) -> String {
    let n = NAME_COUNTER.fetch_add(1, Ordering::Relaxed);
    format!("{prefix}{n}")
}

/// Deterministic placeholder names `_<tag>_0 .. _<tag>_{count-1}`.
///
/// The underscore prefix is lengthened until no name in `used` could collide
/// with any generated name.
pub(crate) fn scoped_names(tag: char, count: usize, used: &HashSet<String>) -> Vec<String> {
    let mut prefix = String::from("_");
    loop {
        let stem = format!("{prefix}{tag}_");
        if used.iter().all(|u| !u.starts_with(&stem)) {
            return (0..count).map(|i| format!("{stem}{i}")).collect();
        }
        prefix.push('_');
    }
}
