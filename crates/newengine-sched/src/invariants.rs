//! Fatal checks for scheduler invariants.
//!
//! A violated invariant means the gate/buffer protocol is broken. These always panic.

#[cold]
#[inline(never)]
fn violation(msg: &'static str) -> ! {
    panic!("CORE INVARIANT VIOLATION: {msg}");
}

/// Panic if a required invariant is false.
#[inline]
pub fn require(cond: bool, msg: &'static str) {
    if !cond {
        violation(msg);
    }
}

/// Panic on an impossible state transition.
#[inline]
pub fn bad_state(msg: &'static str) -> ! {
    violation(msg)
}
