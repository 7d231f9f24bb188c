//! Stack growth for deep recursion.
//!
//! The parser, codec and evaluator all walk trees recursively. Each of them
//! enters [`ensure_sufficient_stack`] once per level, so a deep (but
//! otherwise legal) tree moves onto a heap-allocated stack segment instead of
//! overflowing the host thread.
//!
//! On wasm32 the call is a plain passthrough.

/// Grow when less than this much stack is left.
const RED_ZONE: usize = 128 * 1024;

/// Size of each newly allocated segment.
const SEGMENT_SIZE: usize = 1024 * 1024;

/// Run `f`, first switching to a fresh stack segment if the current one is
/// nearly exhausted.
#[inline]
#[cfg(not(target_arch = "wasm32"))]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    stacker::maybe_grow(RED_ZONE, SEGMENT_SIZE, f)
}

#[inline]
#[cfg(target_arch = "wasm32")]
pub fn ensure_sufficient_stack<R>(f: impl FnOnce() -> R) -> R {
    f()
}
