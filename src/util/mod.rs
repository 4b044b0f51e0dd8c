//! Utilities - string interning, identifier checks, tracing init

pub mod interner;
pub mod log;

pub use interner::{intern, intern_arc};

/// Check an identifier against the snake_case convention.
///
/// Returns `None` when valid, or a reason string when not.
/// Manual single-pass check instead of regex: O(n), zero allocations,
/// no compilation overhead for a trivial pattern.
///
/// Valid identifiers:
/// - Start with lowercase letter [a-z]
/// - Contain only lowercase letters, digits, underscores [a-z0-9_]*
pub(crate) fn snake_case_violation(id: &str) -> Option<&'static str> {
    if id.is_empty() {
        return Some("cannot be empty");
    }

    let bytes = id.as_bytes();
    if !bytes[0].is_ascii_lowercase() {
        return Some("must start with a lowercase letter (a-z)");
    }

    for &byte in &bytes[1..] {
        if !byte.is_ascii_lowercase() && !byte.is_ascii_digit() && byte != b'_' {
            return Some("may only contain lowercase letters, digits, and underscores");
        }
    }

    None
}
