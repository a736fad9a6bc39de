//! List limit utilities.

/// Default number of rows returned by list endpoints.
pub const DEFAULT_LIST_LIMIT: i64 = 100;

/// Upper bound on rows returned by any single list call.
pub const MAX_LIST_LIMIT: i64 = 500;

/// Normalizes a caller-supplied limit into `1..=MAX_LIST_LIMIT`.
///
/// `None` yields [`DEFAULT_LIST_LIMIT`].
pub fn clamp_limit(limit: Option<i64>) -> i64 {
    match limit {
        None => DEFAULT_LIST_LIMIT,
        Some(l) => l.clamp(1, MAX_LIST_LIMIT),
    }
}
