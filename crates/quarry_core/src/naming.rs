//! Index name rules.

use crate::error::ValidationError;

/// Longest accepted index name, in bytes.
pub const MAX_INDEX_NAME_LEN: usize = 255;

/// Checks an index name.
///
/// Names are non-empty ASCII letters, digits, `_` and `-`, at most
/// [`MAX_INDEX_NAME_LEN`] long, and never start with `.` or `_` (those are
/// reserved for hidden directories and internal use).
pub fn validate_index_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::invalid_index_name(name, "must not be empty"));
    }
    if name.len() > MAX_INDEX_NAME_LEN {
        return Err(ValidationError::invalid_index_name(
            name,
            "must be at most 255 characters",
        ));
    }
    if name.starts_with('.') || name.starts_with('_') {
        return Err(ValidationError::invalid_index_name(
            name,
            "must not start with '.' or '_'",
        ));
    }
    if !name
        .bytes()
        .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
    {
        return Err(ValidationError::invalid_index_name(
            name,
            "may only contain letters, digits, '_' and '-'",
        ));
    }
    Ok(())
}

/// Matches `name` against a glob where `*` stands for any run of characters.
/// The whole name must match.
pub fn glob_matches(pattern: &str, name: &str) -> bool {
    let pattern = pattern.as_bytes();
    let name = name.as_bytes();
    let (mut p, mut n) = (0, 0);
    let mut backtrack: Option<(usize, usize)> = None;

    while n < name.len() {
        if p < pattern.len() && pattern[p] == b'*' {
            backtrack = Some((p, n));
            p += 1;
        } else if p < pattern.len() && pattern[p] == name[n] {
            p += 1;
            n += 1;
        } else if let Some((star, matched)) = backtrack {
            p = star + 1;
            n = matched + 1;
            backtrack = Some((star, matched + 1));
        } else {
            return false;
        }
    }
    pattern[p..].iter().all(|&b| b == b'*')
}
