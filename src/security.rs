use subtle::ConstantTimeEq;

use crate::error::{GridError, GridResult};

/// Header carrying the CSRF token on asynchronous requests
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Constant-time string comparison to prevent timing attacks
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Verify the submitted CSRF token. Passes when no token is configured.
pub fn check_csrf(expected: Option<&str>, submitted: Option<&str>) -> GridResult<()> {
    match (expected, submitted) {
        (None, _) => Ok(()),
        (Some(expected), Some(submitted)) if constant_time_compare(expected, submitted) => Ok(()),
        _ => Err(GridError::Forbidden),
    }
}
