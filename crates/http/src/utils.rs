//! Utilities shared by the crate.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// 9999-12-31T23:59:59Z, the last instant an HTTP-date can express.
pub(crate) const LAST_HTTP_DATE: Duration = Duration::from_secs(253_402_300_799);

/// Returns early with an error if a condition is not met.
///
/// This is similar to the `assert!` macro, but returns an error instead of panicking.
///
/// # Example
///
/// ```ignore
/// ensure!(port != 0, InvalidArgument::invalid_port(port));
/// ```
macro_rules! ensure {
    ($predicate:expr, $error:expr) => {
        if !$predicate {
            return Err($error);
        }
    };
}

pub(crate) use ensure;

/// Formats `at` as an RFC 1123 HTTP-date, clamped to 1970-01-01 through 9999-12-31.
pub(crate) fn http_date(at: SystemTime) -> String {
    let since_epoch = at.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO).min(LAST_HTTP_DATE);
    httpdate::fmt_http_date(UNIX_EPOCH + since_epoch)
}
