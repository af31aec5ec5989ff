//! Message heads as they travel on the wire.
//!
//! Header names keep the spelling they were written or received with; lookups through
//! [`ResponseHead::header`] are case-insensitive.

use http::{Method, Version};

/// The request line and header lines of an outbound request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    pub method: Method,
    /// Origin-form target, `path[?query]`.
    pub target: String,
    pub version: Version,
    pub headers: Vec<(String, String)>,
}

impl RequestHead {
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        Self { method, target: target.into(), version: Version::HTTP_11, headers: Vec::new() }
    }

    pub fn push_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    pub fn has_header(&self, name: &str) -> bool {
        self.headers.iter().any(|(n, _)| n.eq_ignore_ascii_case(name))
    }
}

/// The status line and header lines of a response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub version: Version,
    pub status: u16,
    pub reason: String,
    pub headers: Vec<(String, String)>,
}

impl ResponseHead {
    pub fn new(status: u16, reason: impl Into<String>) -> Self {
        Self { version: Version::HTTP_11, status, reason: reason.into(), headers: Vec::new() }
    }

    /// First value of `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }

    pub fn status_line(&self) -> String {
        let version = version_str(self.version).unwrap_or("1.1");
        if self.reason.is_empty() {
            format!("HTTP/{version} {}", self.status)
        } else {
            format!("HTTP/{version} {} {}", self.status, self.reason)
        }
    }

    /// The status line followed by one `Name: value` line per header.
    pub fn header_lines(&self) -> Vec<String> {
        std::iter::once(self.status_line())
            .chain(self.headers.iter().map(|(name, value)| format!("{name}: {value}")))
            .collect()
    }
}

/// `"1.0"` or `"1.1"` for the versions spoken by the codecs.
pub(crate) fn version_str(version: Version) -> Option<&'static str> {
    match version {
        Version::HTTP_10 => Some("1.0"),
        Version::HTTP_11 => Some("1.1"),
        _ => None,
    }
}

pub(crate) fn parse_version(version: &str) -> Option<Version> {
    match version {
        "1.0" => Some(Version::HTTP_10),
        "1.1" => Some(Version::HTTP_11),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_head_lines() {
        let mut head = ResponseHead::new(404, "Not Found");
        head.headers.push(("Content-Type".into(), "text/plain".into()));
        head.headers.push(("X-Trace".into(), "1".into()));

        assert_eq!(head.header("content-type"), Some("text/plain"));
        assert_eq!(head.header("missing"), None);
        assert_eq!(head.header_lines(), vec!["HTTP/1.1 404 Not Found", "Content-Type: text/plain", "X-Trace: 1"]);
    }

    #[test]
    fn status_line_without_reason() {
        let mut head = ResponseHead::new(599, "");
        head.version = Version::HTTP_10;
        assert_eq!(head.status_line(), "HTTP/1.0 599");
    }

    #[test]
    fn versions() {
        assert_eq!(parse_version("1.0"), Some(Version::HTTP_10));
        assert_eq!(parse_version("2"), None);
        assert_eq!(version_str(Version::HTTP_2), None);
    }
}
