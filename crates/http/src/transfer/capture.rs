//! Accumulation of raw response header lines.
//!
//! A transport reports every received header line, status line included, one at a time.
//! [`HeaderCapture`] keeps the ones of the form `name: value`, keyed by the trimmed,
//! lower-cased name. Repeated names are merged into one comma-joined value.

use indexmap::IndexMap;
use tracing::trace;

#[derive(Debug, Default)]
pub struct HeaderCapture {
    headers: IndexMap<String, Vec<String>>,
    skipped: usize,
}

impl HeaderCapture {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one line and returns the number of bytes consumed, which is always the
    /// full line. Lines without a colon are skipped.
    pub fn push_line(&mut self, line: &str) -> usize {
        let Some((name, value)) = line.split_once(':') else {
            self.skipped += 1;
            trace!(line = line.trim_end(), "skip header line without colon");
            return line.len();
        };

        self.headers.entry(name.trim().to_ascii_lowercase()).or_default().push(value.trim().to_string());
        line.len()
    }

    /// Number of lines ignored because they had no colon.
    pub fn skipped(&self) -> usize {
        self.skipped
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.headers.get(&name.to_ascii_lowercase()).map(|values| values.join(","))
    }

    /// The captured headers in first-seen order, values joined with `,`.
    pub fn finish(self) -> IndexMap<String, String> {
        self.headers.into_iter().map(|(name, values)| (name, values.join(","))).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lines_are_normalized_and_merged() {
        let mut capture = HeaderCapture::new();
        for line in ["HTTP/1.1 200 OK\r\n", "Content-Type: text/html\r\n", "Set-Cookie: a=1\r\n", " set-cookie :b=2 \r\n", "\r\n"] {
            assert_eq!(capture.push_line(line), line.len());
        }

        assert_eq!(capture.skipped(), 2);
        assert_eq!(capture.get("SET-COOKIE").as_deref(), Some("a=1,b=2"));

        let headers = capture.finish();
        assert_eq!(headers.keys().collect::<Vec<_>>(), ["content-type", "set-cookie"]);
        assert_eq!(headers["content-type"], "text/html");
    }

    #[test]
    fn value_keeps_later_colons() {
        let mut capture = HeaderCapture::new();
        capture.push_line("Location: http://example.com:8080/next");

        assert_eq!(capture.get("location").as_deref(), Some("http://example.com:8080/next"));
    }
}
