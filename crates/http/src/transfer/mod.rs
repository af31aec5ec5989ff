//! Request transfer pipeline.
//!
//! [`Request::send`](crate::protocol::Request::send) resolves a request into a
//! [`PreparedTransfer`], hands it to a [`Transport`] and rebuilds a
//! [`Response`] from the [`RawResponse`] that comes back:
//!
//! 1. the transport performs the network exchange and reports the status code, every
//!    received header line and the raw body
//! 2. header lines are accumulated by [`HeaderCapture`]
//! 3. a body announced with a known `Content-Encoding` is decoded
//! 4. the result is wrapped into a [`Response`] whose body is an in-memory [`Stream`]
//!
//! HTTP error statuses are ordinary responses. Only network-level failures surface as
//! [`TransferError`].
//!
//! [`TcpTransport`] is the bundled blocking implementation. Anything else (a pooled
//! client, a TLS-capable transport, a test double) only has to implement [`Transport`].

mod capture;
mod tcp;

pub use capture::HeaderCapture;
pub use tcp::TcpTransport;

use bytes::Bytes;
use http::{HeaderMap, HeaderName, HeaderValue, Method};
use tracing::{debug, trace};

use crate::codec::encoding::decode_content;
use crate::protocol::{HttpMessage, Response, Stream, TransferError, TransferOptions};

/// Everything a transport needs to perform one exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedTransfer {
    pub method: Method,
    /// Absolute URL, with any query-string payload already appended.
    pub url: String,
    /// Header fields in send order, names as given by the caller.
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    /// Effective options; always holds a user agent and an `encoding` entry.
    pub options: TransferOptions,
}

/// What came back over the wire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawResponse {
    pub status: u16,
    /// Received header lines, starting with the status line.
    pub header_lines: Vec<String>,
    /// The body with transfer framing removed but content codings still applied.
    pub body: Bytes,
}

/// Performs the network part of a request.
#[cfg_attr(test, mockall::automock)]
pub trait Transport {
    /// # Errors
    ///
    /// Returns [`TransferError`] when no complete response could be obtained.
    fn execute(&self, transfer: &PreparedTransfer) -> Result<RawResponse, TransferError>;
}

/// Builds a [`Response`] from a raw exchange.
///
/// Header names are lower-cased and repeated headers joined with `,`. A status line at
/// the head of `header_lines` provides the protocol version and reason phrase. Header
/// values that are not valid HTTP field values are dropped.
pub fn reconstruct(raw: RawResponse) -> Result<Response, TransferError> {
    let mut capture = HeaderCapture::new();
    let status_line = raw.header_lines.first().filter(|line| line.starts_with("HTTP/"));
    for line in &raw.header_lines {
        capture.push_line(line);
    }
    trace!(lines = raw.header_lines.len(), skipped = capture.skipped(), "captured response headers");

    let body = match capture.get("content-encoding") {
        Some(encoding) => decode_content(&encoding, raw.body)?,
        None => raw.body,
    };

    let mut headers = HeaderMap::new();
    for (name, value) in capture.finish() {
        match (HeaderName::from_bytes(name.as_bytes()), HeaderValue::from_str(&value)) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => trace!(name, "drop invalid response header"),
        }
    }

    let mut response = Response::from_parts(raw.status, headers, Stream::from_bytes(body));
    if let Some((version, reason)) = status_line.and_then(|line| parse_status_line(line)) {
        response = response.with_protocol_version(version);
        if !reason.is_empty() {
            response = response.with_status(raw.status, Some(reason));
        }
    }

    debug!(status = raw.status, "reconstructed response");
    Ok(response)
}

/// Splits `HTTP/1.1 404 Not Found` into `("1.1", "Not Found")`.
fn parse_status_line(line: &str) -> Option<(&str, &str)> {
    let rest = line.trim_end().strip_prefix("HTTP/")?;
    let (version, rest) = rest.split_once(' ').unwrap_or((rest, ""));
    let reason = rest.trim_start().split_once(' ').map_or("", |(_, reason)| reason.trim());
    Some((version, reason))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::GzEncoder;
    use std::io::Write;

    #[test]
    fn status_line_parts() {
        assert_eq!(parse_status_line("HTTP/1.0 404 Not Found\r\n"), Some(("1.0", "Not Found")));
        assert_eq!(parse_status_line("HTTP/1.1 200"), Some(("1.1", "")));
        assert_eq!(parse_status_line("Server: x"), None);
    }

    #[test]
    fn reconstruct_merges_headers_and_keeps_status_details() {
        let raw = RawResponse {
            status: 418,
            header_lines: vec![
                "HTTP/1.0 418 Short And Stout".into(),
                "X-Tea: green".into(),
                "x-tea: black".into(),
                "Content-Type: text/plain".into(),
            ],
            body: Bytes::from("brewing"),
        };

        let mut response = reconstruct(raw).unwrap();
        assert_eq!(response.status_code(), 418);
        assert_eq!(response.reason_phrase(), "Short And Stout");
        assert_eq!(response.protocol_version(), "1.0");
        assert_eq!(response.header("x-tea"), vec!["green,black"]);
        assert_eq!(response.content(), "brewing");
    }

    #[test]
    fn compressed_bodies_are_decoded() {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(b"{\"ok\":true}").unwrap();

        let raw = RawResponse {
            status: 200,
            header_lines: vec!["HTTP/1.1 200 OK".into(), "Content-Encoding: gzip".into()],
            body: Bytes::from(encoder.finish().unwrap()),
        };

        let mut response = reconstruct(raw).unwrap();
        assert_eq!(response.content(), "{\"ok\":true}");
        assert_eq!(response.header_line("content-encoding").as_deref(), Some("gzip"));
    }

    #[test]
    fn error_statuses_are_responses() {
        let raw = RawResponse { status: 503, header_lines: vec![], body: Bytes::new() };
        let response = reconstruct(raw).unwrap();

        assert!(response.is_server_error());
        assert_eq!(response.reason_phrase(), "Service Unavailable");
    }
}
