//! Response head decoder built on `httparse`.
//!
//! Turns the status line and header block of a response into a [`ResponseHead`] and works
//! out how the body that follows is delimited.
//!
//! # Limits
//!
//! - Maximum number of headers: 128
//! - Maximum head size: 64KB
//! - Only HTTP/1.0 and HTTP/1.1
//!
//! # Body framing
//!
//! Follows RFC 9112 section 6.3: responses to `HEAD`, `1xx`, `204` and `304` have no body;
//! a `Transfer-Encoding` ending in `chunked` means chunked framing, any other transfer
//! coding means the body runs until the connection closes; otherwise `Content-Length`
//! decides, and without it the body also runs until close. Both headers at once are
//! rejected.

use bytes::{Buf, BytesMut};
use http::Version;
use httparse::{Error, Status};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::{ParseError, PayloadSize, ResponseHead};

const MAX_HEADER_NUM: usize = 128;

const MAX_HEADER_BYTES: usize = 64 * 1024;

/// Decoder for response heads implementing the [`Decoder`] trait.
#[derive(Debug, Clone, Copy, Default)]
pub struct HeaderDecoder {
    head_request: bool,
}

impl HeaderDecoder {
    /// `head_request` marks responses to `HEAD`, which never carry a body.
    pub fn new(head_request: bool) -> Self {
        Self { head_request }
    }
}

impl Decoder for HeaderDecoder {
    type Item = (ResponseHead, PayloadSize);
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // "HTTP/1.1 200\r\n\r\n"
        if src.len() < 16 {
            return Ok(None);
        }

        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
        let mut res = httparse::Response::new(&mut headers);

        let status = res.parse(src).map_err(|e| match e {
            Error::TooManyHeaders => ParseError::too_many_headers(MAX_HEADER_NUM),
            e => ParseError::invalid_header(e.to_string()),
        })?;

        let body_offset = match status {
            Status::Complete(body_offset) => body_offset,
            Status::Partial => {
                ensure!(src.len() <= MAX_HEADER_BYTES, ParseError::too_large_header(src.len(), MAX_HEADER_BYTES));
                return Ok(None);
            }
        };
        trace!(head_size = body_offset, "parsed response head");
        ensure!(body_offset <= MAX_HEADER_BYTES, ParseError::too_large_header(body_offset, MAX_HEADER_BYTES));

        let version = match res.version {
            Some(0) => Version::HTTP_10,
            Some(1) => Version::HTTP_11,
            v => return Err(ParseError::InvalidVersion(v)),
        };

        let status = res.code.ok_or_else(|| ParseError::invalid_header("missing status code"))?;
        let mut head = ResponseHead::new(status, res.reason.unwrap_or_default());
        head.version = version;
        head.headers = res
            .headers
            .iter()
            .map(|header| (header.name.to_string(), String::from_utf8_lossy(header.value).into_owned()))
            .collect();

        src.advance(body_offset);

        let payload_size = self.payload_size(&head)?;
        Ok(Some((head, payload_size)))
    }
}

impl HeaderDecoder {
    fn payload_size(&self, head: &ResponseHead) -> Result<PayloadSize, ParseError> {
        if self.head_request || (100..200).contains(&head.status) || head.status == 204 || head.status == 304 {
            return Ok(PayloadSize::Empty);
        }

        match (head.header("transfer-encoding"), head.header("content-length")) {
            (None, None) => Ok(PayloadSize::Close),

            (Some(te), None) if is_chunked(te) => Ok(PayloadSize::Chunked),
            (Some(_), None) => Ok(PayloadSize::Close),

            (None, Some(cl)) => {
                let length = cl
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| ParseError::invalid_content_length(format!("value {cl} is not u64")))?;
                Ok(PayloadSize::Length(length))
            }

            (Some(_), Some(_)) => Err(ParseError::invalid_content_length("transfer-encoding and content-length both present in headers")),
        }
    }
}

/// `chunked` must be the last transfer coding when present.
fn is_chunked(value: &str) -> bool {
    value.rsplit(',').next().is_some_and(|last| last.trim().eq_ignore_ascii_case("chunked"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn crlf(s: &str) -> BytesMut {
        BytesMut::from(s.replace('\n', "\r\n").as_str())
    }

    #[test]
    fn check_is_chunked() {
        assert!(is_chunked("chunked"));
        assert!(is_chunked("gzip, chunked"));
        assert!(!is_chunked("chunked, gzip"));
        assert!(!is_chunked("gzip"));
    }

    #[test]
    fn from_nginx() {
        let mut buf = crlf(indoc! {"
            HTTP/1.1 200 OK
            Server: nginx/1.24.0
            Content-Type: text/html
            Content-Length: 5
            Connection: close

            hello"});

        let (head, payload_size) = HeaderDecoder::default().decode(&mut buf).unwrap().unwrap();

        assert_eq!(head.version, Version::HTTP_11);
        assert_eq!(head.status, 200);
        assert_eq!(head.reason, "OK");
        assert_eq!(head.headers.len(), 4);
        assert_eq!(head.header("content-type"), Some("text/html"));
        assert_eq!(payload_size, PayloadSize::Length(5));
        assert_eq!(&buf[..], b"hello");
    }

    #[test]
    fn partial_head_waits() {
        let mut buf = BytesMut::from(&b"HTTP/1.1 200 OK\r\nContent-Le"[..]);
        assert!(HeaderDecoder::default().decode(&mut buf).unwrap().is_none());
        assert_eq!(buf.len(), 27);
    }

    #[test]
    fn body_framing() {
        let cases = [
            ("HTTP/1.1 200 OK\nTransfer-Encoding: chunked\n\n", false, PayloadSize::Chunked),
            ("HTTP/1.1 200 OK\nTransfer-Encoding: gzip\n\n", false, PayloadSize::Close),
            ("HTTP/1.0 200 OK\nServer: test\n\n", false, PayloadSize::Close),
            ("HTTP/1.1 204 No Content\nContent-Length: 10\n\n", false, PayloadSize::Empty),
            ("HTTP/1.1 304 Not Modified\nServer: test\n\n", false, PayloadSize::Empty),
            ("HTTP/1.1 100 Continue\nServer: test\n\n", false, PayloadSize::Empty),
            ("HTTP/1.1 200 OK\nContent-Length: 10\n\n", true, PayloadSize::Empty),
        ];

        for (raw, head_request, expected) in cases {
            let (_, payload_size) = HeaderDecoder::new(head_request).decode(&mut crlf(raw)).unwrap().unwrap();
            assert_eq!(payload_size, expected, "{raw:?}");
        }
    }

    #[test]
    fn conflicting_framing_is_rejected() {
        let mut buf = crlf("HTTP/1.1 200 OK\nTransfer-Encoding: chunked\nContent-Length: 3\n\n");
        assert!(matches!(HeaderDecoder::default().decode(&mut buf), Err(ParseError::InvalidContentLength { .. })));
    }

    #[test]
    fn invalid_content_length() {
        let mut buf = crlf("HTTP/1.1 200 OK\nContent-Length: ten\n\n");
        assert!(HeaderDecoder::default().decode(&mut buf).is_err());
    }

    #[test]
    fn oversized_head() {
        let mut buf = BytesMut::from("HTTP/1.1 200 OK\r\nX-Big: ");
        buf.extend_from_slice(&vec![b'a'; MAX_HEADER_BYTES]);
        assert!(matches!(HeaderDecoder::default().decode(&mut buf), Err(ParseError::TooLargeHeader { .. })));
    }
}
