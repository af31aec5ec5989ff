//! Blocking HTTP/1.1 transport over plain TCP.
//!
//! One connection per request, closed after the response (`Connection: close`). Honors the
//! `connect-timeout`, `timeout`, `user-agent`, `basic-auth`, `referrer` and `encoding`
//! options. Only `http` URLs are supported.

use std::io::{self, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use bytes::BytesMut;
use http::Method;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, trace, warn};

use crate::codec::encoding::SUPPORTED_ENCODINGS;
use crate::codec::{RequestEncoder, ResponseDecoder};
use crate::ensure;
use crate::protocol::{Frame, ParseError, PayloadItem, RequestHead, ResponseHead, TransferError, Uri};
use crate::transfer::{PreparedTransfer, RawResponse, Transport};

const DEFAULT_READ_BUFFER_SIZE: usize = 8 * 1024;

const HTTP_PORT: u16 = 80;

#[derive(Debug, Clone)]
pub struct TcpTransport {
    read_buffer_size: usize,
}

impl TcpTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Size of each socket read; at least one byte.
    #[must_use]
    pub fn with_read_buffer_size(mut self, size: usize) -> Self {
        self.read_buffer_size = size.max(1);
        self
    }

    fn connect(host: &str, port: u16, timeout: Option<Duration>) -> Result<TcpStream, TransferError> {
        let connect_error = |source: io::Error| TransferError::Connect { host: host.to_string(), port, source };

        let addrs = (host, port).to_socket_addrs().map_err(connect_error)?;
        let mut last_error = io::Error::new(io::ErrorKind::NotFound, "host resolved to no addresses");
        for addr in addrs {
            let attempt = match timeout {
                Some(timeout) => TcpStream::connect_timeout(&addr, timeout),
                None => TcpStream::connect(addr),
            };
            match attempt {
                Ok(stream) => {
                    trace!(%addr, "connected");
                    return Ok(stream);
                }
                Err(e) => {
                    debug!(%addr, "connect attempt failed: {e}");
                    last_error = e;
                }
            }
        }
        Err(connect_error(last_error))
    }

    fn read_response(&self, stream: &mut TcpStream, head_request: bool) -> Result<RawResponse, TransferError> {
        let mut decoder = ResponseDecoder::new(head_request);
        let mut buffer = BytesMut::with_capacity(self.read_buffer_size);
        let mut chunk = vec![0_u8; self.read_buffer_size];
        let mut head: Option<ResponseHead> = None;
        let mut body = BytesMut::new();
        let mut closed = false;

        loop {
            let frame = if closed { decoder.decode_eof(&mut buffer)? } else { decoder.decode(&mut buffer)? };

            match frame {
                Some(Frame::Header((response_head, payload_size))) => {
                    trace!(status = response_head.status, ?payload_size, "received response head");
                    head = Some(response_head);
                }
                Some(Frame::Payload(PayloadItem::Chunk(bytes))) => body.extend_from_slice(&bytes),
                Some(Frame::Payload(PayloadItem::Eof)) => break,
                None if closed => {
                    return Err(ParseError::invalid_header("connection closed before a response was received").into());
                }
                None => {
                    let n = stream.read(&mut chunk)?;
                    if n == 0 {
                        closed = true;
                    } else {
                        buffer.extend_from_slice(&chunk[..n]);
                    }
                }
            }
        }

        let head = head.ok_or_else(|| ParseError::invalid_header("response body without head"))?;
        if !buffer.is_empty() {
            warn!(trailing = buffer.len(), "ignore bytes after the end of the response");
        }

        Ok(RawResponse { status: head.status, header_lines: head.header_lines(), body: body.freeze() })
    }
}

impl Default for TcpTransport {
    fn default() -> Self {
        Self { read_buffer_size: DEFAULT_READ_BUFFER_SIZE }
    }
}

impl Transport for TcpTransport {
    fn execute(&self, transfer: &PreparedTransfer) -> Result<RawResponse, TransferError> {
        let uri = Uri::parse(&transfer.url).map_err(|e| TransferError::invalid_url(&transfer.url, e))?;
        ensure!(uri.scheme() != "https", TransferError::unsupported_scheme("https"));
        ensure!(!uri.host().is_empty(), TransferError::invalid_url(&transfer.url, "missing host"));

        let host = uri.host().trim_start_matches('[').trim_end_matches(']');
        let port = uri.port().unwrap_or(HTTP_PORT);

        // sockets reject zero timeouts; zero means no limit
        let connect_timeout = transfer.options.connect_timeout().filter(|timeout| !timeout.is_zero());
        let timeout = transfer.options.timeout().filter(|timeout| !timeout.is_zero());

        let mut stream = Self::connect(host, port, connect_timeout)?;
        stream.set_read_timeout(timeout)?;
        stream.set_write_timeout(timeout)?;

        let head = request_head(&uri, transfer);
        let mut buffer = BytesMut::new();
        RequestEncoder::new().encode((head, transfer.body.clone()), &mut buffer)?;
        stream.write_all(&buffer)?;
        stream.flush()?;
        debug!(method = %transfer.method, host, port, size = buffer.len(), "request written");

        self.read_response(&mut stream, transfer.method == Method::HEAD)
    }
}

/// The request head for `transfer`: caller headers in order, then the defaults the caller
/// did not set.
fn request_head(uri: &Uri, transfer: &PreparedTransfer) -> RequestHead {
    let mut head = RequestHead::new(transfer.method.clone(), origin_form(&transfer.url));
    let options = &transfer.options;

    if !transfer.headers.iter().any(|(name, _)| name.eq_ignore_ascii_case("host")) {
        head.push_header("host", host_header(uri));
    }
    for (name, value) in &transfer.headers {
        head.push_header(name.as_str(), value.as_str());
    }

    let mut push_default = |name: &str, value: String| {
        if !head.has_header(name) {
            head.push_header(name, value);
        }
    };

    if let Some(user_agent) = options.user_agent() {
        push_default("user-agent", user_agent.to_string());
    }

    let credentials = options.basic_auth().map(|(user, password)| format!("{user}:{password}")).or_else(|| {
        let user_info = uri.user_info();
        (!user_info.is_empty()).then(|| user_info.to_string())
    });
    if let Some(credentials) = credentials {
        push_default("authorization", format!("Basic {}", STANDARD.encode(credentials)));
    }

    if let Some(referrer) = options.referrer() {
        push_default("referer", referrer.to_string());
    }

    match options.encoding() {
        Some("") => push_default("accept-encoding", SUPPORTED_ENCODINGS.to_string()),
        Some(encoding) => push_default("accept-encoding", encoding.to_string()),
        None => {}
    }

    if !transfer.body.is_empty() || matches!(transfer.method, Method::POST | Method::PUT | Method::PATCH) {
        push_default("content-length", transfer.body.len().to_string());
    }
    push_default("connection", "close".to_string());

    head
}

/// `Host` value: the host, plus the port when it is not the scheme default.
fn host_header(uri: &Uri) -> String {
    match uri.port() {
        Some(port) if port != HTTP_PORT => format!("{}:{port}", uri.host()),
        _ => uri.host().to_string(),
    }
}

/// The path and query of an absolute URL, without the fragment. Kept verbatim so that a
/// raw query-string payload reaches the server exactly as given.
fn origin_form(url: &str) -> String {
    let url = url.split_once('#').map_or(url, |(before, _)| before);
    let after_scheme = url.split_once("://").map_or(url, |(_, rest)| rest);
    let target = after_scheme.find(['/', '?']).map_or("", |start| &after_scheme[start..]);

    match target {
        "" => "/".to_string(),
        query if query.starts_with('?') => format!("/{query}"),
        path => path.to_string(),
    }
}
