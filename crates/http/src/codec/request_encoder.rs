//! Encoder for outbound requests.
//!
//! Writes the request line, the header block in the order given and the body. A
//! `Content-Length` is appended for non-empty bodies the head does not already frame.

use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::Encoder;
use tracing::error;

use crate::codec::header::{HeaderEncoder, INIT_HEADER_SIZE};
use crate::protocol::{RequestHead, SendError, version_str};

#[derive(Debug, Default)]
pub struct RequestEncoder;

impl RequestEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl Encoder<(RequestHead, Bytes)> for RequestEncoder {
    type Error = SendError;

    fn encode(&mut self, item: (RequestHead, Bytes), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (head, body) = item;

        let Some(version) = version_str(head.version) else {
            error!(http_version = ?head.version, "unsupported http version");
            return Err(SendError::unsupported_version(format!("{:?}", head.version)));
        };

        dst.reserve(INIT_HEADER_SIZE + body.len());
        let target = if head.target.is_empty() { "/" } else { head.target.as_str() };
        dst.put_slice(format!("{} {target} HTTP/{version}\r\n", head.method).as_bytes());

        HeaderEncoder::encode_headers(head.headers.iter().map(|(name, value)| (name.as_str(), value.as_str())), dst);
        if !body.is_empty() && !head.has_header("content-length") && !head.has_header("transfer-encoding") {
            HeaderEncoder::encode_headers([("content-length", body.len().to_string().as_str())], dst);
        }

        dst.put_slice(b"\r\n");
        dst.put_slice(&body);
        Ok(())
    }
}
