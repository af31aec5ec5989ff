//! Encoder for complete responses.
//!
//! A response is encoded in one go from its [`ResponseHead`] and fully buffered body. When the
//! head declares neither `Content-Length` nor `Transfer-Encoding`, a `Content-Length` matching
//! the body is appended to the header block, except for statuses that never carry a body
//! (`1xx`, `204` and `304`).
//!
//! # Example
//!
//! ```
//! use bytes::{Bytes, BytesMut};
//! use micro_http_message::codec::ResponseEncoder;
//! use micro_http_message::protocol::ResponseHead;
//! use tokio_util::codec::Encoder;
//!
//! let mut dst = BytesMut::new();
//! ResponseEncoder::new().encode((ResponseHead::new(200, "OK"), Bytes::from("hi")), &mut dst).unwrap();
//! assert_eq!(&dst[..], b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nhi");
//! ```

use bytes::{BufMut, Bytes, BytesMut};
use tokio_util::codec::Encoder;
use tracing::error;

use crate::codec::header::{HeaderEncoder, INIT_HEADER_SIZE};
use crate::protocol::{ResponseHead, SendError, version_str};

#[derive(Debug, Default)]
pub struct ResponseEncoder;

impl ResponseEncoder {
    pub fn new() -> Self {
        Self
    }
}

impl Encoder<(ResponseHead, Bytes)> for ResponseEncoder {
    type Error = SendError;

    fn encode(&mut self, item: (ResponseHead, Bytes), dst: &mut BytesMut) -> Result<(), Self::Error> {
        let (head, body) = item;

        let Some(version) = version_str(head.version) else {
            error!(http_version = ?head.version, "unsupported http version");
            return Err(SendError::unsupported_version(format!("{:?}", head.version)));
        };

        dst.reserve(INIT_HEADER_SIZE + body.len());
        dst.put_slice(format!("HTTP/{version} {}", head.status).as_bytes());
        if !head.reason.is_empty() {
            dst.put_u8(b' ');
            dst.put_slice(head.reason.as_bytes());
        }
        dst.put_slice(b"\r\n");

        HeaderEncoder::encode_headers(head.headers.iter().map(|(name, value)| (name.as_str(), value.as_str())), dst);

        let bodiless = (100..200).contains(&head.status) || head.status == 204 || head.status == 304;
        let framed = head.header("content-length").is_some() || head.header("transfer-encoding").is_some();
        if !bodiless && !framed {
            HeaderEncoder::encode_headers([("content-length", body.len().to_string().as_str())], dst);
        }

        dst.put_slice(b"\r\n");
        dst.put_slice(&body);
        Ok(())
    }
}
