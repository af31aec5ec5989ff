//! Streaming response decoder.
//!
//! Coordinates [`HeaderDecoder`] and [`PayloadDecoder`]: the first frame of a response is its
//! head, followed by payload chunks and a final [`PayloadItem::Eof`].
//!
//! Interim `1xx` responses (other than `101 Switching Protocols`) are consumed silently, so
//! the head handed out is always the final one.
//!
//! # Example
//!
//! ```
//! use bytes::BytesMut;
//! use micro_http_message::codec::ResponseDecoder;
//! use micro_http_message::protocol::Frame;
//! use tokio_util::codec::Decoder;
//!
//! let mut decoder = ResponseDecoder::new(false);
//! let mut buffer = BytesMut::from(&b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\n\r\nok"[..]);
//!
//! let Some(Frame::Header((head, _))) = decoder.decode(&mut buffer).unwrap() else { panic!() };
//! assert_eq!(head.status, 200);
//! ```

use bytes::BytesMut;
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::body::PayloadDecoder;
use crate::codec::header::HeaderDecoder;
use crate::protocol::{Frame, ParseError, PayloadItem, PayloadSize, ResponseHead};

#[derive(Debug)]
pub struct ResponseDecoder {
    header_decoder: HeaderDecoder,
    payload_decoder: Option<PayloadDecoder>,
}

impl ResponseDecoder {
    /// `head_request` must be set when decoding the answer to a `HEAD` request.
    pub fn new(head_request: bool) -> Self {
        Self { header_decoder: HeaderDecoder::new(head_request), payload_decoder: None }
    }

    fn decode_payload(&mut self, src: &mut BytesMut, eof: bool) -> Result<Option<Frame<(ResponseHead, PayloadSize)>>, ParseError> {
        let Some(payload_decoder) = &mut self.payload_decoder else {
            return Ok(None);
        };

        let item = if eof { payload_decoder.decode_eof(src)? } else { payload_decoder.decode(src)? };
        if let Some(PayloadItem::Eof) = item {
            // response complete, the next bytes belong to a new head
            self.payload_decoder.take();
        }
        Ok(item.map(Frame::Payload))
    }
}

impl Default for ResponseDecoder {
    fn default() -> Self {
        Self::new(false)
    }
}

impl Decoder for ResponseDecoder {
    type Item = Frame<(ResponseHead, PayloadSize)>;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.payload_decoder.is_some() {
            return self.decode_payload(src, false);
        }

        loop {
            let Some((head, payload_size)) = self.header_decoder.decode(src)? else {
                return Ok(None);
            };

            if (100..200).contains(&head.status) && head.status != 101 {
                trace!(status = head.status, "skip interim response");
                continue;
            }

            self.payload_decoder = Some(payload_size.into());
            return Ok(Some(Frame::Header((head, payload_size))));
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.payload_decoder.is_some() {
            return self.decode_payload(src, true);
        }

        match self.decode(src)? {
            Some(frame) => Ok(Some(frame)),
            None if src.is_empty() => Ok(None),
            None => Err(ParseError::invalid_header("connection closed in the middle of a response head")),
        }
    }
}
