//! HTTP/1.x codecs for the client side of an exchange.
//!
//! The codecs implement the `tokio_util` [`Decoder`](tokio_util::codec::Decoder) and
//! [`Encoder`](tokio_util::codec::Encoder) traits over [`BytesMut`](bytes::BytesMut)
//! buffers. They never touch a socket themselves, so the same code serves the blocking
//! transport in [`transfer`](crate::transfer) and any other I/O driver.
//!
//! # Architecture
//!
//! - Requests:
//!   - [`RequestEncoder`]: request line, header block and body
//! - Responses:
//!   - [`ResponseDecoder`]: status line and headers via [`header`], followed by body frames
//!     via [`body`] (length delimited, chunked or close delimited)
//!   - [`ResponseEncoder`]: complete responses, used for server-side serialization
//! - Content codings:
//!   - [`encoding`]: `gzip`, `deflate`, `br` and `zstd` decoding of received bodies
//!
//! # Example
//!
//! ```
//! use bytes::{Bytes, BytesMut};
//! use http::Method;
//! use micro_http_message::codec::RequestEncoder;
//! use micro_http_message::protocol::RequestHead;
//! use tokio_util::codec::Encoder;
//!
//! let mut head = RequestHead::new(Method::GET, "/status");
//! head.push_header("host", "localhost");
//!
//! let mut buffer = BytesMut::new();
//! RequestEncoder::new().encode((head, Bytes::new()), &mut buffer).unwrap();
//! assert_eq!(&buffer[..], b"GET /status HTTP/1.1\r\nHost: localhost\r\n\r\n");
//! ```

pub mod body;
pub mod encoding;
pub mod header;
mod request_encoder;
mod response_decoder;
mod response_encoder;

pub use request_encoder::RequestEncoder;
pub use response_decoder::ResponseDecoder;
pub use response_encoder::ResponseEncoder;
