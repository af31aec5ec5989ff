//! Response body framing.
//!
//! # Components
//!
//! - [`PayloadDecoder`]: picks the framing announced by the response head
//! - `LengthDecoder`: `Content-Length` delimited bodies
//! - `ChunkedDecoder`: `Transfer-Encoding: chunked` bodies, extensions and trailers skipped

mod chunked_decoder;
mod length_decoder;
mod payload_decoder;

pub use payload_decoder::PayloadDecoder;
