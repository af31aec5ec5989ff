//! Header block processing for both directions of a client exchange.
//!
//! # Components
//!
//! - [`HeaderDecoder`]: parses a response status line and header block and determines the
//!   body framing
//! - [`HeaderEncoder`]: writes header lines in canonical title case

mod header_decoder;
mod header_encoder;

pub use header_decoder::HeaderDecoder;
pub use header_encoder::HeaderEncoder;
pub(crate) use header_encoder::INIT_HEADER_SIZE;
