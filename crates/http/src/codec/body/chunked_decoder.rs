//! Decoder for `Transfer-Encoding: chunked` response bodies.
//!
//! The decoder is a byte-driven state machine. It can be fed arbitrarily split input: every
//! state transition consumes at most the bytes available and resumes where it stopped on
//! the next call.
//!
//! Chunk extensions are skipped and trailer fields are discarded.

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::protocol::{ParseError, PayloadItem};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChunkedDecoder {
    state: State,
    remaining: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Hex digits of the chunk size.
    Size,
    /// Whitespace between the size and an extension or the line end.
    SizeWhitespace,
    Extension,
    SizeLf,
    Data,
    DataCr,
    DataLf,
    /// Start of a line after the last chunk: either the final CRLF or a trailer field.
    TrailerStart,
    Trailer,
    TrailerLf,
    FinalLf,
    Done,
}

/// Result of consuming one byte or one data slice.
enum Step {
    Next(State),
    Data(BytesMut, State),
}

impl ChunkedDecoder {
    pub fn new() -> Self {
        Self { state: State::Size, remaining: 0 }
    }

    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    fn step(&mut self, src: &mut BytesMut) -> Result<Step, ParseError> {
        if self.state == State::Data {
            let len = usize::try_from(self.remaining).unwrap_or(usize::MAX).min(src.len());
            let data = src.split_to(len);
            self.remaining -= len as u64;
            let next = if self.remaining == 0 { State::DataCr } else { State::Data };
            return Ok(Step::Data(data, next));
        }

        let byte = src.get_u8();
        let next = match (self.state, byte) {
            (State::Size, b'\r') => State::SizeLf,
            (State::Size, b';') => State::Extension,
            (State::Size, b' ' | b'\t') => State::SizeWhitespace,
            (State::Size, b) => {
                let digit = hex_value(b).ok_or_else(|| ParseError::invalid_body(format!("invalid chunk size byte 0x{b:02x}")))?;
                self.remaining = self
                    .remaining
                    .checked_mul(16)
                    .and_then(|size| size.checked_add(u64::from(digit)))
                    .ok_or_else(|| ParseError::invalid_body("chunk size overflow"))?;
                State::Size
            }

            (State::SizeWhitespace, b' ' | b'\t') => State::SizeWhitespace,
            (State::SizeWhitespace, b';') => State::Extension,
            (State::SizeWhitespace, b'\r') => State::SizeLf,
            (State::SizeWhitespace, _) => return Err(ParseError::invalid_body("invalid whitespace in chunk size line")),

            (State::Extension, b'\r') => State::SizeLf,
            (State::Extension, b'\n') => return Err(ParseError::invalid_body("chunk extension contains a bare LF")),
            (State::Extension, _) => State::Extension,

            (State::SizeLf, b'\n') if self.remaining == 0 => State::TrailerStart,
            (State::SizeLf, b'\n') => State::Data,
            (State::SizeLf, _) => return Err(ParseError::invalid_body("expected LF after chunk size")),

            (State::DataCr, b'\r') => State::DataLf,
            (State::DataCr, _) => return Err(ParseError::invalid_body("expected CR after chunk data")),
            (State::DataLf, b'\n') => State::Size,
            (State::DataLf, _) => return Err(ParseError::invalid_body("expected LF after chunk data")),

            (State::TrailerStart, b'\r') => State::FinalLf,
            (State::Trailer, b'\r') => State::TrailerLf,
            (State::TrailerStart | State::Trailer, _) => State::Trailer,
            (State::TrailerLf, b'\n') => State::TrailerStart,
            (State::TrailerLf, _) => return Err(ParseError::invalid_body("expected LF after trailer field")),

            (State::FinalLf, b'\n') => State::Done,
            (State::FinalLf, _) => return Err(ParseError::invalid_body("expected LF after last chunk")),

            (State::Data | State::Done, _) => self.state,
        };
        Ok(Step::Next(next))
    }
}

impl Default for ChunkedDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ChunkedDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if self.state == State::Done {
                trace!("chunked body complete");
                return Ok(Some(PayloadItem::Eof));
            }

            if src.is_empty() {
                return Ok(None);
            }

            match self.step(src)? {
                Step::Next(state) => self.state = state,
                Step::Data(data, state) => {
                    self.state = state;
                    trace!(len = data.len(), remaining = self.remaining, "read chunk data");
                    return Ok(Some(PayloadItem::Chunk(data.freeze())));
                }
            }
        }
    }
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}
