//! Selects the body framing announced by a response head.
//!
//! - `Content-Length` bodies go through [`LengthDecoder`]
//! - chunked bodies go through [`ChunkedDecoder`]
//! - close-delimited bodies pass every byte through until the peer closes the connection
//! - bodiless responses yield [`PayloadItem::Eof`] right away

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::codec::body::chunked_decoder::ChunkedDecoder;
use crate::codec::body::length_decoder::LengthDecoder;
use crate::protocol::{ParseError, PayloadItem, PayloadSize};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PayloadDecoder {
    kind: Kind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Kind {
    Length(LengthDecoder),
    Chunked(ChunkedDecoder),
    UntilClose { finished: bool },
    NoBody,
}

impl PayloadDecoder {
    pub fn empty() -> Self {
        Self { kind: Kind::NoBody }
    }

    pub fn chunked() -> Self {
        Self { kind: Kind::Chunked(ChunkedDecoder::new()) }
    }

    pub fn fix_length(size: u64) -> Self {
        Self { kind: Kind::Length(LengthDecoder::new(size)) }
    }

    pub fn until_close() -> Self {
        Self { kind: Kind::UntilClose { finished: false } }
    }

    pub fn is_chunked(&self) -> bool {
        matches!(self.kind, Kind::Chunked(_))
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.kind, Kind::NoBody)
    }
}

impl From<PayloadSize> for PayloadDecoder {
    fn from(size: PayloadSize) -> Self {
        match size {
            PayloadSize::Length(n) => PayloadDecoder::fix_length(n),
            PayloadSize::Chunked => PayloadDecoder::chunked(),
            PayloadSize::Empty => PayloadDecoder::empty(),
            PayloadSize::Close => PayloadDecoder::until_close(),
        }
    }
}

impl Decoder for PayloadDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match &mut self.kind {
            Kind::Length(decoder) => decoder.decode(src),
            Kind::Chunked(decoder) => decoder.decode(src),
            Kind::UntilClose { finished: true } | Kind::NoBody => Ok(Some(PayloadItem::Eof)),
            Kind::UntilClose { finished: false } if src.is_empty() => Ok(None),
            Kind::UntilClose { finished: false } => Ok(Some(PayloadItem::Chunk(src.split().freeze()))),
        }
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match &mut self.kind {
            Kind::Length(decoder) => decoder.decode_eof(src),
            Kind::Chunked(decoder) => match decoder.decode(src)? {
                Some(item) => Ok(Some(item)),
                None => Err(ParseError::invalid_body("connection closed before the last chunk")),
            },
            Kind::UntilClose { finished } => {
                if src.is_empty() {
                    *finished = true;
                    Ok(Some(PayloadItem::Eof))
                } else {
                    Ok(Some(PayloadItem::Chunk(src.split().freeze())))
                }
            }
            Kind::NoBody => Ok(Some(PayloadItem::Eof)),
        }
    }
}
