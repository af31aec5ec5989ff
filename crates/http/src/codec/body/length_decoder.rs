//! Decoder for bodies delimited by a `Content-Length` header.

use bytes::BytesMut;
use tokio_util::codec::Decoder;

use crate::protocol::{ParseError, PayloadItem};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LengthDecoder {
    remaining: u64,
}

impl LengthDecoder {
    pub fn new(length: u64) -> Self {
        Self { remaining: length }
    }

    /// Bytes still expected before the body is complete.
    pub fn remaining(&self) -> u64 {
        self.remaining
    }
}

impl Decoder for LengthDecoder {
    type Item = PayloadItem;
    type Error = ParseError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.remaining == 0 {
            return Ok(Some(PayloadItem::Eof));
        }

        if src.is_empty() {
            return Ok(None);
        }

        let len = usize::try_from(self.remaining).unwrap_or(usize::MAX).min(src.len());
        self.remaining -= len as u64;
        Ok(Some(PayloadItem::Chunk(src.split_to(len).freeze())))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(item) => Ok(Some(item)),
            None => Err(ParseError::invalid_body(format!("connection closed with {} body bytes outstanding", self.remaining))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stops_at_the_declared_length() {
        let mut buffer = BytesMut::from(&b"1012345678|next"[..]);
        let mut decoder = LengthDecoder::new(10);

        let item = decoder.decode(&mut buffer).unwrap().unwrap();
        assert_eq!(&item.as_bytes().unwrap()[..], b"1012345678");
        assert!(decoder.decode(&mut buffer).unwrap().unwrap().is_eof());
        assert_eq!(&buffer[..], b"|next");
    }

    #[test]
    fn partial_input() {
        let mut buffer = BytesMut::from(&b"abc"[..]);
        let mut decoder = LengthDecoder::new(5);

        assert_eq!(decoder.decode(&mut buffer).unwrap().unwrap().into_bytes().unwrap(), "abc");
        assert_eq!(decoder.remaining(), 2);
        assert!(decoder.decode(&mut buffer).unwrap().is_none());
    }

    #[test]
    fn truncated_body_is_an_error_at_eof() {
        let mut buffer = BytesMut::new();
        let mut decoder = LengthDecoder::new(4);
        assert!(decoder.decode_eof(&mut buffer).is_err());
    }
}
