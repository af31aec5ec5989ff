//! Content codings of response bodies.
//!
//! Bodies are decoded after the whole payload has been received. Codings listed in a
//! `Content-Encoding` header were applied in order, so they are undone last to first.
//!
//! # Features
//!
//! - `gzip` (and the legacy `x-gzip` alias), multi-member streams included
//! - `deflate`, accepting both zlib-wrapped and raw deflate data
//! - `br` and `zstd`
//! - `identity` is a no-op
//!
//! A coding outside this list stops decoding; the body is returned in the state reached
//! so far.

use std::io::{self, BufReader};

use bytes::{BufMut, Bytes, BytesMut};
use flate2::read::{DeflateDecoder, MultiGzDecoder, ZlibDecoder};
use tracing::{trace, warn};

use crate::protocol::TransferError;

/// Value sent as `Accept-Encoding` when every supported coding is acceptable.
pub const SUPPORTED_ENCODINGS: &str = "gzip, deflate, br, zstd";

const BROTLI_BUFFER_SIZE: usize = 32 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentCoding {
    Identity,
    Gzip,
    Deflate,
    Br,
    Zstd,
}

impl ContentCoding {
    /// Matches one token of a `Content-Encoding` list, case-insensitively.
    pub fn from_token(token: &str) -> Option<Self> {
        let token = token.trim();
        [
            ("identity", ContentCoding::Identity),
            ("gzip", ContentCoding::Gzip),
            ("x-gzip", ContentCoding::Gzip),
            ("deflate", ContentCoding::Deflate),
            ("br", ContentCoding::Br),
            ("zstd", ContentCoding::Zstd),
        ]
        .into_iter()
        .find_map(|(name, coding)| token.eq_ignore_ascii_case(name).then_some(coding))
    }

    pub fn name(self) -> &'static str {
        match self {
            ContentCoding::Identity => "identity",
            ContentCoding::Gzip => "gzip",
            ContentCoding::Deflate => "deflate",
            ContentCoding::Br => "br",
            ContentCoding::Zstd => "zstd",
        }
    }

    /// Undoes this coding on a complete body.
    pub fn decode(self, body: &[u8]) -> io::Result<Bytes> {
        match self {
            ContentCoding::Identity => Ok(Bytes::copy_from_slice(body)),
            ContentCoding::Deflate => {
                Decoder::Deflate(ZlibDecoder::new(body)).read_all().or_else(|e| {
                    trace!("zlib header missing ({e}), trying raw deflate");
                    Decoder::RawDeflate(DeflateDecoder::new(body)).read_all()
                })
            }
            ContentCoding::Gzip => Decoder::Gzip(MultiGzDecoder::new(body)).read_all(),
            ContentCoding::Br => Decoder::Br(Box::new(brotli::Decompressor::new(body, BROTLI_BUFFER_SIZE))).read_all(),
            ContentCoding::Zstd => Decoder::Zstd(zstd::stream::read::Decoder::new(body)?).read_all(),
        }
    }
}

/// One decompressor reading from a borrowed body.
enum Decoder<'a> {
    Gzip(MultiGzDecoder<&'a [u8]>),
    Deflate(ZlibDecoder<&'a [u8]>),
    RawDeflate(DeflateDecoder<&'a [u8]>),
    Zstd(zstd::stream::read::Decoder<'static, BufReader<&'a [u8]>>),
    Br(Box<brotli::Decompressor<&'a [u8]>>),
}

impl Decoder<'_> {
    fn read_all(self) -> io::Result<Bytes> {
        let mut writer = BytesMut::new().writer();
        match self {
            Decoder::Gzip(mut decoder) => io::copy(&mut decoder, &mut writer)?,
            Decoder::Deflate(mut decoder) => io::copy(&mut decoder, &mut writer)?,
            Decoder::RawDeflate(mut decoder) => io::copy(&mut decoder, &mut writer)?,
            Decoder::Zstd(mut decoder) => io::copy(&mut decoder, &mut writer)?,
            Decoder::Br(mut decoder) => io::copy(decoder.as_mut(), &mut writer)?,
        };
        Ok(writer.into_inner().freeze())
    }
}

/// Decodes `body` according to a `Content-Encoding` header value.
///
/// # Errors
///
/// Returns [`TransferError::Decode`] when the data is not valid for a coding it claims.
pub fn decode_content(content_encoding: &str, body: Bytes) -> Result<Bytes, TransferError> {
    let mut body = body;
    for token in content_encoding.rsplit(',').map(str::trim).filter(|token| !token.is_empty()) {
        let Some(coding) = ContentCoding::from_token(token) else {
            warn!(coding = token, "unsupported content coding, body left encoded");
            return Ok(body);
        };
        if coding == ContentCoding::Identity {
            continue;
        }

        let before = body.len();
        body = coding.decode(&body).map_err(|e| TransferError::decode(coding.name(), e))?;
        trace!(coding = coding.name(), before, after = body.len(), "decoded response body");
    }
    Ok(body)
}

/// Whether `content_encoding` holds only codings [`decode_content`] can undo.
pub fn is_supported(content_encoding: &str) -> bool {
    content_encoding
        .split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .all(|token| ContentCoding::from_token(token).is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::{DeflateEncoder, GzEncoder, ZlibEncoder};
    use std::io::Write;

    const TEXT: &[u8] = b"the quick brown fox jumps over the lazy dog, again and again and again";

    fn gzip(data: &[u8]) -> Vec<u8> {
        let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn gzip_and_alias() {
        let body = Bytes::from(gzip(TEXT));
        assert_eq!(decode_content("gzip", body.clone()).unwrap(), TEXT);
        assert_eq!(decode_content("X-GZIP", body).unwrap(), TEXT);
    }

    #[test]
    fn deflate_with_and_without_zlib_wrapper() {
        let mut zlib = ZlibEncoder::new(Vec::new(), Compression::default());
        zlib.write_all(TEXT).unwrap();
        assert_eq!(decode_content("deflate", Bytes::from(zlib.finish().unwrap())).unwrap(), TEXT);

        let mut raw = DeflateEncoder::new(Vec::new(), Compression::default());
        raw.write_all(TEXT).unwrap();
        assert_eq!(decode_content("deflate", Bytes::from(raw.finish().unwrap())).unwrap(), TEXT);
    }

    #[test]
    fn brotli() {
        let mut encoder = brotli::CompressorWriter::new(Vec::new(), 4096, 5, 22);
        encoder.write_all(TEXT).unwrap();
        encoder.flush().unwrap();
        let encoded = encoder.into_inner();

        assert_eq!(decode_content("br", Bytes::from(encoded)).unwrap(), TEXT);
    }

    #[test]
    fn zstd() {
        let encoded = zstd::encode_all(TEXT, 3).unwrap();
        assert_eq!(decode_content("zstd", Bytes::from(encoded)).unwrap(), TEXT);
    }

    #[test]
    fn stacked_codings_are_undone_last_to_first() {
        let encoded = zstd::encode_all(&gzip(TEXT)[..], 3).unwrap();
        assert_eq!(decode_content("gzip, identity, zstd", Bytes::from(encoded)).unwrap(), TEXT);
    }

    #[test]
    fn unknown_coding_leaves_the_body_alone() {
        let body = Bytes::from_static(b"compressed somehow");
        assert_eq!(decode_content("compress", body.clone()).unwrap(), body);
        assert!(!is_supported("gzip, compress"));
        assert!(is_supported("gzip, br"));
    }

    #[test]
    fn corrupt_data_is_an_error() {
        let err = decode_content("gzip", Bytes::from_static(b"not gzip at all")).unwrap_err();
        assert!(matches!(err, TransferError::Decode { ref encoding, .. } if encoding == "gzip"));
    }
}
