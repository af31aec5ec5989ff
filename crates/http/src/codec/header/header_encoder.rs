//! Serialization of header blocks.
//!
//! Names are written in canonical title case (`content-type` becomes `Content-Type`), in the
//! order they appear in the head, each line terminated by CRLF.

use bytes::{BufMut, BytesMut};

/// Initial buffer size reserved for a head.
pub(crate) const INIT_HEADER_SIZE: usize = 4 * 1024;

pub struct HeaderEncoder;

impl HeaderEncoder {
    /// Writes `Name: value\r\n` for every header, without the terminating blank line.
    pub fn encode_headers<'a, I>(headers: I, dst: &mut BytesMut)
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        for (name, value) in headers {
            put_title_case(name, dst);
            dst.put_slice(b": ");
            dst.put_slice(value.as_bytes());
            dst.put_slice(b"\r\n");
        }
    }
}

fn put_title_case(name: &str, dst: &mut BytesMut) {
    let mut upper = true;
    for byte in name.bytes() {
        dst.put_u8(if upper { byte.to_ascii_uppercase() } else { byte });
        upper = byte == b'-';
    }
}
