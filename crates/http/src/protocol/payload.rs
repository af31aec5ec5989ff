use bytes::Bytes;

/// One item produced or consumed by the wire codecs: a message head or a piece of payload.
///
/// The generic parameter `T` is the head type ([`RequestHead`](crate::protocol::RequestHead)
/// or [`ResponseHead`](crate::protocol::ResponseHead)).
#[derive(Debug)]
pub enum Frame<T> {
    Header(T),
    Payload(PayloadItem),
}

impl<T> Frame<T> {
    #[inline]
    pub fn is_header(&self) -> bool {
        matches!(self, Frame::Header(_))
    }

    #[inline]
    pub fn is_payload(&self) -> bool {
        matches!(self, Frame::Payload(_))
    }

    pub fn into_payload_item(self) -> Option<PayloadItem> {
        match self {
            Frame::Header(_) => None,
            Frame::Payload(item) => Some(item),
        }
    }
}

impl<T> From<Bytes> for Frame<T> {
    fn from(bytes: Bytes) -> Self {
        Self::Payload(PayloadItem::Chunk(bytes))
    }
}

/// A chunk of payload data, or the marker that the payload is complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadItem {
    Chunk(Bytes),
    Eof,
}

impl PayloadItem {
    #[inline]
    pub fn is_eof(&self) -> bool {
        matches!(self, PayloadItem::Eof)
    }

    #[inline]
    pub fn is_chunk(&self) -> bool {
        matches!(self, PayloadItem::Chunk(_))
    }

    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }

    pub fn into_bytes(self) -> Option<Bytes> {
        match self {
            PayloadItem::Chunk(bytes) => Some(bytes),
            PayloadItem::Eof => None,
        }
    }
}

/// How the length of a response payload is delimited on the wire.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PayloadSize {
    /// `Content-Length` bytes follow the head.
    Length(u64),
    /// `Transfer-Encoding: chunked`.
    Chunked,
    /// No payload at all (HEAD responses, 204, 304, 1xx).
    Empty,
    /// Neither length nor chunking: the payload runs until the peer closes the connection.
    Close,
}

impl PayloadSize {
    #[inline]
    pub fn is_chunked(&self) -> bool {
        matches!(self, PayloadSize::Chunked)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        matches!(self, PayloadSize::Empty)
    }
}
