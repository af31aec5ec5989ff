use std::io;
use thiserror::Error;

use crate::protocol::UploadError;

/// Top-level error for operations that can fail in more than one domain.
#[derive(Debug, Error)]
pub enum HttpError {
    #[error("uri error: {source}")]
    Uri {
        #[from]
        source: UriError,
    },

    #[error("invalid argument: {source}")]
    InvalidArgument {
        #[from]
        source: InvalidArgument,
    },

    #[error("stream error: {source}")]
    Stream {
        #[from]
        source: StreamError,
    },

    #[error("transfer error: {source}")]
    Transfer {
        #[from]
        source: TransferError,
    },
}

/// Raised while turning a wire string into a [`Uri`](crate::protocol::Uri).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UriError {
    #[error("the source uri string appears to be malformed: {reason}")]
    Malformed { reason: String },

    #[error(transparent)]
    InvalidArgument(#[from] InvalidArgument),
}

impl UriError {
    pub fn malformed<S: ToString>(str: S) -> Self {
        Self::Malformed { reason: str.to_string() }
    }
}

/// An out-of-domain value passed to a constructor or a `with_*` mutator.
///
/// The receiver is left unchanged when one of these is returned.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InvalidArgument {
    #[error("unsupported scheme \"{scheme}\"; must be an empty string or in the set (http, https)")]
    UnsupportedScheme { scheme: String },

    #[error("invalid port \"{port}\" specified; must be a valid TCP/UDP port")]
    InvalidPort { port: u32 },

    #[error("invalid path provided; must not contain a query string")]
    PathWithQuery,

    #[error("invalid path provided; must not contain a uri fragment")]
    PathWithFragment,

    #[error("query string must not include a uri fragment")]
    QueryWithFragment,

    #[error("unsupported http method \"{method}\" provided")]
    InvalidMethod { method: String },

    #[error("the cookie name \"{name}\" contains invalid characters")]
    InvalidCookieName { name: String },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },
}

impl InvalidArgument {
    pub fn unsupported_scheme<S: ToString>(scheme: S) -> Self {
        Self::UnsupportedScheme { scheme: scheme.to_string() }
    }

    pub fn invalid_port(port: u32) -> Self {
        Self::InvalidPort { port }
    }

    pub fn invalid_method<S: ToString>(method: S) -> Self {
        Self::InvalidMethod { method: method.to_string() }
    }

    pub fn invalid_cookie_name<S: ToString>(name: S) -> Self {
        Self::InvalidCookieName { name: name.to_string() }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }
}

/// Failures of a [`Stream`](crate::protocol::Stream) operation.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("unable to open \"{locator}\" with mode \"{mode}\": {source}")]
    Open { locator: String, mode: String, source: io::Error },

    #[error("invalid stream mode \"{mode}\"")]
    InvalidMode { mode: String },

    #[error("no resource available; cannot {operation}")]
    Detached { operation: &'static str },

    #[error("stream is not readable")]
    NotReadable,

    #[error("stream is not writable")]
    NotWritable,

    #[error("stream is not seekable")]
    NotSeekable,

    #[error("uploaded file has already been moved")]
    AlreadyMoved,

    #[error("upload did not complete: {error}")]
    Upload { error: UploadError },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl StreamError {
    pub fn detached(operation: &'static str) -> Self {
        Self::Detached { operation }
    }

    pub fn invalid_mode<S: ToString>(mode: S) -> Self {
        Self::InvalidMode { mode: mode.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

/// A network-level failure during a request transfer. Never retried internally.
#[derive(Debug, Error)]
pub enum TransferError {
    #[error("invalid transfer url \"{url}\": {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("unsupported protocol \"{scheme}\" for this transport")]
    UnsupportedScheme { scheme: String },

    #[error("failed to connect to {host}:{port}: {source}")]
    Connect { host: String, port: u16, source: io::Error },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },

    #[error("invalid response: {source}")]
    Response {
        #[from]
        source: ParseError,
    },

    #[error("failed to encode request: {source}")]
    Request {
        #[from]
        source: SendError,
    },

    #[error("failed to decode {encoding} content: {source}")]
    Decode { encoding: String, source: io::Error },

    #[error("unable to read request body: {source}")]
    Body {
        #[from]
        source: StreamError,
    },
}

impl TransferError {
    pub fn invalid_url<U: ToString, S: ToString>(url: U, reason: S) -> Self {
        Self::InvalidUrl { url: url.to_string(), reason: reason.to_string() }
    }

    pub fn unsupported_scheme<S: ToString>(scheme: S) -> Self {
        Self::UnsupportedScheme { scheme: scheme.to_string() }
    }

    pub fn decode<S: ToString>(encoding: S, source: io::Error) -> Self {
        Self::Decode { encoding: encoding.to_string(), source }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

/// Errors raised while decoding a response from the wire.
#[derive(Error, Debug)]
pub enum ParseError {
    #[error("header size too large, current: {current_size} exceed the limit {max_size}")]
    TooLargeHeader { current_size: usize, max_size: usize },

    #[error("header number exceed the limit {max_num}")]
    TooManyHeaders { max_num: usize },

    #[error("invalid header: {reason}")]
    InvalidHeader { reason: String },

    #[error("invalid http version: {0:?}")]
    InvalidVersion(Option<u8>),

    #[error("invalid content-length header: {reason}")]
    InvalidContentLength { reason: String },

    #[error("invalid body: {reason}")]
    InvalidBody { reason: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ParseError {
    pub fn too_large_header(current_size: usize, max_size: usize) -> Self {
        Self::TooLargeHeader { current_size, max_size }
    }

    pub fn too_many_headers(max_num: usize) -> Self {
        Self::TooManyHeaders { max_num }
    }

    pub fn invalid_header<S: ToString>(str: S) -> Self {
        Self::InvalidHeader { reason: str.to_string() }
    }

    pub fn invalid_body<S: ToString>(str: S) -> Self {
        Self::InvalidBody { reason: str.to_string() }
    }

    pub fn invalid_content_length<S: ToString>(str: S) -> Self {
        Self::InvalidContentLength { reason: str.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}

/// Errors raised while encoding a message to the wire.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("unsupported http version: {version}")]
    UnsupportedVersion { version: String },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl SendError {
    pub fn unsupported_version<S: ToString>(version: S) -> Self {
        Self::UnsupportedVersion { version: version.to_string() }
    }

    pub fn io<E: Into<io::Error>>(e: E) -> Self {
        Self::Io { source: e.into() }
    }
}
