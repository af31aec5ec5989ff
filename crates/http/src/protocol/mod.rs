//! Core HTTP message abstractions.
//!
//! This module holds the object model shared by clients and servers: URIs with their
//! nested query parameters, header-carrying messages with stream bodies, client requests
//! and server responses.
//!
//! # Components
//!
//! - **Addressing** ([`Uri`], [`QueryMap`]): parsing, normalization and serialization of
//!   request targets
//! - **Messages** ([`Message`], [`HttpMessage`]): protocol version, case-insensitive
//!   headers and a [`Stream`] body, with value-style `with_*` mutators
//! - **Requests** ([`Request`], [`TransferOptions`], [`Payload`]): outbound calls handed to
//!   a [`Transport`](crate::transfer::Transport)
//! - **Responses** ([`Response`], [`Cookie`]): status handling, caching headers, cookies and
//!   wire serialization
//! - **Uploads** ([`UploadedFile`]): files received by a server
//! - **Wire heads** ([`RequestHead`], [`ResponseHead`], [`Frame`]): the units exchanged with
//!   the [`codec`](crate::codec) module
//! - **Error Handling** ([`error`]): one error enum per failure domain
//!
//! Every `with_*` mutator consumes the receiver and returns the modified value, or an
//! error that leaves nothing half-applied.

mod cookie;
pub mod error;
mod head;
mod message;
mod options;
mod payload;
pub(crate) mod query;
mod request;
mod response;
mod stream;
mod upload;
mod uri;

pub use cookie::{Cookie, CookieBuilder};
pub use error::{HttpError, InvalidArgument, ParseError, SendError, StreamError, TransferError, UriError};
pub use head::{RequestHead, ResponseHead};
pub(crate) use head::{parse_version, version_str};
pub use message::{DEFAULT_PROTOCOL_VERSION, HttpMessage, Message};
pub use options::{
    BASIC_AUTH, CONNECT_TIMEOUT, DEFAULT_USER_AGENT, ENCODING, OptionValue, REFERRER, TIMEOUT, TransferOptions,
    USER_AGENT,
};
pub use payload::{Frame, PayloadItem, PayloadSize};
pub use query::{QueryMap, QueryValue};
pub use request::{Payload, Request};
pub use response::{JSON_CONTENT_TYPE, Response};
pub use stream::{Handle, Stream, StreamMetadata};
pub use upload::{UploadError, UploadedFile};
pub use uri::Uri;
