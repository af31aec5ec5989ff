//! An HTTP message object model with a small blocking client
//!
//! This crate provides the value types HTTP code passes around: URIs with nested query
//! parameters, header-carrying messages with stream bodies, client requests, server
//! responses with cookies, and uploaded files. Requests can be sent over a pluggable
//! transport; a blocking HTTP/1.1 transport over TCP is bundled.
//!
//! # Features
//!
//! - RFC 3986 URI parsing and normalization with `a[b][]=c` style query maps
//! - Case-insensitive, order-preserving headers and value-style `with_*` mutators
//! - Memory and file backed body streams
//! - Response helpers for caching headers, JSON bodies and `Set-Cookie` serialization
//! - Response decoding for length delimited, chunked and close delimited bodies
//! - `gzip`, `deflate`, `br` and `zstd` content decoding
//! - Structured logging through `tracing`
//!
//! # Example
//!
//! ```no_run
//! use micro_http_message::protocol::{HttpMessage, Request, TIMEOUT};
//! use tracing::{Level, error, info};
//! use tracing_subscriber::FmtSubscriber;
//!
//! let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
//! tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
//!
//! let mut request = Request::new("GET", "http://127.0.0.1:8080/users?page=1")
//!     .unwrap()
//!     .with_header("Accept", "application/json")
//!     .unwrap()
//!     .with_option(TIMEOUT, 5_i64);
//!
//! match request.send("", &["Accept-Encoding: gzip"]) {
//!     Ok(mut response) => info!(status = response.status_code(), body = %response.content(), "received"),
//!     Err(e) => error!(cause = %e, "request failed"),
//! }
//! ```
//!
//! # Architecture
//!
//! The crate is organized into several key modules:
//!
//! - [`protocol`]: URIs, messages, requests, responses, cookies, streams and errors
//! - [`codec`]: HTTP/1.x encoders and decoders over byte buffers
//! - [`transfer`]: the [`Transport`](transfer::Transport) seam, header capture and the TCP
//!   transport

pub mod codec;
pub mod protocol;
pub mod transfer;

mod utils;
pub(crate) use utils::{LAST_HTTP_DATE, ensure, http_date};
