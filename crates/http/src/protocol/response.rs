//! Responses: status taxonomy, content, caching headers and cookies.
//!
//! A [`Response`] is either reconstructed by the transfer pipeline from what a server
//! sent, or built here and serialized with [`Response::to_bytes`].
//!
//! # Example
//!
//! ```
//! use micro_http_message::protocol::{HttpMessage, Response};
//!
//! let mut response = Response::new(200)
//!     .with_content("hello world")
//!     .with_content_type("text/plain")
//!     .unwrap()
//!     .with_cache_control("public")
//!     .unwrap()
//!     .with_max_age(60);
//!
//! assert_eq!(response.header_line("cache-control").as_deref(), Some("public,max-age=60"));
//! assert!(response.to_wire_string().unwrap().starts_with("HTTP/1.1 200 OK\r\n"));
//! ```

use std::time::SystemTime;

use bytes::{Bytes, BytesMut};
use http::StatusCode;
use http::header::{self, HeaderMap, HeaderName, HeaderValue};
use indexmap::IndexMap;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::codec::Encoder;

use crate::codec::ResponseEncoder;
use crate::http_date;
use crate::protocol::{Cookie, HttpMessage, InvalidArgument, Message, ResponseHead, SendError, Stream, parse_version};

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";

/// Headers that describe the content and are dropped by [`Response::with_not_modified`].
const CONTENT_HEADERS: [&str; 6] = ["allow", "content-encoding", "content-language", "content-length", "content-md5", "content-type"];

#[derive(Debug)]
pub struct Response {
    status: u16,
    reason: String,
    message: Message,
    cookies: IndexMap<String, Cookie>,
}

impl Response {
    /// An empty response with the canonical reason phrase of `status`.
    pub fn new(status: u16) -> Self {
        Self::from_parts(status, HeaderMap::new(), Stream::memory())
    }

    pub fn from_parts(status: u16, headers: HeaderMap, body: Stream) -> Self {
        Self { status, reason: canonical_reason(status).to_string(), message: Message::from_parts(headers, body), cookies: IndexMap::new() }
    }

    /// A response whose body is `value` serialized as JSON.
    pub fn json<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
        Ok(Self::from_parts(200, headers, Stream::from_bytes(body)))
    }

    /// Deserializes the whole body as JSON.
    pub fn to_json<T: DeserializeOwned>(&mut self) -> Result<T, serde_json::Error> {
        serde_json::from_str(&self.content())
    }

    pub fn status_code(&self) -> u16 {
        self.status
    }

    pub fn reason_phrase(&self) -> &str {
        &self.reason
    }

    /// Sets the status; without a `reason` the canonical phrase (or an empty one) is used.
    #[must_use]
    pub fn with_status(mut self, status: u16, reason: Option<&str>) -> Self {
        self.status = status;
        self.reason = reason.unwrap_or_else(|| canonical_reason(status)).to_string();
        self
    }

    /// `true` for codes outside 100..=599 or without a registered reason phrase.
    pub fn is_invalid_status_code(&self) -> bool {
        !(100..600).contains(&self.status) || canonical_reason(self.status).is_empty()
    }

    pub fn is_informational(&self) -> bool {
        (100..200).contains(&self.status)
    }

    pub fn is_successful(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn is_redirection(&self) -> bool {
        (300..400).contains(&self.status)
    }

    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.status)
    }

    pub fn is_server_error(&self) -> bool {
        (500..600).contains(&self.status)
    }

    pub fn is_ok(&self) -> bool {
        self.status == 200
    }

    pub fn is_forbidden(&self) -> bool {
        self.status == 403
    }

    pub fn is_not_found(&self) -> bool {
        self.status == 404
    }

    /// `true` for statuses that never carry content (204 and 304).
    pub fn is_empty(&self) -> bool {
        matches!(self.status, 204 | 304)
    }

    /// Replaces the body with a fresh in-memory stream holding `content`.
    #[must_use]
    pub fn with_content(self, content: impl Into<Vec<u8>>) -> Self {
        self.with_body(Stream::from_bytes(content))
    }

    /// The whole body as text; failures read as an empty string.
    pub fn content(&mut self) -> String {
        self.body_mut().to_string_lossy()
    }

    pub fn with_content_type(self, content_type: &str) -> Result<Self, InvalidArgument> {
        self.with_header(header::CONTENT_TYPE.as_str(), content_type)
    }

    #[must_use]
    pub fn with_mime(mut self, mime: &mime::Mime) -> Self {
        if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
            self.headers_mut().insert(header::CONTENT_TYPE, value);
        }
        self
    }

    pub fn content_type(&self) -> Option<String> {
        self.header_line(header::CONTENT_TYPE.as_str())
    }

    pub fn mime(&self) -> Option<mime::Mime> {
        self.content_type()?.parse().ok()
    }

    /// Sets `Cache-Control`, replacing any previous directives.
    pub fn with_cache_control(self, directive: &str) -> Result<Self, InvalidArgument> {
        self.with_header(header::CACHE_CONTROL.as_str(), directive)
    }

    /// Appends `max-age=<seconds>` to the current `Cache-Control` value.
    #[must_use]
    pub fn with_max_age(mut self, seconds: u64) -> Self {
        let directive = format!("max-age={seconds}");
        let mut value = BytesMut::new();

        for existing in self.headers().get_all(header::CACHE_CONTROL) {
            if !value.is_empty() {
                value.extend_from_slice(b",");
            }
            value.extend_from_slice(existing.as_bytes());
        }
        if !value.is_empty() {
            value.extend_from_slice(b",");
        }
        value.extend_from_slice(directive.as_bytes());

        if let Ok(value) = HeaderValue::from_maybe_shared(value.freeze()) {
            self.headers_mut().insert(header::CACHE_CONTROL, value);
        }
        self
    }

    /// Sets `Expires` and appends the matching `max-age` (zero once the date has passed).
    #[must_use]
    pub fn with_expires(self, expires: SystemTime) -> Self {
        let max_age = expires.duration_since(SystemTime::now()).map(|d| d.as_secs()).unwrap_or(0);
        self.with_date_header(header::EXPIRES, expires).with_max_age(max_age)
    }

    pub fn expires(&self) -> Option<SystemTime> {
        self.date_header(&header::EXPIRES)
    }

    #[must_use]
    pub fn with_last_modified(self, last_modified: SystemTime) -> Self {
        self.with_date_header(header::LAST_MODIFIED, last_modified)
    }

    pub fn last_modified(&self) -> Option<SystemTime> {
        self.date_header(&header::LAST_MODIFIED)
    }

    /// Turns the response into a `304 Not Modified`.
    ///
    /// The body is emptied and the content headers are removed; caching headers stay.
    #[must_use]
    pub fn with_not_modified(mut self) -> Self {
        for name in CONTENT_HEADERS {
            self.headers_mut().remove(name);
        }
        self.with_status(304, None).with_body(Stream::memory())
    }

    /// Registers a cookie with only a name and a value.
    pub fn with_cookie(self, name: &str, value: &str) -> Result<Self, InvalidArgument> {
        Ok(self.with_cookie_object(Cookie::new(name, value)?))
    }

    /// Registers `cookie`, replacing a previous cookie of the same name.
    #[must_use]
    pub fn with_cookie_object(mut self, cookie: Cookie) -> Self {
        self.cookies.insert(cookie.name().to_string(), cookie);
        self
    }

    #[must_use]
    pub fn with_cookie_params(self, cookies: impl IntoIterator<Item = Cookie>) -> Self {
        cookies.into_iter().fold(self, Response::with_cookie_object)
    }

    pub fn cookies(&self) -> impl Iterator<Item = &Cookie> {
        self.cookies.values()
    }

    pub fn cookie(&self, name: &str) -> Option<&Cookie> {
        self.cookies.get(name)
    }

    /// The status line, headers, one `Set-Cookie` line per cookie, and the body.
    ///
    /// # Errors
    ///
    /// Returns [`SendError::UnsupportedVersion`] for protocol versions other than 1.0
    /// and 1.1, and an I/O error when the body cannot be read.
    pub fn to_bytes(&mut self) -> Result<Bytes, SendError> {
        let version = parse_version(self.protocol_version()).ok_or_else(|| SendError::unsupported_version(self.protocol_version()))?;

        let mut head = ResponseHead::new(self.status, self.reason.clone());
        head.version = version;
        head.headers = self
            .headers()
            .iter()
            .map(|(name, value)| (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned()))
            .chain(self.cookies.values().map(|cookie| (header::SET_COOKIE.as_str().to_string(), cookie.to_set_cookie())))
            .collect();

        let body = self.body_mut();
        body.rewind().map_err(|e| SendError::io(std::io::Error::other(e)))?;
        let body = body.contents().map_err(|e| SendError::io(std::io::Error::other(e)))?;

        let mut dst = BytesMut::new();
        ResponseEncoder::new().encode((head, body), &mut dst)?;
        Ok(dst.freeze())
    }

    pub fn to_wire_string(&mut self) -> Result<String, SendError> {
        self.to_bytes().map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    fn with_date_header(mut self, name: HeaderName, at: SystemTime) -> Self {
        if let Ok(value) = HeaderValue::from_str(&http_date(at)) {
            self.headers_mut().insert(name, value);
        }
        self
    }

    fn date_header(&self, name: &HeaderName) -> Option<SystemTime> {
        let value = self.headers().get(name)?.to_str().ok()?;
        httpdate::parse_http_date(value).ok()
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new(200)
    }
}

impl HttpMessage for Response {
    fn message(&self) -> &Message {
        &self.message
    }

    fn message_mut(&mut self) -> &mut Message {
        &mut self.message
    }
}

fn canonical_reason(status: u16) -> &'static str {
    StatusCode::from_u16(status).ok().and_then(|code| code.canonical_reason()).unwrap_or("")
}
