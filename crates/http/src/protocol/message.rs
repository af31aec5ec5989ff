//! The header and body contract shared by requests and responses.
//!
//! [`Message`] holds the parts every HTTP message has: a protocol version, a
//! case-insensitive multi-valued header map and an owned [`Stream`] body. Types that wrap
//! a `Message` implement [`HttpMessage`] by exposing it, and inherit the whole header and
//! body API as provided methods.
//!
//! The `with_*` methods consume the message and return it changed. Since the body stream
//! is exclusively owned, a message cannot be aliased behind the caller's back.

use http::header::{HeaderMap, HeaderName, HeaderValue};

use crate::protocol::{InvalidArgument, Stream};

pub const DEFAULT_PROTOCOL_VERSION: &str = "1.1";

#[derive(Debug)]
pub struct Message {
    version: String,
    headers: HeaderMap,
    body: Stream,
}

impl Message {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(headers: HeaderMap, body: Stream) -> Self {
        Self { version: DEFAULT_PROTOCOL_VERSION.to_string(), headers, body }
    }
}

impl Default for Message {
    fn default() -> Self {
        Self::from_parts(HeaderMap::new(), Stream::memory())
    }
}

/// Header and body access for anything built around a [`Message`].
pub trait HttpMessage: Sized {
    fn message(&self) -> &Message;

    fn message_mut(&mut self) -> &mut Message;

    fn protocol_version(&self) -> &str {
        &self.message().version
    }

    /// Sets the protocol version; the value is not validated.
    #[must_use]
    fn with_protocol_version(mut self, version: impl Into<String>) -> Self {
        self.message_mut().version = version.into();
        self
    }

    fn headers(&self) -> &HeaderMap {
        &self.message().headers
    }

    fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.message_mut().headers
    }

    fn has_header(&self, name: &str) -> bool {
        self.headers().contains_key(name)
    }

    /// All values of `name` in insertion order; empty when absent.
    fn header(&self, name: &str) -> Vec<String> {
        self.headers()
            .get_all(name)
            .iter()
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .collect()
    }

    /// The values of `name` joined with `,`, or `None` when the header is absent.
    fn header_line(&self, name: &str) -> Option<String> {
        let values = self.header(name);
        (!values.is_empty()).then(|| values.join(","))
    }

    /// Replaces every value of `name` with `value`.
    fn with_header(mut self, name: &str, value: &str) -> Result<Self, InvalidArgument> {
        let (name, value) = header_pair(name, value)?;
        self.headers_mut().insert(name, value);
        Ok(self)
    }

    /// Adds `value` after the existing values of `name`.
    fn with_added_header(mut self, name: &str, value: &str) -> Result<Self, InvalidArgument> {
        let (name, value) = header_pair(name, value)?;
        self.headers_mut().append(name, value);
        Ok(self)
    }

    /// Replaces the headers named in `headers`; repeated names in the input are all kept.
    ///
    /// Nothing is changed when one of the pairs is invalid.
    fn with_headers<'a, I>(mut self, headers: I) -> Result<Self, InvalidArgument>
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let pairs = headers
            .into_iter()
            .map(|(name, value)| header_pair(name, value))
            .collect::<Result<Vec<_>, _>>()?;

        let map = self.headers_mut();
        for (name, _) in &pairs {
            map.remove(name);
        }
        for (name, value) in pairs {
            map.append(name, value);
        }

        Ok(self)
    }

    /// Removes every value of `name`; absent headers are not an error.
    #[must_use]
    fn without_header(mut self, name: &str) -> Self {
        self.headers_mut().remove(name);
        self
    }

    fn body(&self) -> &Stream {
        &self.message().body
    }

    fn body_mut(&mut self) -> &mut Stream {
        &mut self.message_mut().body
    }

    /// Replaces the body. The previous stream is dropped, which closes it; use
    /// [`replace_body`](HttpMessage::replace_body) to keep it open.
    #[must_use]
    fn with_body(mut self, body: Stream) -> Self {
        self.message_mut().body = body;
        self
    }

    /// Replaces the body and hands the previous stream back to the caller.
    fn replace_body(&mut self, body: Stream) -> Stream {
        std::mem::replace(&mut self.message_mut().body, body)
    }

    fn into_body(mut self) -> Stream {
        self.replace_body(Stream::memory())
    }
}

impl HttpMessage for Message {
    fn message(&self) -> &Message {
        self
    }

    fn message_mut(&mut self) -> &mut Message {
        self
    }
}

fn header_pair(name: &str, value: &str) -> Result<(HeaderName, HeaderValue), InvalidArgument> {
    let header_name = HeaderName::from_bytes(name.as_bytes())
        .map_err(|e| InvalidArgument::invalid_header(format!("name \"{name}\": {e}")))?;
    let header_value =
        HeaderValue::from_str(value).map_err(|e| InvalidArgument::invalid_header(format!("value of \"{name}\": {e}")))?;
    Ok((header_name, header_value))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let message = Message::new();

        assert_eq!(message.protocol_version(), "1.1");
        assert!(message.headers().is_empty());
        assert!(message.body().is_readable());
        assert!(message.body().is_writable());
        assert_eq!(message.body().size(), Some(0));
    }

    #[test]
    fn header_lookup_is_case_insensitive() {
        let message = Message::new().with_header("X-Trace-Id", "abc").unwrap();

        assert!(message.has_header("x-trace-id"));
        assert_eq!(message.header_line("X-TRACE-ID"), message.header_line("x-trace-id"));
        assert_eq!(message.header_line("x-trace-id"), Some("abc".to_string()));
    }

    #[test]
    fn added_headers_keep_order() {
        let message = Message::new()
            .with_added_header("Accept", "text/html")
            .unwrap()
            .with_added_header("accept", "application/json")
            .unwrap();

        assert_eq!(message.header("Accept"), vec!["text/html", "application/json"]);
        assert_eq!(message.header_line("accept").as_deref(), Some("text/html,application/json"));
    }

    #[test]
    fn with_header_replaces_all_values() {
        let message = Message::new()
            .with_added_header("Accept", "a")
            .unwrap()
            .with_added_header("Accept", "b")
            .unwrap()
            .with_header("ACCEPT", "c")
            .unwrap();

        assert_eq!(message.header("accept"), vec!["c"]);
    }

    #[test]
    fn absent_header_is_distinct_from_empty() {
        let message = Message::new().with_header("X-Empty", "").unwrap();

        assert_eq!(message.header_line("x-empty"), Some(String::new()));
        assert_eq!(message.header_line("x-missing"), None);
        assert!(message.header("x-missing").is_empty());
    }

    #[test]
    fn without_header_is_a_noop_when_absent() {
        let message = Message::new().with_header("Host", "example.com").unwrap();

        let message = message.without_header("x-missing").without_header("HOST");
        assert!(!message.has_header("host"));
    }

    #[test]
    fn with_headers_replaces_named_headers_only() {
        let message = Message::new()
            .with_header("Accept", "old")
            .unwrap()
            .with_header("Host", "example.com")
            .unwrap()
            .with_headers([("accept", "a"), ("Accept", "b")])
            .unwrap();

        assert_eq!(message.header("accept"), vec!["a", "b"]);
        assert_eq!(message.header_line("host").as_deref(), Some("example.com"));
    }

    #[test]
    fn invalid_headers_are_rejected() {
        assert!(matches!(Message::new().with_header("bad name", "x"), Err(InvalidArgument::InvalidHeader { .. })));
        assert!(matches!(Message::new().with_header("x-ok", "line\nbreak"), Err(InvalidArgument::InvalidHeader { .. })));
        assert!(matches!(
            Message::new().with_headers([("x-ok", "1"), ("bad:name", "2")]),
            Err(InvalidArgument::InvalidHeader { .. })
        ));
    }

    #[test]
    fn protocol_version_is_free_form() {
        let message = Message::new().with_protocol_version("2");
        assert_eq!(message.protocol_version(), "2");
    }

    #[test]
    fn body_replacement() {
        let mut message = Message::new().with_body(Stream::from_bytes("first"));

        let mut previous = message.replace_body(Stream::from_bytes("second"));
        assert_eq!(previous.to_string_lossy(), "first");
        assert!(!previous.is_detached());

        assert_eq!(message.body_mut().to_string_lossy(), "second");
        assert_eq!(message.into_body().to_string_lossy(), "second");
    }
}
