//! Outbound client requests.
//!
//! A [`Request`] is an immutable-by-value description of a call: method, target [`Uri`],
//! headers and body (through [`HttpMessage`]) plus [`TransferOptions`]. Sending it hands a
//! [`PreparedTransfer`] to a [`Transport`] and turns the raw answer back into a
//! [`Response`].
//!
//! # Example
//!
//! ```no_run
//! use micro_http_message::protocol::{HttpMessage, Request};
//!
//! let mut request = Request::new("get", "http://127.0.0.1:8080/users?page=2")?
//!     .with_header("Accept", "application/json")?;
//! let mut response = request.send("", &["X-Trace-Id: 42"])?;
//! println!("{} {}", response.status_code(), response.content());
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::time::Instant;

use bytes::Bytes;
use http::Method;
use serde::Serialize;
use tracing::{debug, error, info, trace};

use crate::ensure;
use crate::protocol::{
    BASIC_AUTH, DEFAULT_USER_AGENT, ENCODING, HttpError, HttpMessage, InvalidArgument, Message, OptionValue,
    QueryMap, REFERRER, Response, TransferError, TransferOptions, USER_AGENT, Uri,
};
use crate::transfer::{PreparedTransfer, TcpTransport, Transport, reconstruct};

const VALID_METHODS: [&str; 7] = ["DELETE", "GET", "HEAD", "OPTIONS", "PATCH", "POST", "PUT"];

/// Methods whose payload travels in the request body instead of the query string.
const BODY_METHODS: [&str; 4] = ["PUT", "POST", "DELETE", "PATCH"];

#[derive(Debug)]
pub struct Request {
    method: Method,
    uri: Uri,
    options: TransferOptions,
    message: Message,
}

impl Request {
    /// Creates a request; the method is matched case-insensitively against
    /// `DELETE GET HEAD OPTIONS PATCH POST PUT`.
    ///
    /// # Errors
    ///
    /// Returns an error for unknown methods and malformed URIs.
    pub fn new(method: &str, uri: &str) -> Result<Request, HttpError> {
        let method = validate_method(method)?;
        let uri = Uri::parse(uri)?;
        Ok(Request { method, uri, options: TransferOptions::new(), message: Message::new() })
    }

    pub fn from_uri(method: &str, uri: Uri) -> Result<Request, InvalidArgument> {
        let method = validate_method(method)?;
        Ok(Request { method, uri, options: TransferOptions::new(), message: Message::new() })
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn with_method(mut self, method: &str) -> Result<Self, InvalidArgument> {
        self.method = validate_method(method)?;
        Ok(self)
    }

    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    #[must_use]
    pub fn with_uri(mut self, uri: Uri) -> Self {
        self.uri = uri;
        self
    }

    /// The path of the target URI.
    pub fn request_target(&self) -> &str {
        self.uri.path()
    }

    /// Replaces the path of the target URI.
    pub fn with_request_target(mut self, target: &str) -> Result<Self, InvalidArgument> {
        self.uri = self.uri.with_path(target)?;
        Ok(self)
    }

    pub fn options(&self) -> &TransferOptions {
        &self.options
    }

    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<OptionValue>) -> Self {
        self.options.set(key, value);
        self
    }

    /// Merges `options` into the current ones; keys present in both take the new value.
    #[must_use]
    pub fn with_options(mut self, options: TransferOptions) -> Self {
        self.options.merge(options);
        self
    }

    #[must_use]
    pub fn with_basic_authentication(self, username: &str, password: &str) -> Self {
        self.with_option(BASIC_AUTH, OptionValue::Credentials { username: username.into(), password: password.into() })
    }

    #[must_use]
    pub fn with_referrer(self, referrer: &str) -> Self {
        self.with_option(REFERRER, referrer)
    }

    /// Resolves everything a transport needs, without touching the network.
    ///
    /// * For `PUT`, `POST`, `DELETE` and `PATCH` the payload becomes the body; when it is
    ///   empty the message body is sent instead.
    /// * For every other method a non-empty payload is appended to the URL, after `&` when
    ///   the URL already has a query and after `?` otherwise.
    /// * `Expect` lines are dropped. An `Accept-Encoding` line is removed from the header
    ///   list and its value becomes the `encoding` option (empty when absent, which asks
    ///   for every coding the transport supports).
    /// * The default user agent is filled in when none is configured.
    ///
    /// The request's own options are left untouched.
    pub fn prepare(&mut self, payload: impl Into<Payload>, header_lines: &[&str]) -> Result<PreparedTransfer, TransferError> {
        let payload = payload.into();
        let mut url = self.uri.to_string();

        let body = if BODY_METHODS.contains(&self.method.as_str()) {
            if payload.is_empty() { self.message_body()? } else { payload.into_bytes() }
        } else {
            if !payload.is_empty() {
                url = append_query(&url, &String::from_utf8_lossy(payload.as_bytes()));
            }
            Bytes::new()
        };

        let mut headers = Vec::with_capacity(self.headers().len() + header_lines.len());
        for (name, value) in self.headers() {
            headers.push((name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned()));
        }

        let mut encoding = String::new();
        for line in header_lines {
            let lower = line.to_ascii_lowercase();
            if lower.starts_with("expect:") {
                continue;
            }
            if lower.starts_with("accept-encoding:") {
                encoding = line["accept-encoding:".len()..].trim().to_string();
                continue;
            }
            match line.split_once(':') {
                Some((name, value)) => headers.push((name.trim().to_string(), value.trim().to_string())),
                None => trace!(line, "skip header line without colon"),
            }
        }
        headers.retain(|(name, _)| !name.eq_ignore_ascii_case("expect") && !name.eq_ignore_ascii_case("accept-encoding"));

        let mut options = self.options.clone();
        if !options.contains(USER_AGENT) {
            options.set(USER_AGENT, DEFAULT_USER_AGENT);
        }
        options.set(ENCODING, encoding);

        Ok(PreparedTransfer { method: self.method.clone(), url, headers, body, options })
    }

    /// Sends the request over the bundled [`TcpTransport`].
    ///
    /// # Errors
    ///
    /// Returns [`TransferError`] for any network-level failure. Error statuses from the
    /// server are not errors.
    pub fn send(&mut self, payload: impl Into<Payload>, header_lines: &[&str]) -> Result<Response, TransferError> {
        self.send_with(&TcpTransport::default(), payload, header_lines)
    }

    pub fn send_with<T: Transport + ?Sized>(
        &mut self,
        transport: &T,
        payload: impl Into<Payload>,
        header_lines: &[&str],
    ) -> Result<Response, TransferError> {
        let transfer = self.prepare(payload, header_lines)?;
        let started = Instant::now();
        debug!(method = %transfer.method, url = %transfer.url, body_size = transfer.body.len(), "start transfer");

        let raw = transport.execute(&transfer).inspect_err(|e| {
            error!(method = %transfer.method, url = %transfer.url, "transfer failed: {e}");
        })?;

        let response = reconstruct(raw)?;
        info!(
            method = %transfer.method,
            url = %transfer.url,
            status = response.status_code(),
            elapsed = ?started.elapsed(),
            "transfer finished"
        );
        Ok(response)
    }

    fn message_body(&mut self) -> Result<Bytes, TransferError> {
        let body = self.body_mut();
        if body.is_detached() || body.size() == Some(0) {
            return Ok(Bytes::new());
        }
        body.rewind()?;
        Ok(body.contents()?)
    }
}

impl HttpMessage for Request {
    fn message(&self) -> &Message {
        &self.message
    }

    fn message_mut(&mut self) -> &mut Message {
        &mut self.message
    }
}

/// Appends `query` to the query component of `url`, keeping any fragment last.
fn append_query(url: &str, query: &str) -> String {
    let (before, fragment) = url.split_once('#').map_or((url, None), |(before, fragment)| (before, Some(fragment)));
    let separator = if before.contains('?') { '&' } else { '?' };

    match fragment {
        Some(fragment) => format!("{before}{separator}{query}#{fragment}"),
        None => format!("{before}{separator}{query}"),
    }
}

fn validate_method(method: &str) -> Result<Method, InvalidArgument> {
    let upper = method.to_ascii_uppercase();
    ensure!(VALID_METHODS.contains(&upper.as_str()), InvalidArgument::invalid_method(method));
    Method::from_bytes(upper.as_bytes()).map_err(|_| InvalidArgument::invalid_method(method))
}

/// Data handed to [`Request::send`]: already-encoded bytes, either sent as the body or
/// appended to the query string depending on the method.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Payload(Bytes);

impl Payload {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn raw(data: impl Into<Bytes>) -> Self {
        Self(data.into())
    }

    /// Form-encodes a nested parameter map, `a[b]=1&c=2`.
    pub fn query(query: &QueryMap) -> Self {
        Self(Bytes::from(query.build_form()))
    }

    /// Form-encodes any flat serializable value.
    pub fn form<T: Serialize + ?Sized>(value: &T) -> Result<Self, serde_urlencoded::ser::Error> {
        serde_urlencoded::to_string(value).map(|encoded| Self(Bytes::from(encoded)))
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }
}

impl From<&str> for Payload {
    fn from(value: &str) -> Self {
        Self(Bytes::copy_from_slice(value.as_bytes()))
    }
}

impl From<String> for Payload {
    fn from(value: String) -> Self {
        Self(Bytes::from(value))
    }
}

impl From<Bytes> for Payload {
    fn from(value: Bytes) -> Self {
        Self(value)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(value: Vec<u8>) -> Self {
        Self(Bytes::from(value))
    }
}

impl From<&QueryMap> for Payload {
    fn from(value: &QueryMap) -> Self {
        Self::query(value)
    }
}

impl From<QueryMap> for Payload {
    fn from(value: QueryMap) -> Self {
        Self::query(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Stream, TIMEOUT};
    use crate::transfer::{MockTransport, RawResponse};
    use std::time::Duration;

    fn header<'a>(transfer: &'a PreparedTransfer, name: &str) -> Option<&'a str> {
        transfer.headers.iter().find(|(n, _)| n.eq_ignore_ascii_case(name)).map(|(_, v)| v.as_str())
    }

    #[test]
    fn method_is_normalized() {
        let request = Request::new("post", "http://example.com").unwrap();
        assert_eq!(request.method(), &Method::POST);

        let request = request.with_method("Patch").unwrap();
        assert_eq!(request.method(), &Method::PATCH);
    }

    #[test]
    fn unknown_methods_are_rejected() {
        let err = Request::new("FETCH", "http://example.com").unwrap_err();
        assert!(matches!(err, HttpError::InvalidArgument { source: InvalidArgument::InvalidMethod { .. } }));

        let request = Request::new("GET", "/").unwrap();
        assert_eq!(request.with_method("TRACE").unwrap_err(), InvalidArgument::invalid_method("TRACE"));
    }

    #[test]
    fn request_target_is_the_path() {
        let request = Request::new("GET", "http://example.com/users?page=1").unwrap();
        assert_eq!(request.request_target(), "/users");

        let request = request.with_request_target("/groups").unwrap();
        assert_eq!(request.uri().to_string(), "http://example.com/groups?page=1");
        assert!(request.with_request_target("/a?b").is_err());
    }

    #[test]
    fn options_merge_with_new_values_winning() {
        let request = Request::new("GET", "http://example.com")
            .unwrap()
            .with_option(TIMEOUT, 30_i64)
            .with_option(USER_AGENT, "first")
            .with_options([(TIMEOUT, OptionValue::from(5_i64))].into_iter().collect())
            .with_basic_authentication("jan", "secret")
            .with_referrer("http://example.com/from");

        assert_eq!(request.options().timeout(), Some(Duration::from_secs(5)));
        assert_eq!(request.options().user_agent(), Some("first"));
        assert_eq!(request.options().basic_auth(), Some(("jan", "secret")));
        assert_eq!(request.options().referrer(), Some("http://example.com/from"));
    }

    #[test]
    fn get_payload_goes_to_the_query_string() {
        let mut request = Request::new("GET", "http://example.com/search").unwrap();
        let transfer = request.prepare("q=rust", &[]).unwrap();
        assert_eq!(transfer.url, "http://example.com/search?q=rust");
        assert!(transfer.body.is_empty());

        let mut request = Request::new("GET", "http://example.com/search?page=2").unwrap();
        let transfer = request.prepare("q=rust", &[]).unwrap();
        assert_eq!(transfer.url, "http://example.com/search?page=2&q=rust");
    }

    #[test]
    fn get_payload_is_placed_before_the_fragment() {
        let mut request = Request::new("GET", "http://example.com/p#top").unwrap();
        let transfer = request.prepare("q=1", &[]).unwrap();
        assert_eq!(transfer.url, "http://example.com/p?q=1#top");

        let parsed = Uri::parse(&transfer.url).unwrap();
        assert_eq!(parsed.query().get_value("q"), Some("1"));
        assert_eq!(parsed.fragment(), "top");

        let mut request = Request::new("GET", "http://example.com/p?a=1#top").unwrap();
        assert_eq!(request.prepare("q=1", &[]).unwrap().url, "http://example.com/p?a=1&q=1#top");
    }

    #[test]
    fn query_map_payload_is_form_encoded() {
        let mut params = QueryMap::new();
        params.insert("name", "jan huang");
        params.insert("tags", QueryMap::parse("0=a&1=b"));

        let mut request = Request::new("POST", "http://example.com/users").unwrap();
        let transfer = request.prepare(&params, &[]).unwrap();
        assert_eq!(transfer.body, Bytes::from("name=jan+huang&tags%5B0%5D=a&tags%5B1%5D=b"));
        assert_eq!(transfer.url, "http://example.com/users");
    }

    #[test]
    fn empty_payload_sends_the_message_body() {
        let mut request = Request::new("PUT", "http://example.com/doc")
            .unwrap()
            .with_body(Stream::from_bytes("stored document"));

        let transfer = request.prepare("", &[]).unwrap();
        assert_eq!(transfer.body, Bytes::from("stored document"));

        let transfer = request.prepare("override", &[]).unwrap();
        assert_eq!(transfer.body, Bytes::from("override"));
    }

    #[test]
    fn header_lines_are_filtered() {
        let mut request = Request::new("POST", "http://example.com").unwrap().with_header("X-Message", "1").unwrap();

        let transfer = request
            .prepare("a=1", &["Expect: 100-continue", "Accept-Encoding: gzip", "X-Line: 2", "no colon here"])
            .unwrap();

        assert_eq!(header(&transfer, "x-message"), Some("1"));
        assert_eq!(header(&transfer, "x-line"), Some("2"));
        assert_eq!(header(&transfer, "expect"), None);
        assert_eq!(header(&transfer, "accept-encoding"), None);
        assert_eq!(transfer.headers.len(), 2);
        assert_eq!(transfer.options.encoding(), Some("gzip"));
    }

    #[test]
    fn default_user_agent_is_filled_in_on_a_copy() {
        let mut request = Request::new("GET", "http://example.com").unwrap();
        let transfer = request.prepare("", &[]).unwrap();

        assert_eq!(transfer.options.user_agent(), Some(DEFAULT_USER_AGENT));
        assert_eq!(transfer.options.encoding(), Some(""));
        assert!(request.options().is_empty());
    }

    #[test]
    fn send_with_reconstructs_the_response() {
        let mut transport = MockTransport::new();
        transport
            .expect_execute()
            .withf(|transfer| transfer.method == Method::DELETE && transfer.url == "http://example.com/users/1")
            .times(1)
            .returning(|_| {
                Ok(RawResponse {
                    status: 202,
                    header_lines: vec!["HTTP/1.1 202 Accepted".into(), "X-Job: 7".into(), "x-job: 8".into()],
                    body: Bytes::from("queued"),
                })
            });

        let mut request = Request::new("DELETE", "http://example.com/users/1").unwrap();
        let mut response = request.send_with(&transport, "", &[]).unwrap();

        assert_eq!(response.status_code(), 202);
        assert_eq!(response.reason_phrase(), "Accepted");
        assert_eq!(response.header_line("x-job").as_deref(), Some("7,8"));
        assert_eq!(response.content(), "queued");
    }

    #[test]
    fn transport_errors_are_propagated() {
        let mut transport = MockTransport::new();
        transport.expect_execute().returning(|_| Err(TransferError::unsupported_scheme("https")));

        let mut request = Request::new("GET", "https://example.com").unwrap();
        let err = request.send_with(&transport, "", &[]).unwrap_err();
        assert!(matches!(err, TransferError::UnsupportedScheme { .. }));
    }
}
