//! The URI value type.
//!
//! A [`Uri`] is parsed from its wire form with [`Uri::parse`] and is immutable afterwards:
//! every `with_*` method returns a new value with one component changed, leaving the
//! receiver untouched. The serialized form is computed lazily and memoized per value.
//!
//! # Normalization
//!
//! - the scheme is lower-cased and restricted to `http`, `https` or empty
//! - when a scheme is present and no port is given, the port defaults to the scheme's
//!   standard port (80 or 443)
//! - path and fragment characters outside their allowed sets are percent-encoded, and a
//!   `%` that does not start a valid escape is itself encoded
//! - the query is held as a structured [`QueryMap`] and rebuilt on serialization

use std::fmt;
use std::str::FromStr;

use once_cell::sync::OnceCell;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use serde::de::DeserializeOwned;

use crate::ensure;
use crate::protocol::{InvalidArgument, QueryMap, UriError};

/// Schemes accepted by [`Uri`] with their standard ports.
const ALLOWED_SCHEMES: [(&str, u16); 2] = [("http", 80), ("https", 443)];

const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_').remove(b'~');

const PATH_ENCODE_SET: &AsciiSet = &UNRESERVED
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b',')
    .remove(b'/')
    .remove(b';');

const FRAGMENT_ENCODE_SET: &AsciiSet = &UNRESERVED
    .remove(b'!')
    .remove(b'$')
    .remove(b'&')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'*')
    .remove(b'+')
    .remove(b',')
    .remove(b';')
    .remove(b'=')
    .remove(b':')
    .remove(b'@')
    .remove(b'/')
    .remove(b'?');

#[derive(Debug, Clone, Default)]
pub struct Uri {
    scheme: String,
    user_info: String,
    host: String,
    port: Option<u16>,
    path: String,
    query: QueryMap,
    fragment: String,
    serialized: OnceCell<String>,
}

impl Uri {
    /// Parses `[scheme ":"] ["//" authority] path ["?" query] ["#" fragment]`.
    ///
    /// # Errors
    ///
    /// Returns [`UriError::Malformed`] when the string cannot be decomposed, and
    /// [`UriError::InvalidArgument`] when the scheme is not one of `http`/`https`.
    pub fn parse(raw: &str) -> Result<Uri, UriError> {
        let (rest, fragment) = split_off(raw, '#');
        let (rest, query) = split_off(rest, '?');
        let (scheme, rest) = split_scheme(rest)?;

        let mut uri = Uri { scheme: filter_scheme(scheme)?, ..Uri::default() };

        let path = match rest.strip_prefix("//") {
            Some(after) => {
                let end = after.find('/').unwrap_or(after.len());
                uri.parse_authority(&after[..end])?;
                let path = &after[end..];
                if path.is_empty() { "/" } else { path }
            }
            None => rest,
        };

        if uri.port.is_none() {
            uri.port = default_port(&uri.scheme);
        }

        uri.path = encode_preserving_escapes(path, PATH_ENCODE_SET);
        uri.query = query.map(QueryMap::parse).unwrap_or_default();
        uri.fragment = fragment.map(|f| encode_preserving_escapes(f, FRAGMENT_ENCODE_SET)).unwrap_or_default();

        Ok(uri)
    }

    fn parse_authority(&mut self, authority: &str) -> Result<(), UriError> {
        let host_port = match authority.rsplit_once('@') {
            Some((user_info, host_port)) => {
                self.user_info = user_info.to_string();
                host_port
            }
            None => authority,
        };

        let (host, port) = if host_port.starts_with('[') {
            let close = host_port.find(']').ok_or_else(|| UriError::malformed("unterminated ipv6 host"))?;
            let tail = &host_port[close + 1..];
            let port = match tail {
                "" => None,
                tail => Some(tail.strip_prefix(':').ok_or_else(|| UriError::malformed("unexpected data after ipv6 host"))?),
            };
            (&host_port[..=close], port)
        } else {
            match host_port.split_once(':') {
                Some((host, port)) => (host, Some(port)),
                None => (host_port, None),
            }
        };

        ensure!(!host.is_empty(), UriError::malformed("empty host after \"//\""));
        self.host = host.to_string();

        self.port = match port {
            None | Some("") => None,
            Some(port) => {
                let port = port
                    .parse::<u16>()
                    .map_err(|_| UriError::malformed(format!("invalid port \"{port}\"")))?;
                ensure!(port != 0, UriError::malformed("port 0 is not a valid port"));
                Some(port)
            }
        };

        Ok(())
    }

    pub fn scheme(&self) -> &str {
        &self.scheme
    }

    pub fn user_info(&self) -> &str {
        &self.user_info
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> &QueryMap {
        &self.query
    }

    /// The query rebuilt from its structured form.
    pub fn query_string(&self) -> String {
        self.query.build()
    }

    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    /// `[user-info@]host[:port]`, empty when there is no host.
    ///
    /// The port is left out when it is the standard port of the scheme.
    pub fn authority(&self) -> String {
        if self.host.is_empty() {
            return String::new();
        }

        let mut authority = String::with_capacity(self.user_info.len() + self.host.len() + 7);
        if !self.user_info.is_empty() {
            authority.push_str(&self.user_info);
            authority.push('@');
        }
        authority.push_str(&self.host);

        if let Some(port) = self.port.filter(|&port| Some(port) != default_port(&self.scheme)) {
            authority.push(':');
            authority.push_str(&port.to_string());
        }

        authority
    }

    /// Decodes the structured query into `T`.
    ///
    /// # Errors
    ///
    /// Returns the `serde_qs` error when the query does not fit `T`.
    pub fn query_as<T: DeserializeOwned>(&self) -> Result<T, serde_qs::Error> {
        serde_qs::from_str(&self.query.build_bracketed())
    }

    /// Returns a copy with the scheme replaced.
    ///
    /// A trailing `:` or `://` is stripped and the scheme is lower-cased.
    pub fn with_scheme(&self, scheme: &str) -> Result<Uri, InvalidArgument> {
        let scheme = filter_scheme(scheme)?;
        Ok(self.changed(|uri| uri.scheme = scheme))
    }

    pub fn with_user_info(&self, user: &str, password: Option<&str>) -> Uri {
        let user_info = match password {
            Some(password) if !password.is_empty() => format!("{user}:{password}"),
            _ => user.to_string(),
        };
        self.changed(|uri| uri.user_info = user_info)
    }

    pub fn with_host(&self, host: &str) -> Uri {
        self.changed(|uri| uri.host = host.to_string())
    }

    /// Returns a copy with the port replaced; `None` removes it.
    ///
    /// `u16` rules out ports above 65535, so only `0` is rejected here.
    pub fn with_port(&self, port: Option<u16>) -> Result<Uri, InvalidArgument> {
        ensure!(port != Some(0), InvalidArgument::invalid_port(0));
        Ok(self.changed(|uri| uri.port = port))
    }

    pub fn with_path(&self, path: &str) -> Result<Uri, InvalidArgument> {
        ensure!(!path.contains('?'), InvalidArgument::PathWithQuery);
        ensure!(!path.contains('#'), InvalidArgument::PathWithFragment);

        let path = encode_preserving_escapes(path, PATH_ENCODE_SET);
        Ok(self.changed(|uri| uri.path = path))
    }

    /// Returns a copy with the query parsed from `query` (a leading `?` is ignored).
    pub fn with_query(&self, query: &str) -> Result<Uri, InvalidArgument> {
        ensure!(!query.contains('#'), InvalidArgument::QueryWithFragment);

        let query = QueryMap::parse(query.strip_prefix('?').unwrap_or(query));
        Ok(self.with_query_map(query))
    }

    pub fn with_query_map(&self, query: QueryMap) -> Uri {
        self.changed(|uri| uri.query = query)
    }

    /// Returns a copy with the fragment replaced (a leading `#` is ignored).
    pub fn with_fragment(&self, fragment: &str) -> Uri {
        let fragment = encode_preserving_escapes(fragment.strip_prefix('#').unwrap_or(fragment), FRAGMENT_ENCODE_SET);
        self.changed(|uri| uri.fragment = fragment)
    }

    fn changed(&self, change: impl FnOnce(&mut Uri)) -> Uri {
        let mut uri = self.clone();
        change(&mut uri);
        if uri != *self {
            uri.serialized = OnceCell::new();
        }
        uri
    }

    fn create_uri_string(&self) -> String {
        let mut uri = String::new();

        if !self.scheme.is_empty() {
            uri.push_str(&self.scheme);
            uri.push(':');
        }

        let authority = self.authority();
        if !authority.is_empty() {
            uri.push_str("//");
            uri.push_str(&authority);
        }

        if !self.path.is_empty() {
            if !self.path.starts_with('/') && (!authority.is_empty() || !self.scheme.is_empty()) {
                uri.push('/');
            }
            uri.push_str(&self.path);
        }

        if !self.query.is_empty() {
            uri.push('?');
            uri.push_str(&self.query.build());
        }

        if !self.fragment.is_empty() {
            uri.push('#');
            uri.push_str(&self.fragment);
        }

        uri
    }
}

impl PartialEq for Uri {
    fn eq(&self, other: &Self) -> bool {
        self.scheme == other.scheme
            && self.user_info == other.user_info
            && self.host == other.host
            && self.port == other.port
            && self.path == other.path
            && self.query == other.query
            && self.fragment == other.fragment
    }
}

impl Eq for Uri {}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.serialized.get_or_init(|| self.create_uri_string()))
    }
}

impl FromStr for Uri {
    type Err = UriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uri::parse(s)
    }
}

impl TryFrom<&str> for Uri {
    type Error = UriError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Uri::parse(value)
    }
}

/// The standard port for `scheme`, `None` for the empty scheme.
pub(crate) fn default_port(scheme: &str) -> Option<u16> {
    ALLOWED_SCHEMES.iter().find(|(name, _)| *name == scheme).map(|&(_, port)| port)
}

fn split_off(raw: &str, delimiter: char) -> (&str, Option<&str>) {
    match raw.split_once(delimiter) {
        Some((head, tail)) => (head, Some(tail)),
        None => (raw, None),
    }
}

/// Splits a leading `scheme:` when a colon appears before the first `/`.
fn split_scheme(raw: &str) -> Result<(&str, &str), UriError> {
    let Some(colon) = raw.find(':') else {
        return Ok(("", raw));
    };
    if raw[..colon].contains('/') {
        return Ok(("", raw));
    }

    let scheme = &raw[..colon];
    let valid = scheme.bytes().next().is_some_and(|b| b.is_ascii_alphabetic())
        && scheme.bytes().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'+' | b'-' | b'.'));
    ensure!(valid, UriError::malformed(format!("invalid scheme \"{scheme}\"")));

    Ok((scheme, &raw[colon + 1..]))
}

fn filter_scheme(scheme: &str) -> Result<String, InvalidArgument> {
    let scheme = scheme.to_ascii_lowercase();
    let scheme = scheme.strip_suffix("://").or_else(|| scheme.strip_suffix(':')).unwrap_or(&scheme);

    ensure!(scheme.is_empty() || default_port(scheme).is_some(), InvalidArgument::unsupported_scheme(scheme));
    Ok(scheme.to_string())
}

/// Percent-encodes everything in `set`, leaving existing `%XX` escapes intact.
pub(crate) fn encode_preserving_escapes(raw: &str, set: &'static AsciiSet) -> String {
    let bytes = raw.as_bytes();
    let mut encoded = String::with_capacity(raw.len());
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        let is_escape =
            bytes[i] == b'%' && i + 2 < bytes.len() && bytes[i + 1].is_ascii_hexdigit() && bytes[i + 2].is_ascii_hexdigit();
        if is_escape {
            encoded.extend(utf8_percent_encode(&raw[start..i], set));
            encoded.push_str(&raw[i..i + 3]);
            i += 3;
            start = i;
        } else {
            i += 1;
        }
    }

    encoded.extend(utf8_percent_encode(&raw[start..], set));
    encoded
}
