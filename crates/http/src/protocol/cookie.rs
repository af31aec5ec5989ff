//! Outbound cookies and their `Set-Cookie` serialization.
//!
//! ```
//! use micro_http_message::protocol::Cookie;
//!
//! let cookie = Cookie::builder("session").value("abc 123").path("/").http_only(true).build().unwrap();
//! assert_eq!(cookie.to_set_cookie(), "session=abc+123; path=/; httponly");
//! ```

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::{LAST_HTTP_DATE, ensure, http_date};
use crate::protocol::InvalidArgument;
use crate::protocol::query::form_encode;

/// Characters a cookie name must not contain.
const INVALID_NAME_CHARS: &[char] = &['=', ',', ';', ' ', '\t', '\r', '\n', '\u{0b}', '\u{0c}'];

/// How far in the past the expiry of a deletion directive lies.
const DELETION_AGE: Duration = Duration::from_secs(31_536_001);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    name: String,
    value: Option<String>,
    expire: Option<i64>,
    path: Option<String>,
    domain: Option<String>,
    secure: bool,
    http_only: bool,
}

impl Cookie {
    /// A cookie with only a name and a value.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidArgument::InvalidCookieName`] when the name contains `=`, `,`, `;`,
    /// whitespace or line breaks.
    pub fn new(name: &str, value: &str) -> Result<Cookie, InvalidArgument> {
        Cookie::builder(name).value(value).build()
    }

    pub fn builder(name: &str) -> CookieBuilder {
        CookieBuilder {
            cookie: Cookie {
                name: name.to_string(),
                value: None,
                expire: None,
                path: None,
                domain: None,
                secure: false,
                http_only: false,
            },
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn value(&self) -> Option<&str> {
        self.value.as_deref()
    }

    /// Lifetime in seconds from the moment of serialization.
    pub fn expire(&self) -> Option<i64> {
        self.expire
    }

    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn is_secure(&self) -> bool {
        self.secure
    }

    pub fn is_http_only(&self) -> bool {
        self.http_only
    }

    /// The `Set-Cookie` header value, with expiry dates relative to the current time.
    pub fn to_set_cookie(&self) -> String {
        self.to_set_cookie_at(SystemTime::now())
    }

    /// The `Set-Cookie` header value, with expiry dates relative to `now`.
    ///
    /// An empty or missing value turns the cookie into a deletion directive that expired
    /// a year ago.
    pub fn to_set_cookie_at(&self, now: SystemTime) -> String {
        let mut line = form_encode(&self.name);
        line.push('=');

        match self.value.as_deref() {
            None | Some("") => {
                let expired = now.checked_sub(DELETION_AGE).unwrap_or(UNIX_EPOCH);
                line.push_str("deleted; expires=");
                line.push_str(&http_date(expired));
            }
            Some(value) => line.push_str(&form_encode(value)),
        }

        if let Some(seconds) = self.expire.and_then(|expire| u64::try_from(expire).ok()).filter(|&s| s > 0) {
            line.push_str("; expires=");
            let expires = now.checked_add(Duration::from_secs(seconds).min(LAST_HTTP_DATE)).unwrap_or(UNIX_EPOCH + LAST_HTTP_DATE);
            line.push_str(&http_date(expires));
        }

        if let Some(path) = self.path.as_deref().filter(|path| !path.is_empty()) {
            line.push_str("; path=");
            line.push_str(path);
        }

        if let Some(domain) = self.domain.as_deref().filter(|domain| !domain.is_empty()) {
            line.push_str("; domain=");
            line.push_str(domain);
        }

        if self.secure {
            line.push_str("; secure");
        }

        if self.http_only {
            line.push_str("; httponly");
        }

        line
    }
}

#[derive(Debug, Clone)]
pub struct CookieBuilder {
    cookie: Cookie,
}

impl CookieBuilder {
    pub fn value(mut self, value: impl Into<String>) -> Self {
        self.cookie.value = Some(value.into());
        self
    }

    /// Lifetime in seconds; zero or negative values emit no `expires` attribute.
    pub fn expire(mut self, seconds: i64) -> Self {
        self.cookie.expire = Some(seconds);
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.cookie.path = Some(path.into());
        self
    }

    pub fn domain(mut self, domain: impl Into<String>) -> Self {
        self.cookie.domain = Some(domain.into());
        self
    }

    pub fn secure(mut self, secure: bool) -> Self {
        self.cookie.secure = secure;
        self
    }

    pub fn http_only(mut self, http_only: bool) -> Self {
        self.cookie.http_only = http_only;
        self
    }

    pub fn build(self) -> Result<Cookie, InvalidArgument> {
        ensure!(!self.cookie.name.contains(INVALID_NAME_CHARS), InvalidArgument::invalid_cookie_name(&self.cookie.name));
        Ok(self.cookie)
    }
}
