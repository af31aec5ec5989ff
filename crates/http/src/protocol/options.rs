//! Per-request transfer options.
//!
//! [`TransferOptions`] is an ordered key/value mapping. A handful of keys are understood by
//! the bundled transport and have typed accessors; every other key is carried through
//! untouched for custom [`Transport`](crate::transfer::Transport) implementations.
//! Merging follows "new values win".

use std::time::Duration;

use indexmap::IndexMap;

/// Identification sent when no `user-agent` option is configured.
pub const DEFAULT_USER_AGENT: &str = concat!("micro-http-message/", env!("CARGO_PKG_VERSION"));

pub const USER_AGENT: &str = "user-agent";
pub const BASIC_AUTH: &str = "basic-auth";
pub const REFERRER: &str = "referrer";
pub const CONNECT_TIMEOUT: &str = "connect-timeout";
pub const TIMEOUT: &str = "timeout";
pub const ENCODING: &str = "encoding";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OptionValue {
    Text(String),
    Integer(i64),
    Bool(bool),
    Duration(Duration),
    Credentials { username: String, password: String },
    List(Vec<String>),
}

impl OptionValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            OptionValue::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Durations, and integers read as whole seconds.
    pub fn as_duration(&self) -> Option<Duration> {
        match self {
            OptionValue::Duration(duration) => Some(*duration),
            OptionValue::Integer(seconds) => u64::try_from(*seconds).ok().map(Duration::from_secs),
            _ => None,
        }
    }
}

impl From<&str> for OptionValue {
    fn from(value: &str) -> Self {
        OptionValue::Text(value.to_string())
    }
}

impl From<String> for OptionValue {
    fn from(value: String) -> Self {
        OptionValue::Text(value)
    }
}

impl From<i64> for OptionValue {
    fn from(value: i64) -> Self {
        OptionValue::Integer(value)
    }
}

impl From<bool> for OptionValue {
    fn from(value: bool) -> Self {
        OptionValue::Bool(value)
    }
}

impl From<Duration> for OptionValue {
    fn from(value: Duration) -> Self {
        OptionValue::Duration(value)
    }
}

impl From<Vec<String>> for OptionValue {
    fn from(value: Vec<String>) -> Self {
        OptionValue::List(value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferOptions {
    entries: IndexMap<String, OptionValue>,
}

impl TransferOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&self, key: &str) -> Option<&OptionValue> {
        self.entries.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<OptionValue>) {
        self.entries.insert(key.into(), value.into());
    }

    pub fn remove(&mut self, key: &str) -> Option<OptionValue> {
        self.entries.shift_remove(key)
    }

    /// Copies every entry of `other` into `self`, overwriting keys present in both.
    pub fn merge(&mut self, other: TransferOptions) {
        self.entries.extend(other.entries);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &OptionValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn user_agent(&self) -> Option<&str> {
        self.get(USER_AGENT).and_then(OptionValue::as_text)
    }

    pub fn basic_auth(&self) -> Option<(&str, &str)> {
        match self.get(BASIC_AUTH)? {
            OptionValue::Credentials { username, password } => Some((username, password)),
            _ => None,
        }
    }

    pub fn referrer(&self) -> Option<&str> {
        self.get(REFERRER).and_then(OptionValue::as_text)
    }

    pub fn connect_timeout(&self) -> Option<Duration> {
        self.get(CONNECT_TIMEOUT).and_then(OptionValue::as_duration)
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.get(TIMEOUT).and_then(OptionValue::as_duration)
    }

    /// The accepted content codings; an empty string means every supported coding.
    pub fn encoding(&self) -> Option<&str> {
        self.get(ENCODING).and_then(OptionValue::as_text)
    }
}

impl<K: Into<String>, V: Into<OptionValue>> FromIterator<(K, V)> for TransferOptions {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut options = TransferOptions::new();
        for (key, value) in iter {
            options.set(key, value);
        }
        options
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merge_new_values_win() {
        let mut options: TransferOptions = [(CONNECT_TIMEOUT, OptionValue::from(30_i64)), (USER_AGENT, "Hello World".into())]
            .into_iter()
            .collect();

        options.merge([(CONNECT_TIMEOUT, 20_i64)].into_iter().collect());

        assert_eq!(options.len(), 2);
        assert_eq!(options.connect_timeout(), Some(Duration::from_secs(20)));
        assert_eq!(options.user_agent(), Some("Hello World"));
    }

    #[test]
    fn typed_accessors() {
        let mut options = TransferOptions::new();
        options.set(BASIC_AUTH, OptionValue::Credentials { username: "jan".into(), password: "pw".into() });
        options.set(TIMEOUT, Duration::from_millis(1500));
        options.set(REFERRER, "http://example.com/");
        options.set(ENCODING, "");
        options.set("x-custom", true);

        assert_eq!(options.basic_auth(), Some(("jan", "pw")));
        assert_eq!(options.timeout(), Some(Duration::from_millis(1500)));
        assert_eq!(options.referrer(), Some("http://example.com/"));
        assert_eq!(options.encoding(), Some(""));
        assert_eq!(options.get("x-custom"), Some(&OptionValue::Bool(true)));
        assert_eq!(options.connect_timeout(), None);
    }

    #[test]
    fn negative_seconds_are_not_a_timeout() {
        let options: TransferOptions = [(TIMEOUT, -1_i64)].into_iter().collect();
        assert_eq!(options.timeout(), None);
    }
}
