//! Structured query strings.
//!
//! A raw query string such as `a[b][]=1&a[b][]=2&c=3` is parsed into a nested
//! [`QueryMap`]: the name before the first `[` is the top key, every bracketed
//! segment descends one level, and an empty segment (`[]`) appends under the next
//! free integer index. Integer-looking keys share the key space with the appended
//! indices, so `a[5]=x&a[]=y` stores `y` under `6`.
//!
//! [`QueryMap::build`] renders the map back with every reserved character (spaces and
//! brackets included) percent-encoded, so that parsing the result yields the same map.
//! The output is not necessarily byte-identical to the input. [`QueryMap::build_form`]
//! renders a form body instead, with `+` for spaces.

use std::fmt;

use indexmap::IndexMap;
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, percent_decode_str, utf8_percent_encode};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// Characters kept verbatim by form encoding.
const FORM_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC.remove(b'-').remove(b'.').remove(b'_');

/// Output flavors of [`QueryMap`] rendering.
#[derive(Debug, Clone, Copy)]
enum Style {
    /// URI query component, every reserved character escaped.
    Query,
    /// Form body, `+` for spaces.
    Form,
    /// Literal brackets for `serde_qs`.
    Bracketed,
}

/// A value stored under a query key: either a scalar or a nested map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryValue {
    Value(String),
    Map(QueryMap),
}

impl QueryValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            QueryValue::Value(value) => Some(value),
            QueryValue::Map(_) => None,
        }
    }

    pub fn as_map(&self) -> Option<&QueryMap> {
        match self {
            QueryValue::Value(_) => None,
            QueryValue::Map(map) => Some(map),
        }
    }

    #[inline]
    pub fn is_map(&self) -> bool {
        matches!(self, QueryValue::Map(_))
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Value(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Value(value)
    }
}

impl From<QueryMap> for QueryValue {
    fn from(map: QueryMap) -> Self {
        QueryValue::Map(map)
    }
}

/// Insertion-ordered query mapping with append-index tracking.
#[derive(Debug, Clone, Default)]
pub struct QueryMap {
    entries: IndexMap<String, QueryValue>,
    next_index: u64,
}

impl QueryMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a raw query string (without the leading `?`).
    ///
    /// Empty parts are skipped, a part without `=` is read as `key=`, and keys and
    /// values are percent-decoded without turning `+` into a space.
    pub fn parse(raw: &str) -> Self {
        let mut query = QueryMap::new();

        for part in raw.split('&').filter(|part| !part.is_empty()) {
            let (name, value) = part.split_once('=').unwrap_or((part, ""));
            query.assign(&decode(name), decode(value));
        }

        query
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.entries.get(key)
    }

    /// Returns the scalar stored under `key`, if any.
    pub fn get_value(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(QueryValue::as_str)
    }

    /// Returns the nested map stored under `key`, if any.
    pub fn get_map(&self, key: &str) -> Option<&QueryMap> {
        self.get(key).and_then(QueryValue::as_map)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.entries.iter().map(|(key, value)| (key.as_str(), value))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Stores `value` under `key`, replacing a previous value in place.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<QueryValue>) {
        let key = key.into();
        self.track_index(&key);
        self.entries.insert(key, value.into());
    }

    /// Appends `value` under the next free integer index and returns that index.
    pub fn push(&mut self, value: impl Into<QueryValue>) -> String {
        let key = self.next_key();
        self.entries.insert(key.clone(), value.into());
        key
    }

    /// Returns the values when the keys are exactly `0..len` in order.
    pub fn as_list(&self) -> Option<Vec<&QueryValue>> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, (key, value))| (key.parse::<usize>().ok() == Some(index)).then_some(value))
            .collect()
    }

    /// Renders the map as a query string that [`parse`](Self::parse) reads back unchanged:
    /// brackets and spaces are percent-encoded (`%5B`, `%20`).
    pub fn build(&self) -> String {
        self.render(Style::Query)
    }

    /// Renders the map as an `application/x-www-form-urlencoded` body (`+` for spaces).
    pub fn build_form(&self) -> String {
        self.render(Style::Form)
    }

    /// Keeps the brackets of nested keys literal, which is the form `serde_qs` expects.
    pub(crate) fn build_bracketed(&self) -> String {
        self.render(Style::Bracketed)
    }

    fn render(&self, style: Style) -> String {
        let mut pairs = Vec::with_capacity(self.entries.len());
        self.collect_pairs(None, &mut pairs, style);
        pairs.join("&")
    }

    fn collect_pairs(&self, prefix: Option<&str>, pairs: &mut Vec<String>, style: Style) {
        for (key, value) in &self.entries {
            let name = match (prefix, style) {
                (Some(prefix), Style::Bracketed) => format!("{prefix}[{}]", form_encode(key)),
                (Some(prefix), _) => format!("{prefix}[{key}]"),
                (None, Style::Bracketed) => form_encode(key),
                (None, _) => key.clone(),
            };

            match (value, style) {
                (QueryValue::Value(value), Style::Query) => {
                    pairs.push(format!("{}={}", component_encode(&name), component_encode(value)));
                }
                (QueryValue::Value(value), Style::Form) => {
                    pairs.push(format!("{}={}", form_encode(&name), form_encode(value)));
                }
                (QueryValue::Value(value), Style::Bracketed) => pairs.push(format!("{name}={}", form_encode(value))),
                (QueryValue::Map(map), _) => map.collect_pairs(Some(&name), pairs, style),
            }
        }
    }

    /// Writes `value` at the path described by a possibly bracketed `name`.
    fn assign(&mut self, name: &str, value: String) {
        let segments = bracket_segments(name);
        let Some(base_end) = name.find('[').filter(|_| !segments.is_empty()) else {
            self.insert(name, value);
            return;
        };

        let mut target = self;
        for segment in std::iter::once(&name[..base_end]).chain(segments[..segments.len() - 1].iter().copied()) {
            target = target.child_map(segment);
        }

        match segments[segments.len() - 1] {
            "" => {
                target.push(value);
            }
            key => target.insert(key, value),
        }
    }

    /// Descends into the map under `key`, creating it (or replacing a scalar) as needed.
    fn child_map(&mut self, key: &str) -> &mut QueryMap {
        let key = if key.is_empty() {
            self.next_key()
        } else {
            self.track_index(key);
            key.to_string()
        };

        let slot = self.entries.entry(key).or_insert_with(|| QueryValue::Map(QueryMap::new()));
        loop {
            match slot {
                QueryValue::Map(map) => return map,
                QueryValue::Value(_) => *slot = QueryValue::Map(QueryMap::new()),
            }
        }
    }

    fn next_key(&mut self) -> String {
        let key = self.next_index.to_string();
        self.next_index = self.next_index.saturating_add(1);
        key
    }

    /// Keys at the top of the index range are stored as plain keys and do not move the
    /// append index.
    fn track_index(&mut self, key: &str) {
        if let Some(next) = integer_key(key).and_then(|index| index.checked_add(1)) {
            self.next_index = self.next_index.max(next);
        }
    }
}

impl PartialEq for QueryMap {
    fn eq(&self, other: &Self) -> bool {
        self.entries == other.entries
    }
}

impl Eq for QueryMap {}

impl fmt::Display for QueryMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.build())
    }
}

impl<K: Into<String>, V: Into<QueryValue>> FromIterator<(K, V)> for QueryMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        let mut map = QueryMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl Serialize for QueryMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_map(Some(self.entries.len()))?;
        for (key, value) in &self.entries {
            state.serialize_entry(key, value)?;
        }
        state.end()
    }
}

impl Serialize for QueryValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            QueryValue::Value(value) => serializer.serialize_str(value),
            QueryValue::Map(map) => map.serialize(serializer),
        }
    }
}

/// Collects the contents of every `[...]` group, scanning left to right.
fn bracket_segments(name: &str) -> Vec<&str> {
    let mut segments = Vec::new();
    let mut rest = name;

    while let Some(open) = rest.find('[') {
        let Some(close) = rest[open + 1..].find(']') else {
            break;
        };
        segments.push(&rest[open + 1..open + 1 + close]);
        rest = &rest[open + close + 2..];
    }

    segments
}

/// Non-negative canonical decimal keys take part in append indexing.
fn integer_key(key: &str) -> Option<u64> {
    let canonical = key == "0" || (!key.starts_with('0') && !key.is_empty() && key.bytes().all(|b| b.is_ascii_digit()));
    if canonical { key.parse().ok() } else { None }
}

fn decode(raw: &str) -> String {
    percent_decode_str(raw).decode_utf8_lossy().into_owned()
}

fn component_encode(value: &str) -> String {
    utf8_percent_encode(value, FORM_ENCODE_SET).to_string()
}

pub(crate) fn form_encode(value: &str) -> String {
    utf8_percent_encode(value, FORM_ENCODE_SET).to_string().replace("%20", "+")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_flat_pairs() {
        let query = QueryMap::parse("a=1&b=two&c");

        assert_eq!(query.len(), 3);
        assert_eq!(query.get_value("a"), Some("1"));
        assert_eq!(query.get_value("b"), Some("two"));
        assert_eq!(query.get_value("c"), Some(""));
    }

    #[test]
    fn parse_decodes_percent_but_keeps_plus() {
        let query = QueryMap::parse("na%20me=a+b%26c&x=%zz");

        assert_eq!(query.get_value("na me"), Some("a+b&c"));
        assert_eq!(query.get_value("x"), Some("%zz"));
    }

    #[test]
    fn parse_splits_on_first_equal_sign() {
        let query = QueryMap::parse("token=abc==");
        assert_eq!(query.get_value("token"), Some("abc=="));
    }

    #[test]
    fn parse_bracket_lists() {
        let query = QueryMap::parse("a[b][]=1&a[b][]=2");

        let b = query.get_map("a").and_then(|a| a.get_map("b")).unwrap();
        let list: Vec<_> = b.as_list().unwrap().into_iter().map(|v| v.as_str().unwrap()).collect();
        assert_eq!(list, vec!["1", "2"]);
    }

    #[test]
    fn parse_bracket_keys() {
        let query = QueryMap::parse("user[name]=jan&user[tags][]=a&user[tags][]=b&page=2");

        let user = query.get_map("user").unwrap();
        assert_eq!(user.get_value("name"), Some("jan"));
        assert_eq!(user.get_map("tags").unwrap().len(), 2);
        assert_eq!(query.get_value("page"), Some("2"));
    }

    #[test]
    fn integer_keys_advance_append_index() {
        let query = QueryMap::parse("a[5]=x&a[]=y");

        let a = query.get_map("a").unwrap();
        assert_eq!(a.get_value("5"), Some("x"));
        assert_eq!(a.get_value("6"), Some("y"));
        assert!(a.as_list().is_none());
    }

    #[test]
    fn empty_base_name_appends_at_root() {
        let query = QueryMap::parse("[x]=1");
        assert_eq!(query.get_map("0").and_then(|m| m.get_value("x")), Some("1"));
    }

    #[test]
    fn later_values_overwrite_in_place() {
        let query = QueryMap::parse("a=1&b=2&a=3");

        assert_eq!(query.keys().collect::<Vec<_>>(), vec!["a", "b"]);
        assert_eq!(query.get_value("a"), Some("3"));
    }

    #[test]
    fn scalar_is_replaced_by_nested_map() {
        let query = QueryMap::parse("a=1&a[b]=2");
        assert_eq!(query.get_map("a").and_then(|a| a.get_value("b")), Some("2"));
    }

    #[test]
    fn unclosed_bracket_is_a_plain_key() {
        let query = QueryMap::parse("a[b=1");
        assert_eq!(query.get_value("a[b"), Some("1"));
    }

    #[test]
    fn empty_query_is_empty_map() {
        assert!(QueryMap::parse("").is_empty());
        assert!(QueryMap::parse("&&").is_empty());
    }

    #[test]
    fn build_form_encodes_nested_keys() {
        let query = QueryMap::parse("a[b][]=1&a[b][]=2&q=hello world~");

        assert_eq!(query.build(), "a%5Bb%5D%5B0%5D=1&a%5Bb%5D%5B1%5D=2&q=hello%20world%7E");
        assert_eq!(query.build_form(), "a%5Bb%5D%5B0%5D=1&a%5Bb%5D%5B1%5D=2&q=hello+world%7E");
    }

    #[test]
    fn bracketed_build_keeps_brackets_literal() {
        let query = QueryMap::parse("a[b c][]=1&d=2");
        assert_eq!(query.build_bracketed(), "a[b+c][0]=1&d=2");
    }

    #[test]
    fn build_then_parse_is_stable() {
        let query = QueryMap::parse("a[b][]=1&a[b][]=2&c[d]=x%20y&e=&f=1+2");
        let reparsed = QueryMap::parse(&query.build());

        assert_eq!(query, reparsed);
        assert_eq!(reparsed.build(), query.build());
        assert_eq!(reparsed.get_map("c").and_then(|c| c.get_value("d")), Some("x y"));
        assert_eq!(reparsed.get_value("f"), Some("1+2"));
    }

    #[test]
    fn largest_integer_key_does_not_overflow() {
        let query = QueryMap::parse("a[18446744073709551615]=x&a[]=y&a[]=z");

        let a = query.get_map("a").unwrap();
        assert_eq!(a.get_value("18446744073709551615"), Some("x"));
        assert_eq!(a.get_value("0"), Some("y"));
        assert_eq!(a.get_value("1"), Some("z"));
    }

    #[test]
    fn appending_after_the_last_index_keeps_it() {
        let mut list = QueryMap::new();
        list.insert("18446744073709551614", "x");

        assert_eq!(list.push("y"), "18446744073709551615");
        assert_eq!(list.push("z"), "18446744073709551615");
        assert_eq!(list.get_value("18446744073709551615"), Some("z"));
    }

    #[test]
    fn serializes_as_nested_json() {
        let query = QueryMap::parse("a[b][]=1&c=2");
        let json = serde_json::to_string(&query).unwrap();

        assert_eq!(json, r#"{"a":{"b":{"0":"1"}},"c":"2"}"#);
    }

    #[test]
    fn collects_from_pairs() {
        let query: QueryMap = [("name", "jan"), ("age", "18")].into_iter().collect();
        assert_eq!(query.build(), "name=jan&age=18");
    }
}
