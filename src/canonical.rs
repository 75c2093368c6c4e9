//! Canonicalization functionality for signature generation and validation.
//!
//! This includes URL parsing, the query-string codec, and construction of the canonical string that is fed into the
//! HMAC. The signer and the verifier both go through [ParsedUrl::canonical_string], so the escaping rules here are
//! the wire format: changing them invalidates every URL signed before the change.

use {
    crate::{constants::*, SigningError},
    http::uri::Uri,
    log::trace,
    percent_encoding::{percent_decode_str, utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC},
    qualifier_attr::qualifiers,
    std::slice,
};

/// Characters left unescaped in query keys, query values, and the canonical string. Everything else, including
/// every non-ASCII byte of the UTF-8 encoding, is percent-encoded with uppercase hex digits.
const COMPONENT_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Characters escaped in the path as it is parsed. The URL parser accepts these raw, but URLs signed elsewhere carry
/// them escaped, and the path is signed as-is. Everything else, including non-ASCII text, is kept.
const PATH_ESCAPED_CHARS: &[char] = &['"', '\'', '^', '{', '|', '}'];

/// The value of a query parameter. A key that appears more than once in the query string yields a sequence.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum QueryValue {
    /// The key appeared exactly once.
    Single(String),

    /// The key appeared multiple times; values are in order of appearance.
    Multiple(Vec<String>),
}

impl QueryValue {
    /// Return the value if the key appeared exactly once.
    pub fn as_single(&self) -> Option<&str> {
        match self {
            Self::Single(value) => Some(value),
            Self::Multiple(_) => None,
        }
    }

    /// Return all values in order of appearance.
    pub fn values(&self) -> &[String] {
        match self {
            Self::Single(value) => slice::from_ref(value),
            Self::Multiple(values) => values,
        }
    }

    /// Indicates whether the parameter counts as supplied: a single empty value does not.
    pub fn is_present(&self) -> bool {
        match self {
            Self::Single(value) => !value.is_empty(),
            Self::Multiple(_) => true,
        }
    }

    fn push(&mut self, value: String) {
        match self {
            Self::Single(existing) => {
                let first = std::mem::take(existing);
                *self = Self::Multiple(vec![first, value]);
            }
            Self::Multiple(values) => values.push(value),
        }
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

/// Query parameters of a URL, in insertion order.
///
/// Setting an existing key replaces its value in place; setting a new key appends it.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct QueryParameters {
    entries: Vec<(String, QueryValue)>,
}

impl QueryParameters {
    /// Create an empty set of query parameters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a raw query string (without the leading `?`).
    ///
    /// Components are separated by `&` and split on the first `=`. `+` decodes to a space, percent escapes are
    /// decoded, and invalid UTF-8 is replaced. Empty components are skipped; a component without `=` has an empty
    /// value.
    pub fn parse(query_string: &str) -> Self {
        let mut result = Self::new();

        for component in query_string.split('&') {
            if component.is_empty() {
                continue;
            }

            let (key, value) = component.split_once('=').unwrap_or((component, ""));
            let key = unescape_component(key);
            let value = unescape_component(value);

            match result.get_mut(&key) {
                Some(existing) => existing.push(value),
                None => result.entries.push((key, QueryValue::Single(value))),
            }
        }

        result
    }

    /// Retrieve the value for `key`.
    pub fn get(&self, key: &str) -> Option<&QueryValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    fn get_mut(&mut self, key: &str) -> Option<&mut QueryValue> {
        self.entries.iter_mut().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Set `key` to `value`, replacing any existing value in place.
    pub fn set<K, V>(&mut self, key: K, value: V)
    where
        K: Into<String>,
        V: Into<QueryValue>,
    {
        let key = key.into();
        let value = value.into();

        match self.get_mut(&key) {
            Some(existing) => *existing = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Remove `key`, returning its value if it was present.
    pub fn remove(&mut self, key: &str) -> Option<QueryValue> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    /// Iterate over the parameters in order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &QueryValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// The number of distinct keys.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Indicates whether there are no parameters.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return a copy with keys sorted byte-wise and `excluded_key` removed.
    pub fn sorted_without(&self, excluded_key: &str) -> Self {
        let mut entries: Vec<(String, QueryValue)> =
            self.entries.iter().filter(|(k, _)| k != excluded_key).cloned().collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Self {
            entries,
        }
    }

    /// Serialize to a query string. A sequence value produces one `key=value` pair per element.
    pub fn to_query_string(&self) -> String {
        let mut results = Vec::with_capacity(self.entries.len());

        for (key, value) in self.entries.iter() {
            let key = escape_component(key);
            for v in value.values() {
                results.push(format!("{}={}", key, escape_component(v)));
            }
        }

        results.join("&")
    }
}

/// The components of a URL that take part in signing.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ParsedUrl {
    /// The scheme, including the trailing colon, e.g. `https:`.
    protocol: String,

    /// The lowercase host, plus `:port` if a port was given.
    host: String,

    /// The path, starting with `/`.
    path: String,

    /// The query parameters, in the order they appeared.
    query: QueryParameters,
}

impl ParsedUrl {
    /// Parse an absolute URL. User information and fragments are discarded.
    pub fn parse(url: &str) -> Result<Self, SigningError> {
        let uri: Uri = url.parse()?;

        let (Some(scheme), Some(authority)) = (uri.scheme_str(), uri.authority()) else {
            return Err(SigningError::MalformedUrl(format!("{}{}", MSG_URL_MUST_BE_ABSOLUTE, url)));
        };

        let mut host = authority.host().to_ascii_lowercase();
        if let Some(port) = authority.port() {
            host.push(':');
            host.push_str(port.as_str());
        }

        Ok(Self {
            protocol: format!("{}:", scheme),
            host,
            path: escape_path(uri.path()),
            query: QueryParameters::parse(uri.query().unwrap_or("")),
        })
    }

    /// Retrieve the scheme, including the trailing colon.
    #[inline(always)]
    pub fn protocol(&self) -> &str {
        &self.protocol
    }

    /// Retrieve the host (and port, if present).
    #[inline(always)]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Retrieve the path.
    #[inline(always)]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Retrieve the query parameters.
    #[inline(always)]
    pub fn query(&self) -> &QueryParameters {
        &self.query
    }

    /// Retrieve the query parameters for modification.
    #[inline(always)]
    pub fn query_mut(&mut self) -> &mut QueryParameters {
        &mut self.query
    }

    /// Build the canonical string for this URL, ignoring the `signature_key` parameter.
    ///
    /// This is `escape(protocol + "//" + host + "/" + path) + "&" + escape(sorted query string)`. Since the path
    /// already begins with `/`, the escaped base normally contains a doubled slash; existing signed URLs depend on
    /// that.
    pub fn canonical_string(&self, signature_key: &str) -> String {
        let base = format!("{}//{}/{}", self.protocol, self.host, self.path);
        let query = self.query.sorted_without(signature_key).to_query_string();
        let result = format!("{}&{}", escape_component(&base), escape_component(&query));

        trace!("Canonical string: {}", result);
        result
    }

    /// Reassemble the URL as `protocol//host/path?query`.
    pub fn to_url_string(&self) -> String {
        format!("{}//{}{}?{}", self.protocol, self.host, self.path, self.query.to_query_string())
    }
}

/// Percent-encode a query key, query value, or canonical string component.

#[cfg_attr(any(doc, feature = "unstable"), qualifiers(pub))]
#[cfg_attr(not(any(doc, feature = "unstable")), qualifiers(pub(crate)))]
fn escape_component(s: &str) -> String {
    utf8_percent_encode(s, COMPONENT_ENCODE_SET).to_string()
}

/// Decode a query key or value: `+` becomes a space, then percent escapes are decoded. Malformed escapes are kept
/// verbatim.

#[cfg_attr(any(doc, feature = "unstable"), qualifiers(pub))]
#[cfg_attr(not(any(doc, feature = "unstable")), qualifiers(pub(crate)))]
fn unescape_component(s: &str) -> String {
    let s = s.replace('+', " ");
    percent_decode_str(&s).decode_utf8_lossy().into_owned()
}

/// Normalize a path the way it is signed: backslashes become slashes and [PATH_ESCAPED_CHARS] are percent-encoded.
fn escape_path(path: &str) -> String {
    let mut result = String::with_capacity(path.len());
    for c in path.chars() {
        match c {
            '\\' => result.push('/'),
            c if PATH_ESCAPED_CHARS.contains(&c) => result.push_str(&format!("%{:02X}", c as u32)),
            c => result.push(c),
        }
    }
    result
}
