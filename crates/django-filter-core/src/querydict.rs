//! Query string dictionary for request parameters.
//!
//! [`QueryDict`] wraps [`MultiValueDict`] to provide an immutable-by-default
//! dictionary of GET parameters or form data. It is the input a filter set is
//! bound to.

use crate::error::{FilterError, FilterResult};
use crate::utils::MultiValueDict;

/// An immutable-by-default dictionary for query string and form data.
///
/// # Examples
///
/// ```
/// use django_filter_core::QueryDict;
///
/// let qd = QueryDict::parse("genre=poetry&genre=drama&title=night+thoughts");
/// assert_eq!(qd.get("genre"), Some("drama"));
/// assert_eq!(qd.get_list("genre"), ["poetry".to_string(), "drama".to_string()]);
/// assert_eq!(qd.get("title"), Some("night thoughts"));
///
/// let mut mutable = qd.copy();
/// mutable.set("genre", "essay").unwrap();
/// assert_eq!(mutable.get("genre"), Some("essay"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryDict {
    data: MultiValueDict<String, String>,
    mutable: bool,
}

impl Default for QueryDict {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryDict {
    /// Creates a new, empty, immutable `QueryDict`.
    pub fn new() -> Self {
        Self {
            data: MultiValueDict::new(),
            mutable: false,
        }
    }

    /// Creates a new, empty, mutable `QueryDict`.
    pub fn new_mutable() -> Self {
        Self {
            data: MultiValueDict::new(),
            mutable: true,
        }
    }

    /// Parses a URL query string (e.g. `"key1=val1&key2=val2"`) into an
    /// immutable `QueryDict`.
    ///
    /// Handles percent-encoding and `+` as space, and keeps every value of a
    /// repeated key.
    pub fn parse(query_string: &str) -> Self {
        let query_string = query_string.strip_prefix('?').unwrap_or(query_string);
        let mut data = MultiValueDict::new();

        for pair in query_string.split('&') {
            if pair.is_empty() {
                continue;
            }

            let (key, value) = pair
                .find('=')
                .map_or((pair, ""), |eq_pos| (&pair[..eq_pos], &pair[eq_pos + 1..]));

            data.append(percent_decode(key), percent_decode(value));
        }

        Self {
            data,
            mutable: false,
        }
    }

    /// Builds an immutable `QueryDict` from key/value pairs.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        let mut data = MultiValueDict::new();
        for (key, value) in pairs {
            data.append(key.into(), value.into());
        }
        Self {
            data,
            mutable: false,
        }
    }

    /// Returns the last value for the given key, or `None` if not present.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.data.get(key).map(String::as_str)
    }

    /// Returns all values for the given key (empty if not present).
    pub fn get_list(&self, key: &str) -> &[String] {
        self.data.get_list(key).map_or(&[], Vec::as_slice)
    }

    /// Sets a single value for the given key, replacing any existing values.
    pub fn set(&mut self, key: &str, value: &str) -> FilterResult<()> {
        self.check_mutable()?;
        self.data.set(key.to_string(), value.to_string());
        Ok(())
    }

    /// Appends a value to the list for the given key.
    pub fn append(&mut self, key: &str, value: &str) -> FilterResult<()> {
        self.check_mutable()?;
        self.data.append(key.to_string(), value.to_string());
        Ok(())
    }

    /// Removes a key and all its values.
    pub fn remove(&mut self, key: &str) -> FilterResult<Option<Vec<String>>> {
        self.check_mutable()?;
        Ok(self.data.remove(key))
    }

    /// Returns a mutable copy of this `QueryDict`.
    #[must_use]
    pub fn copy(&self) -> Self {
        Self {
            data: self.data.clone(),
            mutable: true,
        }
    }

    /// Encodes this `QueryDict` as a URL query string with keys in sorted order.
    pub fn urlencode(&self) -> String {
        let mut parts = Vec::new();

        for (key, values) in &self.data {
            for value in values {
                parts.push(format!("{}={}", percent_encode(key), percent_encode(value)));
            }
        }

        parts.sort();
        parts.join("&")
    }

    /// Returns `true` if this `QueryDict` is mutable.
    pub const fn is_mutable(&self) -> bool {
        self.mutable
    }

    /// Returns the number of distinct keys.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the `QueryDict` contains no keys.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Returns `true` if the specified key is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    /// Returns an iterator over the keys.
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.data.keys()
    }

    fn check_mutable(&self) -> FilterResult<()> {
        if self.mutable {
            Ok(())
        } else {
            Err(FilterError::SuspiciousOperation(
                "This QueryDict instance is immutable".to_string(),
            ))
        }
    }
}

/// Decodes a percent-encoded string.
fn percent_decode(input: &str) -> String {
    let plus_decoded = input.replace('+', " ");
    percent_encoding::percent_decode_str(&plus_decoded)
        .decode_utf8_lossy()
        .into_owned()
}

/// Percent-encodes a string for use in a URL query.
fn percent_encode(input: &str) -> String {
    percent_encoding::utf8_percent_encode(input, percent_encoding::NON_ALPHANUMERIC).to_string()
}
