//! A dictionary that can hold multiple values per key.
//!
//! Query strings and form submissions may repeat a key (`?genre=a&genre=b`),
//! and multiple-choice filters need every occurrence while single-value
//! fields only want the last one.

use std::borrow::Borrow;
use std::collections::hash_map;
use std::collections::HashMap;
use std::hash::Hash;

/// A dictionary that maps keys to lists of values.
///
/// [`get`](MultiValueDict::get) returns the **last** value for a key, while
/// [`get_list`](MultiValueDict::get_list) returns all values.
///
/// # Examples
///
/// ```
/// use django_filter_core::utils::MultiValueDict;
///
/// let mut d = MultiValueDict::new();
/// d.append("genre".to_string(), "poetry");
/// d.append("genre".to_string(), "drama");
///
/// assert_eq!(d.get("genre"), Some(&"drama"));
/// assert_eq!(d.get_list("genre"), Some(&vec!["poetry", "drama"]));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MultiValueDict<K: Eq + Hash, V> {
    inner: HashMap<K, Vec<V>>,
}

impl<K: Eq + Hash, V> Default for MultiValueDict<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: Eq + Hash, V> MultiValueDict<K, V> {
    /// Creates an empty `MultiValueDict`.
    pub fn new() -> Self {
        Self {
            inner: HashMap::new(),
        }
    }

    /// Returns the last value associated with the key.
    pub fn get<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.get(key).and_then(|v| v.last())
    }

    /// Returns all values associated with the key.
    pub fn get_list<Q>(&self, key: &Q) -> Option<&Vec<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.get(key)
    }

    /// Sets the value for a key, replacing any existing values.
    pub fn set(&mut self, key: K, value: V) {
        self.inner.insert(key, vec![value]);
    }

    /// Replaces all values for a key.
    pub fn set_list(&mut self, key: K, values: Vec<V>) {
        self.inner.insert(key, values);
    }

    /// Appends a value to the list for the given key.
    pub fn append(&mut self, key: K, value: V) {
        self.inner.entry(key).or_default().push(value);
    }

    /// Removes a key, returning its values.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<Vec<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.remove(key)
    }

    /// Returns an iterator over the keys.
    pub fn keys(&self) -> hash_map::Keys<'_, K, Vec<V>> {
        self.inner.keys()
    }

    /// Returns the number of distinct keys.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Returns `true` if the dictionary contains no keys.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Returns `true` if the dictionary contains the specified key.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.contains_key(key)
    }

    /// Returns an iterator over (key, value-list) pairs.
    pub fn iter(&self) -> hash_map::Iter<'_, K, Vec<V>> {
        self.inner.iter()
    }
}

impl<'a, K: Eq + Hash, V> IntoIterator for &'a MultiValueDict<K, V> {
    type Item = (&'a K, &'a Vec<V>);
    type IntoIter = hash_map::Iter<'a, K, Vec<V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.inner.iter()
    }
}
