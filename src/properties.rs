//! Property sets attached to categories, trace subjects and events
//!
//! A property set is an ordered name→value map of strings. Ordering is by
//! name, so two sessions fed the same calls write identical files.

use std::collections::BTreeMap;

use crate::format::{format_bool, format_g};

/// Ordered set of `name = value` string pairs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertySet {
    entries: BTreeMap<String, String>,
}

impl PropertySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a property
    ///
    /// Accepts anything convertible to a [`PropertyValue`]: strings, integers,
    /// floats (rendered `%g`-style) and bools (`True` / `False`).
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<PropertyValue>) {
        self.entries.insert(name.into(), value.into().0);
    }

    /// Builder-style [`insert`](Self::insert)
    pub fn with(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.insert(name, value);
        self
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Overlay `other` on top of `self`; keys in `other` win on collision
    pub fn merge(&mut self, other: &PropertySet) {
        for (name, value) in &other.entries {
            self.entries.insert(name.clone(), value.clone());
        }
    }
}

impl<K, V> FromIterator<(K, V)> for PropertySet
where
    K: Into<String>,
    V: Into<PropertyValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = PropertySet::new();
        for (name, value) in iter {
            set.insert(name, value);
        }
        set
    }
}

impl<'a> IntoIterator for &'a PropertySet {
    type Item = (&'a String, &'a String);
    type IntoIter = std::collections::btree_map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

/// A property value already rendered to its trace-file text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyValue(String);

impl PropertyValue {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<&String> for PropertyValue {
    fn from(value: &String) -> Self {
        Self(value.clone())
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        Self(format_bool(value).to_string())
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        Self(format_g(value))
    }
}

impl From<f32> for PropertyValue {
    fn from(value: f32) -> Self {
        Self(format_g(f64::from(value)))
    }
}

macro_rules! integer_property {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for PropertyValue {
                fn from(value: $ty) -> Self {
                    Self(value.to_string())
                }
            }
        )*
    };
}

integer_property!(i8, i16, i32, i64, u8, u16, u32, u64, usize);
