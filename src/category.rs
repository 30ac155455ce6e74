//! Event categories
//!
//! A category classifies an occurrence ("Send", "Receive", ...). Callers
//! either build an [`EventCategory`] up front, with static properties, or
//! just name one at the mark site and let the recorder create it.

use crate::ids::CategoryKey;
use crate::properties::{PropertySet, PropertyValue};

/// A named event classification with optional static properties
#[derive(Debug, Clone)]
pub struct EventCategory {
    key: CategoryKey,
    name: String,
    properties: PropertySet,
}

impl EventCategory {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            key: CategoryKey::issue(),
            name: name.into(),
            properties: PropertySet::new(),
        }
    }

    pub fn with_properties(name: impl Into<String>, properties: PropertySet) -> Self {
        Self {
            key: CategoryKey::issue(),
            name: name.into(),
            properties,
        }
    }

    pub fn add_property(&mut self, name: impl Into<String>, value: impl Into<PropertyValue>) {
        self.properties.insert(name, value);
    }

    pub fn key(&self) -> CategoryKey {
        self.key
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn properties(&self) -> &PropertySet {
        &self.properties
    }
}

/// Category argument of a mark: an explicit object or a bare name
#[derive(Debug, Clone, Copy)]
pub enum CategoryRef<'a> {
    Object(&'a EventCategory),
    Name(&'a str),
}

impl<'a> From<&'a EventCategory> for CategoryRef<'a> {
    fn from(category: &'a EventCategory) -> Self {
        CategoryRef::Object(category)
    }
}

impl<'a> From<&'a str> for CategoryRef<'a> {
    fn from(name: &'a str) -> Self {
        CategoryRef::Name(name)
    }
}

impl<'a> From<&'a String> for CategoryRef<'a> {
    fn from(name: &'a String) -> Self {
        CategoryRef::Name(name.as_str())
    }
}
