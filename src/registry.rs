//! Interning tables for modules, event categories and trace subjects
//!
//! Each table maps a caller-side handle to the record id it was declared
//! under. Counters only move forward: an id is never handed out twice in a
//! session, even after its subject is retired.

use std::collections::HashMap;

use crate::ids::{CategoryId, CategoryKey, ModuleId, ObjectId, TraceId, TraceKey};

/// The three id tables of a session
#[derive(Debug, Default)]
pub struct Registry {
    modules: HashMap<ObjectId, ModuleId>,
    module_count: u32,

    categories: HashMap<CategoryKey, CategoryId>,
    category_names: HashMap<String, CategoryId>,
    category_count: u32,

    /// Payload and custom subjects share this table and counter
    traces: HashMap<TraceKey, TraceId>,
    trace_count: u32,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign the next module id to `object`
    pub fn declare_module(&mut self, object: ObjectId) -> ModuleId {
        self.module_count += 1;
        let id = ModuleId::new(self.module_count);
        self.modules.insert(object, id);
        id
    }

    pub fn module_id(&self, object: ObjectId) -> Option<ModuleId> {
        self.modules.get(&object).copied()
    }

    /// Assign the next category id, bound to `name` and, for explicit
    /// category objects, to their key
    ///
    /// A later category declared under the same name takes over the name
    /// binding; ids already handed out stay valid.
    pub fn declare_category(&mut self, key: Option<CategoryKey>, name: &str) -> CategoryId {
        self.category_count += 1;
        let id = CategoryId::new(self.category_count);
        if let Some(key) = key {
            self.categories.insert(key, id);
        }
        self.category_names.insert(name.to_string(), id);
        id
    }

    pub fn category_id(&self, key: CategoryKey) -> Option<CategoryId> {
        self.categories.get(&key).copied()
    }

    pub fn category_id_by_name(&self, name: &str) -> Option<CategoryId> {
        self.category_names.get(name).copied()
    }

    /// Assign the next trace id to `key`
    pub fn declare_trace(&mut self, key: TraceKey) -> TraceId {
        self.trace_count += 1;
        let id = TraceId::new(self.trace_count);
        self.traces.insert(key, id);
        id
    }

    pub fn trace_id(&self, key: TraceKey) -> Option<TraceId> {
        self.traces.get(&key).copied()
    }

    /// Forget the id bound to `key`; the next use declares a new subject
    pub fn retire_trace(&mut self, key: TraceKey) -> Option<TraceId> {
        self.traces.remove(&key)
    }

    pub fn module_count(&self) -> u32 {
        self.module_count
    }

    pub fn category_count(&self) -> u32 {
        self.category_count
    }

    pub fn trace_count(&self) -> u32 {
        self.trace_count
    }
}
