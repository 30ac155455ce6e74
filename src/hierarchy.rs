//! Module hierarchy of the simulated system
//!
//! The simulation kernel owns the object tree. The recorder only queries it
//! through [`HierarchySource`], once, when the session opens: every module
//! reachable from a parentless root is declared in depth-first pre-order,
//! nested the way the tree is nested. Objects that are not modules are
//! skipped together with everything below them.

use std::io::Write;
use std::rc::Rc;

use crate::error::Result;
use crate::ids::ObjectId;
use crate::registry::Registry;
use crate::writer::TraceWriter;

/// Queries the recorder needs from the simulation's object tree
pub trait HierarchySource {
    /// Objects without a parent, in kernel order
    fn roots(&self) -> Vec<ObjectId>;

    fn is_module(&self, object: ObjectId) -> bool;

    /// Direct children of `object`, in kernel order
    fn children(&self, object: ObjectId) -> Vec<ObjectId>;

    /// Leaf name of `object` (not the dotted path)
    fn display_name(&self, object: ObjectId) -> String;
}

impl<T: HierarchySource + ?Sized> HierarchySource for &T {
    fn roots(&self) -> Vec<ObjectId> {
        (**self).roots()
    }
    fn is_module(&self, object: ObjectId) -> bool {
        (**self).is_module(object)
    }
    fn children(&self, object: ObjectId) -> Vec<ObjectId> {
        (**self).children(object)
    }
    fn display_name(&self, object: ObjectId) -> String {
        (**self).display_name(object)
    }
}

impl<T: HierarchySource + ?Sized> HierarchySource for Rc<T> {
    fn roots(&self) -> Vec<ObjectId> {
        (**self).roots()
    }
    fn is_module(&self, object: ObjectId) -> bool {
        (**self).is_module(object)
    }
    fn children(&self, object: ObjectId) -> Vec<ObjectId> {
        (**self).children(object)
    }
    fn display_name(&self, object: ObjectId) -> String {
        (**self).display_name(object)
    }
}

impl<T: HierarchySource + ?Sized> HierarchySource for Box<T> {
    fn roots(&self) -> Vec<ObjectId> {
        (**self).roots()
    }
    fn is_module(&self, object: ObjectId) -> bool {
        (**self).is_module(object)
    }
    fn children(&self, object: ObjectId) -> Vec<ObjectId> {
        (**self).children(object)
    }
    fn display_name(&self, object: ObjectId) -> String {
        (**self).display_name(object)
    }
}

/// Kind of a node in a [`StaticHierarchy`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Module,
    /// Ports, channels, signals and anything else that is not a module
    Other,
}

#[derive(Debug, Clone)]
struct Node {
    name: String,
    kind: ObjectKind,
    parent: Option<ObjectId>,
    children: Vec<ObjectId>,
}

/// An object tree built up front, for simulations without a kernel of their own
///
/// ```
/// use scantrace::hierarchy::{HierarchySource, StaticHierarchy};
///
/// let mut tree = StaticHierarchy::new();
/// let top = tree.add_module(None, "top");
/// let cpu = tree.add_module(Some(top), "cpu");
/// tree.add_object(Some(top), "irq_line");
///
/// assert_eq!(tree.roots(), vec![top]);
/// assert_eq!(tree.full_name(cpu), "top.cpu");
/// ```
#[derive(Debug, Clone, Default)]
pub struct StaticHierarchy {
    nodes: Vec<Node>,
}

impl StaticHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_module(&mut self, parent: Option<ObjectId>, name: impl Into<String>) -> ObjectId {
        self.add(parent, name.into(), ObjectKind::Module)
    }

    pub fn add_object(&mut self, parent: Option<ObjectId>, name: impl Into<String>) -> ObjectId {
        self.add(parent, name.into(), ObjectKind::Other)
    }

    fn add(&mut self, parent: Option<ObjectId>, name: String, kind: ObjectKind) -> ObjectId {
        let id = ObjectId::new(self.nodes.len() as u64);
        // A parent handle from another tree is treated as no parent.
        let parent = parent.filter(|p| self.node(*p).is_some());
        if let Some(p) = parent {
            self.nodes[p.raw() as usize].children.push(id);
        }
        self.nodes.push(Node {
            name,
            kind,
            parent,
            children: Vec::new(),
        });
        id
    }

    fn node(&self, object: ObjectId) -> Option<&Node> {
        self.nodes.get(object.raw() as usize)
    }

    pub fn kind(&self, object: ObjectId) -> Option<ObjectKind> {
        self.node(object).map(|n| n.kind)
    }

    pub fn parent(&self, object: ObjectId) -> Option<ObjectId> {
        self.node(object).and_then(|n| n.parent)
    }

    /// Dotted path from the root, e.g. `top.cpu`
    pub fn full_name(&self, object: ObjectId) -> String {
        let mut parts = Vec::new();
        let mut current = Some(object);
        while let Some(id) = current {
            match self.node(id) {
                Some(node) => {
                    parts.push(node.name.as_str());
                    current = node.parent;
                }
                None => break,
            }
        }
        parts.reverse();
        parts.join(".")
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl HierarchySource for StaticHierarchy {
    fn roots(&self) -> Vec<ObjectId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.parent.is_none())
            .map(|(i, _)| ObjectId::new(i as u64))
            .collect()
    }

    fn is_module(&self, object: ObjectId) -> bool {
        self.kind(object) == Some(ObjectKind::Module)
    }

    fn children(&self, object: ObjectId) -> Vec<ObjectId> {
        self.node(object)
            .map(|n| n.children.clone())
            .unwrap_or_default()
    }

    fn display_name(&self, object: ObjectId) -> String {
        self.node(object).map(|n| n.name.clone()).unwrap_or_default()
    }
}

/// Declare every module of `source` and intern it in `registry`
///
/// Returns the number of modules declared.
pub(crate) fn register_all_modules<H, W>(
    source: &H,
    registry: &mut Registry,
    writer: &mut TraceWriter<W>,
) -> Result<usize>
where
    H: HierarchySource + ?Sized,
    W: Write,
{
    let mut declared = 0;
    for root in source.roots() {
        if source.is_module(root) {
            declared += register_module(source, root, registry, writer)?;
        }
    }
    Ok(declared)
}

fn register_module<H, W>(
    source: &H,
    module: ObjectId,
    registry: &mut Registry,
    writer: &mut TraceWriter<W>,
) -> Result<usize>
where
    H: HierarchySource + ?Sized,
    W: Write,
{
    let id = registry.declare_module(module);
    writer.open_module(id, &source.display_name(module))?;
    let mut declared = 1;
    for child in source.children(module) {
        if source.is_module(child) {
            declared += register_module(source, child, registry, writer)?;
        }
    }
    writer.close_module()?;
    Ok(declared)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn walk(tree: &StaticHierarchy) -> (Registry, String) {
        let mut registry = Registry::new();
        let mut writer = TraceWriter::new(Vec::new());
        writer.begin_document().unwrap();
        register_all_modules(tree, &mut registry, &mut writer).unwrap();
        let text = String::from_utf8(writer.into_inner()).unwrap();
        let body = text.split_once("<document>\n").unwrap().1.to_string();
        (registry, body)
    }

    #[test]
    fn test_roots_and_children() {
        let mut tree = StaticHierarchy::new();
        let a = tree.add_module(None, "a");
        let b = tree.add_module(Some(a), "b");
        let c = tree.add_object(Some(a), "c");
        let d = tree.add_module(None, "d");

        assert_eq!(tree.roots(), vec![a, d]);
        assert_eq!(tree.children(a), vec![b, c]);
        assert!(tree.is_module(b));
        assert!(!tree.is_module(c));
        assert_eq!(tree.parent(b), Some(a));
        assert_eq!(tree.display_name(c), "c");
    }

    #[test]
    fn test_walk_skips_non_modules() {
        let mut tree = StaticHierarchy::new();
        let a = tree.add_module(None, "A");
        let b = tree.add_module(Some(a), "B");
        let c = tree.add_object(Some(a), "C");
        tree.add_module(Some(c), "under_c");

        let (registry, text) = walk(&tree);
        assert_eq!(
            text,
            "<module id=\"M1\" name=\"A\">\n\
             <module id=\"M2\" name=\"B\">\n\
             </module>\n\
             </module>\n"
        );
        assert_eq!(registry.module_id(a).map(|id| id.value()), Some(1));
        assert_eq!(registry.module_id(b).map(|id| id.value()), Some(2));
        assert!(registry.module_id(c).is_none());
    }

    #[test]
    fn test_walk_is_preorder_across_roots() {
        let mut tree = StaticHierarchy::new();
        let top = tree.add_module(None, "top");
        let left = tree.add_module(Some(top), "left");
        tree.add_module(Some(left), "leaf");
        tree.add_module(Some(top), "right");
        tree.add_object(None, "stray_signal");
        tree.add_module(None, "tb");

        let (registry, text) = walk(&tree);
        let names: Vec<&str> = text
            .lines()
            .filter_map(|l| l.split("name=\"").nth(1))
            .map(|rest| rest.trim_end_matches("\">"))
            .collect();
        assert_eq!(names, vec!["top", "left", "leaf", "right", "tb"]);
        assert_eq!(registry.module_count(), 5);
    }

    #[test]
    fn test_full_name() {
        let mut tree = StaticHierarchy::new();
        let top = tree.add_module(None, "top");
        let mid = tree.add_module(Some(top), "mid");
        let leaf = tree.add_object(Some(mid), "port");
        assert_eq!(tree.full_name(leaf), "top.mid.port");
        assert_eq!(tree.len(), 3);
    }
}
