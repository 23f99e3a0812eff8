/*!
# Runtime Trees

The node abstraction the matcher, creator and adapter operate on.

A [`Node`] is an immutable value: a type, a data string and an ordered list of
children. New nodes are only ever produced by a [`Builder`], which a [`Type`]
or a [`Factory`] hands out. Two families of node types ship with the crate:

- [`draft`]: schema-free nodes that accept any data and any children
- [`program`]: nodes typed by an analyzed language, whose builders enforce the
  declared child-slot contract
*/

use std::fmt;
use std::sync::Arc;

use indexmap::IndexSet;

use crate::model::ChildSlot;
use crate::model::hole::escape;

pub mod draft;
pub mod program;

pub use draft::{DraftFactory, DraftNode, DraftParseError, DraftType};
pub use program::{ProgramFactory, ProgramNode, ProgramType};

/// Shared handle to an immutable node.
pub type NodeRef = Arc<dyn Node>;

/// A node type: name, hierarchy and child-slot schema.
pub trait Type: fmt::Debug + Send + Sync {
    fn name(&self) -> &str;

    /// The type itself followed by every group it belongs to.
    fn hierarchy(&self) -> &IndexSet<String>;

    /// Declared child slots. Empty for types without a fixed schema.
    fn child_slots(&self) -> &[ChildSlot] {
        &[]
    }

    /// Returns a fresh builder producing nodes of this type.
    fn create_builder(self: Arc<Self>) -> Box<dyn Builder>;

    /// Hierarchy membership test.
    fn belongs_to(&self, group: &str) -> bool {
        self.hierarchy().contains(group)
    }
}

/// An immutable tree node.
pub trait Node: fmt::Debug + Send + Sync {
    fn node_type(&self) -> &Arc<dyn Type>;

    /// Literal data. Empty for nodes without data.
    fn data(&self) -> &str;

    fn children(&self) -> &[NodeRef];

    fn type_name(&self) -> &str {
        self.node_type().name()
    }

    fn belongs_to(&self, group: &str) -> bool {
        self.node_type().belongs_to(group)
    }

    fn child_count(&self) -> usize {
        self.children().len()
    }

    fn child(&self, index: usize) -> Option<&NodeRef> {
        self.children().get(index)
    }
}

/// Accumulates data and children, then finalizes into a node.
pub trait Builder {
    /// Returns false when the type does not accept this data.
    fn set_data(&mut self, data: &str) -> bool;

    /// Returns false when the children do not fit the type's schema.
    fn set_children(&mut self, children: Vec<NodeRef>) -> bool;

    fn is_valid(&self) -> bool;

    /// Finalizes the node.
    ///
    /// # Panics
    /// Panics when the builder is not valid. Callers must check
    /// [`Builder::is_valid`] first.
    fn create_node(self: Box<Self>) -> NodeRef;
}

/// Resolves type names to node types.
pub trait Factory: Send + Sync {
    fn get_type(&self, name: &str) -> Option<Arc<dyn Type>>;

    fn create_builder(&self, name: &str) -> Option<Box<dyn Builder>> {
        self.get_type(name).map(|ty| ty.create_builder())
    }
}

impl fmt::Display for dyn Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.type_name())?;
        if !self.data().is_empty() {
            write!(f, "<\"{}\">", escape(self.data()))?;
        }
        let children = self.children();
        if !children.is_empty() {
            f.write_str("(")?;
            for (index, child) in children.iter().enumerate() {
                if index > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", child)?;
            }
            f.write_str(")")?;
        }
        Ok(())
    }
}

/// Structural comparison: type names, data and children, recursively.
pub fn deep_compare(left: &NodeRef, right: &NodeRef) -> bool {
    if Arc::ptr_eq(left, right) {
        return true;
    }
    left.type_name() == right.type_name()
        && left.data() == right.data()
        && left.child_count() == right.child_count()
        && left
            .children()
            .iter()
            .zip(right.children())
            .all(|(a, b)| deep_compare(a, b))
}

/// One entry of a post-order walk.
#[derive(Debug, Clone)]
pub struct Visit {
    pub node: NodeRef,
    /// Index of the parent entry in the walk; `None` for the root.
    pub parent: Option<usize>,
    /// Position of the node in its parent's children.
    pub position: usize,
    pub depth: usize,
}

/// Flattens a tree into post-order: every subtree before its root, children
/// left to right.
pub fn post_order(root: &NodeRef) -> Vec<Visit> {
    // Pre-order with children pushed left to right pops them right to left;
    // reversing that sequence yields post-order.
    let mut reversed: Vec<Visit> = Vec::new();
    let mut stack = vec![(Arc::clone(root), None, 0, 0)];
    while let Some((node, parent, position, depth)) = stack.pop() {
        let index = reversed.len();
        for (child_position, child) in node.children().iter().enumerate() {
            stack.push((Arc::clone(child), Some(index), child_position, depth + 1));
        }
        reversed.push(Visit {
            node,
            parent,
            position,
            depth,
        });
    }
    let last = reversed.len().saturating_sub(1);
    reversed.reverse();
    for visit in &mut reversed {
        visit.parent = visit.parent.map(|parent| last - parent);
    }
    reversed
}

/// Rebuilds `node` with the same type and data but new children.
///
/// Returns `None` when the node's type rejects the new children.
pub fn rebuild(node: &NodeRef, children: Vec<NodeRef>) -> Option<NodeRef> {
    let mut builder = Arc::clone(node.node_type()).create_builder();
    let accepted = builder.set_data(node.data()) && builder.set_children(children);
    if accepted && builder.is_valid() {
        Some(builder.create_node())
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_uses_draft_notation() {
        let node = DraftNode::parse(r#"Addition(IntegerLiteral<"1">, Name<"a\"b">)"#).unwrap();
        assert_eq!(
            node.to_string(),
            r#"Addition(IntegerLiteral<"1">, Name<"a\"b">)"#
        );
    }

    #[test]
    fn test_deep_compare() {
        let a = DraftNode::parse(r#"A(B<"x">, C)"#).unwrap();
        let b = DraftNode::parse(r#"A(B<"x">, C)"#).unwrap();
        let c = DraftNode::parse(r#"A(B<"y">, C)"#).unwrap();
        assert!(deep_compare(&a, &b));
        assert!(!deep_compare(&a, &c));
    }

    #[test]
    fn test_post_order() {
        let root = DraftNode::parse("A(B(C, D), E)").unwrap();
        let walk = post_order(&root);
        let names: Vec<_> = walk.iter().map(|visit| visit.node.type_name()).collect();
        assert_eq!(names, vec!["C", "D", "B", "E", "A"]);

        let parents: Vec<_> = walk.iter().map(|visit| visit.parent).collect();
        assert_eq!(parents, vec![Some(2), Some(2), Some(4), Some(4), None]);
        let positions: Vec<_> = walk.iter().map(|visit| visit.position).collect();
        assert_eq!(positions, vec![0, 1, 0, 1, 0]);
        assert_eq!(walk[0].depth, 2);
    }

    #[test]
    fn test_rebuild_keeps_type_and_data() {
        let node = DraftNode::parse(r#"Name<"x">(A)"#).unwrap();
        let replaced = rebuild(&node, vec![DraftNode::create("B", "", vec![])]).unwrap();
        assert_eq!(replaced.to_string(), r#"Name<"x">(B)"#);
    }
}
