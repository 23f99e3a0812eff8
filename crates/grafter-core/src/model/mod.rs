/*!
# Rule Model

Immutable data describing node shapes and transformation patterns.

Everything here is plain data: construction, inspection, textual rendering
and serde (de)serialization. Resolution of names, hierarchy checks and tag
propagation live in [`crate::analyzer`].
*/

pub mod descriptor;
pub mod hole;
pub mod program;
pub mod vertex;

pub use descriptor::{Descriptor, DescriptorAttribute, HoleRef, Pattern};
pub use hole::{Data, Hole, HoleAttribute};
pub use program::{Instruction, Program, Statement, Transformation, COMMON_LANGUAGE};
pub use vertex::{AbstractNode, ChildSlot, ListNode, LiteralNode, RegularNode, Vertex};

/// Errors raised while building model objects from declarations.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    /// A list child was mixed with other children.
    #[error("Node '{node}' mixes a list child with other children")]
    MixedListDeclaration { node: String },

    /// A child declaration carried parameters or data.
    #[error("Child '{child}' of node '{node}' must be a plain type reference")]
    InvalidChildDeclaration { node: String, child: String },
}
