//! JSON tree documents.
//!
//! A document has the form `{"root": {"type": T, "data": D, "children": [...]}}`
//! where `data` and `children` may be omitted. Trees are read through a
//! [`Factory`], so a typed factory checks every node against its schema.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tree::{Factory, NodeRef};

/// Errors from reading or writing JSON trees.
#[derive(Error, Debug)]
pub enum JsonError {
    #[error("Malformed tree document: {0}")]
    Syntax(#[from] serde_json::Error),

    #[error("Type '{type_name}' is unknown to the factory")]
    UnknownType { type_name: String },

    #[error("Node '{node}' rejected by its type")]
    Rejected { node: String },

    #[error("Tree is deeper than the limit of {limit}")]
    TooDeep { limit: usize },
}

/// Serialized form of one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JsonNode {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub data: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<JsonNode>,
}

impl JsonNode {
    pub fn from_node(node: &NodeRef) -> Self {
        Self {
            type_name: node.type_name().to_string(),
            data: node.data().to_string(),
            children: node.children().iter().map(JsonNode::from_node).collect(),
        }
    }

    fn depth(&self) -> usize {
        1 + self.children.iter().map(JsonNode::depth).max().unwrap_or(0)
    }

    fn build(&self, factory: &dyn Factory) -> Result<NodeRef, JsonError> {
        let children = self
            .children
            .iter()
            .map(|child| child.build(factory))
            .collect::<Result<Vec<_>, _>>()?;
        let mut builder = factory
            .create_builder(&self.type_name)
            .ok_or_else(|| JsonError::UnknownType {
                type_name: self.type_name.clone(),
            })?;
        if builder.set_data(&self.data) && builder.set_children(children) && builder.is_valid() {
            Ok(builder.create_node())
        } else {
            Err(JsonError::Rejected {
                node: self.type_name.clone(),
            })
        }
    }
}

/// A whole tree document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeDocument {
    pub root: JsonNode,
}

/// Reads a tree document, rejecting trees deeper than `max_depth`.
pub fn read_tree(text: &str, factory: &dyn Factory, max_depth: usize) -> Result<NodeRef, JsonError> {
    let document: TreeDocument = serde_json::from_str(text)?;
    if document.root.depth() > max_depth {
        return Err(JsonError::TooDeep { limit: max_depth });
    }
    document.root.build(factory)
}

/// Writes a tree as a pretty-printed document.
pub fn write_tree(root: &NodeRef) -> Result<String, JsonError> {
    let document = TreeDocument {
        root: JsonNode::from_node(root),
    };
    Ok(serde_json::to_string_pretty(&document)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::{DraftFactory, DraftNode};

    const ADDITION: &str = r#"{
        "root": {
            "type": "Addition",
            "children": [
                {"type": "IntegerLiteral", "data": "1"},
                {"type": "Name", "data": "x"}
            ]
        }
    }"#;

    #[test]
    fn test_read_tree() {
        let node = read_tree(ADDITION, &DraftFactory::new(), 8).unwrap();
        assert_eq!(node.to_string(), r#"Addition(IntegerLiteral<"1">, Name<"x">)"#);
    }

    #[test]
    fn test_write_omits_empty_fields() {
        let node = DraftNode::parse(r#"Return(Name<"x">)"#).unwrap();
        let text = write_tree(&node).unwrap();
        assert!(!text.contains("\"data\": \"\""));
        let again = read_tree(&text, &DraftFactory::new(), 8).unwrap();
        assert_eq!(again.to_string(), node.to_string());
    }

    #[test]
    fn test_depth_limit() {
        assert!(matches!(
            read_tree(ADDITION, &DraftFactory::new(), 1),
            Err(JsonError::TooDeep { limit: 1 })
        ));
        assert!(read_tree(ADDITION, &DraftFactory::new(), 2).is_ok());
    }

    #[test]
    fn test_malformed_document() {
        assert!(matches!(
            read_tree(r#"{"tree": {}}"#, &DraftFactory::new(), 8),
            Err(JsonError::Syntax(_))
        ));
    }
}
