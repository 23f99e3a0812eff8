use std::fmt;

use serde::{Deserialize, Serialize};

use super::descriptor::{Descriptor, DescriptorAttribute};
use super::hole::escape;
use super::ModelError;

/// One declared child position of a regular node.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChildSlot {
    /// Required type or group name.
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default)]
    pub optional: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
}

impl ChildSlot {
    pub fn mandatory(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            optional: false,
            tag: None,
        }
    }

    pub fn optional(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            optional: true,
            tag: None,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }
}

impl fmt::Display for ChildSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.optional {
            f.write_str("[")?;
        }
        if let Some(tag) = &self.tag {
            write!(f, "{}@", tag)?;
        }
        f.write_str(&self.type_name)?;
        if self.optional {
            f.write_str("]")?;
        }
        Ok(())
    }
}

/// A node with a fixed, ordered list of child slots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegularNode {
    pub name: String,
    #[serde(default)]
    pub slots: Vec<ChildSlot>,
}

impl RegularNode {
    pub fn new(name: impl Into<String>, slots: Vec<ChildSlot>) -> Self {
        Self {
            name: name.into(),
            slots,
        }
    }

    /// Lower bound on the child count.
    pub fn mandatory_count(&self) -> usize {
        self.slots.iter().filter(|slot| !slot.optional).count()
    }

    pub fn tagged_slots(&self) -> impl Iterator<Item = (&str, &ChildSlot)> {
        self.slots
            .iter()
            .filter_map(|slot| slot.tag.as_deref().map(|tag| (tag, slot)))
    }
}

/// A named union of subtypes. Has no children or data of its own.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbstractNode {
    pub name: String,
    pub subtypes: Vec<String>,
}

impl AbstractNode {
    pub fn new<I, S>(name: impl Into<String>, subtypes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            subtypes: subtypes.into_iter().map(Into::into).collect(),
        }
    }
}

/// A node with a variable number of children of one type or group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListNode {
    pub name: String,
    pub element: String,
}

impl ListNode {
    pub fn new(name: impl Into<String>, element: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            element: element.into(),
        }
    }
}

/// A leaf carrying a native value rendered as data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LiteralNode {
    pub name: String,
    /// Native value class, e.g. `int`.
    pub native_type: String,
    /// Expression turning the native value into text; `#` stands for the value.
    pub stringifier: String,
    /// Expression turning text back into the native value; `#` stands for the text.
    pub parser: String,
    /// Exception type the parser may raise on malformed input.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exception: Option<String>,
}

impl LiteralNode {
    pub fn new(
        name: impl Into<String>,
        native_type: impl Into<String>,
        stringifier: impl Into<String>,
        parser: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            native_type: native_type.into(),
            stringifier: stringifier.into(),
            parser: parser.into(),
            exception: None,
        }
    }

    pub fn with_exception(mut self, exception: impl Into<String>) -> Self {
        self.exception = Some(exception.into());
        self
    }
}

/// Any declared node shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Vertex {
    Regular(RegularNode),
    Abstract(AbstractNode),
    List(ListNode),
    Literal(LiteralNode),
}

impl Vertex {
    /// Builds a vertex from a node declaration `name <- children`.
    ///
    /// A single child with the `List` attribute declares a list node, anything
    /// else declares a regular node whose optional children come from the
    /// `Optional` attribute.
    pub fn from_declaration(
        name: impl Into<String>,
        children: Vec<Descriptor>,
    ) -> Result<Self, ModelError> {
        let name = name.into();
        for child in &children {
            if !child.parameters.is_empty() || !child.data.is_none() {
                return Err(ModelError::InvalidChildDeclaration {
                    node: name,
                    child: child.to_string(),
                });
            }
        }
        let lists = children
            .iter()
            .filter(|child| child.attribute == DescriptorAttribute::List)
            .count();
        if lists > 0 {
            if children.len() != 1 {
                return Err(ModelError::MixedListDeclaration { node: name });
            }
            let element = children
                .into_iter()
                .next()
                .map(|child| child.type_name)
                .unwrap_or_default();
            return Ok(Vertex::List(ListNode::new(name, element)));
        }
        let slots = children
            .into_iter()
            .map(|child| ChildSlot {
                optional: child.attribute == DescriptorAttribute::Optional,
                type_name: child.type_name,
                tag: child.tag,
            })
            .collect();
        Ok(Vertex::Regular(RegularNode::new(name, slots)))
    }

    pub fn name(&self) -> &str {
        match self {
            Vertex::Regular(node) => &node.name,
            Vertex::Abstract(node) => &node.name,
            Vertex::List(node) => &node.name,
            Vertex::Literal(node) => &node.name,
        }
    }

    pub fn is_abstract(&self) -> bool {
        matches!(self, Vertex::Abstract(_))
    }

    pub fn as_regular(&self) -> Option<&RegularNode> {
        match self {
            Vertex::Regular(node) => Some(node),
            _ => None,
        }
    }

    pub fn as_abstract(&self) -> Option<&AbstractNode> {
        match self {
            Vertex::Abstract(node) => Some(node),
            _ => None,
        }
    }

    /// Names of the types this vertex refers to as children.
    pub fn child_type_names(&self) -> Vec<&str> {
        match self {
            Vertex::Regular(node) => node.slots.iter().map(|s| s.type_name.as_str()).collect(),
            Vertex::List(node) => vec![node.element.as_str()],
            Vertex::Abstract(_) | Vertex::Literal(_) => Vec::new(),
        }
    }
}

impl From<RegularNode> for Vertex {
    fn from(node: RegularNode) -> Self {
        Vertex::Regular(node)
    }
}

impl From<AbstractNode> for Vertex {
    fn from(node: AbstractNode) -> Self {
        Vertex::Abstract(node)
    }
}

impl From<ListNode> for Vertex {
    fn from(node: ListNode) -> Self {
        Vertex::List(node)
    }
}

impl From<LiteralNode> for Vertex {
    fn from(node: LiteralNode) -> Self {
        Vertex::Literal(node)
    }
}

impl fmt::Display for Vertex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} <- ", self.name())?;
        match self {
            Vertex::Regular(node) => {
                if node.slots.is_empty() {
                    return f.write_str("0");
                }
                for (index, slot) in node.slots.iter().enumerate() {
                    if index > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", slot)?;
                }
                Ok(())
            }
            Vertex::Abstract(node) => f.write_str(&node.subtypes.join(" | ")),
            Vertex::List(node) => write!(f, "{{{}}}", node.element),
            Vertex::Literal(node) => {
                write!(
                    f,
                    "'{}', '{}', '{}'",
                    escape(&node.native_type),
                    escape(&node.stringifier),
                    escape(&node.parser)
                )?;
                if let Some(exception) = &node.exception {
                    write!(f, ", '{}'", escape(exception))?;
                }
                Ok(())
            }
        }
    }
}
