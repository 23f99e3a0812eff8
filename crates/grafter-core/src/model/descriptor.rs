use std::fmt;

use serde::{Deserialize, Serialize};

use super::hole::{Data, Hole};

/// Marks a descriptor used as a child slot of a node declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DescriptorAttribute {
    #[default]
    None,
    /// `[Type]`: the slot may stay empty.
    Optional,
    /// `{Type}`: the declaring node is a list of this type.
    List,
}

/// One element of a pattern: either a hole or a nested descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pattern {
    Hole(Hole),
    Descriptor(Descriptor),
}

impl Pattern {
    pub fn as_descriptor(&self) -> Option<&Descriptor> {
        match self {
            Pattern::Descriptor(descriptor) => Some(descriptor),
            Pattern::Hole(_) => None,
        }
    }

    pub fn as_hole(&self) -> Option<&Hole> {
        match self {
            Pattern::Hole(hole) => Some(hole),
            Pattern::Descriptor(_) => None,
        }
    }

    /// Visits every hole in this pattern, depth first.
    pub fn visit_holes<'a>(&'a self, visitor: &mut impl FnMut(HoleRef<'a>)) {
        match self {
            Pattern::Hole(hole) => visitor(HoleRef::Child(hole)),
            Pattern::Descriptor(descriptor) => descriptor.visit_holes(visitor),
        }
    }
}

impl From<Descriptor> for Pattern {
    fn from(descriptor: Descriptor) -> Self {
        Pattern::Descriptor(descriptor)
    }
}

impl From<Hole> for Pattern {
    fn from(hole: Hole) -> Self {
        Pattern::Hole(hole)
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Hole(hole) => hole.fmt(f),
            Pattern::Descriptor(descriptor) => descriptor.fmt(f),
        }
    }
}

/// A hole found while walking a pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HoleRef<'a> {
    /// A hole standing for children.
    Child(&'a Hole),
    /// A hole standing for the data of a node.
    Data(u32),
}

/// A pattern or schema node: type name, parameters and data constraint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Descriptor {
    /// Symbolic name addressing this child slot (`tag@Type`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    /// Type or group name.
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Pattern>,
    #[serde(default, skip_serializing_if = "Data::is_none")]
    pub data: Data,
    #[serde(default)]
    pub attribute: DescriptorAttribute,
}

impl Descriptor {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            tag: None,
            type_name: type_name.into(),
            parameters: Vec::new(),
            data: Data::None,
            attribute: DescriptorAttribute::None,
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    pub fn with_data(mut self, data: Data) -> Self {
        self.data = data;
        self
    }

    pub fn with_attribute(mut self, attribute: DescriptorAttribute) -> Self {
        self.attribute = attribute;
        self
    }

    pub fn optional(self) -> Self {
        self.with_attribute(DescriptorAttribute::Optional)
    }

    pub fn list(self) -> Self {
        self.with_attribute(DescriptorAttribute::List)
    }

    /// Appends a parameter.
    pub fn param(mut self, parameter: impl Into<Pattern>) -> Self {
        self.parameters.push(parameter.into());
        self
    }

    pub fn hole(self, number: u32) -> Self {
        self.param(Hole::single(number))
    }

    pub fn ellipsis(self, number: u32) -> Self {
        self.param(Hole::ellipsis(number))
    }

    pub fn typed_hole(self, number: u32, type_name: impl Into<String>) -> Self {
        self.param(Hole::typed(number, type_name))
    }

    /// True when a variadic hole removes the exact child-count constraint.
    pub fn is_relaxed(&self) -> bool {
        self.parameters
            .iter()
            .any(|p| matches!(p, Pattern::Hole(hole) if hole.is_variadic()))
    }

    /// True when neither the descriptor nor any nested descriptor contains a hole.
    pub fn is_static(&self) -> bool {
        let mut found = false;
        self.visit_holes(&mut |_| found = true);
        !found
    }

    /// Visits every child and data hole, depth first, left to right.
    pub fn visit_holes<'a>(&'a self, visitor: &mut impl FnMut(HoleRef<'a>)) {
        if let Data::Hole(number) = self.data {
            visitor(HoleRef::Data(number));
        }
        for parameter in &self.parameters {
            parameter.visit_holes(visitor);
        }
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (open, close) = match self.attribute {
            DescriptorAttribute::None => ("", ""),
            DescriptorAttribute::Optional => ("[", "]"),
            DescriptorAttribute::List => ("{", "}"),
        };
        f.write_str(open)?;
        if let Some(tag) = &self.tag {
            write!(f, "{}@", tag)?;
        }
        write!(f, "{}{}", self.type_name, self.data)?;
        if !self.parameters.is_empty() {
            f.write_str("(")?;
            for (index, parameter) in self.parameters.iter().enumerate() {
                if index > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", parameter)?;
            }
            f.write_str(")")?;
        }
        f.write_str(close)
    }
}
