use std::fmt;

use serde::{Deserialize, Serialize};

/// How many children a hole binds when it appears as a descriptor parameter.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoleAttribute {
    /// Binds exactly one child (`#1`).
    Single,
    /// Binds every remaining child (`#1...`). Only legal as the last parameter.
    Ellipsis,
    /// Binds the longest run of consecutive children whose type name equals
    /// the given one (`Type#1...`).
    Typed(String),
}

/// A numbered placeholder inside a pattern.
///
/// Holes with the same number refer to the same binding within one rule.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hole {
    pub number: u32,
    pub attribute: HoleAttribute,
}

impl Hole {
    pub fn single(number: u32) -> Self {
        Self {
            number,
            attribute: HoleAttribute::Single,
        }
    }

    pub fn ellipsis(number: u32) -> Self {
        Self {
            number,
            attribute: HoleAttribute::Ellipsis,
        }
    }

    pub fn typed(number: u32, type_name: impl Into<String>) -> Self {
        Self {
            number,
            attribute: HoleAttribute::Typed(type_name.into()),
        }
    }

    /// True for holes that may bind a variable number of children.
    pub fn is_variadic(&self) -> bool {
        !matches!(self.attribute, HoleAttribute::Single)
    }
}

impl fmt::Display for Hole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.attribute {
            HoleAttribute::Single => write!(f, "#{}", self.number),
            HoleAttribute::Ellipsis => write!(f, "#{}...", self.number),
            HoleAttribute::Typed(name) => write!(f, "{}#{}...", name, self.number),
        }
    }
}

/// The data constraint of a descriptor.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Data {
    /// The node must carry no data.
    #[default]
    None,
    /// The node data must equal this string exactly.
    Literal(String),
    /// The node data is bound to the given hole number.
    Hole(u32),
}

impl Data {
    pub fn literal(value: impl Into<String>) -> Self {
        Data::Literal(value.into())
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Data::None)
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Data::None => Ok(()),
            Data::Literal(value) => write!(f, "<\"{}\">", escape(value)),
            Data::Hole(number) => write!(f, "<#{}>", number),
        }
    }
}

/// Escapes quotes and backslashes for the textual notations.
pub(crate) fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        if ch == '"' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}
