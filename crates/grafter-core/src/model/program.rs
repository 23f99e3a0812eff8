use std::fmt;

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use super::descriptor::{Descriptor, Pattern};
use super::vertex::Vertex;

/// Name of the namespace shared by every language.
pub const COMMON_LANGUAGE: &str = "common";

fn common_language() -> String {
    COMMON_LANGUAGE.to_string()
}

/// A tree-to-tree rule `left -> right`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transformation {
    pub left: Descriptor,
    pub right: Pattern,
}

impl Transformation {
    pub fn new(left: Descriptor, right: impl Into<Pattern>) -> Self {
        Self {
            left,
            right: right.into(),
        }
    }
}

impl fmt::Display for Transformation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.left, self.right)
    }
}

/// Body of one DSL statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Instruction {
    Vertex(Vertex),
    Transformation(Transformation),
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::Vertex(vertex) => vertex.fmt(f),
            Instruction::Transformation(rule) => rule.fmt(f),
        }
    }
}

/// A statement together with the language section it was declared in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Statement {
    #[serde(default = "common_language")]
    pub language: String,
    pub instruction: Instruction,
}

/// Every declaration of a DSL program, across all languages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    #[serde(default)]
    pub statements: Vec<Statement>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_vertex(&mut self, language: &str, vertex: impl Into<Vertex>) -> &mut Self {
        self.statements.push(Statement {
            language: language.to_string(),
            instruction: Instruction::Vertex(vertex.into()),
        });
        self
    }

    pub fn add_transformation(&mut self, language: &str, rule: Transformation) -> &mut Self {
        self.statements.push(Statement {
            language: language.to_string(),
            instruction: Instruction::Transformation(rule),
        });
        self
    }

    /// All vertices with their language, in declaration order.
    pub fn vertices(&self) -> impl Iterator<Item = (&str, &Vertex)> {
        self.statements.iter().filter_map(|s| match &s.instruction {
            Instruction::Vertex(vertex) => Some((s.language.as_str(), vertex)),
            Instruction::Transformation(_) => None,
        })
    }

    /// Vertices that describe concrete nodes (everything except abstract ones).
    pub fn node_descriptors(&self) -> impl Iterator<Item = (&str, &Vertex)> {
        self.vertices().filter(|(_, vertex)| !vertex.is_abstract())
    }

    /// All transformation rules with their language, in declaration order.
    pub fn transformations(&self) -> impl Iterator<Item = (&str, &Transformation)> {
        self.statements.iter().filter_map(|s| match &s.instruction {
            Instruction::Transformation(rule) => Some((s.language.as_str(), rule)),
            Instruction::Vertex(_) => None,
        })
    }

    /// Language names present in the program, in order of first appearance.
    pub fn languages(&self) -> IndexSet<&str> {
        self.statements.iter().map(|s| s.language.as_str()).collect()
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut current: Option<&str> = None;
        for statement in &self.statements {
            if current != Some(statement.language.as_str()) {
                writeln!(f, "{}:", statement.language)?;
                current = Some(statement.language.as_str());
            }
            writeln!(f, "  {};", statement.instruction)?;
        }
        Ok(())
    }
}
