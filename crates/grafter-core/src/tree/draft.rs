//! Schema-free nodes and the draft notation `Type<"data">(child, ...)`.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexSet;
use nom::{
    branch::alt,
    bytes::complete::{escaped_transform, is_not, tag},
    character::complete::{alpha1, alphanumeric1, char, multispace0},
    combinator::{all_consuming, cut, map, opt, recognize, value},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult,
};

use super::{Builder, Factory, Node, NodeRef, Type};

/// A type that accepts any data and any children.
#[derive(Debug)]
pub struct DraftType {
    name: String,
    hierarchy: IndexSet<String>,
}

impl DraftType {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_groups(name, Vec::<String>::new())
    }

    /// A draft type that also belongs to the given groups.
    pub fn with_groups<I, S>(name: impl Into<String>, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let name = name.into();
        let mut hierarchy = IndexSet::new();
        hierarchy.insert(name.clone());
        hierarchy.extend(groups.into_iter().map(Into::into));
        Self { name, hierarchy }
    }
}

impl Type for DraftType {
    fn name(&self) -> &str {
        &self.name
    }

    fn hierarchy(&self) -> &IndexSet<String> {
        &self.hierarchy
    }

    fn create_builder(self: Arc<Self>) -> Box<dyn Builder> {
        Box::new(DraftBuilder {
            node_type: self,
            data: String::new(),
            children: Vec::new(),
        })
    }
}

/// A generic node with no schema.
#[derive(Debug)]
pub struct DraftNode {
    node_type: Arc<dyn Type>,
    data: String,
    children: Vec<NodeRef>,
}

impl DraftNode {
    /// Creates a draft node directly.
    pub fn create(type_name: &str, data: &str, children: Vec<NodeRef>) -> NodeRef {
        Arc::new(DraftNode {
            node_type: Arc::new(DraftType::new(type_name)),
            data: data.to_string(),
            children,
        })
    }

    /// Parses the draft notation into schema-free nodes.
    pub fn parse(text: &str) -> Result<NodeRef, DraftParseError> {
        parse_tree(text, &DraftFactory::new())
    }
}

impl Node for DraftNode {
    fn node_type(&self) -> &Arc<dyn Type> {
        &self.node_type
    }

    fn data(&self) -> &str {
        &self.data
    }

    fn children(&self) -> &[NodeRef] {
        &self.children
    }
}

struct DraftBuilder {
    node_type: Arc<DraftType>,
    data: String,
    children: Vec<NodeRef>,
}

impl Builder for DraftBuilder {
    fn set_data(&mut self, data: &str) -> bool {
        self.data = data.to_string();
        true
    }

    fn set_children(&mut self, children: Vec<NodeRef>) -> bool {
        self.children = children;
        true
    }

    fn is_valid(&self) -> bool {
        true
    }

    fn create_node(self: Box<Self>) -> NodeRef {
        let builder = *self;
        Arc::new(DraftNode {
            node_type: builder.node_type,
            data: builder.data,
            children: builder.children,
        })
    }
}

/// Factory creating draft types for any name.
///
/// Group memberships registered with [`DraftFactory::with_groups`] let draft
/// nodes take part in hierarchy checks without an analyzed program.
#[derive(Debug, Default, Clone)]
pub struct DraftFactory {
    groups: HashMap<String, Vec<String>>,
}

impl DraftFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_groups<I, S>(mut self, type_name: &str, groups: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.groups
            .entry(type_name.to_string())
            .or_default()
            .extend(groups.into_iter().map(Into::into));
        self
    }
}

impl Factory for DraftFactory {
    fn get_type(&self, name: &str) -> Option<Arc<dyn Type>> {
        let groups = self.groups.get(name).cloned().unwrap_or_default();
        Some(Arc::new(DraftType::with_groups(name, groups)))
    }
}

/// Errors from reading the draft notation.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum DraftParseError {
    #[error("Syntax error at offset {offset}: unexpected '{found}'")]
    Syntax { offset: usize, found: String },

    #[error("Type '{type_name}' is unknown to the factory")]
    UnknownType { type_name: String },

    #[error("Node '{node}' rejected by its type")]
    Rejected { node: String },

    #[error("Tree is deeper than {limit} levels")]
    TooDeep { limit: usize },
}

/// Parsed form before types are resolved.
#[derive(Debug, Clone, PartialEq)]
struct RawNode {
    type_name: String,
    data: String,
    children: Vec<RawNode>,
}

/// Parses the draft notation, creating every node through `factory`.
pub fn parse_tree(text: &str, factory: &dyn Factory) -> Result<NodeRef, DraftParseError> {
    parse_tree_with_limit(text, factory, usize::MAX)
}

/// Like [`parse_tree`], but rejects text nesting nodes deeper than
/// `max_depth` before any recursive parsing happens.
pub fn parse_tree_with_limit(
    text: &str,
    factory: &dyn Factory,
    max_depth: usize,
) -> Result<NodeRef, DraftParseError> {
    if nesting_depth(text) > max_depth {
        return Err(DraftParseError::TooDeep { limit: max_depth });
    }
    let raw = match all_consuming(delimited(multispace0, raw_node, multispace0))(text) {
        Ok((_, raw)) => raw,
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => {
            let offset = text.len() - e.input.len();
            let found = e.input.chars().take(12).collect::<String>();
            return Err(DraftParseError::Syntax { offset, found });
        }
        Err(nom::Err::Incomplete(_)) => {
            return Err(DraftParseError::Syntax {
                offset: text.len(),
                found: String::new(),
            })
        }
    };
    build(&raw, factory)
}

/// Upper bound of the node depth: one plus the deepest parenthesis nesting
/// outside quoted data.
fn nesting_depth(text: &str) -> usize {
    let mut depth = 0usize;
    let mut deepest = 0usize;
    let mut chars = text.chars();
    while let Some(c) = chars.next() {
        match c {
            '"' => {
                while let Some(c) = chars.next() {
                    match c {
                        '\\' => {
                            chars.next();
                        }
                        '"' => break,
                        _ => {}
                    }
                }
            }
            '(' => {
                depth += 1;
                deepest = deepest.max(depth);
            }
            ')' => depth = depth.saturating_sub(1),
            _ => {}
        }
    }
    deepest + 1
}

fn build(raw: &RawNode, factory: &dyn Factory) -> Result<NodeRef, DraftParseError> {
    let children = raw
        .children
        .iter()
        .map(|child| build(child, factory))
        .collect::<Result<Vec<_>, _>>()?;
    let mut builder =
        factory
            .create_builder(&raw.type_name)
            .ok_or_else(|| DraftParseError::UnknownType {
                type_name: raw.type_name.clone(),
            })?;
    if builder.set_data(&raw.data) && builder.set_children(children) && builder.is_valid() {
        Ok(builder.create_node())
    } else {
        Err(DraftParseError::Rejected {
            node: raw.type_name.clone(),
        })
    }
}

fn identifier(input: &str) -> IResult<&str, &str> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))(input)
}

fn quoted(input: &str) -> IResult<&str, String> {
    map(
        delimited(
            char('"'),
            opt(escaped_transform(
                is_not("\\\""),
                '\\',
                alt((value("\\", tag("\\")), value("\"", tag("\"")))),
            )),
            char('"'),
        ),
        Option::unwrap_or_default,
    )(input)
}

fn data(input: &str) -> IResult<&str, String> {
    delimited(
        char('<'),
        cut(delimited(multispace0, quoted, multispace0)),
        cut(char('>')),
    )(input)
}

fn children(input: &str) -> IResult<&str, Vec<RawNode>> {
    preceded(
        char('('),
        cut(terminated(
            separated_list0(
                tuple((multispace0, char(','))),
                delimited(multispace0, raw_node, multispace0),
            ),
            tuple((multispace0, char(')'))),
        )),
    )(input)
}

fn raw_node(input: &str) -> IResult<&str, RawNode> {
    map(
        tuple((
            identifier,
            opt(preceded(multispace0, data)),
            opt(preceded(multispace0, children)),
        )),
        |(type_name, data, children)| RawNode {
            type_name: type_name.to_string(),
            data: data.unwrap_or_default(),
            children: children.unwrap_or_default(),
        },
    )(input)
}
