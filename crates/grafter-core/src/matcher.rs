/*!
# Pattern Matcher

Matches a left-hand [`Descriptor`] against a node and records what its holes
bound in an [`Environment`].

Every descriptor matches into a scratch environment and merges it into the
caller's environment only once the whole descriptor matched, so a failed
match never leaves partial bindings behind.
*/

use std::collections::HashMap;

use crate::model::{Data, Descriptor, HoleAttribute, Pattern};
use crate::tree::NodeRef;

/// Bindings of one match attempt.
#[derive(Debug, Default, Clone)]
pub struct Environment {
    children: HashMap<u32, Vec<NodeRef>>,
    data: HashMap<u32, String>,
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bind_children(&mut self, number: u32, nodes: Vec<NodeRef>) {
        self.children.insert(number, nodes);
    }

    /// Binds literal data. A later binding of the same number wins.
    pub fn bind_data(&mut self, number: u32, data: impl Into<String>) {
        self.data.insert(number, data.into());
    }

    pub fn children(&self, number: u32) -> Option<&[NodeRef]> {
        self.children.get(&number).map(Vec::as_slice)
    }

    pub fn data(&self, number: u32) -> Option<&str> {
        self.data.get(&number).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty() && self.data.is_empty()
    }

    pub fn clear(&mut self) {
        self.children.clear();
        self.data.clear();
    }

    /// Moves every binding of `other` into this environment.
    pub fn merge(&mut self, other: Environment) {
        self.children.extend(other.children);
        self.data.extend(other.data);
    }
}

/// Decides whether a node fits a pattern.
pub trait Matcher: Send + Sync {
    /// Returns true on a match. Bindings are written to `env` only on success.
    fn match_node(&self, node: &NodeRef, env: &mut Environment) -> bool;
}

/// Matcher for one descriptor, with sub-matchers cached per parameter.
#[derive(Debug, Clone)]
pub struct DescriptorMatcher {
    descriptor: Descriptor,
    relaxed: bool,
    nested: Vec<Option<DescriptorMatcher>>,
}

impl DescriptorMatcher {
    pub fn new(descriptor: Descriptor) -> Self {
        let nested = descriptor
            .parameters
            .iter()
            .map(|parameter| {
                parameter
                    .as_descriptor()
                    .map(|nested| DescriptorMatcher::new(nested.clone()))
            })
            .collect();
        Self {
            relaxed: descriptor.is_relaxed(),
            descriptor,
            nested,
        }
    }

    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    fn match_data(&self, node: &NodeRef, env: &mut Environment) -> bool {
        match &self.descriptor.data {
            Data::None => node.data().is_empty(),
            Data::Literal(expected) => node.data() == expected,
            Data::Hole(number) => {
                env.bind_data(*number, node.data());
                true
            }
        }
    }

    fn match_children(&self, node: &NodeRef, env: &mut Environment) -> bool {
        let children = node.children();
        let mut cursor = 0;
        for (parameter, nested) in self.descriptor.parameters.iter().zip(&self.nested) {
            match (parameter, nested) {
                (Pattern::Hole(hole), _) => {
                    let end = match &hole.attribute {
                        HoleAttribute::Single if cursor < children.len() => cursor + 1,
                        HoleAttribute::Single => return false,
                        HoleAttribute::Ellipsis => children.len(),
                        HoleAttribute::Typed(type_name) => {
                            cursor
                                + children[cursor..]
                                    .iter()
                                    .take_while(|child| child.type_name() == type_name)
                                    .count()
                        }
                    };
                    env.bind_children(hole.number, children[cursor..end].to_vec());
                    cursor = end;
                }
                (Pattern::Descriptor(_), Some(matcher)) => {
                    let Some(child) = children.get(cursor) else {
                        return false;
                    };
                    if !matcher.match_node(child, env) {
                        return false;
                    }
                    cursor += 1;
                }
                (Pattern::Descriptor(_), None) => return false,
            }
        }
        true
    }
}

impl Matcher for DescriptorMatcher {
    fn match_node(&self, node: &NodeRef, env: &mut Environment) -> bool {
        if !node.belongs_to(&self.descriptor.type_name) {
            return false;
        }
        if !self.relaxed && node.child_count() != self.descriptor.parameters.len() {
            return false;
        }
        let mut scratch = Environment::new();
        if !self.match_data(node, &mut scratch) || !self.match_children(node, &mut scratch) {
            return false;
        }
        env.merge(scratch);
        true
    }
}
