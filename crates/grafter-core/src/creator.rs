//! Builds right-hand patterns into nodes from match bindings.

use tracing::trace;

use crate::matcher::Environment;
use crate::model::{Data, Descriptor, Pattern};
use crate::tree::{Factory, NodeRef};

/// Produces a node from an environment, or `None` when no consistent node
/// can be built.
pub trait Creator: Send + Sync {
    fn create(&self, env: &Environment, factory: &dyn Factory) -> Option<NodeRef>;
}

/// Creator for a right-hand pattern, with nested creators cached per
/// parameter position.
#[derive(Debug, Clone)]
pub struct DescriptorCreator {
    pattern: Pattern,
    nested: Vec<Option<DescriptorCreator>>,
}

impl DescriptorCreator {
    pub fn new(pattern: impl Into<Pattern>) -> Self {
        let pattern = pattern.into();
        let nested = match &pattern {
            Pattern::Descriptor(descriptor) => descriptor
                .parameters
                .iter()
                .map(|parameter| match parameter {
                    Pattern::Descriptor(nested) => Some(DescriptorCreator::new(nested.clone())),
                    Pattern::Hole(_) => None,
                })
                .collect(),
            Pattern::Hole(_) => Vec::new(),
        };
        Self { pattern, nested }
    }

    pub fn pattern(&self) -> &Pattern {
        &self.pattern
    }

    fn create_descriptor(
        &self,
        descriptor: &Descriptor,
        env: &Environment,
        factory: &dyn Factory,
    ) -> Option<NodeRef> {
        let mut builder = factory.create_builder(&descriptor.type_name)?;

        let mut children = Vec::new();
        for (parameter, nested) in descriptor.parameters.iter().zip(&self.nested) {
            match (parameter, nested) {
                (Pattern::Hole(hole), _) => {
                    children.extend(env.children(hole.number).unwrap_or_default().iter().cloned());
                }
                (Pattern::Descriptor(_), Some(creator)) => children.push(creator.create(env, factory)?),
                (Pattern::Descriptor(_), None) => return None,
            }
        }
        if !builder.set_children(children) {
            trace!(node = %descriptor.type_name, "builder rejected children");
            return None;
        }

        let accepted = match &descriptor.data {
            Data::None => true,
            Data::Literal(data) => builder.set_data(data),
            Data::Hole(number) => builder.set_data(env.data(*number)?),
        };
        if !accepted || !builder.is_valid() {
            trace!(node = %descriptor.type_name, "builder not valid");
            return None;
        }
        Some(builder.create_node())
    }
}

impl Creator for DescriptorCreator {
    fn create(&self, env: &Environment, factory: &dyn Factory) -> Option<NodeRef> {
        match &self.pattern {
            Pattern::Hole(hole) => match env.children(hole.number)? {
                [node] => Some(node.clone()),
                _ => None,
            },
            Pattern::Descriptor(descriptor) => self.create_descriptor(descriptor, env, factory),
        }
    }
}
