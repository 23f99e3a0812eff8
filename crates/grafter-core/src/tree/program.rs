//! Nodes typed by an analyzed language.
//!
//! Builders of these types enforce the declared shape: regular nodes place
//! their children through the child allocator, list nodes check every element
//! against the element group, and literal nodes carry data but no children.

use std::collections::HashMap;
use std::sync::Arc;

use indexmap::IndexSet;
use tracing::trace;

use super::{Builder, Factory, Node, NodeRef, Type};
use crate::allocator::allocate;
use crate::analyzer::LanguageView;
use crate::model::{ChildSlot, Vertex};

/// Shape of a concrete declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeKind {
    Regular,
    List { element: String },
    Literal { native_type: String },
}

/// A concrete node type declared in the rule program.
#[derive(Debug)]
pub struct ProgramType {
    name: String,
    hierarchy: IndexSet<String>,
    slots: Vec<ChildSlot>,
    kind: TypeKind,
}

impl ProgramType {
    /// Creates the runtime type for a vertex. Abstract vertices have none.
    pub fn from_vertex(vertex: &Vertex, hierarchy: IndexSet<String>) -> Option<Self> {
        let (slots, kind) = match vertex {
            Vertex::Regular(node) => (node.slots.clone(), TypeKind::Regular),
            Vertex::List(node) => (
                Vec::new(),
                TypeKind::List {
                    element: node.element.clone(),
                },
            ),
            Vertex::Literal(node) => (
                Vec::new(),
                TypeKind::Literal {
                    native_type: node.native_type.clone(),
                },
            ),
            Vertex::Abstract(_) => return None,
        };
        Some(Self {
            name: vertex.name().to_string(),
            hierarchy,
            slots,
            kind,
        })
    }

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }
}

impl Type for ProgramType {
    fn name(&self) -> &str {
        &self.name
    }

    fn hierarchy(&self) -> &IndexSet<String> {
        &self.hierarchy
    }

    fn child_slots(&self) -> &[ChildSlot] {
        &self.slots
    }

    fn create_builder(self: Arc<Self>) -> Box<dyn Builder> {
        let children = match self.kind {
            TypeKind::Regular => allocate(&[], &self.slots).map(|_| Vec::new()),
            TypeKind::List { .. } | TypeKind::Literal { .. } => Some(Vec::new()),
        };
        Box::new(ProgramBuilder {
            node_type: self,
            data: String::new(),
            data_accepted: true,
            children,
        })
    }
}

/// A node whose type comes from the rule program.
#[derive(Debug)]
pub struct ProgramNode {
    node_type: Arc<dyn Type>,
    data: String,
    children: Vec<NodeRef>,
}

impl Node for ProgramNode {
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

struct ProgramBuilder {
    node_type: Arc<ProgramType>,
    data: String,
    data_accepted: bool,
    /// `None` while the submitted children do not fit the type.
    children: Option<Vec<NodeRef>>,
}

impl Builder for ProgramBuilder {
    fn set_data(&mut self, data: &str) -> bool {
        self.data_accepted = match self.node_type.kind {
            TypeKind::Literal { .. } => true,
            TypeKind::Regular | TypeKind::List { .. } => data.is_empty(),
        };
        if self.data_accepted {
            self.data = data.to_string();
        }
        self.data_accepted
    }

    fn set_children(&mut self, children: Vec<NodeRef>) -> bool {
        let node_type = &self.node_type;
        self.children = match &node_type.kind {
            TypeKind::Regular => {
                allocate(&children, &node_type.slots).map(|slots| slots.into_iter().flatten().collect())
            }
            TypeKind::List { element } => children
                .iter()
                .all(|child| child.belongs_to(element))
                .then_some(children),
            TypeKind::Literal { .. } => children.is_empty().then_some(children),
        };
        if self.children.is_none() {
            trace!(node = %node_type.name, "children rejected");
        }
        self.children.is_some()
    }

    fn is_valid(&self) -> bool {
        self.data_accepted && self.children.is_some()
    }

    fn create_node(self: Box<Self>) -> NodeRef {
        assert!(
            self.is_valid(),
            "cannot finalize an invalid '{}' node",
            self.node_type.name
        );
        let builder = *self;
        Arc::new(ProgramNode {
            node_type: builder.node_type,
            data: builder.data,
            children: builder.children.unwrap_or_default(),
        })
    }
}

/// Factory for the concrete types visible from one language.
#[derive(Debug, Clone, Default)]
pub struct ProgramFactory {
    types: HashMap<String, Arc<ProgramType>>,
}

impl ProgramFactory {
    pub fn new(view: &LanguageView) -> Self {
        let mut types = HashMap::new();
        for vertex in view.vertices() {
            // The language's own declaration wins over a common one.
            if !view
                .vertex(vertex.name())
                .is_some_and(|visible| std::ptr::eq(visible, vertex))
            {
                continue;
            }
            let hierarchy = view
                .get_hierarchy(vertex.name())
                .cloned()
                .unwrap_or_default();
            if let Some(node_type) = ProgramType::from_vertex(vertex, hierarchy) {
                types.insert(vertex.name().to_string(), Arc::new(node_type));
            }
        }
        Self { types }
    }

    pub fn type_names(&self) -> impl Iterator<Item = &str> {
        self.types.keys().map(String::as_str)
    }
}

impl Factory for ProgramFactory {
    fn get_type(&self, name: &str) -> Option<Arc<dyn Type>> {
        self.types
            .get(name)
            .map(|node_type| Arc::clone(node_type) as Arc<dyn Type>)
    }
}
