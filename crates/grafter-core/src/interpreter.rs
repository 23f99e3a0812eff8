/*!
# Interpreter

Runs the transformation rules of one analyzed language over trees.

Rules are compiled into converters in the order the language view lists
them: the language's own rules first, then the common ones. Nodes are created
through a [`ProgramFactory`] for the same language unless another factory is
supplied.
*/

use std::sync::Arc;

use tracing::{debug, info};

use crate::adapter::{Adapter, Conversion, Converter};
use crate::analyzer::LanguageView;
use crate::json::read_tree;
use crate::tree::draft::parse_tree_with_limit;
use crate::tree::{Factory, NodeRef, ProgramFactory};
use crate::ConversionMode;

/// Result of running the interpreter in one [`ConversionMode`].
#[derive(Debug, Clone)]
pub enum Outcome {
    Converted(Conversion),
    /// `None` when the selected conversion does not exist.
    Selected(Option<Conversion>),
    Counted(usize),
}

impl Outcome {
    /// The resulting tree, if the mode produces one.
    pub fn tree(&self) -> Option<&NodeRef> {
        match self {
            Outcome::Converted(conversion) | Outcome::Selected(Some(conversion)) => {
                Some(&conversion.root)
            }
            Outcome::Selected(None) | Outcome::Counted(_) => None,
        }
    }
}

pub struct Interpreter {
    language: String,
    factory: Arc<dyn Factory>,
    adapter: Adapter,
}

impl Interpreter {
    /// Compiles the rules of `view`, building typed nodes of that language.
    pub fn new(view: &LanguageView) -> Self {
        Self::with_factory(view, Arc::new(ProgramFactory::new(view)))
    }

    /// Compiles the rules of `view`, building nodes through `factory`.
    pub fn with_factory(view: &LanguageView, factory: Arc<dyn Factory>) -> Self {
        let mut adapter = Adapter::new(Arc::clone(&factory));
        for rule in view.transformations() {
            adapter.add_converter(Converter::from_transformation(rule));
        }
        info!(
            language = view.language(),
            rules = adapter.converters().len(),
            "interpreter ready"
        );
        Self {
            language: view.language().to_string(),
            factory,
            adapter,
        }
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Factory used to create nodes, also suitable for loading input trees.
    pub fn factory(&self) -> &dyn Factory {
        self.factory.as_ref()
    }

    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    /// Loads an input tree through this interpreter's factory.
    ///
    /// Text starting with `{` is read as a JSON document, anything else as
    /// the draft notation. Either way trees deeper than `max_depth` are
    /// rejected.
    pub fn load_tree(&self, text: &str, max_depth: usize) -> crate::Result<NodeRef> {
        let tree = if text.trim_start().starts_with('{') {
            read_tree(text, self.factory(), max_depth)?
        } else {
            parse_tree_with_limit(text, self.factory(), max_depth)?
        };
        debug!(language = %self.language, root = %tree.type_name(), "tree loaded");
        Ok(tree)
    }

    pub fn run(&self, root: &NodeRef, mode: ConversionMode) -> Outcome {
        match mode {
            ConversionMode::Convert => Outcome::Converted(self.adapter.convert_traced(root)),
            ConversionMode::Select(index) => Outcome::Selected(self.adapter.partial_convert(root, index)),
            ConversionMode::Count => Outcome::Counted(self.adapter.count_conversions(root)),
        }
    }
}
