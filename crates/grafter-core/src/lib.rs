//! # Grafter Core
//!
//! Engine of the Grafter AST transformation DSL:
//! - Rule model: node declarations, patterns and transformation rules
//! - Semantic analyzer producing a validated view per language
//! - Child allocator placing children into declared slots
//! - Pattern matcher and tree builder
//! - Adapter applying prioritized rules over whole trees
//!
//! Parsing the textual DSL and emitting code are left to other tools; this
//! crate consumes the rule model as data.

#![warn(clippy::all)]

pub mod adapter;
pub mod allocator;
pub mod analyzer;
pub mod creator;
pub mod interpreter;
pub mod json;
pub mod matcher;
pub mod model;
pub mod tree;

// Re-export commonly used types
pub use adapter::{Adapter, Conversion, ConversionSummary, Converter, RuleStats};
pub use allocator::allocate;
pub use analyzer::{AnalysisError, AnalyzedProgram, LanguageView, ProgramAnalyzer};
pub use creator::{Creator, DescriptorCreator};
pub use interpreter::{Interpreter, Outcome};
pub use json::{read_tree, write_tree, JsonError};
pub use matcher::{DescriptorMatcher, Environment, Matcher};
pub use model::{
    Data, Descriptor, DescriptorAttribute, Hole, HoleAttribute, ModelError, Pattern, Program,
    Transformation, Vertex, COMMON_LANGUAGE,
};
pub use tree::{
    deep_compare, Builder, DraftFactory, DraftNode, DraftParseError, Factory, Node, NodeRef,
    ProgramFactory, Type,
};

/// Grafter version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Initialize tracing for Grafter components.
///
/// `RUST_LOG` takes precedence; without it only this crate logs, at info.
/// A subscriber installed earlier stays in place.
pub fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("grafter_core=info"));
    tracing_subscriber::fmt().with_env_filter(filter).try_init().ok();
}

/// How the interpreter applies rules to a tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConversionMode {
    /// Apply every rule to every node.
    #[default]
    Convert,
    /// Apply only the first rule, and only to the k-th (zero-based) node it converts.
    Select(usize),
    /// Count the nodes the first rule would convert.
    Count,
}

/// Runtime configuration
#[derive(Debug, Clone)]
pub struct GrafterConfig {
    /// Language whose rules and types are used
    pub language: String,
    pub mode: ConversionMode,
    /// Print results in the draft notation instead of JSON
    pub draft_output: bool,
    /// Maximum depth of loaded trees
    pub max_tree_depth: usize,
}

impl Default for GrafterConfig {
    fn default() -> Self {
        Self {
            language: COMMON_LANGUAGE.to_string(),
            mode: ConversionMode::Convert,
            draft_output: false,
            max_tree_depth: 100,
        }
    }
}

/// Error types for Grafter operations
#[derive(thiserror::Error, Debug)]
pub enum GrafterError {
    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),

    #[error("Model error: {0}")]
    Model(#[from] ModelError),

    #[error("Draft notation error: {0}")]
    DraftParse(#[from] DraftParseError),

    #[error("Tree document error: {0}")]
    Json(#[from] JsonError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for Grafter operations
pub type Result<T> = std::result::Result<T, GrafterError>;

/// Analyzes `program` and compiles the rules of the configured language.
pub fn prepare(program: &Program, config: &GrafterConfig) -> Result<Interpreter> {
    let analyzed = ProgramAnalyzer::new(program).analyze()?;
    let view = analyzed.language(&config.language).ok_or_else(|| {
        GrafterError::Config(format!("Language '{}' is not declared", config.language))
    })?;
    Ok(Interpreter::new(view))
}
