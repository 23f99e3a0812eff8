use thiserror::Error;

/// Analysis errors. Any of them halts the pipeline before interpretation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("Duplicate declaration in '{language}': {}", names.join(", "))]
    DuplicateDeclaration { language: String, names: Vec<String> },

    #[error("Base '{base}' refers to undefined subtype '{subtype}' in '{language}'")]
    BaseForUndefinedSubtype {
        language: String,
        base: String,
        subtype: String,
    },

    #[error("Child type '{child}' of node '{node}' is not defined in '{language}'")]
    ChildTypeNotDefined {
        language: String,
        node: String,
        child: String,
    },

    #[error("Cyclic inheritance: {descriptor}")]
    CyclicInheritance { descriptor: String },

    #[error("'{descriptor}' is inherited more than once from '{ancestor}'")]
    DuplicateInheritance { ancestor: String, descriptor: String },

    #[error("Variadic hole must be the last parameter in rule: {rule}")]
    MisplacedEllipsis { rule: String },

    #[error("Hole #{number} is bound more than once in rule: {rule}")]
    DuplicateHole { rule: String, number: u32 },

    #[error("Hole #{number} is used for both data and children in rule: {rule}")]
    HoleKindConflict { rule: String, number: u32 },

    #[error("Hole #{number} is not bound by the left side of rule: {rule}")]
    UnboundHole { rule: String, number: u32 },
}

impl AnalysisError {
    pub fn undefined_subtype(language: &str, base: &str, subtype: &str) -> Self {
        Self::BaseForUndefinedSubtype {
            language: language.to_string(),
            base: base.to_string(),
            subtype: subtype.to_string(),
        }
    }

    pub fn child_type_not_defined(language: &str, node: &str, child: &str) -> Self {
        Self::ChildTypeNotDefined {
            language: language.to_string(),
            node: node.to_string(),
            child: child.to_string(),
        }
    }

    pub fn duplicate_inheritance(ancestor: &str, descriptor: &str) -> Self {
        Self::DuplicateInheritance {
            ancestor: ancestor.to_string(),
            descriptor: descriptor.to_string(),
        }
    }
}
