/*!
# Semantic Analyzer

Turns a [`Program`] into one validated, cross-linked [`LanguageView`] per
language, the common namespace included.

For every namespace the analyzer:

1. partitions declarations into the common namespace and per-language ones
2. rejects duplicate type names inside a namespace (all names in one error)
3. links abstract vertices to their subtypes
4. rejects cyclic and duplicate inheritance
5. links child types and records dependency sets
6. propagates tags up to abstract ancestors

and checks the hole usage of every transformation rule. Analysis is strict:
the first failing step stops the whole pipeline.
*/

use std::collections::HashSet;

use indexmap::{IndexMap, IndexSet};
use tracing::{debug, info};

use crate::model::{Program, Transformation, Vertex, COMMON_LANGUAGE};

pub mod errors;
pub mod hierarchy;
pub mod rules;


pub use errors::AnalysisError;
pub use hierarchy::{Hierarchy, TaggedChild, VertexEntry, VertexId};

/// Validated view of the vertices and rules visible from one language.
#[derive(Debug, Clone)]
pub struct LanguageView {
    hierarchy: Hierarchy,
    transformations: Vec<Transformation>,
}

impl LanguageView {
    pub fn language(&self) -> &str {
        self.hierarchy.language()
    }

    pub fn hierarchy(&self) -> &Hierarchy {
        &self.hierarchy
    }

    /// Looks a vertex up by name, preferring the language's own declaration.
    pub fn vertex(&self, name: &str) -> Option<&Vertex> {
        self.entry(name).map(VertexEntry::vertex)
    }

    pub fn entry(&self, name: &str) -> Option<&VertexEntry> {
        self.hierarchy.lookup(name).map(|id| self.hierarchy.entry(id))
    }

    /// Every visible vertex, common ones first.
    pub fn vertices(&self) -> impl Iterator<Item = &Vertex> {
        self.hierarchy.entries().map(|(_, entry)| entry.vertex())
    }

    /// The type itself followed by all of its ancestors.
    pub fn get_hierarchy(&self, name: &str) -> Option<&IndexSet<String>> {
        self.hierarchy.hierarchy_of(name)
    }

    /// True when `type_name` is `group` or one of its descendants.
    pub fn belongs_to(&self, type_name: &str, group: &str) -> bool {
        self.get_hierarchy(type_name)
            .is_some_and(|names| names.contains(group))
    }

    pub fn common_supertype(&self, left: &str, right: &str) -> Option<&str> {
        self.hierarchy.common_supertype(left, right)
    }

    /// Names of the direct abstract ancestors of a vertex.
    pub fn bases(&self, name: &str) -> Vec<&str> {
        self.entry(name)
            .map(|entry| {
                entry
                    .bases()
                    .iter()
                    .map(|&id| self.hierarchy.entry(id).name())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Tags propagated to an abstract vertex.
    pub fn tags(&self, name: &str) -> Option<&IndexMap<String, TaggedChild>> {
        self.entry(name).map(VertexEntry::tags)
    }

    /// Resolved child and base types of a vertex.
    pub fn dependencies(&self, name: &str) -> Option<&IndexSet<String>> {
        self.entry(name).map(VertexEntry::dependencies)
    }

    pub fn dependency_order(&self) -> Vec<&str> {
        self.hierarchy.dependency_order()
    }

    /// Rules of this language followed by the common rules.
    pub fn transformations(&self) -> &[Transformation] {
        &self.transformations
    }
}

/// The analysis result: one view per language.
#[derive(Debug, Clone)]
pub struct AnalyzedProgram {
    views: IndexMap<String, LanguageView>,
}

impl AnalyzedProgram {
    pub fn language(&self, name: &str) -> Option<&LanguageView> {
        self.views.get(name)
    }

    pub fn common(&self) -> Option<&LanguageView> {
        self.views.get(COMMON_LANGUAGE)
    }

    pub fn languages(&self) -> impl Iterator<Item = &str> {
        self.views.keys().map(String::as_str)
    }

    pub fn views(&self) -> impl Iterator<Item = &LanguageView> {
        self.views.values()
    }
}

/// Entry point of semantic analysis.
pub struct ProgramAnalyzer<'a> {
    program: &'a Program,
}

impl<'a> ProgramAnalyzer<'a> {
    pub fn new(program: &'a Program) -> Self {
        Self { program }
    }

    /// Analyzes every language of the program.
    pub fn analyze(&self) -> Result<AnalyzedProgram, AnalysisError> {
        let mut languages: IndexSet<&str> = IndexSet::new();
        languages.insert(COMMON_LANGUAGE);
        languages.extend(self.program.languages());

        for &language in &languages {
            check_duplicates(language, self.namespace(language))?;
        }
        for (language, rule) in self.program.transformations() {
            debug!(language, rule = %rule, "checking transformation");
            rules::check_transformation(rule)?;
        }

        let mut views = IndexMap::new();
        for &language in &languages {
            let view = self.analyze_language(language)?;
            views.insert(language.to_string(), view);
        }
        info!(languages = views.len(), "program analyzed");
        Ok(AnalyzedProgram { views })
    }

    /// Analyzes a single language together with the common namespace.
    pub fn analyze_language(&self, language: &str) -> Result<LanguageView, AnalysisError> {
        let local = self.namespace(language);
        debug!(language, vertices = local.len(), "analyzing language");
        let hierarchy = Hierarchy::build(
            language,
            self.namespace(COMMON_LANGUAGE),
            local.iter().copied(),
        )?;

        let mut transformations: Vec<Transformation> = self
            .program
            .transformations()
            .filter(|(lang, _)| *lang == language)
            .map(|(_, rule)| rule.clone())
            .collect();
        if language != COMMON_LANGUAGE {
            transformations.extend(
                self.program
                    .transformations()
                    .filter(|(lang, _)| *lang == COMMON_LANGUAGE)
                    .map(|(_, rule)| rule.clone()),
            );
        }
        Ok(LanguageView {
            hierarchy,
            transformations,
        })
    }

    fn namespace(&self, language: &str) -> Vec<&'a Vertex> {
        self.program
            .vertices()
            .filter(|(lang, _)| *lang == language)
            .map(|(_, vertex)| vertex)
            .collect()
    }
}

/// Rejects type names declared more than once in one namespace.
fn check_duplicates(language: &str, vertices: Vec<&Vertex>) -> Result<(), AnalysisError> {
    let mut seen = HashSet::new();
    let mut duplicates: IndexSet<String> = IndexSet::new();
    for vertex in vertices {
        if !seen.insert(vertex.name()) {
            duplicates.insert(vertex.name().to_string());
        }
    }
    if duplicates.is_empty() {
        Ok(())
    } else {
        Err(AnalysisError::DuplicateDeclaration {
            language: language.to_string(),
            names: duplicates.into_iter().collect(),
        })
    }
}
