/*!
# Vertex Hierarchy

Arena of vertices addressed by [`VertexId`], with the inheritance DAG built on
top of it. Building runs in fixed steps; each step only starts once the
previous one succeeded:

1. link abstract vertices to their subtypes (base edges)
2. reject cycles, then reject descendants reachable twice from one ancestor
3. link child types and collect dependency sets
4. compute the hierarchy list of every vertex
5. propagate tags up to abstract ancestors
*/

use std::collections::{HashMap, HashSet};

use indexmap::{IndexMap, IndexSet};
use tracing::trace;

use crate::model::{Vertex, COMMON_LANGUAGE};

use super::errors::AnalysisError;

/// Index of a vertex inside one [`Hierarchy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VertexId(usize);

impl VertexId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A tagged child slot exposed by an abstract vertex.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaggedChild {
    pub tag: String,
    /// Effective type: the common supertype of every contributing slot type.
    pub type_name: String,
    /// True when at least one contributing slot is optional.
    pub optional: bool,
    /// Concrete vertices declaring the tag.
    pub contributors: IndexSet<String>,
    /// True when an abstract ancestor of this vertex exposes the same tag.
    pub overridden: bool,
}

/// A vertex plus everything the analyzer derives for it.
#[derive(Debug, Clone)]
pub struct VertexEntry {
    vertex: Vertex,
    language: String,
    subtypes: Vec<VertexId>,
    bases: Vec<VertexId>,
    dependencies: IndexSet<String>,
    hierarchy: IndexSet<String>,
    tags: IndexMap<String, TaggedChild>,
}

impl VertexEntry {
    pub fn vertex(&self) -> &Vertex {
        &self.vertex
    }

    /// Namespace the vertex was declared in.
    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn name(&self) -> &str {
        self.vertex.name()
    }

    pub fn subtypes(&self) -> &[VertexId] {
        &self.subtypes
    }

    /// Direct abstract ancestors.
    pub fn bases(&self) -> &[VertexId] {
        &self.bases
    }

    pub fn dependencies(&self) -> &IndexSet<String> {
        &self.dependencies
    }

    /// The vertex name followed by every ancestor name, without duplicates.
    pub fn hierarchy(&self) -> &IndexSet<String> {
        &self.hierarchy
    }

    pub fn tags(&self) -> &IndexMap<String, TaggedChild> {
        &self.tags
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    OnStack,
    Done,
}

/// The cross-linked vertices visible from one language.
#[derive(Debug, Clone)]
pub struct Hierarchy {
    language: String,
    entries: Vec<VertexEntry>,
    local: HashMap<String, VertexId>,
    shared: HashMap<String, VertexId>,
}

impl Hierarchy {
    /// Builds and validates the hierarchy of `language`.
    ///
    /// `shared` holds the common namespace; it is ignored when `language` is
    /// the common namespace itself.
    pub fn build<'a, S, L>(language: &str, shared: S, local: L) -> Result<Self, AnalysisError>
    where
        S: IntoIterator<Item = &'a Vertex>,
        L: IntoIterator<Item = &'a Vertex>,
    {
        let mut hierarchy = Hierarchy {
            language: language.to_string(),
            entries: Vec::new(),
            local: HashMap::new(),
            shared: HashMap::new(),
        };
        if language != COMMON_LANGUAGE {
            for vertex in shared {
                hierarchy.insert(vertex.clone(), COMMON_LANGUAGE);
            }
        }
        for vertex in local {
            hierarchy.insert(vertex.clone(), language);
        }
        hierarchy.link_subtypes()?;
        hierarchy.check_cycles()?;
        hierarchy.check_duplicate_paths()?;
        hierarchy.link_children()?;
        hierarchy.compute_hierarchies();
        hierarchy.propagate_tags();
        Ok(hierarchy)
    }

    fn insert(&mut self, vertex: Vertex, origin: &str) {
        let id = VertexId(self.entries.len());
        let names = if origin == self.language {
            &mut self.local
        } else {
            &mut self.shared
        };
        names.entry(vertex.name().to_string()).or_insert(id);
        self.entries.push(VertexEntry {
            vertex,
            language: origin.to_string(),
            subtypes: Vec::new(),
            bases: Vec::new(),
            dependencies: IndexSet::new(),
            hierarchy: IndexSet::new(),
            tags: IndexMap::new(),
        });
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn entry(&self, id: VertexId) -> &VertexEntry {
        &self.entries[id.0]
    }

    pub fn entries(&self) -> impl Iterator<Item = (VertexId, &VertexEntry)> {
        self.entries
            .iter()
            .enumerate()
            .map(|(index, entry)| (VertexId(index), entry))
    }

    /// Finds a vertex by name, preferring the language's own declaration.
    pub fn lookup(&self, name: &str) -> Option<VertexId> {
        self.local
            .get(name)
            .or_else(|| self.shared.get(name))
            .copied()
    }

    /// Resolves a name referenced by the vertex `from`.
    ///
    /// Vertices of the common namespace only see that namespace, so a
    /// language never changes what a shared declaration refers to.
    fn resolve_from(&self, from: VertexId, name: &str) -> Option<VertexId> {
        if self.entries[from.0].language != self.language {
            self.shared.get(name).copied()
        } else {
            self.lookup(name)
        }
    }

    fn link_subtypes(&mut self) -> Result<(), AnalysisError> {
        for index in 0..self.entries.len() {
            let id = VertexId(index);
            let subtypes = match &self.entries[index].vertex {
                Vertex::Abstract(node) => node.subtypes.clone(),
                _ => continue,
            };
            for subtype in subtypes {
                let target = self.resolve_from(id, &subtype).ok_or_else(|| {
                    let entry = &self.entries[index];
                    AnalysisError::undefined_subtype(&entry.language, entry.name(), &subtype)
                })?;
                if self.entries[index].subtypes.contains(&target) {
                    return Err(AnalysisError::duplicate_inheritance(
                        self.entries[index].name(),
                        &subtype,
                    ));
                }
                trace!(base = %self.entries[index].name(), subtype = %subtype, "linked subtype");
                self.entries[index].subtypes.push(target);
                self.entries[target.0].bases.push(id);
            }
        }
        Ok(())
    }

    fn check_cycles(&self) -> Result<(), AnalysisError> {
        let mut marks = vec![Mark::Unvisited; self.entries.len()];
        for index in 0..self.entries.len() {
            if marks[index] == Mark::Unvisited {
                self.visit_for_cycles(VertexId(index), &mut marks)?;
            }
        }
        Ok(())
    }

    fn visit_for_cycles(&self, id: VertexId, marks: &mut [Mark]) -> Result<(), AnalysisError> {
        marks[id.0] = Mark::OnStack;
        for &subtype in &self.entries[id.0].subtypes {
            match marks[subtype.0] {
                Mark::OnStack => {
                    return Err(AnalysisError::CyclicInheritance {
                        descriptor: self.entries[id.0].vertex.to_string(),
                    })
                }
                Mark::Unvisited => self.visit_for_cycles(subtype, marks)?,
                Mark::Done => {}
            }
        }
        marks[id.0] = Mark::Done;
        Ok(())
    }

    fn check_duplicate_paths(&self) -> Result<(), AnalysisError> {
        for (index, entry) in self.entries.iter().enumerate() {
            if !entry.vertex.is_abstract() {
                continue;
            }
            let mut seen = HashSet::new();
            let mut pending: Vec<VertexId> = entry.subtypes.iter().rev().copied().collect();
            while let Some(current) = pending.pop() {
                if !seen.insert(current) {
                    return Err(AnalysisError::duplicate_inheritance(
                        self.entries[index].name(),
                        self.entries[current.0].name(),
                    ));
                }
                pending.extend(self.entries[current.0].subtypes.iter().rev().copied());
            }
        }
        Ok(())
    }

    fn link_children(&mut self) -> Result<(), AnalysisError> {
        for index in 0..self.entries.len() {
            let id = VertexId(index);
            let children: Vec<String> = self.entries[index]
                .vertex
                .child_type_names()
                .into_iter()
                .map(str::to_string)
                .collect();
            for child in children {
                if self.resolve_from(id, &child).is_none() {
                    let entry = &self.entries[index];
                    return Err(AnalysisError::child_type_not_defined(
                        &entry.language,
                        entry.name(),
                        &child,
                    ));
                }
                self.entries[index].dependencies.insert(child);
            }
            let bases: Vec<String> = self.entries[index]
                .bases
                .iter()
                .map(|base| self.entries[base.0].name().to_string())
                .collect();
            self.entries[index].dependencies.extend(bases);
        }
        Ok(())
    }

    /// Every ancestor of `id`, nearest first, excluding `id` itself.
    pub fn ancestors(&self, id: VertexId) -> IndexSet<VertexId> {
        let mut result = IndexSet::new();
        let mut cursor = 0;
        let mut queue: Vec<VertexId> = self.entries[id.0].bases.clone();
        while cursor < queue.len() {
            let current = queue[cursor];
            cursor += 1;
            if result.insert(current) {
                queue.extend(self.entries[current.0].bases.iter().copied());
            }
        }
        result
    }

    fn compute_hierarchies(&mut self) {
        for index in 0..self.entries.len() {
            let mut names = IndexSet::new();
            names.insert(self.entries[index].name().to_string());
            for ancestor in self.ancestors(VertexId(index)) {
                names.insert(self.entries[ancestor.0].name().to_string());
            }
            self.entries[index].hierarchy = names;
        }
    }

    /// Hierarchy list of the named type, if it is declared.
    pub fn hierarchy_of(&self, name: &str) -> Option<&IndexSet<String>> {
        self.lookup(name).map(|id| &self.entries[id.0].hierarchy)
    }

    /// The first type in the hierarchy of `left` that `right` also belongs to.
    pub fn common_supertype(&self, left: &str, right: &str) -> Option<&str> {
        let left = self.hierarchy_of(left)?;
        let right = self.hierarchy_of(right)?;
        left.iter()
            .find(|name| right.contains(name.as_str()))
            .map(String::as_str)
    }

    /// Vertex ids with every descendant placed before its ancestors.
    fn bottom_up_order(&self) -> Vec<VertexId> {
        fn visit(hierarchy: &Hierarchy, id: VertexId, seen: &mut [bool], order: &mut Vec<VertexId>) {
            if seen[id.0] {
                return;
            }
            seen[id.0] = true;
            for &subtype in &hierarchy.entries[id.0].subtypes {
                visit(hierarchy, subtype, seen, order);
            }
            order.push(id);
        }

        let mut seen = vec![false; self.entries.len()];
        let mut order = Vec::with_capacity(self.entries.len());
        for index in 0..self.entries.len() {
            visit(self, VertexId(index), &mut seen, &mut order);
        }
        order
    }

    /// Recomputes the tags of every abstract vertex from its descendants.
    ///
    /// Tags are rebuilt from scratch, so running this again yields the same
    /// result.
    pub fn propagate_tags(&mut self) {
        for entry in &mut self.entries {
            entry.tags.clear();
        }
        for id in self.bottom_up_order() {
            if !self.entries[id.0].vertex.is_abstract() {
                continue;
            }
            let mut merged: IndexMap<String, TaggedChild> = IndexMap::new();
            let mut conflicting: HashSet<String> = HashSet::new();
            for &subtype in &self.entries[id.0].subtypes {
                for contribution in self.contributions(subtype) {
                    self.merge_tag(&mut merged, &mut conflicting, contribution);
                }
            }
            self.entries[id.0].tags = merged;
        }

        let mut overridden = Vec::new();
        for (index, entry) in self.entries.iter().enumerate() {
            if entry.tags.is_empty() {
                continue;
            }
            let ancestors = self.ancestors(VertexId(index));
            for tag in entry.tags.keys() {
                let inherited = ancestors
                    .iter()
                    .any(|ancestor| self.entries[ancestor.0].tags.contains_key(tag));
                overridden.push((index, tag.clone(), inherited));
            }
        }
        for (index, tag, inherited) in overridden {
            if let Some(child) = self.entries[index].tags.get_mut(&tag) {
                child.overridden = inherited;
            }
        }
    }

    fn contributions(&self, id: VertexId) -> Vec<TaggedChild> {
        let entry = &self.entries[id.0];
        match &entry.vertex {
            Vertex::Regular(node) => node
                .tagged_slots()
                .map(|(tag, slot)| TaggedChild {
                    tag: tag.to_string(),
                    type_name: slot.type_name.clone(),
                    optional: slot.optional,
                    contributors: IndexSet::from([node.name.clone()]),
                    overridden: false,
                })
                .collect(),
            Vertex::Abstract(_) => entry.tags.values().cloned().collect(),
            Vertex::List(_) | Vertex::Literal(_) => Vec::new(),
        }
    }

    fn merge_tag(
        &self,
        merged: &mut IndexMap<String, TaggedChild>,
        conflicting: &mut HashSet<String>,
        contribution: TaggedChild,
    ) {
        if conflicting.contains(&contribution.tag) {
            return;
        }
        let Some(existing) = merged.get_mut(&contribution.tag) else {
            merged.insert(contribution.tag.clone(), contribution);
            return;
        };
        if existing.type_name != contribution.type_name {
            match self.common_supertype(&existing.type_name, &contribution.type_name) {
                Some(common) => existing.type_name = common.to_string(),
                None => existing.contributors.clear(),
            }
        }
        if existing.contributors.is_empty() {
            trace!(tag = %contribution.tag, "dropping tag with incompatible types");
            merged.shift_remove(&contribution.tag);
            conflicting.insert(contribution.tag);
            return;
        }
        existing.optional |= contribution.optional;
        existing.contributors.extend(contribution.contributors);
    }

    /// Vertex names ordered so that dependencies come first.
    ///
    /// Cycles through child types are legal; they are broken by declaration
    /// order.
    pub fn dependency_order(&self) -> Vec<&str> {
        fn visit<'a>(
            hierarchy: &'a Hierarchy,
            id: VertexId,
            seen: &mut [bool],
            order: &mut Vec<&'a str>,
        ) {
            if seen[id.0] {
                return;
            }
            seen[id.0] = true;
            for name in &hierarchy.entries[id.0].dependencies {
                if let Some(dependency) = hierarchy.resolve_from(id, name) {
                    visit(hierarchy, dependency, seen, order);
                }
            }
            order.push(hierarchy.entries[id.0].name());
        }

        let mut seen = vec![false; self.entries.len()];
        let mut order = Vec::with_capacity(self.entries.len());
        for index in 0..self.entries.len() {
            visit(self, VertexId(index), &mut seen, &mut order);
        }
        order
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AbstractNode, ChildSlot, RegularNode};

    fn build(vertices: Vec<Vertex>) -> Result<Hierarchy, AnalysisError> {
        Hierarchy::build(COMMON_LANGUAGE, std::iter::empty::<&Vertex>(), vertices.iter())
    }

    #[test]
    fn test_cycle_reports_closing_descriptor() {
        let result = build(vec![
            AbstractNode::new("A", ["B"]).into(),
            AbstractNode::new("B", ["C"]).into(),
            AbstractNode::new("C", ["A"]).into(),
        ]);
        assert_eq!(
            result.unwrap_err(),
            AnalysisError::CyclicInheritance {
                descriptor: "C <- A".to_string()
            }
        );
    }

    #[test]
    fn test_self_cycle() {
        let result = build(vec![AbstractNode::new("A", ["A"]).into()]);
        assert!(matches!(result, Err(AnalysisError::CyclicInheritance { .. })));
    }

    #[test]
    fn test_hierarchy_lists_ancestors_once() {
        let hierarchy = build(vec![
            AbstractNode::new("Expression", ["Binary", "Literal"]).into(),
            AbstractNode::new("Binary", ["Addition"]).into(),
            AbstractNode::new("Arithmetic", ["Addition"]).into(),
            AbstractNode::new("Literal", ["Integer"]).into(),
            RegularNode::new("Addition", vec![]).into(),
            RegularNode::new("Integer", vec![]).into(),
        ])
        .unwrap();
        let names: Vec<_> = hierarchy
            .hierarchy_of("Addition")
            .unwrap()
            .iter()
            .cloned()
            .collect();
        assert_eq!(names, vec!["Addition", "Binary", "Arithmetic", "Expression"]);
        assert_eq!(hierarchy.common_supertype("Addition", "Integer"), Some("Expression"));
        assert_eq!(hierarchy.common_supertype("Integer", "Arithmetic"), None);
    }

    #[test]
    fn test_duplicate_path_rejected() {
        let result = build(vec![
            AbstractNode::new("Expression", ["Binary", "Addition"]).into(),
            AbstractNode::new("Binary", ["Addition"]).into(),
            RegularNode::new("Addition", vec![]).into(),
        ]);
        assert_eq!(
            result.unwrap_err(),
            AnalysisError::duplicate_inheritance("Expression", "Addition")
        );
    }

    #[test]
    fn test_duplicate_direct_subtype_rejected() {
        let result = build(vec![
            AbstractNode::new("Expression", ["Addition", "Addition"]).into(),
            RegularNode::new("Addition", vec![]).into(),
        ]);
        assert!(matches!(result, Err(AnalysisError::DuplicateInheritance { .. })));
    }

    #[test]
    fn test_tag_generalized_to_common_supertype() {
        let hierarchy = build(vec![
            AbstractNode::new("Expression", ["Addition", "Negation", "Integer", "Name"]).into(),
            AbstractNode::new("Operator", ["Addition", "Negation"]).into(),
            RegularNode::new(
                "Addition",
                vec![ChildSlot::mandatory("Integer").with_tag("operand")],
            )
            .into(),
            RegularNode::new(
                "Negation",
                vec![ChildSlot::optional("Name").with_tag("operand")],
            )
            .into(),
            RegularNode::new("Integer", vec![]).into(),
            RegularNode::new("Name", vec![]).into(),
        ])
        .unwrap();
        let id = hierarchy.lookup("Operator").unwrap();
        let tag = &hierarchy.entry(id).tags()["operand"];
        assert_eq!(tag.type_name, "Expression");
        assert!(tag.optional);
        assert_eq!(tag.contributors.len(), 2);
    }

    #[test]
    fn test_dependency_order() {
        let hierarchy = build(vec![
            RegularNode::new("Addition", vec![ChildSlot::mandatory("Expression")]).into(),
            AbstractNode::new("Expression", ["Addition"]).into(),
        ])
        .unwrap();
        assert_eq!(hierarchy.dependency_order(), vec!["Expression", "Addition"]);
    }
}
