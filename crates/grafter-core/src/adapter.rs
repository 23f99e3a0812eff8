/*!
# Adapter

Applies a prioritized list of converters across a whole tree in one
post-order pass.

The input tree is flattened into a worklist once. Each entry is rebuilt from
the already converted children, then offered to the converters in priority
order; the first converter that produces a node replaces it. A parent is
therefore matched against its rewritten children.

Besides the full conversion, the adapter supports two read-only variants
driven by the first converter only: applying just the k-th successful
conversion, and counting how many nodes would convert.
*/

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::creator::{Creator, DescriptorCreator};
use crate::matcher::{DescriptorMatcher, Environment, Matcher};
use crate::model::Transformation;
use crate::tree::{post_order, rebuild, Factory, NodeRef};

/// A matcher and creator applied together as one rule.
pub struct Converter {
    name: String,
    matcher: Box<dyn Matcher>,
    creator: Box<dyn Creator>,
}

impl Converter {
    pub fn new(name: impl Into<String>, matcher: Box<dyn Matcher>, creator: Box<dyn Creator>) -> Self {
        Self {
            name: name.into(),
            matcher,
            creator,
        }
    }

    /// Compiles a transformation rule, named after its textual form.
    pub fn from_transformation(rule: &Transformation) -> Self {
        Self::new(
            rule.to_string(),
            Box::new(DescriptorMatcher::new(rule.left.clone())),
            Box::new(DescriptorCreator::new(rule.right.clone())),
        )
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Matches `node` and builds its replacement.
    fn apply(&self, node: &NodeRef, factory: &dyn Factory, stats: &mut RuleStats) -> Option<NodeRef> {
        let mut env = Environment::new();
        if !self.matcher.match_node(node, &mut env) {
            return None;
        }
        stats.applications += 1;
        let created = self.creator.create(&env, factory);
        if created.is_some() {
            stats.transformations += 1;
        } else {
            trace!(rule = %self.name, node = %node.type_name(), "creator produced no node");
        }
        created
    }
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter").field("name", &self.name).finish()
    }
}

/// Per-rule counters of one conversion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RuleStats {
    pub rule_name: String,
    /// Nodes the rule's pattern matched.
    pub applications: u64,
    /// Matches that produced a replacement node.
    pub transformations: u64,
}

impl RuleStats {
    pub fn new(rule_name: impl Into<String>) -> Self {
        Self {
            rule_name: rule_name.into(),
            ..Self::default()
        }
    }

    pub fn success_rate(&self) -> f64 {
        if self.applications == 0 {
            0.0
        } else {
            (self.transformations as f64) / (self.applications as f64)
        }
    }
}

/// What one adapter pass did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ConversionSummary {
    pub visited: u64,
    pub replacements: u64,
    /// Parents that rejected their converted children and were kept as is.
    pub rejected_substitutions: u64,
    pub rules: Vec<RuleStats>,
}

impl ConversionSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn merge(&mut self, other: ConversionSummary) {
        self.visited += other.visited;
        self.replacements += other.replacements;
        self.rejected_substitutions += other.rejected_substitutions;
        for stats in other.rules {
            match self.rules.iter_mut().find(|own| own.rule_name == stats.rule_name) {
                Some(own) => {
                    own.applications += stats.applications;
                    own.transformations += stats.transformations;
                }
                None => self.rules.push(stats),
            }
        }
    }

    pub fn changed(&self) -> bool {
        self.replacements > 0
    }
}

/// Result of one adapter pass.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub root: NodeRef,
    /// Successful conversions seen, including those not applied.
    pub matches: usize,
    pub summary: ConversionSummary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    All,
    Select(usize),
    Count,
}

/// Runs converters over trees, creating nodes through one factory.
pub struct Adapter {
    converters: Vec<Converter>,
    factory: Arc<dyn Factory>,
}

impl Adapter {
    pub fn new(factory: Arc<dyn Factory>) -> Self {
        Self {
            converters: Vec::new(),
            factory,
        }
    }

    /// Appends a converter with the lowest priority so far.
    pub fn add_converter(&mut self, converter: Converter) {
        self.converters.push(converter);
    }

    pub fn with_converter(mut self, converter: Converter) -> Self {
        self.add_converter(converter);
        self
    }

    pub fn converters(&self) -> &[Converter] {
        &self.converters
    }

    /// Converts the whole tree.
    pub fn convert(&self, root: &NodeRef) -> NodeRef {
        self.run(root, Mode::All).root
    }

    /// Converts the whole tree and reports what happened.
    pub fn convert_traced(&self, root: &NodeRef) -> Conversion {
        self.run(root, Mode::All)
    }

    /// Applies the first converter to the `index`-th (zero-based) node it
    /// converts successfully, leaving every other node untouched.
    ///
    /// Returns `None` when fewer than `index + 1` nodes convert.
    pub fn partial_convert(&self, root: &NodeRef, index: usize) -> Option<Conversion> {
        let conversion = self.run(root, Mode::Select(index));
        (conversion.matches > index).then_some(conversion)
    }

    /// Number of nodes the first converter would convert.
    pub fn count_conversions(&self, root: &NodeRef) -> usize {
        self.run(root, Mode::Count).matches
    }

    fn run(&self, root: &NodeRef, mode: Mode) -> Conversion {
        let converters = match mode {
            Mode::All => &self.converters[..],
            Mode::Select(_) | Mode::Count => &self.converters[..self.converters.len().min(1)],
        };
        let mut summary = ConversionSummary {
            rules: converters.iter().map(|c| RuleStats::new(c.name())).collect(),
            ..ConversionSummary::default()
        };

        let walk = post_order(root);
        let mut converted: Vec<Vec<NodeRef>> = vec![Vec::new(); walk.len()];
        let mut result = Arc::clone(root);
        let mut matches = 0;
        for (index, visit) in walk.iter().enumerate() {
            summary.visited += 1;
            let children = std::mem::take(&mut converted[index]);
            let mut current = self.reassemble(&visit.node, children, &mut summary);

            for (converter, stats) in converters.iter().zip(summary.rules.iter_mut()) {
                let Some(replacement) = converter.apply(&current, self.factory.as_ref(), stats) else {
                    continue;
                };
                let applied = match mode {
                    Mode::All => true,
                    Mode::Select(selected) => matches == selected,
                    Mode::Count => false,
                };
                matches += 1;
                if applied {
                    debug!(rule = %converter.name(), from = %current.type_name(), to = %replacement.type_name(), "replaced node");
                    current = replacement;
                    summary.replacements += 1;
                }
                break;
            }

            match visit.parent {
                Some(parent) => converted[parent].push(current),
                None => result = current,
            }
        }
        debug!(
            visited = summary.visited,
            replacements = summary.replacements,
            rejected = summary.rejected_substitutions,
            "conversion finished"
        );
        Conversion {
            root: result,
            matches,
            summary,
        }
    }

    /// Rebuilds `node` around its converted children when any of them changed.
    fn reassemble(&self, node: &NodeRef, children: Vec<NodeRef>, summary: &mut ConversionSummary) -> NodeRef {
        let unchanged = children.len() == node.child_count()
            && children
                .iter()
                .zip(node.children())
                .all(|(new, old)| Arc::ptr_eq(new, old));
        if unchanged {
            return Arc::clone(node);
        }
        match rebuild(node, children) {
            Some(rebuilt) => rebuilt,
            None => {
                warn!(node = %node.type_name(), "parent rejected converted children, keeping original");
                summary.rejected_substitutions += 1;
                Arc::clone(node)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Descriptor, Hole};
    use crate::tree::{DraftFactory, DraftNode};
    use pretty_assertions::assert_eq;

    fn rule(left: Descriptor, right: impl Into<crate::model::Pattern>) -> Converter {
        Converter::from_transformation(&Transformation::new(left, right))
    }

    fn addition_to_sum() -> Converter {
        rule(
            Descriptor::new("Addition").hole(1).hole(2),
            Descriptor::new("Sum").hole(1).hole(2),
        )
    }

    fn adapter() -> Adapter {
        Adapter::new(Arc::new(DraftFactory::new()))
    }

    #[test]
    fn test_single_rewrite() {
        let adapter = adapter().with_converter(addition_to_sum());
        let tree = DraftNode::parse("Addition(X, Y)").unwrap();
        assert_eq!(adapter.convert(&tree).to_string(), "Sum(X, Y)");
    }

    #[test]
    fn test_parent_sees_rewritten_children() {
        let adapter = adapter()
            .with_converter(rule(
                Descriptor::new("Addition")
                    .param(Descriptor::new("Sum").hole(1).hole(2))
                    .hole(3),
                Descriptor::new("Triple").hole(1).hole(2).hole(3),
            ))
            .with_converter(addition_to_sum());
        let tree = DraftNode::parse("Addition(Addition(a, b), c)").unwrap();
        let conversion = adapter.convert_traced(&tree);
        assert_eq!(conversion.root.to_string(), "Triple(a, b, c)");
        assert_eq!(conversion.summary.visited, 5);
        assert_eq!(conversion.summary.replacements, 2);
        assert_eq!(conversion.summary.rules[0].transformations, 1);
        assert_eq!(conversion.summary.rules[1].transformations, 1);
    }

    #[test]
    fn test_untouched_tree_is_shared() {
        let adapter = adapter().with_converter(addition_to_sum());
        let tree = DraftNode::parse("Block(Return(x))").unwrap();
        let converted = adapter.convert(&tree);
        assert!(Arc::ptr_eq(&tree, &converted));
    }

    #[test]
    fn test_failed_creation_falls_through() {
        let adapter = adapter()
            .with_converter(rule(Descriptor::new("Paren").ellipsis(1), Hole::single(1)))
            .with_converter(rule(Descriptor::new("Paren").ellipsis(1), Descriptor::new("Group").hole(1)));
        let single = DraftNode::parse("Paren(x)").unwrap();
        assert_eq!(adapter.convert(&single).to_string(), "x");
        let pair = DraftNode::parse("Paren(x, y)").unwrap();
        assert_eq!(adapter.convert(&pair).to_string(), "Group(x, y)");
    }

    #[test]
    fn test_select_and_count() {
        let adapter = adapter().with_converter(addition_to_sum());
        let tree = DraftNode::parse("Block(Addition(a, b), Addition(c, d), Addition(e, f))").unwrap();
        assert_eq!(adapter.count_conversions(&tree), 3);

        let second = adapter.partial_convert(&tree, 1).unwrap();
        assert_eq!(
            second.root.to_string(),
            "Block(Addition(a, b), Sum(c, d), Addition(e, f))"
        );
        assert_eq!(second.summary.replacements, 1);
        assert!(adapter.partial_convert(&tree, 3).is_none());
    }

    #[test]
    fn test_summary_merge() {
        let mut total = ConversionSummary::new();
        let mut first = ConversionSummary::new();
        first.replacements = 2;
        first.rules.push(RuleStats {
            rule_name: "r".to_string(),
            applications: 3,
            transformations: 2,
        });
        total.merge(first.clone());
        total.merge(first);
        assert!(total.changed());
        assert_eq!(total.rules.len(), 1);
        assert_eq!(total.rules[0].applications, 6);
        assert!((total.rules[0].success_rate() - 2.0 / 3.0).abs() < 1e-9);
    }
}
