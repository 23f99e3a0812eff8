//! Consistency checks for transformation rules.

use std::collections::HashSet;

use crate::model::{Descriptor, HoleRef, Pattern, Transformation};

use super::errors::AnalysisError;

/// Checks hole usage of one rule.
///
/// - a variadic hole is the last parameter of its descriptor
/// - a child hole number is bound once by the left side
/// - a number is never used for both data and children
/// - every hole of the right side is bound by the left side
pub fn check_transformation(rule: &Transformation) -> Result<(), AnalysisError> {
    let text = || rule.to_string();

    if !variadic_holes_last(&rule.left) {
        return Err(AnalysisError::MisplacedEllipsis { rule: text() });
    }

    let mut child_holes = HashSet::new();
    let mut data_holes = HashSet::new();
    let mut failure = None;
    rule.left.visit_holes(&mut |hole| {
        if failure.is_some() {
            return;
        }
        match hole {
            HoleRef::Child(hole) => {
                if !child_holes.insert(hole.number) {
                    failure = Some(AnalysisError::DuplicateHole {
                        rule: text(),
                        number: hole.number,
                    });
                }
            }
            HoleRef::Data(number) => {
                if !data_holes.insert(number) {
                    failure = Some(AnalysisError::DuplicateHole { rule: text(), number });
                }
            }
        }
    });
    if let Some(error) = failure {
        return Err(error);
    }
    if let Some(&number) = child_holes.intersection(&data_holes).min() {
        return Err(AnalysisError::HoleKindConflict { rule: text(), number });
    }

    let mut unbound = None;
    rule.right.visit_holes(&mut |hole| {
        if unbound.is_some() {
            return;
        }
        let bound = match hole {
            HoleRef::Child(hole) => child_holes.contains(&hole.number),
            HoleRef::Data(number) => data_holes.contains(&number),
        };
        if !bound {
            unbound = Some(match hole {
                HoleRef::Child(hole) => hole.number,
                HoleRef::Data(number) => number,
            });
        }
    });
    match unbound {
        Some(number) => Err(AnalysisError::UnboundHole { rule: text(), number }),
        None => Ok(()),
    }
}

fn variadic_holes_last(descriptor: &Descriptor) -> bool {
    let last = descriptor.parameters.len().saturating_sub(1);
    descriptor
        .parameters
        .iter()
        .enumerate()
        .all(|(index, parameter)| match parameter {
            Pattern::Hole(hole) => !hole.is_variadic() || index == last,
            Pattern::Descriptor(nested) => variadic_holes_last(nested),
        })
}
