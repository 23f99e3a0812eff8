/*!
# Child Allocator

Places the actual children of a node into the declared child slots of its
type. Each child goes to a slot whose type or group it belongs to.

This is a two-pass greedy heuristic, not a complete bipartite matcher:

1. **Unique binding**: a slot type with exactly one candidate child takes that
   child at once, on a mandatory position when it has one.
2. **Ordered greedy binding**: remaining children, in order, take a free slot
   of the most constrained eligible type: fewest remaining candidates, ties
   broken by declaration order.

In both passes, slot types that still have a free mandatory position are
served before types with only optional positions left. Without that, a child
belonging to two groups could settle in an optional slot of the first group
and leave a mandatory slot of the second one empty.

Schemas with several equally typed optional slots that share candidates with
overlapping mandatory groups may be rejected even though a placement exists.
*/

use indexmap::IndexMap;
use tracing::trace;

use crate::model::ChildSlot;
use crate::tree::NodeRef;

/// Allocates `children` to `slots`.
///
/// On success the result has one entry per slot, `None` marking an unfilled
/// optional slot.
pub fn allocate(children: &[NodeRef], slots: &[ChildSlot]) -> Option<Vec<Option<NodeRef>>> {
    if slots.is_empty() {
        return children.is_empty().then(Vec::new);
    }
    if children.len() > slots.len() {
        return None;
    }

    let mut allocation = Allocation::new(children, slots)?;
    allocation.bind_unique();
    allocation.bind_greedy()?;
    allocation.finish()
}

struct Allocation<'a> {
    children: &'a [NodeRef],
    slots: &'a [ChildSlot],
    /// Slot positions per distinct slot type, in declaration order.
    positions: IndexMap<&'a str, Vec<usize>>,
    /// Slot types each child may occupy, as indexes into `positions`.
    feasible: Vec<Vec<usize>>,
    placed: Vec<Option<usize>>,
    filled: Vec<bool>,
}

impl<'a> Allocation<'a> {
    fn new(children: &'a [NodeRef], slots: &'a [ChildSlot]) -> Option<Self> {
        let mut positions: IndexMap<&str, Vec<usize>> = IndexMap::new();
        for (index, slot) in slots.iter().enumerate() {
            positions.entry(slot.type_name.as_str()).or_default().push(index);
        }
        let mut feasible = Vec::with_capacity(children.len());
        for child in children {
            let types: Vec<usize> = positions
                .keys()
                .enumerate()
                .filter(|(_, group)| child.belongs_to(group))
                .map(|(index, _)| index)
                .collect();
            if types.is_empty() {
                trace!(child = %child.type_name(), "child fits no slot");
                return None;
            }
            feasible.push(types);
        }
        Some(Self {
            children,
            slots,
            positions,
            feasible,
            placed: vec![None; children.len()],
            filled: vec![false; slots.len()],
        })
    }

    fn free_positions(&self, slot_type: usize) -> impl Iterator<Item = usize> + '_ {
        self.positions[slot_type]
            .iter()
            .copied()
            .filter(|&position| !self.filled[position])
    }

    fn has_free_mandatory(&self, slot_type: usize) -> bool {
        self.free_positions(slot_type)
            .any(|position| !self.slots[position].optional)
    }

    /// A free position of the type, mandatory ones first.
    fn pick_position(&self, slot_type: usize) -> Option<usize> {
        self.free_positions(slot_type)
            .find(|&position| !self.slots[position].optional)
            .or_else(|| self.free_positions(slot_type).next())
    }

    fn candidates(&self, slot_type: usize) -> Vec<usize> {
        (0..self.children.len())
            .filter(|&child| self.placed[child].is_none() && self.feasible[child].contains(&slot_type))
            .collect()
    }

    fn bind(&mut self, child: usize, position: usize) {
        trace!(child, position, "bound child");
        self.placed[child] = Some(position);
        self.filled[position] = true;
    }

    fn bind_unique(&mut self) {
        let mut order: Vec<usize> = (0..self.positions.len()).collect();
        order.sort_by_key(|&slot_type| !self.has_free_mandatory(slot_type));
        for slot_type in order {
            let candidates = self.candidates(slot_type);
            if let [child] = candidates[..] {
                if let Some(position) = self.pick_position(slot_type) {
                    self.bind(child, position);
                }
            }
        }
    }

    fn bind_greedy(&mut self) -> Option<()> {
        for child in 0..self.children.len() {
            if self.placed[child].is_some() {
                continue;
            }
            let slot_type = self.feasible[child]
                .iter()
                .copied()
                .filter(|&slot_type| self.free_positions(slot_type).next().is_some())
                .min_by_key(|&slot_type| {
                    (
                        !self.has_free_mandatory(slot_type),
                        self.candidates(slot_type).len(),
                        self.positions[slot_type][0],
                    )
                })?;
            let position = self.pick_position(slot_type)?;
            self.bind(child, position);
        }
        Some(())
    }

    fn finish(self) -> Option<Vec<Option<NodeRef>>> {
        let missing = self
            .slots
            .iter()
            .zip(&self.filled)
            .any(|(slot, &filled)| !slot.optional && !filled);
        if missing {
            return None;
        }
        let mut result = vec![None; self.slots.len()];
        for (child, position) in self.placed.iter().enumerate() {
            result[(*position)?] = Some(self.children[child].clone());
        }
        Some(result)
    }
}
