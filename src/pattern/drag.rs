//! Drag gestures over a timeline.
//!
//! A [`Drag`] holds the block being dragged and the latest [`Proposal`]. Hover
//! updates only ever touch the proposal; the pattern changes on
//! [`Drag::commit`]. Dropping a `Drag` without committing cancels it.

use std::sync::Arc;

use super::duration::{snap_to_grid, PadLengths};
use super::planner::{block_for_selection, materialize_block_move, plan_block_move, MovePlan};
use super::store::set_container_sequence;
use super::timeline::{build_timeline, Timeline};
use crate::model::pattern::{ContainerRef, Pattern};

/// Where the dragged block would land if released now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    pub target_step: u32,
    pub plan: MovePlan,
}

impl Proposal {
    pub fn is_valid(&self) -> bool {
        self.plan.is_valid()
    }
}

#[derive(Debug, Clone)]
pub struct Drag {
    container: ContainerRef,
    block: (usize, usize),
    proposal: Option<Proposal>,
}

impl Drag {
    /// Start dragging the block covered by `selected`. `None` when the
    /// selection does not collapse to a single block.
    pub fn begin(timeline: &Timeline, container: ContainerRef, selected: &[usize]) -> Option<Self> {
        let block = block_for_selection(&timeline.all_tokens, selected)?;
        Some(Self {
            container,
            block,
            proposal: None,
        })
    }

    pub fn container(&self) -> &ContainerRef {
        &self.container
    }

    pub fn block(&self) -> (usize, usize) {
        self.block
    }

    pub fn proposal(&self) -> Option<&Proposal> {
        self.proposal.as_ref()
    }

    /// Snap `pointer_step` to the grid and re-plan.
    pub fn hover(&mut self, timeline: &Timeline, pointer_step: u32) -> &Proposal {
        let target_step = snap_to_grid(pointer_step);
        let plan = plan_block_move(&timeline.all_tokens, self.block.0, self.block.1, target_step);
        self.proposal.insert(Proposal { target_step, plan })
    }

    /// Apply the current proposal to `pattern`.
    ///
    /// The move is re-planned against `pattern` so a stale preview can never
    /// write an inconsistent layout. Without a valid proposal the snapshot
    /// comes back unchanged.
    pub fn commit(self, pattern: &Arc<Pattern>, pads: &PadLengths) -> Arc<Pattern> {
        let Some(proposal) = self.proposal else {
            return Arc::clone(pattern);
        };
        if !proposal.is_valid() {
            return Arc::clone(pattern);
        }
        let timeline = build_timeline(pattern, &self.container, pads, true);
        let plan = plan_block_move(&timeline.all_tokens, self.block.0, self.block.1, proposal.target_step);
        match materialize_block_move(&timeline.all_tokens, &plan) {
            Some(items) => set_container_sequence(pattern, &self.container, items),
            None => Arc::clone(pattern),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::pattern::Item;

    #[test]
    fn hover_never_mutates() {
        let pads = PadLengths::new(4);
        let p = Arc::new(Pattern::with_root(vec![Item::pad(0), Item::pause(8), Item::pad(1)]));
        let tl = build_timeline(&p, &ContainerRef::Root, &pads, true);
        let mut drag = Drag::begin(&tl, ContainerRef::Root, &[2]).expect("block");
        let proposal = drag.hover(&tl, 9);
        assert_eq!(proposal.target_step, 8);
        assert!(proposal.is_valid());
        assert_eq!(&p.root[..], &[Item::pad(0), Item::pause(8), Item::pad(1)]);
    }

    #[test]
    fn commit_without_hover_is_noop() {
        let pads = PadLengths::new(4);
        let p = Arc::new(Pattern::with_root(vec![Item::pad(0), Item::pad(1)]));
        let tl = build_timeline(&p, &ContainerRef::Root, &pads, true);
        let drag = Drag::begin(&tl, ContainerRef::Root, &[0]).expect("block");
        assert!(Arc::ptr_eq(&p, &drag.commit(&p, &pads)));
    }

    #[test]
    fn commit_applies_valid_proposal() {
        let pads = PadLengths::new(4);
        let p = Arc::new(Pattern::with_root(vec![Item::pad(0), Item::pause(8), Item::pad(1)]));
        let tl = build_timeline(&p, &ContainerRef::Root, &pads, true);
        let mut drag = Drag::begin(&tl, ContainerRef::Root, &[2]).expect("block");
        drag.hover(&tl, 8);
        let next = drag.commit(&p, &pads);
        assert_eq!(
            &next.root[..],
            &[Item::pad(0), Item::pause(4), Item::pad(1), Item::pause(4)]
        );
    }
}
