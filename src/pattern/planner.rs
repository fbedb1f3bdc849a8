//! Block-move planning for the arranger timeline.
//!
//! A block is a contiguous run of tokens (by source index). Moving it first
//! leaves a pause of exactly the block's length where it was, then places
//! the block by one of three modes:
//!
//! * swap with an adjacent, equally long non-pause token,
//! * insert into a pause span that can hold it (the span is split),
//! * append past the end of the remaining content, padding the distance.
//!
//! Anything else yields an invalid plan and no mutation.

use std::collections::BTreeSet;
use std::sync::Arc;

use super::duration::PadLengths;
use super::pause::{normalize_pauses, pause_items, TrailingPause};
use super::store::set_container_sequence;
use super::timeline::{build_timeline, Token};
use crate::model::pattern::{ContainerRef, Item, Pattern, GRID_QUANTUM};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveMode {
    /// Trade places with the token at `with`.
    Swap { with: usize },
    /// Land inside the pause span `[gap_start, gap_end)`.
    GapInsert { gap_start: u32, gap_end: u32 },
    /// Append after the remaining content, padding `gap` steps first.
    Append { gap: u32 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MovePlan {
    pub block_start: usize,
    pub block_end: usize,
    pub block_steps: u32,
    /// Where the block starts today.
    pub source_step: u32,
    pub target_step: u32,
    /// `None` when the move is not possible.
    pub mode: Option<MoveMode>,
}

impl MovePlan {
    fn invalid(block_start: usize, block_end: usize, target_step: u32) -> Self {
        Self {
            block_start,
            block_end,
            block_steps: 0,
            source_step: 0,
            target_step,
            mode: None,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.mode.is_some()
    }
}

/// The remaining layout after the block has been lifted out.
#[derive(Debug, Clone)]
enum Segment {
    Gap { start: u32, end: u32 },
    Item(Item),
}

struct Remaining {
    segments: Vec<Segment>,
    /// End of the last non-pause token.
    content_end: u32,
}

fn lift_block(tokens: &[Token], block_start: usize, block_end: usize) -> Remaining {
    fn push_gap(segments: &mut Vec<Segment>, start: u32, end: u32) {
        if let Some(Segment::Gap { end: last_end, .. }) = segments.last_mut() {
            if *last_end == start {
                *last_end = end;
                return;
            }
        }
        segments.push(Segment::Gap { start, end });
    }

    let mut segments: Vec<Segment> = Vec::with_capacity(tokens.len());
    let mut content_end = 0;
    for (i, token) in tokens.iter().enumerate() {
        if i == block_start {
            push_gap(&mut segments, token.start_step, tokens[block_end].end_step);
        } else if i > block_start && i <= block_end {
            continue;
        } else if token.is_pause() {
            push_gap(&mut segments, token.start_step, token.end_step);
        } else {
            content_end = token.end_step;
            segments.push(Segment::Item(token.item.clone()));
        }
    }
    Remaining { segments, content_end }
}

/// Decide whether and how `tokens[block_start..=block_end]` can start at
/// `target_step`. Off-grid targets are invalid; snap them first.
pub fn plan_block_move(tokens: &[Token], block_start: usize, block_end: usize, target_step: u32) -> MovePlan {
    if block_start > block_end || block_end >= tokens.len() || target_step % GRID_QUANTUM != 0 {
        return MovePlan::invalid(block_start, block_end, target_step);
    }
    let source_step = tokens[block_start].start_step;
    let block_steps = tokens[block_end].end_step.saturating_sub(source_step);
    let Some(target_end) = target_step.checked_add(block_steps) else {
        return MovePlan::invalid(block_start, block_end, target_step);
    };
    let mut plan = MovePlan {
        block_start,
        block_end,
        block_steps,
        source_step,
        target_step,
        mode: None,
    };

    if block_start == block_end && !tokens[block_start].is_pause() {
        let moving = &tokens[block_start];
        let neighbours = [block_start.checked_sub(1), Some(block_start + 1)];
        for idx in neighbours.into_iter().flatten() {
            let Some(other) = tokens.get(idx) else { continue };
            if !other.is_pause() && other.step_count == moving.step_count && other.start_step == target_step {
                plan.mode = Some(MoveMode::Swap { with: idx });
                return plan;
            }
        }
    }

    let remaining = lift_block(tokens, block_start, block_end);
    for segment in &remaining.segments {
        let Segment::Gap { start, end } = *segment else { continue };
        if target_step >= start && target_end <= end {
            plan.mode = Some(MoveMode::GapInsert { gap_start: start, gap_end: end });
            return plan;
        }
    }

    if target_step >= remaining.content_end {
        plan.mode = Some(MoveMode::Append {
            gap: target_step - remaining.content_end,
        });
    }
    plan
}

/// Build the new container body for a valid plan.
pub fn materialize_block_move(tokens: &[Token], plan: &MovePlan) -> Option<Vec<Item>> {
    let mode = plan.mode?;
    if plan.block_end >= tokens.len() || plan.target_step % GRID_QUANTUM != 0 {
        return None;
    }
    let block: Vec<Item> = tokens[plan.block_start..=plan.block_end]
        .iter()
        .map(|t| t.item.clone())
        .collect();

    let items = match mode {
        MoveMode::Swap { with } => {
            let mut items: Vec<Item> = tokens.iter().map(|t| t.item.clone()).collect();
            if with >= items.len() {
                return None;
            }
            items.swap(plan.block_start, with);
            normalize_pauses(&items, TrailingPause::Keep)
        }
        MoveMode::GapInsert { gap_start, gap_end } => {
            let remaining = lift_block(tokens, plan.block_start, plan.block_end);
            let mut items = Vec::with_capacity(tokens.len() + 2);
            for segment in remaining.segments {
                match segment {
                    Segment::Item(item) => items.push(item),
                    Segment::Gap { start, end } if start == gap_start && end == gap_end => {
                        items.extend(pause_items(plan.target_step.saturating_sub(start)));
                        items.extend(block.iter().cloned());
                        items.extend(pause_items(end.saturating_sub(plan.target_step).saturating_sub(plan.block_steps)));
                    }
                    Segment::Gap { start, end } => items.extend(pause_items(end - start)),
                }
            }
            normalize_pauses(&items, TrailingPause::Keep)
        }
        MoveMode::Append { gap } => {
            let remaining = lift_block(tokens, plan.block_start, plan.block_end);
            let mut items = Vec::with_capacity(tokens.len() + 2);
            for segment in remaining.segments {
                match segment {
                    Segment::Item(item) => items.push(item),
                    Segment::Gap { start, end } if end <= remaining.content_end => {
                        items.extend(pause_items(end - start))
                    }
                    Segment::Gap { .. } => {}
                }
            }
            items.extend(pause_items(gap));
            items.extend(block);
            normalize_pauses(&items, TrailingPause::Drop)
        }
    };
    Some(items)
}

/// Collapse a selection to the block it drags.
///
/// Selected indices that are adjacent, or separated only by pause tokens,
/// touch; the bounding run of a touching selection is the block. Anything
/// else has no block.
pub fn block_for_selection(tokens: &[Token], indices: &[usize]) -> Option<(usize, usize)> {
    let set: BTreeSet<usize> = indices.iter().copied().collect();
    let first = *set.iter().next()?;
    let last = *set.iter().next_back()?;
    if last >= tokens.len() {
        return None;
    }
    let touching = (first..=last).all(|i| set.contains(&i) || tokens[i].is_pause());
    touching.then_some((first, last))
}

/// Plan and commit in one step. Returns the same snapshot if the move is
/// not possible.
pub fn apply_block_move(
    pattern: &Arc<Pattern>,
    container: &ContainerRef,
    pads: &PadLengths,
    block: (usize, usize),
    target_step: u32,
) -> Arc<Pattern> {
    let timeline = build_timeline(pattern, container, pads, true);
    let plan = plan_block_move(&timeline.all_tokens, block.0, block.1, target_step);
    match materialize_block_move(&timeline.all_tokens, &plan) {
        Some(items) => set_container_sequence(pattern, container, items),
        None => Arc::clone(pattern),
    }
}
