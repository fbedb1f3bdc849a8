//! Absolute step layout of one container.

use std::sync::Arc;

use super::duration::{PadLengths, Resolver};
use crate::model::pattern::{ContainerRef, Item, Pattern, Sequence};

/// Position-annotated view of one item. Derived, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub source_index: usize,
    pub item: Item,
    pub start_step: u32,
    pub end_step: u32,
    pub step_count: u32,
}

impl Token {
    pub fn is_pause(&self) -> bool {
        self.item.is_pause()
    }

    pub fn contains_step(&self, step: u32) -> bool {
        step >= self.start_step && step < self.end_step
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Timeline {
    pub sequence: Sequence,
    /// Every item, pauses included (move planning works on these).
    pub all_tokens: Vec<Token>,
    /// Tokens for display; pauses dropped when built without them.
    pub visible_tokens: Vec<Token>,
    pub total_steps: u32,
}

impl Timeline {
    /// Token covering `step`, if any.
    pub fn token_at_step(&self, step: u32) -> Option<&Token> {
        self.all_tokens.iter().find(|t| t.contains_step(step))
    }

    pub fn token(&self, source_index: usize) -> Option<&Token> {
        self.all_tokens.get(source_index)
    }
}

/// Lay out `container` once, front to back.
///
/// A missing named container yields an empty timeline. Positions saturate
/// at `u32::MAX` instead of wrapping.
pub fn build_timeline(
    pattern: &Pattern,
    container: &ContainerRef,
    pads: &PadLengths,
    include_pauses: bool,
) -> Timeline {
    let sequence = pattern
        .sequence(container)
        .cloned()
        .unwrap_or_else(|| Arc::from(Vec::<Item>::new()));
    let resolver = Resolver::new(pattern, pads);

    let mut cursor = 0u32;
    let mut all_tokens = Vec::with_capacity(sequence.len());
    for (source_index, item) in sequence.iter().enumerate() {
        let step_count = resolver.duration_of(item);
        all_tokens.push(Token {
            source_index,
            item: item.clone(),
            start_step: cursor,
            end_step: cursor.saturating_add(step_count),
            step_count,
        });
        cursor = cursor.saturating_add(step_count);
    }

    let visible_tokens = if include_pauses {
        all_tokens.clone()
    } else {
        all_tokens.iter().filter(|t| !t.is_pause()).cloned().collect()
    };

    Timeline {
        sequence,
        all_tokens,
        visible_tokens,
        total_steps: cursor,
    }
}
