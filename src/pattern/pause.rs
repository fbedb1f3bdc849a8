//! Canonical pause decomposition.

use super::duration::quantize;
use crate::model::pattern::{Item, GRID_QUANTUM, PAUSE_LENGTHS};

/// What to do with a pause run at the very end of a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrailingPause {
    /// Trailing silence is implicit; remove it.
    Drop,
    /// Keep it so the container length is preserved.
    Keep,
}

/// Split `steps` into canonical pause lengths, largest first.
pub fn decompose_pause(steps: u32) -> Vec<u32> {
    let mut out = Vec::new();
    let mut remaining = steps;
    for &len in PAUSE_LENGTHS.iter().rev() {
        while remaining >= len {
            out.push(len);
            remaining -= len;
        }
    }
    if remaining > 0 {
        out.push(GRID_QUANTUM);
    }
    out
}

pub fn pause_items(steps: u32) -> Vec<Item> {
    decompose_pause(steps).into_iter().map(Item::pause).collect()
}

/// Coalesce adjacent pauses and re-expand them canonically.
///
/// Runs are summed by their quantized lengths so the timeline length of the
/// result matches the input.
pub fn normalize_pauses(items: &[Item], trailing: TrailingPause) -> Vec<Item> {
    let mut out = Vec::with_capacity(items.len());
    let mut run = 0u32;
    for item in items {
        match item {
            Item::Pause { steps } => run = run.saturating_add(quantize(*steps)),
            other => {
                if run > 0 {
                    out.extend(pause_items(run));
                    run = 0;
                }
                out.push(other.clone());
            }
        }
    }
    if run > 0 && trailing == TrailingPause::Keep {
        out.extend(pause_items(run));
    }
    out
}

/// Rewrite each pause as its canonical run, leaving everything else and
/// the pause boundaries alone.
pub fn canonical_pauses(items: &[Item]) -> Vec<Item> {
    let mut out = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Item::Pause { steps } if !PAUSE_LENGTHS.contains(steps) => out.extend(pause_items(quantize(*steps))),
            other => out.push(other.clone()),
        }
    }
    out
}

/// True when `items` is already in the form [`normalize_pauses`] with
/// [`TrailingPause::Drop`] produces.
pub fn is_canonical(items: &[Item]) -> bool {
    normalize_pauses(items, TrailingPause::Drop) == items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn greedy_decomposition() {
        assert_eq!(decompose_pause(0), Vec::<u32>::new());
        assert_eq!(decompose_pause(4), vec![4]);
        assert_eq!(decompose_pause(12), vec![8, 4]);
        assert_eq!(decompose_pause(60), vec![32, 16, 8, 4]);
        assert_eq!(decompose_pause(72), vec![32, 32, 8]);
    }

    #[test]
    fn off_grid_remainder_rounds_up() {
        assert_eq!(decompose_pause(6), vec![4, 4]);
    }

    #[test]
    fn adjacent_pauses_coalesce() {
        let items = vec![Item::pad(0), Item::pause(4), Item::pause(8), Item::pause(4), Item::pad(1)];
        let out = normalize_pauses(&items, TrailingPause::Drop);
        assert_eq!(out, vec![Item::pad(0), Item::pause(16), Item::pad(1)]);
    }

    #[test]
    fn trailing_run_dropped_or_kept() {
        let items = vec![Item::pad(0), Item::pause(4), Item::pause(4)];
        assert_eq!(normalize_pauses(&items, TrailingPause::Drop), vec![Item::pad(0)]);
        assert_eq!(
            normalize_pauses(&items, TrailingPause::Keep),
            vec![Item::pad(0), Item::pause(8)]
        );
    }

    #[test]
    fn canonical_input_is_left_alone() {
        let items = vec![Item::pause(8), Item::pad(0), Item::pause(32), Item::pause(4), Item::pad(2)];
        assert!(is_canonical(&items));
        assert_eq!(normalize_pauses(&items, TrailingPause::Drop), items);
    }

    #[test]
    fn entered_pauses_become_canonical_runs() {
        let items = vec![Item::pause(3), Item::pad(0), Item::pause(12), Item::pause(8)];
        assert_eq!(
            canonical_pauses(&items),
            vec![Item::pause(4), Item::pad(0), Item::pause(8), Item::pause(4), Item::pause(8)]
        );
    }
}
