//! Step-duration resolution.
//!
//! Every item occupies a whole number of grid quanta. Named containers are
//! resolved recursively; a container already on the current recursion path
//! resolves to a single quantum so self-referencing patterns still lay out.

use crate::model::pattern::{ContainerRef, Item, Pattern, DEFAULT_PAD_STEPS, GRID_QUANTUM, PAD_COUNT};

/// Round `steps` up to the grid, never below one quantum.
pub fn quantize(steps: u32) -> u32 {
    steps.div_ceil(GRID_QUANTUM).saturating_mul(GRID_QUANTUM).max(GRID_QUANTUM)
}

/// Nearest grid line to an arbitrary step position.
pub fn snap_to_grid(step: u32) -> u32 {
    step.saturating_add(GRID_QUANTUM / 2) / GRID_QUANTUM * GRID_QUANTUM
}

/// External pad configuration for one track.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PadLengths {
    steps: [Option<u32>; PAD_COUNT],
    default_steps: u32,
}

impl Default for PadLengths {
    fn default() -> Self {
        Self::new(DEFAULT_PAD_STEPS)
    }
}

impl PadLengths {
    pub fn new(default_steps: u32) -> Self {
        Self {
            steps: [None; PAD_COUNT],
            default_steps,
        }
    }

    pub fn from_parts(steps: [Option<u32>; PAD_COUNT], default_steps: u32) -> Self {
        Self { steps, default_steps }
    }

    pub fn with_pad(mut self, pad: u8, steps: u32) -> Self {
        if let Some(slot) = self.steps.get_mut(pad as usize) {
            *slot = Some(steps);
        }
        self
    }

    /// Raw configured length of a pad; out-of-range pads use the default.
    pub fn pad_steps(&self, pad: u8) -> u32 {
        self.steps
            .get(pad as usize)
            .copied()
            .flatten()
            .unwrap_or(self.default_steps)
    }
}

/// Resolves item durations against one pattern snapshot.
///
/// Nothing is cached between calls.
pub struct Resolver<'a> {
    pattern: &'a Pattern,
    pads: &'a PadLengths,
}

impl<'a> Resolver<'a> {
    pub fn new(pattern: &'a Pattern, pads: &'a PadLengths) -> Self {
        Self { pattern, pads }
    }

    pub fn duration_of(&self, item: &Item) -> u32 {
        let mut path = Vec::new();
        self.duration_within(item, &mut path)
    }

    /// Summed, quantized length of a whole container's body.
    pub fn container_steps(&self, container: &ContainerRef) -> u32 {
        match container.to_item() {
            Some(item) => self.duration_of(&item),
            None => {
                let mut path = Vec::new();
                self.pattern
                    .root
                    .iter()
                    .fold(0u32, |acc, item| acc.saturating_add(self.duration_within(item, &mut path)))
            }
        }
    }

    /// Duration of `item` when the containers on `path` are already being
    /// expanded.
    pub(crate) fn duration_within(&self, item: &Item, path: &mut Vec<ContainerRef>) -> u32 {
        match item {
            Item::Pad { pad } => quantize(self.pads.pad_steps(*pad)),
            Item::Pause { steps } => quantize(*steps),
            Item::Group { .. } | Item::Super { .. } => {
                let Some(container) = item.reference() else {
                    return GRID_QUANTUM;
                };
                if path.contains(&container) {
                    return GRID_QUANTUM;
                }
                // Dangling references lay out as a single quantum.
                let Some(body) = self.pattern.sequence(&container) else {
                    return GRID_QUANTUM;
                };
                path.push(container);
                let sum = body
                    .iter()
                    .fold(0u32, |acc, child| acc.saturating_add(self.duration_within(child, path)));
                path.pop();
                quantize(sum)
            }
        }
    }
}

/// Number of grid steps `item` occupies within `pattern`.
pub fn duration_of(pattern: &Pattern, item: &Item, pads: &PadLengths) -> u32 {
    Resolver::new(pattern, pads).duration_of(item)
}
