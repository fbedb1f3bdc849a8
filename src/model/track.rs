use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::pattern::{Pattern, DEFAULT_PAD_STEPS, PAD_COUNT};
use crate::pattern::duration::PadLengths;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    pub name: String,
    /// Per-pad loop length in steps; `None` falls back to `default_pad_steps`.
    #[serde(default)]
    pub pad_steps: [Option<u32>; PAD_COUNT],
    #[serde(default = "default_pad_steps")]
    pub default_pad_steps: u32,
    #[serde(default)]
    pub pattern: Arc<Pattern>,
    #[serde(default)]
    pub mute: bool,
}

fn default_pad_steps() -> u32 {
    DEFAULT_PAD_STEPS
}

impl Track {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pad_steps: [None; PAD_COUNT],
            default_pad_steps: DEFAULT_PAD_STEPS,
            pattern: Arc::new(Pattern::new()),
            mute: false,
        }
    }

    pub fn with_default_pad_steps(mut self, steps: u32) -> Self {
        self.default_pad_steps = steps;
        self
    }

    /// Resolver input built from this track's pad configuration.
    pub fn pad_lengths(&self) -> PadLengths {
        PadLengths::from_parts(self.pad_steps, self.default_pad_steps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_track_has_empty_pattern() {
        let t = Track::new("Bass");
        assert!(t.pattern.root.is_empty());
        assert!(t.pattern.groups.is_empty());
        assert_eq!(t.pad_lengths().pad_steps(3), DEFAULT_PAD_STEPS);
    }
}
