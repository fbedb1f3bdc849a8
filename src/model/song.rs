use serde::{Deserialize, Serialize};

use super::track::Track;
use crate::pattern::timeline::build_timeline;
use crate::model::pattern::ContainerRef;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Song {
    pub bpm: u32,
    pub tracks: Vec<Track>,
}

impl Default for Song {
    fn default() -> Self {
        Self {
            bpm: 120,
            tracks: Vec::new(),
        }
    }
}

impl Song {
    pub fn list(&self) -> String {
        if self.tracks.is_empty() {
            return "[no tracks]".to_string();
        }
        let mut out = String::new();
        for (i, t) in self.tracks.iter().enumerate() {
            let timeline = build_timeline(&t.pattern, &ContainerRef::Root, &t.pad_lengths(), false);
            out.push_str(&format!(
                "{:>2} {}  {} items  {} steps  groups:{} supers:{}{}\n",
                i + 1,
                t.name,
                timeline.sequence.len(),
                timeline.total_steps,
                t.pattern.groups.len(),
                t.pattern.supers.len(),
                if t.mute { "  [muted]" } else { "" },
            ));
        }
        out
    }
}
