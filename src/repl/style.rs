//! Output styling for the padloop REPL.

use crate::model::pattern::{Item, GRID_QUANTUM};
use crate::pattern::check::Diagnostics;
use crate::pattern::notation::format_item;
use crate::pattern::schedule::PadEvent;
use crate::pattern::{MoveMode, Proposal, Timeline};

pub const EMOJI_CHECK: &str = "✓";
pub const EMOJI_SAVE: &str = "💾";
pub const EMOJI_OPEN: &str = "📂";
pub const EMOJI_NOTE: &str = "♪";
pub const EMOJI_ARROW: &str = "→";
pub const EMOJI_WAVE: &str = "👋";
pub const EMOJI_THINK: &str = "🤔";
pub const EMOJI_WARN: &str = "⚠";

// One cell per grid quantum
pub const CELL_PAUSE: char = '·';
pub const CELL_HOLD: char = '─';
pub const CELL_GROUP: char = 'G';
pub const CELL_SUPER: char = 'S';

pub fn format_prompt(bpm: u32, dragging: bool) -> String {
    if dragging {
        format!("{} {} drag › ", EMOJI_NOTE, bpm)
    } else {
        format!("{} {} › ", EMOJI_NOTE, bpm)
    }
}

pub fn success(msg: &str) -> String {
    format!("  {} {}", EMOJI_CHECK, msg)
}

pub fn unchanged(msg: &str) -> String {
    format!("  {} {}", EMOJI_THINK, msg)
}

pub fn tempo(bpm: u32) -> String {
    format!("  {} {}", EMOJI_NOTE, bpm)
}

pub fn saved(path: &str) -> String {
    format!("  {} saved {}", EMOJI_SAVE, path)
}

pub fn opened(path: &str) -> String {
    format!("  {} opened {}", EMOJI_OPEN, path)
}

pub fn goodbye() -> String {
    format!("{} bye", EMOJI_WAVE)
}

/// Grid strip for a timeline: the first quantum of a token carries its
/// label, the rest are held.
pub fn render_strip(timeline: &Timeline) -> String {
    let mut out = String::new();
    for token in &timeline.all_tokens {
        let cells = (token.step_count / GRID_QUANTUM).max(1) as usize;
        let (head, tail) = match &token.item {
            Item::Pad { pad } => (char::from_digit(*pad as u32, 10).unwrap_or('?'), CELL_HOLD),
            Item::Pause { .. } => (CELL_PAUSE, CELL_PAUSE),
            Item::Group { .. } => (CELL_GROUP, CELL_HOLD),
            Item::Super { .. } => (CELL_SUPER, CELL_HOLD),
        };
        out.push(head);
        out.extend(std::iter::repeat(tail).take(cells - 1));
    }
    out
}

/// Strip plus one line per token.
pub fn render_timeline(label: &str, timeline: &Timeline, selected: &[usize]) -> String {
    let mut out = format!("  {}  {} steps\n  |{}|", label, timeline.total_steps, render_strip(timeline));
    for token in &timeline.all_tokens {
        let mark = if selected.contains(&token.source_index) { '*' } else { ' ' };
        out.push_str(&format!(
            "\n {}{:>3}  {:<6} {:>4}..{:<4} ({})",
            mark,
            token.source_index,
            format_item(&token.item),
            token.start_step,
            token.end_step,
            token.step_count
        ));
    }
    out
}

pub fn proposal(p: &Proposal) -> String {
    match &p.plan.mode {
        Some(MoveMode::Swap { with }) => {
            format!("  {} step {}: swap with #{}", EMOJI_ARROW, p.target_step, with)
        }
        Some(MoveMode::GapInsert { gap_start, gap_end }) => format!(
            "  {} step {}: insert into gap {}..{}",
            EMOJI_ARROW, p.target_step, gap_start, gap_end
        ),
        Some(MoveMode::Append { gap }) => {
            format!("  {} step {}: append after {} step gap", EMOJI_ARROW, p.target_step, gap)
        }
        None => format!("  {} step {}: not a valid drop", EMOJI_WARN, p.target_step),
    }
}

pub fn events(events: &[PadEvent]) -> String {
    if events.is_empty() {
        return "  [no pad events]".to_string();
    }
    events
        .iter()
        .map(|e| format!("  p{} {:>4}..{}", e.pad, e.start_step, e.end_step))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn diagnostics(d: &Diagnostics) -> String {
    if d.is_clean() {
        return success("no dangling or cyclic references");
    }
    let mut lines = Vec::new();
    for c in &d.dangling {
        lines.push(format!("  {} missing {}", EMOJI_WARN, c));
    }
    for c in &d.cyclic {
        lines.push(format!("  {} cycle through {}", EMOJI_WARN, c));
    }
    lines.join("\n")
}
