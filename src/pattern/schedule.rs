//! Static pad trigger list for a playback scheduler.

use super::duration::{PadLengths, Resolver};
use crate::model::pattern::{ContainerRef, Item, Pattern};
use crate::model::song::Song;
use crate::pattern::timeline::build_timeline;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PadEvent {
    pub pad: u8,
    pub start_step: u32,
    pub end_step: u32,
}

/// Flatten the root sequence into absolute pad events.
///
/// Named containers are expanded in place. A reference back into a container
/// that is already being expanded contributes no events but still occupies
/// its single quantum, matching the layout.
pub fn pad_events(pattern: &Pattern, pads: &PadLengths) -> Vec<PadEvent> {
    let resolver = Resolver::new(pattern, pads);
    let mut out = Vec::new();
    let mut path = Vec::new();
    expand(&resolver, pattern, &pattern.root, 0, &mut path, &mut out);
    out
}

fn expand(
    resolver: &Resolver<'_>,
    pattern: &Pattern,
    items: &[Item],
    offset: u32,
    path: &mut Vec<ContainerRef>,
    out: &mut Vec<PadEvent>,
) {
    let mut cursor = offset;
    for item in items {
        let steps = resolver.duration_within(item, path);
        match item {
            Item::Pad { pad } => out.push(PadEvent {
                pad: *pad,
                start_step: cursor,
                end_step: cursor.saturating_add(steps),
            }),
            Item::Pause { .. } => {}
            Item::Group { .. } | Item::Super { .. } => {
                if let Some(reference) = item.reference() {
                    if !path.contains(&reference) {
                        if let Some(seq) = pattern.sequence(&reference) {
                            path.push(reference);
                            expand(resolver, pattern, seq, cursor, path, out);
                            path.pop();
                        }
                    }
                }
            }
        }
        cursor = cursor.saturating_add(steps);
    }
}

/// Length of the shared arranger timeline: the longest root among tracks.
pub fn arrangement_steps(song: &Song) -> u32 {
    song.tracks
        .iter()
        .map(|t| build_timeline(&t.pattern, &ContainerRef::Root, &t.pad_lengths(), true).total_steps)
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::track::Track;
    use std::sync::Arc;

    #[test]
    fn groups_expand_at_their_offset() {
        let pads = PadLengths::new(4);
        let p = Pattern::with_root(vec![Item::pad(0), Item::group("g1"), Item::pad(3)])
            .with_group("g1", vec![Item::pad(1), Item::pause(4), Item::pad(2)]);
        let events = pad_events(&p, &pads);
        let starts: Vec<(u8, u32)> = events.iter().map(|e| (e.pad, e.start_step)).collect();
        assert_eq!(starts, vec![(0, 0), (1, 4), (2, 12), (3, 16)]);
    }

    #[test]
    fn cyclic_reference_emits_body_once() {
        let pads = PadLengths::new(4);
        let p = Pattern::with_root(vec![Item::group("g1"), Item::pad(7)])
            .with_group("g1", vec![Item::pad(0), Item::group("g1")]);
        let events = pad_events(&p, &pads);
        let starts: Vec<(u8, u32)> = events.iter().map(|e| (e.pad, e.start_step)).collect();
        // g1 = pad (4) + guarded self (4) = 8
        assert_eq!(starts, vec![(0, 0), (7, 8)]);
    }

    #[test]
    fn arrangement_is_longest_track() {
        let mut song = Song::default();
        let mut a = Track::new("A").with_default_pad_steps(4);
        a.pattern = Arc::new(Pattern::with_root(vec![Item::pad(0), Item::pad(0)]));
        let mut b = Track::new("B").with_default_pad_steps(16);
        b.pattern = Arc::new(Pattern::with_root(vec![Item::pad(0)]));
        song.tracks.push(a);
        song.tracks.push(b);
        assert_eq!(arrangement_steps(&song), 16);
    }
}
