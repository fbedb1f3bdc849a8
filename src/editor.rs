//! Editing session: a song plus the transient state around it.
//!
//! The engine functions are pure; this is where their results are written
//! back into tracks, selections follow the edits, and anything worth
//! telling the user goes to the console log.

use std::sync::Arc;

use thiserror::Error;

use crate::config::Config;
use crate::console;
use crate::model::pattern::{ContainerRef, GroupKind, Item, Pattern, MAX_STEPS, PAD_COUNT};
use crate::model::song::Song;
use crate::model::track::Track;
use crate::pattern::check::{self, Diagnostics};
use crate::pattern::schedule::{self, PadEvent};
use crate::pattern::pause::canonical_pauses;
use crate::pattern::{apply_block_move, build_timeline, store, Drag, Proposal, Selections, Timeline};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EditError {
    #[error("no such track {0}")]
    NoSuchTrack(usize),
    #[error("track {track} has no container {container}")]
    NoSuchContainer { track: usize, container: ContainerRef },
    #[error("pad {0} out of range (pads are 0-7)")]
    NoSuchPad(u8),
    #[error("pad length must be positive")]
    ZeroLength,
    #[error("{0} steps is beyond the 65536-step limit")]
    TooManySteps(u32),
    #[error("selection in {0} does not form a single block")]
    NotABlock(ContainerRef),
    #[error("no drag in progress")]
    NoDrag,
}

struct ActiveDrag {
    track: usize,
    drag: Drag,
}

pub struct Editor {
    song: Song,
    selections: Selections,
    drag: Option<ActiveDrag>,
    config: Config,
}

impl Editor {
    pub fn new(config: Config) -> Self {
        Self::with_song(Song::default(), config)
    }

    pub fn with_song(song: Song, config: Config) -> Self {
        Self {
            song,
            selections: Selections::new(),
            drag: None,
            config,
        }
    }

    pub fn song(&self) -> &Song {
        &self.song
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn selections(&self) -> &Selections {
        &self.selections
    }

    /// Swap in a whole new song (open or file reload). Selections and any
    /// drag refer to the old one and are dropped.
    pub fn replace_song(&mut self, song: Song) {
        self.song = song;
        self.selections.clear_all();
        self.drag = None;
    }

    pub fn set_bpm(&mut self, bpm: u32) {
        self.song.bpm = bpm;
    }

    pub fn add_track(&mut self, name: &str) -> usize {
        let track = Track::new(name).with_default_pad_steps(self.config.default_pad_steps);
        self.song.tracks.push(track);
        self.song.tracks.len() - 1
    }

    pub fn remove_track(&mut self, track: usize) -> Result<Track, EditError> {
        self.track(track)?;
        let removed = self.song.tracks.remove(track);
        self.selections.forget_track(track);
        match self.drag.as_mut() {
            Some(active) if active.track == track => self.drag = None,
            Some(active) if active.track > track => active.track -= 1,
            _ => {}
        }
        Ok(removed)
    }

    pub fn track(&self, track: usize) -> Result<&Track, EditError> {
        self.song.tracks.get(track).ok_or(EditError::NoSuchTrack(track))
    }

    fn track_mut(&mut self, track: usize) -> Result<&mut Track, EditError> {
        self.song.tracks.get_mut(track).ok_or(EditError::NoSuchTrack(track))
    }

    pub fn pattern(&self, track: usize) -> Result<&Arc<Pattern>, EditError> {
        Ok(&self.track(track)?.pattern)
    }

    /// Set (or with `None` reset) the loop length of one pad.
    pub fn set_pad_steps(&mut self, track: usize, pad: u8, steps: Option<u32>) -> Result<(), EditError> {
        if pad as usize >= PAD_COUNT {
            return Err(EditError::NoSuchPad(pad));
        }
        if let Some(steps) = steps {
            check_steps(steps)?;
        }
        self.track_mut(track)?.pad_steps[pad as usize] = steps;
        Ok(())
    }

    pub fn set_default_pad_steps(&mut self, track: usize, steps: u32) -> Result<(), EditError> {
        check_steps(steps)?;
        self.track_mut(track)?.default_pad_steps = steps;
        Ok(())
    }

    pub fn timeline(&self, track: usize, container: &ContainerRef, include_pauses: bool) -> Result<Timeline, EditError> {
        let t = self.track(track)?;
        self.require_container(track, container)?;
        Ok(build_timeline(&t.pattern, container, &t.pad_lengths(), include_pauses))
    }

    fn require_container(&self, track: usize, container: &ContainerRef) -> Result<(), EditError> {
        match self.pattern(track)?.sequence(container) {
            Some(_) => Ok(()),
            None => Err(EditError::NoSuchContainer {
                track,
                container: container.clone(),
            }),
        }
    }

    /// Write the result of `op` back to the track. Returns whether anything
    /// changed; stale selection indices of `container` are cleared on change.
    fn apply(
        &mut self,
        track: usize,
        container: &ContainerRef,
        op: impl FnOnce(&Arc<Pattern>) -> Arc<Pattern>,
    ) -> Result<bool, EditError> {
        self.require_container(track, container)?;
        let before = Arc::clone(self.pattern(track)?);
        let after = op(&before);
        if Arc::ptr_eq(&before, &after) {
            return Ok(false);
        }
        self.selections.clear(track, container);
        self.commit(track, after)?;
        Ok(true)
    }

    fn commit(&mut self, track: usize, pattern: Arc<Pattern>) -> Result<(), EditError> {
        warn_diagnostics(track, &check::diagnose(&pattern));
        self.track_mut(track)?.pattern = pattern;
        Ok(())
    }

    /// Replace a container body. Pauses are stored in canonical lengths.
    pub fn set_sequence(&mut self, track: usize, container: &ContainerRef, items: Vec<Item>) -> Result<bool, EditError> {
        check_items(&items)?;
        let items = canonical_pauses(&items);
        self.apply(track, container, |p| store::set_container_sequence(p, container, items))
    }

    /// Insert `item` at `index`. A non-canonical pause lands as its
    /// canonical run, so it may occupy more than one index.
    pub fn insert(&mut self, track: usize, container: &ContainerRef, index: usize, item: Item) -> Result<bool, EditError> {
        check_items(std::slice::from_ref(&item))?;
        let items = canonical_pauses(std::slice::from_ref(&item));
        self.apply(track, container, |p| {
            items.into_iter().enumerate().fold(Arc::clone(p), |acc, (offset, item)| {
                store::insert_item(&acc, container, index.saturating_add(offset), item)
            })
        })
    }

    pub fn delete(&mut self, track: usize, container: &ContainerRef, indices: &[usize]) -> Result<bool, EditError> {
        self.apply(track, container, |p| store::remove_items(p, container, indices))
    }

    pub fn move_item(&mut self, track: usize, container: &ContainerRef, from: usize, to: usize) -> Result<bool, EditError> {
        self.apply(track, container, |p| store::move_item_within_container(p, container, from, to))
    }

    /// Replace the item at `index`; pauses are canonicalized as in [`Editor::insert`].
    pub fn replace(&mut self, track: usize, container: &ContainerRef, index: usize, item: Item) -> Result<bool, EditError> {
        check_items(std::slice::from_ref(&item))?;
        let mut items = canonical_pauses(std::slice::from_ref(&item)).into_iter();
        let Some(first) = items.next() else {
            return Ok(false);
        };
        self.apply(track, container, |p| {
            if p.sequence(container).map_or(true, |s| index >= s.len()) {
                return Arc::clone(p);
            }
            let replaced = store::replace_item(p, container, index, first);
            items.enumerate().fold(replaced, |acc, (offset, item)| {
                store::insert_item(&acc, container, index + 1 + offset, item)
            })
        })
    }

    pub fn select(&mut self, track: usize, container: &ContainerRef, first: usize, last: usize) -> Result<(), EditError> {
        self.require_container(track, container)?;
        self.selections.select_range(track, container, first, last);
        Ok(())
    }

    pub fn toggle(&mut self, track: usize, container: &ContainerRef, index: usize) -> Result<(), EditError> {
        self.require_container(track, container)?;
        self.selections.toggle(track, container, index);
        Ok(())
    }

    pub fn deselect(&mut self, track: usize, container: &ContainerRef) {
        self.selections.clear(track, container);
    }

    pub fn selection(&self, track: usize, container: &ContainerRef) -> Vec<usize> {
        self.selections.get(track, container)
    }

    pub fn can_group(&self, track: usize, container: &ContainerRef, kind: GroupKind) -> Result<bool, EditError> {
        Ok(self.selections.can_group(self.pattern(track)?, track, container, kind))
    }

    /// Group the selection. Returns the new container, or `None` when the
    /// selection could not be grouped.
    pub fn group(&mut self, track: usize, container: &ContainerRef, kind: GroupKind) -> Result<Option<ContainerRef>, EditError> {
        self.require_container(track, container)?;
        let before = Arc::clone(self.pattern(track)?);
        let id = before.next_id(kind);
        let after = match kind {
            GroupKind::Group => self.selections.group(&before, track, container),
            GroupKind::Super => self.selections.super_group(&before, track, container),
        };
        if Arc::ptr_eq(&before, &after) {
            console::warn(format!("cannot {} selection in {}", kind.as_str(), container));
            return Ok(None);
        }
        self.commit(track, after)?;
        Ok(Some(ContainerRef::named(kind, id)))
    }

    pub fn ungroup(&mut self, track: usize, container: &ContainerRef) -> Result<bool, EditError> {
        self.require_container(track, container)?;
        let before = Arc::clone(self.pattern(track)?);
        let after = self.selections.ungroup(&before, track, container);
        if Arc::ptr_eq(&before, &after) {
            return Ok(false);
        }
        self.commit(track, after)?;
        Ok(true)
    }

    /// Delete the selected items.
    pub fn cut(&mut self, track: usize, container: &ContainerRef) -> Result<bool, EditError> {
        self.require_container(track, container)?;
        let before = Arc::clone(self.pattern(track)?);
        let after = self.selections.remove(&before, track, container);
        if Arc::ptr_eq(&before, &after) {
            return Ok(false);
        }
        self.commit(track, after)?;
        Ok(true)
    }

    /// Start dragging the selected block of `container`. Replaces any drag
    /// already in progress. Returns the block's source index range.
    pub fn begin_drag(&mut self, track: usize, container: &ContainerRef) -> Result<(usize, usize), EditError> {
        let timeline = self.timeline(track, container, true)?;
        let selected = self.selections.get(track, container);
        let drag = Drag::begin(&timeline, container.clone(), &selected)
            .ok_or_else(|| EditError::NotABlock(container.clone()))?;
        let block = drag.block();
        self.drag = Some(ActiveDrag { track, drag });
        Ok(block)
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    pub fn proposal(&self) -> Option<&Proposal> {
        self.drag.as_ref().and_then(|active| active.drag.proposal())
    }

    /// Preview the drop at `pointer_step`. The pattern is left untouched.
    pub fn hover(&mut self, pointer_step: u32) -> Result<Proposal, EditError> {
        let (track, container) = match &self.drag {
            Some(active) => (active.track, active.drag.container().clone()),
            None => return Err(EditError::NoDrag),
        };
        if pointer_step > MAX_STEPS {
            return Err(EditError::TooManySteps(pointer_step));
        }
        let timeline = self.timeline(track, &container, true)?;
        let active = self.drag.as_mut().ok_or(EditError::NoDrag)?;
        Ok(active.drag.hover(&timeline, pointer_step).clone())
    }

    /// Commit the drag. Returns whether the pattern changed.
    pub fn drop_drag(&mut self) -> Result<bool, EditError> {
        let ActiveDrag { track, drag } = self.drag.take().ok_or(EditError::NoDrag)?;
        let container = drag.container().clone();
        let target = drag.proposal().map(|p| p.target_step);
        let before = Arc::clone(self.pattern(track)?);
        let pads = self.track(track)?.pad_lengths();
        let after = drag.commit(&before, &pads);
        if Arc::ptr_eq(&before, &after) {
            match target {
                Some(step) => console::warn(format!("move to step {} rejected in {}", step, container)),
                None => console::warn("drop without a target; nothing moved"),
            }
            return Ok(false);
        }
        self.selections.clear(track, &container);
        self.commit(track, after)?;
        Ok(true)
    }

    pub fn cancel_drag(&mut self) -> bool {
        self.drag.take().is_some()
    }

    /// One-shot block move of `block` (source indices) to `target_step`.
    pub fn move_block(
        &mut self,
        track: usize,
        container: &ContainerRef,
        block: (usize, usize),
        target_step: u32,
    ) -> Result<bool, EditError> {
        if target_step > MAX_STEPS {
            return Err(EditError::TooManySteps(target_step));
        }
        let pads = self.track(track)?.pad_lengths();
        let changed = self.apply(track, container, |p| apply_block_move(p, container, &pads, block, target_step))?;
        if !changed {
            console::warn(format!(
                "move of {}..={} to step {} rejected in {}",
                block.0, block.1, target_step, container
            ));
        }
        Ok(changed)
    }

    pub fn events(&self, track: usize) -> Result<Vec<PadEvent>, EditError> {
        let t = self.track(track)?;
        Ok(schedule::pad_events(&t.pattern, &t.pad_lengths()))
    }

    pub fn arrangement_steps(&self) -> u32 {
        schedule::arrangement_steps(&self.song)
    }

    pub fn check(&self, track: usize) -> Result<Diagnostics, EditError> {
        Ok(check::diagnose(self.pattern(track)?))
    }
}

fn check_steps(steps: u32) -> Result<(), EditError> {
    match steps {
        0 => Err(EditError::ZeroLength),
        s if s > MAX_STEPS => Err(EditError::TooManySteps(s)),
        _ => Ok(()),
    }
}

fn check_items(items: &[Item]) -> Result<(), EditError> {
    items.iter().try_for_each(|item| match item {
        Item::Pause { steps } => check_steps(*steps),
        _ => Ok(()),
    })
}

fn warn_diagnostics(track: usize, diagnostics: &Diagnostics) {
    for c in &diagnostics.cyclic {
        console::warn(format!("track {}: {} references itself", track + 1, c));
    }
    for c in &diagnostics.dangling {
        console::warn(format!("track {}: reference to missing {}", track + 1, c));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn editor_with(items: Vec<Item>) -> Editor {
        let mut ed = Editor::new(Config {
            default_pad_steps: 4,
            history_file: None,
        });
        let t = ed.add_track("Drums");
        ed.set_sequence(t, &ContainerRef::Root, items).expect("seq");
        ed
    }

    #[test]
    fn new_tracks_use_configured_pad_steps() {
        let mut ed = Editor::new(Config {
            default_pad_steps: 32,
            history_file: None,
        });
        let t = ed.add_track("Keys");
        assert_eq!(ed.track(t).expect("track").default_pad_steps, 32);
    }

    #[test]
    fn edits_clear_stale_selection() {
        let mut ed = editor_with(vec![Item::pad(0), Item::pad(1)]);
        ed.select(0, &ContainerRef::Root, 0, 1).expect("select");
        assert!(ed.insert(0, &ContainerRef::Root, 0, Item::pad(2)).expect("insert"));
        assert!(ed.selection(0, &ContainerRef::Root).is_empty());
    }

    #[test]
    fn oversized_lengths_are_rejected() {
        let mut ed = editor_with(vec![Item::pad(0)]);
        assert_eq!(ed.set_pad_steps(0, 1, Some(MAX_STEPS + 1)), Err(EditError::TooManySteps(MAX_STEPS + 1)));
        assert_eq!(ed.set_default_pad_steps(0, 0), Err(EditError::ZeroLength));
        assert_eq!(
            ed.insert(0, &ContainerRef::Root, 0, Item::pause(u32::MAX)),
            Err(EditError::TooManySteps(u32::MAX))
        );
        assert_eq!(
            ed.move_block(0, &ContainerRef::Root, (0, 0), u32::MAX - 3),
            Err(EditError::TooManySteps(u32::MAX - 3))
        );
    }

    #[test]
    fn replaced_pause_expands_in_place() {
        let mut ed = editor_with(vec![Item::pad(0), Item::pad(1)]);
        assert!(ed.replace(0, &ContainerRef::Root, 0, Item::pause(12)).expect("replace"));
        assert_eq!(
            &ed.pattern(0).expect("p").root[..],
            &[Item::pause(8), Item::pause(4), Item::pad(1)]
        );
        assert!(!ed.replace(0, &ContainerRef::Root, 9, Item::pause(12)).expect("replace"));
    }

    #[test]
    fn group_reports_new_container() {
        let mut ed = editor_with(vec![Item::pad(0), Item::pad(1), Item::pad(2)]);
        ed.select(0, &ContainerRef::Root, 1, 2).expect("select");
        let created = ed.group(0, &ContainerRef::Root, GroupKind::Group).expect("group");
        assert_eq!(created, Some(ContainerRef::Group { id: "g1".into() }));
        assert_eq!(&ed.pattern(0).expect("p").root[..], &[Item::pad(0), Item::group("g1")]);
    }

    #[test]
    fn missing_container_is_an_error() {
        let mut ed = editor_with(vec![]);
        let g9 = ContainerRef::Group { id: "g9".into() };
        assert_eq!(
            ed.insert(0, &g9, 0, Item::pad(0)),
            Err(EditError::NoSuchContainer { track: 0, container: g9 })
        );
        assert_eq!(ed.insert(3, &ContainerRef::Root, 0, Item::pad(0)), Err(EditError::NoSuchTrack(3)));
    }

    #[test]
    fn drag_preview_then_drop() {
        let mut ed = editor_with(vec![Item::pad(0), Item::pause(8), Item::pad(1)]);
        ed.select(0, &ContainerRef::Root, 2, 2).expect("select");
        assert_eq!(ed.begin_drag(0, &ContainerRef::Root).expect("drag"), (2, 2));
        let proposal = ed.hover(7).expect("hover");
        assert_eq!(proposal.target_step, 8);
        assert!(proposal.is_valid());
        assert_eq!(ed.pattern(0).expect("p").root.len(), 3);
        assert!(ed.drop_drag().expect("drop"));
        assert_eq!(
            &ed.pattern(0).expect("p").root[..],
            &[Item::pad(0), Item::pause(4), Item::pad(1), Item::pause(4)]
        );
        assert!(!ed.is_dragging());
    }

    #[test]
    fn removing_track_moves_drag_along() {
        let mut ed = editor_with(vec![Item::pad(0)]);
        let second = ed.add_track("Bass");
        ed.set_sequence(second, &ContainerRef::Root, vec![Item::pad(1), Item::pad(2)])
            .expect("seq");
        ed.select(second, &ContainerRef::Root, 0, 0).expect("select");
        ed.begin_drag(second, &ContainerRef::Root).expect("drag");
        ed.remove_track(0).expect("remove");
        ed.hover(4).expect("hover");
        assert!(ed.drop_drag().expect("drop"));
        assert_eq!(&ed.pattern(0).expect("p").root[..], &[Item::pad(2), Item::pad(1)]);
    }

    #[test]
    fn cancel_leaves_pattern() {
        let mut ed = editor_with(vec![Item::pad(0), Item::pad(1)]);
        ed.select(0, &ContainerRef::Root, 0, 0).expect("select");
        ed.begin_drag(0, &ContainerRef::Root).expect("drag");
        ed.hover(4).expect("hover");
        assert!(ed.cancel_drag());
        assert_eq!(ed.drop_drag(), Err(EditError::NoDrag));
        assert_eq!(&ed.pattern(0).expect("p").root[..], &[Item::pad(0), Item::pad(1)]);
    }
}
