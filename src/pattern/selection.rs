//! Per-container selections and the commands that act on them.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use super::store;
use crate::model::pattern::{ContainerRef, GroupKind, Pattern};

/// Selected source indices, kept apart from the pattern itself.
#[derive(Debug, Clone, Default)]
pub struct Selections {
    sets: HashMap<(usize, ContainerRef), BTreeSet<usize>>,
}

impl Selections {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, track: usize, container: &ContainerRef) -> Vec<usize> {
        self.sets
            .get(&(track, container.clone()))
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn is_empty(&self, track: usize, container: &ContainerRef) -> bool {
        self.sets
            .get(&(track, container.clone()))
            .map_or(true, |set| set.is_empty())
    }

    pub fn select(&mut self, track: usize, container: &ContainerRef, index: usize) {
        self.sets.entry((track, container.clone())).or_default().insert(index);
    }

    /// Add `first..=last` to the selection.
    pub fn select_range(&mut self, track: usize, container: &ContainerRef, first: usize, last: usize) {
        let (lo, hi) = if first <= last { (first, last) } else { (last, first) };
        self.sets.entry((track, container.clone())).or_default().extend(lo..=hi);
    }

    pub fn toggle(&mut self, track: usize, container: &ContainerRef, index: usize) {
        let set = self.sets.entry((track, container.clone())).or_default();
        if !set.remove(&index) {
            set.insert(index);
        }
    }

    pub fn clear(&mut self, track: usize, container: &ContainerRef) {
        self.sets.remove(&(track, container.clone()));
    }

    /// Drop every selection of `track` and shift those of later tracks down.
    pub fn forget_track(&mut self, track: usize) {
        let old = std::mem::take(&mut self.sets);
        for ((t, container), set) in old {
            if t < track {
                self.sets.insert((t, container), set);
            } else if t > track {
                self.sets.insert((t - 1, container), set);
            }
        }
    }

    pub fn clear_all(&mut self) {
        self.sets.clear();
    }

    pub fn can_group(&self, pattern: &Pattern, track: usize, container: &ContainerRef, kind: GroupKind) -> bool {
        store::can_group_selection(pattern, container, &self.get(track, container), kind)
    }

    /// Group the current selection into a new `group` container.
    pub fn group(&mut self, pattern: &Arc<Pattern>, track: usize, container: &ContainerRef) -> Arc<Pattern> {
        self.group_as(pattern, track, container, GroupKind::Group)
    }

    /// Group the current selection into a new `super-group` container.
    pub fn super_group(&mut self, pattern: &Arc<Pattern>, track: usize, container: &ContainerRef) -> Arc<Pattern> {
        self.group_as(pattern, track, container, GroupKind::Super)
    }

    fn group_as(
        &mut self,
        pattern: &Arc<Pattern>,
        track: usize,
        container: &ContainerRef,
        kind: GroupKind,
    ) -> Arc<Pattern> {
        let indices = self.get(track, container);
        if !store::can_group_selection(pattern, container, &indices, kind) {
            return Arc::clone(pattern);
        }
        let next = store::group_selection(pattern, container, &indices, kind);
        self.clear_if_changed(pattern, &next, track, container);
        next
    }

    pub fn ungroup(&mut self, pattern: &Arc<Pattern>, track: usize, container: &ContainerRef) -> Arc<Pattern> {
        let indices = self.get(track, container);
        let next = store::ungroup_selection(pattern, container, &indices);
        self.clear_if_changed(pattern, &next, track, container);
        next
    }

    pub fn remove(&mut self, pattern: &Arc<Pattern>, track: usize, container: &ContainerRef) -> Arc<Pattern> {
        let indices = self.get(track, container);
        let next = store::remove_items(pattern, container, &indices);
        self.clear_if_changed(pattern, &next, track, container);
        next
    }

    fn clear_if_changed(&mut self, before: &Arc<Pattern>, after: &Arc<Pattern>, track: usize, container: &ContainerRef) {
        if !Arc::ptr_eq(before, after) {
            self.clear(track, container);
        }
    }
}
