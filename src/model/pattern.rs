use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// Every duration on the timeline is rounded up to a multiple of this.
pub const GRID_QUANTUM: u32 = 4;

/// Number of fixed pads per track (indices 0..=7).
pub const PAD_COUNT: usize = 8;

/// Allowed explicit-rest lengths, ascending.
pub const PAUSE_LENGTHS: [u32; 4] = [4, 8, 16, 32];

/// Pad length used when neither the pad nor the track say otherwise.
pub const DEFAULT_PAD_STEPS: u32 = 16;

/// Longest pad, pause or move target accepted from user input.
pub const MAX_STEPS: u32 = 1 << 16;

/// An ordered, shared run of items. Cloning a `Sequence` is a refcount bump.
pub type Sequence = Arc<[Item]>;

/// One step-grid element of a container.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Item {
    /// Reference to one of the track's pads; length comes from pad config.
    Pad { pad: u8 },
    /// Explicit rest.
    Pause { steps: u32 },
    /// Reference to a named group.
    Group { id: String },
    /// Reference to a named super-group.
    Super { id: String },
}

impl Item {
    pub fn pad(pad: u8) -> Self {
        Item::Pad { pad }
    }

    pub fn pause(steps: u32) -> Self {
        Item::Pause { steps }
    }

    pub fn group(id: impl Into<String>) -> Self {
        Item::Group { id: id.into() }
    }

    pub fn super_group(id: impl Into<String>) -> Self {
        Item::Super { id: id.into() }
    }

    pub fn is_pause(&self) -> bool {
        matches!(self, Item::Pause { .. })
    }

    /// The named container this item points at, if it is a reference.
    pub fn reference(&self) -> Option<ContainerRef> {
        match self {
            Item::Group { id } => Some(ContainerRef::Group { id: id.clone() }),
            Item::Super { id } => Some(ContainerRef::Super { id: id.clone() }),
            Item::Pad { .. } | Item::Pause { .. } => None,
        }
    }
}

/// Kind of named container created by grouping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GroupKind {
    Group,
    Super,
}

impl GroupKind {
    pub fn id_prefix(self) -> &'static str {
        match self {
            GroupKind::Group => "g",
            GroupKind::Super => "s",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            GroupKind::Group => "group",
            GroupKind::Super => "super-group",
        }
    }
}

/// Address of a container within one track's pattern.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ContainerRef {
    Root,
    Group { id: String },
    Super { id: String },
}

impl ContainerRef {
    pub fn named(kind: GroupKind, id: impl Into<String>) -> Self {
        match kind {
            GroupKind::Group => ContainerRef::Group { id: id.into() },
            GroupKind::Super => ContainerRef::Super { id: id.into() },
        }
    }

    /// The item that references this container; `None` for the root.
    pub fn to_item(&self) -> Option<Item> {
        match self {
            ContainerRef::Root => None,
            ContainerRef::Group { id } => Some(Item::group(id.clone())),
            ContainerRef::Super { id } => Some(Item::super_group(id.clone())),
        }
    }
}

impl fmt::Display for ContainerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContainerRef::Root => write!(f, "root"),
            ContainerRef::Group { id } | ContainerRef::Super { id } => write!(f, "{}", id),
        }
    }
}

/// Per-track nested pattern: the root sequence plus named container tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    #[serde(default = "empty_sequence")]
    pub root: Sequence,
    #[serde(default)]
    pub groups: BTreeMap<String, Sequence>,
    #[serde(default)]
    pub supers: BTreeMap<String, Sequence>,
}

fn empty_sequence() -> Sequence {
    Arc::from(Vec::<Item>::new())
}

impl Default for Pattern {
    fn default() -> Self {
        Self {
            root: empty_sequence(),
            groups: BTreeMap::new(),
            supers: BTreeMap::new(),
        }
    }
}

impl Pattern {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_root(items: Vec<Item>) -> Self {
        Self {
            root: Arc::from(items),
            ..Self::default()
        }
    }

    /// Builder helper used when assembling patterns by hand.
    pub fn with_group(mut self, id: impl Into<String>, items: Vec<Item>) -> Self {
        self.groups.insert(id.into(), Arc::from(items));
        self
    }

    pub fn with_super(mut self, id: impl Into<String>, items: Vec<Item>) -> Self {
        self.supers.insert(id.into(), Arc::from(items));
        self
    }

    pub fn sequence(&self, container: &ContainerRef) -> Option<&Sequence> {
        match container {
            ContainerRef::Root => Some(&self.root),
            ContainerRef::Group { id } => self.groups.get(id),
            ContainerRef::Super { id } => self.supers.get(id),
        }
    }

    pub fn table(&self, kind: GroupKind) -> &BTreeMap<String, Sequence> {
        match kind {
            GroupKind::Group => &self.groups,
            GroupKind::Super => &self.supers,
        }
    }

    pub(crate) fn table_mut(&mut self, kind: GroupKind) -> &mut BTreeMap<String, Sequence> {
        match kind {
            GroupKind::Group => &mut self.groups,
            GroupKind::Super => &mut self.supers,
        }
    }

    /// Smallest unused id of the form `g<n>` / `s<n>`.
    pub fn next_id(&self, kind: GroupKind) -> String {
        let table = self.table(kind);
        let mut n = 1usize;
        loop {
            let candidate = format!("{}{}", kind.id_prefix(), n);
            if !table.contains_key(&candidate) {
                return candidate;
            }
            n += 1;
        }
    }

    /// Every container address that currently exists, root first.
    pub fn containers(&self) -> Vec<ContainerRef> {
        let mut out = vec![ContainerRef::Root];
        out.extend(self.groups.keys().map(|id| ContainerRef::Group { id: id.clone() }));
        out.extend(self.supers.keys().map(|id| ContainerRef::Super { id: id.clone() }));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_id_fills_lowest_gap() {
        let p = Pattern::new()
            .with_group("g1", vec![])
            .with_group("g3", vec![]);
        assert_eq!(p.next_id(GroupKind::Group), "g2");
        assert_eq!(p.next_id(GroupKind::Super), "s1");
    }

    #[test]
    fn missing_named_container_is_none() {
        let p = Pattern::with_root(vec![Item::pad(0)]);
        assert!(p.sequence(&ContainerRef::Root).is_some());
        assert!(p.sequence(&ContainerRef::Group { id: "g9".into() }).is_none());
    }

    #[test]
    fn reference_items_round_trip_container_refs() {
        let r = ContainerRef::Super { id: "s2".into() };
        let item = r.to_item().expect("named");
        assert_eq!(item.reference(), Some(r));
        assert_eq!(ContainerRef::Root.to_item(), None);
    }
}
