//! Pure mutations over pattern snapshots.
//!
//! Every function takes the current snapshot and returns the next one. When
//! an operation changes nothing the input `Arc` is handed back, so callers
//! can skip work with `Arc::ptr_eq`.

use std::collections::BTreeSet;
use std::sync::Arc;

use crate::model::pattern::{ContainerRef, GroupKind, Item, Pattern, Sequence};

pub fn container_sequence<'a>(pattern: &'a Pattern, container: &ContainerRef) -> Option<&'a Sequence> {
    pattern.sequence(container)
}

/// Swap in a new body for an existing container.
pub fn set_container_sequence(
    pattern: &Arc<Pattern>,
    container: &ContainerRef,
    items: Vec<Item>,
) -> Arc<Pattern> {
    let Some(current) = pattern.sequence(container) else {
        return Arc::clone(pattern);
    };
    if current[..] == items[..] {
        return Arc::clone(pattern);
    }
    let mut next = Pattern::clone(pattern);
    let seq: Sequence = Arc::from(items);
    match container {
        ContainerRef::Root => next.root = seq,
        ContainerRef::Group { id } => {
            next.groups.insert(id.clone(), seq);
        }
        ContainerRef::Super { id } => {
            next.supers.insert(id.clone(), seq);
        }
    }
    Arc::new(next)
}

/// Insert at `index`, clamped to the container length.
pub fn insert_item(pattern: &Arc<Pattern>, container: &ContainerRef, index: usize, item: Item) -> Arc<Pattern> {
    let Some(current) = pattern.sequence(container) else {
        return Arc::clone(pattern);
    };
    let mut items = current.to_vec();
    let at = index.min(items.len());
    items.insert(at, item);
    set_container_sequence(pattern, container, items)
}

/// Remove by source index. Order and duplicates in `indices` do not matter;
/// out-of-range indices are ignored.
pub fn remove_items(pattern: &Arc<Pattern>, container: &ContainerRef, indices: &[usize]) -> Arc<Pattern> {
    let Some(current) = pattern.sequence(container) else {
        return Arc::clone(pattern);
    };
    let doomed: BTreeSet<usize> = indices.iter().copied().filter(|&i| i < current.len()).collect();
    if doomed.is_empty() {
        return Arc::clone(pattern);
    }
    let items: Vec<Item> = current
        .iter()
        .enumerate()
        .filter(|(i, _)| !doomed.contains(i))
        .map(|(_, item)| item.clone())
        .collect();
    set_container_sequence(pattern, container, items)
}

/// Relocate one item. `to_index` is a position in the sequence after the
/// source has been taken out; anything past the end appends.
pub fn move_item_within_container(
    pattern: &Arc<Pattern>,
    container: &ContainerRef,
    from_index: usize,
    to_index: usize,
) -> Arc<Pattern> {
    let Some(current) = pattern.sequence(container) else {
        return Arc::clone(pattern);
    };
    if from_index >= current.len() {
        return Arc::clone(pattern);
    }
    let mut items = current.to_vec();
    let moved = items.remove(from_index);
    let at = to_index.min(items.len());
    items.insert(at, moved);
    set_container_sequence(pattern, container, items)
}

/// Overwrite the item at `index`.
pub fn replace_item(pattern: &Arc<Pattern>, container: &ContainerRef, index: usize, item: Item) -> Arc<Pattern> {
    let Some(current) = pattern.sequence(container) else {
        return Arc::clone(pattern);
    };
    if index >= current.len() {
        return Arc::clone(pattern);
    }
    let mut items = current.to_vec();
    items[index] = item;
    set_container_sequence(pattern, container, items)
}

/// Sorted, deduplicated indices if they form one gap-free run inside the
/// container.
pub(crate) fn contiguous_run(len: usize, indices: &[usize]) -> Option<(usize, usize)> {
    let set: BTreeSet<usize> = indices.iter().copied().collect();
    let first = *set.iter().next()?;
    let last = *set.iter().next_back()?;
    if last >= len || last - first + 1 != set.len() {
        return None;
    }
    Some((first, last))
}

pub fn can_group_selection(pattern: &Pattern, container: &ContainerRef, indices: &[usize], _kind: GroupKind) -> bool {
    match pattern.sequence(container) {
        Some(seq) => contiguous_run(seq.len(), indices).is_some(),
        None => false,
    }
}

/// Move a contiguous selection into a new named container and leave one
/// reference item in its place.
pub fn group_selection(
    pattern: &Arc<Pattern>,
    container: &ContainerRef,
    indices: &[usize],
    kind: GroupKind,
) -> Arc<Pattern> {
    let Some(current) = pattern.sequence(container) else {
        return Arc::clone(pattern);
    };
    let Some((first, last)) = contiguous_run(current.len(), indices) else {
        return Arc::clone(pattern);
    };

    let id = pattern.next_id(kind);
    let body: Vec<Item> = current[first..=last].to_vec();
    let reference = ContainerRef::named(kind, id.clone());
    let Some(reference_item) = reference.to_item() else {
        return Arc::clone(pattern);
    };

    let mut items = Vec::with_capacity(current.len() - body.len() + 1);
    items.extend_from_slice(&current[..first]);
    items.push(reference_item);
    items.extend_from_slice(&current[last + 1..]);

    let mut next = Pattern::clone(pattern);
    next.table_mut(kind).insert(id, Arc::from(body));
    let next = Arc::new(next);
    set_container_sequence(&next, container, items)
}

/// Splice the current body of every selected reference in place of the
/// reference. Pads, pauses and dangling references stay put; the named
/// definitions are kept in their tables.
pub fn ungroup_selection(pattern: &Arc<Pattern>, container: &ContainerRef, indices: &[usize]) -> Arc<Pattern> {
    let Some(current) = pattern.sequence(container) else {
        return Arc::clone(pattern);
    };
    let selected: BTreeSet<usize> = indices.iter().copied().filter(|&i| i < current.len()).collect();
    if selected.is_empty() {
        return Arc::clone(pattern);
    }

    let mut items = Vec::with_capacity(current.len());
    for (i, item) in current.iter().enumerate() {
        let body = if selected.contains(&i) {
            item.reference().and_then(|r| pattern.sequence(&r))
        } else {
            None
        };
        match body {
            Some(body) => items.extend(body.iter().cloned()),
            None => items.push(item.clone()),
        }
    }
    set_container_sequence(pattern, container, items)
}
