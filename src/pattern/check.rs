//! Reference diagnostics.
//!
//! Nothing here rejects a pattern. Layout already survives dangling and
//! cyclic references; these reports only let the editor warn about them.

use std::collections::BTreeSet;

use crate::model::pattern::{ContainerRef, Pattern};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Diagnostics {
    pub dangling: Vec<ContainerRef>,
    pub cyclic: Vec<ContainerRef>,
}

impl Diagnostics {
    pub fn is_clean(&self) -> bool {
        self.dangling.is_empty() && self.cyclic.is_empty()
    }
}

pub fn diagnose(pattern: &Pattern) -> Diagnostics {
    Diagnostics {
        dangling: dangling_references(pattern),
        cyclic: cyclic_containers(pattern),
    }
}

/// Referenced containers missing from their table, in first-seen order.
pub fn dangling_references(pattern: &Pattern) -> Vec<ContainerRef> {
    let mut seen = BTreeSet::new();
    let mut out = Vec::new();
    for container in pattern.containers() {
        let Some(seq) = pattern.sequence(&container) else { continue };
        for reference in seq.iter().filter_map(|item| item.reference()) {
            if pattern.sequence(&reference).is_none() && seen.insert(reference.clone()) {
                out.push(reference);
            }
        }
    }
    out
}

/// Named containers that can reach themselves through references.
pub fn cyclic_containers(pattern: &Pattern) -> Vec<ContainerRef> {
    pattern
        .containers()
        .into_iter()
        .filter(|c| *c != ContainerRef::Root && reaches(pattern, c, c))
        .collect()
}

fn reaches(pattern: &Pattern, from: &ContainerRef, target: &ContainerRef) -> bool {
    let mut visited = BTreeSet::new();
    let mut stack = vec![from.clone()];
    while let Some(current) = stack.pop() {
        let Some(seq) = pattern.sequence(&current) else { continue };
        for reference in seq.iter().filter_map(|item| item.reference()) {
            if &reference == target {
                return true;
            }
            if visited.insert(reference.clone()) {
                stack.push(reference);
            }
        }
    }
    false
}
