//! Module set diffing

use super::types::{Diff, ModuleSet};

/// Computes the delta between the desired and current module sets
pub trait DiffProvider: Send + Sync {
    fn diff(&self, desired: &ModuleSet, current: &ModuleSet) -> Diff;
}

/// Structural diff: a module is updated when it is new or any field changed
#[derive(Debug, Clone, Copy, Default)]
pub struct ModuleSetDiffer;

impl DiffProvider for ModuleSetDiffer {
    fn diff(&self, desired: &ModuleSet, current: &ModuleSet) -> Diff {
        let updated = desired
            .modules()
            .filter(|m| current.get(&m.name) != Some(*m))
            .cloned()
            .collect();

        let removed = current
            .names()
            .filter(|name| !desired.contains(name))
            .map(str::to_string)
            .collect();

        Diff { updated, removed }
    }
}
