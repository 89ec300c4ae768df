use std::collections::{HashMap, HashSet};

use uuid::Uuid;

/// Maps per-session integer track ids to stable UUIDs.
#[derive(Debug, Default)]
pub struct IdMapper {
    ids: HashMap<i64, Uuid>,
}

impl IdMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stable id for `id`, allocated on first sight.
    pub fn get(&mut self, id: i64) -> Uuid {
        *self.ids.entry(id).or_insert_with(Uuid::new_v4)
    }

    /// Drop every mapping whose UUID is not in `keep`.
    pub fn remove_all_except(&mut self, keep: &HashSet<Uuid>) {
        self.ids.retain(|_, uuid| keep.contains(uuid));
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}
