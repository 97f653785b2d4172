//! Breadth-first traversal of the table shared by the visibility systems.

use crate::VisibilityTable;

/// Reusable work queue for walking the table outward from the origin.
///
/// Each entry enters the queue at most once between two calls to
/// [`TableWalk::restart`], so the queue never grows past the table's cell
/// count. Entries come out ordered by their dominant-axis offset.
#[derive(Clone, Debug, Default)]
pub struct TableWalk {
    queue: Vec<u16>,
    enqueued: Vec<bool>,
    head: usize,
}

impl TableWalk {
    /// Creates an empty walk.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resets the walk and seeds it with the origin's two children.
    pub fn restart(&mut self, table: &VisibilityTable) {
        self.queue.clear();
        self.head = 0;
        self.enqueued.clear();
        self.enqueued.resize(table.len(), false);
        for seed in VisibilityTable::SEEDS {
            self.push(seed);
        }
    }

    /// Dequeues the next entry index.
    pub fn next_entry(&mut self) -> Option<usize> {
        let index = *self.queue.get(self.head)?;
        self.head += 1;
        Some(usize::from(index))
    }

    /// Enqueues the children of the provided entry.
    pub fn expand(&mut self, table: &VisibilityTable, index: usize) {
        if let Some(entry) = table.entry(index) {
            for child in entry.children() {
                self.push(child);
            }
        }
    }

    fn push(&mut self, index: usize) {
        if index == VisibilityTable::ORIGIN {
            return;
        }
        let Some(slot) = self.enqueued.get_mut(index) else {
            return;
        };
        if *slot {
            return;
        }
        *slot = true;
        if let Ok(index) = u16::try_from(index) {
            self.queue.push(index);
        }
    }
}
