//! Selection state: an ordered target list and the index the encoder points at.

use tracing::warn;

/// Largest list the single-byte wire fields can describe.
pub const MAX_ITEMS: usize = u8::MAX as usize;

/// Items with a stable identity, independent of their display label.
pub trait Identified {
    type Id: PartialEq;

    fn id(&self) -> Self::Id;
    fn label(&self) -> &str;
}

/// Result of applying a new snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplaceOutcome {
    /// Same identities at every position; nothing changed.
    Unchanged,
    /// List replaced; the index was kept or reset.
    Replaced,
}

/// Ordered items plus the current index.
///
/// `0 <= index < len` whenever the list is non-empty.
#[derive(Debug, Clone)]
pub struct Selection<T> {
    items: Vec<T>,
    index: usize,
}

impl<T> Default for Selection<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            index: 0,
        }
    }
}

impl<T: Identified> Selection<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Current index, or `None` when the list is empty.
    pub fn index(&self) -> Option<usize> {
        (!self.items.is_empty()).then_some(self.index)
    }

    /// The selected item.
    pub fn current(&self) -> Option<&T> {
        self.items.get(self.index)
    }

    /// Apply a new snapshot, compared position-wise by identity.
    ///
    /// Snapshots longer than [`MAX_ITEMS`] are truncated.
    pub fn replace(&mut self, mut items: Vec<T>) -> ReplaceOutcome {
        if items.len() > MAX_ITEMS {
            warn!(
                count = items.len(),
                max = MAX_ITEMS,
                "Selection list truncated to wire limit"
            );
            items.truncate(MAX_ITEMS);
        }
        let unchanged = items.len() == self.items.len()
            && items.iter().zip(&self.items).all(|(a, b)| a.id() == b.id());
        if unchanged {
            return ReplaceOutcome::Unchanged;
        }
        self.items = items;
        if self.index >= self.items.len() {
            self.index = 0;
        }
        ReplaceOutcome::Replaced
    }

    /// Move the index one step with wrap-around. Returns the new selection, or
    /// `None` (no-op) when the list is empty.
    pub fn rotate(&mut self, step: i32) -> Option<&T> {
        let len = self.items.len();
        if len == 0 {
            return None;
        }
        let next = (self.index as i64 + step as i64).rem_euclid(len as i64);
        self.index = next as usize;
        self.items.get(self.index)
    }
}
