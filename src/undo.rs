//! Undo/Redo history for annotation editing.
//!
//! Every discrete action (starting a box, starting a move or resize,
//! deleting) records a full copy of the [`AnnotationStore`] as it was right
//! before the action. Undo swaps the current store with the most recent
//! snapshot; redo swaps it back.

use crate::constants::DEFAULT_HISTORY_DEPTH;
use crate::model::AnnotationStore;

/// Configuration for the history
#[derive(Debug, Clone)]
pub struct HistoryConfig {
    /// Maximum number of snapshots to keep on the undo side
    pub max_history: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_history: DEFAULT_HISTORY_DEPTH,
        }
    }
}

/// Snapshot-based undo/redo stacks.
///
/// - `past`: stores to return to on undo (most recent at the end)
/// - `future`: stores to return to on redo (most recent at the end)
///
/// Recording a new snapshot clears `future`.
#[derive(Debug, Clone, Default)]
pub struct History {
    past: Vec<AnnotationStore>,
    future: Vec<AnnotationStore>,
    config: HistoryConfig,
}

impl History {
    /// Create a new empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom configuration
    pub fn with_config(config: HistoryConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Record the store as it is before a mutating action.
    pub fn begin(&mut self, store: &AnnotationStore) {
        self.past.push(store.clone());
        self.future.clear();

        if self.past.len() > self.config.max_history {
            let excess = self.past.len() - self.config.max_history;
            self.past.drain(..excess);
        }
        log::debug!(
            "📝 History: snapshot of {} annotations ({} undo steps)",
            store.len(),
            self.past.len()
        );
    }

    /// Step back. `current` goes to the redo side and the previous store is
    /// returned, or `None` when there is nothing to undo.
    pub fn undo(&mut self, current: &AnnotationStore) -> Option<AnnotationStore> {
        let previous = self.past.pop()?;
        self.future.push(current.clone());
        log::debug!("⏪ Undo: restoring {} annotations", previous.len());
        Some(previous)
    }

    /// Step forward again after an undo.
    pub fn redo(&mut self, current: &AnnotationStore) -> Option<AnnotationStore> {
        let next = self.future.pop()?;
        self.past.push(current.clone());
        log::debug!("⏩ Redo: restoring {} annotations", next.len());
        Some(next)
    }

    /// Drop the most recent snapshot without restoring it.
    ///
    /// Used when an action that recorded a snapshot turns out to change
    /// nothing (e.g. a creation drag below the minimum size).
    pub fn discard_last(&mut self) -> Option<AnnotationStore> {
        self.past.pop()
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn undo_count(&self) -> usize {
        self.past.len()
    }

    pub fn redo_count(&self) -> usize {
        self.future.len()
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
        log::debug!("🗑️ History cleared");
    }
}
