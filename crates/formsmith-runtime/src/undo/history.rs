#![forbid(unsafe_code)]

//! Paired snapshot history.
//!
//! [`History`] keeps `past`/`present`/`future` snapshots of the designed
//! document together with a parallel stack of [`ActionMeta`] describing the
//! command that produced each step. Snapshots are `Arc<T>`, so when `T` is
//! built on persistent collections a thousand revisions cost little more
//! than one copy.
//!
//! ```text
//! record(d3, m3)
//! ┌───────────────────────────────────────────────┐
//! │ past:       [d0, d1, d2]   past_meta:   [m1, m2, m3] │
//! │ present:    d3                                        │
//! │ future:     []             future_meta: []            │
//! └───────────────────────────────────────────────┘
//!
//! undo() x2
//! ┌───────────────────────────────────────────────┐
//! │ past:       [d0]           past_meta:   [m1]         │
//! │ present:    d1                                        │
//! │ future:     [d3, d2]       future_meta: [m3, m2]     │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! `past_meta[i]` describes the step from `past[i]` to the next snapshot.
//!
//! # Invariants
//!
//! 1. `past.len() == past_meta.len()` and `future.len() == future_meta.len()`
//!    after every operation.
//! 2. `past.len() <= config.max_depth`; eviction drops the oldest snapshot
//!    and its meta together.
//! 3. `record` clears both future stacks.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use formsmith_model::CommandKind;
use serde::{Deserialize, Serialize};

use crate::interaction::InteractionState;

/// Default number of undoable steps kept.
pub const DEFAULT_MAX_DEPTH: usize = 200;

/// Configuration for [`History`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryConfig {
    /// Maximum number of undoable steps. Oldest steps are evicted beyond it.
    pub max_depth: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl HistoryConfig {
    #[must_use]
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    /// Create an unlimited configuration (for testing).
    #[must_use]
    pub fn unlimited() -> Self {
        Self {
            max_depth: usize::MAX,
        }
    }
}

/// Description of one committed step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionMeta {
    /// Commit sequence number, unique per designer.
    pub sequence: u64,
    pub kind: CommandKind,
    /// Human-readable summary shown in undo/redo notices.
    pub message: String,
    /// Interaction state live when the step was committed.
    pub interaction: InteractionState,
}

/// Snapshot history with lock-step action metadata.
pub struct History<T> {
    past: VecDeque<Arc<T>>,
    past_meta: VecDeque<ActionMeta>,
    present: Arc<T>,
    /// Most recently undone at the back.
    future: Vec<Arc<T>>,
    future_meta: Vec<ActionMeta>,
    config: HistoryConfig,
}

impl<T: fmt::Debug> fmt::Debug for History<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("History")
            .field("undo_depth", &self.past.len())
            .field("redo_depth", &self.future.len())
            .field("config", &self.config)
            .finish()
    }
}

impl<T> History<T> {
    #[must_use]
    pub fn new(initial: T, config: HistoryConfig) -> Self {
        Self::from_arc(Arc::new(initial), config)
    }

    #[must_use]
    pub fn from_arc(initial: Arc<T>, config: HistoryConfig) -> Self {
        Self {
            past: VecDeque::new(),
            past_meta: VecDeque::new(),
            present: initial,
            future: Vec::new(),
            future_meta: Vec::new(),
            config,
        }
    }

    // ====================================================================
    // Core Operations
    // ====================================================================

    /// Make `next` the present, pushing the old present onto `past`.
    ///
    /// Starts a new branch: everything redoable is dropped.
    pub fn record(&mut self, next: Arc<T>, meta: ActionMeta) {
        self.future.clear();
        self.future_meta.clear();
        let previous = std::mem::replace(&mut self.present, next);
        self.past.push_back(previous);
        self.past_meta.push_back(meta);
        self.enforce_depth();
    }

    /// Step back one snapshot. Returns the meta of the step undone.
    pub fn undo(&mut self) -> Option<&ActionMeta> {
        let previous = self.past.pop_back()?;
        let meta = self.past_meta.pop_back()?;
        let undone = std::mem::replace(&mut self.present, previous);
        self.future.push(undone);
        self.future_meta.push(meta);
        self.future_meta.last()
    }

    /// Re-apply the most recently undone snapshot. Returns its meta.
    pub fn redo(&mut self) -> Option<&ActionMeta> {
        let next = self.future.pop()?;
        let meta = self.future_meta.pop()?;
        let previous = std::mem::replace(&mut self.present, next);
        self.past.push_back(previous);
        self.past_meta.push_back(meta);
        self.enforce_depth();
        self.past_meta.back()
    }

    #[must_use]
    pub fn present(&self) -> &Arc<T> {
        &self.present
    }

    // ====================================================================
    // Query
    // ====================================================================

    #[must_use]
    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    /// Number of undoable steps.
    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.past.len()
    }

    /// Number of redoable steps.
    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.future.len()
    }

    /// Meta of the step `undo` would revert.
    #[must_use]
    pub fn next_undo(&self) -> Option<&ActionMeta> {
        self.past_meta.back()
    }

    /// Meta of the step `redo` would re-apply.
    #[must_use]
    pub fn next_redo(&self) -> Option<&ActionMeta> {
        self.future_meta.last()
    }

    /// Undoable steps, oldest first.
    pub fn past_meta(&self) -> impl Iterator<Item = &ActionMeta> {
        self.past_meta.iter()
    }

    /// Redoable steps, next-to-redo first.
    pub fn future_meta(&self) -> impl Iterator<Item = &ActionMeta> {
        self.future_meta.iter().rev()
    }

    /// Whether both stack pairs have matching lengths.
    #[must_use]
    pub fn is_lockstep(&self) -> bool {
        self.past.len() == self.past_meta.len() && self.future.len() == self.future_meta.len()
    }

    #[must_use]
    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    // ====================================================================
    // Maintenance
    // ====================================================================

    /// Forget every step, keeping the present snapshot.
    pub fn clear(&mut self) {
        self.past.clear();
        self.past_meta.clear();
        self.future.clear();
        self.future_meta.clear();
    }

    fn enforce_depth(&mut self) {
        while self.past.len() > self.config.max_depth {
            self.past.pop_front();
            self.past_meta.pop_front();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(sequence: u64, message: &str) -> ActionMeta {
        ActionMeta {
            sequence,
            kind: CommandKind::Rename,
            message: message.to_owned(),
            interaction: InteractionState::Idle,
        }
    }

    fn history_of(values: &[i32], config: HistoryConfig) -> History<i32> {
        let mut history = History::new(0, config);
        for (i, value) in values.iter().enumerate() {
            history.record(Arc::new(*value), meta(i as u64 + 1, &format!("set {value}")));
        }
        history
    }

    #[test]
    fn new_history_has_nothing_to_undo() {
        let history = History::new(7, HistoryConfig::default());
        assert_eq!(**history.present(), 7);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
        assert!(history.next_undo().is_none());
    }

    #[test]
    fn undo_and_redo_walk_snapshots_with_meta() {
        let mut history = history_of(&[1, 2, 3], HistoryConfig::default());
        assert_eq!(history.undo().map(|m| m.message.as_str()), Some("set 3"));
        assert_eq!(**history.present(), 2);
        assert_eq!(history.undo().map(|m| m.sequence), Some(2));
        assert_eq!(**history.present(), 1);
        assert_eq!(history.redo_depth(), 2);
        assert_eq!(history.next_redo().map(|m| m.message.as_str()), Some("set 2"));

        assert_eq!(history.redo().map(|m| m.sequence), Some(2));
        assert_eq!(**history.present(), 2);
        assert!(history.is_lockstep());
    }

    #[test]
    fn undo_past_the_beginning_is_none() {
        let mut history = history_of(&[1], HistoryConfig::default());
        assert!(history.undo().is_some());
        assert!(history.undo().is_none());
        assert_eq!(**history.present(), 0);
    }

    #[test]
    fn record_clears_future() {
        let mut history = history_of(&[1, 2], HistoryConfig::default());
        history.undo();
        history.record(Arc::new(9), meta(3, "set 9"));
        assert!(!history.can_redo());
        assert!(history.redo().is_none());
        assert_eq!(history.undo_depth(), 2);
        assert!(history.is_lockstep());
    }

    #[test]
    fn depth_limit_evicts_snapshot_and_meta_together() {
        let history = history_of(&[1, 2, 3, 4, 5], HistoryConfig::new(3));
        assert_eq!(history.undo_depth(), 3);
        assert!(history.is_lockstep());
        let sequences: Vec<u64> = history.past_meta().map(|m| m.sequence).collect();
        assert_eq!(sequences, vec![3, 4, 5]);
    }

    #[test]
    fn redo_respects_depth_limit() {
        let mut history = history_of(&[1, 2, 3], HistoryConfig::new(2));
        history.undo();
        history.undo();
        assert_eq!(**history.present(), 1);
        history.redo();
        history.redo();
        assert_eq!(**history.present(), 3);
        assert!(history.undo_depth() <= 2);
        assert!(history.is_lockstep());
    }

    #[test]
    fn clear_keeps_present() {
        let mut history = history_of(&[1, 2], HistoryConfig::unlimited());
        history.undo();
        history.clear();
        assert_eq!(**history.present(), 1);
        assert!(!history.can_undo());
        assert!(!history.can_redo());
    }

    #[test]
    fn snapshots_share_allocation() {
        let shared = Arc::new(5);
        let mut history = History::new(0, HistoryConfig::default());
        history.record(Arc::clone(&shared), meta(1, "five"));
        assert!(Arc::ptr_eq(history.present(), &shared));
    }
}
