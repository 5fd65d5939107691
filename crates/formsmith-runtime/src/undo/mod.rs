#![forbid(unsafe_code)]

//! Snapshot-based undo/redo.
//!
//! Every committed command produces a new immutable document; [`History`]
//! stacks those snapshots and pairs each step with an [`ActionMeta`] so that
//! undo/redo can restore the interaction state and announce what changed.

pub mod history;

pub use history::{ActionMeta, DEFAULT_MAX_DEPTH, History, HistoryConfig};
