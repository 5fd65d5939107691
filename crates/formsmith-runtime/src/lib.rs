#![forbid(unsafe_code)]

//! Designer runtime: command dispatch, undo/redo and interaction state.
//!
//! [`Designer`] is the single writer of the form document. It routes every
//! [`Command`](formsmith_model::Command) through
//! [`Document::apply`](formsmith_model::Document::apply), keeps paired
//! snapshot/meta history, and exposes read-only [`Observable`] projections
//! for views to subscribe to.
//!
//! # Modules
//!
//! - [`designer`]: the session object and its outcomes.
//! - [`undo`]: snapshot history with lock-step action metadata.
//! - [`interaction`]: selection / inline-editing state.
//! - [`gesture`]: drag-and-drop session that yields at most one command.
//! - [`reactive`]: change-notifying value cells.
//! - [`config`]: session configuration, optionally loaded from files.

pub mod config;
pub mod designer;
pub mod gesture;
pub mod interaction;
pub mod reactive;
pub mod undo;

pub use config::{ConfigError, DesignerConfig};
pub use designer::{
    CommitOutcome, Designer, DocumentHandle, HistoryAction, HistoryFlags, HistoryNotice,
};
pub use gesture::{DragPhase, DragSession, DragSource, DropHint, DropResolution};
pub use interaction::InteractionState;
pub use reactive::{Observable, Subscription};
pub use undo::{ActionMeta, History, HistoryConfig};
