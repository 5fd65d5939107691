#![forbid(unsafe_code)]

//! Normalized document model for the form designer.
//!
//! A [`Document`] is an immutable tree of [`Node`]s keyed by [`NodeId`].
//! Every edit is expressed as a [`Command`] and applied with
//! [`Document::apply`], which returns a new document sharing all untouched
//! nodes with the old one. The crate holds no state of its own and performs
//! no I/O; history and interaction tracking live in `formsmith-runtime`.

pub mod command;
pub mod document;
pub mod id;
pub mod naming;
pub mod node;
pub mod ops;

pub use command::{
    Command, CommandKind, ContainerPatch, ContextualLayoutPatch, LeafPatch, NodeSpec,
};
pub use document::{
    DEFAULT_FORM_NAME, Document, DocumentError, DocumentSnapshot, InvariantCode, InvariantIssue,
    InvariantReport, InvariantSeverity,
};
pub use id::NodeId;
pub use naming::{camel_case_identifier, default_placeholder};
pub use node::{
    Arrangement, Binding, BorderStyle, ContainerProps, ContextualLayout, ControlKind,
    Distribution, LeafProps, LinkTarget, Node, NodeKind,
};
pub use ops::{Applied, MAX_BATCH_DEPTH, OperationError, OperationFailure};
