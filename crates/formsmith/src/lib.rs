#![forbid(unsafe_code)]

//! formsmith public facade crate.
//!
//! Re-exports the document model and the designer runtime behind one
//! dependency, plus a top-level [`Error`] and a prelude for day-to-day use.
//!
//! ```rust,ignore
//! use formsmith::prelude::*;
//!
//! let mut designer = Designer::new();
//! designer.commit(
//!     Command::AddNode { parent: NodeId::root(), index: 0, spec: NodeSpec::text_input("Name") },
//!     "Add Name",
//! );
//! designer.undo();
//! ```

use std::fmt;

// --- Model re-exports ------------------------------------------------------

pub use formsmith_model::{
    Applied, Arrangement, Binding, BorderStyle, Command, CommandKind, ContainerPatch,
    ContainerProps, ContextualLayout, ContextualLayoutPatch, ControlKind, DEFAULT_FORM_NAME,
    Distribution, Document, DocumentError, DocumentSnapshot, InvariantReport, LeafPatch,
    LeafProps, LinkTarget, Node, NodeId, NodeKind, NodeSpec, OperationError, OperationFailure,
};

// --- Runtime re-exports ----------------------------------------------------

pub use formsmith_runtime::{
    CommitOutcome, ConfigError, Designer, DesignerConfig, DocumentHandle, DragSession,
    DragSource, DropHint, DropResolution, HistoryAction, HistoryConfig, HistoryFlags,
    HistoryNotice, InteractionState, Observable, Subscription,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for formsmith hosts.
#[derive(Debug)]
pub enum Error {
    /// A command was refused; the document is unchanged.
    Operation(OperationError),
    /// A document snapshot failed structural validation.
    Document(DocumentError),
    /// Configuration could not be loaded or is invalid.
    Config(ConfigError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Operation(err) => write!(f, "{err}"),
            Self::Document(err) => write!(f, "invalid document: {err}"),
            Self::Config(err) => write!(f, "configuration: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Operation(err) => Some(err),
            Self::Document(err) => Some(err),
            Self::Config(err) => Some(err),
        }
    }
}

impl From<OperationError> for Error {
    fn from(err: OperationError) -> Self {
        Self::Operation(err)
    }
}

impl From<DocumentError> for Error {
    fn from(err: DocumentError) -> Self {
        Self::Document(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

/// Standard result type for formsmith APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Session helpers ------------------------------------------------------

/// Open a designer session on a previously saved document.
///
/// Both the configuration and the snapshot are validated; the snapshot's
/// own form name wins over `config.form_name`.
pub fn open(snapshot: DocumentSnapshot, config: DesignerConfig) -> Result<Designer> {
    let errors = config.validate();
    if !errors.is_empty() {
        return Err(ConfigError::Validation(errors).into());
    }
    let document = Document::from_snapshot(snapshot)?;
    Ok(Designer::with_document(document, config))
}

/// Commit `command`, turning a rejection into an [`Error`].
///
/// Returns the commit sequence number on success.
pub fn commit(designer: &mut Designer, command: Command, message: &str) -> Result<u64> {
    match designer.commit(command, message) {
        CommitOutcome::Applied { sequence, .. } => Ok(sequence),
        CommitOutcome::Rejected(err) => Err(err.into()),
    }
}

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Command, CommitOutcome, ControlKind, Designer, DesignerConfig, Document, Error,
        InteractionState, LeafPatch, NodeId, NodeSpec, Result,
    };

    pub use crate::{model, runtime};
}

pub use formsmith_model as model;
pub use formsmith_runtime as runtime;

#[cfg(test)]
mod tests {
    use super::*;

    fn add_name() -> Command {
        Command::AddNode {
            parent: NodeId::root(),
            index: 0,
            spec: NodeSpec::text_input("Name"),
        }
    }

    #[test]
    fn open_restores_saved_document() {
        let mut designer = Designer::new();
        commit(&mut designer, add_name(), "Add Name").expect("commit");
        let json = serde_json::to_string(&designer.document().to_snapshot()).expect("save");

        let snapshot: DocumentSnapshot = serde_json::from_str(&json).expect("load");
        let reopened = open(snapshot, DesignerConfig::default()).expect("open");
        assert_eq!(reopened.document(), designer.document());
        assert!(!reopened.can_undo());
    }

    #[test]
    fn open_rejects_bad_config_before_snapshot() {
        let snapshot = Document::new("x").to_snapshot();
        let err = open(snapshot, DesignerConfig::default().with_max_depth(0)).expect_err("bad");
        assert!(matches!(err, Error::Config(ConfigError::Validation(_))));
        assert!(err.to_string().starts_with("configuration:"));
    }

    #[test]
    fn open_rejects_corrupt_snapshot() {
        let mut snapshot = Document::new("x").to_snapshot();
        snapshot.root = NodeId::new("missing");
        let err = open(snapshot, DesignerConfig::default()).expect_err("corrupt");
        assert!(matches!(err, Error::Document(_)));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn commit_helper_surfaces_rejection() {
        let mut designer = Designer::new();
        assert_eq!(commit(&mut designer, add_name(), "Add Name").expect("first"), 1);
        let err = commit(
            &mut designer,
            Command::DeleteSubtree {
                node: NodeId::root(),
            },
            "Delete root",
        )
        .expect_err("root delete");
        match err {
            Error::Operation(op) => assert_eq!(op.kind, CommandKind::DeleteSubtree),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn prelude_covers_common_flow() {
        use crate::prelude::*;
        let mut designer = Designer::with_config(DesignerConfig::default());
        let outcome = designer.commit(add_name(), "Add Name");
        assert!(matches!(outcome, CommitOutcome::Applied { .. }));
        assert_eq!(designer.interaction(), InteractionState::Idle);
    }
}
