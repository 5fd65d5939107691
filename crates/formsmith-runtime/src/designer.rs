#![forbid(unsafe_code)]

//! The designer session: single writer of the document.
//!
//! [`Designer`] owns the undo history and the live interaction state. Every
//! edit arrives as a [`Command`] through [`Designer::commit`], which applies
//! it to the present document, records the result, and publishes derived
//! projections through [`Observable`]s.
//!
//! # Invariants
//!
//! 1. A rejected command changes nothing: no history entry, no published
//!    value, no interaction change.
//! 2. A successful command is always recorded, even when the resulting
//!    document equals the previous one.
//! 3. Undo/redo restore the interaction state captured with the step.
//!
//! # Tracing
//!
//! Each commit runs inside a `designer.commit` span carrying `kind` and
//! `sequence`. Applied commits log at DEBUG on `formsmith.designer`,
//! rejections at WARN. Undo/redo log at DEBUG on `formsmith.history`.

use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

use formsmith_model::{
    Command, CommandKind, Document, Node, NodeId, OperationError, OperationFailure,
};
use im::OrdMap;
use tracing::{debug, debug_span, warn};

use crate::config::{ConfigError, DesignerConfig};
use crate::gesture::{DragSession, DropResolution};
use crate::interaction::InteractionState;
use crate::reactive::Observable;
use crate::undo::{ActionMeta, History};

/// Shared handle to one document revision.
///
/// Equality is identity: two handles are equal only when they point at the
/// same revision, which makes publishing a new revision O(1).
#[derive(Clone)]
pub struct DocumentHandle(Arc<Document>);

impl DocumentHandle {
    #[must_use]
    pub fn arc(&self) -> &Arc<Document> {
        &self.0
    }
}

impl PartialEq for DocumentHandle {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for DocumentHandle {}

impl Deref for DocumentHandle {
    type Target = Document;

    fn deref(&self) -> &Document {
        &self.0
    }
}

impl fmt::Debug for DocumentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentHandle")
            .field("form_name", &self.0.form_name())
            .field("nodes", &self.0.len())
            .finish()
    }
}

/// Whether undo and redo are currently possible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct HistoryFlags {
    pub can_undo: bool,
    pub can_redo: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryAction {
    Undo,
    Redo,
}

/// Announcement of the last undo or redo.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryNotice {
    pub action: HistoryAction,
    /// Message the step was committed with.
    pub message: String,
    pub sequence: u64,
}

impl HistoryNotice {
    fn from_meta(action: HistoryAction, meta: &ActionMeta) -> Self {
        Self {
            action,
            message: meta.message.clone(),
            sequence: meta.sequence,
        }
    }

    /// Text for a status line, e.g. `Undid: Add field`.
    #[must_use]
    pub fn display_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for HistoryNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.action {
            HistoryAction::Undo => write!(f, "Undid: {}", self.message),
            HistoryAction::Redo => write!(f, "Redid: {}", self.message),
        }
    }
}

/// Result of [`Designer::commit`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    Applied {
        sequence: u64,
        kind: CommandKind,
        created: Vec<NodeId>,
        removed: Vec<NodeId>,
    },
    /// Nothing changed.
    Rejected(OperationError),
}

impl CommitOutcome {
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }

    /// Ids created by an applied command; empty when rejected.
    #[must_use]
    pub fn created(&self) -> &[NodeId] {
        match self {
            Self::Applied { created, .. } => created,
            Self::Rejected(_) => &[],
        }
    }

    #[must_use]
    pub fn removed(&self) -> &[NodeId] {
        match self {
            Self::Applied { removed, .. } => removed,
            Self::Rejected(_) => &[],
        }
    }

    #[must_use]
    pub fn rejection(&self) -> Option<&OperationError> {
        match self {
            Self::Rejected(error) => Some(error),
            Self::Applied { .. } => None,
        }
    }
}

/// A form designer session.
///
/// Single-threaded: the published observables are `Rc`-based.
pub struct Designer {
    history: History<Document>,
    config: DesignerConfig,
    next_sequence: u64,
    document: Observable<DocumentHandle>,
    flags: Observable<HistoryFlags>,
    interaction: Observable<InteractionState>,
    notice: Observable<Option<HistoryNotice>>,
}

impl fmt::Debug for Designer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Designer")
            .field("form_name", &self.form_name())
            .field("nodes", &self.document().len())
            .field("history", &self.history)
            .field("next_sequence", &self.next_sequence)
            .finish()
    }
}

impl Default for Designer {
    fn default() -> Self {
        Self::new()
    }
}

impl Designer {
    /// Session on an empty document with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(DesignerConfig::default())
    }

    /// Session on an empty document named after `config.form_name`.
    #[must_use]
    pub fn with_config(config: DesignerConfig) -> Self {
        let document = Document::new(config.form_name.clone());
        Self::with_document(document, config)
    }

    /// Session on an existing document, e.g. one loaded from a snapshot.
    #[must_use]
    pub fn with_document(document: Document, config: DesignerConfig) -> Self {
        let present = Arc::new(document);
        let history = History::from_arc(Arc::clone(&present), config.history.clone());
        Self {
            history,
            config,
            next_sequence: 1,
            document: Observable::new(DocumentHandle(present)),
            flags: Observable::new(HistoryFlags::default()),
            interaction: Observable::new(InteractionState::Idle),
            notice: Observable::new(None),
        }
    }

    /// Like [`with_config`](Self::with_config), rejecting invalid configs.
    pub fn try_new(config: DesignerConfig) -> Result<Self, ConfigError> {
        let errors = config.validate();
        if !errors.is_empty() {
            return Err(ConfigError::Validation(errors));
        }
        Ok(Self::with_config(config))
    }

    // ====================================================================
    // Commands
    // ====================================================================

    /// Apply `command` to the present document and record it as one step.
    pub fn commit(&mut self, command: Command, message: impl Into<String>) -> CommitOutcome {
        let kind = command.kind();
        let sequence = self.next_sequence;
        let span = debug_span!(
            target: "formsmith.designer",
            "designer.commit",
            kind = kind.as_str(),
            sequence
        );
        let _entered = span.enter();

        let applied = match self.history.present().apply(&command) {
            Ok(applied) => applied,
            Err(error) => {
                warn!(
                    target: "formsmith.designer",
                    kind = kind.as_str(),
                    reason = %error.reason,
                    "command rejected"
                );
                return CommitOutcome::Rejected(error);
            }
        };

        if self.config.verify_invariants
            && let Err(violation) = applied.document.validate()
        {
            warn!(
                target: "formsmith.designer",
                kind = kind.as_str(),
                code = ?violation.code(),
                "invariant check failed after apply"
            );
            return CommitOutcome::Rejected(OperationError {
                kind,
                touched_nodes: applied.touched_nodes,
                reason: OperationFailure::Validation(violation),
            });
        }

        self.next_sequence += 1;
        let meta = ActionMeta {
            sequence,
            kind,
            message: message.into(),
            interaction: self.interaction.get(),
        };
        let present = Arc::new(applied.document);
        self.history.record(Arc::clone(&present), meta);

        if self.config.prune_selection {
            self.interaction.update(|state| {
                state.retain_existing(&present);
            });
        }
        self.publish();

        debug!(
            target: "formsmith.designer",
            kind = kind.as_str(),
            sequence,
            created = applied.created.len() as u64,
            removed = applied.removed.len() as u64,
            undo_depth = self.history.undo_depth() as u64,
            "command applied"
        );
        CommitOutcome::Applied {
            sequence,
            kind,
            created: applied.created,
            removed: applied.removed,
        }
    }

    /// Revert the last step. `None` when there is nothing to undo.
    pub fn undo(&mut self) -> Option<HistoryNotice> {
        let meta = self.history.undo()?.clone();
        Some(self.after_travel(HistoryAction::Undo, meta))
    }

    /// Re-apply the last undone step. `None` when there is nothing to redo.
    pub fn redo(&mut self) -> Option<HistoryNotice> {
        let meta = self.history.redo()?.clone();
        Some(self.after_travel(HistoryAction::Redo, meta))
    }

    fn after_travel(&mut self, action: HistoryAction, meta: ActionMeta) -> HistoryNotice {
        let mut restored = meta.interaction.clone();
        if self.config.prune_selection {
            restored.retain_existing(self.history.present());
        }
        self.interaction.set(restored);
        let notice = HistoryNotice::from_meta(action, &meta);
        self.notice.set(Some(notice.clone()));
        self.publish();
        debug!(
            target: "formsmith.history",
            action = ?action,
            sequence = meta.sequence,
            kind = meta.kind.as_str(),
            undo_depth = self.history.undo_depth() as u64,
            redo_depth = self.history.redo_depth() as u64,
            "history step"
        );
        notice
    }

    /// Translate a finished drag into at most one committed command.
    pub fn drop_gesture(
        &mut self,
        session: &mut DragSession,
        resolution: DropResolution,
        message: impl Into<String>,
    ) -> Option<CommitOutcome> {
        let command = session.drop(resolution, self.document())?;
        Some(self.commit(command, message))
    }

    /// Forget all undo/redo steps, keeping the present document.
    pub fn clear_history(&mut self) {
        self.history.clear();
        self.publish();
    }

    fn publish(&self) {
        self.document
            .set(DocumentHandle(Arc::clone(self.history.present())));
        self.flags.set(HistoryFlags {
            can_undo: self.history.can_undo(),
            can_redo: self.history.can_redo(),
        });
    }

    // ====================================================================
    // Interaction
    // ====================================================================

    /// Select `ids`, ignoring ids not in the document.
    pub fn select(&mut self, ids: impl IntoIterator<Item = NodeId>) {
        let document = Arc::clone(self.history.present());
        let state = InteractionState::select(ids.into_iter().filter(|id| document.contains(id)));
        self.interaction.set(state);
    }

    /// Add or remove `id` from the selection. Unknown ids are ignored.
    pub fn toggle_selection(&mut self, id: NodeId) {
        if !self.document().contains(&id) {
            return;
        }
        let next = self.interaction.with(|state| state.toggle(id));
        self.interaction.set(next);
    }

    /// Start inline editing of `id`. Returns `false` if it does not exist.
    pub fn begin_editing(&mut self, id: NodeId) -> bool {
        if !self.document().contains(&id) {
            return false;
        }
        self.interaction.set(InteractionState::edit(id));
        true
    }

    pub fn set_idle(&mut self) {
        self.interaction.set(InteractionState::Idle);
    }

    #[must_use]
    pub fn interaction(&self) -> InteractionState {
        self.interaction.get()
    }

    // ====================================================================
    // Queries
    // ====================================================================

    #[must_use]
    pub fn document(&self) -> &Document {
        self.history.present()
    }

    /// Shared handle to the present revision.
    #[must_use]
    pub fn snapshot(&self) -> DocumentHandle {
        DocumentHandle(Arc::clone(self.history.present()))
    }

    #[must_use]
    pub fn form_name(&self) -> &str {
        self.document().form_name()
    }

    #[must_use]
    pub fn root(&self) -> &NodeId {
        self.document().root()
    }

    #[must_use]
    pub fn nodes(&self) -> &OrdMap<NodeId, Arc<Node>> {
        self.document().nodes()
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    #[must_use]
    pub fn undo_depth(&self) -> usize {
        self.history.undo_depth()
    }

    #[must_use]
    pub fn redo_depth(&self) -> usize {
        self.history.redo_depth()
    }

    #[must_use]
    pub fn next_undo_message(&self) -> Option<&str> {
        self.history.next_undo().map(|meta| meta.message.as_str())
    }

    #[must_use]
    pub fn next_redo_message(&self) -> Option<&str> {
        self.history.next_redo().map(|meta| meta.message.as_str())
    }

    #[must_use]
    pub fn last_notice(&self) -> Option<HistoryNotice> {
        self.notice.get()
    }

    #[must_use]
    pub fn history(&self) -> &History<Document> {
        &self.history
    }

    #[must_use]
    pub fn config(&self) -> &DesignerConfig {
        &self.config
    }

    // ====================================================================
    // Observables
    // ====================================================================

    #[must_use]
    pub fn document_observable(&self) -> Observable<DocumentHandle> {
        self.document.clone()
    }

    #[must_use]
    pub fn history_flags(&self) -> Observable<HistoryFlags> {
        self.flags.clone()
    }

    #[must_use]
    pub fn interaction_observable(&self) -> Observable<InteractionState> {
        self.interaction.clone()
    }

    #[must_use]
    pub fn notice_observable(&self) -> Observable<Option<HistoryNotice>> {
        self.notice.clone()
    }
}
