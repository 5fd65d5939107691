#![forbid(unsafe_code)]

//! Drag-and-drop gesture session.
//!
//! A drag produces at most one document command, and only when it is
//! dropped. Hover updates arrive at pointer rate and are kept here as
//! transient state; nothing reaches the document or the history until
//! [`DragSession::drop`].
//!
//! ```text
//! Idle ──arm──▶ Armed ──begin──▶ Dragging ──hover──▶ Dragging
//!  ▲              │                  │
//!  └──cancel──────┴──────drop────────┘
//! ```

use formsmith_model::{Binding, Command, Document, NodeId, NodeSpec};
use tracing::{debug, trace};

/// What is being dragged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragSource {
    /// A node already in the document.
    Existing(NodeId),
    /// A new node from the control palette.
    Palette(NodeSpec),
    /// Bound fields dragged out of a data catalog.
    Catalog(Vec<Binding>),
}

/// Where the pointer currently would drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DropHint {
    pub parent: NodeId,
    /// Insertion index among the parent's current children.
    pub index: usize,
}

/// Final drop location decided by the host's hit testing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropResolution {
    /// Insert at `index` among `parent`'s current children.
    Target { parent: NodeId, index: usize },
    /// The node was dropped onto itself or its own subtree.
    RejectedSelf,
}

/// Gesture lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum DragPhase {
    #[default]
    Idle,
    Armed { source: DragSource },
    Dragging {
        source: DragSource,
        hover: Option<DropHint>,
    },
}

/// One drag gesture from pointer-down to drop or cancel.
#[derive(Debug, Clone, Default)]
pub struct DragSession {
    phase: DragPhase,
    hover_updates: u64,
}

impl DragSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn phase(&self) -> &DragPhase {
        &self.phase
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        !matches!(self.phase, DragPhase::Idle)
    }

    /// Current hover hint, if dragging over a valid target.
    #[must_use]
    pub fn hover_hint(&self) -> Option<&DropHint> {
        match &self.phase {
            DragPhase::Dragging { hover, .. } => hover.as_ref(),
            _ => None,
        }
    }

    /// Hover updates received during the current gesture.
    #[must_use]
    pub fn hover_updates(&self) -> u64 {
        self.hover_updates
    }

    /// Pointer-down on a draggable source. Replaces any gesture in flight.
    pub fn arm(&mut self, source: DragSource) {
        self.phase = DragPhase::Armed { source };
        self.hover_updates = 0;
    }

    /// Movement past the drag threshold. Returns `false` when not armed.
    pub fn begin(&mut self) -> bool {
        match std::mem::take(&mut self.phase) {
            DragPhase::Armed { source } => {
                debug!(target: "formsmith.gesture", source = ?source, "drag started");
                self.phase = DragPhase::Dragging {
                    source,
                    hover: None,
                };
                true
            }
            other => {
                self.phase = other;
                false
            }
        }
    }

    /// Update the hover target. Ignored unless dragging.
    pub fn hover(&mut self, hint: Option<DropHint>) {
        if let DragPhase::Dragging { hover, .. } = &mut self.phase {
            trace!(
                target: "formsmith.gesture",
                parent = hint.as_ref().map(|h| h.parent.as_str()),
                index = hint.as_ref().map(|h| h.index as u64),
                "hover"
            );
            *hover = hint;
            self.hover_updates += 1;
        }
    }

    /// Abandon the gesture. Produces no command.
    pub fn cancel(&mut self) {
        if self.is_active() {
            debug!(target: "formsmith.gesture", hover_updates = self.hover_updates, "drag cancelled");
        }
        self.phase = DragPhase::Idle;
        self.hover_updates = 0;
    }

    /// Finish the gesture and translate it into at most one command.
    ///
    /// The session returns to idle whatever the outcome, so a gesture yields
    /// a command at most once. Dropping an armed but never started drag is a
    /// click and yields nothing.
    pub fn drop(&mut self, resolution: DropResolution, document: &Document) -> Option<Command> {
        let phase = std::mem::take(&mut self.phase);
        self.hover_updates = 0;
        let DragPhase::Dragging { source, .. } = phase else {
            return None;
        };
        let DropResolution::Target { parent, index } = resolution else {
            debug!(target: "formsmith.gesture", "drop rejected onto itself");
            return None;
        };
        let command = match source {
            DragSource::Existing(node) => {
                let from_parent = document.parent_of(&node)?.clone();
                let to_index = match document.index_in_parent(&node) {
                    // Removing the node first shifts later siblings left.
                    Some(current) if from_parent == parent && index > current => index - 1,
                    _ => index,
                };
                Command::Move {
                    node,
                    from_parent,
                    to_parent: parent,
                    to_index,
                }
            }
            DragSource::Palette(spec) => Command::AddNode { parent, index, spec },
            DragSource::Catalog(bindings) => {
                if bindings.is_empty() {
                    return None;
                }
                Command::AddNodesBulk {
                    parent,
                    index: Some(index),
                    specs: bindings.into_iter().map(NodeSpec::bound).collect(),
                }
            }
        };
        debug!(target: "formsmith.gesture", kind = %command.kind(), "drop produced command");
        Some(command)
    }
}
