#![forbid(unsafe_code)]

//! What the designer UI is doing right now.
//!
//! [`InteractionState`] is captured into every history entry at commit time
//! and restored verbatim on undo/redo, so undoing a delete re-selects what was
//! selected before the delete.

use formsmith_model::{Document, NodeId};
use serde::{Deserialize, Serialize};

/// Selection / inline-editing snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum InteractionState {
    #[default]
    Idle,
    /// One or more nodes selected, in selection order.
    Selecting { ids: Vec<NodeId> },
    /// A single node being edited inline.
    Editing { id: NodeId },
}

impl InteractionState {
    /// Selection of `ids` (duplicates dropped, order kept). Empty means idle.
    #[must_use]
    pub fn select(ids: impl IntoIterator<Item = NodeId>) -> Self {
        let mut unique: Vec<NodeId> = Vec::new();
        for id in ids {
            if !unique.contains(&id) {
                unique.push(id);
            }
        }
        if unique.is_empty() {
            Self::Idle
        } else {
            Self::Selecting { ids: unique }
        }
    }

    #[must_use]
    pub fn edit(id: NodeId) -> Self {
        Self::Editing { id }
    }

    /// Add `id` to the selection, or remove it if already selected.
    ///
    /// Toggling while editing starts a fresh selection.
    #[must_use]
    pub fn toggle(&self, id: NodeId) -> Self {
        match self {
            Self::Selecting { ids } if ids.contains(&id) => {
                Self::select(ids.iter().filter(|selected| **selected != id).cloned())
            }
            Self::Selecting { ids } => {
                Self::select(ids.iter().cloned().chain(std::iter::once(id)))
            }
            Self::Idle | Self::Editing { .. } => Self::select([id]),
        }
    }

    #[must_use]
    pub fn clear(&self) -> Self {
        Self::Idle
    }

    #[must_use]
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Node ids this state refers to.
    #[must_use]
    pub fn selected_ids(&self) -> &[NodeId] {
        match self {
            Self::Idle => &[],
            Self::Selecting { ids } => ids,
            Self::Editing { id } => std::slice::from_ref(id),
        }
    }

    #[must_use]
    pub fn editing(&self) -> Option<&NodeId> {
        match self {
            Self::Editing { id } => Some(id),
            _ => None,
        }
    }

    /// Drop references to nodes missing from `document`.
    ///
    /// Returns `true` when anything was dropped.
    pub fn retain_existing(&mut self, document: &Document) -> bool {
        let next = match self {
            Self::Idle => return false,
            Self::Editing { id } => {
                if document.contains(id) {
                    return false;
                }
                Self::Idle
            }
            Self::Selecting { ids } => {
                if ids.iter().all(|id| document.contains(id)) {
                    return false;
                }
                Self::select(ids.iter().filter(|id| document.contains(*id)).cloned())
            }
        };
        *self = next;
        true
    }
}
