//! Structural operators.
//!
//! [`Document::apply`] is the only way to derive a new document. It runs the
//! requested operator on an O(1) clone and either returns the edited copy or
//! leaves `self` untouched and reports why the command was refused.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::command::{
    Command, CommandKind, ContainerPatch, ContextualLayoutPatch, LeafPatch, NodeSpec,
};
use crate::document::{Document, DocumentError};
use crate::id::NodeId;
use crate::node::{Binding, ContainerProps, ControlKind, LeafProps, Node, NodeKind};

/// Deepest `Batch` nesting accepted by [`Document::apply`].
pub const MAX_BATCH_DEPTH: usize = 16;

/// Successful operator result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Applied {
    pub document: Document,
    pub kind: CommandKind,
    /// Every node whose record or children list the command read or wrote.
    pub touched_nodes: Vec<NodeId>,
    /// Nodes present afterwards that did not exist before, in creation order.
    pub created: Vec<NodeId>,
    /// Nodes that existed before and are gone afterwards, in removal order.
    pub removed: Vec<NodeId>,
}

/// Failure payload for [`Document::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OperationError {
    pub kind: CommandKind,
    pub touched_nodes: Vec<NodeId>,
    pub reason: OperationFailure,
}

/// Structured reasons a command was refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationFailure {
    MissingNode {
        node_id: NodeId,
    },
    NotAContainer {
        node_id: NodeId,
    },
    NotALeaf {
        node_id: NodeId,
    },
    CannotDeleteRoot {
        node_id: NodeId,
    },
    CannotMoveRoot {
        node_id: NodeId,
    },
    CannotUnwrapRoot {
        node_id: NodeId,
    },
    CannotDuplicateRoot {
        node_id: NodeId,
    },
    ParentChildMismatch {
        parent: NodeId,
        child: NodeId,
    },
    CycleDetected {
        node_id: NodeId,
        target: NodeId,
    },
    IndexOutOfRange {
        index: usize,
        len: usize,
    },
    MixedParents {
        node_id: NodeId,
        expected_parent: NodeId,
    },
    DuplicateIds {
        node_id: NodeId,
    },
    EmptyPayload {
        field: &'static str,
    },
    IdOverflow,
    NestingTooDeep {
        depth: usize,
    },
    BatchFailed {
        index: usize,
        kind: CommandKind,
        reason: Box<OperationFailure>,
    },
    Validation(DocumentError),
}

impl fmt::Display for OperationFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingNode { node_id } => write!(f, "node {node_id} not found"),
            Self::NotAContainer { node_id } => write!(f, "node {node_id} is not a container"),
            Self::NotALeaf { node_id } => write!(f, "node {node_id} is not a leaf"),
            Self::CannotDeleteRoot { node_id } => write!(f, "cannot delete root node {node_id}"),
            Self::CannotMoveRoot { node_id } => write!(f, "cannot move root node {node_id}"),
            Self::CannotUnwrapRoot { node_id } => write!(f, "cannot unwrap root node {node_id}"),
            Self::CannotDuplicateRoot { node_id } => {
                write!(f, "cannot duplicate root node {node_id}")
            }
            Self::ParentChildMismatch { parent, child } => {
                write!(f, "container {parent} does not contain child {child}")
            }
            Self::CycleDetected { node_id, target } => write!(
                f,
                "moving {node_id} into {target} would create a cycle"
            ),
            Self::IndexOutOfRange { index, len } => {
                write!(f, "index {index} out of range for {len} children")
            }
            Self::MixedParents {
                node_id,
                expected_parent,
            } => write!(f, "node {node_id} is not a direct child of {expected_parent}"),
            Self::DuplicateIds { node_id } => write!(f, "node {node_id} listed more than once"),
            Self::EmptyPayload { field } => write!(f, "{field} must not be empty"),
            Self::IdOverflow => write!(f, "node id sequence exhausted"),
            Self::NestingTooDeep { depth } => {
                write!(f, "batch nesting depth {depth} exceeds {MAX_BATCH_DEPTH}")
            }
            Self::BatchFailed {
                index,
                kind,
                reason,
            } => write!(f, "batch step {index} ({kind}) failed: {reason}"),
            Self::Validation(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for OperationFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::BatchFailed { reason, .. } => Some(reason.as_ref()),
            _ => None,
        }
    }
}

impl From<DocumentError> for OperationFailure {
    fn from(err: DocumentError) -> Self {
        Self::Validation(err)
    }
}

impl fmt::Display for OperationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failed: {} [nodes={:?}]",
            self.kind,
            self.reason,
            self.touched_nodes
                .iter()
                .map(NodeId::as_str)
                .collect::<Vec<_>>()
        )
    }
}

impl std::error::Error for OperationError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.reason)
    }
}

/// Bookkeeping shared by every operator of one `apply` call.
#[derive(Default)]
struct Effects {
    touched: BTreeSet<NodeId>,
    created: Vec<NodeId>,
    removed: Vec<NodeId>,
}

impl Document {
    /// Apply `command` to a copy of this document.
    ///
    /// On failure `self` is unchanged and nothing is returned but the reason.
    /// The copy shares every untouched node with `self`.
    pub fn apply(&self, command: &Command) -> Result<Applied, OperationError> {
        let kind = command.kind();
        let mut working = self.clone();
        let mut effects = Effects {
            touched: command.referenced_nodes().into_iter().collect(),
            ..Effects::default()
        };

        if let Err(reason) = working.apply_inner(command, &mut effects, 0) {
            return Err(OperationError {
                kind,
                touched_nodes: effects.touched.into_iter().collect(),
                reason,
            });
        }

        // Net effect: a node created and removed inside one batch is neither.
        let created = effects
            .created
            .into_iter()
            .filter(|id| working.contains(id))
            .collect();
        let removed = effects
            .removed
            .into_iter()
            .filter(|id| self.contains(id) && !working.contains(id))
            .collect();

        Ok(Applied {
            document: working,
            kind,
            touched_nodes: effects.touched.into_iter().collect(),
            created,
            removed,
        })
    }

    fn apply_inner(
        &mut self,
        command: &Command,
        effects: &mut Effects,
        depth: usize,
    ) -> Result<(), OperationFailure> {
        match command {
            Command::AddNode {
                parent,
                index,
                spec,
            } => self.add_nodes(parent, Some(*index), std::slice::from_ref(spec), effects),
            Command::AddNodesBulk {
                parent,
                index,
                specs,
            } => {
                if specs.is_empty() {
                    return Err(OperationFailure::EmptyPayload { field: "specs" });
                }
                self.add_nodes(parent, *index, specs, effects)
            }
            Command::DeleteSubtree { node } => self.delete_subtree(node, effects),
            Command::DeleteMany { nodes } => self.delete_many(nodes, effects),
            Command::Move {
                node,
                from_parent,
                to_parent,
                to_index,
            } => self.move_node(node, from_parent, to_parent, *to_index, effects),
            Command::Reorder {
                node,
                parent,
                from_index,
                to_index,
            } => self.reorder(node, parent, *from_index, *to_index),
            Command::WrapInContainer { nodes, parent } => self.wrap(nodes, parent, effects),
            Command::UnwrapContainer { container } => self.unwrap(container, effects),
            Command::ConvertLeafKind { node, target } => self.convert(node, *target),
            Command::UpdateProperties { node, patch } => self.update_properties(node, patch),
            Command::UpdateAppearance { node, patch } => self.update_appearance(node, *patch),
            Command::UpdateBinding { node, binding } => self.update_binding(node, binding),
            Command::UpdateContextualLayout { node, patch } => {
                self.update_contextual_layout(node, *patch)
            }
            Command::Rename { form_name } => {
                self.form_name.clone_from(form_name);
                Ok(())
            }
            Command::DuplicateSubtree { node } => self.duplicate_subtree(node, effects),
            Command::Batch { commands } => self.batch(commands, effects, depth),
        }
    }

    fn require_node(&self, id: &NodeId) -> Result<&Node, OperationFailure> {
        self.node(id).ok_or_else(|| OperationFailure::MissingNode {
            node_id: id.clone(),
        })
    }

    fn require_container(&self, id: &NodeId) -> Result<&ContainerProps, OperationFailure> {
        self.require_node(id)?
            .as_container()
            .ok_or_else(|| OperationFailure::NotAContainer {
                node_id: id.clone(),
            })
    }

    fn require_leaf(&self, id: &NodeId) -> Result<&LeafProps, OperationFailure> {
        self.require_node(id)?
            .as_leaf()
            .ok_or_else(|| OperationFailure::NotALeaf {
                node_id: id.clone(),
            })
    }

    /// Parent of a non-root node, checked against the parent's children.
    fn attached_parent(&self, id: &NodeId) -> Result<NodeId, OperationFailure> {
        let parent = self
            .require_node(id)?
            .parent
            .clone()
            .ok_or_else(|| OperationFailure::MissingNode {
                node_id: id.clone(),
            })?;
        if !self.require_container(&parent)?.children.contains(id) {
            return Err(OperationFailure::ParentChildMismatch {
                parent,
                child: id.clone(),
            });
        }
        Ok(parent)
    }

    fn allocate(&mut self) -> Result<NodeId, OperationFailure> {
        self.allocate_id().ok_or(OperationFailure::IdOverflow)
    }

    /// Splice `ids` into `parent`'s children. The parent must be a container.
    fn splice_children(
        &mut self,
        parent: &NodeId,
        at: usize,
        ids: impl IntoIterator<Item = NodeId>,
    ) -> Result<(), OperationFailure> {
        self.edit_children(parent, |children| {
            let at = at.min(children.len());
            children.splice(at..at, ids);
        })
        .ok_or_else(|| OperationFailure::NotAContainer {
            node_id: parent.clone(),
        })
    }

    fn detach_child(&mut self, parent: &NodeId, child: &NodeId) -> Result<usize, OperationFailure> {
        self.edit_children(parent, |children| {
            let index = children.iter().position(|c| c == child)?;
            children.remove(index);
            Some(index)
        })
        .flatten()
        .ok_or_else(|| OperationFailure::ParentChildMismatch {
            parent: parent.clone(),
            child: child.clone(),
        })
    }

    fn add_nodes(
        &mut self,
        parent: &NodeId,
        index: Option<usize>,
        specs: &[NodeSpec],
        effects: &mut Effects,
    ) -> Result<(), OperationFailure> {
        let len = self.require_container(parent)?.children.len();
        let at = index.map_or(len, |index| index.min(len));

        let mut fresh = Vec::with_capacity(specs.len());
        for spec in specs {
            let id = self.allocate()?;
            self.put(spec.build(id.clone(), parent.clone()));
            fresh.push(id);
        }
        effects.touched.extend(fresh.iter().cloned());
        effects.created.extend(fresh.iter().cloned());
        self.splice_children(parent, at, fresh)
    }

    fn delete_subtree(&mut self, id: &NodeId, effects: &mut Effects) -> Result<(), OperationFailure> {
        if id == self.root() {
            return Err(OperationFailure::CannotDeleteRoot { node_id: id.clone() });
        }
        let parent = self.attached_parent(id)?;
        self.detach_child(&parent, id)?;
        effects.touched.insert(parent);

        for doomed in self.subtree_ids(id) {
            self.take(&doomed);
            effects.touched.insert(doomed.clone());
            effects.removed.push(doomed);
        }
        Ok(())
    }

    fn delete_many(&mut self, ids: &[NodeId], effects: &mut Effects) -> Result<(), OperationFailure> {
        let Some(first) = ids.first() else {
            return Err(OperationFailure::EmptyPayload { field: "nodes" });
        };
        let mut resolved = 0_usize;
        for id in ids {
            // Root and ids swept away by an earlier entry are skipped.
            if id == self.root() || !self.contains(id) {
                continue;
            }
            self.delete_subtree(id, effects)?;
            resolved += 1;
        }
        if resolved > 0 {
            return Ok(());
        }
        if ids.iter().all(|id| id == self.root()) {
            Err(OperationFailure::CannotDeleteRoot {
                node_id: first.clone(),
            })
        } else {
            let missing = ids.iter().find(|id| *id != self.root()).unwrap_or(first);
            Err(OperationFailure::MissingNode {
                node_id: missing.clone(),
            })
        }
    }

    fn move_node(
        &mut self,
        id: &NodeId,
        from_parent: &NodeId,
        to_parent: &NodeId,
        to_index: usize,
        effects: &mut Effects,
    ) -> Result<(), OperationFailure> {
        if id == self.root() {
            return Err(OperationFailure::CannotMoveRoot { node_id: id.clone() });
        }
        self.require_node(id)?;
        self.require_container(from_parent)?;
        self.require_container(to_parent)?;
        if self.parent_of(id) != Some(from_parent) {
            return Err(OperationFailure::ParentChildMismatch {
                parent: from_parent.clone(),
                child: id.clone(),
            });
        }
        if to_parent == id || self.is_ancestor(id, to_parent) {
            return Err(OperationFailure::CycleDetected {
                node_id: id.clone(),
                target: to_parent.clone(),
            });
        }

        self.detach_child(from_parent, id)?;
        self.splice_children(to_parent, to_index, [id.clone()])?;
        self.set_parent(id, to_parent);
        effects.touched.extend([from_parent.clone(), to_parent.clone()]);
        Ok(())
    }

    fn reorder(
        &mut self,
        id: &NodeId,
        parent: &NodeId,
        from_index: usize,
        to_index: usize,
    ) -> Result<(), OperationFailure> {
        let children = &self.require_container(parent)?.children;
        let len = children.len();
        for index in [from_index, to_index] {
            if index >= len {
                return Err(OperationFailure::IndexOutOfRange { index, len });
            }
        }
        if &children[from_index] != id {
            return Err(OperationFailure::ParentChildMismatch {
                parent: parent.clone(),
                child: id.clone(),
            });
        }
        if from_index == to_index {
            return Ok(());
        }
        self.edit_children(parent, |children| {
            let moved = children.remove(from_index);
            children.insert(to_index, moved);
        })
        .ok_or_else(|| OperationFailure::NotAContainer {
            node_id: parent.clone(),
        })
    }

    fn wrap(
        &mut self,
        ids: &[NodeId],
        parent: &NodeId,
        effects: &mut Effects,
    ) -> Result<(), OperationFailure> {
        let Some(first) = ids.first() else {
            return Err(OperationFailure::EmptyPayload { field: "nodes" });
        };
        let siblings = self.require_container(parent)?.children.clone();

        let mut listed = BTreeSet::new();
        for id in ids {
            if id == self.root() {
                return Err(OperationFailure::CannotMoveRoot { node_id: id.clone() });
            }
            self.require_node(id)?;
            if !listed.insert(id) {
                return Err(OperationFailure::DuplicateIds { node_id: id.clone() });
            }
            if self.parent_of(id) != Some(parent) || !siblings.contains(id) {
                return Err(OperationFailure::MixedParents {
                    node_id: id.clone(),
                    expected_parent: parent.clone(),
                });
            }
        }

        // Slot of the first listed id once the wrapped nodes are pulled out.
        let first_index = siblings.iter().position(|c| c == first).unwrap_or(0);
        let slot = siblings[..first_index]
            .iter()
            .filter(|c| !listed.contains(c))
            .count();
        let (wrapped, kept): (Vec<NodeId>, Vec<NodeId>) =
            siblings.into_iter().partition(|c| listed.contains(c));

        let container_id = self.allocate()?;
        let mut props = ContainerProps::default();
        props.children.clone_from(&wrapped);
        self.put(Node::container(container_id.clone(), Some(parent.clone()), props));
        for id in &wrapped {
            self.set_parent(id, &container_id);
        }

        let mut next_children = kept;
        next_children.insert(slot, container_id.clone());
        self.edit_children(parent, |children| *children = next_children)
            .ok_or_else(|| OperationFailure::NotAContainer {
                node_id: parent.clone(),
            })?;

        effects.touched.insert(container_id.clone());
        effects.created.push(container_id);
        Ok(())
    }

    fn unwrap(&mut self, container: &NodeId, effects: &mut Effects) -> Result<(), OperationFailure> {
        if container == self.root() {
            return Err(OperationFailure::CannotUnwrapRoot {
                node_id: container.clone(),
            });
        }
        let lifted = self.require_container(container)?.children.clone();
        let parent = self.attached_parent(container)?;
        let at = self.detach_child(&parent, container)?;

        self.splice_children(&parent, at, lifted.iter().cloned())?;
        for child in &lifted {
            self.set_parent(child, &parent);
        }
        self.take(container);

        effects.touched.insert(parent);
        effects.touched.extend(lifted);
        effects.removed.push(container.clone());
        Ok(())
    }

    fn convert(&mut self, id: &NodeId, target: ControlKind) -> Result<(), OperationFailure> {
        if self.require_leaf(id)?.control == target {
            return Ok(());
        }
        self.edit_leaf(id, |leaf| {
            leaf.convert_to(target);
        })
    }

    fn update_properties(&mut self, id: &NodeId, patch: &LeafPatch) -> Result<(), OperationFailure> {
        self.require_leaf(id)?;
        self.edit_leaf(id, |leaf| patch.apply_to(leaf))
    }

    fn update_appearance(
        &mut self,
        id: &NodeId,
        patch: ContainerPatch,
    ) -> Result<(), OperationFailure> {
        self.require_container(id)?;
        self.edit_node(id, |node| {
            if let NodeKind::Container(props) = &mut node.kind {
                patch.apply_to(props);
            }
        })
        .ok_or_else(|| OperationFailure::MissingNode { node_id: id.clone() })
    }

    fn update_binding(
        &mut self,
        id: &NodeId,
        binding: &Option<Binding>,
    ) -> Result<(), OperationFailure> {
        self.require_leaf(id)?;
        self.edit_leaf(id, |leaf| leaf.binding.clone_from(binding))
    }

    fn update_contextual_layout(
        &mut self,
        id: &NodeId,
        patch: ContextualLayoutPatch,
    ) -> Result<(), OperationFailure> {
        self.require_leaf(id)?;
        self.edit_leaf(id, |leaf| patch.apply_to(&mut leaf.layout))
    }

    fn edit_leaf(
        &mut self,
        id: &NodeId,
        edit: impl FnOnce(&mut LeafProps),
    ) -> Result<(), OperationFailure> {
        self.edit_node(id, |node| match &mut node.kind {
            NodeKind::Leaf(leaf) => {
                edit(leaf);
                Ok(())
            }
            NodeKind::Container(_) => Err(OperationFailure::NotALeaf { node_id: id.clone() }),
        })
        .unwrap_or_else(|| Err(OperationFailure::MissingNode { node_id: id.clone() }))
    }

    fn duplicate_subtree(
        &mut self,
        id: &NodeId,
        effects: &mut Effects,
    ) -> Result<(), OperationFailure> {
        if id == self.root() {
            return Err(OperationFailure::CannotDuplicateRoot { node_id: id.clone() });
        }
        let parent = self.attached_parent(id)?;
        let at = self.index_in_parent(id).map_or(0, |index| index + 1);

        let originals = self.subtree_ids(id);
        let mut renamed = BTreeMap::new();
        for original in &originals {
            renamed.insert(original.clone(), self.allocate()?);
        }

        for original in &originals {
            let mut copy = Node::clone(self.require_node(original)?);
            copy.id = renamed[original].clone();
            copy.parent = if original == id {
                Some(parent.clone())
            } else {
                copy.parent.as_ref().and_then(|p| renamed.get(p)).cloned()
            };
            if let NodeKind::Container(props) = &mut copy.kind {
                for child in &mut props.children {
                    if let Some(fresh) = renamed.get(child) {
                        *child = fresh.clone();
                    }
                }
            }
            effects.touched.insert(copy.id.clone());
            effects.created.push(copy.id.clone());
            self.put(copy);
        }

        let top = renamed[id].clone();
        self.splice_children(&parent, at, [top])?;
        effects.touched.insert(parent);
        Ok(())
    }

    fn batch(
        &mut self,
        commands: &[Command],
        effects: &mut Effects,
        depth: usize,
    ) -> Result<(), OperationFailure> {
        if commands.is_empty() {
            return Err(OperationFailure::EmptyPayload { field: "commands" });
        }
        let depth = depth + 1;
        if depth > MAX_BATCH_DEPTH {
            return Err(OperationFailure::NestingTooDeep { depth });
        }
        for (index, command) in commands.iter().enumerate() {
            self.apply_inner(command, effects, depth)
                .map_err(|reason| OperationFailure::BatchFailed {
                    index,
                    kind: command.kind(),
                    reason: Box::new(reason),
                })?;
        }
        Ok(())
    }
}
