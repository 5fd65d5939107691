//! Normalized document store.
//!
//! A [`Document`] owns every node of one designed screen in a persistent
//! `im::OrdMap<NodeId, Arc<Node>>`. Cloning a document is O(1); operators
//! clone, edit the copy and hand it back, so a node that changed is always
//! a different `Arc` than its predecessor and an untouched node keeps its
//! allocation across every later revision.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use im::OrdMap;
use serde::{Deserialize, Serialize};

use crate::id::NodeId;
use crate::node::{ContainerProps, Node, NodeKind};

/// Form name given to documents created without one.
pub const DEFAULT_FORM_NAME: &str = "Untitled form";

/// Immutable snapshot of a designed screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub(crate) form_name: String,
    pub(crate) root: NodeId,
    pub(crate) next_seq: u64,
    pub(crate) nodes: OrdMap<NodeId, Arc<Node>>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new(DEFAULT_FORM_NAME)
    }
}

impl Document {
    /// Document holding only an empty root container.
    #[must_use]
    pub fn new(form_name: impl Into<String>) -> Self {
        let root = NodeId::root();
        let mut nodes = OrdMap::new();
        nodes.insert(
            root.clone(),
            Arc::new(Node::container(root.clone(), None, ContainerProps::default())),
        );
        Self {
            form_name: form_name.into(),
            root,
            next_seq: 1,
            nodes,
        }
    }

    /// Every node keyed by id.
    #[must_use]
    pub fn nodes(&self) -> &OrdMap<NodeId, Arc<Node>> {
        &self.nodes
    }

    #[must_use]
    pub fn node<Q>(&self, id: &Q) -> Option<&Node>
    where
        Q: Ord + ?Sized,
        NodeId: std::borrow::Borrow<Q>,
    {
        self.nodes.get(id).map(Arc::as_ref)
    }

    /// Shared handle to a node, for pointer-identity comparisons.
    #[must_use]
    pub fn node_arc<Q>(&self, id: &Q) -> Option<&Arc<Node>>
    where
        Q: Ord + ?Sized,
        NodeId: std::borrow::Borrow<Q>,
    {
        self.nodes.get(id)
    }

    #[must_use]
    pub fn contains<Q>(&self, id: &Q) -> bool
    where
        Q: Ord + ?Sized,
        NodeId: std::borrow::Borrow<Q>,
    {
        self.nodes.contains_key(id)
    }

    #[must_use]
    pub fn root(&self) -> &NodeId {
        &self.root
    }

    #[must_use]
    pub fn root_node(&self) -> Option<&Node> {
        self.node(&self.root)
    }

    #[must_use]
    pub fn form_name(&self) -> &str {
        &self.form_name
    }

    /// Sequence number the next allocated id starts probing from.
    #[must_use]
    pub fn next_seq(&self) -> u64 {
        self.next_seq
    }

    /// Ordered children of `id`; empty for leaves and unknown ids.
    #[must_use]
    pub fn children(&self, id: &NodeId) -> &[NodeId] {
        self.node(id).map(Node::children).unwrap_or_default()
    }

    #[must_use]
    pub fn parent_of(&self, id: &NodeId) -> Option<&NodeId> {
        self.node(id).and_then(|node| node.parent.as_ref())
    }

    /// Position of `id` inside its parent's children.
    #[must_use]
    pub fn index_in_parent(&self, id: &NodeId) -> Option<usize> {
        let parent = self.parent_of(id)?;
        self.children(parent).iter().position(|child| child == id)
    }

    /// Whether `ancestor` is a strict ancestor of `descendant`.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: &NodeId, descendant: &NodeId) -> bool {
        let mut cursor = self.parent_of(descendant);
        // Bounded walk: a corrupt parent chain cannot loop forever.
        for _ in 0..self.nodes.len() {
            match cursor {
                Some(parent) if parent == ancestor => return true,
                Some(parent) => cursor = self.parent_of(parent),
                None => return false,
            }
        }
        false
    }

    /// `id` and all its descendants in pre-order. Empty if `id` is unknown.
    #[must_use]
    pub fn subtree_ids(&self, id: &NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        if !self.contains(id) {
            return out;
        }
        let mut stack = vec![id.clone()];
        while let Some(current) = stack.pop() {
            stack.extend(self.children(&current).iter().rev().cloned());
            out.push(current);
        }
        out
    }

    /// Number of nodes, root included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false` for a valid document (the root is never removed).
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether node `id` differs between `self` and `other`.
    ///
    /// Pointer identity, not deep comparison: a node rewritten with equal
    /// contents still counts as changed.
    #[must_use]
    pub fn node_changed(&self, other: &Self, id: &NodeId) -> bool {
        match (self.nodes.get(id), other.nodes.get(id)) {
            (Some(a), Some(b)) => !Arc::ptr_eq(a, b),
            (None, None) => false,
            _ => true,
        }
    }

    /// Check the structural invariants, failing on the first violation.
    pub fn validate(&self) -> Result<(), DocumentError> {
        match check_structure(&self.root, &self.nodes).into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Inspect invariants and emit every finding.
    #[must_use]
    pub fn invariant_report(&self) -> InvariantReport {
        let mut issues: Vec<InvariantIssue> = check_structure(&self.root, &self.nodes)
            .into_iter()
            .map(InvariantIssue::from_error)
            .collect();

        if let Some(highest) = self.highest_sequenced_id()
            && highest >= self.next_seq
        {
            issues.push(InvariantIssue {
                code: InvariantCode::StaleSequence,
                severity: InvariantSeverity::Warning,
                node_id: Some(NodeId::new(format!("n{highest}"))),
                related_node: None,
                message: format!(
                    "next_seq {} is not above existing sequenced id n{highest}",
                    self.next_seq
                ),
            });
        }

        InvariantReport {
            state_hash: self.state_hash(),
            issues,
        }
    }

    fn highest_sequenced_id(&self) -> Option<u64> {
        self.nodes
            .keys()
            .filter_map(|id| id.as_str().strip_prefix('n')?.parse::<u64>().ok())
            .max()
    }

    /// Deterministic FNV-1a hash over the full document state.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hash = OFFSET_BASIS;
        mix_str(&mut hash, &self.form_name);
        mix_str(&mut hash, self.root.as_str());
        mix_u64(&mut hash, self.next_seq);
        mix_u64(&mut hash, self.nodes.len() as u64);
        for node in self.nodes.values() {
            mix_node(&mut hash, node);
        }
        hash
    }

    /// Export as a plain serde shape, nodes ordered by id.
    #[must_use]
    pub fn to_snapshot(&self) -> DocumentSnapshot {
        DocumentSnapshot {
            form_name: self.form_name.clone(),
            root: self.root.clone(),
            next_seq: self.next_seq,
            nodes: self.nodes.values().map(|node| Node::clone(node)).collect(),
        }
    }

    /// Import a snapshot, rejecting anything that violates the invariants.
    pub fn from_snapshot(snapshot: DocumentSnapshot) -> Result<Self, DocumentError> {
        let mut nodes = OrdMap::new();
        for node in snapshot.nodes {
            if node.id.is_empty() {
                return Err(DocumentError::EmptyNodeId);
            }
            let id = node.id.clone();
            if nodes.insert(id.clone(), Arc::new(node)).is_some() {
                return Err(DocumentError::DuplicateNodeId { node_id: id });
            }
        }
        let document = Self {
            form_name: snapshot.form_name,
            root: snapshot.root,
            next_seq: snapshot.next_seq.max(1),
            nodes,
        };
        document.validate()?;
        Ok(document)
    }

    pub(crate) fn put(&mut self, node: Node) {
        self.nodes.insert(node.id.clone(), Arc::new(node));
    }

    pub(crate) fn take(&mut self, id: &NodeId) -> Option<Arc<Node>> {
        self.nodes.remove(id)
    }

    /// Replace node `id` with an edited copy. Returns `None` if it is missing.
    pub(crate) fn edit_node<R>(
        &mut self,
        id: &NodeId,
        edit: impl FnOnce(&mut Node) -> R,
    ) -> Option<R> {
        let mut node = Node::clone(self.nodes.get(id)?);
        let out = edit(&mut node);
        self.put(node);
        Some(out)
    }

    /// Edit a container's children. Returns `None` for leaves and unknown ids.
    pub(crate) fn edit_children<R>(
        &mut self,
        id: &NodeId,
        edit: impl FnOnce(&mut Vec<NodeId>) -> R,
    ) -> Option<R> {
        if !self.node(id)?.is_container() {
            return None;
        }
        self.edit_node(id, |node| match &mut node.kind {
            NodeKind::Container(props) => Some(edit(&mut props.children)),
            NodeKind::Leaf(_) => None,
        })
        .flatten()
    }

    pub(crate) fn set_parent(&mut self, id: &NodeId, parent: &NodeId) {
        if self.parent_of(id) == Some(parent) {
            return;
        }
        self.edit_node(id, |node| node.parent = Some(parent.clone()));
    }

    /// Next free `n{seq}` id. `None` once the sequence is exhausted.
    pub(crate) fn allocate_id(&mut self) -> Option<NodeId> {
        loop {
            let seq = self.next_seq;
            self.next_seq = seq.checked_add(1)?;
            let candidate = NodeId::new(format!("n{seq}"));
            if !self.nodes.contains_key(&candidate) {
                return Some(candidate);
            }
        }
    }
}

/// Plain serde form of a [`Document`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentSnapshot {
    pub form_name: String,
    pub root: NodeId,
    pub next_seq: u64,
    pub nodes: Vec<Node>,
}

/// Structural invariant violations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentError {
    EmptyNodeId,
    DuplicateNodeId {
        node_id: NodeId,
    },
    KeyMismatch {
        key: NodeId,
        node_id: NodeId,
    },
    MissingRoot {
        root: NodeId,
    },
    RootNotContainer {
        root: NodeId,
    },
    RootHasParent {
        root: NodeId,
        parent: NodeId,
    },
    MissingParent {
        node_id: NodeId,
        parent: NodeId,
    },
    ParentNotContainer {
        node_id: NodeId,
        parent: NodeId,
    },
    MissingChild {
        parent: NodeId,
        child: NodeId,
    },
    DuplicateChild {
        parent: NodeId,
        child: NodeId,
    },
    MultipleParents {
        child: NodeId,
        first_parent: NodeId,
        second_parent: NodeId,
    },
    ParentMismatch {
        node_id: NodeId,
        expected: Option<NodeId>,
        actual: Option<NodeId>,
    },
    CycleDetected {
        node_id: NodeId,
    },
    UnreachableNode {
        node_id: NodeId,
    },
}

impl DocumentError {
    /// Stable code used in invariant reports.
    #[must_use]
    pub const fn code(&self) -> InvariantCode {
        match self {
            Self::EmptyNodeId => InvariantCode::EmptyNodeId,
            Self::DuplicateNodeId { .. } => InvariantCode::DuplicateNodeId,
            Self::KeyMismatch { .. } => InvariantCode::KeyMismatch,
            Self::MissingRoot { .. } => InvariantCode::MissingRoot,
            Self::RootNotContainer { .. } => InvariantCode::RootNotContainer,
            Self::RootHasParent { .. } => InvariantCode::RootHasParent,
            Self::MissingParent { .. } => InvariantCode::MissingParent,
            Self::ParentNotContainer { .. } => InvariantCode::ParentNotContainer,
            Self::MissingChild { .. } => InvariantCode::MissingChild,
            Self::DuplicateChild { .. } => InvariantCode::DuplicateChild,
            Self::MultipleParents { .. } => InvariantCode::MultipleParents,
            Self::ParentMismatch { .. } => InvariantCode::ParentMismatch,
            Self::CycleDetected { .. } => InvariantCode::CycleDetected,
            Self::UnreachableNode { .. } => InvariantCode::UnreachableNode,
        }
    }

    fn subject(&self) -> (Option<&NodeId>, Option<&NodeId>) {
        match self {
            Self::EmptyNodeId => (None, None),
            Self::DuplicateNodeId { node_id }
            | Self::CycleDetected { node_id }
            | Self::UnreachableNode { node_id } => (Some(node_id), None),
            Self::KeyMismatch { key, node_id } => (Some(node_id), Some(key)),
            Self::MissingRoot { root } | Self::RootNotContainer { root } => (Some(root), None),
            Self::RootHasParent { root, parent } => (Some(root), Some(parent)),
            Self::MissingParent { node_id, parent }
            | Self::ParentNotContainer { node_id, parent } => (Some(node_id), Some(parent)),
            Self::MissingChild { parent, child } | Self::DuplicateChild { parent, child } => {
                (Some(parent), Some(child))
            }
            Self::MultipleParents {
                child,
                second_parent,
                ..
            } => (Some(child), Some(second_parent)),
            Self::ParentMismatch {
                node_id, expected, ..
            } => (Some(node_id), expected.as_ref()),
        }
    }
}

fn display_parent(parent: Option<&NodeId>) -> &str {
    parent.map_or("<none>", NodeId::as_str)
}

impl fmt::Display for DocumentError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyNodeId => write!(f, "node id must not be empty"),
            Self::DuplicateNodeId { node_id } => write!(f, "duplicate node id {node_id}"),
            Self::KeyMismatch { key, node_id } => {
                write!(f, "node {node_id} is stored under key {key}")
            }
            Self::MissingRoot { root } => write!(f, "root node {root} not found"),
            Self::RootNotContainer { root } => write!(f, "root node {root} must be a container"),
            Self::RootHasParent { root, parent } => {
                write!(f, "root node {root} must not have parent {parent}")
            }
            Self::MissingParent { node_id, parent } => {
                write!(f, "node {node_id} references missing parent {parent}")
            }
            Self::ParentNotContainer { node_id, parent } => {
                write!(f, "node {node_id} has parent {parent} which is not a container")
            }
            Self::MissingChild { parent, child } => {
                write!(f, "container {parent} references missing child {child}")
            }
            Self::DuplicateChild { parent, child } => {
                write!(f, "container {parent} lists child {child} more than once")
            }
            Self::MultipleParents {
                child,
                first_parent,
                second_parent,
            } => write!(
                f,
                "node {child} has multiple parents: {first_parent} and {second_parent}"
            ),
            Self::ParentMismatch {
                node_id,
                expected,
                actual,
            } => write!(
                f,
                "node {node_id} parent mismatch: expected {}, got {}",
                display_parent(expected.as_ref()),
                display_parent(actual.as_ref())
            ),
            Self::CycleDetected { node_id } => {
                write!(f, "cycle detected in parent links at node {node_id}")
            }
            Self::UnreachableNode { node_id } => {
                write!(f, "node {node_id} is unreachable from root")
            }
        }
    }
}

impl std::error::Error for DocumentError {}

/// Severity for one invariant finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvariantSeverity {
    Error,
    Warning,
}

/// Stable code for invariant findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvariantCode {
    EmptyNodeId,
    DuplicateNodeId,
    KeyMismatch,
    MissingRoot,
    RootNotContainer,
    RootHasParent,
    MissingParent,
    ParentNotContainer,
    MissingChild,
    DuplicateChild,
    MultipleParents,
    ParentMismatch,
    CycleDetected,
    UnreachableNode,
    StaleSequence,
}

/// One invariant finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvariantIssue {
    pub code: InvariantCode,
    pub severity: InvariantSeverity,
    pub node_id: Option<NodeId>,
    pub related_node: Option<NodeId>,
    pub message: String,
}

impl InvariantIssue {
    fn from_error(err: DocumentError) -> Self {
        let (node_id, related_node) = err.subject();
        Self {
            code: err.code(),
            severity: InvariantSeverity::Error,
            node_id: node_id.cloned(),
            related_node: related_node.cloned(),
            message: err.to_string(),
        }
    }
}

/// Structured invariant report over a document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvariantReport {
    pub state_hash: u64,
    pub issues: Vec<InvariantIssue>,
}

impl InvariantReport {
    /// Return true if any error-level finding exists.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.issues
            .iter()
            .any(|issue| issue.severity == InvariantSeverity::Error)
    }

    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }
}

/// Collect every structural violation in a deterministic order.
fn check_structure(root: &NodeId, nodes: &OrdMap<NodeId, Arc<Node>>) -> Vec<DocumentError> {
    let mut errors = Vec::new();

    for (key, node) in nodes {
        if node.id.is_empty() {
            errors.push(DocumentError::EmptyNodeId);
        }
        if key != &node.id {
            errors.push(DocumentError::KeyMismatch {
                key: key.clone(),
                node_id: node.id.clone(),
            });
        }
    }

    match nodes.get(root) {
        None => errors.push(DocumentError::MissingRoot { root: root.clone() }),
        Some(node) => {
            if !node.is_container() {
                errors.push(DocumentError::RootNotContainer { root: root.clone() });
            }
            if let Some(parent) = &node.parent {
                errors.push(DocumentError::RootHasParent {
                    root: root.clone(),
                    parent: parent.clone(),
                });
            }
        }
    }

    let mut expected_parents: BTreeMap<&NodeId, &NodeId> = BTreeMap::new();
    for node in nodes.values() {
        let mut seen = BTreeSet::new();
        for child in node.children() {
            if !nodes.contains_key(child) {
                errors.push(DocumentError::MissingChild {
                    parent: node.id.clone(),
                    child: child.clone(),
                });
                continue;
            }
            if !seen.insert(child) {
                errors.push(DocumentError::DuplicateChild {
                    parent: node.id.clone(),
                    child: child.clone(),
                });
                continue;
            }
            if let Some(first_parent) = expected_parents.insert(child, &node.id) {
                errors.push(DocumentError::MultipleParents {
                    child: child.clone(),
                    first_parent: first_parent.clone(),
                    second_parent: node.id.clone(),
                });
            }
        }
    }

    for node in nodes.values() {
        if let Some(parent) = &node.parent {
            match nodes.get(parent) {
                None => errors.push(DocumentError::MissingParent {
                    node_id: node.id.clone(),
                    parent: parent.clone(),
                }),
                Some(parent_node) if !parent_node.is_container() => {
                    errors.push(DocumentError::ParentNotContainer {
                        node_id: node.id.clone(),
                        parent: parent.clone(),
                    });
                }
                Some(_) => {}
            }
        }
        if &node.id == root {
            continue;
        }
        let expected = expected_parents.get(&node.id).copied();
        if node.parent.as_ref() != expected {
            errors.push(DocumentError::ParentMismatch {
                node_id: node.id.clone(),
                expected: expected.cloned(),
                actual: node.parent.clone(),
            });
        }
    }

    let mut reachable = BTreeSet::new();
    if nodes.contains_key(root) {
        let mut stack = vec![root];
        while let Some(current) = stack.pop() {
            if !reachable.insert(current) {
                errors.push(DocumentError::CycleDetected {
                    node_id: current.clone(),
                });
                continue;
            }
            if let Some(node) = nodes.get(current) {
                stack.extend(node.children().iter().filter(|c| nodes.contains_key(*c)));
            }
        }
    }

    for id in nodes.keys() {
        if reachable.contains(id) {
            continue;
        }
        if parent_chain_loops(id, nodes) {
            errors.push(DocumentError::CycleDetected { node_id: id.clone() });
        } else {
            errors.push(DocumentError::UnreachableNode { node_id: id.clone() });
        }
    }

    errors
}

fn parent_chain_loops(start: &NodeId, nodes: &OrdMap<NodeId, Arc<Node>>) -> bool {
    let mut seen = BTreeSet::new();
    let mut cursor = Some(start);
    while let Some(id) = cursor {
        if !seen.insert(id) {
            return true;
        }
        cursor = nodes.get(id).and_then(|node| node.parent.as_ref());
    }
    false
}

const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const PRIME: u64 = 0x0000_0001_0000_01b3;

fn mix(hash: &mut u64, byte: u8) {
    *hash ^= u64::from(byte);
    *hash = hash.wrapping_mul(PRIME);
}

fn mix_bytes(hash: &mut u64, bytes: &[u8]) {
    for byte in bytes {
        mix(hash, *byte);
    }
}

fn mix_u16(hash: &mut u64, value: u16) {
    mix_bytes(hash, &value.to_le_bytes());
}

fn mix_u64(hash: &mut u64, value: u64) {
    mix_bytes(hash, &value.to_le_bytes());
}

fn mix_bool(hash: &mut u64, value: bool) {
    mix(hash, u8::from(value));
}

fn mix_str(hash: &mut u64, value: &str) {
    mix_u64(hash, value.len() as u64);
    mix_bytes(hash, value.as_bytes());
}

fn mix_opt_str(hash: &mut u64, value: Option<&str>) {
    match value {
        Some(value) => {
            mix(hash, 1);
            mix_str(hash, value);
        }
        None => mix(hash, 0),
    }
}

fn mix_opt_u8(hash: &mut u64, value: Option<u8>) {
    match value {
        Some(value) => {
            mix(hash, 1);
            mix(hash, value);
        }
        None => mix(hash, 0),
    }
}

fn mix_node(hash: &mut u64, node: &Node) {
    mix_str(hash, node.id.as_str());
    mix_opt_str(hash, node.parent.as_ref().map(NodeId::as_str));
    match &node.kind {
        NodeKind::Container(props) => {
            mix(hash, 1);
            mix_u64(hash, props.children.len() as u64);
            for child in &props.children {
                mix_str(hash, child.as_str());
            }
            mix(hash, props.arrangement as u8);
            mix(hash, props.columns);
            mix_u16(hash, props.gap);
            mix(hash, props.distribution as u8);
            mix_u16(hash, props.padding);
            mix(hash, props.border as u8);
        }
        NodeKind::Leaf(leaf) => {
            mix(hash, 2);
            mix(hash, leaf.control as u8);
            mix_str(hash, &leaf.label);
            mix_str(hash, &leaf.field_name);
            mix_opt_str(hash, leaf.placeholder.as_deref());
            mix_bool(hash, leaf.required);
            mix_opt_str(hash, leaf.content.as_deref());
            mix_opt_u8(hash, leaf.heading_level);
            mix_opt_str(hash, leaf.href.as_deref());
            mix_opt_u8(hash, leaf.link_target.map(|target| target as u8));
            mix_u64(hash, leaf.options.len() as u64);
            for option in &leaf.options {
                mix_str(hash, option);
            }
            match &leaf.binding {
                Some(binding) => {
                    mix(hash, 1);
                    mix_str(hash, &binding.source_node_id);
                    mix_str(hash, &binding.source_node_name);
                    mix_str(hash, &binding.field_id);
                    mix_str(hash, &binding.field_name);
                    mix_str(hash, &binding.path);
                }
                None => mix(hash, 0),
            }
            mix_opt_u8(hash, leaf.layout.column_span);
            mix_opt_u8(hash, leaf.layout.shrink.map(u8::from));
        }
    }
}
