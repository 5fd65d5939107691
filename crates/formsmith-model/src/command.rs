//! Mutation requests accepted by [`Document::apply`](crate::Document::apply).

use serde::{Deserialize, Serialize};

use crate::id::NodeId;
use crate::node::{
    Arrangement, Binding, BorderStyle, ContainerProps, ContextualLayout, ControlKind,
    Distribution, LeafProps, LinkTarget, Node,
};

/// Blueprint for a node created by `AddNode`/`AddNodesBulk`.
///
/// Creation commands never carry a pre-built [`Node`]: containers always
/// start from the canonical default property set and leaves derive their
/// names from the label or binding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeSpec {
    /// Empty container with canonical default properties.
    Container,
    /// Input field with an explicit label.
    Field {
        control: ControlKind,
        label: String,
        #[serde(default)]
        required: bool,
    },
    /// Input field created from a catalog binding.
    Bound {
        control: ControlKind,
        binding: Binding,
    },
    /// Heading, paragraph, link or divider.
    Static { control: ControlKind, text: String },
}

impl NodeSpec {
    /// Single-line text input labelled `label`.
    #[must_use]
    pub fn text_input(label: impl Into<String>) -> Self {
        Self::Field {
            control: ControlKind::TextInput,
            label: label.into(),
            required: false,
        }
    }

    /// Text input bound to a catalog field.
    #[must_use]
    pub fn bound(binding: Binding) -> Self {
        Self::Bound {
            control: ControlKind::TextInput,
            binding,
        }
    }

    /// Heading showing `text`.
    #[must_use]
    pub fn heading(text: impl Into<String>) -> Self {
        Self::Static {
            control: ControlKind::Heading,
            text: text.into(),
        }
    }

    /// Materialize the spec as a node with the given identity.
    #[must_use]
    pub fn build(&self, id: NodeId, parent: NodeId) -> Node {
        match self {
            Self::Container => Node::container(id, Some(parent), ContainerProps::default()),
            Self::Field {
                control,
                label,
                required,
            } => {
                let mut leaf = LeafProps::field(*control, label.clone());
                leaf.required = *required && control.is_input();
                Node::leaf(id, Some(parent), leaf)
            }
            Self::Bound { control, binding } => {
                Node::leaf(id, Some(parent), LeafProps::bound(*control, binding.clone()))
            }
            Self::Static { control, text } => {
                Node::leaf(id, Some(parent), LeafProps::text(*control, text.clone()))
            }
        }
    }
}

/// Shallow patch for leaf properties. `None` leaves a field untouched;
/// `Some(None)` clears an optional field.
///
/// Fields that the leaf's control does not use are ignored, so a patch
/// never leaves state behind that a kind conversion would clear:
/// `placeholder` and `required` apply to inputs, `content` to statics
/// other than dividers, `heading_level` to headings, `href` and
/// `link_target` to links, and `options` to selects.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LeafPatch {
    pub label: Option<String>,
    pub field_name: Option<String>,
    pub placeholder: Option<Option<String>>,
    pub required: Option<bool>,
    pub content: Option<Option<String>>,
    pub heading_level: Option<u8>,
    pub href: Option<Option<String>>,
    pub link_target: Option<Option<LinkTarget>>,
    pub options: Option<Vec<String>>,
}

impl LeafPatch {
    /// Patch that only changes the label.
    #[must_use]
    pub fn label(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::default()
        }
    }

    pub(crate) fn apply_to(&self, leaf: &mut LeafProps) {
        let control = leaf.control;
        if let Some(label) = &self.label {
            leaf.label.clone_from(label);
        }
        if let Some(field_name) = &self.field_name {
            leaf.field_name.clone_from(field_name);
        }
        if control.is_input() {
            if let Some(placeholder) = &self.placeholder {
                leaf.placeholder.clone_from(placeholder);
            }
            if let Some(required) = self.required {
                leaf.required = required;
            }
        } else if control != ControlKind::Divider {
            if let Some(content) = &self.content {
                leaf.content.clone_from(content);
            }
        }
        match control {
            ControlKind::Heading => {
                if let Some(level) = self.heading_level {
                    leaf.heading_level = Some(level);
                }
            }
            ControlKind::Link => {
                if let Some(href) = &self.href {
                    leaf.href.clone_from(href);
                }
                if let Some(target) = self.link_target {
                    leaf.link_target = target;
                }
            }
            ControlKind::Select => {
                if let Some(options) = &self.options {
                    leaf.options.clone_from(options);
                }
            }
            _ => {}
        }
    }
}

/// Shallow patch for container appearance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContainerPatch {
    pub arrangement: Option<Arrangement>,
    pub columns: Option<u8>,
    pub gap: Option<u16>,
    pub distribution: Option<Distribution>,
    pub padding: Option<u16>,
    pub border: Option<BorderStyle>,
}

impl ContainerPatch {
    pub(crate) fn apply_to(self, props: &mut ContainerProps) {
        if let Some(arrangement) = self.arrangement {
            props.arrangement = arrangement;
        }
        if let Some(columns) = self.columns {
            props.columns = columns.max(1);
        }
        if let Some(gap) = self.gap {
            props.gap = gap;
        }
        if let Some(distribution) = self.distribution {
            props.distribution = distribution;
        }
        if let Some(padding) = self.padding {
            props.padding = padding;
        }
        if let Some(border) = self.border {
            props.border = border;
        }
    }
}

/// Shallow patch for grid/wrap layout hints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextualLayoutPatch {
    pub column_span: Option<Option<u8>>,
    pub shrink: Option<Option<bool>>,
}

impl ContextualLayoutPatch {
    pub(crate) fn apply_to(self, layout: &mut ContextualLayout) {
        if let Some(span) = self.column_span {
            layout.column_span = span;
        }
        if let Some(shrink) = self.shrink {
            layout.shrink = shrink;
        }
    }
}

/// Supported document mutations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Command {
    /// Create one node inside a container at `index` (clamped).
    AddNode {
        parent: NodeId,
        index: usize,
        spec: NodeSpec,
    },
    /// Create several nodes in caller order; appends when `index` is `None`.
    AddNodesBulk {
        parent: NodeId,
        #[serde(default)]
        index: Option<usize>,
        specs: Vec<NodeSpec>,
    },
    /// Remove a node and all its descendants.
    DeleteSubtree { node: NodeId },
    /// Remove several subtrees; ids already removed earlier in the batch are skipped.
    DeleteMany { nodes: Vec<NodeId> },
    /// Re-parent a node.
    Move {
        node: NodeId,
        from_parent: NodeId,
        to_parent: NodeId,
        to_index: usize,
    },
    /// Move a node within its parent's children.
    Reorder {
        node: NodeId,
        parent: NodeId,
        from_index: usize,
        to_index: usize,
    },
    /// Wrap sibling nodes in a new default container.
    WrapInContainer { nodes: Vec<NodeId>, parent: NodeId },
    /// Replace a container with its children.
    UnwrapContainer { container: NodeId },
    /// Switch a leaf's control kind.
    ConvertLeafKind { node: NodeId, target: ControlKind },
    UpdateProperties { node: NodeId, patch: LeafPatch },
    UpdateAppearance { node: NodeId, patch: ContainerPatch },
    /// Set (`Some`) or clear (`None`) a leaf's catalog binding.
    UpdateBinding {
        node: NodeId,
        binding: Option<Binding>,
    },
    UpdateContextualLayout {
        node: NodeId,
        patch: ContextualLayoutPatch,
    },
    /// Rename the document.
    Rename { form_name: String },
    /// Deep-copy a subtree and insert it right after the original.
    DuplicateSubtree { node: NodeId },
    /// Apply several commands as one all-or-nothing step.
    Batch { commands: Vec<Command> },
}

impl Command {
    /// Operation family.
    #[must_use]
    pub const fn kind(&self) -> CommandKind {
        match self {
            Self::AddNode { .. } => CommandKind::AddNode,
            Self::AddNodesBulk { .. } => CommandKind::AddNodesBulk,
            Self::DeleteSubtree { .. } => CommandKind::DeleteSubtree,
            Self::DeleteMany { .. } => CommandKind::DeleteMany,
            Self::Move { .. } => CommandKind::Move,
            Self::Reorder { .. } => CommandKind::Reorder,
            Self::WrapInContainer { .. } => CommandKind::WrapInContainer,
            Self::UnwrapContainer { .. } => CommandKind::UnwrapContainer,
            Self::ConvertLeafKind { .. } => CommandKind::ConvertLeafKind,
            Self::UpdateProperties { .. } => CommandKind::UpdateProperties,
            Self::UpdateAppearance { .. } => CommandKind::UpdateAppearance,
            Self::UpdateBinding { .. } => CommandKind::UpdateBinding,
            Self::UpdateContextualLayout { .. } => CommandKind::UpdateContextualLayout,
            Self::Rename { .. } => CommandKind::Rename,
            Self::DuplicateSubtree { .. } => CommandKind::DuplicateSubtree,
            Self::Batch { .. } => CommandKind::Batch,
        }
    }

    /// Node ids named directly by the command payload.
    #[must_use]
    pub fn referenced_nodes(&self) -> Vec<NodeId> {
        match self {
            Self::AddNode { parent, .. } | Self::AddNodesBulk { parent, .. } => {
                vec![parent.clone()]
            }
            Self::DeleteSubtree { node }
            | Self::ConvertLeafKind { node, .. }
            | Self::UpdateProperties { node, .. }
            | Self::UpdateAppearance { node, .. }
            | Self::UpdateBinding { node, .. }
            | Self::UpdateContextualLayout { node, .. }
            | Self::DuplicateSubtree { node }
            | Self::UnwrapContainer { container: node } => vec![node.clone()],
            Self::DeleteMany { nodes } => nodes.clone(),
            Self::Move {
                node,
                from_parent,
                to_parent,
                ..
            } => vec![node.clone(), from_parent.clone(), to_parent.clone()],
            Self::Reorder { node, parent, .. } => vec![node.clone(), parent.clone()],
            Self::WrapInContainer { nodes, parent } => {
                let mut out = nodes.clone();
                out.push(parent.clone());
                out
            }
            Self::Rename { .. } => Vec::new(),
            Self::Batch { commands } => commands.iter().flat_map(Self::referenced_nodes).collect(),
        }
    }
}

/// Stable command discriminator used in logs and history metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    AddNode,
    AddNodesBulk,
    DeleteSubtree,
    DeleteMany,
    Move,
    Reorder,
    WrapInContainer,
    UnwrapContainer,
    ConvertLeafKind,
    UpdateProperties,
    UpdateAppearance,
    UpdateBinding,
    UpdateContextualLayout,
    Rename,
    DuplicateSubtree,
    Batch,
}

impl CommandKind {
    /// Snake-case name, matching the serialized `op` tag.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AddNode => "add_node",
            Self::AddNodesBulk => "add_nodes_bulk",
            Self::DeleteSubtree => "delete_subtree",
            Self::DeleteMany => "delete_many",
            Self::Move => "move",
            Self::Reorder => "reorder",
            Self::WrapInContainer => "wrap_in_container",
            Self::UnwrapContainer => "unwrap_container",
            Self::ConvertLeafKind => "convert_leaf_kind",
            Self::UpdateProperties => "update_properties",
            Self::UpdateAppearance => "update_appearance",
            Self::UpdateBinding => "update_binding",
            Self::UpdateContextualLayout => "update_contextual_layout",
            Self::Rename => "rename",
            Self::DuplicateSubtree => "duplicate_subtree",
            Self::Batch => "batch",
        }
    }
}

impl std::fmt::Display for CommandKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
