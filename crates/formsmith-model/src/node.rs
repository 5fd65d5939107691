//! Node payloads for the designer tree.
//!
//! A node is either a [`ContainerProps`] (ordered children plus arrangement
//! and appearance) or a [`LeafProps`] (a field or static widget). Nodes are
//! plain data; every change goes through [`Command`](crate::Command) and
//! produces a fresh `Arc<Node>` in the next document.

use serde::{Deserialize, Serialize};

use crate::id::NodeId;
use crate::naming::{camel_case_identifier, default_placeholder};

/// How a container arranges its children.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arrangement {
    /// Top to bottom.
    #[default]
    Stack,
    /// Left to right on one line.
    Row,
    /// Fixed column grid; children may carry a column span.
    Grid,
    /// Left to right, wrapping; children may opt out of shrinking.
    Wrap,
}

impl Arrangement {
    /// Whether children's [`ContextualLayout`] hints apply under this mode.
    #[must_use]
    pub const fn uses_contextual_layout(self) -> bool {
        matches!(self, Self::Grid | Self::Wrap)
    }
}

/// Main-axis distribution of children inside a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Distribution {
    #[default]
    Start,
    Center,
    End,
    SpaceBetween,
    Stretch,
}

/// Container outline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BorderStyle {
    #[default]
    None,
    Solid,
    Dashed,
}

/// Container payload: ordered children plus layout/appearance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerProps {
    #[serde(default)]
    pub children: Vec<NodeId>,
    pub arrangement: Arrangement,
    pub columns: u8,
    pub gap: u16,
    pub distribution: Distribution,
    pub padding: u16,
    pub border: BorderStyle,
}

impl Default for ContainerProps {
    /// Canonical property set given to every newly created container.
    fn default() -> Self {
        Self {
            children: Vec::new(),
            arrangement: Arrangement::Stack,
            columns: 2,
            gap: 12,
            distribution: Distribution::Start,
            padding: 16,
            border: BorderStyle::None,
        }
    }
}

/// Widget rendered by a leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ControlKind {
    TextInput,
    TextArea,
    Number,
    Date,
    Checkbox,
    Select,
    Heading,
    Paragraph,
    Link,
    Divider,
}

impl ControlKind {
    /// Every control kind, in palette order.
    pub const ALL: [Self; 10] = [
        Self::TextInput,
        Self::TextArea,
        Self::Number,
        Self::Date,
        Self::Checkbox,
        Self::Select,
        Self::Heading,
        Self::Paragraph,
        Self::Link,
        Self::Divider,
    ];

    /// Whether the control captures a value (and may be bound/required).
    #[must_use]
    pub const fn is_input(self) -> bool {
        matches!(
            self,
            Self::TextInput | Self::TextArea | Self::Number | Self::Date | Self::Checkbox | Self::Select
        )
    }

    /// Whether the control shows a typed-text placeholder.
    #[must_use]
    pub const fn takes_placeholder(self) -> bool {
        matches!(
            self,
            Self::TextInput | Self::TextArea | Self::Number | Self::Date
        )
    }

    /// Human-readable name used for default labels.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::TextInput => "Text",
            Self::TextArea => "Long text",
            Self::Number => "Number",
            Self::Date => "Date",
            Self::Checkbox => "Checkbox",
            Self::Select => "Select",
            Self::Heading => "Heading",
            Self::Paragraph => "Paragraph",
            Self::Link => "Link",
            Self::Divider => "Divider",
        }
    }
}

/// Where a link opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkTarget {
    #[default]
    SameTab,
    NewTab,
}

/// Reference into an external data catalog.
///
/// Stored opaquely; the document never checks it against the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Binding {
    pub source_node_id: String,
    pub source_node_name: String,
    pub field_id: String,
    pub field_name: String,
    pub path: String,
}

impl Binding {
    /// Name shown to the designer for this binding.
    #[must_use]
    pub fn display_name(&self) -> &str {
        &self.field_name
    }
}

/// Layout hints that only matter under a grid/wrap parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ContextualLayout {
    #[serde(default)]
    pub column_span: Option<u8>,
    #[serde(default)]
    pub shrink: Option<bool>,
}

/// Leaf payload: a field or static widget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafProps {
    pub control: ControlKind,
    pub label: String,
    #[serde(default)]
    pub field_name: String,
    #[serde(default)]
    pub placeholder: Option<String>,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub heading_level: Option<u8>,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub link_target: Option<LinkTarget>,
    #[serde(default)]
    pub options: Vec<String>,
    #[serde(default)]
    pub binding: Option<Binding>,
    #[serde(default)]
    pub layout: ContextualLayout,
}

/// Heading level given to new and converted headings.
pub const DEFAULT_HEADING_LEVEL: u8 = 2;

/// Link address given to new and converted links.
pub const DEFAULT_HREF: &str = "#";

impl LeafProps {
    /// Input field with label-derived field name and placeholder.
    #[must_use]
    pub fn field(control: ControlKind, label: impl Into<String>) -> Self {
        let label = label.into();
        let mut leaf = Self::blank(control, label.clone());
        leaf.field_name = camel_case_identifier(&label);
        leaf.reset_kind_fields();
        leaf
    }

    /// Input field whose label comes from a catalog binding.
    #[must_use]
    pub fn bound(control: ControlKind, binding: Binding) -> Self {
        let label = binding.display_name().to_owned();
        let mut leaf = Self::blank(control, label.clone());
        leaf.field_name = camel_case_identifier(&label);
        leaf.reset_kind_fields();
        if control.is_input() {
            // Bound fields always prompt with the binding name.
            leaf.placeholder = Some(default_placeholder(&label));
            leaf.binding = Some(binding);
        }
        leaf
    }

    /// Static widget (heading, paragraph, link, divider) showing `text`.
    #[must_use]
    pub fn text(control: ControlKind, text: impl Into<String>) -> Self {
        let text = text.into();
        let label = if text.is_empty() {
            control.display_name().to_owned()
        } else {
            text.clone()
        };
        let mut leaf = Self::blank(control, label);
        if control != ControlKind::Divider {
            leaf.content = Some(text);
        }
        leaf.reset_kind_fields();
        leaf
    }

    fn blank(control: ControlKind, label: String) -> Self {
        Self {
            control,
            label,
            field_name: String::new(),
            placeholder: None,
            required: false,
            content: None,
            heading_level: None,
            href: None,
            link_target: None,
            options: Vec::new(),
            binding: None,
            layout: ContextualLayout::default(),
        }
    }

    /// Switch to `target`, resetting fields that belong to the old kind.
    ///
    /// Returns `false` when the leaf already has the target kind.
    pub fn convert_to(&mut self, target: ControlKind) -> bool {
        if self.control == target {
            return false;
        }
        let previous = self.control;
        self.control = target;
        if target.is_input() && !previous.is_input() {
            if self.field_name.is_empty() {
                self.field_name = camel_case_identifier(&self.label);
            }
            self.content = None;
        }
        if !target.is_input() && target != ControlKind::Divider && self.content.is_none() {
            // Statics other than dividers always show text.
            self.content = Some(self.label.clone());
        }
        self.reset_kind_fields();
        true
    }

    /// Bring kind-specific fields in line with `self.control`.
    fn reset_kind_fields(&mut self) {
        let control = self.control;
        if control != ControlKind::Heading {
            self.heading_level = None;
        } else if self.heading_level.is_none() {
            self.heading_level = Some(DEFAULT_HEADING_LEVEL);
        }

        if control == ControlKind::Link {
            if self.href.is_none() {
                self.href = Some(DEFAULT_HREF.to_owned());
            }
            if self.link_target.is_none() {
                self.link_target = Some(LinkTarget::SameTab);
            }
        } else {
            self.href = None;
            self.link_target = None;
        }

        if control == ControlKind::Select {
            if self.options.is_empty() {
                self.options = vec!["Option 1".to_owned(), "Option 2".to_owned()];
            }
        } else {
            self.options.clear();
        }

        if control.takes_placeholder() {
            if self.placeholder.is_none() {
                self.placeholder = Some(default_placeholder(&self.label));
            }
        } else {
            self.placeholder = None;
        }

        if !control.is_input() {
            self.required = false;
            self.binding = None;
        }
        if control == ControlKind::Divider {
            self.content = None;
        }
    }
}

/// Node payload variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NodeKind {
    Container(ContainerProps),
    Leaf(LeafProps),
}

/// One element of the designed screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    /// `None` only for the root container.
    #[serde(default)]
    pub parent: Option<NodeId>,
    #[serde(flatten)]
    pub kind: NodeKind,
}

impl Node {
    /// Construct a container record.
    #[must_use]
    pub fn container(id: NodeId, parent: Option<NodeId>, props: ContainerProps) -> Self {
        Self {
            id,
            parent,
            kind: NodeKind::Container(props),
        }
    }

    /// Construct a leaf record.
    #[must_use]
    pub fn leaf(id: NodeId, parent: Option<NodeId>, props: LeafProps) -> Self {
        Self {
            id,
            parent,
            kind: NodeKind::Leaf(props),
        }
    }

    #[must_use]
    pub fn is_container(&self) -> bool {
        matches!(self.kind, NodeKind::Container(_))
    }

    #[must_use]
    pub fn as_container(&self) -> Option<&ContainerProps> {
        match &self.kind {
            NodeKind::Container(props) => Some(props),
            NodeKind::Leaf(_) => None,
        }
    }

    #[must_use]
    pub fn as_leaf(&self) -> Option<&LeafProps> {
        match &self.kind {
            NodeKind::Leaf(props) => Some(props),
            NodeKind::Container(_) => None,
        }
    }

    /// Ordered child ids (empty for leaves).
    #[must_use]
    pub fn children(&self) -> &[NodeId] {
        match &self.kind {
            NodeKind::Container(props) => &props.children,
            NodeKind::Leaf(_) => &[],
        }
    }

    /// Short name for history messages and notifications.
    #[must_use]
    pub fn display_name(&self) -> &str {
        match &self.kind {
            NodeKind::Container(_) => "Container",
            NodeKind::Leaf(leaf) => &leaf.label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn binding(name: &str) -> Binding {
        Binding {
            source_node_id: "src-1".into(),
            source_node_name: "Arrest".into(),
            field_id: "f-9".into(),
            field_name: name.into(),
            path: format!("arrest.{name}"),
        }
    }

    #[test]
    fn bound_leaf_derives_names_from_binding() {
        let leaf = LeafProps::bound(ControlKind::Date, binding("Arrest Date"));
        assert_eq!(leaf.label, "Arrest Date");
        assert_eq!(leaf.field_name, "arrestDate");
        assert_eq!(leaf.placeholder.as_deref(), Some("Enter Arrest Date"));
        assert_eq!(leaf.binding, Some(binding("Arrest Date")));
    }

    #[test]
    fn bound_checkbox_still_gets_binding_placeholder() {
        let leaf = LeafProps::bound(ControlKind::Checkbox, binding("Juvenile"));
        assert_eq!(leaf.placeholder.as_deref(), Some("Enter Juvenile"));
        assert!(leaf.binding.is_some());
    }

    #[test]
    fn plain_field_has_placeholder_only_for_text_controls() {
        assert_eq!(
            LeafProps::field(ControlKind::TextInput, "Email")
                .placeholder
                .as_deref(),
            Some("Enter Email")
        );
        assert_eq!(LeafProps::field(ControlKind::Checkbox, "Agree").placeholder, None);
        assert_eq!(LeafProps::field(ControlKind::Select, "State").options.len(), 2);
    }

    #[test]
    fn converting_away_from_link_clears_link_fields() {
        let mut leaf = LeafProps::text(ControlKind::Link, "Docs");
        assert_eq!(leaf.href.as_deref(), Some(DEFAULT_HREF));
        assert_eq!(leaf.link_target, Some(LinkTarget::SameTab));

        assert!(leaf.convert_to(ControlKind::Paragraph));
        assert_eq!(leaf.href, None);
        assert_eq!(leaf.link_target, None);
        assert_eq!(leaf.content.as_deref(), Some("Docs"));
    }

    #[test]
    fn converting_input_to_heading_drops_input_state() {
        let mut leaf = LeafProps::bound(ControlKind::TextInput, binding("Officer"));
        leaf.required = true;
        assert!(leaf.convert_to(ControlKind::Heading));
        assert_eq!(leaf.heading_level, Some(DEFAULT_HEADING_LEVEL));
        assert_eq!(leaf.placeholder, None);
        assert_eq!(leaf.binding, None);
        assert!(!leaf.required);
        assert_eq!(leaf.content.as_deref(), Some("Officer"));
    }

    #[test]
    fn converting_heading_to_input_restores_field_defaults() {
        let mut leaf = LeafProps::text(ControlKind::Heading, "Suspect Name");
        assert!(leaf.convert_to(ControlKind::TextInput));
        assert_eq!(leaf.heading_level, None);
        assert_eq!(leaf.content, None);
        assert_eq!(leaf.field_name, "suspectName");
        assert_eq!(leaf.placeholder.as_deref(), Some("Enter Suspect Name"));
    }

    #[test]
    fn converting_divider_to_heading_seeds_content() {
        let mut leaf = LeafProps::text(ControlKind::Divider, "");
        assert_eq!(leaf.content, None);
        assert!(leaf.convert_to(ControlKind::Heading));
        assert_eq!(leaf.content.as_deref(), Some("Divider"));
        assert_eq!(leaf.heading_level, Some(DEFAULT_HEADING_LEVEL));

        let mut leaf = LeafProps::text(ControlKind::Divider, "");
        assert!(leaf.convert_to(ControlKind::Link));
        assert_eq!(leaf.content.as_deref(), Some("Divider"));
        assert_eq!(leaf.href.as_deref(), Some(DEFAULT_HREF));
    }

    #[test]
    fn converting_between_statics_keeps_existing_content() {
        let mut leaf = LeafProps::text(ControlKind::Heading, "Intro");
        leaf.content = Some("Welcome aboard".into());
        assert!(leaf.convert_to(ControlKind::Paragraph));
        assert_eq!(leaf.content.as_deref(), Some("Welcome aboard"));
    }

    #[test]
    fn converting_to_same_kind_is_noop() {
        let mut leaf = LeafProps::field(ControlKind::Number, "Age");
        let before = leaf.clone();
        assert!(!leaf.convert_to(ControlKind::Number));
        assert_eq!(leaf, before);
    }

    #[test]
    fn node_serializes_with_kind_tag() {
        let node = Node::container(NodeId::root(), None, ContainerProps::default());
        let json = serde_json::to_value(&node).expect("serialize node");
        assert_eq!(json["kind"], "container");
        assert_eq!(json["arrangement"], "stack");
        let back: Node = serde_json::from_value(json).expect("deserialize node");
        assert_eq!(back, node);
    }
}
