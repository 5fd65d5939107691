#![no_main]

use arbitrary::Arbitrary;
use formsmith_model::{Command, ControlKind, Document, LeafPatch, NodeId, NodeSpec};
use formsmith_runtime::{Designer, DesignerConfig, HistoryConfig};
use libfuzzer_sys::fuzz_target;

#[derive(Debug, Arbitrary)]
enum Op {
    AddField { parent: u8, index: u8 },
    AddContainer { parent: u8, index: u8 },
    Delete { node: u8 },
    DeleteMany { nodes: Vec<u8> },
    Move { node: u8, to_parent: u8, to_index: u8 },
    Reorder { parent: u8, from: u8, to: u8 },
    Wrap { parent: u8, mask: u16 },
    Unwrap { container: u8 },
    Convert { node: u8, target: u8 },
    Relabel { node: u8 },
    Duplicate { node: u8 },
    Select { node: u8 },
    Undo,
    Redo,
}

fn nth(ids: &[NodeId], raw: u8) -> NodeId {
    ids[raw as usize % ids.len()].clone()
}

fn resolve(doc: &Document, op: &Op) -> Option<Command> {
    let all: Vec<NodeId> = doc.nodes().keys().cloned().collect();
    let containers: Vec<NodeId> = doc
        .nodes()
        .values()
        .filter(|n| n.is_container())
        .map(|n| n.id.clone())
        .collect();
    let command = match *op {
        Op::AddField { parent, index } => Command::AddNode {
            parent: nth(&all, parent),
            index: index as usize,
            spec: NodeSpec::text_input(format!("F{index}")),
        },
        Op::AddContainer { parent, index } => Command::AddNode {
            parent: nth(&containers, parent),
            index: index as usize,
            spec: NodeSpec::Container,
        },
        Op::Delete { node } => Command::DeleteSubtree { node: nth(&all, node) },
        Op::DeleteMany { ref nodes } => Command::DeleteMany {
            nodes: nodes.iter().map(|raw| nth(&all, *raw)).collect(),
        },
        Op::Move { node, to_parent, to_index } => {
            let node = nth(&all, node);
            let from_parent = doc.parent_of(&node).cloned().unwrap_or_else(NodeId::root);
            Command::Move {
                node,
                from_parent,
                to_parent: nth(&all, to_parent),
                to_index: to_index as usize,
            }
        }
        Op::Reorder { parent, from, to } => {
            let parent = nth(&containers, parent);
            let children = doc.children(&parent);
            let node = children.get(from as usize).cloned().unwrap_or_else(NodeId::root);
            Command::Reorder {
                node,
                parent,
                from_index: from as usize,
                to_index: to as usize,
            }
        }
        Op::Wrap { parent, mask } => {
            let parent = nth(&containers, parent);
            let nodes = doc
                .children(&parent)
                .iter()
                .enumerate()
                .filter(|(i, _)| *i < 16 && mask & (1 << i) != 0)
                .map(|(_, id)| id.clone())
                .collect();
            Command::WrapInContainer { nodes, parent }
        }
        Op::Unwrap { container } => Command::UnwrapContainer {
            container: nth(&all, container),
        },
        Op::Convert { node, target } => Command::ConvertLeafKind {
            node: nth(&all, node),
            target: ControlKind::ALL[target as usize % ControlKind::ALL.len()],
        },
        Op::Relabel { node } => Command::UpdateProperties {
            node: nth(&all, node),
            patch: LeafPatch::label(format!("L{node}")),
        },
        Op::Duplicate { node } => Command::DuplicateSubtree { node: nth(&all, node) },
        Op::Select { .. } | Op::Undo | Op::Redo => return None,
    };
    Some(command)
}

fuzz_target!(|ops: Vec<Op>| {
    let mut designer = Designer::with_config(
        DesignerConfig::default()
            .with_history(HistoryConfig::new(32))
            .with_verify_invariants(true),
    );

    for op in ops.iter().take(256) {
        match op {
            Op::Undo => {
                designer.undo();
            }
            Op::Redo => {
                designer.redo();
            }
            Op::Select { node } => {
                let all: Vec<NodeId> = designer.nodes().keys().cloned().collect();
                designer.toggle_selection(nth(&all, *node));
            }
            _ => {
                let before = designer.document().state_hash();
                let depth = designer.undo_depth();
                if let Some(command) = resolve(designer.document(), op) {
                    if !designer.commit(command, "fuzz").is_applied() {
                        assert_eq!(designer.document().state_hash(), before, "rejection mutated");
                        assert_eq!(designer.undo_depth(), depth, "rejection recorded");
                    }
                }
            }
        }

        // Post-conditions that must always hold:
        let report = designer.document().invariant_report();
        assert!(!report.has_errors(), "invariants broken: {:?}", report.issues);
        assert!(designer.history().is_lockstep(), "history stacks unpaired");
        for id in designer.interaction().selected_ids() {
            assert!(designer.document().contains(id), "selection names missing node");
        }
    }
});
