//! Property tests for designer history.
//!
//! Random command scripts run through `Designer::commit`; the suite checks
//! that undo walks back through exactly the recorded revisions, that redo
//! replays them, and that history stacks stay paired.

use formsmith_model::{Command, ControlKind, Document, LeafPatch, NodeId, NodeSpec};
use formsmith_runtime::{Designer, DesignerConfig, HistoryConfig};
use proptest::prelude::*;

/// Abstract step resolved against the live document at run time.
#[derive(Debug, Clone)]
enum Step {
    AddField(usize),
    AddContainer(usize),
    Delete(usize),
    Move(usize, usize, usize),
    Wrap(usize),
    Unwrap(usize),
    Convert(usize, usize),
    Relabel(usize),
    Select(usize),
}

fn step_strategy() -> impl Strategy<Value = Step> {
    prop_oneof![
        3 => any::<usize>().prop_map(Step::AddField),
        1 => any::<usize>().prop_map(Step::AddContainer),
        1 => any::<usize>().prop_map(Step::Delete),
        2 => (any::<usize>(), any::<usize>(), any::<usize>())
            .prop_map(|(a, b, c)| Step::Move(a, b, c)),
        1 => any::<usize>().prop_map(Step::Wrap),
        1 => any::<usize>().prop_map(Step::Unwrap),
        1 => (any::<usize>(), any::<usize>()).prop_map(|(a, b)| Step::Convert(a, b)),
        1 => any::<usize>().prop_map(Step::Relabel),
        1 => any::<usize>().prop_map(Step::Select),
    ]
}

fn pick(ids: &[NodeId], seed: usize) -> NodeId {
    ids[seed % ids.len()].clone()
}

fn containers(doc: &Document) -> Vec<NodeId> {
    doc.nodes()
        .values()
        .filter(|n| n.is_container())
        .map(|n| n.id.clone())
        .collect()
}

fn all_ids(doc: &Document) -> Vec<NodeId> {
    doc.nodes().keys().cloned().collect()
}

/// Run one step. Returns whether it was committed.
fn run_step(designer: &mut Designer, step: &Step) -> bool {
    let doc = designer.document().clone();
    let command = match *step {
        Step::AddField(seed) => Command::AddNode {
            parent: pick(&containers(&doc), seed),
            index: seed % 4,
            spec: NodeSpec::text_input(format!("Field {seed}")),
        },
        Step::AddContainer(seed) => Command::AddNode {
            parent: pick(&containers(&doc), seed),
            index: seed % 3,
            spec: NodeSpec::Container,
        },
        Step::Delete(seed) => Command::DeleteSubtree {
            node: pick(&all_ids(&doc), seed),
        },
        Step::Move(node, parent, index) => {
            let node = pick(&all_ids(&doc), node);
            let from_parent = doc.parent_of(&node).cloned().unwrap_or_else(NodeId::root);
            Command::Move {
                node,
                from_parent,
                to_parent: pick(&containers(&doc), parent),
                to_index: index % 5,
            }
        }
        Step::Wrap(seed) => {
            let parent = pick(&containers(&doc), seed);
            let children = doc.children(&parent);
            let take = if children.is_empty() {
                0
            } else {
                1 + seed % children.len()
            };
            Command::WrapInContainer {
                nodes: children.iter().take(take).cloned().collect(),
                parent,
            }
        }
        Step::Unwrap(seed) => Command::UnwrapContainer {
            container: pick(&containers(&doc), seed),
        },
        Step::Convert(node, target) => Command::ConvertLeafKind {
            node: pick(&all_ids(&doc), node),
            target: ControlKind::ALL[target % ControlKind::ALL.len()],
        },
        Step::Relabel(seed) => Command::UpdateProperties {
            node: pick(&all_ids(&doc), seed),
            patch: LeafPatch::label(format!("Label {seed}")),
        },
        Step::Select(seed) => {
            designer.select([pick(&all_ids(&doc), seed)]);
            return false;
        }
    };
    designer.commit(command, format!("{step:?}")).is_applied()
}

fn unlimited() -> Designer {
    Designer::with_config(
        DesignerConfig::default()
            .with_history(HistoryConfig::unlimited())
            .with_verify_invariants(true),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn undo_walks_back_through_every_revision(
        steps in proptest::collection::vec(step_strategy(), 1..60),
    ) {
        let mut designer = unlimited();
        let mut revisions = vec![designer.document().clone()];
        for step in &steps {
            if run_step(&mut designer, step) {
                revisions.push(designer.document().clone());
            }
        }
        prop_assert_eq!(designer.undo_depth(), revisions.len() - 1);

        for expected in revisions.iter().rev().skip(1) {
            prop_assert!(designer.undo().is_some());
            prop_assert_eq!(designer.document(), expected);
            designer.document().validate().expect("valid after undo");
        }
        prop_assert!(designer.undo().is_none());

        for expected in revisions.iter().skip(1) {
            prop_assert!(designer.redo().is_some());
            prop_assert_eq!(designer.document(), expected);
        }
        prop_assert!(!designer.can_redo());
    }

    #[test]
    fn commit_after_undo_clears_redo(
        steps in proptest::collection::vec(step_strategy(), 1..40),
        undos in 1usize..10,
    ) {
        let mut designer = unlimited();
        for step in &steps {
            run_step(&mut designer, step);
        }
        for _ in 0..undos {
            designer.undo();
        }
        let committed = designer
            .commit(
                Command::AddNode {
                    parent: NodeId::root(),
                    index: 0,
                    spec: NodeSpec::text_input("Fresh"),
                },
                "Add Fresh",
            )
            .is_applied();
        prop_assert!(committed);
        prop_assert!(!designer.can_redo());
        let before = designer.document().clone();
        prop_assert!(designer.redo().is_none());
        prop_assert_eq!(designer.document(), &before);
    }

    #[test]
    fn history_stacks_stay_paired(
        steps in proptest::collection::vec(step_strategy(), 1..80),
        travel in proptest::collection::vec(any::<bool>(), 0..30),
        depth in 1usize..12,
    ) {
        let mut designer = Designer::with_config(
            DesignerConfig::default().with_max_depth(depth),
        );
        for step in &steps {
            run_step(&mut designer, step);
            prop_assert!(designer.history().is_lockstep());
            prop_assert!(designer.undo_depth() <= depth);
        }
        for undo in travel {
            if undo {
                designer.undo();
            } else {
                designer.redo();
            }
            prop_assert!(designer.history().is_lockstep());
            prop_assert!(designer.undo_depth() <= depth);
            prop_assert_eq!(designer.history_flags().get().can_undo, designer.can_undo());
            prop_assert_eq!(designer.history_flags().get().can_redo, designer.can_redo());
        }
    }

    #[test]
    fn live_selection_never_names_missing_nodes(
        steps in proptest::collection::vec(step_strategy(), 1..60),
        travel in proptest::collection::vec(any::<bool>(), 0..20),
    ) {
        let mut designer = unlimited();
        for step in &steps {
            run_step(&mut designer, step);
            for id in designer.interaction().selected_ids() {
                prop_assert!(designer.document().contains(id));
            }
        }
        for undo in travel {
            if undo {
                designer.undo();
            } else {
                designer.redo();
            }
            for id in designer.interaction().selected_ids() {
                prop_assert!(designer.document().contains(id));
            }
        }
    }
}
