//! Property/fuzz-style invariants for document commands.
//!
//! Random command streams are applied through the public `Document::apply`
//! API. Accepted commands must leave a structurally valid tree; refused ones
//! must leave the input untouched.

use formsmith_model::{
    Arrangement, Command, ContainerPatch, ControlKind, Document, LeafPatch, NodeId, NodeSpec,
};
use proptest::prelude::*;

#[derive(Debug, Clone)]
struct Lcg {
    state: u64,
}

impl Lcg {
    fn new(seed: u64) -> Self {
        Self {
            state: seed ^ 0x9E37_79B9_7F4A_7C15,
        }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_mul(6364136223846793005).wrapping_add(1);
        self.state
    }

    fn choose_index(&mut self, len: usize) -> usize {
        debug_assert!(len > 0);
        (self.next_u64() % len as u64) as usize
    }

    fn choose<'a, T>(&mut self, items: &'a [T]) -> &'a T {
        &items[self.choose_index(items.len())]
    }

    fn choose_bool(&mut self) -> bool {
        (self.next_u64() & 1) == 0
    }
}

fn container_ids(doc: &Document) -> Vec<NodeId> {
    doc.nodes()
        .values()
        .filter(|node| node.is_container())
        .map(|node| node.id.clone())
        .collect()
}

fn non_root_ids(doc: &Document) -> Vec<NodeId> {
    doc.nodes()
        .keys()
        .filter(|id| *id != doc.root())
        .cloned()
        .collect()
}

fn random_spec(rng: &mut Lcg, sequence: usize) -> NodeSpec {
    match rng.choose_index(3) {
        0 => NodeSpec::Container,
        1 => NodeSpec::Field {
            control: *rng.choose(&ControlKind::ALL[..6]),
            label: format!("Field {sequence}"),
            required: rng.choose_bool(),
        },
        _ => NodeSpec::Static {
            control: *rng.choose(&ControlKind::ALL[6..]),
            text: format!("Text {sequence}"),
        },
    }
}

/// Mostly-plausible command; some are deliberately invalid.
fn random_command(doc: &Document, rng: &mut Lcg, sequence: usize) -> Command {
    let containers = container_ids(doc);
    let all: Vec<NodeId> = doc.nodes().keys().cloned().collect();
    let others = non_root_ids(doc);

    let kind = if others.is_empty() {
        0
    } else {
        rng.choose_index(11)
    };
    match kind {
        0 | 1 => Command::AddNode {
            parent: rng.choose(&all).clone(),
            index: rng.choose_index(6),
            spec: random_spec(rng, sequence),
        },
        2 => Command::AddNodesBulk {
            parent: rng.choose(&containers).clone(),
            index: rng.choose_bool().then(|| rng.choose_index(4)),
            specs: (0..=rng.choose_index(3))
                .map(|offset| random_spec(rng, sequence * 10 + offset))
                .collect(),
        },
        3 => Command::DeleteSubtree {
            node: rng.choose(&all).clone(),
        },
        4 => Command::DeleteMany {
            nodes: (0..=rng.choose_index(3))
                .map(|_| rng.choose(&all).clone())
                .collect(),
        },
        5 => {
            let node = rng.choose(&others).clone();
            let from_parent = doc.parent_of(&node).cloned().unwrap_or_else(NodeId::root);
            Command::Move {
                node,
                from_parent,
                to_parent: rng.choose(&all).clone(),
                to_index: rng.choose_index(5),
            }
        }
        6 => {
            let parent = rng.choose(&containers).clone();
            let len = doc.children(&parent).len().max(1);
            let from_index = rng.choose_index(len);
            Command::Reorder {
                node: doc
                    .children(&parent)
                    .get(from_index)
                    .cloned()
                    .unwrap_or_else(NodeId::root),
                parent,
                from_index,
                to_index: rng.choose_index(len + 1),
            }
        }
        7 => {
            let parent = rng.choose(&containers).clone();
            let siblings = doc.children(&parent).to_vec();
            let mut nodes: Vec<NodeId> = siblings
                .into_iter()
                .filter(|_| rng.choose_bool())
                .collect();
            if rng.choose_index(8) == 0 {
                nodes.push(rng.choose(&others).clone());
            }
            Command::WrapInContainer { nodes, parent }
        }
        8 => Command::UnwrapContainer {
            container: rng.choose(&containers).clone(),
        },
        9 => Command::ConvertLeafKind {
            node: rng.choose(&others).clone(),
            target: *rng.choose(&ControlKind::ALL),
        },
        _ => {
            let node = rng.choose(&others).clone();
            if rng.choose_bool() {
                Command::UpdateProperties {
                    node,
                    patch: LeafPatch::label(format!("Edited {sequence}")),
                }
            } else {
                Command::UpdateAppearance {
                    node,
                    patch: ContainerPatch {
                        arrangement: Some(Arrangement::Grid),
                        ..ContainerPatch::default()
                    },
                }
            }
        }
    }
}

fn assert_document_invariants(doc: &Document) {
    doc.validate()
        .expect("document should remain structurally valid");
    let report = doc.invariant_report();
    assert!(
        !report.has_errors(),
        "invariant report contains errors: {:?}",
        report.issues
    );
}

fn run_sequence(seed: u64, steps: usize) -> (Document, Vec<Command>) {
    let mut doc = Document::new("Fuzz");
    let mut rng = Lcg::new(seed);
    let mut accepted = Vec::with_capacity(steps);

    for step in 0..steps {
        let command = random_command(&doc, &mut rng, step);
        let before_hash = doc.state_hash();
        match doc.apply(&command) {
            Ok(applied) => {
                assert_document_invariants(&applied.document);
                for id in &applied.created {
                    assert!(applied.document.contains(id), "created {id} missing");
                }
                for id in &applied.removed {
                    assert!(!applied.document.contains(id), "removed {id} still present");
                }
                doc = applied.document;
                accepted.push(command);
            }
            Err(_) => {
                assert_eq!(
                    doc.state_hash(),
                    before_hash,
                    "refused command mutated the input at step {step}, seed={seed}"
                );
            }
        }
    }

    (doc, accepted)
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn random_command_sequences_preserve_invariants(
        seed in any::<u64>(),
        steps in 20usize..150,
    ) {
        let (doc, _) = run_sequence(seed, steps);
        assert_document_invariants(&doc);
    }

    #[test]
    fn accepted_commands_replay_deterministically(
        seed in any::<u64>(),
        steps in 20usize..80,
    ) {
        let (final_doc, commands) = run_sequence(seed, steps);

        let mut replay = Document::new("Fuzz");
        for command in &commands {
            replay = replay.apply(command).expect("replayed command should apply").document;
        }

        prop_assert_eq!(replay.state_hash(), final_doc.state_hash());
        prop_assert_eq!(replay.to_snapshot(), final_doc.to_snapshot());
    }

    #[test]
    fn deleting_a_container_removes_exactly_its_subtree(
        seed in any::<u64>(),
        steps in 10usize..60,
    ) {
        let (doc, _) = run_sequence(seed, steps);
        for container in container_ids(&doc) {
            if &container == doc.root() {
                continue;
            }
            let descendants = doc.subtree_ids(&container).len() - 1;
            let parent = doc.parent_of(&container).cloned().expect("non-root has parent");
            let applied = doc
                .apply(&Command::DeleteSubtree { node: container.clone() })
                .expect("delete container");
            prop_assert_eq!(applied.document.len(), doc.len() - (descendants + 1));
            prop_assert!(!applied.document.children(&parent).contains(&container));
        }
    }

    #[test]
    fn wrap_then_unwrap_sibling_run_restores_parent_children(
        seed in any::<u64>(),
        steps in 10usize..60,
    ) {
        let (doc, _) = run_sequence(seed, steps);
        let mut rng = Lcg::new(seed.rotate_left(17));
        for parent in container_ids(&doc) {
            let children = doc.children(&parent).to_vec();
            if children.is_empty() {
                continue;
            }
            // Contiguous run; listing order must not matter.
            let start = rng.choose_index(children.len());
            let run_len = 1 + rng.choose_index(children.len() - start);
            let mut picked = children[start..start + run_len].to_vec();
            if rng.choose_bool() {
                picked.reverse();
            }
            let wrapped = doc
                .apply(&Command::WrapInContainer { nodes: picked, parent: parent.clone() })
                .expect("wrap siblings");
            let container = wrapped.created[0].clone();
            let unwrapped = wrapped
                .document
                .apply(&Command::UnwrapContainer { container })
                .expect("unwrap new container");
            prop_assert_eq!(unwrapped.document.children(&parent), children.as_slice());
        }
    }
}

#[test]
fn fuzz_seed_corpus_preserves_invariants() {
    let seeds = [
        0_u64,
        1,
        2,
        3,
        5,
        8,
        13,
        21,
        34,
        55,
        89,
        144,
        u32::MAX as u64,
        (u32::MAX as u64) + 1,
        u64::MAX - 1,
        u64::MAX,
    ];

    for seed in seeds {
        let (doc, commands) = run_sequence(seed, 200);
        assert_document_invariants(&doc);
        assert!(!commands.is_empty(), "seed {seed} accepted no commands");
    }
}

#[test]
fn untouched_nodes_are_shared_between_revisions() {
    let doc = Document::new("Share");
    let doc = doc
        .apply(&Command::AddNodesBulk {
            parent: NodeId::root(),
            index: None,
            specs: vec![NodeSpec::text_input("A"), NodeSpec::text_input("B")],
        })
        .expect("bulk add")
        .document;
    let next = doc
        .apply(&Command::UpdateProperties {
            node: NodeId::new("n1"),
            patch: LeafPatch::label("A2"),
        })
        .expect("edit")
        .document;
    assert!(next.node_changed(&doc, &NodeId::new("n1")));
    assert!(!next.node_changed(&doc, &NodeId::new("n2")));
    assert!(!next.node_changed(&doc, &NodeId::root()));
}
