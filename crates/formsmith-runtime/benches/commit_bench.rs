//! Benchmarks for commit, undo and redo on large documents.
//!
//! Run with: cargo bench -p formsmith-runtime

use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use formsmith_model::{Command, Document, LeafPatch, NodeId, NodeSpec};
use formsmith_runtime::{Designer, DesignerConfig};
use std::hint::black_box;

/// Document with `sections` containers of `fields_per_section` fields each.
fn make_document(sections: usize, fields_per_section: usize) -> Document {
    let mut doc = Document::new("Bench");
    for section in 0..sections {
        let container = doc
            .apply(&Command::AddNode {
                parent: NodeId::root(),
                index: usize::MAX,
                spec: NodeSpec::Container,
            })
            .expect("add section");
        let container_id = container.created[0].clone();
        doc = container
            .document
            .apply(&Command::AddNodesBulk {
                parent: container_id,
                index: None,
                specs: (0..fields_per_section)
                    .map(|field| NodeSpec::text_input(format!("Section {section} field {field}")))
                    .collect(),
            })
            .expect("add fields")
            .document;
    }
    doc
}

fn designer_for(doc: &Document, verify: bool) -> Designer {
    Designer::with_document(
        doc.clone(),
        DesignerConfig::default().with_verify_invariants(verify),
    )
}

fn relabel(doc: &Document) -> Command {
    let leaf = doc
        .nodes()
        .values()
        .find(|node| !node.is_container())
        .map(|node| node.id.clone())
        .expect("document has a leaf");
    Command::UpdateProperties {
        node: leaf,
        patch: LeafPatch::label("Renamed"),
    }
}

fn bench_apply(c: &mut Criterion) {
    let mut group = c.benchmark_group("document/apply");

    for nodes in [100, 1_000, 10_000] {
        let doc = make_document(nodes / 50, 49);
        let command = relabel(&doc);
        group.bench_with_input(BenchmarkId::new("relabel", nodes), &doc, |b, doc| {
            b.iter(|| black_box(doc.apply(&command)))
        });

        let first_section = doc.children(doc.root())[0].clone();
        let delete = Command::DeleteSubtree {
            node: first_section,
        };
        group.bench_with_input(BenchmarkId::new("delete_section", nodes), &doc, |b, doc| {
            b.iter(|| black_box(doc.apply(&delete)))
        });
    }

    group.finish();
}

fn bench_commit(c: &mut Criterion) {
    let mut group = c.benchmark_group("designer/commit");

    for nodes in [100, 1_000, 10_000] {
        let doc = make_document(nodes / 50, 49);
        let command = relabel(&doc);
        for verify in [false, true] {
            let label = if verify { "verified" } else { "unverified" };
            group.bench_with_input(BenchmarkId::new(label, nodes), &doc, |b, doc| {
                b.iter_batched(
                    || designer_for(doc, verify),
                    |mut designer| black_box(designer.commit(command.clone(), "Relabel")),
                    BatchSize::SmallInput,
                )
            });
        }
    }

    group.finish();
}

fn bench_undo_redo(c: &mut Criterion) {
    let mut group = c.benchmark_group("designer/undo_redo");
    let doc = make_document(200, 49);
    let command = relabel(&doc);

    for steps in [1, 50, 200] {
        group.bench_with_input(BenchmarkId::new("round_trip", steps), &steps, |b, &steps| {
            b.iter_batched(
                || {
                    let mut designer = designer_for(&doc, false);
                    for _ in 0..steps {
                        designer.commit(command.clone(), "Relabel");
                    }
                    designer
                },
                |mut designer| {
                    while designer.undo().is_some() {}
                    while designer.redo().is_some() {}
                    black_box(designer.undo_depth())
                },
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

criterion_group!(benches, bench_apply, bench_commit, bench_undo_redo);
criterion_main!(benches);
