use agent_conform::core::{assets, batch};
use agent_conform::{Document, RuleSet, validate};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

const REFERENCE: &str = include_str!("../tests/fixtures/agents/api-contract-agent.md");

fn padded_document(extra_sections: usize) -> Document {
    let mut text = REFERENCE.to_string();
    for i in 0..extra_sections {
        text.push_str(&format!(
            "\n## Appendix {i}\n\nNotes for appendix {i}.\n\n```json\n{{\"step\": {i}}}\n```\n"
        ));
    }
    Document::new("api-contract-agent", text)
}

fn bench_single_document(c: &mut Criterion) {
    let rules = RuleSet::from_toml_str(assets::EMBEDDED_AGENT_STANDARDS).unwrap();
    let mut group = c.benchmark_group("validate_single");

    for extra in [0usize, 50, 500] {
        let doc = padded_document(extra);
        group.bench_with_input(BenchmarkId::from_parameter(extra), &doc, |b, doc| {
            b.iter(|| black_box(validate(doc, &rules).unwrap()));
        });
    }
    group.finish();
}

fn bench_batch(c: &mut Criterion) {
    let rules = RuleSet::from_toml_str(assets::EMBEDDED_AGENT_STANDARDS).unwrap();
    let mut group = c.benchmark_group("validate_batch");

    for count in [10usize, 200] {
        let docs: Vec<_> = (0..count)
            .map(|i| Document::new(format!("agent-{i}"), REFERENCE))
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(count), &docs, |b, docs| {
            b.iter(|| black_box(batch::validate_all(docs, &rules).unwrap()));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_single_document, bench_batch);
criterion_main!(benches);
