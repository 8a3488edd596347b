use criterion::{black_box, criterion_group, criterion_main, Criterion};
use mimizuku_core::{Assertion, Concept, Iri, Role};
use mimizuku_tableau::TableauEngine;

fn role(name: &str) -> Role {
    Role::Object(Iri::new(name))
}

/// A chain of individuals with conjunctive and universal obligations,
/// fully deterministic.
fn deterministic_assertions(size: usize) -> Vec<Assertion> {
    let mut assertions = Vec::new();
    for i in 0..size {
        let this = format!("http://example.org/ind{i}");
        assertions.push(Assertion::instance(
            this.clone(),
            Concept::And(vec![
                Concept::named(format!("Class{i}")),
                Concept::all(role("next"), Concept::named(format!("Class{}", i + 1))),
            ]),
        ));
        if i + 1 < size {
            let next = format!("http://example.org/ind{}", i + 1);
            assertions.push(Assertion::related(this, role("next"), next));
        }
    }
    assertions
}

/// One disjunctive obligation per individual, each contradicted on one
/// side so the engine resolves them without exhausting alternatives.
fn branching_assertions(size: usize) -> Vec<Assertion> {
    let mut assertions = Vec::new();
    for i in 0..size {
        let this = format!("http://example.org/ind{i}");
        assertions.push(Assertion::instance(
            this.clone(),
            Concept::Or(vec![
                Concept::named(format!("Left{i}")),
                Concept::named(format!("Right{i}")),
            ]),
        ));
        assertions.push(Assertion::instance(
            this,
            Concept::not(Concept::named(format!("Left{i}"))),
        ));
    }
    assertions
}

fn bench_deterministic_expansion(c: &mut Criterion) {
    let assertions = deterministic_assertions(100);
    c.bench_function("consistency_deterministic_100", |b| {
        b.iter(|| {
            let mut engine = TableauEngine::new();
            engine.load_assertions(black_box(&assertions)).unwrap();
            black_box(engine.is_consistent().unwrap())
        })
    });
}

fn bench_disjunction_resolution(c: &mut Criterion) {
    let assertions = branching_assertions(100);
    c.bench_function("consistency_disjunctions_100", |b| {
        b.iter(|| {
            let mut engine = TableauEngine::new();
            engine.load_assertions(black_box(&assertions)).unwrap();
            black_box(engine.is_consistent().unwrap())
        })
    });
}

fn bench_blocking_cycle(c: &mut Criterion) {
    use mimizuku_rete::{Pattern, ProductionSpec};

    // every A-individual demands an A-successor; infinite without blocking
    let expand = ProductionSpec::new(
        "expand",
        vec![Pattern::Type {
            arg: Pattern::var("x"),
            concept: Concept::named("A"),
        }],
        vec![Pattern::Type {
            arg: Pattern::var("x"),
            concept: Concept::some(role("r"), Concept::named("A")),
        }],
    );
    let assertions = vec![Assertion::instance(
        "http://example.org/root",
        Concept::named("A"),
    )];
    c.bench_function("consistency_blocked_cycle", |b| {
        b.iter(|| {
            let mut engine = TableauEngine::new();
            engine.add_production(expand.clone()).unwrap();
            engine.load_assertions(black_box(&assertions)).unwrap();
            black_box(engine.is_consistent().unwrap())
        })
    });
}

criterion_group!(
    benches,
    bench_deterministic_expansion,
    bench_disjunction_resolution,
    bench_blocking_cycle
);
criterion_main!(benches);
