// Integration tests for Mimizuku components
// These tests verify end-to-end behavior across the data model, the
// completion engine and the rule-matching network.

use mimizuku_core::{Assertion, Concept, DataRange, Facet, Iri, Literal, ReasonerError, Role};
use mimizuku_rete::{Fact, Pattern, ProductionSpec};
use mimizuku_tableau::TableauEngine;
use std::time::Duration;

const X: &str = "http://example.org/x";
const Y: &str = "http://example.org/y";
const Z: &str = "http://example.org/z";

fn object(name: &str) -> Role {
    Role::Object(Iri::new(name))
}

fn a_or_b() -> Concept {
    Concept::Or(vec![Concept::named("A"), Concept::named("B")])
}

#[test]
fn test_contradicted_disjunct_resolves_without_branching() {
    let mut engine = TableauEngine::new();
    engine
        .load_assertions(&[
            Assertion::instance(X, a_or_b()),
            Assertion::instance(X, Concept::not(Concept::named("A"))),
        ])
        .unwrap();

    assert!(engine.is_consistent().unwrap());
    // A was already contradicted: B is asserted directly, no choice point
    assert!(engine.branch_trace().is_empty());
    let types = engine.types_of(&Iri::new(X)).unwrap();
    assert!(types.contains(&&Concept::named("B")));
    assert!(!types.contains(&&Concept::named("A")));
}

#[test]
fn test_unconstrained_disjunction_opens_one_branch() {
    let mut engine = TableauEngine::new();
    engine
        .load_assertions(&[Assertion::instance(X, a_or_b())])
        .unwrap();

    assert!(engine.is_consistent().unwrap());
    // exactly one branch, satisfied by its first alternative
    assert_eq!(engine.branch_trace().len(), 1);
    assert_eq!(engine.branch_trace()[0].2, 0);
    let types = engine.types_of(&Iri::new(X)).unwrap();
    assert!(types.contains(&&Concept::named("A")));
    assert!(!types.contains(&&Concept::named("B")));
}

#[test]
fn test_direct_contradiction_is_an_unconditional_clash() {
    let mut engine = TableauEngine::new();
    engine
        .load_assertions(&[
            Assertion::instance(X, Concept::named("A")),
            Assertion::instance(X, Concept::not(Concept::named("A"))),
        ])
        .unwrap();

    assert!(!engine.is_consistent().unwrap());
    assert!(engine.branch_trace().is_empty());
    let justification = engine.explain().unwrap();
    assert!(justification.is_independent());
}

#[test]
fn test_blocking_terminates_a_cyclic_expansion() {
    let mut engine = TableauEngine::new();
    // A(?x) → ?x : ∃r.A, an infinite chain without blocking
    engine
        .add_production(ProductionSpec::new(
            "expand",
            vec![Pattern::Type {
                arg: Pattern::var("x"),
                concept: Concept::named("A"),
            }],
            vec![Pattern::Type {
                arg: Pattern::var("x"),
                concept: Concept::some(object("r"), Concept::named("A")),
            }],
        ))
        .unwrap();
    engine
        .load_assertions(&[Assertion::instance(X, Concept::named("A"))])
        .unwrap();

    assert!(engine.is_consistent().unwrap());
    // one fresh successor, then its expansion is suspended: its type
    // set is a subset of its creator's
    assert_eq!(engine.graph().len(), 2);
}

#[test]
fn test_backtracking_retracts_the_failed_alternative() {
    let mut engine = TableauEngine::new();
    // trying A dead-ends, the branch must recover with B
    engine
        .add_production(ProductionSpec::new(
            "a-is-impossible",
            vec![Pattern::Type {
                arg: Pattern::var("x"),
                concept: Concept::named("A"),
            }],
            vec![Pattern::Type {
                arg: Pattern::var("x"),
                concept: Concept::Nothing,
            }],
        ))
        .unwrap();
    engine
        .load_assertions(&[Assertion::instance(X, a_or_b())])
        .unwrap();

    assert!(engine.is_consistent().unwrap());
    assert_eq!(engine.branch_trace(), &[
        (1, engine.graph().named_node(&Iri::new(X)).unwrap(), 0),
        (1, engine.graph().named_node(&Iri::new(X)).unwrap(), 1),
    ]);

    // no surviving fact mentions the retracted alternative
    let types = engine.types_of(&Iri::new(X)).unwrap();
    assert!(types.contains(&&Concept::named("B")));
    assert!(!types.contains(&&Concept::named("A")));

    // and the network dropped every token that joined the retracted fact
    for token in engine.network().tokens() {
        for wme in token.wmes() {
            assert_ne!(
                wme.fact,
                Fact::Type {
                    node: engine.graph().named_node(&Iri::new(X)).unwrap(),
                    concept: Concept::named("A"),
                }
            );
        }
    }
}

#[test]
fn test_exhausted_branch_propagates_to_inconsistency() {
    let mut engine = TableauEngine::new();
    for (name, concept) in [("no-a", "A"), ("no-b", "B")] {
        engine
            .add_production(ProductionSpec::new(
                name,
                vec![Pattern::Type {
                    arg: Pattern::var("x"),
                    concept: Concept::named(concept),
                }],
                vec![Pattern::Type {
                    arg: Pattern::var("x"),
                    concept: Concept::Nothing,
                }],
            ))
            .unwrap();
    }
    engine
        .load_assertions(&[Assertion::instance(X, a_or_b())])
        .unwrap();

    assert!(!engine.is_consistent().unwrap());
    // both alternatives were tried before giving up
    assert_eq!(engine.branch_trace().len(), 2);
    assert!(engine.explain().unwrap().is_independent());
}

#[test]
fn test_at_most_merges_successors() {
    let mut engine = TableauEngine::new();
    engine
        .load_assertions(&[
            Assertion::related(X, object("r"), Y),
            Assertion::related(X, object("r"), Z),
            Assertion::instance(Y, Concept::named("A")),
            Assertion::instance(Z, Concept::named("B")),
            Assertion::instance(
                X,
                Concept::AtMost {
                    n: 1,
                    role: object("r"),
                    filler: None,
                },
            ),
        ])
        .unwrap();

    assert!(engine.is_consistent().unwrap());
    // y and z were merged: the representative carries both type sets
    let types = engine.types_of(&Iri::new(Y)).unwrap();
    assert!(types.contains(&&Concept::named("A")));
    assert!(types.contains(&&Concept::named("B")));
    assert_eq!(engine.types_of(&Iri::new(Z)), engine.types_of(&Iri::new(Y)));
}

#[test]
fn test_at_most_with_distinct_successors_is_inconsistent() {
    let mut engine = TableauEngine::new();
    engine
        .load_assertions(&[
            Assertion::related(X, object("r"), Y),
            Assertion::related(X, object("r"), Z),
            Assertion::DifferentFrom {
                first: Iri::new(Y),
                second: Iri::new(Z),
            },
            Assertion::instance(
                X,
                Concept::AtMost {
                    n: 1,
                    role: object("r"),
                    filler: None,
                },
            ),
        ])
        .unwrap();

    assert!(!engine.is_consistent().unwrap());
}

#[test]
fn test_cardinality_bounds_clash() {
    let mut engine = TableauEngine::new();
    engine
        .load_assertions(&[
            Assertion::instance(
                X,
                Concept::AtLeast {
                    n: 2,
                    role: object("r"),
                    filler: None,
                },
            ),
            Assertion::instance(
                X,
                Concept::AtMost {
                    n: 1,
                    role: object("r"),
                    filler: None,
                },
            ),
        ])
        .unwrap();

    assert!(!engine.is_consistent().unwrap());
}

#[test]
fn test_same_and_different_individuals_clash_at_load() {
    let mut engine = TableauEngine::new();
    engine
        .load_assertions(&[
            Assertion::SameAs {
                first: Iri::new(X),
                second: Iri::new(Y),
            },
            Assertion::DifferentFrom {
                first: Iri::new(X),
                second: Iri::new(Y),
            },
        ])
        .unwrap();

    assert!(!engine.is_consistent().unwrap());
    assert!(engine.explain().unwrap().is_independent());
}

#[test]
fn test_nominal_merges_into_the_named_individual() {
    let mut engine = TableauEngine::new();
    engine
        .load_assertions(&[
            Assertion::instance(Y, Concept::named("A")),
            Assertion::instance(X, Concept::OneOf(vec![Iri::new(Y)])),
        ])
        .unwrap();

    assert!(engine.is_consistent().unwrap());
    // x is now y
    let types = engine.types_of(&Iri::new(X)).unwrap();
    assert!(types.contains(&&Concept::named("A")));
}

#[test]
fn test_value_space_violation_is_inconsistent() {
    let age = Role::Data(Iri::new("http://example.org/age"));
    let decimal = "http://www.w3.org/2001/XMLSchema#decimal";
    let at_least_ten = Concept::ValueSpace(
        DataRange::new(decimal).with_facet(Facet::MinInclusive, Literal::new("10", decimal)),
    );

    let mut engine = TableauEngine::new();
    engine
        .load_assertions(&[
            Assertion::ValueRelated {
                subject: Iri::new(X),
                role: age.clone(),
                value: Literal::new("5", decimal),
            },
            Assertion::instance(X, Concept::all(age.clone(), at_least_ten.clone())),
        ])
        .unwrap();
    assert!(!engine.is_consistent().unwrap());

    // the same restriction is satisfied by a large enough value
    let mut engine = TableauEngine::new();
    engine
        .load_assertions(&[
            Assertion::ValueRelated {
                subject: Iri::new(X),
                role: age.clone(),
                value: Literal::new("42", decimal),
            },
            Assertion::instance(X, Concept::all(age, at_least_ten)),
        ])
        .unwrap();
    assert!(engine.is_consistent().unwrap());
}

#[test]
fn test_invalid_facet_is_rejected_without_mutation() {
    let decimal = "http://www.w3.org/2001/XMLSchema#decimal";
    let broken = Concept::ValueSpace(
        DataRange::new(decimal).with_facet(Facet::MinInclusive, Literal::new("not-a-number", decimal)),
    );

    let mut engine = TableauEngine::new();
    let err = engine
        .load_assertions(&[
            Assertion::instance(X, Concept::named("A")),
            Assertion::instance(X, broken),
        ])
        .unwrap_err();
    assert!(matches!(err, ReasonerError::InvalidInput(_)));
    // validation failed as a whole: nothing was asserted
    assert!(engine.graph().is_empty());
}

#[test]
fn test_qualified_at_most_is_rejected() {
    let mut engine = TableauEngine::new();
    let err = engine
        .load_assertions(&[Assertion::instance(
            X,
            Concept::AtMost {
                n: 1,
                role: object("r"),
                filler: Some(Box::new(Concept::named("A"))),
            },
        )])
        .unwrap_err();
    assert!(matches!(err, ReasonerError::InvalidInput(_)));
}

#[test]
fn test_instance_checks_run_on_a_scratch_model() {
    let mut engine = TableauEngine::new();
    engine
        .load_assertions(&[Assertion::instance(X, Concept::named("A"))])
        .unwrap();

    assert!(!engine
        .check(&Iri::new(X), &Concept::not(Concept::named("A")))
        .unwrap());
    assert!(engine.check(&Iri::new(X), &Concept::named("B")).unwrap());

    // the primary model is untouched by either check
    assert!(engine.is_consistent().unwrap());
    let types = engine.types_of(&Iri::new(X)).unwrap();
    assert!(!types.contains(&&Concept::named("B")));
}

#[test]
fn test_repeated_runs_are_deterministic() {
    let assertions = vec![
        Assertion::instance(X, a_or_b()),
        Assertion::instance(
            X,
            Concept::Or(vec![Concept::named("C"), Concept::named("D")]),
        ),
        Assertion::related(X, object("r"), Y),
        Assertion::instance(
            Y,
            Concept::Or(vec![
                Concept::not(Concept::named("A")),
                Concept::named("E"),
            ]),
        ),
    ];

    let run = |assertions: &[Assertion]| {
        let mut engine = TableauEngine::new();
        engine.load_assertions(assertions).unwrap();
        let verdict = engine.is_consistent().unwrap();
        (verdict, engine.branch_trace().to_vec())
    };

    let (first_verdict, first_trace) = run(&assertions);
    let (second_verdict, second_trace) = run(&assertions);
    assert_eq!(first_verdict, second_verdict);
    assert_eq!(first_trace, second_trace);
}

#[test]
fn test_timeout_surfaces_as_an_error_not_a_verdict() {
    let mut engine = TableauEngine::new();
    engine
        .load_assertions(&[Assertion::instance(X, a_or_b())])
        .unwrap();
    engine.set_timeout(Duration::ZERO);

    match engine.is_consistent() {
        Err(ReasonerError::Timeout(_)) => {}
        other => panic!("expected a timeout, got {other:?}"),
    }
}

#[test]
fn test_interrupt_aborts_the_check() {
    let mut engine = TableauEngine::new();
    engine
        .load_assertions(&[Assertion::instance(X, a_or_b())])
        .unwrap();
    engine.interrupt_handle().interrupt();

    match engine.is_consistent() {
        Err(ReasonerError::Interrupted) => {}
        other => panic!("expected an interrupt, got {other:?}"),
    }
}

#[test]
fn test_assertions_after_first_dispatch_are_rejected() {
    let mut engine = TableauEngine::new();
    engine
        .load_assertions(&[Assertion::instance(X, Concept::named("A"))])
        .unwrap();
    assert!(engine.is_consistent().unwrap());

    let err = engine
        .load_assertions(&[Assertion::instance(Y, Concept::named("B"))])
        .unwrap_err();
    assert!(matches!(err, ReasonerError::InvalidInput(_)));
}

#[test]
fn test_rule_conclusions_feed_the_tableau() {
    let mut engine = TableauEngine::new();
    // Person(?x) ∧ hasParent(?x, ?y) → Parent(?y)
    engine
        .add_production(ProductionSpec::new(
            "parent",
            vec![
                Pattern::Type {
                    arg: Pattern::var("x"),
                    concept: Concept::named("Person"),
                },
                Pattern::Edge {
                    subject: Pattern::var("x"),
                    role: object("hasParent"),
                    object: Pattern::var("y"),
                },
            ],
            vec![Pattern::Type {
                arg: Pattern::var("y"),
                concept: Concept::named("Parent"),
            }],
        ))
        .unwrap();
    engine
        .load_assertions(&[
            Assertion::instance(X, Concept::named("Person")),
            Assertion::related(X, object("hasParent"), Y),
            Assertion::instance(Y, Concept::not(Concept::named("Parent"))),
        ])
        .unwrap();

    // the derived Parent(y) contradicts ¬Parent(y)
    assert!(!engine.is_consistent().unwrap());
}
