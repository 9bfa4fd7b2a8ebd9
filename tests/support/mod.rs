//! Shared Sprinkler-style fixture (A, B, C, D, E) used across the
//! integration test suite, per the scenarios in the crate's scope
//! (Factor/Bag/JunctionTree cross-validation).
//!
//! A -> B -> C -> D, C -> E.

use bayes_infer::bn::CategoricalBayesianNetwork;
use bayes_infer::factor::Factor;
use bayes_infer::graphs::{DiGraph, Graph};
use bayes_infer::types::{FxIndexMap, States};

fn states(pairs: &[(&str, &[&str])]) -> States {
    let mut s = States::default();
    for &(v, domain) in pairs {
        s.insert(v.to_owned(), domain.iter().map(|s| s.to_string()).collect());
    }
    s
}

/// P(A).
pub fn cpt_a() -> Factor {
    Factor::construct([0.6, 0.4], states(&[("A", &["a1", "a0"])])).unwrap()
}

/// P(B|A).
pub fn cpt_b() -> Factor {
    Factor::construct(
        [0.2, 0.8, 0.75, 0.25],
        states(&[("A", &["a1", "a0"]), ("B", &["b1", "b0"])]),
    )
    .unwrap()
}

/// P(C|B).
pub fn cpt_c() -> Factor {
    Factor::construct(
        [0.7, 0.3, 0.1, 0.9],
        states(&[("B", &["b1", "b0"]), ("C", &["c1", "c0"])]),
    )
    .unwrap()
}

/// P(D|C).
pub fn cpt_d() -> Factor {
    Factor::construct(
        [0.9, 0.1, 0.2, 0.8],
        states(&[("C", &["c1", "c0"]), ("D", &["d1", "d0"])]),
    )
    .unwrap()
}

/// P(E|C).
pub fn cpt_e() -> Factor {
    Factor::construct(
        [0.6, 0.4, 0.3, 0.7],
        states(&[("C", &["c1", "c0"]), ("E", &["e1", "e0"])]),
    )
    .unwrap()
}

/// All five CPTs, keyed by variable.
pub fn cpts() -> FxIndexMap<String, Factor> {
    let mut cpts = FxIndexMap::default();
    cpts.insert("A".to_owned(), cpt_a());
    cpts.insert("B".to_owned(), cpt_b());
    cpts.insert("C".to_owned(), cpt_c());
    cpts.insert("D".to_owned(), cpt_d());
    cpts.insert("E".to_owned(), cpt_e());
    cpts
}

/// The network: A -> B -> C -> D, C -> E.
pub fn network() -> CategoricalBayesianNetwork {
    let mut graph = DiGraph::empty(["A", "B", "C", "D", "E"]);
    let a = graph.label_to_index(&"A");
    let b = graph.label_to_index(&"B");
    let c = graph.label_to_index(&"C");
    let d = graph.label_to_index(&"D");
    let e = graph.label_to_index(&"E");
    graph.add_edge(a, b);
    graph.add_edge(b, c);
    graph.add_edge(c, d);
    graph.add_edge(c, e);

    CategoricalBayesianNetwork::new(graph, cpts())
}
