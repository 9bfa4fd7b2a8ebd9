//! Factor algebra: multiplication laws, marginalization/project duality,
//! and the evidence/shape error scenarios from the crate's testable
//! properties.

mod support;

use bayes_infer::factor::{Factor, Indexed};
use bayes_infer::types::{Error, FxIndexMap, States};

fn at(f: &Factor, assignment: &[(&str, &str)]) -> f64 {
    match f.index(assignment).unwrap() {
        Indexed::Scalar(v) => v,
        Indexed::Factor(_) => panic!("expected a fully-resolved scalar"),
    }
}

#[test]
fn joint_matches_known_values() {
    let joint = support::cpt_a().multiply(&support::cpt_b()).unwrap();

    assert!((at(&joint, &[("A", "a1"), ("B", "b1")]) - 0.12).abs() < 1e-9);
    assert!((at(&joint, &[("A", "a1"), ("B", "b0")]) - 0.48).abs() < 1e-9);
    assert!((at(&joint, &[("A", "a0"), ("B", "b1")]) - 0.30).abs() < 1e-9);
    assert!((at(&joint, &[("A", "a0"), ("B", "b0")]) - 0.10).abs() < 1e-9);
    assert!((joint.data().sum() - 1.0).abs() < 1e-9);
}

#[test]
fn marginalizing_a_gives_marginal_of_b() {
    let joint = support::cpt_a().multiply(&support::cpt_b()).unwrap();
    let b = joint.sum_out(["A"]).unwrap();

    assert!((at(&b, &[("B", "b1")]) - 0.42).abs() < 1e-9);
    assert!((at(&b, &[("B", "b0")]) - 0.58).abs() < 1e-9);
}

#[test]
fn three_variable_project_matches_marginalization() {
    let b = support::cpt_a().multiply(&support::cpt_b()).unwrap().sum_out(["A"]).unwrap();
    let bc = b.multiply(&support::cpt_c()).unwrap();

    let c_via_project = bc.project(&["C"]).unwrap();
    let c_via_sum_out = bc.sum_out(["B"]).unwrap();
    assert!(c_via_project.equals(&c_via_sum_out));

    assert!((at(&c_via_project, &[("C", "c1")]) - 0.352).abs() < 1e-9);
    assert!((at(&c_via_project, &[("C", "c0")]) - 0.648).abs() < 1e-9);
}

#[test]
fn multiplication_is_commutative_and_associative_up_to_reorder() {
    let a = support::cpt_a();
    let b = support::cpt_b();
    let c = support::cpt_c();

    let lhs = a.multiply(&b).unwrap();
    let rhs = b.multiply(&a).unwrap().reorder_scope(&lhs.scope().collect::<Vec<_>>()).unwrap();
    assert!(lhs.equals(&rhs));

    let ab_c = a.multiply(&b).unwrap().multiply(&c).unwrap();
    let a_bc = a.multiply(&b.multiply(&c).unwrap()).unwrap();
    let a_bc = a_bc.reorder_scope(&ab_c.scope().collect::<Vec<_>>()).unwrap();
    assert!(ab_c.equals(&a_bc));
}

#[test]
fn divide_undoes_multiply_for_positive_denominators() {
    let b = support::cpt_a().multiply(&support::cpt_b()).unwrap().sum_out(["A"]).unwrap();
    let bc = b.multiply(&support::cpt_c()).unwrap();
    let recovered = bc.divide(&b).unwrap();
    assert!(recovered.equals(&support::cpt_c()));
}

#[test]
fn divide_co_broadcasts_mismatched_scopes() {
    // The joint-over-separator division used by message passing and
    // compute_posterior: a two-variable factor divided by a one-variable
    // factor over a subset of its scope, rather than an exact scope match.
    let b = support::cpt_a().multiply(&support::cpt_b()).unwrap().sum_out(["A"]).unwrap();
    let bc = b.multiply(&support::cpt_c()).unwrap();

    let quotient = bc.divide(&b).unwrap();
    assert!((at(&quotient, &[("B", "b1"), ("C", "c1")]) - at(&support::cpt_c(), &[("B", "b1"), ("C", "c1")])).abs() < 1e-9);
    assert!((quotient.data().sum() - 2.0).abs() < 1e-9);
}

#[test]
fn divide_zero_over_zero_is_zero() {
    let mut s = States::default();
    s.insert("A".into(), ["a1", "a0"].into_iter().map(String::from).collect());
    let zero = Factor::construct([0.0, 1.0], s.clone()).unwrap();
    let other = Factor::construct([0.0, 2.0], s).unwrap();
    let result = zero.divide(&other).unwrap();
    assert!((at(&result, &[("A", "a1")]) - 0.0).abs() < 1e-9);
    assert!((at(&result, &[("A", "a0")]) - 0.5).abs() < 1e-9);
}

#[test]
fn divide_positive_over_zero_fails() {
    let mut s = States::default();
    s.insert("A".into(), ["a1", "a0"].into_iter().map(String::from).collect());
    let numerator = Factor::construct([1.0, 1.0], s.clone()).unwrap();
    let denominator = Factor::construct([0.0, 1.0], s).unwrap();
    assert!(matches!(
        numerator.divide(&denominator).unwrap_err(),
        Error::ZeroMass
    ));
}

#[test]
fn construct_with_mismatched_length_fails_with_shape_error() {
    let mut s = States::default();
    s.insert("A".into(), ["a1", "a0", "a2"].into_iter().map(String::from).collect());
    let err = Factor::construct([0.5, 0.5], s).unwrap_err();
    assert!(matches!(err, Error::Shape { expected: 3, found: 2 }));
}

#[test]
fn sum_out_of_variable_not_in_scope_fails() {
    let err = support::cpt_a().sum_out(["Z"]).unwrap_err();
    assert!(matches!(err, Error::NotInScope(v) if v == "Z"));
}

#[test]
fn multiply_rejects_disagreeing_state_order() {
    let mut reordered = States::default();
    reordered.insert("A".into(), ["a0", "a1"].into_iter().map(String::from).collect());
    let swapped = Factor::construct([0.4, 0.6], reordered).unwrap();

    let err = support::cpt_a().multiply(&swapped).unwrap_err();
    assert!(matches!(err, Error::ScopeMismatch(v) if v == "A"));
}

#[test]
fn from_data_counts_joint_occurrences() {
    let row = |a: &str, b: &str| -> FxIndexMap<String, String> {
        [("A".to_owned(), a.to_owned()), ("B".to_owned(), b.to_owned())]
            .into_iter()
            .collect()
    };
    let rows: Vec<FxIndexMap<String, String>> =
        vec![row("a1", "b1"), row("a1", "b1"), row("a1", "b0"), row("a0", "b0")];
    let counts = Factor::from_data(&rows, &["A", "B"]).unwrap();
    assert!((at(&counts, &[("A", "a1"), ("B", "b1")]) - 2.0).abs() < 1e-9);
    assert!((at(&counts, &[("A", "a1"), ("B", "b0")]) - 1.0).abs() < 1e-9);
    assert!((at(&counts, &[("A", "a0"), ("B", "b0")]) - 1.0).abs() < 1e-9);
    assert!((counts.data().sum() - 4.0).abs() < 1e-9);
}

#[test]
fn sort_states_orders_each_axis_lexicographically_without_changing_values() {
    // cpt_a's declared domain is ["a1", "a0"], lexicographically reversed.
    let a = support::cpt_a();
    let sorted = a.sort_states().unwrap();
    assert_eq!(
        sorted.states()["A"].iter().map(String::as_str).collect::<Vec<_>>(),
        vec!["a0", "a1"]
    );
    assert!((at(&sorted, &[("A", "a1")]) - at(&a, &[("A", "a1")])).abs() < 1e-9);
    assert!((at(&sorted, &[("A", "a0")]) - at(&a, &[("A", "a0")])).abs() < 1e-9);
}

#[test]
fn round_trips_through_dict() {
    let joint = support::cpt_a().multiply(&support::cpt_b()).unwrap();
    let dict = joint.as_dict().unwrap();
    let rebuilt = Factor::from_json_dict(dict).unwrap();
    assert!(rebuilt.equals(&joint));
}

#[test]
fn keep_values_drops_evidence_variable_from_scope() {
    let joint = support::cpt_a().multiply(&support::cpt_b()).unwrap();
    let conditioned = joint.keep_values(&[("A", "a1")]).unwrap();
    assert!(!conditioned.scope().any(|v| v == "A"));
    assert!((at(&conditioned, &[("B", "b1")]) - 0.12).abs() < 1e-9);
}
