//! Variable elimination (the Bag engine): marginals, posteriors under
//! evidence, and elimination-strategy equivalence.

mod support;

use bayes_infer::bag::{Bag, EliminationStrategy};

fn bag() -> Bag {
    let cpts = support::cpts();
    Bag::new(
        "sprinkler".to_owned(),
        cpts.into_values().collect(),
    )
}

#[test]
fn eliminate_onto_marginal_matches_factor_algebra() {
    let d = bag().eliminate(&["D"], &[]).unwrap();
    assert!((d.data().sum() - 1.0).abs() < 1e-8);

    let e = bag().eliminate(&["E"], &[]).unwrap();
    match e.index(&[("E", "e1")]).unwrap() {
        bayes_infer::factor::Indexed::Scalar(v) => assert!((v - 0.4056).abs() < 1e-6),
        _ => panic!("expected scalar"),
    }
}

#[test]
fn discovery_and_min_degree_strategies_agree() {
    let bag = bag();
    let via_discovery = bag
        .eliminate_with(&["D"], &[], EliminationStrategy::Discovery)
        .unwrap();
    let via_min_degree = bag
        .eliminate_with(&["D"], &[], EliminationStrategy::MinDegree)
        .unwrap();
    assert!(via_discovery.equals(&via_min_degree));
}

#[test]
fn compute_posterior_conditions_on_hard_evidence() {
    let posterior = bag()
        .compute_posterior(&["E"], &[], &[], &[("A", Some("a1"))])
        .unwrap();
    assert_eq!(posterior.conditioned, vec!["E".to_owned()]);
    assert!((posterior.factor.data().sum() - 1.0).abs() < 1e-8);
}

#[test]
fn compute_posterior_extracts_a_single_value() {
    let posterior = bag()
        .compute_posterior(&[], &[("E", "e1")], &[], &[])
        .unwrap();
    assert_eq!(posterior.factor.width(), 0);
}

#[test]
fn par_eliminate_matches_sequential_eliminate() {
    let bag = bag();
    let sequential = bag.eliminate(&["D"], &[("A", "a1")]).unwrap();
    let parallel = bag.par_eliminate(&["D"], &[("A", "a1")]).unwrap();
    assert!(sequential.equals(&parallel));
}

#[test]
fn as_dict_round_trips_through_bag_schema() {
    let bag = bag();
    let dict = bag.as_dict().unwrap();
    assert_eq!(dict["type"], "Bag");
    let rebuilt = bayes_infer::bag::Bag::from_dict(dict).unwrap();
    assert_eq!(rebuilt.factors().len(), bag.factors().len());
}
