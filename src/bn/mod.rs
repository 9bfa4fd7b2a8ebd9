//! The narrow interface a Bayesian network must expose to be consumed by
//! [`crate::bag`] and [`crate::junction_tree`], plus a concrete categorical
//! implementation of it.
//!
//! Building and validating a Bayesian network's structure (acyclicity,
//! parameter learning, structure learning) is outside this crate's scope —
//! [`CategoricalBayesianNetwork`] is a thin, already-validated container
//! that callers construct directly from a graph and a set of CPTs.

use crate::factor::Factor;
use crate::graphs::{DiGraph, Graph};
use crate::types::{FxIndexMap, FxIndexSet};

/// A single network node: its CPT, the variable's own state sequence, its
/// parent variables, and the set `{V} ∪ parents`.
#[derive(Clone, Debug)]
pub struct BnNode {
    /// The node's conditional probability table, with scope `{V} ∪ parents`.
    pub cpt: Factor,
    /// The node variable's own state sequence.
    pub states: Vec<String>,
    /// The node's parent variables, in the CPT's scope order.
    pub parents: Vec<String>,
    /// `{V} ∪ parents`, unordered.
    pub vars: FxIndexSet<String>,
}

/// The interface [`crate::bag::Bag`] and [`crate::junction_tree::JunctionTree`]
/// consume a Bayesian network through.
pub trait BNAdapter {
    /// Every node, keyed by variable name.
    fn nodes(&self) -> &FxIndexMap<String, BnNode>;

    /// The undirected edge set of the moralized DAG.
    fn moralize_graph(&self) -> Vec<(String, String)>;

    /// A total order over variables, used to drive triangulation.
    fn get_node_elimination_order(&self) -> Vec<String>;
}

/// A Bayesian network over categorical (finite-discrete) variables: a DAG
/// plus one CPT per node.
#[derive(Clone, Debug)]
pub struct CategoricalBayesianNetwork {
    graph: DiGraph,
    nodes: FxIndexMap<String, BnNode>,
}

impl CategoricalBayesianNetwork {
    /// Builds a network from a DAG and one CPT per vertex.
    ///
    /// # Panics
    ///
    /// If a vertex has no assigned CPT, if a CPT's scope is not exactly
    /// `{V} ∪ parents(V)`, or if the graph is cyclic.
    pub fn new(graph: DiGraph, cpts: FxIndexMap<String, Factor>) -> Self {
        let mut nodes = FxIndexMap::default();

        for v in graph.vertices() {
            let label = graph.index_to_label(v).to_owned();
            let cpt = cpts
                .get(&label)
                .unwrap_or_else(|| panic!("Variable `{label}` has no assigned CPT"))
                .clone();

            let parents: Vec<String> = graph
                .parents(&crate::types::Set::from([v]))
                .into_iter()
                .map(|p| graph.index_to_label(p).to_owned())
                .collect();

            let mut expected: FxIndexSet<String> = parents.iter().cloned().collect();
            expected.insert(label.clone());
            let actual: FxIndexSet<String> = cpt.scope().map(str::to_owned).collect();
            assert_eq!(
                expected, actual,
                "CPT for `{label}` must have scope {{V}} ∪ parents(V)"
            );

            let states: Vec<String> = cpt.states()[&label].iter().cloned().collect();
            let mut vars: FxIndexSet<String> = parents.iter().cloned().collect();
            vars.insert(label.clone());

            nodes.insert(
                label,
                BnNode {
                    cpt,
                    states,
                    parents,
                    vars,
                },
            );
        }

        assert!(
            topological_order(&graph).is_some(),
            "Bayesian network graph must be acyclic"
        );

        Self { graph, nodes }
    }

    /// The underlying DAG.
    #[inline]
    pub fn graph(&self) -> &DiGraph {
        &self.graph
    }
}

impl BNAdapter for CategoricalBayesianNetwork {
    fn nodes(&self) -> &FxIndexMap<String, BnNode> {
        &self.nodes
    }

    fn moralize_graph(&self) -> Vec<(String, String)> {
        let moral = self.graph.moralize();
        moral
            .edges()
            .into_iter()
            .map(|(x, y)| (moral.index_to_label(x).to_owned(), moral.index_to_label(y).to_owned()))
            .collect()
    }

    fn get_node_elimination_order(&self) -> Vec<String> {
        let order = topological_order(&self.graph).expect("graph must be acyclic");
        order
            .into_iter()
            .map(|v| self.graph.index_to_label(v).to_owned())
            .collect()
    }
}

/// Kahn's algorithm; `None` if the graph is cyclic.
fn topological_order(graph: &DiGraph) -> Option<Vec<usize>> {
    let vertices = graph.vertices();
    let mut in_degree: FxIndexMap<usize, usize> = vertices
        .iter()
        .map(|&v| (v, graph.parents(&crate::types::Set::from([v])).len()))
        .collect();

    let mut ready: std::collections::VecDeque<usize> = in_degree
        .iter()
        .filter(|&(_, &d)| d == 0)
        .map(|(&v, _)| v)
        .collect();

    let mut order = Vec::with_capacity(vertices.len());
    while let Some(v) = ready.pop_front() {
        order.push(v);
        for c in graph.children(&crate::types::Set::from([v])) {
            let d = in_degree.get_mut(&c).unwrap();
            *d -= 1;
            if *d == 0 {
                ready.push_back(c);
            }
        }
    }

    (order.len() == vertices.len()).then_some(order)
}
