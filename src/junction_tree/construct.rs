//! Builds a [`super::JunctionTree`]'s clusters, edges and factor assignment
//! from a [`BNAdapter`]: moralize → triangulate/cluster → prune subsumed
//! clusters → running-intersection edges → assign factors → pad trivial
//! factors.
//!
//! Grounded in `thomas-core`'s `JunctionTree.__init__` /
//! `_get_elimination_clusters` / `_create_structure` / `_assign_factors`.

use crate::bn::BNAdapter;
use crate::factor::Factor;
use crate::types::{Error, FxIndexMap, FxIndexSet, Result, States};

use super::{TreeEdge, TreeNode};

/// The pieces [`super::JunctionTree::new`] assembles into itself.
pub(super) struct Built {
    pub nodes: Vec<TreeNode>,
    pub edges: Vec<TreeEdge>,
    pub indicators: FxIndexMap<String, Factor>,
    pub home: FxIndexMap<String, usize>,
}

pub(super) fn build<A: BNAdapter>(bn: &A) -> Result<Built> {
    log::debug!("moralizing bayesian network");
    let moral_edges = bn.moralize_graph();
    let order = bn.get_node_elimination_order();

    log::debug!("triangulating along elimination order of {} variables", order.len());
    let clusters = prune_subsumed(elimination_clusters(&moral_edges, &order));
    log::debug!("triangulated into {} maximal clusters", clusters.len());

    let edge_pairs = running_intersection_edges(&clusters)?;

    let mut nodes: Vec<TreeNode> = clusters.into_iter().map(TreeNode::new).collect();
    for (i, &(l, r)) in edge_pairs.iter().enumerate() {
        nodes[l].edges.push(i);
        nodes[r].edges.push(i);
    }
    let edges: Vec<TreeEdge> = edge_pairs
        .into_iter()
        .map(|(left, right)| TreeEdge::new(left, right))
        .collect();

    log::debug!("assigning {} factors to tree nodes", bn.nodes().len());
    let mut indicators = FxIndexMap::default();
    let mut home = FxIndexMap::default();

    for (v, bn_node) in bn.nodes() {
        let target = nodes
            .iter()
            .position(|n| is_subset(&bn_node.vars, &n.cluster))
            .ok_or_else(|| {
                Error::Triangulation(format!(
                    "no cluster is a superset of the family of `{v}`"
                ))
            })?;

        nodes[target].factors.push(bn_node.cpt.clone());
        nodes[target].indicator_vars.push(v.clone());
        home.insert(v.clone(), target);

        let states: FxIndexSet<String> = bn_node.states.iter().cloned().collect();
        indicators.insert(v.clone(), ones_factor(v, &states)?);
    }

    // Trivial-factor padding: every cluster variable not covered by an
    // assigned CPT gets a unit factor, so its state set is represented
    // wherever the cluster claims it.
    for node in &mut nodes {
        let mut covered: FxIndexSet<String> = FxIndexSet::default();
        for f in &node.factors {
            covered.extend(f.scope().map(str::to_owned));
        }
        let missing: Vec<String> = node
            .cluster
            .iter()
            .filter(|v| !covered.contains(*v))
            .cloned()
            .collect();
        for w in missing {
            let states = indicators[&w].states()[&w].clone();
            node.factors.push(ones_factor(&w, &states)?);
        }
    }

    Ok(Built {
        nodes,
        edges,
        indicators,
        home,
    })
}

/// One cluster per variable in `order`: `{X} ∪ neighbors(X)` in the working
/// graph, with fill-in edges added between every pair of neighbors before
/// `X` is removed.
fn elimination_clusters(moral_edges: &[(String, String)], order: &[String]) -> Vec<FxIndexSet<String>> {
    let mut adj: FxIndexMap<String, FxIndexSet<String>> = FxIndexMap::default();
    for v in order {
        adj.entry(v.clone()).or_default();
    }
    for (a, b) in moral_edges {
        adj.entry(a.clone()).or_default().insert(b.clone());
        adj.entry(b.clone()).or_default().insert(a.clone());
    }

    let mut clusters = Vec::with_capacity(order.len());
    for x in order {
        let neighbors: Vec<String> = adj
            .get(x)
            .map(|n| n.iter().cloned().collect())
            .unwrap_or_default();

        for i in 0..neighbors.len() {
            for j in (i + 1)..neighbors.len() {
                adj.get_mut(&neighbors[i]).unwrap().insert(neighbors[j].clone());
                adj.get_mut(&neighbors[j]).unwrap().insert(neighbors[i].clone());
            }
        }

        let mut cluster: FxIndexSet<String> = FxIndexSet::default();
        cluster.insert(x.clone());
        cluster.extend(neighbors.iter().cloned());
        clusters.push(cluster);

        for n in &neighbors {
            if let Some(set) = adj.get_mut(n) {
                set.shift_remove(x);
            }
        }
        adj.shift_remove(x);
    }
    clusters
}

/// Reverse-iterates the clusters, folding `C_i` into a later `C_j` whenever
/// `C_i ⊆ C_j`, until no cluster is a subset of another.
fn prune_subsumed(mut clusters: Vec<FxIndexSet<String>>) -> Vec<FxIndexSet<String>> {
    clusters.reverse();
    let mut should_continue = clusters.len() > 1;
    while should_continue {
        should_continue = false;
        let mut merge = None;
        'search: for i in 0..clusters.len() {
            for j in (i + 1)..clusters.len() {
                if is_subset(&clusters[i], &clusters[j]) {
                    merge = Some((i, j));
                    break 'search;
                }
            }
        }
        if let Some((i, j)) = merge {
            clusters[i] = clusters[j].clone();
            clusters.remove(j);
            should_continue = clusters.len() > 1;
        }
    }
    clusters.reverse();
    clusters
}

/// For each cluster, from last to first: the separator with the first later
/// cluster whose cluster is a superset of `cluster(i) ∩ (∪ clusters after i)`.
///
/// # Errors
///
/// [`Error::Triangulation`] if no such cluster exists — the elimination
/// order did not yield a tree decomposition.
fn running_intersection_edges(clusters: &[FxIndexSet<String>]) -> Result<Vec<(usize, usize)>> {
    let n = clusters.len();
    let mut edges = Vec::with_capacity(n.saturating_sub(1));
    for i in (0..n).rev() {
        let remaining = &clusters[i + 1..];
        if remaining.is_empty() {
            continue;
        }

        let mut union_remaining: FxIndexSet<String> = FxIndexSet::default();
        for c in remaining {
            union_remaining.extend(c.iter().cloned());
        }
        let intersection: Vec<&String> = clusters[i]
            .iter()
            .filter(|v| union_remaining.contains(*v))
            .collect();

        let target = remaining
            .iter()
            .position(|c| intersection.iter().all(|v| c.contains(*v)))
            .ok_or_else(|| {
                Error::Triangulation(format!(
                    "no remaining cluster is a superset of cluster {i}'s separator"
                ))
            })?;
        edges.push((i, i + 1 + target));
    }
    Ok(edges)
}

fn is_subset(a: &FxIndexSet<String>, b: &FxIndexSet<String>) -> bool {
    a.iter().all(|v| b.contains(v))
}

pub(super) fn ones_factor(var: &str, states: &FxIndexSet<String>) -> Result<Factor> {
    let mut s = States::default();
    s.insert(var.to_owned(), states.clone());
    Factor::construct(vec![1.0; states.len()], s)
}
