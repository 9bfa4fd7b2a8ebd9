//! Junction-tree message passing: a persistent cluster-tree structure over a
//! Bayesian network that amortizes inference across multiple queries,
//! supports evidence retraction, and caches intermediate messages.
//!
//! Construction (moralize → triangulate/cluster → prune subsumed clusters →
//! running-intersection edges → assign factors → trivial-factor padding) is
//! grounded in `thomas-core`'s `JunctionTree`/`TreeNode`/`TreeEdge`
//! (`original_source/thomas/core/junctiontree.py`), translated into Rust
//! ownership: the tree owns every node and edge by index, and nodes/edges
//! reference each other by [`NodeId`]/[`EdgeId`] rather than by back-pointer.

mod construct;

use std::cell::RefCell;
use std::collections::VecDeque;

use crate::bn::BNAdapter;
use crate::factor::Factor;
use crate::types::{Error, FxIndexMap, FxIndexSet, Map, Result};

/// Index of a [`TreeNode`] within a [`JunctionTree`].
pub type NodeId = usize;
/// Index of a [`TreeEdge`] within a [`JunctionTree`].
pub type EdgeId = usize;

/// A junction-tree node: a cluster of variables, the factors assigned to it
/// (CPTs plus trivial unit padding), the home variables whose evidence
/// indicator lives here, and its incident edges.
///
/// Caches are interior-mutable since `pull` is a read-only traversal from
/// the caller's perspective but must memoize messages as it recurses.
#[derive(Clone, Debug)]
pub struct TreeNode {
    cluster: FxIndexSet<String>,
    factors: Vec<Factor>,
    indicator_vars: Vec<String>,
    edges: Vec<EdgeId>,
    factors_multiplied: RefCell<Option<Factor>>,
    message_cache: RefCell<Map<EdgeId, Factor>>,
}

impl TreeNode {
    fn new(cluster: FxIndexSet<String>) -> Self {
        Self {
            cluster,
            factors: Vec::new(),
            indicator_vars: Vec::new(),
            edges: Vec::new(),
            factors_multiplied: RefCell::new(None),
            message_cache: RefCell::new(Map::default()),
        }
    }

    /// The variables labelling this node.
    #[inline]
    pub fn cluster(&self) -> &FxIndexSet<String> {
        &self.cluster
    }

    /// The factors (CPTs and trivial padding) assigned to this node.
    #[inline]
    pub fn factors(&self) -> &[Factor] {
        &self.factors
    }

    fn invalidate(&self) {
        *self.factors_multiplied.borrow_mut() = None;
        self.message_cache.borrow_mut().clear();
    }
}

/// An undirected link between two [`TreeNode`]s. The separator — the
/// intersection of the unions of cluster variables on each side of the edge
/// — is derived on demand and cached.
#[derive(Clone, Debug)]
pub struct TreeEdge {
    left: NodeId,
    right: NodeId,
    separator: RefCell<Option<FxIndexSet<String>>>,
}

impl TreeEdge {
    fn new(left: NodeId, right: NodeId) -> Self {
        Self {
            left,
            right,
            separator: RefCell::new(None),
        }
    }

    /// The two nodes this edge connects.
    #[inline]
    pub fn endpoints(&self) -> (NodeId, NodeId) {
        (self.left, self.right)
    }

    fn other(&self, from: NodeId) -> NodeId {
        if from == self.left { self.right } else { self.left }
    }

    fn invalidate(&self) {
        *self.separator.borrow_mut() = None;
    }
}

/// A cluster tree over a Bayesian network's variables, supporting repeated
/// marginal queries under changing evidence via cached message passing.
#[derive(Clone, Debug)]
pub struct JunctionTree {
    nodes: Vec<TreeNode>,
    edges: Vec<TreeEdge>,
    indicators: FxIndexMap<String, Factor>,
    home: FxIndexMap<String, NodeId>,
}

impl JunctionTree {
    /// Builds a junction tree from a Bayesian network, via moralization,
    /// triangulation and factor assignment.
    ///
    /// # Errors
    ///
    /// [`Error::Triangulation`] if the adapter's elimination order does not
    /// yield a valid tree decomposition, or if a variable's family has no
    /// containing cluster.
    pub fn new<A: BNAdapter>(bn: &A) -> Result<Self> {
        let construct::Built {
            nodes,
            edges,
            indicators,
            home,
        } = construct::build(bn)?;

        Ok(Self {
            nodes,
            edges,
            indicators,
            home,
        })
    }

    /// The tree's clusters, one per node, in construction order.
    pub fn clusters(&self) -> impl Iterator<Item = &FxIndexSet<String>> {
        self.nodes.iter().map(TreeNode::cluster)
    }

    /// The cluster labelling node `idx`.
    ///
    /// # Panics
    ///
    /// If `idx` is out of bounds.
    pub fn node_cluster(&self, idx: NodeId) -> &FxIndexSet<String> {
        &self.nodes[idx].cluster
    }

    /// The number of nodes in the tree.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The two endpoints of edge `e`.
    ///
    /// # Panics
    ///
    /// If `e` is out of bounds.
    pub fn edge_endpoints(&self, e: EdgeId) -> (NodeId, NodeId) {
        self.edges[e].endpoints()
    }

    /// The number of edges in the tree.
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    /// The node holding `v`'s CPT and evidence indicator.
    pub fn home_node(&self, v: &str) -> Option<NodeId> {
        self.home.get(v).copied()
    }

    /// The indices of every node whose cluster contains `v`. By the running
    /// intersection property this set induces a connected subtree.
    pub fn nodes_containing(&self, v: &str) -> Vec<NodeId> {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, n)| n.cluster.contains(v))
            .map(|(i, _)| i)
            .collect()
    }

    /// The separator of edge `e`: the intersection of the cluster unions on
    /// either side.
    ///
    /// # Panics
    ///
    /// If `e` is out of bounds.
    pub fn separator(&self, e: EdgeId) -> FxIndexSet<String> {
        if let Some(cached) = self.edges[e].separator.borrow().as_ref() {
            return cached.clone();
        }

        let (left, right) = self.edges[e].endpoints();
        let left_side = self.reachable_excluding(left, e);
        let right_side = self.reachable_excluding(right, e);

        let union_of = |side: &[NodeId]| -> FxIndexSet<String> {
            side.iter()
                .flat_map(|&n| self.nodes[n].cluster.iter().cloned())
                .collect()
        };
        let left_union = union_of(&left_side);
        let right_union = union_of(&right_side);
        let sep: FxIndexSet<String> = left_union
            .into_iter()
            .filter(|v| right_union.contains(v))
            .collect();

        *self.edges[e].separator.borrow_mut() = Some(sep.clone());
        sep
    }

    fn reachable_excluding(&self, start: NodeId, excluded_edge: EdgeId) -> Vec<NodeId> {
        let mut visited = vec![start];
        let mut stack = vec![start];
        while let Some(n) = stack.pop() {
            for &e in &self.nodes[n].edges {
                if e == excluded_edge {
                    continue;
                }
                let nb = self.edges[e].other(n);
                if !visited.contains(&nb) {
                    visited.push(nb);
                    stack.push(nb);
                }
            }
        }
        visited
    }

    fn factors_multiplied(&self, idx: NodeId) -> Result<Factor> {
        if let Some(cached) = self.nodes[idx].factors_multiplied.borrow().as_ref() {
            return Ok(cached.clone());
        }

        let mut acc = Factor::construct([1.0], Default::default())?;
        for f in &self.nodes[idx].factors {
            acc = acc.multiply(f)?;
        }
        for v in &self.nodes[idx].indicator_vars {
            acc = acc.multiply(&self.indicators[v])?;
        }

        *self.nodes[idx].factors_multiplied.borrow_mut() = Some(acc.clone());
        Ok(acc)
    }

    /// Pulls messages towards node `idx`: the product of its local factors
    /// (CPTs, padding, and the indicators it hosts) and every incoming
    /// message from a downstream edge. If `upstream` is given, the result is
    /// projected onto that edge's separator. Messages are cached per
    /// (node, upstream edge) until the next [`JunctionTree::invalidate_caches`].
    pub fn pull(&self, idx: NodeId, upstream: Option<EdgeId>) -> Result<Factor> {
        let mut result = self.factors_multiplied(idx)?;

        let downstream: Vec<EdgeId> = self.nodes[idx]
            .edges
            .iter()
            .copied()
            .filter(|&e| Some(e) != upstream)
            .collect();

        for e in downstream {
            let cached = self.nodes[idx].message_cache.borrow().get(&e).cloned();
            let message = match cached {
                Some(m) => m,
                None => {
                    let neighbor = self.edges[e].other(idx);
                    let m = self.pull(neighbor, Some(e))?;
                    self.nodes[idx].message_cache.borrow_mut().insert(e, m.clone());
                    m
                }
            };
            result = result.multiply(&message)?;
        }

        if let Some(up) = upstream {
            let separator = self.separator(up);
            let keep: Vec<&str> = separator.iter().map(String::as_str).collect();
            result = result.project(&keep)?;
        }

        Ok(result)
    }

    /// The marginal P(v), normalized, via `v`'s home node.
    ///
    /// # Errors
    ///
    /// [`Error::NotInScope`] if `v` is not a network variable.
    pub fn get_marginal(&self, v: &str) -> Result<Factor> {
        let idx = self
            .home_node(v)
            .ok_or_else(|| Error::NotInScope(v.to_owned()))?;
        self.pull(idx, None)?.project(&[v])?.normalize()
    }

    /// The marginal of every variable in `vs`, as [`JunctionTree::get_marginal`].
    pub fn get_marginals(&self, vs: &[&str]) -> Result<FxIndexMap<String, Factor>> {
        vs.iter()
            .map(|&v| self.get_marginal(v).map(|f| (v.to_owned(), f)))
            .collect()
    }

    /// Returns the (first) node whose cluster is a superset of `q`.
    fn node_for_set(&self, q: &FxIndexSet<String>) -> Option<NodeId> {
        self.nodes
            .iter()
            .position(|n| q.iter().all(|v| n.cluster.contains(v)))
    }

    /// Ensures some node's cluster is a superset of `q`, extending clusters
    /// along the tree with trivial unit factors if necessary.
    ///
    /// Introducing unit factors along the path does not change the joint
    /// distribution — it only widens the cluster labels the variables are
    /// visible at — so exactness of posterior queries is preserved.
    ///
    /// # Errors
    ///
    /// [`Error::NotInScope`] if some variable in `q` is not a network
    /// variable. [`Error::Triangulation`] if the tree is disconnected and no
    /// path reaches a node containing a missing variable (cannot happen for
    /// a tree built by [`JunctionTree::new`]).
    pub fn ensure_cluster(&mut self, q: &[&str]) -> Result<()> {
        let q_set: FxIndexSet<String> = q.iter().map(|v| v.to_string()).collect();
        if self.node_for_set(&q_set).is_some() {
            return Ok(());
        }

        let base = self
            .nodes
            .iter()
            .enumerate()
            .max_by_key(|(_, n)| q_set.iter().filter(|v| n.cluster.contains(*v)).count())
            .map(|(i, _)| i)
            .expect("a junction tree always has at least one node");

        let missing: Vec<String> = q_set
            .iter()
            .filter(|v| !self.nodes[base].cluster.contains(*v))
            .cloned()
            .collect();

        for var in missing {
            if !self.indicators.contains_key(&var) {
                return Err(Error::NotInScope(var));
            }

            let targets = self.nodes_containing(&var);
            let path = targets
                .iter()
                .filter_map(|&t| self.shortest_path(base, t))
                .min_by_key(Vec::len)
                .ok_or_else(|| {
                    Error::Triangulation(format!("no path to a node containing `{var}`"))
                })?;

            let states = self.indicators[&var].states()[&var].clone();
            for &idx in &path {
                if !self.nodes[idx].cluster.contains(&var) {
                    self.nodes[idx].cluster.insert(var.clone());
                    let trivial = construct::ones_factor(&var, &states)?;
                    self.nodes[idx].factors.push(trivial);
                }
            }
        }

        for e in &self.edges {
            e.invalidate();
        }
        self.invalidate_caches();
        Ok(())
    }

    fn shortest_path(&self, src: NodeId, dst: NodeId) -> Option<Vec<NodeId>> {
        if src == dst {
            return Some(vec![src]);
        }

        let mut visited = vec![src];
        let mut prev: Map<NodeId, NodeId> = Map::default();
        let mut queue = VecDeque::from([src]);

        while let Some(n) = queue.pop_front() {
            for &e in &self.nodes[n].edges {
                let nb = self.edges[e].other(n);
                if visited.contains(&nb) {
                    continue;
                }
                visited.push(nb);
                prev.insert(nb, n);
                if nb == dst {
                    let mut path = vec![nb];
                    let mut cur = nb;
                    while let Some(&p) = prev.get(&cur) {
                        path.push(p);
                        cur = p;
                    }
                    path.reverse();
                    return Some(path);
                }
                queue.push_back(nb);
            }
        }
        None
    }

    /// Sets hard evidence: `v`'s indicator is 1 at state `s` and 0
    /// elsewhere. Validates every `(v, s)` pair before mutating any
    /// indicator, so a failed call leaves the tree unchanged.
    ///
    /// # Errors
    ///
    /// [`Error::NotInScope`] if `v` is not a network variable.
    /// [`Error::InvalidState`] if `s` is not declared for `v`.
    pub fn set_evidence_hard(&mut self, vs: &[(&str, &str)]) -> Result<()> {
        let mut resolved = Vec::with_capacity(vs.len());
        for &(v, s) in vs {
            let factor = self
                .indicators
                .get(v)
                .ok_or_else(|| Error::NotInScope(v.to_owned()))?;
            let idx = factor.states()[v]
                .get_index_of(s)
                .ok_or_else(|| Error::InvalidState(v.to_owned(), s.to_owned()))?;
            resolved.push((v.to_owned(), idx));
        }

        for (v, idx) in resolved {
            let len = self.indicators[&v].len();
            let states = self.indicators[&v].states().clone();
            let data: Vec<f64> = (0..len).map(|i| if i == idx { 1.0 } else { 0.0 }).collect();
            self.indicators.insert(v, Factor::construct(data, states)?);
        }

        self.invalidate_caches();
        Ok(())
    }

    /// Sets likelihood evidence on `v`: each named state's indicator entry
    /// is set to the given weight; unnamed states keep their current value.
    ///
    /// # Errors
    ///
    /// [`Error::NotInScope`] if `v` is not a network variable.
    /// [`Error::InvalidState`] if a named state is not declared for `v`.
    pub fn set_evidence_likelihood(&mut self, v: &str, weights: &[(&str, f64)]) -> Result<()> {
        let factor = self
            .indicators
            .get(v)
            .ok_or_else(|| Error::NotInScope(v.to_owned()))?;

        let mut updates = Vec::with_capacity(weights.len());
        for &(s, value) in weights {
            let idx = factor.states()[v]
                .get_index_of(s)
                .ok_or_else(|| Error::InvalidState(v.to_owned(), s.to_owned()))?;
            updates.push((idx, value));
        }

        let mut data: Vec<f64> = factor.data().iter().copied().collect();
        let states = factor.states().clone();
        for (idx, value) in updates {
            data[idx] = value;
        }
        self.indicators.insert(v.to_owned(), Factor::construct(data, states)?);

        self.invalidate_caches();
        Ok(())
    }

    /// Resets the named variables' indicators to all-ones (no evidence); if
    /// `vs` is `None`, resets every indicator.
    ///
    /// # Errors
    ///
    /// [`Error::NotInScope`] if a named variable is not a network variable.
    pub fn reset_evidence(&mut self, vs: Option<&[&str]>) -> Result<()> {
        let targets: Vec<String> = match vs {
            Some(list) => {
                for &v in list {
                    if !self.indicators.contains_key(v) {
                        return Err(Error::NotInScope(v.to_owned()));
                    }
                }
                list.iter().map(|v| v.to_string()).collect()
            }
            None => self.indicators.keys().cloned().collect(),
        };

        for v in targets {
            let len = self.indicators[&v].len();
            let states = self.indicators[&v].states().clone();
            self.indicators
                .insert(v, Factor::construct(vec![1.0; len], states)?);
        }

        self.invalidate_caches();
        Ok(())
    }

    /// Invalidates every node's message and joint-factor cache. Called by
    /// every evidence-mutating method; isolated here as the single
    /// cross-cutting cache-invalidation point the tree exposes.
    fn invalidate_caches(&self) {
        log::trace!("invalidating junction tree caches");
        for n in &self.nodes {
            n.invalidate();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bn::CategoricalBayesianNetwork;
    use crate::factor::Factor;
    use crate::graphs::{DiGraph, Graph};
    use crate::types::{FxIndexMap, States};

    // Sprinkler-ish network: A -> B -> C, A -> C.
    fn network() -> CategoricalBayesianNetwork {
        let mut graph = DiGraph::empty(["A", "B", "C"]);
        let a = graph.label_to_index(&"A");
        let b = graph.label_to_index(&"B");
        let c = graph.label_to_index(&"C");
        graph.add_edge(a, b);
        graph.add_edge(a, c);
        graph.add_edge(b, c);

        let mut a_states = States::default();
        a_states.insert("A".into(), ["a1", "a0"].into_iter().map(String::from).collect());
        let fa = Factor::construct([0.6, 0.4], a_states).unwrap();

        let mut ba_states = States::default();
        ba_states.insert("A".into(), ["a1", "a0"].into_iter().map(String::from).collect());
        ba_states.insert("B".into(), ["b1", "b0"].into_iter().map(String::from).collect());
        let fb = Factor::construct([0.2, 0.8, 0.75, 0.25], ba_states).unwrap();

        let mut cab_states = States::default();
        cab_states.insert("A".into(), ["a1", "a0"].into_iter().map(String::from).collect());
        cab_states.insert("B".into(), ["b1", "b0"].into_iter().map(String::from).collect());
        cab_states.insert("C".into(), ["c1", "c0"].into_iter().map(String::from).collect());
        let fc = Factor::construct(
            [0.9, 0.1, 0.6, 0.4, 0.5, 0.5, 0.05, 0.95],
            cab_states,
        )
        .unwrap();

        let mut cpts = FxIndexMap::default();
        cpts.insert("A".to_owned(), fa);
        cpts.insert("B".to_owned(), fb);
        cpts.insert("C".to_owned(), fc);

        CategoricalBayesianNetwork::new(graph, cpts)
    }

    #[test]
    fn construction_preserves_families() {
        let bn = network();
        let jt = JunctionTree::new(&bn).unwrap();

        for (v, node) in bn.nodes() {
            let home = jt.home_node(v).expect("every variable has a home node");
            let cluster = jt.node_cluster(home);
            for var in &node.vars {
                assert!(cluster.contains(var), "cluster must contain family of `{v}`");
            }
        }
    }

    #[test]
    fn running_intersection_holds() {
        let bn = network();
        let jt = JunctionTree::new(&bn).unwrap();

        for v in ["A", "B", "C"] {
            let nodes = jt.nodes_containing(v);
            assert!(!nodes.is_empty());
            // A connected subtree over n nodes has n-1 internal edges
            // reachable without leaving the set; cheaply check connectivity
            // by BFS restricted to `nodes`.
            let set: FxIndexSet<usize> = nodes.iter().copied().collect();
            let mut visited = vec![nodes[0]];
            let mut stack = vec![nodes[0]];
            while let Some(n) = stack.pop() {
                for e in 0..jt.edge_count() {
                    let (l, r) = jt.edge_endpoints(e);
                    let nb = if l == n && set.contains(&r) {
                        Some(r)
                    } else if r == n && set.contains(&l) {
                        Some(l)
                    } else {
                        None
                    };
                    if let Some(nb) = nb {
                        if !visited.contains(&nb) {
                            visited.push(nb);
                            stack.push(nb);
                        }
                    }
                }
            }
            assert_eq!(visited.len(), nodes.len(), "nodes containing `{v}` must be connected");
        }
    }

    #[test]
    fn marginals_sum_to_one() {
        let bn = network();
        let jt = JunctionTree::new(&bn).unwrap();
        for v in ["A", "B", "C"] {
            let marginal = jt.get_marginal(v).unwrap();
            assert!((marginal.data().sum() - 1.0).abs() < 1e-8);
        }
    }

    #[test]
    fn evidence_idempotence_and_retraction() {
        let bn = network();
        let mut jt = JunctionTree::new(&bn).unwrap();

        let prior = jt.get_marginal("C").unwrap();

        jt.set_evidence_hard(&[("A", "a1")]).unwrap();
        let once = jt.get_marginal("C").unwrap();
        jt.set_evidence_hard(&[("A", "a1")]).unwrap();
        let twice = jt.get_marginal("C").unwrap();
        assert!(once.equals(&twice));

        jt.reset_evidence(None).unwrap();
        let restored = jt.get_marginal("C").unwrap();
        assert!(restored.equals(&prior));
    }

    #[test]
    fn set_evidence_hard_rejects_undeclared_state_without_mutating() {
        let bn = network();
        let mut jt = JunctionTree::new(&bn).unwrap();
        let before = jt.get_marginal("A").unwrap();

        let err = jt.set_evidence_hard(&[("A", "a2")]).unwrap_err();
        assert!(matches!(err, Error::InvalidState(..)));

        let after = jt.get_marginal("A").unwrap();
        assert!(before.equals(&after));
    }

    #[test]
    fn ensure_cluster_extends_without_changing_marginal() {
        let bn = network();
        let mut jt = JunctionTree::new(&bn).unwrap();
        let before = jt.get_marginal("C").unwrap();

        jt.ensure_cluster(&["A", "C"]).unwrap();
        assert!(jt.node_for_set(&["A", "C"].into_iter().map(String::from).collect()).is_some());

        let after = jt.get_marginal("C").unwrap();
        assert!(before.equals(&after));
    }
}
