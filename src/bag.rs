//! Variable elimination: one-shot marginalization over a flat set of
//! factors, with no persistent structure across queries. See
//! [`crate::junction_tree`] for the structure that amortizes repeated
//! queries.

use rayon::prelude::*;

use crate::factor::{Factor, Indexed};
use crate::types::{Error, FxIndexMap, FxIndexSet, Result};

/// Strategy used to pick the order in which non-query variables are
/// eliminated. Any ordering is correct; the choice only affects the size of
/// intermediate factors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum EliminationStrategy {
    /// Variables in the order they are first discovered across the factor
    /// list. Arbitrary but deterministic.
    Discovery,
    /// At each step, eliminate the variable with the fewest neighbors among
    /// the variables not yet eliminated, adding fill-in edges as it goes.
    /// A reasonable default heuristic for keeping intermediate factors
    /// small.
    #[default]
    MinDegree,
}

/// A factor tagged with which of its scope variables are "conditioned" —
/// i.e. were named in a query — versus conditioning variables left in
/// scope.
#[derive(Clone, Debug)]
pub struct Cpt {
    /// The underlying factor.
    pub factor: Factor,
    /// The query ("conditioned") variables this CPT answers for.
    pub conditioned: Vec<String>,
}

/// A named, flat collection of factors, supporting one-shot variable
/// elimination queries.
#[derive(Clone, Debug)]
pub struct Bag {
    name: Option<String>,
    factors: Vec<Factor>,
}

impl Bag {
    /// Creates a new bag from a name and a list of factors.
    pub fn new(name: impl Into<Option<String>>, factors: Vec<Factor>) -> Self {
        Self {
            name: name.into(),
            factors,
        }
    }

    /// The bag's name, if any.
    #[inline]
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// The factors currently held by the bag.
    #[inline]
    pub fn factors(&self) -> &[Factor] {
        &self.factors
    }

    /// The union of every factor's scope, in first-discovery order.
    pub fn scope(&self) -> FxIndexSet<String> {
        let mut scope = FxIndexSet::default();
        for f in &self.factors {
            scope.extend(f.scope().map(str::to_owned));
        }
        scope
    }

    /// Eliminates every variable not in `q`, applying `evidence` first, and
    /// using the default [`EliminationStrategy::MinDegree`] ordering.
    ///
    /// The result's scope is reordered to match `q`, and each retained
    /// variable's state sequence is sorted lexicographically.
    pub fn eliminate(&self, q: &[&str], evidence: &[(&str, &str)]) -> Result<Factor> {
        self.eliminate_with(q, evidence, EliminationStrategy::default())
    }

    /// As [`Bag::eliminate`], with an explicit elimination-order strategy.
    pub fn eliminate_with(
        &self,
        q: &[&str],
        evidence: &[(&str, &str)],
        strategy: EliminationStrategy,
    ) -> Result<Factor> {
        log::debug!("eliminating bag onto {q:?} given {evidence:?}");

        let filtered: Vec<Factor> = self
            .factors
            .iter()
            .map(|f| apply_evidence(f, evidence))
            .collect::<Result<_>>()?;

        let q_set: FxIndexSet<String> = q.iter().map(|&v| v.to_owned()).collect();
        let order = elimination_order(&filtered, &q_set, strategy);

        let mut factors = filtered;
        for x in &order {
            let (related, rest): (Vec<Factor>, Vec<Factor>) = factors
                .into_iter()
                .partition(|f| f.states().contains_key(x));
            let psi = product_all(&related)?.sum_out([x.as_str()])?;
            factors = rest;
            factors.push(psi);
        }

        let result = product_all(&factors)?;
        if q.is_empty() {
            Ok(result)
        } else {
            result.reorder_scope(q)?.sort_states()
        }
    }

    /// As [`Bag::eliminate`], but computes the final product of remaining
    /// factors in parallel via `rayon`. Same result, for bags with many
    /// large factors.
    pub fn par_eliminate(&self, q: &[&str], evidence: &[(&str, &str)]) -> Result<Factor> {
        let filtered: Vec<Factor> = self
            .factors
            .par_iter()
            .map(|f| apply_evidence(f, evidence))
            .collect::<Result<_>>()?;

        let q_set: FxIndexSet<String> = q.iter().map(|&v| v.to_owned()).collect();
        let order = elimination_order(&filtered, &q_set, EliminationStrategy::default());

        let mut factors = filtered;
        for x in &order {
            let (related, rest): (Vec<Factor>, Vec<Factor>) = factors
                .into_iter()
                .partition(|f| f.states().contains_key(x));
            let psi = par_product_all(&related)?.sum_out([x.as_str()])?;
            factors = rest;
            factors.push(psi);
        }

        let result = par_product_all(&factors)?;
        if q.is_empty() {
            Ok(result)
        } else {
            result.reorder_scope(q)?.sort_states()
        }
    }

    /// Computes a posterior P(q_dist, q_vals | e_dist, e_vals), wrapped as a
    /// [`Cpt`] tagged with the query variables.
    ///
    /// - `q_dist`: variables kept as a full distribution.
    /// - `q_vals`: variables to extract a specific state for.
    /// - `e_dist`: conditioning variables kept in scope, producing a full
    ///   conditional over them.
    /// - `e_vals`: hard evidence; a `None` state drops the entry (useful for
    ///   optional evidence passed through uniformly).
    ///
    /// # Errors
    ///
    /// [`Error::InconsistentEvidence`] if the evidence has zero probability
    /// under the network.
    pub fn compute_posterior(
        &self,
        q_dist: &[&str],
        q_vals: &[(&str, &str)],
        e_dist: &[&str],
        e_vals: &[(&str, Option<&str>)],
    ) -> Result<Cpt> {
        let e_vals: Vec<(&str, &str)> = e_vals
            .iter()
            .filter_map(|&(v, s)| s.map(|s| (v, s)))
            .collect();

        let mut query_vars: Vec<&str> = q_vals.iter().map(|&(v, _)| v).collect();
        for &v in q_dist {
            if !query_vars.contains(&v) {
                query_vars.push(v);
            }
        }

        let mut elim_q = query_vars.clone();
        for &v in e_dist {
            if !elim_q.contains(&v) {
                elim_q.push(v);
            }
        }

        let joint = self.eliminate(&elim_q, &e_vals)?.normalize()?;

        let mut result = joint;
        if !e_vals.is_empty() || !e_dist.is_empty() {
            let marginal = result.sum_out(query_vars.iter().copied())?;
            result = result.divide(&marginal).map_err(|e| match e {
                Error::ZeroMass => Error::InconsistentEvidence,
                other => other,
            })?;
        }

        let conditioned: Vec<String> = query_vars.iter().map(|v| v.to_string()).collect();

        if q_vals.is_empty() {
            return Ok(Cpt {
                factor: result,
                conditioned,
            });
        }

        match result.index(q_vals)? {
            Indexed::Scalar(v) => Ok(Cpt {
                factor: Factor::construct([v], Default::default())?,
                conditioned,
            }),
            Indexed::Factor(factor) => Ok(Cpt {
                factor,
                conditioned,
            }),
        }
    }

    /// Serializes the bag to the dict schema:
    /// `{ "type": "Bag", "name": ..., "factors": [<Factor dict>, ...] }`.
    pub fn as_dict(&self) -> Result<serde_json::Value> {
        Ok(serde_json::json!({
            "type": "Bag",
            "name": self.name,
            "factors": self
                .factors
                .iter()
                .map(Factor::as_dict)
                .collect::<Result<Vec<_>>>()?,
        }))
    }

    /// Rebuilds a bag from its dict schema.
    pub fn from_dict(value: serde_json::Value) -> Result<Self> {
        let name = value
            .get("name")
            .and_then(|v| v.as_str())
            .map(str::to_owned);
        let factors = value
            .get("factors")
            .and_then(|v| v.as_array())
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(Factor::from_json_dict)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self::new(name, factors))
    }
}

fn apply_evidence(f: &Factor, evidence: &[(&str, &str)]) -> Result<Factor> {
    let relevant: Vec<(&str, &str)> = evidence
        .iter()
        .copied()
        .filter(|&(v, _)| f.states().contains_key(v))
        .collect();
    f.keep_values(&relevant)
}

/// The product of zero factors is the scalar 1; of one factor, that factor.
fn product_all(factors: &[Factor]) -> Result<Factor> {
    let mut iter = factors.iter();
    let Some(first) = iter.next() else {
        return Factor::construct([1.], Default::default());
    };
    let mut acc = first.clone();
    for f in iter {
        acc = acc.multiply(f)?;
    }
    Ok(acc)
}

fn par_product_all(factors: &[Factor]) -> Result<Factor> {
    if factors.is_empty() {
        return Factor::construct([1.], Default::default());
    }
    factors
        .par_iter()
        .cloned()
        .map(Result::Ok)
        .reduce_with(|a, b| a?.multiply(&b?))
        .unwrap()
}

fn elimination_order(
    factors: &[Factor],
    q: &FxIndexSet<String>,
    strategy: EliminationStrategy,
) -> Vec<String> {
    let mut discovered = FxIndexSet::default();
    for f in factors {
        for v in f.scope() {
            discovered.insert(v.to_owned());
        }
    }
    let remaining: Vec<String> = discovered.into_iter().filter(|v| !q.contains(v)).collect();

    match strategy {
        EliminationStrategy::Discovery => remaining,
        EliminationStrategy::MinDegree => min_degree_order(factors, &remaining),
    }
}

fn min_degree_order(factors: &[Factor], vars: &[String]) -> Vec<String> {
    let mut adjacency: FxIndexMap<String, FxIndexSet<String>> = FxIndexMap::default();
    for v in vars {
        adjacency.insert(v.clone(), FxIndexSet::default());
    }
    for f in factors {
        let scope: Vec<&str> = f.scope().collect();
        for &a in &scope {
            for &b in &scope {
                if a != b {
                    if let Some(neighbors) = adjacency.get_mut(a) {
                        if adjacency.contains_key(b) {
                            neighbors.insert(b.to_owned());
                        }
                    }
                }
            }
        }
    }

    let mut remaining: FxIndexSet<String> = vars.iter().cloned().collect();
    let mut order = Vec::with_capacity(vars.len());
    while let Some(next) = remaining
        .iter()
        .min_by_key(|v| {
            adjacency[*v]
                .iter()
                .filter(|n| remaining.contains(*n))
                .count()
        })
        .cloned()
    {
        remaining.shift_remove(&next);
        let neighbors: Vec<String> = adjacency[&next]
            .iter()
            .filter(|n| remaining.contains(*n))
            .cloned()
            .collect();
        for a in &neighbors {
            for b in &neighbors {
                if a != b {
                    adjacency.get_mut(a).unwrap().insert(b.clone());
                }
            }
        }
        order.push(next);
    }
    order
}
