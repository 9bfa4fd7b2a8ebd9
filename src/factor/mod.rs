//! Discrete multi-dimensional probability tables and their algebra.
//!
//! A [`Factor`] is a dense table over the Cartesian product of a set of
//! variables' state sequences. Every higher-level operation in this crate —
//! variable elimination, junction-tree message passing — compiles down to
//! the operations defined here.

mod ops;
mod serde_impl;

pub use serde_impl::{FactorDict, from_dict, to_dict};

use itertools::Itertools;
use ndarray::{Array1, ArrayD, Axis, IxDyn};

use crate::types::{EPSILON, EQUALS_EPSILON, Error, FxIndexMap, FxIndexSet, Result, States};

/// The result of indexing a [`Factor`] by a (possibly partial) assignment.
#[derive(Clone, Debug)]
pub enum Indexed {
    /// A full assignment was given: the factor collapsed to a single value.
    Scalar(f64),
    /// A partial assignment was given: the remaining scope is returned.
    Factor(Factor),
}

/// A discrete multi-dimensional probability table.
///
/// The scope of the factor — its ordered sequence of variables — is the key
/// order of its `states` map; `data` is laid out row-major over that order.
#[derive(Clone, Debug)]
pub struct Factor {
    states: States,
    shape: Array1<usize>,
    data: ArrayD<f64>,
}

impl Factor {
    /// Constructs a factor from a flat row-major data buffer and an ordered
    /// mapping of variable to state sequence.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Shape`] if `data.len()` does not match the product
    /// of the sizes of `states`' value sequences.
    pub fn construct<I>(data: I, states: States) -> Result<Self>
    where
        I: IntoIterator<Item = f64>,
    {
        let data: Vec<_> = data.into_iter().collect();
        let shape: Vec<usize> = states.values().map(|s| s.len()).collect();
        let expected = shape.iter().product();
        if data.len() != expected {
            return Err(Error::Shape {
                expected,
                found: data.len(),
            });
        }
        let data = ArrayD::from_shape_vec(IxDyn(&shape), data)?;
        Self::new(states, data)
    }

    /// Builds a factor directly from an already-shaped [`ArrayD`].
    ///
    /// The array's shape must already match the product of `states`' value
    /// sequence sizes, axis for axis in `states`' key order.
    pub fn new(states: States, data: ArrayD<f64>) -> Result<Self> {
        let shape: Array1<usize> = states.values().map(|s| s.len()).collect();
        if data.shape() != shape.as_slice().unwrap() {
            return Err(Error::Shape {
                expected: shape.iter().product(),
                found: data.len(),
            });
        }
        debug_assert!(
            data.iter().all(|&x| x >= 0.),
            "factor entries must be non-negative"
        );

        Ok(Self {
            states,
            shape,
            data,
        })
    }

    /// Scope of the factor, in its current order.
    #[inline]
    pub fn scope(&self) -> impl Iterator<Item = &str> {
        self.states.keys().map(String::as_str)
    }

    /// Number of variables in scope.
    #[inline]
    pub fn width(&self) -> usize {
        self.states.len()
    }

    /// Number of entries in the dense table.
    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the table is empty (never true for a constructed factor; a
    /// scalar factor still holds exactly one entry).
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// States of the factor, keyed in scope order.
    #[inline]
    pub const fn states(&self) -> &States {
        &self.states
    }

    /// Shape of the dense table, axis for axis with `states`.
    #[inline]
    pub const fn shape(&self) -> &Array1<usize> {
        &self.shape
    }

    /// The dense, row-major data buffer.
    #[inline]
    pub const fn data(&self) -> &ArrayD<f64> {
        &self.data
    }

    fn axis_of(&self, v: &str) -> Result<usize> {
        self.states
            .get_index_of(v)
            .ok_or_else(|| Error::NotInScope(v.to_owned()))
    }

    /// Applies a (possibly partial) assignment to the factor.
    ///
    /// If every scope variable is assigned, returns [`Indexed::Scalar`];
    /// otherwise returns the remaining sub-factor.
    ///
    /// # Errors
    ///
    /// [`Error::NotInScope`] if a named variable is not in scope,
    /// [`Error::InvalidState`] if a named state is not declared for its
    /// variable.
    pub fn index(&self, assignment: &[(&str, &str)]) -> Result<Indexed> {
        let reduced = self.reduce(assignment)?;
        if reduced.states.is_empty() {
            Ok(Indexed::Scalar(*reduced.data.iter().next().unwrap()))
        } else {
            Ok(Indexed::Factor(reduced))
        }
    }

    /// Restricts scope variables named in `assignment` to the given state,
    /// dropping them from scope. Always returns a [`Factor`] — a factor with
    /// empty scope holds a single scalar.
    ///
    /// This is `keep_values`/`set_evidence` in the data model: for evidence
    /// `(V, s)` with `V` in scope, entries for every other state of `V` are
    /// dropped.
    ///
    /// # Errors
    ///
    /// [`Error::NotInScope`] if `V` is not in scope, [`Error::InvalidState`]
    /// if `s` is not a declared state of `V`.
    pub fn keep_values(&self, assignment: &[(&str, &str)]) -> Result<Self> {
        self.reduce(assignment)
    }

    fn reduce(&self, assignment: &[(&str, &str)]) -> Result<Self> {
        let mut resolved = Vec::with_capacity(assignment.len());
        for &(v, s) in assignment {
            let axis = self.axis_of(v)?;
            let idx = self.states[v]
                .get_index_of(s)
                .ok_or_else(|| Error::InvalidState(v.to_owned(), s.to_owned()))?;
            resolved.push((axis, idx));
        }
        // Reduce axes back to front so earlier indices stay valid.
        resolved.sort_unstable_by(|a, b| b.0.cmp(&a.0));

        let mut states = self.states.clone();
        let mut data = self.data.clone();
        for (axis, idx) in resolved {
            data.index_axis_inplace(Axis(axis), idx);
            let key = states.get_index(axis).unwrap().0.clone();
            states.shift_remove(&key);
        }

        Self::new(states, data)
    }

    /// Sums out the given variables, left to right. Summing out an empty
    /// list returns a clone of `self`.
    ///
    /// # Errors
    ///
    /// [`Error::NotInScope`] if any variable is not in scope.
    pub fn sum_out<'a, I>(&self, vars: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut f = self.clone();
        for v in vars {
            f = f.sum_out_one(v)?;
        }
        Ok(f)
    }

    fn sum_out_one(&self, v: &str) -> Result<Self> {
        let axis = self.axis_of(v)?;
        let mut states = self.states.clone();
        states.shift_remove(v);
        let data = self.data.sum_axis(Axis(axis));
        Self::new(states, data)
    }

    /// Restricts the factor to the variables in `keep`, summing out the
    /// complement. Preserves the relative order of the retained variables.
    ///
    /// # Errors
    ///
    /// [`Error::NotInScope`] if any variable in `keep` is not in scope.
    pub fn project(&self, keep: &[&str]) -> Result<Self> {
        for &v in keep {
            if !self.states.contains_key(v) {
                return Err(Error::NotInScope(v.to_owned()));
            }
        }
        let complement: Vec<&str> = self
            .scope()
            .filter(|v| !keep.contains(v))
            .collect();
        self.sum_out(complement)
    }

    /// Normalizes the factor so its entries sum to 1.
    ///
    /// # Errors
    ///
    /// [`Error::ZeroMass`] if the total mass is zero.
    pub fn normalize(&self) -> Result<Self> {
        let total = self.data.sum();
        if total.abs() < EPSILON {
            return Err(Error::ZeroMass);
        }
        Self::new(self.states.clone(), &self.data / total)
    }

    /// Sorts each scope variable's state sequence lexicographically,
    /// permuting the corresponding axis of `data` to match. Scope order
    /// itself is unchanged; only the within-axis state order is sorted.
    pub fn sort_states(&self) -> Result<Self> {
        let mut states = States::default();
        let mut data = self.data.clone();
        for (axis, (v, domain)) in self.states.iter().enumerate() {
            let mut order: Vec<usize> = (0..domain.len()).collect();
            order.sort_by(|&a, &b| domain[a].cmp(&domain[b]));
            data = data.select(Axis(axis), &order);
            let sorted: FxIndexSet<String> = order.iter().map(|&i| domain[i].clone()).collect();
            states.insert(v.clone(), sorted);
        }
        Self::new(states, data)
    }

    /// Permutes the scope to match `order`, which must be a permutation of
    /// the current scope.
    ///
    /// # Errors
    ///
    /// [`Error::ScopeMismatch`] if `order` is not a permutation of scope.
    /// Reused here for a non-permutation `order` rather than its usual
    /// multiplication-disagreement sense (§7); both are "scope shape
    /// doesn't match what the caller asserted".
    pub fn reorder_scope(&self, order: &[&str]) -> Result<Self> {
        let is_permutation =
            order.len() == self.states.len() && order.iter().all(|v| self.states.contains_key(*v));
        if !is_permutation {
            return Err(Error::ScopeMismatch(order.iter().join(", ")));
        }

        let axes: Vec<usize> = order
            .iter()
            .map(|v| self.axis_of(v))
            .collect::<Result<_>>()?;
        let data = self.data.clone().permuted_axes(axes);
        let states: States = order
            .iter()
            .map(|&v| (v.to_owned(), self.states[v].clone()))
            .collect();

        Self::new(states, data)
    }

    /// Pointwise product of two factors. Result scope is the union of both
    /// scopes; shared variables broadcast against each other.
    ///
    /// # Errors
    ///
    /// [`Error::ScopeMismatch`] if a shared variable's state sequence
    /// disagrees between the two factors.
    pub fn multiply(&self, other: &Self) -> Result<Self> {
        let union = union_states(&self.states, &other.states)?;
        let lhs = broadcast_to(self, &union);
        let rhs = broadcast_to(other, &union);
        Self::new(union, lhs * rhs)
    }

    /// Pointwise sum of two factors, with the same broadcasting and
    /// alignment rules as [`Factor::multiply`].
    ///
    /// # Errors
    ///
    /// [`Error::ScopeMismatch`] if a shared variable's state sequence
    /// disagrees between the two factors.
    pub fn add(&self, other: &Self) -> Result<Self> {
        let union = union_states(&self.states, &other.states)?;
        let lhs = broadcast_to(self, &union);
        let rhs = broadcast_to(other, &union);
        Self::new(union, lhs + rhs)
    }

    /// Pointwise division, with `0 / 0 == 0`.
    ///
    /// # Errors
    ///
    /// [`Error::ScopeMismatch`] if a shared variable's state sequence
    /// disagrees. [`Error::ZeroMass`] if some entry divides a nonzero
    /// numerator by a zero denominator.
    pub fn divide(&self, other: &Self) -> Result<Self> {
        let union = union_states(&self.states, &other.states)?;
        let lhs = broadcast_to(self, &union);
        let rhs = broadcast_to(other, &union);

        // `lhs`/`rhs` carry size-1 axes for variables the other operand
        // lacks; co-broadcast to their common shape before zipping, since
        // `Zip` (unlike `Mul`/`Add`) requires equal producer shapes.
        let shape: Vec<usize> = lhs
            .shape()
            .iter()
            .zip(rhs.shape())
            .map(|(&a, &b)| a.max(b))
            .collect();
        let lhs = lhs.broadcast(shape.clone()).expect("shapes are broadcast-compatible by construction");
        let rhs = rhs.broadcast(shape).expect("shapes are broadcast-compatible by construction");

        let mut zero_mass = false;
        let data = ndarray::Zip::from(&lhs).and(&rhs).map_collect(|&l, &r| {
            if r == 0. {
                if l != 0. {
                    zero_mass = true;
                }
                0.
            } else {
                l / r
            }
        });
        if zero_mass {
            return Err(Error::ZeroMass);
        }
        Self::new(union, data)
    }

    /// Builds the empirical joint count table over `cols` from a table of
    /// rows (each row a map from column name to observed state string).
    /// States are discovered in first-occurrence order per column.
    pub fn from_data(rows: &[FxIndexMap<String, String>], cols: &[&str]) -> Result<Self> {
        let mut states = States::default();
        for &c in cols {
            states.insert(c.to_owned(), Default::default());
        }
        for row in rows {
            for &c in cols {
                let value = row
                    .get(c)
                    .ok_or_else(|| Error::NotInScope(c.to_owned()))?;
                states.get_mut(c).unwrap().insert(value.clone());
            }
        }

        let shape: Vec<usize> = states.values().map(|s| s.len()).collect();
        let mut data = ArrayD::zeros(IxDyn(&shape));
        for row in rows {
            let index: Vec<usize> = cols
                .iter()
                .map(|&c| states[c].get_index_of(&row[c]).unwrap())
                .collect();
            data[IxDyn(&index)] += 1.;
        }

        Self::new(states, data)
    }

    /// Whether two factors have the same scope (order-sensitive), the same
    /// state sequence per variable, and equal values within tolerance.
    pub fn equals(&self, other: &Self) -> bool {
        let same_scope = self.scope().eq(other.scope());
        if !same_scope {
            return false;
        }
        let same_states = self
            .states
            .iter()
            .all(|(k, v)| other.states.get(k).is_some_and(|ov| v.iter().eq(ov.iter())));
        if !same_states {
            return false;
        }
        self.data
            .iter()
            .zip(other.data.iter())
            .all(|(a, b)| (a - b).abs() < EQUALS_EPSILON)
    }
}

impl std::fmt::Display for Factor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Factor({})", self.scope().join(", "))
    }
}

fn union_states(lhs: &States, rhs: &States) -> Result<States> {
    let mut union = lhs.clone();
    for (k, v) in rhs.iter() {
        match union.get(k) {
            Some(existing) if existing.iter().eq(v.iter()) => {}
            Some(_) => return Err(Error::ScopeMismatch(k.clone())),
            None => {
                union.insert(k.clone(), v.clone());
            }
        }
    }
    union.sort_keys();
    Ok(union)
}

/// Permutes `f`'s axes into `union`'s sorted order and broadcasts in unit
/// axes for every variable present in `union` but not in `f`.
fn broadcast_to(f: &Factor, union: &States) -> ArrayD<f64> {
    let mut axes: Vec<usize> = (0..f.states.len()).collect();
    axes.sort_by_key(|&i| f.states.get_index(i).unwrap().0);
    let mut data = f.data.clone().permuted_axes(axes);

    for (i, k) in union.keys().enumerate() {
        if !f.states.contains_key(k) {
            data.insert_axis_inplace(Axis(i));
        }
    }
    data
}
