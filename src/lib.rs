#![warn(missing_docs)]
//! # BayesInfer
//!
//! Exact probabilistic inference on discrete Bayesian networks.
//!
//! The crate decomposes into four pieces, leaves-first: [`factor`], the
//! dense multi-dimensional probability table algebra every higher operation
//! compiles down to; [`bag`], one-shot variable elimination over a flat set
//! of factors; [`junction_tree`], a persistent cluster tree that amortizes
//! repeated queries under changing evidence; and [`bn`], the narrow
//! interface a Bayesian network must expose to be consumed by the other
//! two, plus a concrete categorical implementation of it. [`graphs`]
//! supplies the directed/undirected adjacency-matrix machinery `bn` and
//! `junction_tree` build on for moralization and triangulation.

/// A named, flat collection of factors supporting one-shot variable
/// elimination.
pub mod bag;
/// The narrow Bayesian-network interface consumed by [`bag`] and
/// [`junction_tree`], plus a concrete categorical implementation.
pub mod bn;
/// Discrete multi-dimensional probability tables and their algebra.
pub mod factor;
/// Directed/undirected adjacency-matrix graphs, for moralization and
/// triangulation.
pub mod graphs;
/// Junction-tree message passing over a Bayesian network.
pub mod junction_tree;
/// Support types: errors, collection aliases, numeric constants.
pub mod types;
