//! Minimal graph machinery for moralization and triangulation: an
//! adjacency-matrix-backed directed graph and its undirected counterpart.
//!
//! This is deliberately narrow compared to a general-purpose graph library —
//! it carries only what [`crate::bn`] and [`crate::junction_tree`] need:
//! parent/child queries, moralization, and a way to add fill-in edges.

mod directed;
pub use directed::DiGraph;

mod undirected;
pub use undirected::UnGraph;

use ndarray::Array2;

use crate::types::{Labels, Set};

/// A trait for graphs backed by a dense adjacency matrix over a fixed,
/// sorted set of labels.
pub trait Graph {
    /// Creates an empty graph (no edges) over the given labels.
    ///
    /// # Panics
    ///
    /// If the labels are not unique.
    fn empty<I, V>(labels: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: AsRef<str>;

    /// The graph's vertex labels, in sorted order.
    fn labels(&self) -> &Labels;

    /// Looks up a vertex's index by label.
    ///
    /// # Panics
    ///
    /// If the label does not exist.
    fn label_to_index<V>(&self, x: &V) -> usize
    where
        V: AsRef<str>;

    /// Looks up a vertex's label by index.
    ///
    /// # Panics
    ///
    /// If the index is out of bounds.
    fn index_to_label(&self, x: usize) -> &str;

    /// The set of vertex indices.
    fn vertices(&self) -> Set<usize>;

    /// Whether a vertex index exists.
    fn has_vertex(&self, x: usize) -> bool;

    /// The set of edges, as index pairs.
    fn edges(&self) -> Set<(usize, usize)>;

    /// Whether an edge exists between `x` and `y`.
    ///
    /// # Panics
    ///
    /// If either vertex is out of bounds.
    fn has_edge(&self, x: usize, y: usize) -> bool;

    /// Adds an edge between `x` and `y`, returning whether it was newly
    /// added.
    ///
    /// # Panics
    ///
    /// If either vertex is out of bounds.
    fn add_edge(&mut self, x: usize, y: usize) -> bool;

    /// Builds a graph from labels and an adjacency matrix.
    ///
    /// # Panics
    ///
    /// If the matrix is not square, or its dimension does not match the
    /// number of labels.
    fn from_adjacency_matrix(labels: Labels, adjacency_matrix: Array2<bool>) -> Self;

    /// The graph's adjacency matrix, row/column-indexed as `labels()`.
    fn to_adjacency_matrix(&self) -> Array2<bool>;
}
