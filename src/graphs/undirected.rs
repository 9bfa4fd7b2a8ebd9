use ndarray::Array2;
use serde::{Serialize, Serializer, ser::SerializeMap};

use super::Graph;
use crate::types::{Labels, Set};

/// An undirected graph over a fixed, sorted set of labels, backed by a
/// dense, symmetric adjacency matrix.
#[derive(Clone, Debug)]
pub struct UnGraph {
    labels: Labels,
    adjacency_matrix: Array2<bool>,
}

impl UnGraph {
    /// The neighbors of a set of vertices.
    ///
    /// # Panics
    ///
    /// If any vertex is out of bounds.
    pub fn neighbors(&self, x: &Set<usize>) -> Set<usize> {
        x.iter().for_each(|&v| {
            assert!(v < self.labels.len(), "Vertex `{v}` is out of bounds");
        });

        x.iter()
            .flat_map(|&v| {
                self.adjacency_matrix
                    .row(v)
                    .into_iter()
                    .enumerate()
                    .filter_map(|(y, &has_edge)| has_edge.then_some(y))
            })
            .collect()
    }
}

impl Graph for UnGraph {
    fn empty<I, V>(labels: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: AsRef<str>,
    {
        let mut n = 0;
        let mut labels: Labels = labels
            .into_iter()
            .inspect(|_| n += 1)
            .map(|x| x.as_ref().to_owned())
            .collect();
        assert_eq!(labels.len(), n, "Labels must be unique.");
        labels.sort();

        Self {
            adjacency_matrix: Array2::from_elem((n, n), false),
            labels,
        }
    }

    fn labels(&self) -> &Labels {
        &self.labels
    }

    fn label_to_index<V>(&self, x: &V) -> usize
    where
        V: AsRef<str>,
    {
        let x = x.as_ref();
        self.labels
            .get_index_of(x)
            .unwrap_or_else(|| panic!("Vertex `{x}` label does not exist"))
    }

    fn index_to_label(&self, x: usize) -> &str {
        self.labels
            .get_index(x)
            .unwrap_or_else(|| panic!("Vertex `{x}` is out of bounds"))
    }

    fn vertices(&self) -> Set<usize> {
        (0..self.labels.len()).collect()
    }

    fn has_vertex(&self, x: usize) -> bool {
        x < self.labels.len()
    }

    fn edges(&self) -> Set<(usize, usize)> {
        self.adjacency_matrix
            .indexed_iter()
            .filter_map(|((x, y), &has_edge)| (has_edge && x <= y).then_some((x, y)))
            .collect()
    }

    fn has_edge(&self, x: usize, y: usize) -> bool {
        assert!(x < self.labels.len(), "Vertex `{x}` is out of bounds");
        assert!(y < self.labels.len(), "Vertex `{y}` is out of bounds");
        self.adjacency_matrix[[x, y]]
    }

    fn add_edge(&mut self, x: usize, y: usize) -> bool {
        assert!(x < self.labels.len(), "Vertex `{x}` is out of bounds");
        assert!(y < self.labels.len(), "Vertex `{y}` is out of bounds");
        if x == y || self.adjacency_matrix[[x, y]] {
            return false;
        }
        self.adjacency_matrix[[x, y]] = true;
        self.adjacency_matrix[[y, x]] = true;
        true
    }

    fn from_adjacency_matrix(labels: Labels, adjacency_matrix: Array2<bool>) -> Self {
        assert_eq!(
            labels.len(),
            adjacency_matrix.nrows(),
            "Number of labels must match the number of rows in the adjacency matrix."
        );
        assert_eq!(
            adjacency_matrix.nrows(),
            adjacency_matrix.ncols(),
            "Adjacency matrix must be square."
        );
        assert_eq!(
            adjacency_matrix,
            adjacency_matrix.t(),
            "Adjacency matrix must be symmetric."
        );

        Self {
            labels,
            adjacency_matrix,
        }
    }

    #[inline]
    fn to_adjacency_matrix(&self) -> Array2<bool> {
        self.adjacency_matrix.clone()
    }
}

impl Serialize for UnGraph {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let edges: Vec<_> = self
            .edges()
            .into_iter()
            .map(|(x, y)| (self.index_to_label(x).to_owned(), self.index_to_label(y).to_owned()))
            .collect();

        let mut map = serializer.serialize_map(Some(2))?;
        map.serialize_entry("labels", &self.labels)?;
        map.serialize_entry("edges", &edges)?;
        map.end()
    }
}
