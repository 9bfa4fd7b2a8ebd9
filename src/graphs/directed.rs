use std::collections::VecDeque;

use ndarray::Array2;
use serde::{
    Deserialize, Deserializer, Serialize, Serializer,
    de::{Error as DeError, MapAccess, Visitor},
    ser::SerializeMap,
};

use super::{Graph, UnGraph};
use crate::types::{Labels, Set};

/// A directed graph over a fixed, sorted set of labels, backed by a dense
/// adjacency matrix.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct DiGraph {
    labels: Labels,
    adjacency_matrix: Array2<bool>,
}

impl DiGraph {
    /// The parents of a set of vertices.
    ///
    /// # Panics
    ///
    /// If any vertex is out of bounds.
    pub fn parents(&self, x: &Set<usize>) -> Set<usize> {
        x.iter().for_each(|&v| {
            assert!(v < self.labels.len(), "Vertex `{v}` is out of bounds");
        });

        x.iter()
            .flat_map(|&v| {
                self.adjacency_matrix
                    .column(v)
                    .into_iter()
                    .enumerate()
                    .filter_map(|(y, &has_edge)| has_edge.then_some(y))
            })
            .collect()
    }

    /// The ancestors of a set of vertices.
    ///
    /// # Panics
    ///
    /// If any vertex is out of bounds.
    pub fn ancestors(&self, x: &Set<usize>) -> Set<usize> {
        let mut stack: VecDeque<usize> = x.iter().copied().collect();
        let mut visited = Set::new();

        while let Some(y) = stack.pop_back() {
            for z in self.parents(&Set::from([y])) {
                if visited.insert(z) {
                    stack.push_back(z);
                }
            }
        }
        visited
    }

    /// The children of a set of vertices.
    ///
    /// # Panics
    ///
    /// If any vertex is out of bounds.
    pub fn children(&self, x: &Set<usize>) -> Set<usize> {
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

    /// Moralizes the graph: drops edge direction, then marries every pair
    /// of parents sharing a common child.
    pub fn moralize(&self) -> UnGraph {
        let mut moral = UnGraph::empty(self.labels.iter().cloned());
        for (x, y) in self.edges() {
            moral.add_edge(x, y);
        }
        for v in self.vertices() {
            let parents: Vec<usize> = self.parents(&Set::from([v])).into_iter().collect();
            for (i, &p) in parents.iter().enumerate() {
                for &q in &parents[i + 1..] {
                    moral.add_edge(p, q);
                }
            }
        }
        moral
    }
}

impl Graph for DiGraph {
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
            .filter_map(|((x, y), &has_edge)| has_edge.then_some((x, y)))
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
        if self.adjacency_matrix[[x, y]] {
            return false;
        }
        self.adjacency_matrix[[x, y]] = true;
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

impl Serialize for DiGraph {
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

impl<'de> Deserialize<'de> for DiGraph {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(field_identifier, rename_all = "snake_case")]
        enum Field {
            Labels,
            Edges,
        }

        struct DiGraphVisitor;

        impl<'de> Visitor<'de> for DiGraphVisitor {
            type Value = DiGraph;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                formatter.write_str("struct DiGraph")
            }

            fn visit_map<V>(self, mut map: V) -> Result<DiGraph, V::Error>
            where
                V: MapAccess<'de>,
            {
                let mut labels = None;
                let mut edges = None;

                while let Some(key) = map.next_key()? {
                    match key {
                        Field::Labels => labels = Some(map.next_value()?),
                        Field::Edges => edges = Some(map.next_value()?),
                    }
                }

                let labels: Labels = labels.ok_or_else(|| DeError::missing_field("labels"))?;
                let edges: Vec<(String, String)> = edges.ok_or_else(|| DeError::missing_field("edges"))?;

                let shape = (labels.len(), labels.len());
                let mut adjacency_matrix = Array2::from_elem(shape, false);
                for (x, y) in edges {
                    let x = labels
                        .get_index_of(&x)
                        .ok_or_else(|| DeError::custom(format!("Vertex `{x}` label does not exist")))?;
                    let y = labels
                        .get_index_of(&y)
                        .ok_or_else(|| DeError::custom(format!("Vertex `{y}` label does not exist")))?;
                    adjacency_matrix[(x, y)] = true;
                }

                Ok(DiGraph::from_adjacency_matrix(labels, adjacency_matrix))
            }
        }

        const FIELDS: &[&str] = &["labels", "edges"];
        deserializer.deserialize_struct("DiGraph", FIELDS, DiGraphVisitor)
    }
}
