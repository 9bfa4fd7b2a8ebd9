use std::sync::Arc;

use thiserror::Error;

/// The error type for this crate.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// An evidence or index value names a state not declared for its variable.
    #[error("State `{1}` is not a valid state of variable `{0}`")]
    InvalidState(String, String),
    /// A requested variable is not present in a factor's scope.
    #[error("Variable `{0}` is not in scope")]
    NotInScope(String),
    /// Two factors disagree on the state sequence of a shared variable, or a
    /// requested scope reordering is not a permutation of the current scope.
    #[error("Scope mismatch on variable `{0}`")]
    ScopeMismatch(String),
    /// Normalization, or a posterior division, collapsed all mass to zero.
    #[error("Factor has zero total mass")]
    ZeroMass,
    /// A posterior query could not be answered because the supplied evidence
    /// has zero probability under the network.
    #[error("Evidence is inconsistent with the network")]
    InconsistentEvidence,
    /// Junction-tree construction failed to satisfy the running-intersection
    /// property for the supplied elimination order.
    #[error("Triangulation failed: {0}")]
    Triangulation(String),
    /// A factor's flat data length does not match the product of its
    /// declared state-set sizes.
    #[error("Shape mismatch: expected {expected} entries, found {found}")]
    Shape {
        /// Expected number of entries.
        expected: usize,
        /// Number of entries actually supplied.
        found: usize,
    },
    /// An error related to JSON (de)serialization of the dict schema.
    #[error(transparent)]
    Json(Arc<serde_json::Error>),
    /// An error related to ndarray shape operations.
    #[error(transparent)]
    NdarrayShape(#[from] ndarray::ShapeError),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(Arc::new(err))
    }
}

/// A specialized [`Result`] type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

impl serde::Serialize for Error {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}
