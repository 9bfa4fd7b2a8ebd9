use std::collections::BTreeSet;

mod consts;
pub use consts::*;

mod error;
pub use error::{Error, Result};

mod states;
pub use states::*;

/// An ordered set, used for vertex and variable index sets throughout the
/// graph and elimination-order machinery.
pub type Set<T> = BTreeSet<T>;
/// A fast insertion-order-preserving map, used for per-node and per-edge
/// caches in the junction tree.
pub type Map<K, V> = FxIndexMap<K, V>;
