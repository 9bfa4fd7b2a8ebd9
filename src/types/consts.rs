/// Epsilon value used for normalization / zero-mass comparisons.
pub const EPSILON: f64 = 1e-8;
/// Tolerance used by [`crate::factor::Factor::equals`] for value comparison.
pub const EQUALS_EPSILON: f64 = 1e-9;
