//! Scalar algebra on [`Factor`].
//!
//! Factor-by-factor multiplication, addition and division are exposed as
//! fallible methods (`multiply`, `add`, `divide`) rather than `std::ops`
//! trait impls, since scope mismatches must propagate as
//! [`crate::types::Error::ScopeMismatch`] rather than panic. Scalar
//! broadcasting never fails, so it is exposed through the usual operator
//! traits.

use std::ops::{Div, Mul};

use super::Factor;

impl Mul<f64> for &Factor {
    type Output = Factor;

    fn mul(self, rhs: f64) -> Self::Output {
        Factor {
            states: self.states.clone(),
            shape: self.shape.clone(),
            data: &self.data * rhs,
        }
    }
}

impl Mul<&Factor> for f64 {
    type Output = Factor;

    fn mul(self, rhs: &Factor) -> Self::Output {
        rhs * self
    }
}

impl Div<f64> for &Factor {
    type Output = Factor;

    fn div(self, rhs: f64) -> Self::Output {
        Factor {
            states: self.states.clone(),
            shape: self.shape.clone(),
            data: &self.data / rhs,
        }
    }
}
