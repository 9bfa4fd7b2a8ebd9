//! The dict serialization schema:
//!
//! ```json
//! { "type": "Factor", "scope": [v1, v2, ...], "states": {v1: [...], ...}, "data": [f64, ...] }
//! ```
//!
//! `data` is the row-major flattening over `scope` order; `scope` carries
//! the authoritative variable order since a JSON object's key order is not
//! semantically significant.

use serde::{Deserialize, Serialize, de::Error as _};

use super::Factor;
use crate::types::{Error, FxIndexSet, Result, States};

/// The wire representation of a [`Factor`], matching the dict schema.
#[derive(Serialize, Deserialize)]
pub struct FactorDict {
    #[serde(rename = "type")]
    ty: String,
    scope: Vec<String>,
    states: std::collections::HashMap<String, FxIndexSet<String>>,
    data: Vec<f64>,
}

/// Converts a factor to its dict representation.
pub fn to_dict(factor: &Factor) -> FactorDict {
    FactorDict {
        ty: "Factor".to_owned(),
        scope: factor.scope().map(str::to_owned).collect(),
        states: factor
            .states()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect(),
        data: factor.data().iter().copied().collect(),
    }
}

/// Rebuilds a factor from its dict representation.
///
/// # Errors
///
/// [`Error::Shape`] if `data`'s length does not match the product of state
/// set sizes for `scope`.
pub fn from_dict(dict: FactorDict) -> Result<Factor> {
    let mut states = States::default();
    for v in &dict.scope {
        let domain = dict
            .states
            .get(v)
            .cloned()
            .ok_or_else(|| Error::NotInScope(v.clone()))?;
        states.insert(v.clone(), domain);
    }
    Factor::construct(dict.data, states)
}

impl Serialize for Factor {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        to_dict(self).serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Factor {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let dict = FactorDict::deserialize(deserializer)?;
        from_dict(dict).map_err(D::Error::custom)
    }
}

impl Factor {
    /// Serializes the factor to the dict schema, as a [`serde_json::Value`].
    pub fn as_dict(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Rebuilds a factor from its dict schema.
    ///
    /// # Errors
    ///
    /// Propagates [`Error::Json`] on a malformed dict, or [`Error::Shape`]
    /// if `data` does not match the declared state sizes.
    pub fn from_json_dict(value: serde_json::Value) -> Result<Self> {
        Ok(serde_json::from_value(value)?)
    }
}
