//! Small shared helpers.
//!
//! JSON has no NaN literal, so persisted metric values map NaN to `null` and
//! back. These helpers keep that mapping in one place.
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// NaN entries become `None`, ready for JSON serialization.
pub fn to_nullable(values: &[f64]) -> Vec<Option<f64>> {
    values
        .iter()
        .map(|x| if x.is_nan() { None } else { Some(*x) })
        .collect()
}

/// Inverse of [`to_nullable`]: `null` entries become NaN sentinels.
pub fn from_nullable(values: Vec<Option<f64>>) -> Vec<f64> {
    values
        .into_iter()
        .map(|x| x.unwrap_or(f64::NAN))
        .collect()
}

/// Serde adapter for a `[metric][x][y]` cube with possible NaN entries.
pub mod nan_cube {
    use super::*;

    pub fn serialize<S: Serializer>(
        cube: &Vec<Vec<Vec<f64>>>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let nullable: Vec<Vec<Vec<Option<f64>>>> = cube
            .iter()
            .map(|plane| plane.iter().map(|row| to_nullable(row)).collect())
            .collect();
        nullable.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<Vec<Vec<f64>>>, D::Error> {
        let nullable = Vec::<Vec<Vec<Option<f64>>>>::deserialize(deserializer)?;
        Ok(nullable
            .into_iter()
            .map(|plane| plane.into_iter().map(from_nullable).collect())
            .collect())
    }
}
