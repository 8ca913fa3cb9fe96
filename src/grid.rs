//! Parameter grid structures for 2-D sweeps.
use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::error::PseError;

/// Maximum number of characters of an object title kept in an axis label.
pub const AXIS_LABEL_LEN: usize = 25;

/// A single value a swept parameter can take.
///
/// Objects (e.g., a connectivity matrix) are opaque to the engine: only their
/// display title matters to the reduction step, never their internals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Scalar(f64),
    Vector(Vec<f64>),
    Object { title: String },
}

impl ParamValue {
    /// The label under which this value appears on a result axis.
    /// Object titles are truncated to [`AXIS_LABEL_LEN`] characters plus an ellipsis.
    pub fn axis_label(&self) -> AxisLabel {
        match self {
            ParamValue::Scalar(x) => AxisLabel::Number(*x),
            ParamValue::Vector(_) => AxisLabel::Label(self.to_string()),
            ParamValue::Object { title } => {
                let truncated: String = title.chars().take(AXIS_LABEL_LEN).collect();
                AxisLabel::Label(format!("{}...", truncated))
            }
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ParamValue::Scalar(x) => write!(f, "{}", x),
            ParamValue::Vector(v) => {
                write!(f, "[")?;
                for (i, x) in v.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", x)?;
                }
                write!(f, "]")
            }
            ParamValue::Object { title } => write!(f, "{}", title),
        }
    }
}

/// An axis entry of the final result container: either the raw scalar value
/// or a display-only label for non-scalar values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AxisLabel {
    Number(f64),
    Label(String),
}

/// One sweep axis: a named parameter and the ordered values it takes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSpec {
    pub name: String,
    pub values: Vec<ParamValue>,
}

impl ParameterSpec {
    pub fn new(name: impl Into<String>, values: Vec<ParamValue>) -> Self {
        ParameterSpec {
            name: name.into(),
            values,
        }
    }

    /// A spec over scalar values.
    pub fn scalars(name: impl Into<String>, values: &[f64]) -> Self {
        ParameterSpec {
            name: name.into(),
            values: values.iter().map(|x| ParamValue::Scalar(*x)).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// One coordinate pair of the sweep, identified by its row-major index.
#[derive(Debug, Clone, PartialEq)]
pub struct GridPoint {
    pub index: usize,
    pub value1: ParamValue,
    pub value2: ParamValue,
}

/// The full Cartesian product of two sweep axes.
///
/// Iteration is row-major: the outer loop runs over axis 1, the inner loop
/// over axis 2, so `index = i1 * len(axis2) + i2`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterGrid {
    axis1: ParameterSpec,
    axis2: ParameterSpec,
}

impl ParameterGrid {
    pub fn new(axis1: ParameterSpec, axis2: ParameterSpec) -> Result<Self, PseError> {
        if axis1.is_empty() || axis2.is_empty() {
            return Err(PseError::InvalidParameter(
                "Sweep axes must contain at least one value each".to_string(),
            ));
        }
        Ok(ParameterGrid { axis1, axis2 })
    }

    /// The total number of grid points.
    pub fn len(&self) -> usize {
        self.axis1.len() * self.axis2.len()
    }

    pub fn is_empty(&self) -> bool {
        // The constructor rejects empty axes, so this never holds.
        self.len() == 0
    }

    /// The grid shape `(len(axis1), len(axis2))`.
    pub fn shape(&self) -> (usize, usize) {
        (self.axis1.len(), self.axis2.len())
    }

    pub fn axis1(&self) -> &ParameterSpec {
        &self.axis1
    }

    pub fn axis2(&self) -> &ParameterSpec {
        &self.axis2
    }

    /// The grid point at the given row-major index.
    pub fn point(&self, index: usize) -> Option<GridPoint> {
        if index >= self.len() {
            return None;
        }
        let n2 = self.axis2.len();
        Some(GridPoint {
            index,
            value1: self.axis1.values[index / n2].clone(),
            value2: self.axis2.values[index % n2].clone(),
        })
    }

    /// An iterator over all grid points in row-major order (axis 2 fastest).
    pub fn points(&self) -> impl Iterator<Item = GridPoint> + '_ {
        self.axis1
            .values
            .iter()
            .cartesian_product(self.axis2.values.iter())
            .enumerate()
            .map(|(index, (value1, value2))| GridPoint {
                index,
                value1: value1.clone(),
                value2: value2.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_major_expansion() {
        let grid = ParameterGrid::new(
            ParameterSpec::scalars("a", &[1.0, 2.0]),
            ParameterSpec::scalars("b", &[10.0, 20.0, 30.0]),
        )
        .unwrap();

        assert_eq!(grid.len(), 6);
        assert!(!grid.is_empty());
        assert_eq!(grid.shape(), (2, 3));

        let points: Vec<GridPoint> = grid.points().collect();
        let expected = [
            (1.0, 10.0),
            (1.0, 20.0),
            (1.0, 30.0),
            (2.0, 10.0),
            (2.0, 20.0),
            (2.0, 30.0),
        ];
        for (i, (v1, v2)) in expected.iter().enumerate() {
            assert_eq!(points[i].index, i);
            assert_eq!(points[i].value1, ParamValue::Scalar(*v1));
            assert_eq!(points[i].value2, ParamValue::Scalar(*v2));
            assert_eq!(grid.point(i), Some(points[i].clone()));
        }
        assert_eq!(grid.point(6), None);
    }

    #[test]
    fn test_empty_axis_rejected() {
        let result = ParameterGrid::new(
            ParameterSpec::scalars("a", &[]),
            ParameterSpec::scalars("b", &[1.0]),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_axis_label_truncation() {
        let value = ParamValue::Object {
            title: "Connectivity of 76 regions, human cortex".to_string(),
        };
        assert_eq!(
            value.axis_label(),
            AxisLabel::Label("Connectivity of 76 region...".to_string())
        );

        let short = ParamValue::Object {
            title: "conn".to_string(),
        };
        assert_eq!(short.axis_label(), AxisLabel::Label("conn...".to_string()));

        assert_eq!(
            ParamValue::Scalar(1.5).axis_label(),
            AxisLabel::Number(1.5)
        );
    }
}
