//! In-memory dataset: array, axes and metadata.

use super::axes::{AxisCoordinateSystem, Coordinates};
use crate::error::{IauError, Result};
use ndarray::ArrayD;
use std::collections::BTreeMap;

/// Free-form metadata. Values are JSON scalars (string, number, bool, null).
pub type Metadata = BTreeMap<String, serde_json::Value>;

/// Reject metadata values that are arrays or objects.
pub fn validate_metadata(metadata: &Metadata) -> Result<()> {
    for (key, value) in metadata {
        if value.is_array() || value.is_object() {
            return Err(IauError::Validation(format!(
                "metadata value for '{}' must be a scalar or string",
                key
            )));
        }
    }
    Ok(())
}

/// A labeled N-dimensional array. Immutable once built; share it with `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    array: ArrayD<f64>,
    axes: AxisCoordinateSystem,
    metadata: Metadata,
}

impl Dataset {
    /// Build a dataset, validating coordinates and labels against the array shape.
    pub fn new(
        array: ArrayD<f64>,
        coordinates: Vec<Coordinates>,
        labels: Vec<String>,
        metadata: Metadata,
    ) -> Result<Self> {
        if array.ndim() == 0 {
            return Err(IauError::InvalidShape(
                "zero-dimensional arrays cannot be sliced".to_string(),
            ));
        }
        let axes = AxisCoordinateSystem::build(array.shape(), coordinates, labels)?;
        validate_metadata(&metadata)?;
        Ok(Self {
            array,
            axes,
            metadata,
        })
    }

    /// Dataset with index coordinates and `axis_<i>` labels.
    pub fn from_array(array: ArrayD<f64>) -> Result<Self> {
        let shape = array.shape().to_vec();
        let coordinates = shape.iter().map(|&n| Coordinates::indices(n)).collect();
        let labels = (0..shape.len()).map(|i| format!("axis_{}", i)).collect();
        Self::new(array, coordinates, labels, Metadata::new())
    }

    /// Assemble from parts already known to agree (derived datasets).
    pub(crate) fn from_parts(
        array: ArrayD<f64>,
        axes: AxisCoordinateSystem,
        metadata: Metadata,
    ) -> Self {
        debug_assert_eq!(array.shape(), axes.shape().as_slice());
        Self {
            array,
            axes,
            metadata,
        }
    }

    /// The values.
    pub fn array(&self) -> &ArrayD<f64> {
        &self.array
    }

    /// Axis descriptions.
    pub fn axes(&self) -> &AxisCoordinateSystem {
        &self.axes
    }

    /// Metadata mapping.
    pub fn metadata(&self) -> &Metadata {
        &self.metadata
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.array.ndim()
    }

    /// Array shape.
    pub fn shape(&self) -> &[usize] {
        self.array.shape()
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.array.len()
    }

    /// True if any axis has length zero.
    pub fn is_empty(&self) -> bool {
        self.array.is_empty()
    }

    /// Minimum and maximum over the finite values.
    pub fn min_max(&self) -> Option<(f64, f64)> {
        finite_min_max(self.array.iter().copied())
    }

    /// Coordinate lists in axis order.
    pub fn coordinate_lists(&self) -> Vec<Coordinates> {
        self.axes
            .axes()
            .iter()
            .map(|a| a.coordinates().clone())
            .collect()
    }

    /// Axis labels in axis order.
    pub fn labels(&self) -> Vec<String> {
        self.axes.labels().into_iter().map(String::from).collect()
    }
}

/// Minimum and maximum of the finite values, if there are any.
pub fn finite_min_max(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    values
        .filter(|v| v.is_finite())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((min, max)) => Some((min.min(v), max.max(v))),
        })
}
