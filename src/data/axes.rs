//! Per-axis coordinates, labels and the coordinate-to-screen mapping.

use crate::error::{IauError, Result};
use std::collections::HashSet;

/// Coordinate values along one axis.
#[derive(Debug, Clone, PartialEq)]
pub enum Coordinates {
    /// Numeric positions (energies, momenta, angles, ...).
    Numeric(Vec<f64>),
    /// Categorical labels, displayed by index.
    Categorical(Vec<String>),
}

impl Coordinates {
    /// Synthetic `0..len` positions.
    pub fn indices(len: usize) -> Self {
        Self::Numeric((0..len).map(|i| i as f64).collect())
    }

    /// Number of coordinate values.
    pub fn len(&self) -> usize {
        match self {
            Self::Numeric(v) => v.len(),
            Self::Categorical(v) => v.len(),
        }
    }

    /// True if there are no values.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Numeric values, if this axis is numeric.
    pub fn as_numeric(&self) -> Option<&[f64]> {
        match self {
            Self::Numeric(v) => Some(v),
            Self::Categorical(_) => None,
        }
    }

    /// Coordinates for the inclusive index range `lo..=hi`.
    pub fn select_range(&self, lo: usize, hi: usize) -> Self {
        match self {
            Self::Numeric(v) => Self::Numeric(v[lo..=hi].to_vec()),
            Self::Categorical(v) => Self::Categorical(v[lo..=hi].to_vec()),
        }
    }

    /// Display string for the value at `index`.
    ///
    /// Numeric values are rounded to 5 decimal places.
    pub fn value_label(&self, index: usize) -> Option<String> {
        match self {
            Self::Numeric(v) => v.get(index).map(|&x| format_coordinate(x)),
            Self::Categorical(v) => v.get(index).cloned(),
        }
    }
}

fn format_coordinate(x: f64) -> String {
    let rounded = (x * 1e5).round() / 1e5;
    // avoid "-0"
    if rounded == 0.0 {
        "0".to_string()
    } else {
        format!("{}", rounded)
    }
}

/// True iff consecutive differences are all non-negative or all non-positive.
///
/// NaN differences make a sequence non-monotonic.
pub fn is_monotonic(values: &[f64]) -> bool {
    let mut non_decreasing = true;
    let mut non_increasing = true;
    for w in values.windows(2) {
        let d = w[1] - w[0];
        non_decreasing &= d >= 0.0;
        non_increasing &= d <= 0.0;
    }
    non_decreasing || non_increasing
}

/// Affine mapping between array index and display coordinate along one axis.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisTransform {
    /// Coordinate of index 0.
    pub origin: f64,
    /// Coordinate delta per index step.
    pub scale: f64,
}

impl AxisTransform {
    /// Plain index display: origin 0, scale 1.
    pub const IDENTITY: Self = Self {
        origin: 0.0,
        scale: 1.0,
    };

    /// Coordinate of an array index.
    pub fn to_coordinate(&self, index: f64) -> f64 {
        self.origin + index * self.scale
    }

    /// Nearest array index of a coordinate. Not clamped.
    pub fn to_index(&self, coordinate: f64) -> i64 {
        let idx = ((coordinate - self.origin) / self.scale).round();
        if idx.is_nan() {
            0
        } else {
            // saturating float->int conversion
            idx as i64
        }
    }
}

/// Description of one data axis. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisSpec {
    label: String,
    coordinates: Coordinates,
    monotonic: bool,
}

impl AxisSpec {
    fn new(label: String, coordinates: Coordinates) -> Self {
        let monotonic = match &coordinates {
            Coordinates::Numeric(v) => is_monotonic(v),
            Coordinates::Categorical(_) => false,
        };
        Self {
            label,
            coordinates,
            monotonic,
        }
    }

    /// Axis label.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Coordinate values.
    pub fn coordinates(&self) -> &Coordinates {
        &self.coordinates
    }

    /// Number of positions along the axis.
    pub fn len(&self) -> usize {
        self.coordinates.len()
    }

    /// True for a zero-length axis.
    pub fn is_empty(&self) -> bool {
        self.coordinates.is_empty()
    }

    /// Whether the numeric coordinates are monotonic. Always false for categorical axes.
    pub fn monotonic(&self) -> bool {
        self.monotonic
    }

    /// Origin and per-index step used to place this axis on screen.
    ///
    /// Categorical or non-monotonic axes fall back to index display. Spacing is
    /// taken from the first two coordinates only: non-uniform spacing is not
    /// represented. A zero or non-finite step also falls back to index display
    /// since it cannot be inverted.
    pub fn transform(&self) -> AxisTransform {
        let values = match self.coordinates.as_numeric() {
            Some(v) if self.monotonic => v,
            _ => return AxisTransform::IDENTITY,
        };
        match values {
            [] => AxisTransform::IDENTITY,
            [first] => AxisTransform {
                origin: *first,
                scale: 1.0,
            },
            [first, second, ..] => {
                let scale = second - first;
                if scale == 0.0 || !scale.is_finite() || !first.is_finite() {
                    AxisTransform::IDENTITY
                } else {
                    AxisTransform {
                        origin: *first,
                        scale,
                    }
                }
            }
        }
    }
}

/// Labels, coordinates and monotonicity of every axis of a dataset.
#[derive(Debug, Clone, PartialEq)]
pub struct AxisCoordinateSystem {
    axes: Vec<AxisSpec>,
}

impl AxisCoordinateSystem {
    /// Build and validate against an array shape.
    pub fn build(
        shape: &[usize],
        coordinates: Vec<Coordinates>,
        labels: Vec<String>,
    ) -> Result<Self> {
        if coordinates.len() != shape.len() {
            return Err(IauError::InvalidShape(format!(
                "{} coordinate lists for {}-dimensional data",
                coordinates.len(),
                shape.len()
            )));
        }
        for (axis, (coords, &len)) in coordinates.iter().zip(shape).enumerate() {
            if coords.len() != len {
                return Err(IauError::InvalidShape(format!(
                    "axis {} has {} coordinates but length {}",
                    axis,
                    coords.len(),
                    len
                )));
            }
        }
        if labels.len() != shape.len() {
            return Err(IauError::InvalidLabels(format!(
                "{} labels for {}-dimensional data",
                labels.len(),
                shape.len()
            )));
        }
        let mut seen = HashSet::new();
        for label in &labels {
            if !seen.insert(label.as_str()) {
                return Err(IauError::InvalidLabels(format!(
                    "label '{}' is not unique",
                    label
                )));
            }
        }

        let axes = labels
            .into_iter()
            .zip(coordinates)
            .map(|(label, coords)| AxisSpec::new(label, coords))
            .collect();
        Ok(Self { axes })
    }

    pub(crate) fn from_specs(axes: Vec<AxisSpec>) -> Self {
        Self { axes }
    }

    /// Number of axes.
    pub fn ndim(&self) -> usize {
        self.axes.len()
    }

    /// Axis lengths.
    pub fn shape(&self) -> Vec<usize> {
        self.axes.iter().map(AxisSpec::len).collect()
    }

    /// All axes in order.
    pub fn axes(&self) -> &[AxisSpec] {
        &self.axes
    }

    /// One axis.
    pub fn axis(&self, axis: usize) -> Result<&AxisSpec> {
        self.axes.get(axis).ok_or(IauError::InvalidAxis {
            axis,
            ndim: self.axes.len(),
        })
    }

    /// Axis labels in order.
    pub fn labels(&self) -> Vec<&str> {
        self.axes.iter().map(AxisSpec::label).collect()
    }

    /// Position of the axis with this label.
    pub fn position(&self, label: &str) -> Option<usize> {
        self.axes.iter().position(|a| a.label == label)
    }

    /// Whether an axis has monotonic numeric coordinates.
    pub fn monotonic(&self, axis: usize) -> Result<bool> {
        Ok(self.axis(axis)?.monotonic())
    }

    /// `(origin, scale)` used to display an axis.
    pub fn coordinate_to_screen_transform(&self, axis: usize) -> Result<AxisTransform> {
        Ok(self.axis(axis)?.transform())
    }

    /// Display string of a coordinate.
    pub fn value_label(&self, axis: usize, index: usize) -> Result<String> {
        let spec = self.axis(axis)?;
        spec.coordinates
            .value_label(index)
            .ok_or(IauError::InvalidIndex {
                axis,
                index,
                len: spec.len(),
            })
    }

    /// A label not used by any axis, derived from `base`.
    pub fn unique_label(&self, base: &str) -> String {
        if self.position(base).is_none() {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{}_{}", base, n))
            .find(|candidate| self.position(candidate).is_none())
            .unwrap_or_else(|| base.to_string())
    }
}

pub(crate) fn axis_spec(label: String, coordinates: Coordinates) -> AxisSpec {
    AxisSpec::new(label, coordinates)
}
