//! Transpose + fixed-index selection down to a displayable slice.

use super::roles::AxisRoleAssignment;
use crate::data::{AxisTransform, Dataset};
use crate::error::{IauError, Result};
use ndarray::{ArrayD, Axis, IxDyn};

/// A 2-D (or 1-D) slice ready for display.
///
/// `values[[h, v]]` is the element at horizontal index `h` and vertical
/// index `v`. Replaced wholesale on every recomputation.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectedSlice {
    /// Slice values; axis 0 is horizontal, axis 1 (if present) is vertical.
    pub values: ArrayD<f64>,
    /// Display coordinate of index 0 along each free axis.
    pub origin: Vec<f64>,
    /// Display coordinate step along each free axis.
    pub scale: Vec<f64>,
    /// Permutation that moves the fixed axes first and the free axes last.
    pub axis_order: Vec<usize>,
    /// Data axes shown horizontally / vertically.
    pub free_axes: Vec<usize>,
    /// Labels of the free axes.
    pub labels: Vec<String>,
}

impl ProjectedSlice {
    /// Lengths along the free axes.
    pub fn bounds(&self) -> Vec<usize> {
        self.values.shape().to_vec()
    }

    /// Value at free-axis indices, if in range.
    pub fn get(&self, index: &[usize]) -> Option<f64> {
        self.values.get(IxDyn(index)).copied()
    }

    /// `(origin, scale)` of one free axis.
    pub fn transform(&self, free: usize) -> Option<AxisTransform> {
        Some(AxisTransform {
            origin: *self.origin.get(free)?,
            scale: *self.scale.get(free)?,
        })
    }

    /// Number of free axes (1 or 2).
    pub fn ndim(&self) -> usize {
        self.values.ndim()
    }
}

/// Produces [`ProjectedSlice`]s from a dataset and a role assignment.
#[derive(Debug, Clone, Copy, Default)]
pub struct SliceProjector;

impl SliceProjector {
    /// Project `dataset` according to `roles`.
    ///
    /// Fixed axes are moved to the front in ascending order and the free axes
    /// to the back in ascending order; each fixed axis is then indexed away.
    /// When the horizontal axis comes after the vertical one in the data, the
    /// remaining 2-D block is transposed so that axis 0 is always horizontal.
    ///
    /// Fails with `EmptySlice` if a free axis has no elements or a fixed index
    /// falls outside a (zero-length) axis.
    pub fn project(dataset: &Dataset, roles: &AxisRoleAssignment) -> Result<ProjectedSlice> {
        let array = dataset.array();
        if roles.ndim() != array.ndim() {
            return Err(IauError::ShapeMismatch(format!(
                "roles for {} axes applied to {}-dimensional data",
                roles.ndim(),
                array.ndim()
            )));
        }

        let fixed = roles.fixed_axes();
        let free = roles.free_axes();
        let mut natural_free = free.clone();
        natural_free.sort_unstable();

        let mut order: Vec<usize> = fixed.iter().map(|&(axis, _)| axis).collect();
        order.extend(&natural_free);

        for &axis in &free {
            if array.len_of(Axis(axis)) == 0 {
                return Err(IauError::empty_slice(format!(
                    "free axis {} has no elements",
                    axis
                )));
            }
        }

        let mut view = array.view().permuted_axes(IxDyn(&order));
        for &(axis, index) in &fixed {
            let len = array.len_of(Axis(axis));
            if index >= len {
                return Err(IauError::empty_slice(format!(
                    "fixed index {} outside axis {} of length {}",
                    index, axis, len
                )));
            }
            view = view.index_axis_move(Axis(0), index);
        }

        let transposed = free.len() == 2 && free[0] > free[1];
        if transposed {
            view = view.reversed_axes();
        }
        let values = view.to_owned();

        let mut axis_order: Vec<usize> = fixed.iter().map(|&(axis, _)| axis).collect();
        axis_order.extend(&free);

        let axes = dataset.axes();
        let mut origin = Vec::with_capacity(free.len());
        let mut scale = Vec::with_capacity(free.len());
        let mut labels = Vec::with_capacity(free.len());
        for &axis in &free {
            let t = axes.coordinate_to_screen_transform(axis)?;
            origin.push(t.origin);
            scale.push(t.scale);
            labels.push(axes.axis(axis)?.label().to_string());
        }

        tracing::debug!(
            "Projected {:?} -> {:?} (free {:?}, transposed {})",
            array.shape(),
            values.shape(),
            free,
            transposed
        );

        Ok(ProjectedSlice {
            values,
            origin,
            scale,
            axis_order,
            free_axes: free,
            labels,
        })
    }
}
