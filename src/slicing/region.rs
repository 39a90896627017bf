//! Rectangular ROIs and line cuts drawn on a view, and their extraction.
//!
//! A region lives in the index space of its view's two free axes: points are
//! `(horizontal, vertical)` index pairs and may lie outside the array; they
//! are clamped into range at extraction time.
//!
//! Extraction always works on the view's whole input, not just the visible
//! slice: a rectangle crops the two free axes and keeps every other axis, a
//! line cut replaces the two free axes by a single "path" axis. A line cut on
//! a 4-D view therefore yields 3-D data, and chaining line cuts walks
//! 4D -> 3D -> 2D -> 1D.

use super::observers::{Observers, SubscriptionId};
use super::projector::ProjectedSlice;
use super::roles::AxisRoleAssignment;
use crate::data::axes::axis_spec;
use crate::data::{AxisCoordinateSystem, AxisTransform, Coordinates, Dataset};
use crate::error::{IauError, Result};
use ndarray::{Axis, Slice};

/// `(horizontal, vertical)` index pair, unclamped.
pub type IndexPoint = (i64, i64);

/// Label given to the axis produced by a line cut.
pub const PATH_LABEL: &str = "path";

/// Shape of a region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionKind {
    /// Axis-aligned rectangle.
    Rectangle,
    /// Line segment.
    Line,
}

impl RegionKind {
    /// Display name.
    pub fn name(self) -> &'static str {
        match self {
            Self::Rectangle => "ROI",
            Self::Line => "line cut",
        }
    }
}

/// A rectangle (two opposite corners) or a line segment (two endpoints).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    /// Rectangle spanned by two opposite corners, both inclusive.
    Rectangle { corners: [IndexPoint; 2] },
    /// Segment between two endpoints, both inclusive.
    Line { endpoints: [IndexPoint; 2] },
}

impl Region {
    /// Rectangle with opposite corners `a` and `b`.
    pub fn rectangle(a: IndexPoint, b: IndexPoint) -> Self {
        Self::Rectangle { corners: [a, b] }
    }

    /// Segment from `a` to `b`.
    pub fn line(a: IndexPoint, b: IndexPoint) -> Self {
        Self::Line { endpoints: [a, b] }
    }

    /// Region covering the full `(horizontal, vertical)` extent.
    ///
    /// Rectangles touch all four edges; lines run along the diagonal.
    pub fn full_extent(kind: RegionKind, bounds: (usize, usize)) -> Self {
        let far = (
            bounds.0.saturating_sub(1) as i64,
            bounds.1.saturating_sub(1) as i64,
        );
        match kind {
            RegionKind::Rectangle => Self::rectangle((0, 0), far),
            RegionKind::Line => Self::line((0, 0), far),
        }
    }

    /// Region from two points in display coordinates, via the inverse of the
    /// horizontal and vertical axis transforms.
    pub fn from_coordinates(
        kind: RegionKind,
        points: [(f64, f64); 2],
        transforms: (AxisTransform, AxisTransform),
    ) -> Self {
        let to_index = |(x, y): (f64, f64)| (transforms.0.to_index(x), transforms.1.to_index(y));
        let (a, b) = (to_index(points[0]), to_index(points[1]));
        match kind {
            RegionKind::Rectangle => Self::rectangle(a, b),
            RegionKind::Line => Self::line(a, b),
        }
    }

    /// Rectangle or line.
    pub fn kind(&self) -> RegionKind {
        match self {
            Self::Rectangle { .. } => RegionKind::Rectangle,
            Self::Line { .. } => RegionKind::Line,
        }
    }

    /// The two defining points.
    pub fn points(&self) -> [IndexPoint; 2] {
        match *self {
            Self::Rectangle { corners } => corners,
            Self::Line { endpoints } => endpoints,
        }
    }

    /// All four corners of a rectangle, counter-clockwise from the minimum.
    /// Lines report their endpoints twice.
    pub fn corners(&self) -> [IndexPoint; 4] {
        match *self {
            Self::Rectangle { corners: [a, b] } => {
                let (h0, h1) = (a.0.min(b.0), a.0.max(b.0));
                let (v0, v1) = (a.1.min(b.1), a.1.max(b.1));
                [(h0, v0), (h1, v0), (h1, v1), (h0, v1)]
            }
            Self::Line { endpoints: [a, b] } => [a, b, b, a],
        }
    }

    /// Same region moved by `(dh, dv)` index steps.
    pub fn translated(&self, dh: i64, dv: i64) -> Self {
        let shift = |(h, v): IndexPoint| (h.saturating_add(dh), v.saturating_add(dv));
        match *self {
            Self::Rectangle { corners: [a, b] } => Self::rectangle(shift(a), shift(b)),
            Self::Line { endpoints: [a, b] } => Self::line(shift(a), shift(b)),
        }
    }

    /// Same region with its second point moved by `(dh, dv)`.
    pub fn resized(&self, dh: i64, dv: i64) -> Self {
        let [a, b] = self.points();
        let b = (b.0.saturating_add(dh), b.1.saturating_add(dv));
        match self.kind() {
            RegionKind::Rectangle => Self::rectangle(a, b),
            RegionKind::Line => Self::line(a, b),
        }
    }
}

fn clamp_index(index: i64, len: usize) -> usize {
    let max = len.saturating_sub(1) as i64;
    index.clamp(0, max) as usize
}

/// Grid points of the segment `a..=b` (Bresenham), ordered from `a` to `b`.
///
/// The number of points is one more than the larger of the two index deltas.
pub fn line_path(a: (usize, usize), b: (usize, usize)) -> Vec<(usize, usize)> {
    let (x0, y0) = (a.0 as i64, a.1 as i64);
    let (x1, y1) = (b.0 as i64, b.1 as i64);
    let dx = (x1 - x0).abs();
    let dy = -(y1 - y0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let sy = if y0 < y1 { 1 } else { -1 };

    let mut points = Vec::with_capacity(dx.max(-dy) as usize + 1);
    let (mut x, mut y) = (x0, y0);
    let mut err = dx + dy;
    loop {
        points.push((x as usize, y as usize));
        if x == x1 && y == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x += sx;
        }
        if e2 <= dx {
            err += dx;
            y += sy;
        }
    }
    points
}

/// Extract the data under `region` from the whole of `dataset`.
///
/// `roles` names the two free axes the region is drawn over. The result is a
/// new dataset (same metadata) that can feed a child view.
///
/// A rectangle keeps every index between its corners, both ends included,
/// after clamping to the view. A line's endpoints are clamped too, and its
/// new `path` axis has `max(|dh|, |dv|) + 1` samples: both endpoints are
/// sampled, so there is one more sample than steps between them. A line whose
/// clamped endpoints coincide has no steps and fails with an empty slice
/// rather than yielding a single sample.
pub fn extract_region(
    dataset: &Dataset,
    roles: &AxisRoleAssignment,
    region: &Region,
) -> Result<Dataset> {
    if roles.ndim() != dataset.ndim() {
        return Err(IauError::ShapeMismatch(format!(
            "roles for {} axes applied to {}-dimensional data",
            roles.ndim(),
            dataset.ndim()
        )));
    }
    let h = roles.horizontal_axis();
    let v = roles.vertical_axis().ok_or_else(|| {
        IauError::InvalidRole(format!(
            "a {} needs two free axes",
            region.kind().name()
        ))
    })?;
    let (h_len, v_len) = (dataset.shape()[h], dataset.shape()[v]);
    if h_len == 0 || v_len == 0 {
        return Err(IauError::empty_slice("region drawn over an empty view"));
    }

    match *region {
        Region::Rectangle { corners: [a, b] } => {
            let h_range = clamped_range(a.0, b.0, h_len).ok_or_else(|| {
                IauError::empty_slice(format!("ROI lies outside axis {}", h))
            })?;
            let v_range = clamped_range(a.1, b.1, v_len).ok_or_else(|| {
                IauError::empty_slice(format!("ROI lies outside axis {}", v))
            })?;
            Ok(crop(dataset, (h, h_range), (v, v_range)))
        }
        Region::Line { endpoints: [a, b] } => {
            let start = (clamp_index(a.0, h_len), clamp_index(a.1, v_len));
            let end = (clamp_index(b.0, h_len), clamp_index(b.1, v_len));
            if start == end {
                return Err(IauError::empty_slice("line cut has zero length"));
            }
            line_cut(dataset, h, v, &line_path(start, end))
        }
    }
}

/// Inclusive index range covered by `[p, q]` after clamping, or `None` if the
/// interval misses the axis entirely.
fn clamped_range(p: i64, q: i64, len: usize) -> Option<(usize, usize)> {
    let (lo, hi) = (p.min(q), p.max(q));
    if hi < 0 || lo >= len as i64 {
        return None;
    }
    Some((clamp_index(lo, len), clamp_index(hi, len)))
}

fn crop(dataset: &Dataset, h: (usize, (usize, usize)), v: (usize, (usize, usize))) -> Dataset {
    let mut view = dataset.array().view();
    for &(axis, (lo, hi)) in &[h, v] {
        view.slice_axis_inplace(Axis(axis), Slice::from(lo..=hi));
    }
    let specs = dataset
        .axes()
        .axes()
        .iter()
        .enumerate()
        .map(|(axis, spec)| {
            let coords = match [h, v].iter().find(|(a, _)| *a == axis) {
                Some(&(_, (lo, hi))) => spec.coordinates().select_range(lo, hi),
                None => spec.coordinates().clone(),
            };
            axis_spec(spec.label().to_string(), coords)
        })
        .collect();

    tracing::debug!(
        "ROI crop h {:?} v {:?} -> {:?}",
        h.1,
        v.1,
        view.shape()
    );
    Dataset::from_parts(
        view.to_owned(),
        AxisCoordinateSystem::from_specs(specs),
        dataset.metadata().clone(),
    )
}

fn line_cut(dataset: &Dataset, h: usize, v: usize, path: &[(usize, usize)]) -> Result<Dataset> {
    let (lower, upper) = (h.min(v), h.max(v));
    let array = dataset.array();

    let samples: Vec<_> = path
        .iter()
        .map(|&(ph, pv)| {
            let (at_lower, at_upper) = if h < v { (ph, pv) } else { (pv, ph) };
            array
                .index_axis(Axis(upper), at_upper)
                .index_axis_move(Axis(lower), at_lower)
        })
        .collect();
    let values = ndarray::stack(Axis(lower), &samples)
        .map_err(|e| IauError::ShapeMismatch(format!("cannot assemble line cut: {}", e)))?;

    let mut specs: Vec<_> = dataset
        .axes()
        .axes()
        .iter()
        .enumerate()
        .filter(|(axis, _)| *axis != h && *axis != v)
        .map(|(_, spec)| spec.clone())
        .collect();
    let label = AxisCoordinateSystem::from_specs(specs.clone()).unique_label(PATH_LABEL);
    specs.insert(lower, axis_spec(label, Coordinates::indices(path.len())));

    tracing::debug!(
        "Line cut over axes ({}, {}) with {} samples -> {:?}",
        h,
        v,
        path.len(),
        values.shape()
    );
    Ok(Dataset::from_parts(
        values,
        AxisCoordinateSystem::from_specs(specs),
        dataset.metadata().clone(),
    ))
}

/// Lifecycle of a [`RegionSelector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectorState {
    /// No region.
    Disabled,
    /// Region shown (default or being dragged), not yet committed by the user.
    Enabled,
    /// The user finished a drag.
    Committed,
}

/// Whether an update is part of an ongoing drag or its end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionUpdate {
    /// Pointer still moving.
    Dragging,
    /// Drag finished.
    Finished,
}

/// Change notification from a [`RegionSelector`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegionEvent {
    /// Enabled with a default region.
    Enabled(Region),
    /// Moved during a drag.
    Moved(Region),
    /// Drag finished (or region re-centered).
    Committed(Region),
    /// Removed.
    Disabled,
}

/// A region drawn on a view, with its enable/drag/commit lifecycle.
#[derive(Debug)]
pub struct RegionSelector {
    kind: RegionKind,
    state: SelectorState,
    region: Option<Region>,
    observers: Observers<RegionEvent>,
}

impl RegionSelector {
    /// Disabled selector for regions of `kind`.
    pub fn new(kind: RegionKind) -> Self {
        Self {
            kind,
            state: SelectorState::Disabled,
            region: None,
            observers: Observers::default(),
        }
    }

    /// Rectangle or line.
    pub fn kind(&self) -> RegionKind {
        self.kind
    }

    /// Current lifecycle state.
    pub fn state(&self) -> SelectorState {
        self.state
    }

    /// True unless disabled.
    pub fn is_enabled(&self) -> bool {
        self.state != SelectorState::Disabled
    }

    /// Current region, if enabled.
    pub fn region(&self) -> Option<&Region> {
        self.region.as_ref()
    }

    /// Enable with a region spanning the full extent of `slice`.
    pub fn enable(&mut self, slice: &ProjectedSlice) -> Result<Region> {
        let region = Region::full_extent(self.kind, free_bounds(slice, self.kind)?);
        self.state = SelectorState::Enabled;
        self.region = Some(region);
        self.observers.notify(&RegionEvent::Enabled(region));
        Ok(region)
    }

    /// Reset the region to the full extent of `slice`; counts as a commit.
    pub fn center(&mut self, slice: &ProjectedSlice) -> Result<Region> {
        if !self.is_enabled() {
            return Err(IauError::Validation(format!(
                "{} is disabled",
                self.kind.name()
            )));
        }
        let region = Region::full_extent(self.kind, free_bounds(slice, self.kind)?);
        self.region = Some(region);
        self.state = SelectorState::Committed;
        self.observers.notify(&RegionEvent::Committed(region));
        Ok(region)
    }

    /// Replace the region during or at the end of a drag.
    pub fn update_region(&mut self, region: Region, update: RegionUpdate) -> Result<()> {
        if !self.is_enabled() {
            return Err(IauError::Validation(format!(
                "{} is disabled",
                self.kind.name()
            )));
        }
        if region.kind() != self.kind {
            return Err(IauError::Validation(format!(
                "expected a {}, got a {}",
                self.kind.name(),
                region.kind().name()
            )));
        }
        self.region = Some(region);
        match update {
            RegionUpdate::Dragging => {
                self.observers.notify(&RegionEvent::Moved(region));
            }
            RegionUpdate::Finished => {
                self.state = SelectorState::Committed;
                self.observers.notify(&RegionEvent::Committed(region));
            }
        }
        Ok(())
    }

    /// Remove the region.
    pub fn disable(&mut self) {
        let was_enabled = self.is_enabled();
        self.state = SelectorState::Disabled;
        self.region = None;
        if was_enabled {
            self.observers.notify(&RegionEvent::Disabled);
        }
    }

    /// Register a region-change callback.
    pub fn subscribe(&mut self, callback: impl FnMut(&RegionEvent) + 'static) -> SubscriptionId {
        self.observers.subscribe(callback)
    }

    /// Remove a region-change callback.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }
}

fn free_bounds(slice: &ProjectedSlice, kind: RegionKind) -> Result<(usize, usize)> {
    match slice.bounds()[..] {
        [h, v] => Ok((h, v)),
        _ => Err(IauError::InvalidRole(format!(
            "a {} needs two free axes",
            kind.name()
        ))),
    }
}
