//! Chained views: each stage shows the region extracted from its parent.
//!
//! The root stage views the loaded dataset. Every other stage is attached to
//! a parent and owns the [`RegionSelector`] drawn on that parent's view; its
//! input is the parent's latest extraction under that region. Stages form a
//! tree (several ROIs may hang off one view).
//!
//! Updates run parent before child. A drag recomputes only the stage whose
//! region moved and marks its children stale; a commit cascades through every
//! enabled descendant. Reads refresh stale ancestors first, so a stage is
//! never observed with data older than its parent's last change.

use super::observers::{Observers, SubscriptionId};
use super::projector::{ProjectedSlice, SliceProjector};
use super::region::{extract_region, Region, RegionKind, RegionSelector, RegionUpdate};
use super::roles::{AxisRole, AxisRoleAssignment};
use crate::data::Dataset;
use crate::error::{IauError, Result};
use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

/// Handle to a stage of a [`Pipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StageId(usize);

impl StageId {
    /// Position in creation order (the root is 0).
    pub fn index(self) -> usize {
        self.0
    }
}

/// Change notification from a [`Pipeline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineEvent {
    /// The stage has a new input and/or projection.
    Refreshed(StageId),
    /// The stage lost its data (region disabled, or it became empty).
    Cleared(StageId),
}

#[derive(Debug)]
struct Stage {
    parent: Option<StageId>,
    children: Vec<StageId>,
    /// Region drawn on the parent's view; `None` for the root.
    selector: Option<RegionSelector>,
    input: Option<Arc<Dataset>>,
    roles: Option<AxisRoleAssignment>,
    projected: Option<ProjectedSlice>,
    /// Set by role observers when the projection is out of date.
    reproject: Rc<Cell<bool>>,
    stale: bool,
}

impl Stage {
    fn new(parent: Option<StageId>, selector: Option<RegionSelector>) -> Self {
        Self {
            parent,
            children: Vec::new(),
            selector,
            input: None,
            roles: None,
            projected: None,
            reproject: Rc::new(Cell::new(false)),
            stale: false,
        }
    }
}

/// A tree of views over one dataset.
#[derive(Debug)]
pub struct Pipeline {
    stages: Vec<Stage>,
    observers: Observers<PipelineEvent>,
}

impl Pipeline {
    /// Pipeline with a single root stage viewing `dataset`.
    pub fn new(dataset: Arc<Dataset>) -> Result<Self> {
        let mut pipeline = Self {
            stages: vec![Stage::new(None, None)],
            observers: Observers::default(),
        };
        let root = pipeline.root();
        pipeline.set_input(root, dataset)?;
        Ok(pipeline)
    }

    /// The stage viewing the loaded dataset.
    pub fn root(&self) -> StageId {
        StageId(0)
    }

    /// Number of stages, including the root.
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Always false: there is at least the root.
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Add a stage fed by a region of `kind` drawn on `parent`.
    ///
    /// The region starts disabled, so the new stage has no data yet.
    pub fn attach(&mut self, parent: StageId, kind: RegionKind) -> Result<StageId> {
        self.check(parent)?;
        let id = StageId(self.stages.len());
        self.stages
            .push(Stage::new(Some(parent), Some(RegionSelector::new(kind))));
        self.stages[parent.0].children.push(id);
        tracing::debug!("Attached {} stage {:?} to {:?}", kind.name(), id, parent);
        Ok(id)
    }

    /// Parent stage, `None` for the root.
    pub fn parent(&self, id: StageId) -> Result<Option<StageId>> {
        Ok(self.stage(id)?.parent)
    }

    /// Direct children in attachment order.
    pub fn children(&self, id: StageId) -> Result<&[StageId]> {
        Ok(&self.stage(id)?.children)
    }

    /// Number of ancestors (root is 0).
    pub fn depth(&self, id: StageId) -> Result<usize> {
        Ok(self.path_from_root(id)?.len() - 1)
    }

    /// Selector of the region feeding `id`; `None` for the root.
    pub fn selector(&self, id: StageId) -> Result<Option<&RegionSelector>> {
        Ok(self.stage(id)?.selector.as_ref())
    }

    /// Mutable selector, e.g. to subscribe to its events.
    pub fn selector_mut(&mut self, id: StageId) -> Result<Option<&mut RegionSelector>> {
        self.check(id)?;
        Ok(self.stages[id.0].selector.as_mut())
    }

    /// Role assignment of a stage.
    ///
    /// Kept while the stage is emptied by an out-of-range region, dropped when
    /// its region is disabled.
    pub fn roles(&self, id: StageId) -> Result<Option<&AxisRoleAssignment>> {
        Ok(self.stage(id)?.roles.as_ref())
    }

    /// Whether `id` must be recomputed before it is read.
    pub fn is_stale(&self, id: StageId) -> Result<bool> {
        Ok(self.stage(id)?.stale)
    }

    /// Input dataset of a stage, after bringing it up to date.
    pub fn input(&mut self, id: StageId) -> Result<Option<Arc<Dataset>>> {
        self.refresh(id)?;
        Ok(self.stages[id.0].input.clone())
    }

    /// Projected slice of a stage, after bringing it up to date.
    ///
    /// `None` if the stage has no data or its projection is empty.
    pub fn projected(&mut self, id: StageId) -> Result<Option<&ProjectedSlice>> {
        self.refresh(id)?;
        Ok(self.stages[id.0].projected.as_ref())
    }

    /// Last computed projection, without refreshing.
    ///
    /// Call [`Pipeline::settle`] first to be sure it is current.
    pub fn last_projection(&self, id: StageId) -> Result<Option<&ProjectedSlice>> {
        Ok(self.stage(id)?.projected.as_ref())
    }

    /// Last computed input, without refreshing.
    pub fn last_input(&self, id: StageId) -> Result<Option<&Arc<Dataset>>> {
        Ok(self.stage(id)?.input.as_ref())
    }

    /// Bring every stale stage up to date.
    pub fn settle(&mut self) -> Result<()> {
        // creation order is a topological order
        for i in 0..self.stages.len() {
            if self.stages[i].stale {
                self.recompute(StageId(i))?;
            }
        }
        Ok(())
    }

    /// Enable the region feeding `child` with a default full-extent region on
    /// the parent's current view, and cascade.
    pub fn enable_region(&mut self, child: StageId) -> Result<Region> {
        let parent = self.parent_of(child)?;
        self.refresh(parent)?;
        let (slice, selector) = self.drawing_surface(child)?;
        let region = selector.enable(slice)?;
        self.cascade(child)?;
        Ok(region)
    }

    /// Move the region feeding `child`.
    ///
    /// While dragging only `child` is recomputed and its children go stale;
    /// a finished drag cascades through every enabled descendant.
    pub fn update_region(
        &mut self,
        child: StageId,
        region: Region,
        update: RegionUpdate,
    ) -> Result<()> {
        let parent = self.parent_of(child)?;
        self.refresh(parent)?;
        self.selector_of(child)?.update_region(region, update)?;
        match update {
            RegionUpdate::Dragging => self.recompute(child),
            RegionUpdate::Finished => self.cascade(child),
        }
    }

    /// Reset the region feeding `child` to the parent's full extent, and cascade.
    pub fn center_region(&mut self, child: StageId) -> Result<Region> {
        let parent = self.parent_of(child)?;
        self.refresh(parent)?;
        let (slice, selector) = self.drawing_surface(child)?;
        let region = selector.center(slice)?;
        self.cascade(child)?;
        Ok(region)
    }

    /// Disable the region feeding `child`; `child` and every descendant are
    /// cleared and their own regions disabled.
    pub fn disable_region(&mut self, child: StageId) -> Result<()> {
        self.parent_of(child)?;
        let mut pending = vec![child];
        while let Some(id) = pending.pop() {
            if let Some(selector) = self.stages[id.0].selector.as_mut() {
                selector.disable();
            }
            self.clear(id);
            // a re-enabled region starts from default roles
            self.stages[id.0].roles = None;
            pending.extend(self.stages[id.0].children.iter().rev());
        }
        tracing::debug!("Disabled region of stage {:?}", child);
        Ok(())
    }

    /// Give `axis` of stage `id` a new role.
    ///
    /// The stage is re-projected, and the regions drawn on it are reset to the
    /// new free-axis extent and committed.
    pub fn assign_role(&mut self, id: StageId, axis: usize, role: AxisRole) -> Result<()> {
        self.refresh(id)?;
        self.roles_of(id)?.assign_role(axis, role)?;
        self.project_if_needed(id)?;

        let children = self.stages[id.0].children.clone();
        for child in children {
            let enabled = self.stages[child.0]
                .selector
                .as_ref()
                .is_some_and(RegionSelector::is_enabled);
            if !enabled {
                continue;
            }
            let drawable = self.stages[id.0]
                .projected
                .as_ref()
                .is_some_and(|slice| slice.ndim() == 2);
            if drawable {
                let (slice, selector) = self.drawing_surface(child)?;
                selector.center(slice)?;
                self.cascade(child)?;
            } else {
                self.clear_subtree(child);
            }
        }
        Ok(())
    }

    /// Move fixed `axis` of stage `id` to `index`. Only that stage is
    /// re-projected: extractions keep every non-free axis.
    pub fn set_fixed_index(&mut self, id: StageId, axis: usize, index: usize) -> Result<()> {
        self.refresh(id)?;
        self.roles_of(id)?.set_fixed_index(axis, index)?;
        self.project_if_needed(id)
    }

    /// Register a pipeline-change callback.
    pub fn subscribe(
        &mut self,
        callback: impl FnMut(&PipelineEvent) + 'static,
    ) -> SubscriptionId {
        self.observers.subscribe(callback)
    }

    /// Remove a pipeline-change callback.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.observers.unsubscribe(id)
    }

    fn stage(&self, id: StageId) -> Result<&Stage> {
        self.stages
            .get(id.0)
            .ok_or_else(|| IauError::Validation(format!("no stage {}", id.0)))
    }

    fn check(&self, id: StageId) -> Result<()> {
        self.stage(id).map(|_| ())
    }

    fn parent_of(&self, child: StageId) -> Result<StageId> {
        self.stage(child)?
            .parent
            .ok_or_else(|| IauError::Validation("the root stage has no region".to_string()))
    }

    fn selector_of(&mut self, child: StageId) -> Result<&mut RegionSelector> {
        self.stages[child.0]
            .selector
            .as_mut()
            .ok_or_else(|| IauError::Validation("the root stage has no region".to_string()))
    }

    /// The parent's current slice together with the child's selector.
    fn drawing_surface(&mut self, child: StageId) -> Result<(&ProjectedSlice, &mut RegionSelector)> {
        let parent = self.parent_of(child)?;
        // parents are always created before their children
        let (head, tail) = self.stages.split_at_mut(child.0);
        let slice = head[parent.0].projected.as_ref().ok_or_else(|| {
            IauError::Validation(format!("stage {} has nothing to draw on", parent.0))
        })?;
        let selector = tail[0]
            .selector
            .as_mut()
            .ok_or_else(|| IauError::Validation("the root stage has no region".to_string()))?;
        Ok((slice, selector))
    }

    fn roles_of(&mut self, id: StageId) -> Result<&mut AxisRoleAssignment> {
        self.stages[id.0]
            .roles
            .as_mut()
            .ok_or_else(|| IauError::Validation(format!("stage {} has no data", id.0)))
    }

    fn path_from_root(&self, id: StageId) -> Result<Vec<StageId>> {
        let mut path = vec![id];
        let mut current = self.stage(id)?.parent;
        while let Some(p) = current {
            path.push(p);
            current = self.stages[p.0].parent;
        }
        path.reverse();
        Ok(path)
    }

    fn refresh(&mut self, id: StageId) -> Result<()> {
        for stage in self.path_from_root(id)? {
            if self.stages[stage.0].stale {
                self.recompute(stage)?;
            }
        }
        Ok(())
    }

    /// Recompute `id` from its parent, then every enabled descendant.
    fn cascade(&mut self, id: StageId) -> Result<()> {
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            self.recompute(current)?;
            if self.stages[current.0].projected.is_none() {
                continue;
            }
            let stage = &self.stages[current.0];
            pending.extend(stage.children.iter().rev().copied().filter(|c| {
                self.stages[c.0]
                    .selector
                    .as_ref()
                    .is_some_and(RegionSelector::is_enabled)
            }));
        }
        Ok(())
    }

    /// Re-extract `id`'s input from its parent and re-project it.
    fn recompute(&mut self, id: StageId) -> Result<()> {
        let Some(parent) = self.stages[id.0].parent else {
            self.stages[id.0].stale = false;
            return Ok(());
        };
        let region = self.stages[id.0]
            .selector
            .as_ref()
            .and_then(|s| s.region().copied());
        let extracted = match (
            region,
            self.stages[parent.0].input.as_deref(),
            self.stages[parent.0].roles.as_ref(),
        ) {
            (Some(region), Some(source), Some(roles)) => extract_region(source, roles, &region),
            _ => {
                self.clear_subtree(id);
                return Ok(());
            }
        };

        match extracted {
            Ok(extracted) => self.set_input(id, Arc::new(extracted)),
            Err(e) if e.is_empty_slice() => {
                tracing::warn!("Stage {:?} cleared: {}", id, e);
                self.clear_subtree(id);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn set_input(&mut self, id: StageId, input: Arc<Dataset>) -> Result<()> {
        let stage = &mut self.stages[id.0];
        match stage.roles.as_mut() {
            Some(roles) => {
                roles.retarget(input.shape())?;
            }
            None => {
                let mut roles = AxisRoleAssignment::new(input.shape())?;
                let flag = Rc::clone(&stage.reproject);
                roles.subscribe(move |_| flag.set(true));
                stage.roles = Some(roles);
            }
        }
        stage.input = Some(input);
        stage.stale = false;
        stage.reproject.set(true);
        self.project_if_needed(id)?;

        let children = self.stages[id.0].children.clone();
        for child in children {
            self.stages[child.0].stale = true;
        }
        Ok(())
    }

    fn project_if_needed(&mut self, id: StageId) -> Result<()> {
        let stage = &mut self.stages[id.0];
        if !stage.reproject.replace(false) {
            return Ok(());
        }
        let (Some(input), Some(roles)) = (stage.input.as_deref(), stage.roles.as_ref()) else {
            return Ok(());
        };
        match SliceProjector::project(input, roles) {
            Ok(slice) => {
                stage.projected = Some(slice);
                self.observers.notify(&PipelineEvent::Refreshed(id));
                Ok(())
            }
            Err(e) if e.is_empty_slice() => {
                tracing::warn!("Stage {:?} shows nothing: {}", id, e);
                stage.projected = None;
                self.observers.notify(&PipelineEvent::Cleared(id));
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Clear `id` and everything below it; regions and roles stay as they are.
    fn clear_subtree(&mut self, id: StageId) {
        let mut pending = vec![id];
        while let Some(current) = pending.pop() {
            self.clear(current);
            pending.extend(self.stages[current.0].children.iter().rev());
        }
    }

    fn clear(&mut self, id: StageId) {
        let stage = &mut self.stages[id.0];
        let had_data = stage.input.is_some() || stage.projected.is_some();
        stage.input = None;
        stage.projected = None;
        stage.stale = false;
        stage.reproject.set(false);
        if had_data {
            self.observers.notify(&PipelineEvent::Cleared(id));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Coordinates, Metadata};
    use ndarray::{Array, IxDyn};
    use std::cell::RefCell;

    fn dataset(shape: &[usize]) -> Arc<Dataset> {
        let array = Array::from_shape_fn(IxDyn(shape), |ix| {
            (0..shape.len()).fold(0.0, |acc, i| acc * 10.0 + ix[i] as f64)
        });
        let coordinates = shape.iter().map(|&n| Coordinates::indices(n)).collect();
        let labels = (0..shape.len()).map(|i| format!("d{}", i)).collect();
        Arc::new(Dataset::new(array, coordinates, labels, Metadata::new()).unwrap())
    }

    #[test]
    fn root_is_projected_on_creation() {
        let mut pipeline = Pipeline::new(dataset(&[3, 4, 5])).unwrap();
        let root = pipeline.root();
        let slice = pipeline.projected(root).unwrap().unwrap();
        assert_eq!(slice.bounds(), vec![3, 4]);
        assert_eq!(pipeline.depth(root).unwrap(), 0);
    }

    #[test]
    fn new_stage_has_no_data_until_enabled() {
        let mut pipeline = Pipeline::new(dataset(&[3, 4])).unwrap();
        let child = pipeline.attach(pipeline.root(), RegionKind::Rectangle).unwrap();
        assert!(pipeline.projected(child).unwrap().is_none());

        let region = pipeline.enable_region(child).unwrap();
        assert_eq!(region, Region::rectangle((0, 0), (2, 3)));
        let input = pipeline.input(child).unwrap().unwrap();
        assert_eq!(input.shape(), &[3, 4]);
    }

    #[test]
    fn dragging_marks_grandchildren_stale_until_read() {
        let mut pipeline = Pipeline::new(dataset(&[4, 4, 3])).unwrap();
        let cut = pipeline.attach(pipeline.root(), RegionKind::Line).unwrap();
        let roi = pipeline.attach(cut, RegionKind::Rectangle).unwrap();
        pipeline.enable_region(cut).unwrap();
        pipeline.enable_region(roi).unwrap();

        pipeline
            .update_region(cut, Region::line((0, 3), (3, 3)), RegionUpdate::Dragging)
            .unwrap();
        assert!(!pipeline.is_stale(cut).unwrap());
        assert!(pipeline.is_stale(roi).unwrap());

        let input = pipeline.input(roi).unwrap().unwrap();
        assert!(!pipeline.is_stale(roi).unwrap());
        // path (0..=3, 3) at d2 = 0
        assert_eq!(input.array()[[2, 0]], 230.0);
    }

    #[test]
    fn settle_refreshes_every_stale_stage() {
        let mut pipeline = Pipeline::new(dataset(&[4, 4, 3])).unwrap();
        let cut = pipeline.attach(pipeline.root(), RegionKind::Line).unwrap();
        let roi = pipeline.attach(cut, RegionKind::Rectangle).unwrap();
        pipeline.enable_region(cut).unwrap();
        pipeline.enable_region(roi).unwrap();
        pipeline
            .update_region(cut, Region::line((0, 2), (3, 2)), RegionUpdate::Dragging)
            .unwrap();
        assert!(pipeline.is_stale(roi).unwrap());

        pipeline.settle().unwrap();
        assert!(!pipeline.is_stale(roi).unwrap());
        let input = pipeline.last_input(roi).unwrap().unwrap();
        assert_eq!(input.array()[[1, 0]], 120.0);
        assert!(pipeline.last_projection(roi).unwrap().is_some());
    }

    #[test]
    fn commit_reaches_every_descendant() {
        let mut pipeline = Pipeline::new(dataset(&[4, 4, 3])).unwrap();
        let cut = pipeline.attach(pipeline.root(), RegionKind::Line).unwrap();
        let roi = pipeline.attach(cut, RegionKind::Rectangle).unwrap();
        pipeline.enable_region(cut).unwrap();
        pipeline.enable_region(roi).unwrap();

        pipeline
            .update_region(cut, Region::line((0, 1), (3, 1)), RegionUpdate::Finished)
            .unwrap();
        assert!(!pipeline.is_stale(roi).unwrap());
        let input = pipeline.input(roi).unwrap().unwrap();
        assert_eq!(input.array()[[3, 2]], 312.0);
    }

    #[test]
    fn disabling_clears_all_descendants() {
        let mut pipeline = Pipeline::new(dataset(&[3, 3, 3, 3])).unwrap();
        let a = pipeline.attach(pipeline.root(), RegionKind::Line).unwrap();
        let b = pipeline.attach(a, RegionKind::Line).unwrap();
        let c = pipeline.attach(b, RegionKind::Line).unwrap();
        for id in [a, b, c] {
            pipeline.enable_region(id).unwrap();
        }
        assert_eq!(pipeline.projected(c).unwrap().unwrap().ndim(), 1);

        pipeline.disable_region(b).unwrap();
        assert!(pipeline.projected(a).unwrap().is_some());
        for id in [b, c] {
            assert!(pipeline.projected(id).unwrap().is_none());
            assert!(!pipeline.selector(id).unwrap().unwrap().is_enabled());
        }
    }

    #[test]
    fn empty_extraction_clears_child_only() {
        let mut pipeline = Pipeline::new(dataset(&[3, 3])).unwrap();
        let child = pipeline.attach(pipeline.root(), RegionKind::Rectangle).unwrap();
        pipeline.enable_region(child).unwrap();
        pipeline
            .update_region(
                child,
                Region::rectangle((10, 10), (12, 12)),
                RegionUpdate::Finished,
            )
            .unwrap();
        assert!(pipeline.projected(child).unwrap().is_none());
        assert!(pipeline.selector(child).unwrap().unwrap().is_enabled());
        assert!(pipeline.projected(pipeline.root()).unwrap().is_some());
    }

    #[test]
    fn role_change_recenters_child_regions() {
        let mut pipeline = Pipeline::new(dataset(&[2, 5, 7])).unwrap();
        let root = pipeline.root();
        let child = pipeline.attach(root, RegionKind::Rectangle).unwrap();
        pipeline.enable_region(child).unwrap();

        pipeline.assign_role(root, 2, AxisRole::Vertical).unwrap();
        let region = *pipeline.selector(child).unwrap().unwrap().region().unwrap();
        assert_eq!(region, Region::rectangle((0, 0), (1, 6)));
        assert_eq!(pipeline.input(child).unwrap().unwrap().shape(), &[2, 5, 7]);
    }

    #[test]
    fn fixed_index_change_only_reprojects() {
        let mut pipeline = Pipeline::new(dataset(&[2, 2, 3])).unwrap();
        let root = pipeline.root();
        let child = pipeline.attach(root, RegionKind::Rectangle).unwrap();
        pipeline.enable_region(child).unwrap();

        let events = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&events);
        pipeline.subscribe(move |e| sink.borrow_mut().push(*e));

        pipeline.set_fixed_index(root, 2, 2).unwrap();
        assert_eq!(*events.borrow(), vec![PipelineEvent::Refreshed(root)]);
        assert_eq!(pipeline.projected(root).unwrap().unwrap().get(&[1, 1]), Some(112.0));
        assert!(pipeline.set_fixed_index(root, 0, 1).is_err());
    }

    #[test]
    fn root_has_no_region() {
        let mut pipeline = Pipeline::new(dataset(&[3, 3])).unwrap();
        let root = pipeline.root();
        assert!(pipeline.enable_region(root).is_err());
        assert!(pipeline.disable_region(root).is_err());
        assert!(pipeline.attach(StageId(9), RegionKind::Line).is_err());
    }
}
