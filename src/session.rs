//! One loaded dataset and the views over it.

use crate::data::{load_dataset, Dataset};
use crate::error::Result;
use crate::slicing::{Pipeline, RegionKind, StageId};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Rectangular ROI slots on the main view.
pub const MAX_ROIS: usize = 4;

/// A dataset plus its pipeline: the main view, up to [`MAX_ROIS`] ROI views
/// hanging off it, and a chain of line cuts that ends in a 1-D view.
///
/// For a 4-D dataset the chain is main -> 3-D -> 2-D -> 1-D. All regions
/// start disabled.
#[derive(Debug)]
pub struct Session {
    path: Option<PathBuf>,
    dataset: Arc<Dataset>,
    pipeline: Pipeline,
    rois: Vec<StageId>,
    line_cuts: Vec<StageId>,
}

impl Session {
    /// Load a container and build its views.
    pub fn open(path: &Path) -> Result<Self> {
        let dataset = load_dataset(path)?;
        tracing::info!(
            "Opened {} with shape {:?}",
            path.display(),
            dataset.shape()
        );
        let mut session = Self::new(dataset)?;
        session.path = Some(path.to_path_buf());
        Ok(session)
    }

    /// Build the views for an in-memory dataset.
    pub fn new(dataset: Dataset) -> Result<Self> {
        let dataset = Arc::new(dataset);
        let mut pipeline = Pipeline::new(Arc::clone(&dataset))?;
        let root = pipeline.root();

        let mut rois = Vec::new();
        if dataset.ndim() >= 2 {
            for _ in 0..MAX_ROIS {
                rois.push(pipeline.attach(root, RegionKind::Rectangle)?);
            }
        }

        // each cut drops one dimension
        let mut line_cuts = Vec::new();
        let mut parent = root;
        for _ in 1..dataset.ndim() {
            parent = pipeline.attach(parent, RegionKind::Line)?;
            line_cuts.push(parent);
        }

        Ok(Self {
            path: None,
            dataset,
            pipeline,
            rois,
            line_cuts,
        })
    }

    /// File the dataset came from, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// The loaded dataset.
    pub fn dataset(&self) -> &Arc<Dataset> {
        &self.dataset
    }

    /// The view tree.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// The view tree, for interaction.
    pub fn pipeline_mut(&mut self) -> &mut Pipeline {
        &mut self.pipeline
    }

    /// The main view.
    pub fn main_view(&self) -> StageId {
        self.pipeline.root()
    }

    /// ROI views on the main view.
    pub fn rois(&self) -> &[StageId] {
        &self.rois
    }

    /// Line-cut views, from the main view down to the 1-D view.
    pub fn line_cuts(&self) -> &[StageId] {
        &self.line_cuts
    }

    /// Every view: main, ROIs, then the line-cut chain.
    pub fn views(&self) -> Vec<StageId> {
        std::iter::once(self.main_view())
            .chain(self.rois.iter().copied())
            .chain(self.line_cuts.iter().copied())
            .collect()
    }

    /// Short name of a view.
    pub fn view_name(&self, id: StageId) -> String {
        if id == self.main_view() {
            return "main".to_string();
        }
        if let Some(i) = self.rois.iter().position(|&r| r == id) {
            return format!("ROI {}", i + 1);
        }
        if let Some(i) = self.line_cuts.iter().position(|&c| c == id) {
            return format!("cut {} ({}-D)", i + 1, self.dataset.ndim() - i - 1);
        }
        format!("view {}", id.index())
    }
}
