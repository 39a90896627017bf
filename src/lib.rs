//! iaview - slicing and exploring N-dimensional scan data in the terminal.
//!
//! iaview loads labelled 2-D to 4-D arrays with per-axis coordinates, shows
//! orthogonal slices through them, and lets regions of interest and line cuts
//! feed a chain of lower-dimensional views (4D -> 3D -> 2D -> 1D).
//!
//! # Features
//!
//! - `.iau` containers (netCDF-4) holding array, coordinates, labels and metadata
//! - Import from NIfTI volumes, stitching a directory along a new axis
//! - Axis role assignment (horizontal / vertical / fixed) with swap semantics
//! - Rectangular ROIs and Bresenham line cuts, chained into view pipelines
//! - Terminal viewer with heatmaps, line charts and Gruvbox themes
//!
//! # Example
//!
//! ```ignore
//! use iaview::session::Session;
//! use iaview::slicing::{RegionUpdate, Region};
//! use std::path::Path;
//!
//! let mut session = Session::open(Path::new("scan.iau"))?;
//! let cut = session.line_cuts()[0];
//! let pipeline = session.pipeline_mut();
//! pipeline.enable_region(cut)?;
//! pipeline.update_region(cut, Region::line((0, 0), (40, 12)), RegionUpdate::Finished)?;
//! let profile = pipeline.projected(cut)?;
//! ```

#![warn(
    missing_docs,
    missing_debug_implementations,
    rust_2018_idioms,
    unreachable_pub
)]
#![deny(unsafe_code)]

pub mod data;
pub mod error;
pub mod session;
pub mod slicing;
pub mod viewer;

pub use error::{ErrorKind, IauError, Result};
