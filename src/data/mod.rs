//! Data model and persistence.
//!
//! [`Dataset`] pairs an N-dimensional array with its [`AxisCoordinateSystem`].
//! Datasets are read from and written to `.iau` containers (NetCDF-4 files
//! with one `data` variable and one coordinate variable per axis), or imported
//! from NIfTI source volumes.

pub mod axes;
pub mod container;
pub mod dataset;
pub mod source;

pub use axes::{is_monotonic, AxisCoordinateSystem, AxisSpec, AxisTransform, Coordinates};
pub use container::{
    create_container, create_from_source, default_labels, load_container, load_dataset,
    save_dataset, LoadedContainer,
};
pub use dataset::{finite_min_max, validate_metadata, Dataset, Metadata};
pub use source::{load_from_source, SourceVolume};
