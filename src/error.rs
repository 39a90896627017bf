//! Error types for iaview.
//!
//! This module provides a unified error handling approach using `thiserror`.
//! Every variant belongs to one [`ErrorKind`], which is how callers decide
//! whether a failure aborts an operation or only degrades a single view.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for iaview operations.
pub type Result<T> = std::result::Result<T, IauError>;

/// Coarse classification of an [`IauError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad arguments, raised before any state is touched.
    Validation,
    /// Filesystem-level failure (missing file or directory).
    Path,
    /// A file exists but does not have the expected structure.
    Format,
    /// A projection or extraction produced a zero-sized result.
    EmptySlice,
    /// Files being stitched have incompatible axes.
    InconsistentAxes,
    /// Failure reported by an underlying library (netCDF, NIfTI, IO, terminal).
    Backend,
}

/// Errors that can occur in iaview.
#[derive(Debug, Error)]
pub enum IauError {
    /// A coordinate list does not match the array shape.
    #[error("Invalid shape: {0}")]
    InvalidShape(String),

    /// Axis labels are missing, duplicated or otherwise unusable.
    #[error("Invalid axis labels: {0}")]
    InvalidLabels(String),

    /// Axis index outside `0..ndim`.
    #[error("Invalid axis {axis} for {ndim}-dimensional data")]
    InvalidAxis { axis: usize, ndim: usize },

    /// Index outside `0..len` along an axis.
    #[error("Index {index} out of range for axis {axis} of length {len}")]
    InvalidIndex { axis: usize, index: usize, len: usize },

    /// A role change that cannot keep one horizontal and one vertical axis.
    #[error("Invalid role change: {0}")]
    InvalidRole(String),

    /// Array, coordinates and labels disagree on dimensionality or extents.
    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Any other bad argument.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A path that does not exist or cannot be used.
    #[error("Path error: {path}: {reason}")]
    Path { path: PathBuf, reason: String },

    /// A container is missing a required entry.
    #[error("Format error: {0}")]
    Format(String),

    /// Unsupported source file format.
    #[error("Unsupported file format: {extension}")]
    UnsupportedFormat { extension: String },

    /// A projection or region extraction produced no elements.
    #[error("Empty slice: {0}")]
    EmptySlice(String),

    /// Source files being stitched do not share axis lengths.
    #[error("Inconsistent axes in {file}: axis {axis} has length {found}, expected {expected}")]
    InconsistentAxes {
        file: PathBuf,
        axis: usize,
        expected: usize,
        found: usize,
    },

    /// Failed to read or write a netCDF container.
    #[error("NetCDF error: {0}")]
    NetCDF(String),

    /// Failed to read a NIfTI volume.
    #[error("NIfTI error: {0}")]
    Nifti(String),

    /// Metadata could not be (de)serialized.
    #[error("Metadata error: {0}")]
    Json(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl IauError {
    /// Create a Path error.
    pub fn path(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        Self::Path {
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create an UnsupportedFormat error.
    pub fn unsupported_format(extension: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            extension: extension.into(),
        }
    }

    /// Create an EmptySlice error.
    pub fn empty_slice(what: impl Into<String>) -> Self {
        Self::EmptySlice(what.into())
    }

    /// Which part of the error taxonomy this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidShape(_)
            | Self::InvalidLabels(_)
            | Self::InvalidAxis { .. }
            | Self::InvalidIndex { .. }
            | Self::InvalidRole(_)
            | Self::ShapeMismatch(_)
            | Self::Validation(_) => ErrorKind::Validation,
            Self::Path { .. } => ErrorKind::Path,
            Self::Format(_) | Self::UnsupportedFormat { .. } => ErrorKind::Format,
            Self::EmptySlice(_) => ErrorKind::EmptySlice,
            Self::InconsistentAxes { .. } => ErrorKind::InconsistentAxes,
            Self::NetCDF(_) | Self::Nifti(_) | Self::Json(_) | Self::Io(_) => {
                ErrorKind::Backend
            }
        }
    }

    /// True for degenerate projections/extractions that a view recovers from locally.
    pub fn is_empty_slice(&self) -> bool {
        self.kind() == ErrorKind::EmptySlice
    }
}

impl From<netcdf::Error> for IauError {
    fn from(err: netcdf::Error) -> Self {
        Self::NetCDF(err.to_string())
    }
}

impl From<nifti::error::NiftiError> for IauError {
    fn from(err: nifti::error::NiftiError) -> Self {
        Self::Nifti(err.to_string())
    }
}
