//! Source volume reading (NIfTI-1) and directory stitching.

use crate::error::{IauError, Result};
use ndarray::{ArrayD, Axis, IxDyn};
use nifti::{IntoNdArray, NiftiObject, ReaderOptions};
use std::path::{Path, PathBuf};

/// Raw array plus numeric coordinates per axis, as read from source files.
#[derive(Debug, Clone)]
pub struct SourceVolume {
    /// The values.
    pub array: ArrayD<f64>,
    /// Coordinates per axis.
    pub coordinates: Vec<Vec<f64>>,
}

/// Whether a path looks like a NIfTI volume (`.nii` or `.nii.gz`).
pub fn is_source_file(path: &Path) -> bool {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(n) => n.to_ascii_lowercase(),
        None => return false,
    };
    name.ends_with(".nii") || name.ends_with(".nii.gz")
}

/// Read one source file, or stitch every source file in a directory.
///
/// Directory contents are stitched in filename order along a new trailing
/// axis whose coordinates are `new_axis_values`, or `0..count` when `None`.
pub fn load_from_source(source: &Path, new_axis_values: Option<&[f64]>) -> Result<SourceVolume> {
    if source.is_dir() {
        let files = source_files(source)?;
        stitch(&files, new_axis_values)
    } else if source.is_file() {
        if !is_source_file(source) {
            let extension = source
                .extension()
                .and_then(|s| s.to_str())
                .unwrap_or("")
                .to_string();
            return Err(IauError::unsupported_format(extension));
        }
        read_volume(source)
    } else {
        Err(IauError::path(source, "source not found"))
    }
}

/// Source files in a directory, sorted by file name.
pub fn source_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| IauError::path(dir, e.to_string()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && is_source_file(p))
        .collect();
    files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    if files.is_empty() {
        return Err(IauError::path(dir, "directory contains no source volumes"));
    }
    Ok(files)
}

/// Read one NIfTI volume with coordinates derived from its header.
pub fn read_volume(path: &Path) -> Result<SourceVolume> {
    let object = ReaderOptions::new().read_file(path)?;
    let header = object.header().clone();
    let volume = object.into_volume().into_ndarray::<f64>()?;

    // Rebuild in our ndarray version; iteration is in logical order.
    let shape = volume.shape().to_vec();
    let values: Vec<f64> = volume.iter().copied().collect();
    let array = ArrayD::from_shape_vec(IxDyn(&shape), values)
        .map_err(|e| IauError::Nifti(format!("invalid volume shape: {}", e)))?;

    let offsets = if header.qform_code > 0 {
        [header.quatern_x, header.quatern_y, header.quatern_z]
    } else {
        [0.0; 3]
    };
    let coordinates = shape
        .iter()
        .enumerate()
        .map(|(axis, &len)| {
            let spacing = header.pixdim.get(axis + 1).copied().unwrap_or(1.0);
            let spacing = if spacing.is_finite() && spacing > 0.0 {
                spacing as f64
            } else {
                1.0
            };
            let origin = offsets.get(axis).copied().unwrap_or(0.0) as f64;
            (0..len).map(|k| origin + k as f64 * spacing).collect()
        })
        .collect();

    tracing::debug!("Read source volume {} with shape {:?}", path.display(), shape);
    Ok(SourceVolume { array, coordinates })
}

fn stitch(files: &[PathBuf], new_axis_values: Option<&[f64]>) -> Result<SourceVolume> {
    let new_axis: Vec<f64> = match new_axis_values {
        Some(values) if values.len() != files.len() => {
            return Err(IauError::ShapeMismatch(format!(
                "{} new axis values for {} source files",
                values.len(),
                files.len()
            )))
        }
        Some(values) => values.to_vec(),
        None => (0..files.len()).map(|i| i as f64).collect(),
    };

    let mut volumes = Vec::with_capacity(files.len());
    for file in files {
        volumes.push(read_volume(file)?);
    }
    check_consistent(files, &volumes)?;

    let views: Vec<_> = volumes.iter().map(|v| v.array.view()).collect();
    let trailing = Axis(volumes[0].array.ndim());
    let array = ndarray::stack(trailing, &views)
        .map_err(|e| IauError::ShapeMismatch(format!("cannot stitch volumes: {}", e)))?;

    let mut coordinates = volumes[0].coordinates.clone();
    coordinates.push(new_axis);

    tracing::info!(
        "Stitched {} source files into shape {:?}",
        files.len(),
        array.shape()
    );
    Ok(SourceVolume { array, coordinates })
}

/// Every volume must match the first one's dimensionality and axis lengths.
fn check_consistent(files: &[PathBuf], volumes: &[SourceVolume]) -> Result<()> {
    let Some(first) = volumes.first() else {
        return Ok(());
    };
    let reference: Vec<usize> = first.coordinates.iter().map(Vec::len).collect();
    for (file, volume) in files.iter().zip(volumes).skip(1) {
        let lengths: Vec<usize> = volume.coordinates.iter().map(Vec::len).collect();
        if lengths.len() != reference.len() {
            return Err(IauError::InconsistentAxes {
                file: file.clone(),
                axis: lengths.len().min(reference.len()),
                expected: reference.len(),
                found: lengths.len(),
            });
        }
        if let Some(axis) = (0..lengths.len()).find(|&i| lengths[i] != reference[i]) {
            return Err(IauError::InconsistentAxes {
                file: file.clone(),
                axis,
                expected: reference[axis],
                found: lengths[axis],
            });
        }
    }
    Ok(())
}
