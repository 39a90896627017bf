//! `.iau` container reading and writing.
//!
//! A container is a netCDF-4 (HDF5) file holding:
//! - one dimension per axis, named by the axis label,
//! - one coordinate variable per axis, named like its dimension so it is
//!   attached to it as a dimension scale (`f64` or string values),
//! - the `data` variable (`f64`) over all axis dimensions,
//! - global attributes `metadata` (JSON string) and `iau_version`.

use super::axes::Coordinates;
use super::dataset::{validate_metadata, Dataset, Metadata};
use super::source::load_from_source;
use crate::error::{IauError, Result};
use ndarray::{ArrayD, IxDyn};
use netcdf::types::{FloatType, IntType, NcVariableType};
use std::collections::HashSet;
use std::path::Path;

/// Name of the array variable.
pub const DATA_VARIABLE: &str = "data";
/// Name of the global metadata attribute.
pub const METADATA_ATTRIBUTE: &str = "metadata";
/// Name of the global format version attribute.
pub const VERSION_ATTRIBUTE: &str = "iau_version";
/// Current container layout version.
pub const FORMAT_VERSION: i32 = 1;

/// Labels used when none are supplied.
const DEFAULT_LABELS: [&str; 3] = ["H", "K", "L"];

/// Contents of a loaded container.
#[derive(Debug, Clone)]
pub struct LoadedContainer {
    /// The values.
    pub array: ArrayD<f64>,
    /// Coordinates per axis.
    pub coordinates: Vec<Coordinates>,
    /// Axis labels.
    pub labels: Vec<String>,
    /// Metadata mapping.
    pub metadata: Metadata,
}

impl LoadedContainer {
    /// Validate into a [`Dataset`].
    pub fn into_dataset(self) -> Result<Dataset> {
        Dataset::new(self.array, self.coordinates, self.labels, self.metadata)
    }
}

/// Default axis labels for an `ndim`-dimensional array: `H, K, L, axis_3, ...`.
pub fn default_labels(ndim: usize) -> Vec<String> {
    (0..ndim)
        .map(|i| match DEFAULT_LABELS.get(i) {
            Some(label) => label.to_string(),
            None => format!("axis_{}", i),
        })
        .collect()
}

/// Write a container.
///
/// All inputs are validated before anything touches the disk. The file is
/// written next to `path` under a temporary name and renamed into place only
/// once it is complete, so a failure never leaves a partial container.
pub fn create_container(
    path: &Path,
    array: &ArrayD<f64>,
    coordinates: &[Coordinates],
    labels: &[String],
    metadata: &Metadata,
) -> Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    if !dir.is_dir() {
        return Err(IauError::path(dir, "destination directory does not exist"));
    }
    if path.is_dir() {
        return Err(IauError::path(path, "destination is a directory"));
    }
    validate_contents(array, coordinates, labels, metadata)?;

    let tmp = tempfile::Builder::new()
        .prefix(".iau-")
        .suffix(".partial")
        .tempfile_in(dir)?
        .into_temp_path();
    write_container(&tmp, array, coordinates, labels, metadata)?;
    tmp.persist(path).map_err(|e| IauError::Io(e.error))?;

    tracing::info!(
        "Created container {} with shape {:?}",
        path.display(),
        array.shape()
    );
    Ok(())
}

/// Write a [`Dataset`] as a container.
pub fn save_dataset(path: &Path, dataset: &Dataset) -> Result<()> {
    create_container(
        path,
        dataset.array(),
        &dataset.coordinate_lists(),
        &dataset.labels(),
        dataset.metadata(),
    )
}

fn validate_contents(
    array: &ArrayD<f64>,
    coordinates: &[Coordinates],
    labels: &[String],
    metadata: &Metadata,
) -> Result<()> {
    let ndim = array.ndim();
    if ndim == 0 {
        return Err(IauError::ShapeMismatch(
            "array must have at least one dimension".to_string(),
        ));
    }
    if coordinates.len() != ndim {
        return Err(IauError::ShapeMismatch(format!(
            "{} coordinate lists for {}-dimensional array",
            coordinates.len(),
            ndim
        )));
    }
    for (axis, (coords, &len)) in coordinates.iter().zip(array.shape()).enumerate() {
        if coords.len() != len {
            return Err(IauError::ShapeMismatch(format!(
                "axis {} has {} coordinates but length {}",
                axis,
                coords.len(),
                len
            )));
        }
        if len == 0 {
            return Err(IauError::ShapeMismatch(format!(
                "axis {} has length zero",
                axis
            )));
        }
    }
    if labels.len() != ndim {
        return Err(IauError::ShapeMismatch(format!(
            "{} labels for {}-dimensional array",
            labels.len(),
            ndim
        )));
    }
    let mut seen = HashSet::new();
    for label in labels {
        if label.is_empty() || label.contains('/') || label == DATA_VARIABLE {
            return Err(IauError::InvalidLabels(format!(
                "'{}' cannot be used as an axis label",
                label
            )));
        }
        if !seen.insert(label.as_str()) {
            return Err(IauError::InvalidLabels(format!(
                "label '{}' is not unique",
                label
            )));
        }
    }
    validate_metadata(metadata)
}

fn write_container(
    path: &Path,
    array: &ArrayD<f64>,
    coordinates: &[Coordinates],
    labels: &[String],
    metadata: &Metadata,
) -> Result<()> {
    let mut file = netcdf::create(path)?;

    file.add_attribute(VERSION_ATTRIBUTE, FORMAT_VERSION)?;
    file.add_attribute(METADATA_ATTRIBUTE, serde_json::to_string(metadata)?)?;

    for (label, &len) in labels.iter().zip(array.shape()) {
        file.add_dimension(label, len)?;
    }

    for (label, coords) in labels.iter().zip(coordinates) {
        match coords {
            Coordinates::Numeric(values) => {
                let mut var = file.add_variable::<f64>(label, &[label.as_str()])?;
                var.put_values(values, ..)?;
            }
            Coordinates::Categorical(values) => {
                let mut var = file.add_string_variable(label, &[label.as_str()])?;
                for (i, value) in values.iter().enumerate() {
                    var.put_string(value, [i])?;
                }
            }
        }
    }

    let dims: Vec<&str> = labels.iter().map(String::as_str).collect();
    let values: Vec<f64> = array.iter().copied().collect();
    let mut data = file.add_variable::<f64>(DATA_VARIABLE, &dims)?;
    data.put_values(&values, ..)?;

    Ok(())
}

/// Read a container.
pub fn load_container(path: &Path) -> Result<LoadedContainer> {
    if !path.is_file() {
        return Err(IauError::path(path, "container not found"));
    }
    let file = netcdf::open(path)?;

    let data = file.variable(DATA_VARIABLE).ok_or_else(|| {
        IauError::Format(format!("'{}' variable not found", DATA_VARIABLE))
    })?;
    let shape: Vec<usize> = data.dimensions().iter().map(|d| d.len()).collect();
    let labels: Vec<String> = data
        .dimensions()
        .iter()
        .map(|d| d.name().to_string())
        .collect();

    let values = read_f64_values(&data)?;
    let array = ArrayD::from_shape_vec(IxDyn(&shape), values)
        .map_err(|e| IauError::Format(format!("invalid shape/data size: {}", e)))?;

    let mut coordinates = Vec::with_capacity(labels.len());
    for (label, &len) in labels.iter().zip(&shape) {
        let var = file.variable(label).ok_or_else(|| {
            IauError::Format(format!("coordinate variable '{}' not found", label))
        })?;
        let coords = read_coordinates(&var, len)?;
        if coords.len() != len {
            return Err(IauError::Format(format!(
                "coordinate variable '{}' has {} values for axis length {}",
                label,
                coords.len(),
                len
            )));
        }
        coordinates.push(coords);
    }

    let metadata = match file.attribute(METADATA_ATTRIBUTE) {
        Some(attr) => match attr.value()? {
            netcdf::AttributeValue::Str(s) => serde_json::from_str::<Metadata>(&s)
                .map_err(|e| IauError::Format(format!("invalid metadata: {}", e)))?,
            other => {
                return Err(IauError::Format(format!(
                    "metadata attribute is not a string: {:?}",
                    other
                )))
            }
        },
        None => {
            return Err(IauError::Format(format!(
                "'{}' attribute not found",
                METADATA_ATTRIBUTE
            )))
        }
    };

    tracing::info!(
        "Loaded container {} with axes {:?} and shape {:?}",
        path.display(),
        labels,
        shape
    );

    Ok(LoadedContainer {
        array,
        coordinates,
        labels,
        metadata,
    })
}

/// Read a container straight into a [`Dataset`].
pub fn load_dataset(path: &Path) -> Result<Dataset> {
    load_container(path)?.into_dataset()
}

/// Build a container from a source volume (file or directory of files).
///
/// `labels` defaults to [`default_labels`]; `metadata` defaults to a record of
/// the source path.
pub fn create_from_source(
    source: &Path,
    output: &Path,
    labels: Option<Vec<String>>,
    new_axis_values: Option<&[f64]>,
    metadata: Option<Metadata>,
) -> Result<()> {
    let volume = load_from_source(source, new_axis_values)?;
    let labels = labels.unwrap_or_else(|| default_labels(volume.array.ndim()));
    let metadata = metadata.unwrap_or_else(|| {
        let mut m = Metadata::new();
        m.insert(
            "source".to_string(),
            serde_json::Value::String(source.display().to_string()),
        );
        m
    });
    let coordinates: Vec<Coordinates> = volume
        .coordinates
        .into_iter()
        .map(Coordinates::Numeric)
        .collect();
    create_container(output, &volume.array, &coordinates, &labels, &metadata)
}

fn read_coordinates(var: &netcdf::Variable<'_>, len: usize) -> Result<Coordinates> {
    match var.vartype() {
        NcVariableType::String => {
            let mut values = Vec::with_capacity(len);
            for i in 0..len {
                values.push(var.get_string([i])?);
            }
            Ok(Coordinates::Categorical(values))
        }
        _ => Ok(Coordinates::Numeric(read_f64_values(var)?)),
    }
}

fn read_f64_values(var: &netcdf::Variable<'_>) -> Result<Vec<f64>> {
    let vartype = var.vartype();
    let name = var.name();
    let fail = |e: netcdf::Error| IauError::NetCDF(format!("failed to read '{}': {}", name, e));

    match vartype {
        NcVariableType::Float(FloatType::F64) => var.get_values::<f64, _>(..).map_err(fail),
        NcVariableType::Float(FloatType::F32) => {
            let values: Vec<f32> = var.get_values(..).map_err(fail)?;
            Ok(values.into_iter().map(f64::from).collect())
        }
        NcVariableType::Int(IntType::I64) => {
            let values: Vec<i64> = var.get_values(..).map_err(fail)?;
            Ok(values.into_iter().map(|x| x as f64).collect())
        }
        NcVariableType::Int(IntType::I32) => {
            let values: Vec<i32> = var.get_values(..).map_err(fail)?;
            Ok(values.into_iter().map(f64::from).collect())
        }
        NcVariableType::Int(IntType::I16) => {
            let values: Vec<i16> = var.get_values(..).map_err(fail)?;
            Ok(values.into_iter().map(f64::from).collect())
        }
        NcVariableType::Int(IntType::I8) => {
            let values: Vec<i8> = var.get_values(..).map_err(fail)?;
            Ok(values.into_iter().map(f64::from).collect())
        }
        NcVariableType::Int(IntType::U64) => {
            let values: Vec<u64> = var.get_values(..).map_err(fail)?;
            Ok(values.into_iter().map(|x| x as f64).collect())
        }
        NcVariableType::Int(IntType::U32) => {
            let values: Vec<u32> = var.get_values(..).map_err(fail)?;
            Ok(values.into_iter().map(f64::from).collect())
        }
        NcVariableType::Int(IntType::U16) => {
            let values: Vec<u16> = var.get_values(..).map_err(fail)?;
            Ok(values.into_iter().map(f64::from).collect())
        }
        NcVariableType::Int(IntType::U8) => {
            let values: Vec<u8> = var.get_values(..).map_err(fail)?;
            Ok(values.into_iter().map(f64::from).collect())
        }
        other => Err(IauError::Format(format!(
            "variable '{}' has non-numeric type {:?}",
            name, other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_labels_extend_hkl() {
        assert_eq!(default_labels(2), vec!["H", "K"]);
        assert_eq!(default_labels(4), vec!["H", "K", "L", "axis_3"]);
    }

    #[test]
    fn reserved_label_is_rejected_before_writing() {
        let array = ArrayD::zeros(IxDyn(&[2]));
        let err = validate_contents(
            &array,
            &[Coordinates::indices(2)],
            &["data".to_string()],
            &Metadata::new(),
        )
        .unwrap_err();
        assert!(matches!(err, IauError::InvalidLabels(_)));
    }

    #[test]
    fn coordinate_count_mismatch_is_shape_error() {
        let array = ArrayD::zeros(IxDyn(&[2, 3]));
        let err = validate_contents(
            &array,
            &[Coordinates::indices(2)],
            &["a".to_string(), "b".to_string()],
            &Metadata::new(),
        )
        .unwrap_err();
        assert!(matches!(err, IauError::ShapeMismatch(_)));
    }
}
