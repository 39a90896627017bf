use iaview::data::{
    create_container, load_container, load_dataset, save_dataset, Coordinates, Dataset, Metadata,
};
use iaview::{ErrorKind, IauError};
use ndarray::{ArrayD, IxDyn};
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;

fn sample_array(shape: &[usize]) -> ArrayD<f64> {
    let n: usize = shape.iter().product();
    // mix in values that do not survive a lossy round trip
    let values = (0..n).map(|i| i as f64 * 0.1 + 1e-13).collect();
    ArrayD::from_shape_vec(IxDyn(shape), values).unwrap()
}

fn labels(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

fn dir_entries(dir: &Path) -> usize {
    std::fs::read_dir(dir).unwrap().count()
}

#[test]
fn round_trip_is_exact() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scan.iau");
    let array = sample_array(&[3, 4, 2]);
    let coordinates = vec![
        Coordinates::Numeric(vec![-0.5, 0.0, 0.5]),
        Coordinates::Numeric(vec![1.0, 1.25, 1.5, 1.75]),
        Coordinates::Categorical(vec!["on".into(), "off".into()]),
    ];
    let mut metadata = Metadata::new();
    metadata.insert("sample".into(), json!("Bi2Se3"));
    metadata.insert("temperature".into(), json!(12.5));
    metadata.insert("calibrated".into(), json!(true));

    let names = labels(&["H", "K", "pol"]);
    create_container(&path, &array, &coordinates, &names, &metadata).unwrap();
    let loaded = load_container(&path).unwrap();

    assert_eq!(loaded.labels, labels(&["H", "K", "pol"]));
    assert_eq!(loaded.coordinates, coordinates);
    assert_eq!(loaded.metadata, metadata);
    assert_eq!(loaded.array.shape(), &[3, 4, 2]);
    for (a, b) in loaded.array.iter().zip(array.iter()) {
        assert_eq!(a.to_bits(), b.to_bits());
    }
}

#[test]
fn nan_values_survive() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nan.iau");
    let mut array = sample_array(&[2, 2]);
    array[[0, 1]] = f64::NAN;
    let coordinates = vec![Coordinates::indices(2), Coordinates::indices(2)];

    let names = labels(&["x", "y"]);
    create_container(&path, &array, &coordinates, &names, &Metadata::new()).unwrap();
    let dataset = load_dataset(&path).unwrap();

    assert!(dataset.array()[[0, 1]].is_nan());
    assert_eq!(dataset.array()[[1, 1]], array[[1, 1]]);
}

#[test]
fn save_dataset_round_trips() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("saved.iau");
    let dataset = Dataset::new(
        sample_array(&[2, 3]),
        vec![Coordinates::Numeric(vec![10.0, 20.0]), Coordinates::indices(3)],
        labels(&["E", "k"]),
        Metadata::new(),
    )
    .unwrap();

    save_dataset(&path, &dataset).unwrap();
    assert_eq!(load_dataset(&path).unwrap(), dataset);
}

#[test]
fn overwrites_existing_container() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("scan.iau");
    let coordinates = vec![Coordinates::indices(2)];

    let first = ArrayD::from_shape_vec(IxDyn(&[2]), vec![1.0, 2.0]).unwrap();
    create_container(&path, &first, &coordinates, &labels(&["x"]), &Metadata::new()).unwrap();
    let second = ArrayD::from_shape_vec(IxDyn(&[2]), vec![3.0, 4.0]).unwrap();
    create_container(&path, &second, &coordinates, &labels(&["x"]), &Metadata::new()).unwrap();

    assert_eq!(load_container(&path).unwrap().array, second);
    assert_eq!(dir_entries(dir.path()), 1);
}

#[test]
fn missing_directory_is_a_path_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nowhere").join("scan.iau");
    let array = sample_array(&[2]);

    let coordinates = [Coordinates::indices(2)];
    let err = create_container(&path, &array, &coordinates, &labels(&["x"]), &Metadata::new())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Path);
}

#[test]
fn coordinate_length_mismatch_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.iau");
    let array = sample_array(&[3, 2]);
    let coordinates = vec![Coordinates::indices(3), Coordinates::indices(5)];

    let names = labels(&["x", "y"]);
    let err = create_container(&path, &array, &coordinates, &names, &Metadata::new()).unwrap_err();
    assert!(matches!(err, IauError::ShapeMismatch(_)));
    assert!(!path.exists());
    assert_eq!(dir_entries(dir.path()), 0);
}

#[test]
fn label_problems_are_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.iau");
    let array = sample_array(&[2, 2]);
    let coordinates = vec![Coordinates::indices(2), Coordinates::indices(2)];

    let err = create_container(&path, &array, &coordinates, &labels(&["x"]), &Metadata::new())
        .unwrap_err();
    assert!(matches!(err, IauError::ShapeMismatch(_)));

    let names = labels(&["x", "x"]);
    let err = create_container(&path, &array, &coordinates, &names, &Metadata::new()).unwrap_err();
    assert!(matches!(err, IauError::InvalidLabels(_)));

    let names = labels(&["x", "data"]);
    let err = create_container(&path, &array, &coordinates, &names, &Metadata::new()).unwrap_err();
    assert!(matches!(err, IauError::InvalidLabels(_)));
    assert!(!path.exists());
}

#[test]
fn nested_metadata_is_rejected() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("bad.iau");
    let mut metadata = Metadata::new();
    metadata.insert("angles".into(), json!([1, 2, 3]));

    let err = create_container(
        &path,
        &sample_array(&[2]),
        &[Coordinates::indices(2)],
        &labels(&["x"]),
        &metadata,
    )
    .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(!path.exists());
}

#[test]
fn loading_a_missing_file_is_a_path_error() {
    let dir = TempDir::new().unwrap();
    let err = load_container(&dir.path().join("absent.iau")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Path);
}

#[test]
fn netcdf_without_data_is_a_format_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("foreign.nc");
    {
        let mut file = netcdf::create(&path).unwrap();
        file.add_dimension("x", 3).unwrap();
        let mut var = file.add_variable::<f64>("x", &["x"]).unwrap();
        var.put_values(&[0.0, 1.0, 2.0], ..).unwrap();
    }

    let err = load_container(&path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
}

#[test]
fn missing_metadata_is_a_format_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nometa.nc");
    {
        let mut file = netcdf::create(&path).unwrap();
        file.add_dimension("x", 2).unwrap();
        let mut coords = file.add_variable::<f64>("x", &["x"]).unwrap();
        coords.put_values(&[0.0, 1.0], ..).unwrap();
        let mut data = file.add_variable::<f64>("data", &["x"]).unwrap();
        data.put_values(&[5.0, 6.0], ..).unwrap();
    }

    let err = load_container(&path).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Format);
}
