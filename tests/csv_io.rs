//! Loading datasets from disk and writing labelled results

mod common;

use std::fs;

use gmmr::error::Error;
use gmmr::io::{load_csv, write_results_csv};
use gmmr::mixture::{EmOptions, fit};

use common::{assert_allclose_f64, three_blobs};

#[test]
fn test_load_skips_label_column() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("points.csv");
    fs::write(&path, "x1,x2,label\n0.5,1.5,1\n-2.0,3.25,2\n").unwrap();

    let data = load_csv(&path).unwrap();
    assert_eq!(data.shape(), (2, 2));
    assert_allclose_f64(data.as_slice(), &[0.5, 1.5, -2.0, 3.25], 0.0, 0.0, "values");
}

#[test]
fn test_load_malformed_rows() {
    let dir = tempfile::tempdir().unwrap();

    let ragged = dir.path().join("ragged.csv");
    fs::write(&ragged, "x1,x2,x3\n1,2,3\n4,5\n").unwrap();
    let err = load_csv(&ragged).unwrap_err();
    assert!(matches!(err, Error::MalformedInput { line: 3, .. }), "{err}");

    let text = dir.path().join("text.csv");
    fs::write(&text, "x1\n1.0\nnope\n").unwrap();
    let err = load_csv(&text).unwrap_err();
    assert!(matches!(err, Error::MalformedInput { line: 3, .. }), "{err}");
}

#[test]
fn test_load_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = load_csv(dir.path().join("absent.csv")).unwrap_err();
    assert!(matches!(err, Error::Io(_)));
}

#[test]
fn test_fit_and_write_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("blobs.csv");
    let output = dir.path().join("results").join("labelled.csv");

    let data = three_blobs(40);
    write_results_csv(&input, &data, &vec![0; data.rows()]).unwrap();
    let loaded = load_csv(&input).unwrap();
    assert_eq!(loaded.shape(), data.shape());
    // six decimals survive the trip
    assert_allclose_f64(loaded.as_slice(), data.as_slice(), 0.0, 5e-7, "coordinates");

    let result = fit(&loaded, 3, &EmOptions::default().with_seed(40)).unwrap();
    write_results_csv(&output, &loaded, &result.labels).unwrap();

    let text = fs::read_to_string(&output).unwrap();
    let mut lines = text.lines();
    assert_eq!(lines.next(), Some("x1,x2,label"));
    let written: Vec<usize> = lines
        .map(|l| l.rsplit(',').next().unwrap().parse().unwrap())
        .collect();
    assert_eq!(written.len(), data.rows());
    for (w, l) in written.iter().zip(&result.labels) {
        assert_eq!(*w, l + 1);
    }
    assert!(written.iter().all(|&w| (1..=3).contains(&w)));
}
