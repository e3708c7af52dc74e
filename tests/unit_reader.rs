//! Unit tests for the tensor and pattern readers

use std::fs;

use nclusterbox::config::ShiftMode;
use nclusterbox::reader::{PatternReader, TupleReader};
use nclusterbox::tensor::preprocess;
use nclusterbox::{Error, NSet, Preprocessed};
use tempfile::tempdir;

const BLOCK: &str = "a x 1\na y 1\nb x 1\nb y 1\nc z 1\n";

fn block() -> Preprocessed {
    let raw = TupleReader::new(" ", ",", false)
        .read(BLOCK.as_bytes(), "block")
        .unwrap();
    preprocess(raw, ShiftMode::Mean, 1.0).unwrap()
}

#[test]
fn test_read_tensor_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("tensor.txt");
    fs::write(&path, "a;b\tx 0.5\r\nc\tx,y 1\n").unwrap();
    let raw = TupleReader::new(" \t", ",;", false).read_path(&path).unwrap();
    assert_eq!(raw.labels.len(), 2);
    assert_eq!(raw.labels[0].len(), 3);
    assert_eq!(raw.labels[1].len(), 2);
    assert_eq!(raw.tuples.len(), 4);
    assert!(!raw.is_crisp);
}

#[test]
fn test_missing_tensor_file() {
    let dir = tempdir().unwrap();
    let result = TupleReader::new(" ", ",", false).read_path(&dir.path().join("absent.txt"));
    match result {
        Err(error @ Error::NoInput { .. }) => assert_eq!(error.exit_code(), 66),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_duplicate_tuples_keep_the_first() {
    let raw = TupleReader::new(" ", ",", false)
        .read("a x 0.25\na x 0.75\n".as_bytes(), "test")
        .unwrap();
    assert_eq!(raw.tuples.len(), 1);
    assert_eq!(raw.tuples[0].membership, 0.25);
}

#[test]
fn test_data_format_message() {
    let error = TupleReader::new(" ", ",", false)
        .read("a x 1\nb y z\n".as_bytes(), "tensor.txt")
        .unwrap_err();
    assert_eq!(
        error.to_string(),
        "tensor.txt:2: the membership, z, should be a double in [0, 1]!"
    );
}

#[test]
fn test_patterns_skip_bad_lines() {
    let pre = block();
    let text = "a,b x,y\nq x\n a x\n\nb\na,a x\nc z\n";
    let mut patterns: Vec<NSet> = Vec::new();
    let count = PatternReader::new(&pre.context, " ", ",")
        .read(text.as_bytes(), "patterns", None, |nset| patterns.push(nset))
        .unwrap();
    assert_eq!(count, 3);
    assert_eq!(patterns.len(), 3);
    let labels: Vec<Vec<Vec<&str>>> = patterns
        .iter()
        .map(|nset| pre.context.external_labels(nset))
        .collect();
    assert_eq!(labels[0], vec![vec!["a", "b"], vec!["x", "y"]]);
    assert_eq!(labels[1], vec![vec!["a"], vec!["x"]]);
    assert_eq!(labels[2], vec![vec!["c"], vec!["z"]]);
}

#[test]
fn test_patterns_stop_at_max() {
    let pre = block();
    let dir = tempdir().unwrap();
    let path = dir.path().join("patterns.txt");
    fs::write(&path, "a x\nb y\nc z\n").unwrap();
    let mut patterns: Vec<NSet> = Vec::new();
    let count = PatternReader::new(&pre.context, " ", ",")
        .read_path(&path, Some(2), |nset| patterns.push(nset))
        .unwrap();
    assert_eq!(count, 2);
    assert_eq!(patterns.len(), 2);
}

#[test]
fn test_pattern_subsets_are_sorted() {
    let pre = block();
    let mut patterns: Vec<NSet> = Vec::new();
    PatternReader::new(&pre.context, " ", ",")
        .read("c,b,a z,y\n".as_bytes(), "patterns", None, |nset| patterns.push(nset))
        .unwrap();
    assert_eq!(patterns.len(), 1);
    let sizes: Vec<usize> = patterns[0].iter().map(Vec::len).collect();
    assert_eq!(sizes, vec![3, 2]);
    for subset in &patterns[0] {
        assert!(subset.windows(2).all(|pair| pair[0] < pair[1]));
    }
    assert_eq!(
        pre.context.internal_pattern(&pre.context.external_labels(&patterns[0])),
        Some(patterns[0].clone())
    );
}
