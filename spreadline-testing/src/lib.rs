//! Testing helpers shared across the workspace.

use assert_float_eq::*;

pub fn assert_slice_f64_near(expected: &[f64], actual: &[f64], distance: u32) {
    assert_eq!(
        expected.len(),
        actual.len(),
        "lengths do not match: {} ≠ {}",
        expected.len(),
        actual.len()
    );
    for (index, &expected) in expected.iter().enumerate() {
        let actual = actual[index];
        if actual != expected {
            assert_f64_near!(expected, actual, distance);
        }
    }
}

pub fn assert_slice_f64_relative(expected: &[f64], actual: &[f64], epsilon: f64) {
    assert_eq!(
        expected.len(),
        actual.len(),
        "lengths do not match: {} ≠ {}",
        expected.len(),
        actual.len()
    );
    for (index, &expected) in expected.iter().enumerate() {
        let actual = actual[index];
        if actual != expected {
            assert_float_relative_eq!(expected, actual, epsilon);
        }
    }
}

/// Asserts that an optional statistic is defined and within `epsilon` of `expected`.
pub fn assert_some_f64_absolute(expected: f64, actual: Option<f64>, epsilon: f64) {
    match actual {
        None => panic!("expected {expected}, got None"),
        Some(actual) => {
            assert_float_absolute_eq!(expected, actual, epsilon);
        }
    }
}

/// Like [`assert_slice_f64_relative`], for sequences of optional statistics. A `None` must be
/// matched by a `None`.
pub fn assert_slice_opt_f64_absolute(expected: &[Option<f64>], actual: &[Option<f64>], epsilon: f64) {
    assert_eq!(
        expected.len(),
        actual.len(),
        "lengths do not match: {} ≠ {}",
        expected.len(),
        actual.len()
    );
    for (index, (expected, actual)) in expected.iter().zip(actual.iter()).enumerate() {
        match (expected, actual) {
            (None, None) => {}
            (Some(expected), Some(actual)) => {
                if actual != expected {
                    assert_float_absolute_eq!(*expected, *actual, epsilon);
                }
            }
            _ => panic!("mismatch at index {index}: expected {expected:?}, got {actual:?}"),
        }
    }
}
