use chartdata_common::data::datum::Datum;
use float_cmp::approx_eq;

pub fn assert_column_approx_eq(column: &[Datum], expected: &[f64]) {
    assert_eq!(column.len(), expected.len(), "column length mismatch");
    for (i, (actual, expected)) in column.iter().zip(expected).enumerate() {
        let actual = actual
            .as_f64()
            .unwrap_or_else(|| panic!("row {i}: {actual:?} is not numeric"));
        assert!(
            approx_eq!(f64, actual, *expected, epsilon = 1e-9),
            "row {i}: {actual} != {expected}"
        );
    }
}

pub fn assert_pair_approx_eq(actual: [f64; 2], expected: [f64; 2]) {
    assert!(
        approx_eq!(f64, actual[0], expected[0], epsilon = 1e-9)
            && approx_eq!(f64, actual[1], expected[1], epsilon = 1e-9),
        "{actual:?} != {expected:?}"
    );
}
