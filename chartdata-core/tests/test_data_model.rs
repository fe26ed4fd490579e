mod util;

use chartdata_common::data::datum::{records_from_json, Datum};
use chartdata_core::domain::Domain;
use chartdata_core::model::data_model::{DataModel, DomainKind};
use chartdata_core::model::options::DataModelOptions;
use chartdata_core::model::processed::{DataWarningKind, ProcessedData};
use chartdata_core::spec::builders::{
    accumulate_group, custom_group_value_processor, custom_property_value_processor, diff,
    is_finite_number, key_property, normalise_group_to, normalise_property_to,
    property_adjust_fn, sum, value_property, DIFF,
};
use chartdata_core::spec::property::{
    AccumulateMode, GroupValueAdjustFn, NormaliseMode, PropertyDefinition, ValueType,
};
use rstest::rstest;
use serde_json::json;
use std::collections::BTreeSet;
use std::sync::Arc;
use util::datasets::{key_value_rows, quarterly_sales};
use util::equality::{assert_column_approx_eq, assert_pair_approx_eq};

fn stacked_props() -> Vec<PropertyDefinition> {
    vec![
        key_property("quarter", ValueType::Category).with_id("xValue"),
        value_property("revenue", ValueType::Range)
            .with_id("revenue")
            .with_group_id("stack")
            .with_validation_fn(is_finite_number()),
        value_property("cost", ValueType::Range)
            .with_id("cost")
            .with_group_id("stack")
            .with_validation_fn(is_finite_number()),
        sum(["stack"]).with_id("total"),
    ]
}

#[cfg(test)]
mod test_extraction {
    use super::*;

    #[test]
    fn test_key_after_value_fails_construction() {
        let result = DataModel::try_new(DataModelOptions::new(vec![
            value_property("v", ValueType::Range),
            key_property("k", ValueType::Category),
        ]));
        assert!(result.unwrap_err().is_configuration());
    }

    #[rstest(group_by_keys, case(false), case(true))]
    fn test_row_count_invariant(group_by_keys: bool) {
        let data = records_from_json(&json!([
            {"k": "a", "v": 1},
            {"k": "b", "v": "bad"},
            {"k": "c"},
            {"k": "a", "v": 4}
        ]));
        let model = DataModel::try_new(
            DataModelOptions::new(vec![
                key_property("k", ValueType::Category),
                value_property("v", ValueType::Range).with_validation_fn(is_finite_number()),
            ])
            .with_group_by_keys(group_by_keys),
        )
        .unwrap();
        let processed = model.process_data(&data).unwrap();
        assert_eq!(processed.len(), 2);
        assert_eq!(processed.input_len, 4);
        for column in processed.keys.iter().chain(processed.columns.iter()) {
            assert_eq!(column.len(), processed.raw_data.len());
        }
    }

    #[test]
    fn test_range_domain_covers_valid_values_only() {
        let data = records_from_json(&json!([
            {"k": "a", "v": 3},
            {"k": "b", "v": "bad"},
            {"k": "c", "v": -2},
            {"k": "d", "v": 7}
        ]));
        let model = DataModel::try_new(DataModelOptions::new(vec![
            key_property("k", ValueType::Category),
            value_property("v", ValueType::Range).with_validation_fn(is_finite_number()),
        ]))
        .unwrap();
        let processed = model.process_data(&data).unwrap();
        assert_eq!(processed.domain.values[0], Domain::Range(Some([-2.0, 7.0])));
        assert_eq!(
            processed.domain.keys[0],
            Domain::Category(vec![Datum::from("a"), Datum::from("c"), Datum::from("d")])
        );
    }

    #[test]
    fn test_empty_input_has_empty_domains() {
        let model = DataModel::try_new(DataModelOptions::new(vec![
            key_property("k", ValueType::Category),
            value_property("v", ValueType::Range),
        ]))
        .unwrap();
        let processed = model.process_data(&[]).unwrap();
        assert!(processed.is_empty());
        assert_eq!(processed.domain.keys[0], Domain::Category(Vec::new()));
        assert_eq!(processed.domain.values[0], Domain::Range(None));
    }

    #[test]
    fn test_missing_value_substitution() {
        let data = records_from_json(&json!([{"k": "Q1"}]));
        let model = DataModel::try_new(DataModelOptions::new(vec![
            key_property("k", ValueType::Category),
            value_property("v", ValueType::Range).with_missing_value(Datum::Null),
        ]))
        .unwrap();
        let processed = model.process_data(&data).unwrap();
        assert_eq!(processed.len(), 1);
        assert_eq!(processed.columns[0], vec![Datum::Null]);
        assert_eq!(processed.domain.values[0], Domain::Range(None));
    }

    #[test]
    fn test_missing_field_is_reported_once() {
        let data = records_from_json(&json!([{"k": "Q1"}, {"k": "Q2"}, {"k": "Q3", "v": 1}]));
        let model = DataModel::try_new(DataModelOptions::new(vec![
            key_property("k", ValueType::Category),
            value_property("v", ValueType::Range),
        ]))
        .unwrap();
        let processed = model.process_data(&data).unwrap();
        assert_eq!(processed.len(), 3);
        assert_eq!(processed.columns[0][0], Datum::Undefined);
        assert_eq!(processed.warnings.len(), 1);
        assert_eq!(processed.warnings[0].kind, DataWarningKind::MissingValue);
        assert!(processed.defs.values[0].missing);
    }

    #[test]
    fn test_validation_drop_warns_once() {
        let data = records_from_json(&json!([
            {"k": "Q1", "v": "bad"},
            {"k": "Q2", "v": 5}
        ]));
        let model = DataModel::try_new(DataModelOptions::new(vec![
            key_property("k", ValueType::Category),
            value_property("v", ValueType::Range).with_validation_fn(is_finite_number()),
        ]))
        .unwrap();
        let processed = model.process_data(&data).unwrap();
        assert_eq!(processed.raw_data.len(), 1);
        assert_eq!(processed.keys[0], vec![Datum::from("Q2")]);
        assert_eq!(processed.invalid_count, 1);
        assert_eq!(processed.warnings.len(), 1);
        assert_eq!(processed.warnings[0].kind, DataWarningKind::InvalidValue);
        assert_eq!(processed.warnings[0].count, 1);
    }

    #[test]
    fn test_invalid_value_substitution_keeps_row() {
        let data = records_from_json(&json!([{"k": "Q1", "v": "bad"}, {"k": "Q2", "v": 5}]));
        let model = DataModel::try_new(DataModelOptions::new(vec![
            key_property("k", ValueType::Category),
            value_property("v", ValueType::Range)
                .with_validation_fn(is_finite_number())
                .with_invalid_value(0.0),
        ]))
        .unwrap();
        let processed = model.process_data(&data).unwrap();
        assert_eq!(processed.len(), 2);
        assert_eq!(processed.columns[0], vec![Datum::from(0.0), Datum::from(5.0)]);
        assert!(processed.warnings.is_empty());
    }
}

#[cfg(test)]
mod test_grouping {
    use super::*;

    #[test]
    fn test_group_partition() {
        let data = quarterly_sales();
        let model = DataModel::try_new(
            DataModelOptions::new(stacked_props()).with_group_by_keys(true),
        )
        .unwrap();
        let processed = model.process_data(&data).unwrap();
        assert_eq!(processed.groups.len(), 3);

        let mut seen = processed
            .groups
            .iter()
            .flat_map(|group| group.datum_indices.iter().copied())
            .collect::<Vec<_>>();
        seen.sort_unstable();
        assert_eq!(seen, (0..processed.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_stacked_sums() {
        let data = quarterly_sales();
        let model = DataModel::try_new(
            DataModelOptions::new(stacked_props()).with_group_by_keys(true),
        )
        .unwrap();
        let processed = model.process_data(&data).unwrap();
        assert_eq!(processed.groups[0].aggregation, vec![[-10.0, 40.0]]);
        assert_eq!(processed.groups[1].aggregation, vec![[-20.0, 40.0]]);
        assert_eq!(processed.groups[2].aggregation, vec![[-2.0, 20.0]]);
        assert_eq!(
            model
                .get_domain("", "total", DomainKind::Aggregate, &processed)
                .unwrap(),
            Domain::Range(Some([-20.0, 40.0]))
        );
    }
}

#[cfg(test)]
mod test_normalisation {
    use super::*;

    fn normalised_model(passes: usize) -> DataModel {
        let mut props = stacked_props();
        for _ in 0..passes {
            props.push(normalise_group_to(["stack"], 100.0, NormaliseMode::Sum));
        }
        DataModel::try_new(DataModelOptions::new(props).with_group_by_keys(true)).unwrap()
    }

    #[test]
    fn test_normalise_group_to_bound() {
        let processed = normalised_model(1).process_data(&quarterly_sales()).unwrap();
        assert_column_approx_eq(&processed.columns[0], &[25.0, 75.0, 50.0, 50.0, 25.0, 75.0]);
        assert_column_approx_eq(&processed.columns[1], &[-10.0, -15.0, -12.5, -37.5, 0.0, -10.0]);
        for group in &processed.groups {
            let [negative, positive] = group.aggregation[0];
            assert!(negative.abs() <= 100.0);
            assert!(positive <= 100.0);
        }
        assert_pair_approx_eq(processed.groups[1].aggregation[0], [-50.0, 100.0]);
        assert_eq!(
            processed.domain.values[0],
            Domain::Range(Some([25.0, 75.0]))
        );
    }

    #[test]
    fn test_normalise_group_to_ungrouped_rows() {
        let mut props = stacked_props();
        props.push(normalise_group_to(["stack"], 100.0, NormaliseMode::Sum));
        let model = DataModel::try_new(DataModelOptions::new(props)).unwrap();
        let processed = model.process_data(&quarterly_sales()).unwrap();

        // Each row is scaled by its own extent
        assert_column_approx_eq(&processed.columns[0], &[100.0; 6]);
        assert_column_approx_eq(
            &processed.columns[1],
            &[-40.0, -20.0, -25.0, -75.0, 0.0, -40.0 / 3.0],
        );
        assert_eq!(processed.row_aggregation.len(), 6);
        assert_pair_approx_eq(processed.row_aggregation[0][0], [-40.0, 100.0]);
        assert_pair_approx_eq(processed.row_aggregation[3][0], [-75.0, 100.0]);
        assert_pair_approx_eq(processed.row_aggregation[4][0], [0.0, 100.0]);
    }

    #[rstest(group_by_keys, case(true), case(false))]
    fn test_normalise_group_to_fixed_point(group_by_keys: bool) {
        let run = |passes: usize| {
            let mut props = stacked_props();
            for _ in 0..passes {
                props.push(normalise_group_to(["stack"], 100.0, NormaliseMode::Sum));
            }
            DataModel::try_new(DataModelOptions::new(props).with_group_by_keys(group_by_keys))
                .unwrap()
                .process_data(&quarterly_sales())
                .unwrap()
        };
        let (once, twice) = (run(1), run(2));
        assert_eq!(once.columns, twice.columns);
        for unit in 0..once.unit_count() {
            let [negative, positive] = once.unit_aggregation(unit)[0];
            assert!(negative.abs() <= 100.0);
            assert!(positive <= 100.0);
            assert_eq!(once.unit_aggregation(unit), twice.unit_aggregation(unit));
        }
    }

    #[test]
    fn test_normalise_group_to_range_mode() {
        let mut props = stacked_props();
        props.push(normalise_group_to(["stack"], 100.0, NormaliseMode::Range));
        let model =
            DataModel::try_new(DataModelOptions::new(props).with_group_by_keys(true)).unwrap();
        let processed = model.process_data(&quarterly_sales()).unwrap();

        // Extents are the largest single magnitude per quarter: 30, 20 and 15
        assert_column_approx_eq(
            &processed.columns[0],
            &[100.0 / 3.0, 100.0, 100.0, 100.0, 100.0 / 3.0, 100.0],
        );
        assert_column_approx_eq(
            &processed.columns[1],
            &[-40.0 / 3.0, -20.0, -25.0, -75.0, 0.0, -40.0 / 3.0],
        );
    }

    #[rstest(
        mode,
        separate_negative,
        expected,
        case(AccumulateMode::Normal, false, [[1.0, 2.0], [-1.0, 7.0], [2.0, 6.0]]),
        case(AccumulateMode::Normal, true, [[1.0, 2.0], [-2.0, 7.0], [4.0, -1.0]]),
        case(AccumulateMode::Trailing, false, [[0.0, 0.0], [1.0, 2.0], [-1.0, 7.0]])
    )]
    fn test_accumulate_group(mode: AccumulateMode, separate_negative: bool, expected: [[f64; 2]; 3]) {
        // Both rows share a key, stacking stays within each row
        let data = records_from_json(&json!([
            {"k": "a", "x": 1, "y": -2, "z": 3},
            {"k": "a", "x": 2, "y": 5, "z": -1}
        ]));
        let model = DataModel::try_new(
            DataModelOptions::new(vec![
                key_property("k", ValueType::Category),
                value_property("x", ValueType::Range).with_group_id("acc"),
                value_property("y", ValueType::Range).with_group_id("acc"),
                value_property("z", ValueType::Range).with_group_id("acc"),
                accumulate_group(["acc"], mode, separate_negative),
            ])
            .with_group_by_keys(true),
        )
        .unwrap();
        let processed = model.process_data(&data).unwrap();
        assert_eq!(processed.groups.len(), 1);
        for (column, expected) in processed.columns.iter().zip(&expected) {
            assert_column_approx_eq(column, expected);
        }
    }

    #[test]
    fn test_custom_group_value_processor() {
        let mut props = stacked_props();
        props.push(custom_group_value_processor(["stack"], || -> GroupValueAdjustFn {
            Box::new(|columns: &mut [Vec<Datum>], matched: &[usize], row: usize| {
                let (revenue, cost) = (matched[0], matched[1]);
                if let (Some(r), Some(c)) = (
                    columns[revenue][row].as_finite_f64(),
                    columns[cost][row].as_finite_f64(),
                ) {
                    columns[cost][row] = Datum::from(r + c);
                }
            })
        }));
        let model = DataModel::try_new(DataModelOptions::new(props)).unwrap();
        let processed = model.process_data(&quarterly_sales()).unwrap();
        assert_column_approx_eq(&processed.columns[1], &[6.0, 24.0, 15.0, 5.0, 5.0, 13.0]);
        assert_eq!(processed.domain.values[1], Domain::Range(Some([5.0, 24.0])));
    }

    #[test]
    fn test_normalise_property_to() {
        let data = key_value_rows(&[("a", 10.0), ("b", 15.0), ("c", 20.0)]);
        let model = DataModel::try_new(DataModelOptions::new(vec![
            key_property("k", ValueType::Category),
            value_property("v", ValueType::Range),
            normalise_property_to("v", [0.0, 1.0], 0.5, None, None),
        ]))
        .unwrap();
        let processed = model.process_data(&data).unwrap();
        assert_column_approx_eq(&processed.columns[0], &[0.0, 0.5, 1.0]);
        assert_eq!(processed.domain.values[0], Domain::Range(Some([0.0, 1.0])));
    }

    #[test]
    fn test_normalise_property_to_inverted_target() {
        let data = key_value_rows(&[("a", 1.0), ("b", 2.0), ("c", 3.0)]);
        let model = DataModel::try_new(DataModelOptions::new(vec![
            key_property("k", ValueType::Category),
            value_property("v", ValueType::Range),
            normalise_property_to("v", [10.0, 0.0], 5.0, None, None),
        ]))
        .unwrap();
        let processed = model.process_data(&data).unwrap();
        assert_column_approx_eq(&processed.columns[0], &[10.0, 5.0, 0.0]);
    }

    #[test]
    fn test_custom_property_value_processor() {
        let data = key_value_rows(&[("a", 1.0), ("b", 2.0)]);
        let model = DataModel::try_new(DataModelOptions::new(vec![
            key_property("k", ValueType::Category),
            value_property("v", ValueType::Range),
            custom_property_value_processor(
                "v",
                property_adjust_fn(|processed, c| {
                    for value in processed.columns[c].iter_mut() {
                        if let Some(v) = value.as_finite_f64() {
                            *value = Datum::from(v * 2.0);
                        }
                    }
                }),
            ),
        ]))
        .unwrap();
        let processed = model.process_data(&data).unwrap();
        assert_column_approx_eq(&processed.columns[0], &[2.0, 4.0]);
    }

    #[test]
    fn test_normalise_property_to_zero_span() {
        let data = key_value_rows(&[("a", 3.0), ("b", 3.0)]);
        let model = DataModel::try_new(DataModelOptions::new(vec![
            key_property("k", ValueType::Category),
            value_property("v", ValueType::Range),
            normalise_property_to("v", [0.0, 1.0], 0.5, None, None),
        ]))
        .unwrap();
        let processed = model.process_data(&data).unwrap();
        assert_column_approx_eq(&processed.columns[0], &[0.5, 0.5]);
    }
}

#[cfg(test)]
mod test_diff {
    use super::*;

    fn run(
        rows: &[(&str, f64)],
        previous: Option<Arc<ProcessedData>>,
        update_moved_data: bool,
    ) -> ProcessedData {
        DataModel::try_new(DataModelOptions::new(vec![
            key_property("k", ValueType::Category),
            value_property("v", ValueType::Range),
            diff(previous, update_moved_data),
        ]))
        .unwrap()
        .process_data(&key_value_rows(rows))
        .unwrap()
    }

    fn ids(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[rstest(
        update_moved_data,
        expected_updated,
        case(false, &[]),
        case(true, &["b"])
    )]
    fn test_diff_between_runs(update_moved_data: bool, expected_updated: &[&str]) {
        let previous = Arc::new(run(&[("a", 1.0), ("b", 2.0)], None, update_moved_data));
        let current = run(&[("b", 2.0), ("c", 3.0)], Some(previous), update_moved_data);
        let diff = current.reduced_diff(DIFF).unwrap();
        assert!(diff.changed);
        assert_eq!(diff.removed, ids(&["a"]));
        assert_eq!(diff.added, ids(&["c"]));
        assert_eq!(diff.updated, ids(expected_updated));
        assert_eq!(diff.moved, ids(expected_updated));
    }

    #[test]
    fn test_first_run_adds_everything() {
        let processed = run(&[("a", 1.0), ("b", 2.0)], None, false);
        let diff = processed.reduced_diff(DIFF).unwrap();
        assert_eq!(diff.added, ids(&["a", "b"]));
    }
}
