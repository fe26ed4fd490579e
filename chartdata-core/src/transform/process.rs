use crate::domain::Domain;
use crate::model::processed::{ProcessedData, ReducedValue};
use crate::spec::property::{
    DatumPropertyDefinition, ProcessorDefinition, ProcessorKind, ValueType,
};
use crate::transform::diff::diff_processed;
use chartdata_common::data::datum::Datum;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Whether key (and selected value) columns can be tweened between runs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnimationValidation {
    pub unique_keys: bool,
    pub ordered_keys: bool,
}

impl Default for AnimationValidation {
    fn default() -> Self {
        Self {
            unique_keys: true,
            ordered_keys: true,
        }
    }
}

/// Run every processor against the finished data, then store the results.
///
/// Processors all see the same data: nothing a processor returns is visible to
/// the ones after it.
pub fn post_process(processed: &mut ProcessedData, processors: &[ProcessorDefinition]) {
    let data: &ProcessedData = processed;
    let results = processors
        .iter()
        .map(|def| {
            let result = match &def.calculate {
                ProcessorKind::SortDomainGroups => match &data.domain.groups {
                    Some(groups) => ReducedValue::Groups(sort_domain_groups(groups)),
                    None => ReducedValue::Datum(Datum::Undefined),
                },
                ProcessorKind::AnimationValidation { value_ids } => ReducedValue::AnimationValidation(
                    animation_validation(data, value_ids.as_deref(), &def.scopes),
                ),
                ProcessorKind::Diff {
                    previous,
                    update_moved_data,
                } => ReducedValue::Diff(diff_processed(
                    previous.as_deref(),
                    data,
                    *update_moved_data,
                )),
                ProcessorKind::Custom(calculate) => ReducedValue::Datum(calculate(data)),
            };
            (def.property.clone(), result)
        })
        .collect::<Vec<_>>();
    processed.reduced.extend(results);
}

fn compare_datum(a: &Datum, b: &Datum) -> Ordering {
    match (a, b) {
        (Datum::Number(_) | Datum::Date(_), Datum::Number(_) | Datum::Date(_)) => {
            let (a, b) = (a.as_f64().unwrap_or(f64::NAN), b.as_f64().unwrap_or(f64::NAN));
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        _ => a.to_string().cmp(&b.to_string()),
    }
}

/// Stable sort of group key tuples, comparing one dimension at a time
pub fn sort_domain_groups(groups: &[Vec<Datum>]) -> Vec<Vec<Datum>> {
    let mut sorted = groups.to_vec();
    sorted.sort_by(|a, b| {
        a.iter()
            .zip(b.iter())
            .map(|(a, b)| compare_datum(a, b))
            .find(|ordering| ordering.is_ne())
            .unwrap_or_else(|| a.len().cmp(&b.len()))
    });
    sorted
}

fn check_column<'a, I>(value_type: ValueType, domain: &Domain, values: I, result: &mut AnimationValidation)
where
    I: IntoIterator<Item = &'a Datum>,
{
    match value_type {
        ValueType::Category => {
            let count = values.into_iter().count();
            let domain_len = domain.as_category().map(|d| d.len()).unwrap_or(0);
            if domain_len != count {
                result.unique_keys = false;
            }
        }
        ValueType::Range => {
            let mut last: Option<f64> = None;
            for value in values {
                let Some(next) = value.as_f64() else {
                    continue;
                };
                if let Some(last) = last {
                    if last > next {
                        result.ordered_keys = false;
                    }
                    if last == next {
                        result.unique_keys = false;
                    }
                }
                last = Some(next);
            }
        }
    }
}

fn value_selected(def: &DatumPropertyDefinition, scopes: &[String], id: &str) -> bool {
    if scopes.is_empty() {
        def.id.as_deref() == Some(id) || def.ids_map.values().any(|ids| ids.contains(id))
    } else {
        scopes.iter().any(|scope| def.matches_id(scope, id))
    }
}

/// Scan key columns (per group when grouped) and the selected value columns for
/// duplicates and ordering. Value ids resolve within `scopes`.
pub fn animation_validation(
    processed: &ProcessedData,
    value_ids: Option<&[String]>,
    scopes: &[String],
) -> AnimationValidation {
    let mut result = AnimationValidation::default();
    let units = (0..processed.unit_count())
        .map(|unit| processed.unit_keys(unit))
        .collect::<Vec<_>>();
    for (k, def) in processed.defs.keys.iter().enumerate() {
        check_column(
            def.def.value_type,
            &processed.domain.keys[k],
            units.iter().filter_map(|keys| keys.get(k)),
            &mut result,
        );
    }
    for (c, def) in processed.defs.values.iter().enumerate() {
        let selected = value_ids
            .is_some_and(|ids| ids.iter().any(|id| value_selected(&def.def, scopes, id)));
        if selected {
            check_column(
                def.def.value_type,
                &processed.domain.values[c],
                &processed.columns[c],
                &mut result,
            );
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::data_model::DataModel;
    use crate::model::options::DataModelOptions;
    use crate::spec::builders::{
        animation_validation as animation_validation_def, custom_processor, key_property,
        processor_fn, sort_domain_groups as sort_domain_groups_def, value_property,
        ANIMATION_VALIDATION, SORTED_GROUP_DOMAIN,
    };
    use chartdata_common::data::datum::DatumObject;

    fn records(rows: &[(Datum, f64)]) -> Vec<Datum> {
        rows.iter()
            .map(|(k, v)| {
                Datum::Object(DatumObject::new([
                    ("k", k.clone()),
                    ("v", Datum::from(*v)),
                ]))
            })
            .collect()
    }

    #[test]
    fn test_sort_domain_groups() {
        let groups = vec![
            vec![Datum::from(10.0), Datum::from("b")],
            vec![Datum::from(2.0), Datum::from("z")],
            vec![Datum::from(10.0), Datum::from("a")],
        ];
        assert_eq!(
            sort_domain_groups(&groups),
            vec![
                vec![Datum::from(2.0), Datum::from("z")],
                vec![Datum::from(10.0), Datum::from("a")],
                vec![Datum::from(10.0), Datum::from("b")],
            ]
        );
    }

    #[test]
    fn test_sorted_group_domain_processor() {
        let model = DataModel::try_new(
            DataModelOptions::new(vec![
                key_property("k", ValueType::Category),
                value_property("v", ValueType::Range),
                sort_domain_groups_def(),
            ])
            .with_group_by_keys(true),
        )
        .unwrap();
        let data = records(&[
            (Datum::from("c"), 1.0),
            (Datum::from("a"), 2.0),
            (Datum::from("b"), 3.0),
        ]);
        let processed = model.process_data(&data).unwrap();
        assert_eq!(
            processed.reduced_groups(SORTED_GROUP_DOMAIN).unwrap(),
            &[
                vec![Datum::from("a")],
                vec![Datum::from("b")],
                vec![Datum::from("c")]
            ]
        );
    }

    #[test]
    fn test_animation_validation() {
        let model = DataModel::try_new(DataModelOptions::new(vec![
            key_property("k", ValueType::Range),
            value_property("v", ValueType::Range).with_id("yValue"),
            animation_validation_def(Some(vec!["yValue".to_string()])),
        ]))
        .unwrap();

        let ordered = records(&[(Datum::from(1.0), 1.0), (Datum::from(2.0), 2.0)]);
        let processed = model.process_data(&ordered).unwrap();
        assert_eq!(
            processed.reduced_animation_validation(ANIMATION_VALIDATION),
            Some(&AnimationValidation {
                unique_keys: true,
                ordered_keys: true
            })
        );

        let repeated = records(&[(Datum::from(2.0), 1.0), (Datum::from(2.0), 0.0)]);
        let processed = model.process_data(&repeated).unwrap();
        assert_eq!(
            processed.reduced_animation_validation(ANIMATION_VALIDATION),
            Some(&AnimationValidation {
                unique_keys: false,
                ordered_keys: false
            })
        );
    }

    #[test]
    fn test_processors_see_the_same_data() {
        let model = DataModel::try_new(DataModelOptions::new(vec![
            key_property("k", ValueType::Category),
            custom_processor("first", processor_fn(|data| Datum::from(data.reduced.len() as f64))),
            custom_processor("second", processor_fn(|data| Datum::from(data.reduced.len() as f64))),
        ]))
        .unwrap();
        let processed = model
            .process_data(&records(&[(Datum::from("a"), 1.0)]))
            .unwrap();
        assert_eq!(processed.reduced_datum("first"), Some(&Datum::from(0.0)));
        assert_eq!(processed.reduced_datum("second"), Some(&Datum::from(0.0)));
    }
}
