use crate::domain::DomainInitializer;
use crate::model::processed::{ProcessedData, ProcessedDataKind};
use crate::spec::property::{AggregateFunction, AggregatePropertyDefinition, ValueType};
use chartdata_common::data::datum::Datum;

/// Aggregate definition with the value columns its group ids matched
#[derive(Debug, Clone)]
pub struct ResolvedAggregate {
    pub def: AggregatePropertyDefinition,
    pub columns: Vec<usize>,
}

pub fn compute_aggregate<'a, I>(function: &AggregateFunction, values: I) -> [f64; 2]
where
    I: IntoIterator<Item = &'a Datum>,
{
    match function {
        AggregateFunction::Sum => {
            let mut acc = [0.0, 0.0];
            for v in values.into_iter().filter_map(Datum::as_finite_f64) {
                if v < 0.0 {
                    acc[0] += v;
                } else if v > 0.0 {
                    acc[1] += v;
                }
            }
            acc
        }
        AggregateFunction::Range => {
            let mut acc = [f64::INFINITY, f64::NEG_INFINITY];
            for v in values.into_iter().filter_map(Datum::as_finite_f64) {
                acc[0] = acc[0].min(v);
                acc[1] = acc[1].max(v);
            }
            if acc[0] > acc[1] {
                [f64::NAN, f64::NAN]
            } else {
                acc
            }
        }
        AggregateFunction::Count => {
            let n = values.into_iter().filter(|v| !v.is_undefined()).count();
            [0.0, n as f64]
        }
        AggregateFunction::Custom(f) => {
            let values = values.into_iter().cloned().collect::<Vec<_>>();
            f(&values)
        }
    }
}

/// Compute every aggregate for each group, or for each row of ungrouped data
pub fn aggregate_data(processed: &mut ProcessedData, aggregates: &[ResolvedAggregate]) {
    if aggregates.is_empty() {
        return;
    }
    let data: &ProcessedData = processed;
    let units = (0..data.unit_count())
        .map(|unit| {
            let indices = data.unit_datum_indices(unit);
            aggregates
                .iter()
                .map(|aggregate| {
                    let values = aggregate.columns.iter().flat_map(|&column| {
                        indices.iter().map(move |&row| &data.columns[column][row])
                    });
                    compute_aggregate(&aggregate.def.function, values)
                })
                .collect::<Vec<_>>()
        })
        .collect::<Vec<_>>();

    match processed.kind {
        ProcessedDataKind::Grouped => {
            for (group, aggregation) in processed.groups.iter_mut().zip(units) {
                group.aggregation = aggregation;
            }
        }
        ProcessedDataKind::Ungrouped => processed.row_aggregation = units,
    }
}

/// `domain.agg_values` from the final aggregate pairs
pub fn aggregate_domains(processed: &mut ProcessedData, aggregate_count: usize) {
    if aggregate_count == 0 {
        return;
    }
    let mut domains = vec![DomainInitializer::new(ValueType::Range); aggregate_count];
    for unit in 0..processed.unit_count() {
        for (domain, pair) in domains.iter_mut().zip(processed.unit_aggregation(unit)) {
            domain.observe_f64(pair[0]);
            domain.observe_f64(pair[1]);
        }
    }
    processed.domain.agg_values = domains.iter().map(DomainInitializer::domain).collect();
}
