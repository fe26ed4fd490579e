use crate::domain::{Domain, DomainInitializer};
use crate::model::processed::{ProcessedData, ProcessedDataKind};
use crate::spec::property::{
    AccumulateMode, GroupValueAdjust, GroupValueProcessorDefinition, NormaliseMode, PropertyAdjust,
    PropertyValueProcessorDefinition,
};
use crate::transform::aggregate::ResolvedAggregate;
use chartdata_common::data::datum::Datum;

// Relative distance under which an extent counts as already normalised
const NORMALISED_TOLERANCE: f64 = 1e-9;

/// Group value processor with the value columns its group ids matched
#[derive(Debug, Clone)]
pub struct ResolvedGroupProcessor {
    pub def: GroupValueProcessorDefinition,
    pub columns: Vec<usize>,
}

/// Property value processor with the value columns named by its property
#[derive(Debug, Clone)]
pub struct ResolvedPropertyProcessor {
    pub def: PropertyValueProcessorDefinition,
    pub columns: Vec<usize>,
}

fn clamp_to(value: f64, limit: f64) -> f64 {
    if value >= 0.0 {
        value.min(limit)
    } else {
        value.max(-limit)
    }
}

/// Signed extent of the matched values of one unit, as a magnitude
fn find_extent<'a, I>(mode: NormaliseMode, values: I) -> f64
where
    I: IntoIterator<Item = &'a Datum>,
{
    let mut acc = [0.0f64, 0.0f64];
    for v in values.into_iter().filter_map(Datum::as_finite_f64) {
        match mode {
            NormaliseMode::Sum => {
                if v < 0.0 {
                    acc[0] += v;
                } else {
                    acc[1] += v;
                }
            }
            NormaliseMode::Range => {
                acc[0] = acc[0].min(v);
                acc[1] = acc[1].max(v);
            }
        }
    }
    acc[0].abs().max(acc[1])
}

fn unit_indices(processed: &ProcessedData) -> Vec<Vec<usize>> {
    (0..processed.unit_count())
        .map(|unit| processed.unit_datum_indices(unit))
        .collect()
}

fn normalise_units(
    processed: &mut ProcessedData,
    columns: &[usize],
    aggregates: &[usize],
    normalise_to: f64,
    mode: NormaliseMode,
) {
    for (unit, indices) in unit_indices(processed).into_iter().enumerate() {
        let extent = find_extent(
            mode,
            columns
                .iter()
                .flat_map(|&c| indices.iter().map(move |&row| (c, row)))
                .map(|(c, row)| &processed.columns[c][row]),
        );
        if extent == 0.0
            || !extent.is_finite()
            || (extent - normalise_to).abs() <= normalise_to.abs() * NORMALISED_TOLERANCE
        {
            continue;
        }
        let factor = normalise_to / extent;
        for &c in columns {
            for &row in &indices {
                if let Datum::Number(v) = processed.columns[c][row] {
                    if v.is_finite() {
                        processed.columns[c][row] = Datum::Number(clamp_to(v * factor, normalise_to));
                    }
                }
            }
        }
        let aggregation = match processed.kind {
            ProcessedDataKind::Grouped => Some(&mut processed.groups[unit].aggregation),
            ProcessedDataKind::Ungrouped => processed.row_aggregation.get_mut(unit),
        };
        if let Some(aggregation) = aggregation {
            for &a in aggregates {
                if let Some(pair) = aggregation.get_mut(a) {
                    pair[0] = clamp_to(pair[0] * factor, normalise_to);
                    pair[1] = clamp_to(pair[1] * factor, normalise_to);
                }
            }
        }
    }
}

/// Stack the matched columns of each row onto each other, left to right
fn accumulate_rows(
    processed: &mut ProcessedData,
    columns: &[usize],
    mode: AccumulateMode,
    separate_negative: bool,
) {
    for row in 0..processed.len() {
        let mut acc = [0.0, 0.0];
        for &c in columns {
            let Datum::Number(v) = processed.columns[c][row] else {
                continue;
            };
            if !v.is_finite() {
                continue;
            }
            let slot = if separate_negative && v < 0.0 { 0 } else { 1 };
            if mode == AccumulateMode::Normal {
                acc[slot] += v;
            }
            processed.columns[c][row] = Datum::Number(acc[slot]);
            if mode == AccumulateMode::Trailing {
                acc[slot] += v;
            }
        }
    }
}

/// Run group value processors in declaration order, then recompute the domains of
/// every column they touched.
pub fn apply_group_processors(
    processed: &mut ProcessedData,
    processors: &[ResolvedGroupProcessor],
    aggregates: &[ResolvedAggregate],
) {
    for processor in processors {
        match &processor.def.adjust {
            GroupValueAdjust::Normalise { normalise_to, mode } => {
                // Aggregates over the same group ids are rescaled along with the values
                let matching = aggregates
                    .iter()
                    .enumerate()
                    .filter(|(_, aggregate)| {
                        aggregate
                            .def
                            .match_group_ids
                            .iter()
                            .any(|id| processor.def.match_group_ids.contains(id))
                    })
                    .map(|(i, _)| i)
                    .collect::<Vec<_>>();
                normalise_units(processed, &processor.columns, &matching, *normalise_to, *mode);
            }
            GroupValueAdjust::Accumulate {
                mode,
                separate_negative,
            } => accumulate_rows(processed, &processor.columns, *mode, *separate_negative),
            GroupValueAdjust::Custom(factory) => {
                let mut adjust = factory();
                for row in 0..processed.len() {
                    adjust(&mut processed.columns, &processor.columns, row);
                }
            }
        }
        recompute_value_domains(processed, &processor.columns);
    }
}

fn recompute_value_domains(processed: &mut ProcessedData, columns: &[usize]) {
    for &c in columns {
        let value_type = processed.defs.values[c].def.value_type;
        processed.domain.values[c] = DomainInitializer::from_column(value_type, &processed.columns[c]);
    }
}

/// Linear rescale of `value` from `[start, start + span]` into `normalise_to`.
///
/// The target may be inverted, e.g. `[10, 0]`.
fn normalise_property_value(value: f64, start: f64, span: f64, normalise_to: [f64; 2], zero_domain: f64) -> f64 {
    if span == 0.0 {
        return zero_domain;
    }
    let [lo, hi] = normalise_to;
    let result = lo + ((value - start) / span) * (hi - lo);
    result.max(lo.min(hi)).min(lo.max(hi))
}

pub fn apply_property_processors(
    processed: &mut ProcessedData,
    processors: &[ResolvedPropertyProcessor],
) {
    for processor in processors {
        for &c in &processor.columns {
            match &processor.def.adjust {
                PropertyAdjust::Normalise {
                    normalise_to,
                    zero_domain,
                    range_min,
                    range_max,
                } => {
                    let extent = processed.domain.values[c].as_range();
                    let start = range_min.or(extent.map(|[min, _]| min));
                    let end = range_max.or(extent.map(|[_, max]| max));
                    let (Some(start), Some(end)) = (start, end) else {
                        continue;
                    };
                    let span = end - start;
                    for value in processed.columns[c].iter_mut() {
                        if let Some(v) = value.as_finite_f64() {
                            *value = Datum::Number(normalise_property_value(
                                v,
                                start,
                                span,
                                *normalise_to,
                                *zero_domain,
                            ));
                        }
                    }
                    processed.domain.values[c] = Domain::Range(Some(*normalise_to));
                }
                PropertyAdjust::Custom(adjust) => adjust(processed, c),
            }
        }
    }
}
