use crate::model::processed::{ProcessedData, ReducedValue};
use crate::spec::property::ReducerDefinition;
use chartdata_common::data::datum::Datum;

/// One step of a reducer fold: a group in grouped mode, a row otherwise
#[derive(Debug, Clone, Copy)]
pub struct DatumView<'a> {
    pub index: usize,
    pub keys: &'a [Datum],
    pub datum_indices: &'a [usize],
    pub aggregation: &'a [[f64; 2]],
}

/// Fold each reducer over the groups or rows, in declaration order
pub fn reduce_data(processed: &mut ProcessedData, reducers: &[ReducerDefinition]) {
    for def in reducers {
        let mut reduce = (def.reducer)();
        let mut acc = def.initial_value.clone();
        for unit in 0..processed.unit_count() {
            let keys = processed.unit_keys(unit);
            let datum_indices = processed.unit_datum_indices(unit);
            let view = DatumView {
                index: unit,
                keys: &keys,
                datum_indices: &datum_indices,
                aggregation: processed.unit_aggregation(unit),
            };
            acc = reduce(acc, &view);
        }
        log::trace!("reducer {} produced {}", def.property, acc);
        processed
            .reduced
            .insert(def.property.clone(), ReducedValue::Datum(acc));
    }
}
