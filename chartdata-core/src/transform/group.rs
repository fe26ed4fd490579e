use crate::model::options::{GroupByFn, RowView};
use crate::model::processed::{DataGroup, ProcessedData, ProcessedDataKind};
use ahash::AHashMap;
use chartdata_common::data::key::{tuple_key, DatumKey};
use std::collections::hash_map::Entry;

/// Partition the rows of ungrouped processed data into groups.
///
/// Rows share a group when their key tuples (or the buckets `grouping` assigns them)
/// are identical. Object keys compare by identity, so distinct objects never collide
/// even when they print the same. Groups come out in first-occurrence order.
pub fn group_data(processed: &mut ProcessedData, grouping: Option<&GroupByFn>) {
    let bucket_fn = grouping.map(|group_by| group_by(&*processed));

    let mut positions: AHashMap<Vec<DatumKey>, usize> = AHashMap::new();
    let mut groups: Vec<DataGroup> = Vec::new();
    for row in 0..processed.len() {
        let keys = processed.row_keys(row);
        let bucket = match &bucket_fn {
            Some(bucket_fn) => {
                let values = processed.row_values(row);
                bucket_fn(&RowView {
                    index: row,
                    keys: &keys,
                    values: &values,
                    datum: &processed.raw_data[row],
                })
            }
            None => keys,
        };
        match positions.entry(tuple_key(&bucket)) {
            Entry::Occupied(entry) => groups[*entry.get()].datum_indices.push(row),
            Entry::Vacant(entry) => {
                entry.insert(groups.len());
                groups.push(DataGroup {
                    keys: bucket,
                    datum_indices: vec![row],
                    aggregation: Vec::new(),
                });
            }
        }
    }

    processed.domain.groups = Some(groups.iter().map(|group| group.keys.clone()).collect());
    processed.groups = groups;
    processed.kind = ProcessedDataKind::Grouped;
}
