use crate::model::processed::ProcessedData;
use crate::transform::datum_id::create_datum_id;
use ahash::AHashMap;
use chartdata_common::data::datum::Datum;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Row identities that changed between two runs of the same data model
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedDataDiff {
    pub changed: bool,
    pub added: BTreeSet<String>,
    pub updated: BTreeSet<String>,
    pub removed: BTreeSet<String>,
    /// Ids found at a different position than before
    pub moved: BTreeSet<String>,
}

struct DiffUnit {
    id: String,
    values: Vec<Datum>,
}

fn diff_units(processed: &ProcessedData) -> Vec<DiffUnit> {
    (0..processed.unit_count())
        .map(|unit| DiffUnit {
            id: create_datum_id(&processed.unit_keys(unit)),
            values: processed
                .unit_datum_indices(unit)
                .into_iter()
                .flat_map(|row| processed.row_values(row))
                .collect(),
        })
        .collect()
}

/// Walk the previous and current units side by side and classify their ids.
///
/// An id that shows up at another position is paired with its earlier
/// occurrence and reported as moved (and updated) when its values changed, or
/// always when `update_moved_data` is set. Without previous data every current
/// id counts as added.
pub fn diff_processed(
    previous: Option<&ProcessedData>,
    current: &ProcessedData,
    update_moved_data: bool,
) -> ProcessedDataDiff {
    let current_units = diff_units(current);
    let Some(previous) = previous else {
        let added: BTreeSet<String> = current_units.into_iter().map(|unit| unit.id).collect();
        return ProcessedDataDiff {
            changed: !added.is_empty(),
            added,
            ..Default::default()
        };
    };
    let previous_units = diff_units(previous);

    let mut added: AHashMap<String, Vec<Datum>> = AHashMap::new();
    let mut removed: AHashMap<String, Vec<Datum>> = AHashMap::new();
    let mut updated = BTreeSet::new();
    let mut moved = BTreeSet::new();

    for i in 0..previous_units.len().max(current_units.len()) {
        let prev = previous_units.get(i);
        let cur = current_units.get(i);

        if let (Some(prev), Some(cur)) = (prev, cur) {
            if prev.id == cur.id {
                if prev.values != cur.values {
                    updated.insert(cur.id.clone());
                }
                continue;
            }
        }

        if let Some(cur) = cur {
            match removed.remove(&cur.id) {
                Some(values) => {
                    if update_moved_data || values != cur.values {
                        updated.insert(cur.id.clone());
                        moved.insert(cur.id.clone());
                    }
                }
                None => {
                    added.insert(cur.id.clone(), cur.values.clone());
                }
            }
        }

        if let Some(prev) = prev {
            match added.remove(&prev.id) {
                Some(values) => {
                    if update_moved_data || values != prev.values {
                        updated.insert(prev.id.clone());
                        moved.insert(prev.id.clone());
                    }
                }
                None => {
                    updated.remove(&prev.id);
                    removed.insert(prev.id.clone(), prev.values.clone());
                }
            }
        }
    }

    let added: BTreeSet<String> = added.into_keys().collect();
    let removed: BTreeSet<String> = removed.into_keys().collect();
    ProcessedDataDiff {
        changed: !added.is_empty() || !updated.is_empty() || !removed.is_empty(),
        added,
        updated,
        removed,
        moved,
    }
}
